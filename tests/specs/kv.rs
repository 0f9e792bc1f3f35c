//! `forge kv` specs — exercised as a real subprocess against a scratch data dir.

use crate::prelude::*;

#[test]
fn put_then_get_round_trips_through_separate_invocations() {
    let project = Project::empty();
    let data_dir = project.data_dir();

    project
        .forge()
        .args(["kv", "settings", "put", "theme", "dark"])
        .arg("--data-dir")
        .arg(&data_dir)
        .passes();

    project
        .forge()
        .args(["kv", "settings", "get", "theme"])
        .arg("--data-dir")
        .arg(&data_dir)
        .passes()
        .stdout_has("dark");
}

#[test]
fn get_of_a_missing_key_fails() {
    let project = Project::empty();
    project
        .forge()
        .args(["kv", "settings", "get", "missing"])
        .arg("--data-dir")
        .arg(project.data_dir())
        .fails();
}

#[test]
fn delete_makes_a_key_unreadable() {
    let project = Project::empty();
    let data_dir = project.data_dir();

    project.forge().args(["kv", "ns", "put", "k", "v"]).arg("--data-dir").arg(&data_dir).passes();
    project.forge().args(["kv", "ns", "delete", "k"]).arg("--data-dir").arg(&data_dir).passes();
    project.forge().args(["kv", "ns", "get", "k"]).arg("--data-dir").arg(&data_dir).fails();
}

#[test]
fn list_shows_every_key_under_a_prefix() {
    let project = Project::empty();
    let data_dir = project.data_dir();

    project.forge().args(["kv", "ns", "put", "app:1", "a"]).arg("--data-dir").arg(&data_dir).passes();
    project.forge().args(["kv", "ns", "put", "app:2", "b"]).arg("--data-dir").arg(&data_dir).passes();
    project.forge().args(["kv", "ns", "put", "other", "c"]).arg("--data-dir").arg(&data_dir).passes();

    project
        .forge()
        .args(["kv", "ns", "list", "--prefix", "app:"])
        .arg("--data-dir")
        .arg(&data_dir)
        .passes()
        .stdout_has("app:1")
        .stdout_has("app:2");
}
