//! CLI help output specs.

use crate::prelude::*;

#[test]
fn forge_help_shows_usage() {
    cli().args(["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn forge_dev_help_shows_usage() {
    cli().args(["dev", "--help"]).passes().stdout_has("Usage:");
}

#[test]
fn forge_kv_help_shows_subcommands() {
    cli()
        .args(["kv", "ns", "--help"])
        .passes()
        .stdout_has("get")
        .stdout_has("put")
        .stdout_has("delete")
        .stdout_has("list");
}

#[test]
fn forge_queues_help_shows_subcommands() {
    cli()
        .args(["queues", "q", "--help"])
        .passes()
        .stdout_has("send")
        .stdout_has("pull")
        .stdout_has("ack");
}

#[test]
fn forge_with_no_subcommand_fails() {
    cli().fails();
}
