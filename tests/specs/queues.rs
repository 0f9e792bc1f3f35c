//! `forge queues` specs — send/pull/ack exercised as real subprocesses.

use crate::prelude::*;

#[test]
fn send_then_pull_surfaces_the_enqueued_message() {
    let project = Project::empty();
    let data_dir = project.data_dir();

    project
        .forge()
        .args(["queues", "emails", "send", "hello world"])
        .arg("--data-dir")
        .arg(&data_dir)
        .passes();

    project
        .forge()
        .args(["queues", "emails", "pull"])
        .arg("--data-dir")
        .arg(&data_dir)
        .passes()
        .stdout_has("hello world");
}

#[test]
fn ack_of_a_pulled_lease_succeeds() {
    let project = Project::empty();
    let data_dir = project.data_dir();

    project.forge().args(["queues", "q", "send", "payload"]).arg("--data-dir").arg(&data_dir).passes();
    let pulled = project.forge().args(["queues", "q", "pull"]).arg("--data-dir").arg(&data_dir).passes();
    let stdout = String::from_utf8_lossy(&pulled.get_output().stdout).into_owned();
    let lease_id = stdout.split('\t').next().expect("lease id column").trim().to_string();

    project.forge().args(["queues", "q", "ack", &lease_id]).arg("--data-dir").arg(&data_dir).passes();
}

#[test]
fn ack_of_an_unknown_lease_fails() {
    let project = Project::empty();
    project
        .forge()
        .args(["queues", "q", "ack", "not-a-real-lease"])
        .arg("--data-dir")
        .arg(project.data_dir())
        .fails();
}

#[test]
fn pull_on_an_empty_queue_succeeds_with_no_output() {
    let project = Project::empty();
    project
        .forge()
        .args(["queues", "empty", "pull"])
        .arg("--data-dir")
        .arg(project.data_dir())
        .passes();
}
