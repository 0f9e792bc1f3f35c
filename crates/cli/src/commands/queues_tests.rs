use super::*;

fn args(data_dir: PathBuf, queue: &str, command: QueuesCommand) -> QueuesArgs {
    QueuesArgs { queue: queue.to_string(), command, data_dir }
}

#[test]
fn send_then_pull_returns_the_enqueued_message() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().to_path_buf();
    run(args(data_dir.clone(), "q", QueuesCommand::Send { body: "hello".to_string(), delay_seconds: None })).unwrap();
    run(args(data_dir, "q", QueuesCommand::Pull { batch_size: None, visibility_timeout_ms: None })).unwrap();
}

#[test]
fn ack_of_an_unknown_lease_is_an_exit_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = run(args(dir.path().to_path_buf(), "q", QueuesCommand::Ack { lease_id: "not-a-lease".to_string() })).unwrap_err();
    assert_eq!(err.code, 1);
}

#[test]
fn pull_on_an_empty_queue_succeeds_with_no_messages() {
    let dir = tempfile::tempdir().unwrap();
    run(args(dir.path().to_path_buf(), "q", QueuesCommand::Pull { batch_size: None, visibility_timeout_ms: None })).unwrap();
}
