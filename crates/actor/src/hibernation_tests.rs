use super::*;

#[test]
fn accept_registers_socket_with_tags() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    reg.accept(1, vec!["a".to_string(), "b".to_string()]).unwrap();
    let mut tags = reg.get_tags(&1);
    tags.sort();
    assert_eq!(tags, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(reg.active_count(), 1);
}

#[test]
fn get_websockets_filters_by_tag() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    reg.accept(1, vec!["chat".to_string()]).unwrap();
    reg.accept(2, vec!["lobby".to_string()]).unwrap();
    reg.accept(3, vec!["chat".to_string(), "lobby".to_string()]).unwrap();

    let mut chat: Vec<u32> = reg.get_websockets(Some("chat"));
    chat.sort();
    assert_eq!(chat, vec![1, 3]);

    let mut all: Vec<u32> = reg.get_websockets(None);
    all.sort();
    assert_eq!(all, vec![1, 2, 3]);
}

#[test]
fn remove_drops_socket_and_its_tags() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    reg.accept(1, vec!["a".to_string()]).unwrap();
    reg.remove(&1);
    assert_eq!(reg.active_count(), 0);
    assert!(reg.get_tags(&1).is_empty());
}

#[test]
fn too_many_tags_is_rejected() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    let tags: Vec<String> = (0..11).map(|i| i.to_string()).collect();
    let err = reg.accept(1, tags).unwrap_err();
    assert!(matches!(err, ActorError::LimitExceeded { what: "tags per socket", .. }));
}

#[test]
fn oversized_tag_is_rejected() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    let err = reg.accept(1, vec!["x".repeat(257)]).unwrap_err();
    assert!(matches!(err, ActorError::LimitExceeded { what: "tag bytes", .. }));
}

#[test]
fn attachment_round_trips() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    reg.accept(1, vec![]).unwrap();
    assert_eq!(reg.deserialize_attachment(&1), None);
    reg.serialize_attachment(&1, b"blob".to_vec());
    assert_eq!(reg.deserialize_attachment(&1), Some(b"blob".to_vec()));
}

#[test]
fn auto_response_matches_exact_request_and_records_timestamp() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    reg.accept(1, vec![]).unwrap();
    reg.set_auto_response(b"ping".to_vec(), b"pong".to_vec());

    assert_eq!(reg.try_auto_respond(&1, b"other", 100), None);
    assert_eq!(reg.auto_response_timestamp(&1), None);

    assert_eq!(reg.try_auto_respond(&1, b"ping", 100), Some(b"pong".to_vec()));
    assert_eq!(reg.auto_response_timestamp(&1), Some(100));
}

#[test]
fn clear_auto_response_disables_fast_path() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    reg.accept(1, vec![]).unwrap();
    reg.set_auto_response(b"ping".to_vec(), b"pong".to_vec());
    reg.clear_auto_response();
    assert_eq!(reg.try_auto_respond(&1, b"ping", 100), None);
}

#[test]
fn accept_again_on_same_socket_replaces_tags() {
    let mut reg: WebSocketRegistry<u32> = WebSocketRegistry::new();
    reg.accept(1, vec!["a".to_string()]).unwrap();
    reg.accept(1, vec!["b".to_string()]).unwrap();
    assert_eq!(reg.get_tags(&1), vec!["b".to_string()]);
    assert_eq!(reg.active_count(), 1);
}
