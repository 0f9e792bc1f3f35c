use super::*;

#[test]
fn from_name_is_deterministic() {
    let a = ActorId::from_name("alice");
    let b = ActorId::from_name("alice");
    assert_eq!(a, b);
    assert_eq!(a.name(), Some("alice"));
}

#[test]
fn different_names_yield_different_ids() {
    assert_ne!(ActorId::from_name("alice"), ActorId::from_name("bob"));
}

#[test]
fn new_unique_ids_are_distinct() {
    assert_ne!(ActorId::new_unique(), ActorId::new_unique());
}

#[test]
fn from_string_is_identity() {
    let id = ActorId::from_string("deadbeef");
    assert_eq!(id.as_str(), "deadbeef");
    assert_eq!(id.name(), None);
}
