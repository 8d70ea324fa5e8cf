use super::*;
use nebula_gfx::{Buffer, Error, Handle};

fn registry() -> Registry<Buffer, String> {
    Registry::new("Buffer")
}

#[test]
fn test_insert_returns_valid_handle() {
    let mut reg = registry();
    let handle = reg.insert("a".to_string());
    assert!(handle.is_valid());
    assert_eq!(reg.get(handle).unwrap(), "a");
    assert_eq!(reg.len(), 1);
}

#[test]
fn test_handles_are_unique_within_kind() {
    let mut reg = registry();
    let a = reg.insert("a".to_string());
    let b = reg.insert("b".to_string());
    assert_ne!(a, b);
    assert_eq!(reg.get(a).unwrap(), "a");
    assert_eq!(reg.get(b).unwrap(), "b");
}

#[test]
fn test_remove_erases_the_mapping() {
    let mut reg = registry();
    let handle = reg.insert("a".to_string());
    assert_eq!(reg.remove(handle).unwrap(), "a");
    assert_eq!(reg.len(), 0);
    assert!(matches!(
        reg.get(handle),
        Err(Error::InvalidHandle { kind: "Buffer" })
    ));
}

#[test]
fn test_null_handle_lookup_is_reported() {
    let reg = registry();
    assert!(matches!(
        reg.get(Buffer::default()),
        Err(Error::InvalidHandle { kind: "Buffer" })
    ));
}

#[test]
fn test_freed_handle_does_not_alias_recycled_slot() {
    let mut reg = registry();
    let old = reg.insert("old".to_string());
    reg.remove(old).unwrap();

    let new = reg.insert("new".to_string());
    assert!(reg.get(old).is_err());
    assert_eq!(reg.get(new).unwrap(), "new");
}

#[test]
fn test_double_remove_is_reported() {
    let mut reg = registry();
    let handle = reg.insert("a".to_string());
    reg.remove(handle).unwrap();
    assert!(reg.remove(handle).is_err());
}

#[test]
fn test_take_all_drains_every_entry() {
    let mut reg = registry();
    reg.insert("a".to_string());
    reg.insert("b".to_string());
    let drained = reg.take_all();
    assert_eq!(drained.len(), 2);
    assert_eq!(reg.len(), 0);
}
