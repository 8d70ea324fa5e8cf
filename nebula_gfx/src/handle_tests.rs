use super::*;
use slotmap::SlotMap;

#[test]
fn test_default_handle_is_null() {
    assert!(!Shader::default().is_valid());
    assert!(!Buffer::default().is_valid());
    assert!(!Texture::default().is_valid());
    assert!(!Window::default().is_valid());
    assert!(!InputSet::default().is_valid());
    assert!(!RenderPass::default().is_valid());
    assert!(!CommandBuffer::default().is_valid());
}

#[test]
fn test_allocated_handle_is_valid() {
    let mut map: SlotMap<Buffer, u32> = SlotMap::with_key();
    let handle = map.insert(7);
    assert!(handle.is_valid());
    assert_eq!(map[handle], 7);
}

#[test]
fn test_handles_are_equality_comparable() {
    let mut map: SlotMap<Texture, ()> = SlotMap::with_key();
    let a = map.insert(());
    let b = map.insert(());
    assert_eq!(a, a);
    assert_ne!(a, b);
    assert_ne!(a, Texture::default());
}

#[test]
fn test_stale_handle_detected_after_slot_reuse() {
    let mut map: SlotMap<Shader, u32> = SlotMap::with_key();
    let old = map.insert(1);
    map.remove(old);

    // The slot is recycled with a bumped version; the stale key must not
    // resolve to the new occupant.
    let new = map.insert(2);
    assert!(map.get(old).is_none());
    assert_eq!(map.get(new), Some(&2));
    assert_ne!(old, new);
}
