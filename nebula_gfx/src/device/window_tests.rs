use super::*;

#[test]
fn test_input_tracker_starts_clear() {
    let tracker = InputTracker::new();
    assert!(!tracker.key_down(Key::W));
    assert!(!tracker.close_requested());
    assert_eq!(tracker.mouse_position(), (0, 0));
}

#[test]
fn test_key_press_and_release() {
    let mut tracker = InputTracker::new();
    tracker.set_key(Key::Space, true);
    assert!(tracker.key_down(Key::Space));
    assert!(!tracker.key_down(Key::Enter));

    tracker.set_key(Key::Space, false);
    assert!(!tracker.key_down(Key::Space));
}

#[test]
fn test_mouse_position_tracking() {
    let mut tracker = InputTracker::new();
    tracker.set_mouse_position(120, -4);
    assert_eq!(tracker.mouse_position(), (120, -4));
}

#[test]
fn test_close_request_is_sticky() {
    let mut tracker = InputTracker::new();
    tracker.request_close();
    assert!(tracker.close_requested());
    assert!(tracker.close_requested());
}

#[test]
fn test_key_count_covers_all_keys() {
    // The backing array is indexed by discriminant; the last key must fit.
    assert!((Key::MouseMiddle as usize) < Key::COUNT);
    assert!((Key::A as usize) < Key::COUNT);
}

#[test]
fn test_window_info_defaults() {
    let info = WindowInfo::new(800, 600);
    assert_eq!(info.width, 800);
    assert_eq!(info.height, 600);
    assert_eq!(info.present_mode, PresentMode::Immediate);
    assert_eq!(info.framebuffer_count, 0);
}
