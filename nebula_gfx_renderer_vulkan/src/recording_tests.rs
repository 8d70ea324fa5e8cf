use super::*;
use nebula_gfx::Error;
use slotmap::SlotMap;

fn two_passes() -> (RenderPass, RenderPass) {
    let mut map: SlotMap<RenderPass, ()> = SlotMap::with_key();
    (map.insert(()), map.insert(()))
}

#[test]
fn test_fresh_state_has_no_render_pass() {
    let state = RecordingState::new();
    assert!(state.render_pass().is_none());
    assert!(matches!(
        state.require_render_pass("draw"),
        Err(Error::ContractViolation(_))
    ));
}

#[test]
fn test_bound_render_pass_is_required_and_returned() {
    let (pass, _) = two_passes();
    let mut state = RecordingState::new();
    state.bind_render_pass(pass);
    assert_eq!(state.require_render_pass("draw").unwrap(), pass);
}

#[test]
fn test_index_buffer_required_for_indexed_draw() {
    let (pass, _) = two_passes();
    let mut state = RecordingState::new();
    state.bind_render_pass(pass);
    assert!(matches!(
        state.require_index_buffer("draw_indexed"),
        Err(Error::ContractViolation(_))
    ));

    state.note_index_buffer();
    assert!(state.require_index_buffer("draw_indexed").is_ok());
}

#[test]
fn test_switching_render_pass_drops_index_binding() {
    let (pass_a, pass_b) = two_passes();
    let mut state = RecordingState::new();
    state.bind_render_pass(pass_a);
    state.note_index_buffer();

    state.bind_render_pass(pass_b);
    assert!(state.require_index_buffer("draw_indexed").is_err());
}

#[test]
fn test_input_set_pairing_accepts_matching_pass() {
    let (pass, _) = two_passes();
    let mut state = RecordingState::new();
    state.bind_render_pass(pass);
    assert!(state.check_input_set_pairing(pass).is_ok());
}

#[test]
fn test_input_set_pairing_rejects_other_pass() {
    let (pass_a, pass_b) = two_passes();
    let mut state = RecordingState::new();
    state.bind_render_pass(pass_a);
    assert!(matches!(
        state.check_input_set_pairing(pass_b),
        Err(Error::ContractViolation(_))
    ));
}

#[test]
fn test_input_set_pairing_requires_a_bound_pass() {
    let (pass, _) = two_passes();
    let state = RecordingState::new();
    assert!(state.check_input_set_pairing(pass).is_err());
}
