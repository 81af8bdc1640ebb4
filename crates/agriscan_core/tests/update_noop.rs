use agriscan_core::{update, AppState, Msg};

#[test]
fn update_is_noop() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn startup_without_pending_job_stays_idle() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::Started { pending_job: None });

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
