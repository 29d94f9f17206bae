use std::time::Duration;

use catalog_core::{
    Phase, SessionId, SubmissionEffect, SubmissionMsg, SubmissionPolicy, SubmissionState,
    SubmitOutcome,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    catalog_logging::initialize_for_tests();
}

fn submit(state: &mut SubmissionState, target: &str) -> Vec<SubmissionEffect> {
    state.update(SubmissionMsg::Submit {
        target_id: SessionId::from(target),
    })
}

fn enter_key(state: &mut SubmissionState, key: &str) -> Vec<SubmissionEffect> {
    state.update(SubmissionMsg::KeyChanged(key.to_string()));
    state.update(SubmissionMsg::Accept)
}

fn call_attempt(effects: &[SubmissionEffect]) -> u64 {
    match effects {
        [SubmissionEffect::CallSubmit { attempt, .. }] => *attempt,
        other => panic!("expected a single submit call, got {other:?}"),
    }
}

fn finish(state: &mut SubmissionState, attempt: u64, outcome: SubmitOutcome) -> Vec<SubmissionEffect> {
    state.update(SubmissionMsg::SubmitFinished { attempt, outcome })
}

#[test]
fn happy_path_then_key_is_reused() {
    init_logging();
    let mut state = SubmissionState::default();

    assert!(submit(&mut state, "s1").is_empty());
    assert_eq!(
        state.phase(),
        &Phase::KeyNeeded {
            value: String::new()
        }
    );

    let effects = enter_key(&mut state, "request-key");
    assert_eq!(
        effects,
        vec![SubmissionEffect::CallSubmit {
            attempt: 1,
            key: "request-key".to_string(),
            target_id: SessionId::from("s1"),
        }]
    );
    assert_eq!(state.phase(), &Phase::Processing);

    finish(&mut state, 1, SubmitOutcome::Accepted);
    assert_eq!(state.phase(), &Phase::Finished);
    assert!(state.has_stored_key());

    state.update(SubmissionMsg::Acknowledge);
    assert_eq!(state.phase(), &Phase::Idle);

    // Second submission goes straight to processing with the stored key.
    let effects = submit(&mut state, "s2");
    assert_eq!(
        effects,
        vec![SubmissionEffect::CallSubmit {
            attempt: 2,
            key: "request-key".to_string(),
            target_id: SessionId::from("s2"),
        }]
    );
    assert_eq!(state.phase(), &Phase::Processing);
    finish(&mut state, 2, SubmitOutcome::Accepted);
    assert_eq!(state.phase(), &Phase::Finished);
}

#[test]
fn key_value_is_live_editable() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");
    assert!(state.consume_dirty());

    state.update(SubmissionMsg::KeyChanged("ab".to_string()));
    assert!(state.consume_dirty());
    assert_eq!(
        state.phase(),
        &Phase::KeyNeeded {
            value: "ab".to_string()
        }
    );

    // Edits outside the prompt are ignored.
    state.update(SubmissionMsg::Cancel);
    state.update(SubmissionMsg::KeyChanged("late".to_string()));
    assert_eq!(state.phase(), &Phase::Idle);
}

#[test]
fn cancel_ends_the_submission_quietly() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");
    assert!(state.update(SubmissionMsg::Cancel).is_empty());
    assert_eq!(state.phase(), &Phase::Idle);
    assert!(!state.has_stored_key());
}

#[test]
fn invalid_key_asks_again() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");
    let attempt = call_attempt(&enter_key(&mut state, "wrong"));

    let effects = finish(&mut state, attempt, SubmitOutcome::InvalidKey);
    assert!(effects.is_empty());
    assert_eq!(
        state.phase(),
        &Phase::KeyNeeded {
            value: String::new()
        }
    );

    let attempt = call_attempt(&enter_key(&mut state, "right"));
    finish(&mut state, attempt, SubmitOutcome::Accepted);
    assert_eq!(state.phase(), &Phase::Finished);
}

#[test]
fn empty_key_is_rejected_without_calling_the_backend() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");
    let effects = enter_key(&mut state, "");
    assert!(effects.is_empty());
    assert_eq!(
        state.phase(),
        &Phase::KeyNeeded {
            value: String::new()
        }
    );
}

#[test]
fn rejected_stored_key_is_forgotten() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");
    let attempt = call_attempt(&enter_key(&mut state, "old-key"));
    finish(&mut state, attempt, SubmitOutcome::Accepted);
    state.update(SubmissionMsg::Acknowledge);

    // The key was rotated on the backend.
    let attempt = call_attempt(&submit(&mut state, "s2"));
    finish(&mut state, attempt, SubmitOutcome::InvalidKey);
    assert!(!state.has_stored_key());
    assert!(matches!(state.phase(), Phase::KeyNeeded { .. }));
}

#[test]
fn other_failures_show_fixed_message_and_keep_key() {
    init_logging();
    let policy = SubmissionPolicy {
        failure_message: "Could not send.".to_string(),
        ..SubmissionPolicy::default()
    };
    let mut state = SubmissionState::new(policy);
    submit(&mut state, "s1");
    let attempt = call_attempt(&enter_key(&mut state, "key"));
    finish(&mut state, attempt, SubmitOutcome::Accepted);
    state.update(SubmissionMsg::Acknowledge);

    let attempt = call_attempt(&submit(&mut state, "s2"));
    finish(
        &mut state,
        attempt,
        SubmitOutcome::Failed("deadline exceeded".to_string()),
    );
    assert_eq!(
        state.phase(),
        &Phase::Failed {
            message: "Could not send.".to_string()
        }
    );
    assert!(state.has_stored_key());

    state.update(SubmissionMsg::Acknowledge);
    assert_eq!(state.phase(), &Phase::Idle);
    // Next submission reuses the key without prompting.
    call_attempt(&submit(&mut state, "s3"));
}

#[test]
fn concurrent_submit_is_ignored() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");
    state.consume_dirty();

    assert!(submit(&mut state, "s2").is_empty());
    assert!(!state.consume_dirty());

    let attempt = call_attempt(&enter_key(&mut state, "key"));
    assert!(submit(&mut state, "s3").is_empty());
    assert_eq!(state.phase(), &Phase::Processing);

    // The original submission still completes for its own target.
    finish(&mut state, attempt, SubmitOutcome::Accepted);
    assert_eq!(state.phase(), &Phase::Finished);
    assert!(submit(&mut state, "s4").is_empty());
}

#[test]
fn third_rejection_starts_a_cooldown() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");

    for key in ["a", "b"] {
        let attempt = call_attempt(&enter_key(&mut state, key));
        assert!(finish(&mut state, attempt, SubmitOutcome::InvalidKey).is_empty());
    }
    let attempt = call_attempt(&enter_key(&mut state, "c"));
    let effects = finish(&mut state, attempt, SubmitOutcome::InvalidKey);
    let cooldown = match effects.as_slice() {
        [SubmissionEffect::StartCooldown { attempt, delay }] => {
            assert_eq!(*delay, Duration::from_secs(5));
            *attempt
        }
        other => panic!("expected a cooldown, got {other:?}"),
    };
    assert_eq!(state.phase(), &Phase::Processing);

    // Accepting or submitting during the pause does nothing.
    assert!(state.update(SubmissionMsg::Accept).is_empty());
    assert!(submit(&mut state, "s2").is_empty());

    state.update(SubmissionMsg::CooldownElapsed { attempt: cooldown });
    assert!(matches!(state.phase(), Phase::KeyNeeded { .. }));

    // The counter restarted: two more rejections do not pause.
    for key in ["d", "e"] {
        let attempt = call_attempt(&enter_key(&mut state, key));
        assert!(finish(&mut state, attempt, SubmitOutcome::InvalidKey).is_empty());
    }
}

#[test]
fn rejection_counter_resets_per_submission() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");
    for key in ["a", "b"] {
        let attempt = call_attempt(&enter_key(&mut state, key));
        finish(&mut state, attempt, SubmitOutcome::InvalidKey);
    }
    state.update(SubmissionMsg::Cancel);

    submit(&mut state, "s1");
    let attempt = call_attempt(&enter_key(&mut state, "c"));
    assert!(finish(&mut state, attempt, SubmitOutcome::InvalidKey).is_empty());
    assert!(matches!(state.phase(), Phase::KeyNeeded { .. }));
}

#[test]
fn stale_results_are_ignored() {
    init_logging();
    let mut state = SubmissionState::default();
    submit(&mut state, "s1");
    let attempt = call_attempt(&enter_key(&mut state, "key"));

    assert!(finish(&mut state, attempt + 7, SubmitOutcome::Accepted).is_empty());
    assert_eq!(state.phase(), &Phase::Processing);
    state.update(SubmissionMsg::CooldownElapsed { attempt });
    assert_eq!(state.phase(), &Phase::Processing);
}
