use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use catalog_core::{EventId, Phase, SessionId, SubmissionPolicy};
use catalog_engine::memory::InMemoryCatalog;
use catalog_engine::{
    RequestSubmitter, SubmissionWorkflow, SubmitError, SubmitRequest, WorkflowSettings,
};
use pretty_assertions::assert_eq;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Default)]
struct ScriptedSubmitter {
    replies: Mutex<VecDeque<Result<(), SubmitError>>>,
    calls: Mutex<Vec<SubmitRequest>>,
}

impl ScriptedSubmitter {
    fn replying(replies: Vec<Result<(), SubmitError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<SubmitRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RequestSubmitter for ScriptedSubmitter {
    async fn submit_with_key(&self, request: &SubmitRequest) -> Result<(), SubmitError> {
        self.calls.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(SubmitError::InvalidKey))
    }
}

struct PanickingSubmitter;

#[async_trait::async_trait]
impl RequestSubmitter for PanickingSubmitter {
    async fn submit_with_key(&self, _request: &SubmitRequest) -> Result<(), SubmitError> {
        panic!("submitter blew up");
    }
}

async fn wait_for_phase(rx: &mut watch::Receiver<Phase>, done: impl FnMut(&Phase) -> bool) -> Phase {
    tokio::time::timeout(Duration::from_secs(30), rx.wait_for(done))
        .await
        .expect("phase did not change in time")
        .expect("workflow dropped")
        .clone()
}

fn key_needed(phase: &Phase) -> bool {
    matches!(phase, Phase::KeyNeeded { .. })
}

#[tokio::test]
async fn accepted_request_lands_in_the_catalog_and_key_is_reused() {
    catalog_logging::initialize_for_tests();
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.set_access_key(EventId::from("e1"), "spring-key");
    let workflow =
        SubmissionWorkflow::new(catalog.clone(), SubmissionPolicy::default()).expect("runtime");
    let mut rx = workflow.subscribe();

    workflow.submit(SessionId::from("s1"));
    assert_eq!(
        workflow.phase(),
        Phase::KeyNeeded {
            value: String::new()
        }
    );
    workflow.set_key_value("spring-key");
    workflow.accept();
    assert_eq!(workflow.phase(), Phase::Processing);
    wait_for_phase(&mut rx, |phase| *phase == Phase::Finished).await;

    workflow.acknowledge();
    assert_eq!(workflow.phase(), Phase::Idle);

    workflow.submit(SessionId::from("s2"));
    assert_eq!(workflow.phase(), Phase::Processing);
    wait_for_phase(&mut rx, |phase| *phase == Phase::Finished).await;

    let stored: Vec<_> = catalog
        .requests()
        .into_iter()
        .map(|request| (request.event_id, request.session_id, request.watched))
        .collect();
    assert_eq!(
        stored,
        vec![
            (EventId::from("e1"), SessionId::from("s1"), false),
            (EventId::from("e1"), SessionId::from("s2"), false),
        ]
    );
}

#[tokio::test]
async fn wrong_key_prompts_again() {
    catalog_logging::initialize_for_tests();
    let submitter = ScriptedSubmitter::replying(vec![Err(SubmitError::InvalidKey), Ok(())]);
    let workflow =
        SubmissionWorkflow::new(submitter.clone(), SubmissionPolicy::default()).expect("runtime");
    let mut rx = workflow.subscribe();

    workflow.submit(SessionId::from("s1"));
    workflow.set_key_value("wrong");
    workflow.accept();
    let phase = wait_for_phase(&mut rx, key_needed).await;
    assert_eq!(
        phase,
        Phase::KeyNeeded {
            value: String::new()
        }
    );

    workflow.set_key_value("right");
    workflow.accept();
    wait_for_phase(&mut rx, |phase| *phase == Phase::Finished).await;

    let keys: Vec<_> = submitter.calls().into_iter().map(|call| call.key).collect();
    assert_eq!(keys, vec!["wrong", "right"]);
}

#[tokio::test(start_paused = true)]
async fn third_rejection_pauses_before_prompting_again() {
    catalog_logging::initialize_for_tests();
    let submitter = ScriptedSubmitter::replying(Vec::new());
    let workflow =
        SubmissionWorkflow::new(submitter.clone(), SubmissionPolicy::default()).expect("runtime");
    let mut rx = workflow.subscribe();

    workflow.submit(SessionId::from("s1"));
    for key in ["a", "b"] {
        workflow.set_key_value(key);
        workflow.accept();
        wait_for_phase(&mut rx, key_needed).await;
    }

    workflow.set_key_value("c");
    workflow.accept();
    let paused_at = Instant::now();
    wait_for_phase(&mut rx, key_needed).await;
    assert!(paused_at.elapsed() >= Duration::from_secs(5));
    assert_eq!(submitter.calls().len(), 3);
}

#[tokio::test]
async fn backend_failure_shows_the_configured_message() {
    catalog_logging::initialize_for_tests();
    let settings = WorkflowSettings {
        failure_message: "Please try again later.".to_string(),
        ..WorkflowSettings::default()
    };
    let submitter = ScriptedSubmitter::replying(vec![Err(SubmitError::Rejected {
        code: "deadline-exceeded".to_string(),
        message: "timeout".to_string(),
    })]);
    let workflow = SubmissionWorkflow::new(submitter, settings.policy()).expect("runtime");
    let mut rx = workflow.subscribe();

    workflow.submit(SessionId::from("s1"));
    workflow.set_key_value("key");
    workflow.accept();
    let phase = wait_for_phase(&mut rx, |phase| matches!(phase, Phase::Failed { .. })).await;
    assert_eq!(
        phase,
        Phase::Failed {
            message: "Please try again later.".to_string()
        }
    );
}

#[tokio::test]
async fn panicking_submitter_is_a_failure() {
    catalog_logging::initialize_for_tests();
    let workflow = SubmissionWorkflow::new(Arc::new(PanickingSubmitter), SubmissionPolicy::default())
        .expect("runtime");
    let mut rx = workflow.subscribe();

    workflow.submit(SessionId::from("s1"));
    workflow.set_key_value("key");
    workflow.accept();
    wait_for_phase(&mut rx, |phase| matches!(phase, Phase::Failed { .. })).await;

    workflow.acknowledge();
    assert_eq!(workflow.phase(), Phase::Idle);
}
