use std::sync::{Arc, Mutex, MutexGuard, Weak};

use catalog_core::{
    Phase, SessionId, SubmissionEffect, SubmissionMsg, SubmissionPolicy, SubmissionState,
    SubmitOutcome,
};
use catalog_logging::{catalog_debug, catalog_error, catalog_info};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::repository::{RequestSubmitter, SubmitError, SubmitRequest};
use crate::EngineError;

struct Inner {
    state: Mutex<SubmissionState>,
    phase_tx: watch::Sender<Phase>,
    submitter: Arc<dyn RequestSubmitter>,
    runtime: Handle,
}

/// Runs the request-submission state machine against a [`RequestSubmitter`].
///
/// Phase changes are published on a watch channel; the UI renders the key
/// prompt, progress, result and failure screens from it.
#[derive(Clone)]
pub struct SubmissionWorkflow {
    inner: Arc<Inner>,
}

impl SubmissionWorkflow {
    pub fn new(
        submitter: Arc<dyn RequestSubmitter>,
        policy: SubmissionPolicy,
    ) -> Result<Self, EngineError> {
        let runtime = Handle::try_current()?;
        let (phase_tx, _) = watch::channel(Phase::Idle);
        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SubmissionState::new(policy)),
                phase_tx,
                submitter,
                runtime,
            }),
        })
    }

    /// Starts a submission for `target_id`. Ignored while another one is in progress.
    pub fn submit(&self, target_id: SessionId) {
        self.inner.dispatch(SubmissionMsg::Submit { target_id });
    }

    pub fn set_key_value(&self, value: impl Into<String>) {
        self.inner.dispatch(SubmissionMsg::KeyChanged(value.into()));
    }

    pub fn accept(&self) {
        self.inner.dispatch(SubmissionMsg::Accept);
    }

    pub fn cancel(&self) {
        self.inner.dispatch(SubmissionMsg::Cancel);
    }

    /// Dismisses the result or failure screen.
    pub fn acknowledge(&self) {
        self.inner.dispatch(SubmissionMsg::Acknowledge);
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.inner.phase_tx.subscribe()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SubmissionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(self: &Arc<Self>, msg: SubmissionMsg) {
        let effects = {
            let mut state = self.lock();
            let effects = state.update(msg);
            if state.consume_dirty() {
                self.phase_tx.send_replace(state.phase().clone());
            }
            effects
        };
        for effect in effects {
            self.run(effect);
        }
    }

    fn run(self: &Arc<Self>, effect: SubmissionEffect) {
        let owner = Arc::downgrade(self);
        match effect {
            SubmissionEffect::CallSubmit {
                attempt,
                key,
                target_id,
            } => {
                let submitter = self.submitter.clone();
                self.runtime.spawn(async move {
                    let request = SubmitRequest { key, target_id };
                    let outcome = call_submitter(submitter, request).await;
                    deliver(&owner, SubmissionMsg::SubmitFinished { attempt, outcome });
                });
            }
            SubmissionEffect::StartCooldown { attempt, delay } => {
                catalog_info!("Pausing {:?} after repeated key rejections", delay);
                self.runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    deliver(&owner, SubmissionMsg::CooldownElapsed { attempt });
                });
            }
        }
    }
}

fn deliver(owner: &Weak<Inner>, msg: SubmissionMsg) {
    if let Some(inner) = owner.upgrade() {
        inner.dispatch(msg);
    }
}

/// A panicking submitter is reported as an ordinary failure.
async fn call_submitter(
    submitter: Arc<dyn RequestSubmitter>,
    request: SubmitRequest,
) -> SubmitOutcome {
    let target_id = request.target_id.clone();
    let call = tokio::spawn(async move { submitter.submit_with_key(&request).await });
    match call.await {
        Ok(Ok(())) => {
            catalog_info!("Watch request for {} accepted", target_id);
            SubmitOutcome::Accepted
        }
        Ok(Err(SubmitError::InvalidKey)) => {
            catalog_debug!("Request key rejected for {}", target_id);
            SubmitOutcome::InvalidKey
        }
        Ok(Err(err)) => {
            catalog_error!("Watch request for {} failed: {}", target_id, err);
            SubmitOutcome::Failed(err.to_string())
        }
        Err(join_error) => {
            catalog_error!("Submitter for {} aborted: {}", target_id, join_error);
            SubmitOutcome::Failed(join_error.to_string())
        }
    }
}
