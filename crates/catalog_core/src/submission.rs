//! Access-key gated request submission.
//!
//! One submission walks `Idle -> KeyNeeded -> Processing -> Finished | Failed`
//! and back to `Idle` once acknowledged. A key that the backend accepted is
//! kept for later submissions; a rejected key is dropped and the user is asked
//! again, with a pause after every few rejections.

use std::time::Duration;

use catalog_logging::{catalog_debug, catalog_info, catalog_warn};

use crate::SessionId;

/// User-facing step of the submission dialog sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Processing,
    /// Waiting for the user to type an access key and accept or cancel.
    KeyNeeded { value: String },
    /// The request was stored; waits for acknowledgement.
    Finished,
    /// The request could not be stored; waits for acknowledgement.
    Failed { message: String },
}

/// How the submit collaborator answered one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    InvalidKey,
    /// Any other failure; the text is for logs, not for the user.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionMsg {
    Submit { target_id: SessionId },
    KeyChanged(String),
    Accept,
    Cancel,
    Acknowledge,
    SubmitFinished { attempt: u64, outcome: SubmitOutcome },
    CooldownElapsed { attempt: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEffect {
    CallSubmit {
        attempt: u64,
        key: String,
        target_id: SessionId,
    },
    StartCooldown { attempt: u64, delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPolicy {
    /// Consecutive rejections after which the workflow pauses. Zero disables the pause.
    pub cooldown_after_attempts: u32,
    pub cooldown: Duration,
    /// Shown for every failure other than an invalid key.
    pub failure_message: String,
}

pub const DEFAULT_FAILURE_MESSAGE: &str = "The request could not be sent. Please try again later.";

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            cooldown_after_attempts: 3,
            cooldown: Duration::from_secs(5),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Waiting {
    Nothing,
    Call { attempt: u64, key: String },
    Cooldown { attempt: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionState {
    policy: SubmissionPolicy,
    phase: Phase,
    stored_key: Option<String>,
    target_id: Option<SessionId>,
    rejections: u32,
    attempt: u64,
    waiting: Waiting,
    dirty: bool,
}

impl Default for SubmissionState {
    fn default() -> Self {
        Self::new(SubmissionPolicy::default())
    }
}

impl SubmissionState {
    pub fn new(policy: SubmissionPolicy) -> Self {
        Self {
            policy,
            phase: Phase::Idle,
            stored_key: None,
            target_id: None,
            rejections: 0,
            attempt: 0,
            waiting: Waiting::Nothing,
            dirty: false,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn has_stored_key(&self) -> bool {
        self.stored_key.is_some()
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn update(&mut self, msg: SubmissionMsg) -> Vec<SubmissionEffect> {
        match msg {
            SubmissionMsg::Submit { target_id } => {
                if self.phase != Phase::Idle {
                    catalog_warn!(
                        "Ignoring submission for {} while another one is in progress",
                        target_id
                    );
                    return Vec::new();
                }
                self.target_id = Some(target_id);
                self.rejections = 0;
                match self.stored_key.clone() {
                    Some(key) => self.process(key),
                    None => {
                        self.ask_for_key();
                        Vec::new()
                    }
                }
            }
            SubmissionMsg::KeyChanged(text) => {
                if let Phase::KeyNeeded { value } = &mut self.phase {
                    *value = text;
                    self.dirty = true;
                }
                Vec::new()
            }
            SubmissionMsg::Accept => match &self.phase {
                Phase::KeyNeeded { value } => {
                    let key = value.clone();
                    self.process(key)
                }
                _ => Vec::new(),
            },
            SubmissionMsg::Cancel => {
                if matches!(self.phase, Phase::KeyNeeded { .. }) {
                    catalog_debug!("Key prompt cancelled");
                    self.finish(Phase::Idle);
                }
                Vec::new()
            }
            SubmissionMsg::Acknowledge => {
                if matches!(self.phase, Phase::Finished | Phase::Failed { .. }) {
                    self.finish(Phase::Idle);
                }
                Vec::new()
            }
            SubmissionMsg::SubmitFinished { attempt, outcome } => {
                let key = match &self.waiting {
                    Waiting::Call {
                        attempt: expected,
                        key,
                    } if *expected == attempt => key.clone(),
                    _ => {
                        catalog_debug!("Dropping stale submit result for attempt {}", attempt);
                        return Vec::new();
                    }
                };
                self.waiting = Waiting::Nothing;
                match outcome {
                    SubmitOutcome::Accepted => {
                        catalog_info!("Request submitted");
                        self.stored_key = Some(key);
                        self.set_phase(Phase::Finished);
                        Vec::new()
                    }
                    SubmitOutcome::InvalidKey => {
                        catalog_info!("Access key rejected");
                        self.reject_key()
                    }
                    SubmitOutcome::Failed(_) => {
                        let message = self.policy.failure_message.clone();
                        self.set_phase(Phase::Failed { message });
                        Vec::new()
                    }
                }
            }
            SubmissionMsg::CooldownElapsed { attempt } => {
                if self.waiting == (Waiting::Cooldown { attempt }) {
                    self.waiting = Waiting::Nothing;
                    self.ask_for_key();
                }
                Vec::new()
            }
        }
    }

    fn process(&mut self, key: String) -> Vec<SubmissionEffect> {
        self.set_phase(Phase::Processing);
        if key.is_empty() {
            return self.reject_key();
        }
        let Some(target_id) = self.target_id.clone() else {
            self.finish(Phase::Idle);
            return Vec::new();
        };
        self.attempt += 1;
        self.waiting = Waiting::Call {
            attempt: self.attempt,
            key: key.clone(),
        };
        vec![SubmissionEffect::CallSubmit {
            attempt: self.attempt,
            key,
            target_id,
        }]
    }

    /// Drops the stored key and asks again, pausing first after too many rejections.
    fn reject_key(&mut self) -> Vec<SubmissionEffect> {
        self.stored_key = None;
        self.rejections += 1;
        let limit = self.policy.cooldown_after_attempts;
        if limit > 0 && self.rejections >= limit {
            self.rejections = 0;
            self.attempt += 1;
            self.waiting = Waiting::Cooldown {
                attempt: self.attempt,
            };
            self.set_phase(Phase::Processing);
            return vec![SubmissionEffect::StartCooldown {
                attempt: self.attempt,
                delay: self.policy.cooldown,
            }];
        }
        self.ask_for_key();
        Vec::new()
    }

    fn ask_for_key(&mut self) {
        self.set_phase(Phase::KeyNeeded {
            value: String::new(),
        });
    }

    fn finish(&mut self, phase: Phase) {
        self.target_id = None;
        self.waiting = Waiting::Nothing;
        self.set_phase(phase);
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.dirty = true;
        }
    }
}
