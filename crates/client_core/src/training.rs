//! One-shot (re)training workflow, one independent slot per algorithm.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::Algorithm,
    protocol::{TrainingOptions, TrainingRequest, TrainingResult},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    view_state::{RequestOutcome, RequestToken, ViewState},
    ConsoleApi,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub algorithm: Algorithm,
    pub result: TrainingResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TrainingReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum TrainingPhase {
    #[default]
    Idle,
    Submitting {
        started_at: DateTime<Utc>,
    },
    Succeeded(TrainingReport),
    Failed {
        message: String,
    },
}

impl TrainingPhase {
    pub fn is_submitting(&self) -> bool {
        matches!(self, TrainingPhase::Submitting { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingSlot {
    pub phase: TrainingPhase,
    pub token: RequestToken,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingState {
    pub hybrid: TrainingSlot,
    pub collaborative: TrainingSlot,
}

impl TrainingState {
    pub fn slot(&self, algorithm: Algorithm) -> &TrainingSlot {
        match algorithm {
            Algorithm::Hybrid => &self.hybrid,
            Algorithm::Collaborative => &self.collaborative,
        }
    }

    fn slot_mut(&mut self, algorithm: Algorithm) -> &mut TrainingSlot {
        match algorithm {
            Algorithm::Hybrid => &mut self.hybrid,
            Algorithm::Collaborative => &mut self.collaborative,
        }
    }
}

pub struct TrainingController {
    api: Arc<dyn ConsoleApi>,
    state: ViewState<TrainingState>,
}

impl TrainingController {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            api,
            state: ViewState::new(TrainingState::default()),
        }
    }

    pub fn state(&self) -> TrainingState {
        self.state.snapshot()
    }

    pub fn phase(&self, algorithm: Algorithm) -> TrainingPhase {
        self.state.snapshot().slot(algorithm).phase.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrainingState> {
        self.state.subscribe()
    }

    /// Starts a fresh attempt for `algorithm`. The previous outcome for that
    /// algorithm is cleared immediately; the other algorithm's slot is not
    /// touched.
    pub async fn train(&self, algorithm: Algorithm, options: &TrainingOptions) -> RequestOutcome {
        let started_at = Utc::now();
        let mut token = RequestToken::default();
        self.state.modify(|state| {
            let slot = state.slot_mut(algorithm);
            slot.token = slot.token.next();
            slot.phase = TrainingPhase::Submitting { started_at };
            token = slot.token;
        });

        let request = TrainingRequest::from_options(algorithm, options);
        info!(%algorithm, epochs = options.epoch_count, "training submitted");
        let phase = match self.api.train(&request).await {
            Ok(result) => {
                info!(%algorithm, message = %result.message, "training finished");
                TrainingPhase::Succeeded(TrainingReport {
                    algorithm,
                    result,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Err(err) => {
                warn!(%algorithm, error = %err, "training failed");
                TrainingPhase::Failed {
                    message: err.describe(&format!("training {} failed", algorithm.label())),
                }
            }
        };

        let applied = self.state.modify_if(|state| {
            let slot = state.slot_mut(algorithm);
            if slot.token != token {
                return false;
            }
            slot.phase = phase;
            true
        });
        if applied {
            RequestOutcome::Applied
        } else {
            debug!(%algorithm, token = token.value(), "discarding superseded training response");
            RequestOutcome::Superseded
        }
    }
}

#[cfg(test)]
#[path = "tests/training_tests.rs"]
mod tests;
