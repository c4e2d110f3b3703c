use std::sync::Arc;

use futures::future::join;
use shared::{
    domain::{Algorithm, SubjectId},
    protocol::{
        ComparisonQuery, ComparisonResult, InteractionReceipt, InteractionRequest,
        RecommendationQuery, RecommendationResult,
    },
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    error::GENERIC_FAILURE_MESSAGE,
    view_state::{RequestOutcome, RequestToken, ViewState},
    ClientError, ConsoleApi,
};

pub const COMPARISON_FAILED_MESSAGE: &str = "comparison could not complete";

/// How both algorithms' rankings are retrieved for a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparisonStrategy {
    /// One call to the comparison endpoint.
    #[default]
    Combined,
    /// One recommendation call per algorithm, issued concurrently.
    Parallel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationPayload {
    Single(RecommendationResult),
    Comparison(ComparisonResult),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecommendationPhase {
    #[default]
    Idle,
    Loading,
    Ready(RecommendationPayload),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationState {
    pub subject: Option<SubjectId>,
    pub algorithm: Algorithm,
    pub phase: RecommendationPhase,
    /// Token of the most recently issued request.
    pub token: RequestToken,
}

impl Default for RecommendationState {
    fn default() -> Self {
        Self {
            subject: None,
            algorithm: Algorithm::Hybrid,
            phase: RecommendationPhase::Idle,
            token: RequestToken::default(),
        }
    }
}

pub struct RecommendationController {
    api: Arc<dyn ConsoleApi>,
    strategy: ComparisonStrategy,
    state: ViewState<RecommendationState>,
}

impl RecommendationController {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            api,
            strategy: ComparisonStrategy::default(),
            state: ViewState::new(RecommendationState::default()),
        }
    }

    pub fn with_strategy(mut self, strategy: ComparisonStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn state(&self) -> RecommendationState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecommendationState> {
        self.state.subscribe()
    }

    /// Switching subject drops whatever is displayed or in flight.
    pub fn select_subject(&self, subject: SubjectId) {
        self.state.modify_if(|state| {
            if state.subject == Some(subject) {
                return false;
            }
            state.subject = Some(subject);
            reset(state);
            true
        });
    }

    pub fn select_algorithm(&self, algorithm: Algorithm) {
        self.state.modify_if(|state| {
            if state.algorithm == algorithm {
                return false;
            }
            state.algorithm = algorithm;
            reset(state);
            true
        });
    }

    pub async fn fetch_single(
        &self,
        subject: SubjectId,
        algorithm: Algorithm,
        top_n: u32,
    ) -> RequestOutcome {
        let token = self.begin(subject, Some(algorithm));
        debug!(%subject, %algorithm, top_n, token = token.value(), "fetching recommendations");
        let result = self
            .api
            .recommend(subject, &RecommendationQuery { algorithm, top_n })
            .await;
        self.finish(token, single_phase(result, "failed to fetch recommendations"))
    }

    /// Recommendations for a subject with little or no interaction history.
    pub async fn fetch_cold_start(
        &self,
        subject: SubjectId,
        algorithm: Algorithm,
        top_n: u32,
    ) -> RequestOutcome {
        let token = self.begin(subject, Some(algorithm));
        debug!(%subject, %algorithm, token = token.value(), "fetching cold-start recommendations");
        let result = self
            .api
            .cold_start(subject, &RecommendationQuery { algorithm, top_n })
            .await;
        self.finish(
            token,
            single_phase(result, "failed to fetch cold-start recommendations"),
        )
    }

    /// Ranks the subject with both algorithms. Either both rankings are
    /// shown or neither is.
    pub async fn fetch_comparison(&self, subject: SubjectId, top_n: u32) -> RequestOutcome {
        let token = self.begin(subject, None);
        debug!(%subject, top_n, strategy = ?self.strategy, token = token.value(), "fetching comparison");
        let result = match self.strategy {
            ComparisonStrategy::Combined => {
                self.api.compare(subject, &ComparisonQuery { top_n }).await
            }
            ComparisonStrategy::Parallel => self.compare_in_parallel(subject, top_n).await,
        };
        let phase = match result {
            Ok(comparison) => {
                RecommendationPhase::Ready(RecommendationPayload::Comparison(comparison))
            }
            Err(err) => {
                warn!(%subject, error = %err, "comparison failed");
                RecommendationPhase::Failed(format!(
                    "{COMPARISON_FAILED_MESSAGE}: {}",
                    err.describe(GENERIC_FAILURE_MESSAGE)
                ))
            }
        };
        self.finish(token, phase)
    }

    async fn compare_in_parallel(
        &self,
        subject: SubjectId,
        top_n: u32,
    ) -> Result<ComparisonResult, ClientError> {
        let hybrid = RecommendationQuery {
            algorithm: Algorithm::Hybrid,
            top_n,
        };
        let collaborative = RecommendationQuery {
            algorithm: Algorithm::Collaborative,
            top_n,
        };
        let (hybrid, collaborative) = join(
            self.api.recommend(subject, &hybrid),
            self.api.recommend(subject, &collaborative),
        )
        .await;
        Ok(ComparisonResult {
            hybrid: hybrid?.items,
            collaborative: collaborative?.items,
            overlap: None,
        })
    }

    /// Records an operator-entered interaction. Displayed rankings are left
    /// alone; the signal is picked up by the next training run.
    pub async fn record_interaction(
        &self,
        request: &InteractionRequest,
    ) -> Result<InteractionReceipt, ClientError> {
        let receipt = self.api.record_interaction(request).await.map_err(|err| {
            warn!(subject = %request.subject_id, venue = %request.venue_id, error = %err, "interaction rejected");
            err
        })?;
        info!(subject = %receipt.subject_id, venue = %receipt.venue_id, score = receipt.score, "interaction recorded");
        Ok(receipt)
    }

    fn begin(&self, subject: SubjectId, algorithm: Option<Algorithm>) -> RequestToken {
        let mut issued = RequestToken::default();
        self.state.modify(|state| {
            state.token = state.token.next();
            state.subject = Some(subject);
            if let Some(algorithm) = algorithm {
                state.algorithm = algorithm;
            }
            state.phase = RecommendationPhase::Loading;
            issued = state.token;
        });
        issued
    }

    fn finish(&self, token: RequestToken, phase: RecommendationPhase) -> RequestOutcome {
        let mut latest = token;
        let applied = self.state.modify_if(|state| {
            latest = state.token;
            if state.token != token {
                return false;
            }
            state.phase = phase;
            true
        });
        if applied {
            RequestOutcome::Applied
        } else {
            debug!(
                token = token.value(),
                latest = latest.value(),
                "discarding superseded recommendation response"
            );
            RequestOutcome::Superseded
        }
    }
}

fn reset(state: &mut RecommendationState) {
    state.token = state.token.next();
    state.phase = RecommendationPhase::Idle;
}

fn single_phase(
    result: Result<RecommendationResult, ClientError>,
    fallback: &str,
) -> RecommendationPhase {
    match result {
        Ok(result) => RecommendationPhase::Ready(RecommendationPayload::Single(result)),
        Err(err) => {
            warn!(error = %err, "recommendation request failed");
            RecommendationPhase::Failed(err.describe(fallback))
        }
    }
}

#[cfg(test)]
#[path = "tests/recommendations_tests.rs"]
mod tests;
