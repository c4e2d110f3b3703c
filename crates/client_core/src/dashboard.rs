//! Landing view: service health next to a sample of each main collection.

use std::sync::Arc;

use shared::{
    domain::ResourceKind,
    protocol::{HealthReport, ListQuery, ResourceRecord},
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::{view_state::ViewState, ConsoleApi};

const SAMPLE_LIMIT: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub health: HealthReport,
    pub people: Vec<ResourceRecord>,
    pub venues: Vec<ResourceRecord>,
    pub preferences: Vec<ResourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    pub snapshot: Option<DashboardSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct DashboardController {
    api: Arc<dyn ConsoleApi>,
    state: ViewState<DashboardView>,
    load_gate: Mutex<()>,
}

impl DashboardController {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            api,
            state: ViewState::new(DashboardView::default()),
            load_gate: Mutex::new(()),
        }
    }

    pub fn state(&self) -> DashboardView {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.state.subscribe()
    }

    /// Checks health and samples people, venues and preferences at once.
    /// The snapshot is replaced only when all four calls succeed.
    pub async fn load(&self) {
        let _in_flight = self.load_gate.lock().await;
        self.state.modify(|view| {
            view.loading = true;
            view.error = None;
        });
        debug!("loading dashboard");

        let sample = ListQuery::with_limit(SAMPLE_LIMIT);
        let (health, people, venues, preferences) = futures::join!(
            self.api.health(),
            self.api.list(ResourceKind::Person, &sample),
            self.api.list(ResourceKind::Venue, &sample),
            self.api.list(ResourceKind::Preference, &sample)
        );

        let combined = health.and_then(|health| {
            Ok(DashboardSnapshot {
                health,
                people: people?,
                venues: venues?,
                preferences: preferences?,
            })
        });
        match combined {
            Ok(snapshot) => {
                debug!(status = %snapshot.health.status, "dashboard loaded");
                self.state.modify(|view| {
                    view.snapshot = Some(snapshot);
                    view.loading = false;
                });
            }
            Err(err) => {
                warn!(error = %err, "dashboard load failed");
                let message = err.describe("failed to load dashboard");
                self.state.modify(|view| {
                    view.error = Some(message);
                    view.loading = false;
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
