use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{RecordId, ResourceKind, SubjectId},
    protocol::{
        ComparisonQuery, ComparisonResult, Fields, HealthReport, InteractionReceipt,
        InteractionRequest, ListQuery, RecommendationQuery, RecommendationResult, ResourceRecord,
        TrainingRequest, TrainingResult,
    },
};
use tracing::{debug, warn};
use url::Url;

pub mod dashboard;
pub mod error;
pub mod recommendations;
pub mod resource_list;
#[cfg(test)]
pub(crate) mod testing;
pub mod training;
pub mod view_state;

pub use dashboard::{DashboardController, DashboardSnapshot, DashboardView};
pub use error::ClientError;
pub use recommendations::{
    ComparisonStrategy, RecommendationController, RecommendationPayload, RecommendationPhase,
    RecommendationState,
};
pub use resource_list::{
    filter_records, DeletionConfirmed, EditMode, EditSession, ListView, ResourceListController,
    SubmitError,
};
pub use training::{
    TrainingController, TrainingPhase, TrainingReport, TrainingSlot, TrainingState,
};
pub use view_state::{RequestOutcome, RequestToken, ViewState};

pub const DEFAULT_LIST_LIMIT: u32 = 1000;
pub const DEFAULT_TOP_N: u32 = 10;

/// Remote boundary shared by every controller. Implementations hold no view
/// state; each call is one round trip and failures come back classified.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn list(
        &self,
        kind: ResourceKind,
        query: &ListQuery,
    ) -> Result<Vec<ResourceRecord>, ClientError>;
    async fn get(&self, kind: ResourceKind, id: RecordId) -> Result<ResourceRecord, ClientError>;
    async fn create(
        &self,
        kind: ResourceKind,
        fields: &Fields,
    ) -> Result<ResourceRecord, ClientError>;
    async fn update(
        &self,
        kind: ResourceKind,
        id: RecordId,
        fields: &Fields,
    ) -> Result<ResourceRecord, ClientError>;
    async fn delete(&self, kind: ResourceKind, id: RecordId) -> Result<(), ClientError>;
    async fn recommend(
        &self,
        subject: SubjectId,
        query: &RecommendationQuery,
    ) -> Result<RecommendationResult, ClientError>;
    async fn cold_start(
        &self,
        subject: SubjectId,
        query: &RecommendationQuery,
    ) -> Result<RecommendationResult, ClientError>;
    async fn compare(
        &self,
        subject: SubjectId,
        query: &ComparisonQuery,
    ) -> Result<ComparisonResult, ClientError>;
    async fn train(&self, request: &TrainingRequest) -> Result<TrainingResult, ClientError>;
    async fn record_interaction(
        &self,
        request: &InteractionRequest,
    ) -> Result<InteractionReceipt, ClientError>;
    async fn health(&self) -> Result<HealthReport, ClientError>;
}

/// Trims whitespace and trailing slashes and checks the scheme.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).with_context(|| format!("invalid base url '{raw}'"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(anyhow::anyhow!(
            "base url must use http:// or https:// (got {other}://)"
        )),
    }
}

pub struct HttpConsoleClient {
    http: Client,
    base_url: String,
}

impl HttpConsoleClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// Client whose requests give up after `timeout`; the only deadline the
    /// console applies.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_checked(&self, request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await.map_err(|err| {
            warn!(error = %err, "request did not complete");
            ClientError::from(err)
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = ClientError::from_status(status.as_u16(), &body);
        debug!(status = status.as_u16(), error = %err, "request rejected");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send_checked(request).await?;
        let status = response.status().as_u16();
        response.json::<T>().await.map_err(|err| {
            warn!(status, error = %err, "response body did not match expected shape");
            ClientError::Unknown {
                status: Some(status),
                detail: None,
            }
        })
    }
}

#[async_trait]
impl ConsoleApi for HttpConsoleClient {
    async fn list(
        &self,
        kind: ResourceKind,
        query: &ListQuery,
    ) -> Result<Vec<ResourceRecord>, ClientError> {
        debug!(%kind, limit = query.limit, "GET collection");
        self.send_json(
            self.http
                .get(self.url(kind.collection_path()))
                .query(query),
        )
        .await
    }

    async fn get(&self, kind: ResourceKind, id: RecordId) -> Result<ResourceRecord, ClientError> {
        debug!(%kind, %id, "GET record");
        self.send_json(self.http.get(self.url(&kind.record_path(id))))
            .await
    }

    async fn create(
        &self,
        kind: ResourceKind,
        fields: &Fields,
    ) -> Result<ResourceRecord, ClientError> {
        debug!(%kind, "POST record");
        self.send_json(
            self.http
                .post(self.url(kind.collection_path()))
                .json(fields),
        )
        .await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: RecordId,
        fields: &Fields,
    ) -> Result<ResourceRecord, ClientError> {
        debug!(%kind, %id, "PUT record");
        self.send_json(self.http.put(self.url(&kind.record_path(id))).json(fields))
            .await
    }

    async fn delete(&self, kind: ResourceKind, id: RecordId) -> Result<(), ClientError> {
        debug!(%kind, %id, "DELETE record");
        self.send_checked(self.http.delete(self.url(&kind.record_path(id))))
            .await?;
        Ok(())
    }

    async fn recommend(
        &self,
        subject: SubjectId,
        query: &RecommendationQuery,
    ) -> Result<RecommendationResult, ClientError> {
        debug!(%subject, algorithm = %query.algorithm, top_n = query.top_n, "GET recommendations");
        self.send_json(
            self.http
                .get(self.url(&format!("/recommendations/subject/{}", subject.0)))
                .query(query),
        )
        .await
    }

    async fn cold_start(
        &self,
        subject: SubjectId,
        query: &RecommendationQuery,
    ) -> Result<RecommendationResult, ClientError> {
        debug!(%subject, algorithm = %query.algorithm, "GET cold-start recommendations");
        self.send_json(
            self.http
                .get(self.url(&format!(
                    "/recommendations/cold-start/subject/{}",
                    subject.0
                )))
                .query(query),
        )
        .await
    }

    async fn compare(
        &self,
        subject: SubjectId,
        query: &ComparisonQuery,
    ) -> Result<ComparisonResult, ClientError> {
        debug!(%subject, top_n = query.top_n, "GET comparison");
        self.send_json(
            self.http
                .get(self.url(&format!("/recommendations/compare/{}", subject.0)))
                .query(query),
        )
        .await
    }

    async fn train(&self, request: &TrainingRequest) -> Result<TrainingResult, ClientError> {
        debug!(algorithm = %request.algorithm, "POST training run");
        self.send_json(
            self.http
                .post(self.url("/recommendations/train"))
                .json(request),
        )
        .await
    }

    async fn record_interaction(
        &self,
        request: &InteractionRequest,
    ) -> Result<InteractionReceipt, ClientError> {
        debug!(subject = %request.subject_id, venue = %request.venue_id, "POST interaction");
        self.send_json(
            self.http
                .post(self.url("/recommendations/interaction"))
                .json(request),
        )
        .await
    }

    async fn health(&self) -> Result<HealthReport, ClientError> {
        self.send_json(self.http.get(self.url("/health"))).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
