//! In-memory `ConsoleApi` used by controller tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use async_trait::async_trait;
use shared::{
    domain::{Algorithm, RecordId, ResourceKind, SubjectId},
    protocol::{
        ComparisonQuery, ComparisonResult, FieldValue, Fields, HealthReport, InteractionReceipt,
        InteractionRequest, ListQuery, ModelStatus, RecommendationQuery, RecommendationResult,
        ResourceRecord, ScoredItem, TrainingRequest, TrainingResult,
    },
};
use tokio::sync::oneshot;

use crate::{ClientError, ConsoleApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FakeOp {
    List(ResourceKind),
    Create(ResourceKind),
    Update(ResourceKind),
    Delete(ResourceKind),
    Recommend(Algorithm),
    ColdStart,
    Compare,
    Train(Algorithm),
    Interaction,
    Health,
}

type Gate<T> = oneshot::Receiver<Result<T, ClientError>>;
type GateQueue<K, T> = Mutex<HashMap<K, Vec<Gate<T>>>>;

fn queue_gate<K: Eq + std::hash::Hash, T>(
    gates: &GateQueue<K, T>,
    key: K,
) -> oneshot::Sender<Result<T, ClientError>> {
    let (tx, rx) = oneshot::channel();
    gates.lock().unwrap().entry(key).or_default().push(rx);
    tx
}

fn next_gate<K: Eq + std::hash::Hash, T>(gates: &GateQueue<K, T>, key: &K) -> Option<Gate<T>> {
    gates
        .lock()
        .unwrap()
        .get_mut(key)
        .filter(|queued| !queued.is_empty())
        .map(|queued| queued.remove(0))
}

async fn pass_gate<T>(gate: Gate<T>) -> Result<T, ClientError> {
    gate.await
        .unwrap_or_else(|_| Err(ClientError::Network("gate dropped".into())))
}

#[derive(Default)]
pub(crate) struct FakeConsoleApi {
    records: Mutex<BTreeMap<ResourceKind, Vec<ResourceRecord>>>,
    next_id: Mutex<i64>,
    failures: Mutex<HashMap<FakeOp, ClientError>>,
    recommendations: Mutex<HashMap<Algorithm, RecommendationResult>>,
    comparison: Mutex<Option<ComparisonResult>>,
    recommendation_gates: Mutex<HashMap<SubjectId, Gate<RecommendationResult>>>,
    training_gates: GateQueue<Algorithm, TrainingResult>,
    list_gates: GateQueue<ResourceKind, Vec<ResourceRecord>>,
    calls: Mutex<Vec<FakeOp>>,
}

impl FakeConsoleApi {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Mutex::new(100),
            ..Self::default()
        }
    }

    pub(crate) fn seed(&self, kind: ResourceKind, records: Vec<ResourceRecord>) {
        self.records.lock().unwrap().insert(kind, records);
    }

    pub(crate) fn records(&self, kind: ResourceKind) -> Vec<ResourceRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn fail(&self, op: FakeOp, err: ClientError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub(crate) fn recover(&self, op: FakeOp) {
        self.failures.lock().unwrap().remove(&op);
    }

    pub(crate) fn set_recommendation(&self, result: RecommendationResult) {
        self.recommendations
            .lock()
            .unwrap()
            .insert(result.algorithm, result);
    }

    pub(crate) fn set_comparison(&self, result: ComparisonResult) {
        *self.comparison.lock().unwrap() = Some(result);
    }

    /// The next `recommend` for `subject` waits until the returned sender
    /// resolves it.
    pub(crate) fn gate_recommendation(
        &self,
        subject: SubjectId,
    ) -> oneshot::Sender<Result<RecommendationResult, ClientError>> {
        let (tx, rx) = oneshot::channel();
        self.recommendation_gates
            .lock()
            .unwrap()
            .insert(subject, rx);
        tx
    }

    /// Queues a gate consumed by the next `train` for `algorithm`.
    pub(crate) fn gate_training(
        &self,
        algorithm: Algorithm,
    ) -> oneshot::Sender<Result<TrainingResult, ClientError>> {
        queue_gate(&self.training_gates, algorithm)
    }

    /// Queues a gate consumed by the next `list` of `kind`. Ungated lists
    /// answer from the seeded records.
    pub(crate) fn gate_list(
        &self,
        kind: ResourceKind,
    ) -> oneshot::Sender<Result<Vec<ResourceRecord>, ClientError>> {
        queue_gate(&self.list_gates, kind)
    }

    pub(crate) fn calls(&self) -> Vec<FakeOp> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, op: FakeOp) -> usize {
        self.calls().into_iter().filter(|call| *call == op).count()
    }

    fn enter(&self, op: FakeOp) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(op);
        match self.failures.lock().unwrap().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub(crate) fn record(id: i64, fields: &[(&str, FieldValue)]) -> ResourceRecord {
    ResourceRecord::new(
        RecordId(id),
        fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    )
}

pub(crate) fn fields(pairs: &[(&str, &str)]) -> Fields {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), FieldValue::from(*value)))
        .collect()
}

pub(crate) fn scored(venue: i64, label: &str, score: f64) -> ScoredItem {
    ScoredItem {
        venue_id: shared::domain::VenueId(venue),
        label: label.to_string(),
        score,
        reason: None,
    }
}

pub(crate) fn validation(detail: &str) -> ClientError {
    ClientError::Validation {
        detail: Some(detail.to_string()),
    }
}

#[async_trait]
impl ConsoleApi for FakeConsoleApi {
    async fn list(
        &self,
        kind: ResourceKind,
        query: &ListQuery,
    ) -> Result<Vec<ResourceRecord>, ClientError> {
        self.enter(FakeOp::List(kind))?;
        let gate = next_gate(&self.list_gates, &kind);
        let mut records = match gate {
            Some(gate) => pass_gate(gate).await?,
            None => self.records(kind),
        };
        records.truncate(query.limit as usize);
        Ok(records)
    }

    async fn get(&self, kind: ResourceKind, id: RecordId) -> Result<ResourceRecord, ClientError> {
        self.records(kind)
            .into_iter()
            .find(|record| record.id == id)
            .ok_or(ClientError::NotFound { detail: None })
    }

    async fn create(
        &self,
        kind: ResourceKind,
        fields: &Fields,
    ) -> Result<ResourceRecord, ClientError> {
        self.enter(FakeOp::Create(kind))?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let created = ResourceRecord::new(RecordId(id), fields.clone());
        self.records
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: RecordId,
        fields: &Fields,
    ) -> Result<ResourceRecord, ClientError> {
        self.enter(FakeOp::Update(kind))?;
        let mut records = self.records.lock().unwrap();
        let existing = records
            .entry(kind)
            .or_default()
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(ClientError::NotFound { detail: None })?;
        for (name, value) in fields {
            existing.fields.insert(name.clone(), value.clone());
        }
        Ok(existing.clone())
    }

    async fn delete(&self, kind: ResourceKind, id: RecordId) -> Result<(), ClientError> {
        self.enter(FakeOp::Delete(kind))?;
        let mut records = self.records.lock().unwrap();
        let collection = records.entry(kind).or_default();
        let before = collection.len();
        collection.retain(|record| record.id != id);
        if collection.len() == before {
            return Err(ClientError::NotFound { detail: None });
        }
        Ok(())
    }

    async fn recommend(
        &self,
        subject: SubjectId,
        query: &RecommendationQuery,
    ) -> Result<RecommendationResult, ClientError> {
        self.enter(FakeOp::Recommend(query.algorithm))?;
        let gate = self.recommendation_gates.lock().unwrap().remove(&subject);
        if let Some(gate) = gate {
            return pass_gate(gate).await;
        }
        self.recommendations
            .lock()
            .unwrap()
            .get(&query.algorithm)
            .cloned()
            .ok_or(ClientError::NotFound { detail: None })
    }

    async fn cold_start(
        &self,
        _subject: SubjectId,
        query: &RecommendationQuery,
    ) -> Result<RecommendationResult, ClientError> {
        self.enter(FakeOp::ColdStart)?;
        self.recommendations
            .lock()
            .unwrap()
            .get(&query.algorithm)
            .cloned()
            .ok_or(ClientError::NotFound { detail: None })
    }

    async fn compare(
        &self,
        _subject: SubjectId,
        _query: &ComparisonQuery,
    ) -> Result<ComparisonResult, ClientError> {
        self.enter(FakeOp::Compare)?;
        self.comparison
            .lock()
            .unwrap()
            .clone()
            .ok_or(ClientError::NotFound { detail: None })
    }

    async fn train(&self, request: &TrainingRequest) -> Result<TrainingResult, ClientError> {
        self.enter(FakeOp::Train(request.algorithm))?;
        let gate = next_gate(&self.training_gates, &request.algorithm);
        match gate {
            Some(gate) => pass_gate(gate).await,
            None => Ok(TrainingResult {
                message: format!("{} trained", request.algorithm),
                metrics: None,
            }),
        }
    }

    async fn record_interaction(
        &self,
        request: &InteractionRequest,
    ) -> Result<InteractionReceipt, ClientError> {
        self.enter(FakeOp::Interaction)?;
        Ok(InteractionReceipt {
            message: "recorded".into(),
            subject_id: request.subject_id,
            venue_id: request.venue_id,
            kind: request.interaction_kind,
            score: 5,
        })
    }

    async fn health(&self) -> Result<HealthReport, ClientError> {
        self.enter(FakeOp::Health)?;
        Ok(HealthReport {
            status: "healthy".into(),
            api: "online".into(),
            database: "connected".into(),
            models: ModelStatus::default(),
        })
    }
}
