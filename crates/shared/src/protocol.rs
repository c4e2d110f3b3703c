use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Algorithm, RecordId, SubjectId, VenueId};

/// Scalar value held by one field of a [`ResourceRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Parses an operator-typed literal: integers, floats, booleans and `null`
    /// keep their type, anything else is text.
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("null") {
            return FieldValue::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return FieldValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return FieldValue::Bool(false);
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return FieldValue::Integer(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() {
                return FieldValue::Float(value);
            }
        }
        FieldValue::Text(raw.to_string())
    }

    /// A value counts as present when it is not null and not blank text.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Text(text) => !text.trim().is_empty(),
            _ => true,
        }
    }

    /// Text used for display and substring search; `None` for null.
    pub fn search_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("-"),
            FieldValue::Bool(value) => write!(f, "{value}"),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

pub type Fields = BTreeMap<String, FieldValue>;

/// One entity of a managed collection. The identifier is assigned by the
/// remote store; every other column travels in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl ResourceRecord {
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name).and_then(FieldValue::search_text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub skip: u32,
    pub limit: u32,
}

impl ListQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self { skip: 0, limit }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationQuery {
    pub algorithm: Algorithm,
    pub top_n: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonQuery {
    pub top_n: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    pub venue_id: VenueId,
    #[serde(default)]
    pub label: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ranked candidates for one subject. `items` keeps the order the service
/// delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub algorithm: Algorithm,
    pub items: Vec<ScoredItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonOverlap {
    #[serde(default)]
    pub common_items: Vec<VenueId>,
    pub common_count: usize,
    pub common_percent: f64,
}

/// Side-by-side output of both algorithms for the same subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    #[serde(rename = "lightfm", alias = "hybrid")]
    pub hybrid: Vec<ScoredItem>,
    #[serde(rename = "surprise", alias = "collaborative")]
    pub collaborative: Vec<ScoredItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<ComparisonOverlap>,
}

impl ComparisonResult {
    pub fn items(&self, algorithm: Algorithm) -> &[ScoredItem] {
        match algorithm {
            Algorithm::Hybrid => &self.hybrid,
            Algorithm::Collaborative => &self.collaborative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LossFunction {
    #[default]
    Warp,
    Bpr,
    Logistic,
    WarpKos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborativeVariant {
    #[default]
    Svd,
    Svdpp,
    Nmf,
    KnnBasic,
    KnnWithMeans,
    SlopeOne,
    CoClustering,
}

/// Operator-chosen knobs for a training run. Which of them matter depends
/// on the algorithm being trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingOptions {
    pub loss_function: LossFunction,
    pub use_features: bool,
    pub algorithm_variant: CollaborativeVariant,
    pub epoch_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_count: Option<u32>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            loss_function: LossFunction::Warp,
            use_features: true,
            algorithm_variant: CollaborativeVariant::Svd,
            epoch_count: 30,
            learning_rate: None,
            component_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub algorithm: Algorithm,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl TrainingRequest {
    /// Builds the request body carrying only the options the chosen
    /// algorithm reads.
    pub fn from_options(algorithm: Algorithm, options: &TrainingOptions) -> Self {
        let mut parameters = Map::new();
        match algorithm {
            Algorithm::Hybrid => {
                parameters.insert(
                    "lossFunction".into(),
                    serde_json::to_value(options.loss_function).unwrap_or(Value::Null),
                );
                parameters.insert("useFeatures".into(), Value::Bool(options.use_features));
                if let Some(rate) = options.learning_rate {
                    parameters.insert("learningRate".into(), Value::from(rate));
                }
                if let Some(components) = options.component_count {
                    parameters.insert("componentCount".into(), Value::from(components));
                }
            }
            Algorithm::Collaborative => {
                parameters.insert(
                    "algorithmVariant".into(),
                    serde_json::to_value(options.algorithm_variant).unwrap_or(Value::Null),
                );
            }
        }
        parameters.insert("epochCount".into(), Value::from(options.epoch_count));
        Self {
            algorithm,
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Visit,
    Favorite,
    Click,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRequest {
    pub subject_id: SubjectId,
    pub venue_id: VenueId,
    pub interaction_kind: InteractionKind,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionReceipt {
    pub message: String,
    pub subject_id: SubjectId,
    pub venue_id: VenueId,
    pub kind: InteractionKind,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelReadiness {
    Trained,
    NotTrained,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelStatus {
    #[serde(default, rename = "lightfm", alias = "hybrid")]
    pub hybrid: ModelReadiness,
    #[serde(default, rename = "surprise", alias = "collaborative")]
    pub collaborative: ModelReadiness,
}

impl ModelStatus {
    pub fn readiness(&self, algorithm: Algorithm) -> ModelReadiness {
        match algorithm {
            Algorithm::Hybrid => self.hybrid,
            Algorithm::Collaborative => self.collaborative,
        }
    }
}

/// Service readiness as reported by the health check. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub api: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub models: ModelStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }

    pub fn database_connected(&self) -> bool {
        self.database.eq_ignore_ascii_case("connected")
    }
}
