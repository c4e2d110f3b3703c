//! Generic list/create/edit/delete workflow shared by every managed
//! collection.

use std::sync::Arc;

use futures::future::join;
use shared::{
    domain::{RecordId, ResourceKind},
    protocol::{FieldValue, Fields, ListQuery, ResourceRecord},
};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{view_state::ViewState, ClientError, ConsoleApi, DEFAULT_LIST_LIMIT};

#[derive(Debug, Clone, PartialEq)]
pub enum EditMode {
    Create,
    Edit(ResourceRecord),
}

/// An open create or edit form. At most one exists per list.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub mode: EditMode,
    /// Message from the last rejected submit, shown inline.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub kind: ResourceKind,
    pub items: Vec<ResourceRecord>,
    /// Records of the schema's reference kind, for dropdowns.
    pub references: Vec<ResourceRecord>,
    pub loading: bool,
    pub error: Option<String>,
    pub filter_text: String,
    pub session: Option<EditSession>,
    /// Dismissible message left by a failed deletion.
    pub notice: Option<String>,
}

impl ListView {
    fn empty(kind: ResourceKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            references: Vec::new(),
            loading: false,
            error: None,
            filter_text: String::new(),
            session: None,
            notice: None,
        }
    }

    pub fn visible(&self) -> Vec<&ResourceRecord> {
        filter_records(
            &self.items,
            self.kind.schema().searchable_fields,
            &self.filter_text,
        )
    }

    /// Label of the reference record `record` points at, if it was loaded.
    pub fn reference_label(&self, record: &ResourceRecord) -> Option<String> {
        let schema = self.kind.schema();
        let reference = schema.reference?;
        let id = match record.field(schema.reference_field?)? {
            FieldValue::Integer(id) => RecordId(*id),
            _ => return None,
        };
        self.references
            .iter()
            .find(|candidate| candidate.id == id)?
            .text(reference.schema().label_field)
    }
}

/// Records whose `fields` contain `text` as a case-insensitive substring.
/// Empty text keeps everything.
pub fn filter_records<'a>(
    items: &'a [ResourceRecord],
    fields: &[&str],
    text: &str,
) -> Vec<&'a ResourceRecord> {
    let needle = text.to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|record| {
            fields.iter().any(|field| {
                record
                    .text(field)
                    .is_some_and(|value| value.to_lowercase().contains(&needle))
            })
        })
        .collect()
}

/// Proof that the operator affirmed a deletion. `remove` cannot be called
/// without one.
#[derive(Debug, Clone, Copy)]
pub struct DeletionConfirmed(());

impl DeletionConfirmed {
    pub fn affirmed() -> Self {
        Self(())
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no create or edit session is open")]
    NoOpenSession,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error(transparent)]
    Remote(#[from] ClientError),
}

pub struct ResourceListController {
    api: Arc<dyn ConsoleApi>,
    kind: ResourceKind,
    list_limit: u32,
    state: ViewState<ListView>,
    load_gate: Mutex<()>,
}

impl ResourceListController {
    pub fn new(api: Arc<dyn ConsoleApi>, kind: ResourceKind) -> Self {
        Self {
            api,
            kind,
            list_limit: DEFAULT_LIST_LIMIT,
            state: ViewState::new(ListView::empty(kind)),
            load_gate: Mutex::new(()),
        }
    }

    pub fn with_list_limit(mut self, limit: u32) -> Self {
        self.list_limit = limit;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn state(&self) -> ListView {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.state.subscribe()
    }

    pub fn visible(&self) -> Vec<ResourceRecord> {
        self.state
            .snapshot()
            .visible()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Reloads the collection and, when the schema names one, its reference
    /// collection. Both are committed together or not at all.
    pub async fn load(&self) {
        let _in_flight = self.load_gate.lock().await;
        let kind = self.kind;
        self.state.modify(|view| {
            view.loading = true;
            view.error = None;
        });
        debug!(%kind, limit = self.list_limit, "loading list");

        let query = ListQuery::with_limit(self.list_limit);
        let primary = self.api.list(kind, &query);
        let outcome = match kind.schema().reference {
            Some(reference) => {
                let (items, references) = join(primary, self.api.list(reference, &query)).await;
                match (items, references) {
                    (Ok(items), Ok(references)) => Ok((items, Some(references))),
                    (Err(err), _) | (_, Err(err)) => Err(err),
                }
            }
            None => primary.await.map(|items| (items, None)),
        };

        match outcome {
            Ok((items, references)) => {
                debug!(%kind, count = items.len(), "list loaded");
                self.state.modify(|view| {
                    view.items = items;
                    if let Some(references) = references {
                        view.references = references;
                    }
                    view.loading = false;
                });
            }
            Err(err) => {
                warn!(%kind, error = %err, "list load failed");
                let message = err.describe(&format!("failed to load {kind} list"));
                self.state.modify(|view| {
                    view.error = Some(message);
                    view.loading = false;
                });
            }
        }
    }

    pub fn set_filter(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.modify_if(|view| {
            if view.filter_text == text {
                return false;
            }
            view.filter_text = text;
            true
        });
    }

    pub fn open_create(&self) {
        self.open(EditMode::Create);
    }

    pub fn open_edit(&self, record: ResourceRecord) {
        self.open(EditMode::Edit(record));
    }

    fn open(&self, mode: EditMode) {
        self.state.modify(|view| {
            view.session = Some(EditSession { mode, error: None });
        });
    }

    /// Discards the open session and whatever was typed into it.
    pub fn close_session(&self) {
        self.state.modify_if(|view| view.session.take().is_some());
    }

    /// Sends the open session's fields to the remote store. Success closes
    /// the session and reloads the list; failure leaves the session open
    /// with the reason attached.
    pub async fn submit(&self, mut fields: Fields) -> Result<ResourceRecord, SubmitError> {
        let kind = self.kind;
        let schema = kind.schema();
        let mode = self
            .state
            .snapshot()
            .session
            .map(|session| session.mode)
            .ok_or(SubmitError::NoOpenSession)?;

        let missing: Vec<String> = match &mode {
            EditMode::Create => {
                for (name, default) in schema.create_defaults {
                    if !fields.get(*name).is_some_and(FieldValue::is_present) {
                        fields.insert(name.to_string(), FieldValue::from(*default));
                    }
                }
                schema
                    .required_fields
                    .iter()
                    .filter(|name| !fields.get(**name).is_some_and(FieldValue::is_present))
                    .map(|name| name.to_string())
                    .collect()
            }
            // Edits may omit fields; a supplied required field still has to
            // carry a value.
            EditMode::Edit(_) => schema
                .required_fields
                .iter()
                .filter(|name| fields.get(**name).is_some_and(|value| !value.is_present()))
                .map(|name| name.to_string())
                .collect(),
        };
        if !missing.is_empty() {
            let err = SubmitError::MissingFields(missing);
            self.set_session_error(err.to_string());
            return Err(err);
        }

        let result = match &mode {
            EditMode::Create => self.api.create(kind, &fields).await,
            EditMode::Edit(record) => self.api.update(kind, record.id, &fields).await,
        };
        match result {
            Ok(saved) => {
                info!(%kind, id = %saved.id, "record saved");
                self.close_session();
                self.load().await;
                Ok(saved)
            }
            Err(err) => {
                warn!(%kind, error = %err, "save rejected");
                self.set_session_error(err.describe(&format!("failed to save {kind}")));
                Err(err.into())
            }
        }
    }

    fn set_session_error(&self, message: String) {
        self.state.modify(|view| {
            if let Some(session) = view.session.as_mut() {
                session.error = Some(message);
            }
        });
    }

    pub async fn remove(&self, id: RecordId, _confirmed: DeletionConfirmed) -> Result<(), SubmitError> {
        let kind = self.kind;
        match self.api.delete(kind, id).await {
            Ok(()) => {
                info!(%kind, %id, "record deleted");
                self.state.modify_if(|view| view.notice.take().is_some());
                self.load().await;
                Ok(())
            }
            Err(err) => {
                warn!(%kind, %id, error = %err, "delete failed");
                self.state.modify(|view| {
                    view.notice = Some(format!("failed to delete {kind}"));
                });
                Err(err.into())
            }
        }
    }

    pub fn dismiss_notice(&self) {
        self.state.modify_if(|view| view.notice.take().is_some());
    }
}

#[cfg(test)]
#[path = "tests/resource_list_tests.rs"]
mod tests;
