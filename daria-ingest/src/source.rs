//! Where the sessions of a run come from
//!
//! - `fs`: the local sessions directory, swept first so only sessions
//!   backed by non-empty files are considered
//! - `service`: the analysis service's own `GET /api/sessions` listing

use std::collections::BTreeSet;

use clap::ValueEnum;
use daria_common::{Error, PipelineEvent, Result, SessionDocument, SessionStore};
use daria_sweep::{IntegritySweeper, SweepReport};
use serde_json::Value;

use crate::service_client::ServiceClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Read the sessions directory
    Fs,
    /// Ask the service for its session list
    Service,
}

/// One session awaiting processing
#[derive(Debug, Clone)]
pub enum PendingSession {
    /// Id of a session file, loaded when its turn comes
    OnDisk(String),
    /// Session object from the service listing
    Fetched(SessionDocument),
    /// Listing entry without a usable id
    Invalid { label: String, reason: String },
}

impl PendingSession {
    pub fn label(&self) -> &str {
        match self {
            PendingSession::OnDisk(id) => id,
            PendingSession::Fetched(doc) => &doc.id,
            PendingSession::Invalid { label, .. } => label,
        }
    }
}

/// Ordered sessions for one run
#[derive(Debug, Clone, Default)]
pub struct SessionBatch {
    store: Option<SessionStore>,
    pub pending: Vec<PendingSession>,
    /// Sweep that produced the batch, for the `fs` source
    pub sweep: Option<SweepReport>,
}

impl SessionBatch {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Materialize a pending session; failures become `malformed_session` events
    pub fn load(&self, pending: &PendingSession) -> std::result::Result<SessionDocument, PipelineEvent> {
        match pending {
            PendingSession::Fetched(doc) => Ok(doc.clone()),
            PendingSession::Invalid { label, reason } => Err(PipelineEvent::MalformedSession {
                session_id: label.clone(),
                reason: reason.clone(),
            }),
            PendingSession::OnDisk(id) => {
                let Some(store) = &self.store else {
                    return Err(PipelineEvent::MalformedSession {
                        session_id: id.clone(),
                        reason: "no session store configured".to_string(),
                    });
                };
                store.load(id).map_err(|e| PipelineEvent::MalformedSession {
                    session_id: id.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Build a batch from the sessions directory
    ///
    /// With `sweep` set the integrity sweeper runs first and its valid set is
    /// used. Otherwise the directory is only read and zero-byte files are
    /// left out.
    pub fn from_filesystem(
        sweeper: &IntegritySweeper,
        sweep: bool,
        only: &BTreeSet<String>,
    ) -> Result<Self> {
        sweeper.check_directories()?;
        let store = sweeper.session_store().clone();

        let (valid_ids, sweep_report) = if sweep {
            let report = sweeper.sweep()?;
            (report.valid_ids.clone(), Some(report))
        } else {
            (non_empty_sessions(&store)?, None)
        };

        let pending = select(valid_ids, only)
            .into_iter()
            .map(PendingSession::OnDisk)
            .collect();

        Ok(Self {
            store: Some(store),
            pending,
            sweep: sweep_report,
        })
    }

    /// Build a batch from `GET /api/sessions`
    pub async fn from_service(client: &ServiceClient, only: &BTreeSet<String>) -> Result<Self> {
        let items = client.list_sessions().await?;
        tracing::info!("Found {} sessions", items.len());

        let pending = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| pending_from_listing(index, item))
            .filter(|p| only.is_empty() || only.contains(p.label()))
            .collect();

        Ok(Self {
            store: None,
            pending,
            sweep: None,
        })
    }
}

fn non_empty_sessions(store: &SessionStore) -> Result<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    for id in store.list_session_ids()? {
        match store.size(&id) {
            Ok(0) => tracing::debug!("Ignoring empty session {}", id),
            Ok(_) => {
                ids.insert(id);
            }
            Err(Error::MissingSession(_)) => {}
            Err(e) => tracing::warn!("Cannot inspect session {}: {}", id, e),
        }
    }
    Ok(ids)
}

fn select(valid_ids: BTreeSet<String>, only: &BTreeSet<String>) -> Vec<String> {
    if only.is_empty() {
        return valid_ids.into_iter().collect();
    }
    for id in only.difference(&valid_ids) {
        tracing::warn!("Requested session {} is not a valid session file", id);
    }
    valid_ids.intersection(only).cloned().collect()
}

/// Turn one listing entry into a pending session
///
/// The id comes from `id`, falling back to `session_id`.
fn pending_from_listing(index: usize, item: Value) -> PendingSession {
    let id = item
        .get("id")
        .and_then(Value::as_str)
        .or_else(|| item.get("session_id").and_then(Value::as_str))
        .map(str::to_string);

    let Some(id) = id else {
        return PendingSession::Invalid {
            label: format!("#{index}"),
            reason: "listing entry has no string id".to_string(),
        };
    };

    match SessionDocument::from_value(id.clone(), item) {
        Ok(doc) => PendingSession::Fetched(doc),
        Err(e) => PendingSession::Invalid {
            label: id,
            reason: e.to_string(),
        },
    }
}
