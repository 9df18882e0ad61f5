//! Semantic ingest client
//!
//! Derives the canonical transcript of a session and submits it together
//! with the session metadata. Sessions without a transcript are never sent.

use daria_common::SessionDocument;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::service_client::ServiceClient;

/// Body of `POST /api/semantic_ingest`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestRequest {
    pub transcript: String,
    pub metadata: Map<String, Value>,
}

impl IngestRequest {
    /// Request for a session, or `None` when no transcript can be derived
    pub fn for_session(session: &SessionDocument) -> Option<Self> {
        Some(Self {
            transcript: session.canonical_transcript()?,
            metadata: session.metadata(),
        })
    }
}

/// Result of ingesting one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Service answered 2xx
    Ingested,
    /// No transcript; nothing was sent
    Skipped,
    /// Non-2xx status, or no status at all when the request itself failed
    Failed { status: Option<u16>, body: String },
}

impl IngestOutcome {
    pub fn is_ingested(&self) -> bool {
        matches!(self, IngestOutcome::Ingested)
    }
}

#[derive(Clone)]
pub struct IngestClient {
    service: ServiceClient,
}

impl IngestClient {
    pub fn new(service: ServiceClient) -> Self {
        Self { service }
    }

    pub async fn ingest(&self, session: &SessionDocument) -> IngestOutcome {
        let Some(request) = IngestRequest::for_session(session) else {
            tracing::debug!("Session {} has no transcript or messages", session.id);
            return IngestOutcome::Skipped;
        };

        tracing::debug!(
            session_id = %session.id,
            transcript_chars = request.transcript.chars().count(),
            "Ingesting session"
        );

        let url = self
            .service
            .endpoint_url(&self.service.config().ingest_path, None);

        match self.service.post(url, Some(&request)).await {
            Ok(reply) if reply.is_success() => IngestOutcome::Ingested,
            Ok(reply) => IngestOutcome::Failed {
                status: Some(reply.status),
                body: reply.body,
            },
            Err(e) => IngestOutcome::Failed {
                status: None,
                body: e.to_string(),
            },
        }
    }
}
