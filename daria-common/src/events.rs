//! Pipeline event types
//!
//! Every observable outcome of a sweep or an ingest run is one
//! `PipelineEvent`. Events render as a single log line and serialize as one
//! JSON object tagged by event name.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Zero-byte session file removed
    DeletedEmptySession { session_id: String },

    /// Session file could not be inspected
    SessionIoFailure { session_id: String, reason: String },

    /// Guide left unmodified because it could not be read or interpreted
    SkippedGuide { guide: String, reason: String },

    /// Guide rewritten without references to absent sessions
    UpdatedGuide {
        guide: String,
        removed_ids: Vec<String>,
    },

    /// Session could not be loaded for ingest
    MalformedSession { session_id: String, reason: String },

    Ingested { session_id: String },

    /// No transcript could be derived; nothing was sent
    Skipped { session_id: String },

    /// Ingest endpoint answered with a non-2xx status
    IngestRejected {
        session_id: String,
        status: u16,
        body: String,
    },

    /// Ingest request failed before a status was received
    IngestFailed { session_id: String, reason: String },

    AnalysisOk { session_id: String, shape: String },

    /// Every analysis endpoint candidate failed
    AnalysisFailed { session_id: String },

    /// Run stopped at a session boundary
    Interrupted { remaining: usize },
}

impl PipelineEvent {
    /// Event category name as used in log output
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::DeletedEmptySession { .. } => "deleted_empty_session",
            PipelineEvent::SessionIoFailure { .. } => "session_io_failure",
            PipelineEvent::SkippedGuide { .. } => "skipped_guide",
            PipelineEvent::UpdatedGuide { .. } => "updated_guide",
            PipelineEvent::MalformedSession { .. } => "malformed_session",
            PipelineEvent::Ingested { .. } => "ingested",
            PipelineEvent::Skipped { .. } => "skipped",
            PipelineEvent::IngestRejected { .. } => "ingest_rejected",
            PipelineEvent::IngestFailed { .. } => "ingest_failed",
            PipelineEvent::AnalysisOk { .. } => "analysis_ok",
            PipelineEvent::AnalysisFailed { .. } => "analysis_failed",
            PipelineEvent::Interrupted { .. } => "interrupted",
        }
    }

    /// True for events reporting a per-item failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PipelineEvent::SessionIoFailure { .. }
                | PipelineEvent::SkippedGuide { .. }
                | PipelineEvent::MalformedSession { .. }
                | PipelineEvent::IngestRejected { .. }
                | PipelineEvent::IngestFailed { .. }
                | PipelineEvent::AnalysisFailed { .. }
        )
    }

    /// Emit the event as one log line
    pub fn log(&self) {
        if self.is_failure() {
            tracing::warn!("{}", self);
        } else {
            tracing::info!("{}", self);
        }
    }

    /// One-line JSON rendering
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"event\":\"{}\"}}", self.name()))
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            PipelineEvent::DeletedEmptySession { session_id }
            | PipelineEvent::Ingested { session_id }
            | PipelineEvent::Skipped { session_id }
            | PipelineEvent::AnalysisFailed { session_id } => write!(f, "{name}({session_id})"),
            PipelineEvent::SessionIoFailure { session_id, reason }
            | PipelineEvent::MalformedSession { session_id, reason }
            | PipelineEvent::IngestFailed { session_id, reason } => {
                write!(f, "{name}({session_id}): {reason}")
            }
            PipelineEvent::SkippedGuide { guide, reason } => write!(f, "{name}({guide}): {reason}"),
            PipelineEvent::UpdatedGuide { guide, removed_ids } => {
                write!(f, "{name}({guide}): removed [{}]", removed_ids.join(", "))
            }
            PipelineEvent::IngestRejected {
                session_id,
                status,
                body,
            } => write!(
                f,
                "{name}({session_id}, {status}): {}",
                body.trim().replace('\n', " ")
            ),
            PipelineEvent::AnalysisOk { session_id, shape } => {
                write!(f, "{name}({session_id}, {shape})")
            }
            PipelineEvent::Interrupted { remaining } => {
                write!(f, "{name}: {remaining} session(s) not processed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_single_line_per_event() {
        let event = PipelineEvent::UpdatedGuide {
            guide: "G.json".to_string(),
            removed_ids: vec!["B".to_string(), "C".to_string()],
        };
        assert_eq!(event.to_string(), "updated_guide(G.json): removed [B, C]");

        let event = PipelineEvent::AnalysisOk {
            session_id: "E".to_string(),
            shape: "research_session".to_string(),
        };
        assert_eq!(event.to_string(), "analysis_ok(E, research_session)");

        let event = PipelineEvent::IngestRejected {
            session_id: "D".to_string(),
            status: 500,
            body: "boom\n".to_string(),
        };
        assert_eq!(event.to_string(), "ingest_rejected(D, 500): boom");
    }

    #[test]
    fn test_json_line_is_tagged() {
        let event = PipelineEvent::DeletedEmptySession {
            session_id: "B".to_string(),
        };
        assert_eq!(
            event.to_json_line(),
            r#"{"event":"deleted_empty_session","session_id":"B"}"#
        );

        let rejected = PipelineEvent::IngestRejected {
            session_id: "D".to_string(),
            status: 500,
            body: "boom".to_string(),
        };
        let parsed: serde_json::Value = serde_json::from_str(&rejected.to_json_line()).unwrap();
        assert_eq!(parsed["event"], "ingest_rejected");
        assert_eq!(parsed["status"], 500);
    }

    #[test]
    fn test_failure_classification() {
        assert!(PipelineEvent::AnalysisFailed {
            session_id: "x".into()
        }
        .is_failure());
        assert!(!PipelineEvent::Skipped {
            session_id: "x".into()
        }
        .is_failure());
    }
}
