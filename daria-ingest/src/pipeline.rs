//! Ingest and analysis pipeline
//!
//! Processes a batch strictly in order: each session is ingested and, when
//! the service accepts it, analyzed before the next session starts. The
//! cancellation token is only checked between sessions.

use chrono::{DateTime, Utc};
use daria_common::{PipelineEvent, Result, SessionDocument};
use daria_sweep::SweepStats;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::analysis::{AnalysisDriver, AnalysisOutcome};
use crate::ingest_client::{IngestClient, IngestOutcome};
use crate::service_client::ServiceClient;
use crate::source::SessionBatch;

/// Outcome for one session of the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionVerdict {
    pub session_id: String,
    pub ingest: IngestOutcome,
    /// Present only for ingested sessions
    pub analysis: Option<AnalysisOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub sessions_total: usize,
    pub malformed: usize,
    pub ingested: usize,
    pub skipped: usize,
    pub ingest_failed: usize,
    pub analyzed: usize,
    pub analysis_failed: usize,
}

/// Summary of one run
///
/// Serializes to the closing `--json` line. Events are printed one per line
/// before it, so they are left out here along with the verdicts.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: PipelineStats,
    /// Counters of the sweep that preceded the run, if any
    pub sweep: Option<SweepStats>,
    pub interrupted: bool,
    #[serde(skip)]
    pub verdicts: Vec<SessionVerdict>,
    #[serde(skip)]
    pub events: Vec<PipelineEvent>,
}

impl PipelineReport {
    fn new(sweep: Option<SweepStats>) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            stats: PipelineStats::default(),
            sweep,
            interrupted: false,
            verdicts: Vec::new(),
            events: Vec::new(),
        }
    }

    fn record(&mut self, event: PipelineEvent) {
        event.log();
        self.events.push(event);
    }

    pub fn verdict(&self, session_id: &str) -> Option<&SessionVerdict> {
        self.verdicts.iter().find(|v| v.session_id == session_id)
    }

    /// One-line JSON summary tagged `"event": "summary"`
    pub fn to_json_line(&self) -> String {
        let summary = serde_json::to_value(self).map(|value| match value {
            serde_json::Value::Object(fields) => {
                let mut tagged = serde_json::Map::new();
                tagged.insert("event".to_string(), "summary".into());
                tagged.extend(fields);
                serde_json::Value::Object(tagged)
            }
            other => other,
        });
        match summary {
            Ok(value) => value.to_string(),
            Err(e) => serde_json::json!({"event": "summary", "error": e.to_string()}).to_string(),
        }
    }
}

/// Sequential ingest → analyze driver
pub struct Pipeline {
    ingest: IngestClient,
    analysis: AnalysisDriver,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(service: ServiceClient) -> Result<Self> {
        Ok(Self {
            ingest: IngestClient::new(service.clone()),
            analysis: AnalysisDriver::new(service)?,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop at the next session boundary once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, batch: &SessionBatch) -> PipelineReport {
        let mut report = PipelineReport::new(batch.sweep.as_ref().map(|s| s.stats.clone()));
        report.stats.sessions_total = batch.len();

        for (index, pending) in batch.pending.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.interrupted = true;
                report.record(PipelineEvent::Interrupted {
                    remaining: batch.len() - index,
                });
                break;
            }

            tracing::debug!("Processing session {}", pending.label());
            match batch.load(pending) {
                Ok(session) => self.process(&session, &mut report).await,
                Err(event) => {
                    report.stats.malformed += 1;
                    report.record(event);
                }
            }
        }

        report.finished_at = Utc::now();
        tracing::info!(
            sessions = report.stats.sessions_total,
            ingested = report.stats.ingested,
            skipped = report.stats.skipped,
            ingest_failed = report.stats.ingest_failed,
            analyzed = report.stats.analyzed,
            analysis_failed = report.stats.analysis_failed,
            malformed = report.stats.malformed,
            interrupted = report.interrupted,
            "Pipeline complete"
        );
        report
    }

    /// Ingest one session, then analyze it if the service accepted it
    async fn process(&self, session: &SessionDocument, report: &mut PipelineReport) {
        let session_id = session.id.clone();
        let ingest = self.ingest.ingest(session).await;

        match &ingest {
            IngestOutcome::Ingested => {
                report.stats.ingested += 1;
                report.record(PipelineEvent::Ingested {
                    session_id: session_id.clone(),
                });
            }
            IngestOutcome::Skipped => {
                report.stats.skipped += 1;
                report.record(PipelineEvent::Skipped {
                    session_id: session_id.clone(),
                });
            }
            IngestOutcome::Failed {
                status: Some(status),
                body,
            } => {
                report.stats.ingest_failed += 1;
                report.record(PipelineEvent::IngestRejected {
                    session_id: session_id.clone(),
                    status: *status,
                    body: body.clone(),
                });
            }
            IngestOutcome::Failed { status: None, body } => {
                report.stats.ingest_failed += 1;
                report.record(PipelineEvent::IngestFailed {
                    session_id: session_id.clone(),
                    reason: body.clone(),
                });
            }
        }

        let analysis = if ingest.is_ingested() {
            let outcome = self.analysis.analyze(&session_id).await;
            match &outcome {
                AnalysisOutcome::Ok { shape } => {
                    report.stats.analyzed += 1;
                    report.record(PipelineEvent::AnalysisOk {
                        session_id: session_id.clone(),
                        shape: shape.clone(),
                    });
                }
                AnalysisOutcome::Exhausted { .. } => {
                    report.stats.analysis_failed += 1;
                    report.record(PipelineEvent::AnalysisFailed {
                        session_id: session_id.clone(),
                    });
                }
            }
            Some(outcome)
        } else {
            None
        };

        report.verdicts.push(SessionVerdict {
            session_id,
            ingest,
            analysis,
        });
    }
}
