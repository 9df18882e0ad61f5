//! daria-ingest library interface
//!
//! Submits interview sessions to the semantic analysis service and requests
//! their analysis. Exposes public APIs for the binary and integration tests.

pub mod analysis;
pub mod ingest_client;
pub mod pipeline;
pub mod rate_limiter;
pub mod service_client;
pub mod source;

pub use analysis::{AnalysisDriver, AnalysisOutcome, EndpointTemplate};
pub use ingest_client::{IngestClient, IngestOutcome, IngestRequest};
pub use pipeline::{Pipeline, PipelineReport, PipelineStats, SessionVerdict};
pub use service_client::{HttpReply, ServiceClient};
pub use source::{PendingSession, SessionBatch, SourceKind};
