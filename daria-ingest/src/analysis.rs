//! Analysis driver
//!
//! Asks the service to analyze an ingested session. The service has exposed
//! the analyze action under more than one URL shape, so every configured
//! template is tried in order until one answers 2xx.

use daria_common::{Error, Result};

use crate::service_client::{ServiceClient, ID_PLACEHOLDER};

/// One candidate analyze endpoint, e.g. `/api/session/{id}/analyze`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate {
    /// Path segment preceding the id, used to report which shape answered
    pub shape: String,
    pub path: String,
}

impl EndpointTemplate {
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(position) = segments.iter().position(|s| s.contains(ID_PLACEHOLDER)) else {
            return Err(Error::Config(format!(
                "analysis endpoint {:?} has no {} placeholder",
                path, ID_PLACEHOLDER
            )));
        };

        let shape = match position {
            0 => path.to_string(),
            n => segments[n - 1].to_string(),
        };

        Ok(Self {
            shape,
            path: path.to_string(),
        })
    }
}

/// A candidate that did not answer 2xx
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub shape: String,
    /// `None` when no response was received
    pub status: Option<u16>,
    pub reason: String,
}

/// Result of analyzing one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Ok { shape: String },
    Exhausted { attempts: Vec<FailedAttempt> },
}

impl AnalysisOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, AnalysisOutcome::Ok { .. })
    }
}

#[derive(Clone)]
pub struct AnalysisDriver {
    service: ServiceClient,
    endpoints: Vec<EndpointTemplate>,
}

impl AnalysisDriver {
    /// Driver over the endpoint templates configured on the client
    pub fn new(service: ServiceClient) -> Result<Self> {
        let endpoints = service
            .config()
            .analysis_endpoints
            .iter()
            .map(|path| EndpointTemplate::parse(path))
            .collect::<Result<Vec<_>>>()?;

        if endpoints.is_empty() {
            return Err(Error::Config(
                "at least one analysis endpoint is required".to_string(),
            ));
        }

        Ok(Self { service, endpoints })
    }

    pub fn endpoints(&self) -> &[EndpointTemplate] {
        &self.endpoints
    }

    /// Try every endpoint in order; the first 2xx wins
    ///
    /// Network errors and non-2xx statuses only fail the candidate at hand.
    pub async fn analyze(&self, session_id: &str) -> AnalysisOutcome {
        let mut attempts = Vec::new();

        for endpoint in &self.endpoints {
            let url = self.service.endpoint_url(&endpoint.path, Some(session_id));

            match self.service.post::<()>(url, None).await {
                Ok(reply) if reply.is_success() => {
                    return AnalysisOutcome::Ok {
                        shape: endpoint.shape.clone(),
                    };
                }
                Ok(reply) => {
                    tracing::debug!(
                        session_id = session_id,
                        shape = %endpoint.shape,
                        status = reply.status,
                        "Analysis endpoint rejected request"
                    );
                    attempts.push(FailedAttempt {
                        shape: endpoint.shape.clone(),
                        status: Some(reply.status),
                        reason: reply.body,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Error analyzing {} at {}: {}",
                        session_id,
                        endpoint.path,
                        e
                    );
                    attempts.push(FailedAttempt {
                        shape: endpoint.shape.clone(),
                        status: None,
                        reason: e.to_string(),
                    });
                }
            }
        }

        AnalysisOutcome::Exhausted { attempts }
    }
}
