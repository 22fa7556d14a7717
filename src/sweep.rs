//! # Sweeper
//!
//! Best-effort bulk deletion of code repositories, used to clean up test
//! accounts after interrupted runs.
//!
//! Pages are listed and deletes issued sequentially. A failed delete is
//! logged, recorded in the [`SweepReport`], and the sweep moves on; only a
//! listing failure aborts, and even that is downgraded to a skip when the
//! region simply does not offer the API.

use crate::constants::CODE_REPOSITORY_STATE_TYPE;
use crate::error::{ReconcilerError, RemoteApiError};
use crate::observability::metrics;
use crate::provider::{CodeRepositoryApi, RegionalClientFactory};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of one delete attempt during a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "message")]
pub enum SweepItemResult {
    Deleted,
    /// Removed by someone else between listing and delete
    AlreadyGone,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepOutcome {
    pub name: String,
    pub result: SweepItemResult,
}

/// Per-item outcomes of sweeping one region
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub region: String,
    pub outcomes: Vec<SweepOutcome>,
    /// Set when the region does not support the API and nothing was attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl SweepReport {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn deleted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result == SweepItemResult::Deleted)
            .count()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&SweepOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, SweepItemResult::Failed(_)))
            .collect()
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

/// Error code and message fragment of listing errors that mean "this region
/// cannot be swept" rather than "the sweep failed". An empty fragment matches
/// any message.
const SKIPPABLE_SWEEP_ERRORS: &[(&str, &str)] = &[
    ("UnsupportedOperation", ""),
    ("AccessDeniedException", ""),
    ("InvalidParameterValue", "not permitted in this API version for your account"),
    ("InvalidParameterValue", "Access Denied to API Version"),
    ("BadRequestException", "not supported"),
    ("InvalidAction", "is not valid"),
    ("InvalidAction", "Unavailable Operation"),
    ("InvalidSignatureException", "Signature expired"),
    ("UnknownOperationException", "Operation is disabled in this region"),
    (
        "UnknownOperationException",
        "The requested operation is not supported in the called region",
    ),
    ("UnrecognizedClientException", ""),
    ("ValidationException", "Account is not whitelisted to use this feature"),
];

/// Whether a listing error should skip the region instead of failing the sweep
#[must_use]
pub fn is_skippable_sweep_error(err: &RemoteApiError) -> bool {
    let RemoteApiError::Remote { code, message, .. } = err else {
        return false;
    };
    match code.as_deref() {
        Some(code) => SKIPPABLE_SWEEP_ERRORS
            .iter()
            .any(|(c, fragment)| *c == code && message.contains(fragment)),
        // No endpoint for the region at all
        None => message.contains("dispatch failure") || message.contains("send request failed"),
    }
}

/// Sweep every code repository reachable through `api`
pub async fn sweep_api(api: &dyn CodeRepositoryApi) -> Result<SweepReport, ReconcilerError> {
    let region = api.region().to_string();
    let mut report = SweepReport {
        region: region.clone(),
        ..SweepReport::default()
    };
    let mut next_token = None;

    loop {
        let page = match api.list_page(next_token.take()).await {
            Ok(page) => page,
            Err(e) if is_skippable_sweep_error(&e) => {
                warn!(
                    "Skipping SageMaker Code Repository sweep for {}: {}",
                    region, e
                );
                metrics::increment_sweeps_skipped();
                report.skipped = Some(e.to_string());
                return Ok(report);
            }
            Err(e) => {
                return Err(ReconcilerError::Listing { region, source: e });
            }
        };

        for item in page.items {
            info!("Deleting SageMaker Code Repository: {}", item.name);
            let result = match api.delete(&item.name).await {
                Ok(()) => {
                    metrics::increment_sweep_deleted();
                    SweepItemResult::Deleted
                }
                Err(RemoteApiError::NotFound { .. }) => SweepItemResult::AlreadyGone,
                Err(e) => {
                    error!(
                        "Error deleting SageMaker Code Repository ({}): {}",
                        item.name, e
                    );
                    metrics::increment_sweep_failures();
                    SweepItemResult::Failed(e.to_string())
                }
            };
            report.outcomes.push(SweepOutcome {
                name: item.name,
                result,
            });
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    info!(
        "Swept {} SageMaker Code Repositories in {} ({} failed)",
        report.attempted(),
        region,
        report.failures().len()
    );
    Ok(report)
}

/// Region-aware sweeper for code repositories
#[derive(Clone)]
pub struct Sweeper {
    factory: Arc<dyn RegionalClientFactory>,
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

impl Sweeper {
    pub fn new(factory: Arc<dyn RegionalClientFactory>) -> Self {
        Self { factory }
    }

    /// Name the sweeper is registered under
    #[must_use]
    pub fn name(&self) -> &'static str {
        CODE_REPOSITORY_STATE_TYPE
    }

    /// Sweep one region
    pub async fn sweep_region(&self, region: &str) -> Result<SweepReport, ReconcilerError> {
        let api = self.factory.client_for_region(region).await?;
        sweep_api(api.as_ref()).await
    }

    /// Sweep regions one after another; a failing region does not stop the rest
    pub async fn sweep_regions(
        &self,
        regions: &[String],
    ) -> Vec<(String, Result<SweepReport, ReconcilerError>)> {
        let mut results = Vec::with_capacity(regions.len());
        for region in regions {
            let result = self.sweep_region(region).await;
            if let Err(e) = &result {
                error!("Sweeper {} failed for {}: {}", self.name(), region, e);
            }
            results.push((region.clone(), result));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(code: Option<&str>, message: &str) -> RemoteApiError {
        RemoteApiError::remote("ListCodeRepositories", code.map(ToString::to_string), message)
    }

    #[test]
    fn test_unsupported_region_is_skippable() {
        assert!(is_skippable_sweep_error(&remote(
            Some("UnknownOperationException"),
            "The requested operation is not supported in the called region."
        )));
        assert!(is_skippable_sweep_error(&remote(Some("AccessDeniedException"), "")));
        assert!(is_skippable_sweep_error(&remote(None, "dispatch failure")));
    }

    #[test]
    fn test_real_failures_are_not_skippable() {
        assert!(!is_skippable_sweep_error(&remote(
            Some("ThrottlingException"),
            "Rate exceeded"
        )));
        assert!(!is_skippable_sweep_error(&remote(
            Some("ValidationException"),
            "1 validation error detected"
        )));
        assert!(!is_skippable_sweep_error(&RemoteApiError::not_found("x")));
    }

    #[test]
    fn test_report_counts() {
        let report = SweepReport {
            region: "us-west-2".to_string(),
            outcomes: vec![
                SweepOutcome {
                    name: "a".to_string(),
                    result: SweepItemResult::Deleted,
                },
                SweepOutcome {
                    name: "b".to_string(),
                    result: SweepItemResult::Failed("boom".to_string()),
                },
                SweepOutcome {
                    name: "c".to_string(),
                    result: SweepItemResult::AlreadyGone,
                },
            ],
            skipped: None,
        };
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.failures().len(), 1);
        assert!(!report.is_skipped());
    }
}
