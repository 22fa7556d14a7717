//! # Reconciler
//!
//! Drives the lifecycle of SageMaker code repositories against a
//! [`CodeRepositoryApi`].
//!
//! ```text
//! ABSENT -> CREATING -> PRESENT -> DELETING -> ABSENT
//! ```
//!
//! `CREATING` and `DELETING` are not observable: every call is synchronous
//! from the reconciler's point of view. The reconciler keeps no state between
//! calls; each operation re-queries the remote system, so a record deleted
//! out-of-band between two calls is simply observed as absent.

use crate::error::{ReconcilerError, RemoteApiError};
use crate::model::{validate_name, CodeRepository, CodeRepositorySpec};
use crate::observability::metrics;
use crate::provider::CodeRepositoryApi;
use crate::sweep::{self, SweepReport};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle operations for code repositories in one region
#[derive(Clone)]
pub struct CodeRepositoryReconciler {
    api: Arc<dyn CodeRepositoryApi>,
}

impl std::fmt::Debug for CodeRepositoryReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeRepositoryReconciler")
            .field("region", &self.api.region())
            .finish_non_exhaustive()
    }
}

impl CodeRepositoryReconciler {
    pub fn new(api: Arc<dyn CodeRepositoryApi>) -> Self {
        Self { api }
    }

    #[must_use]
    pub fn region(&self) -> &str {
        self.api.region()
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn CodeRepositoryApi> {
        &self.api
    }

    /// Create a code repository and return the server's view of it
    ///
    /// The record is re-read after creation so the result carries every
    /// server-assigned field, not just the ARN the create call returns. If
    /// that read fails for any reason other than `NotFound`, the record is
    /// built from `spec` and the returned ARN, without timestamps.
    pub async fn create(
        &self,
        spec: &CodeRepositorySpec,
    ) -> Result<CodeRepository, ReconcilerError> {
        spec.validate()?;
        info!("Creating SageMaker Code Repository: {}", spec.name);

        let arn = observe("create", self.api.create(spec)).await?;
        debug!("SageMaker Code Repository {} created with ARN {}", spec.name, arn);

        let record = match self.describe(&spec.name).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => return Err(e),
            // The record exists remotely, so report it rather than fail the create.
            Err(e) => {
                warn!(
                    "SageMaker Code Repository {} created but could not be read back: {}",
                    spec.name, e
                );
                return Ok(CodeRepository {
                    name: spec.name.clone(),
                    arn,
                    git_config: spec.git_config.clone(),
                    creation_time: None,
                    last_modified_time: None,
                });
            }
        };
        if record.arn != arn && !arn.is_empty() {
            warn!(
                "SageMaker Code Repository {} describes with ARN {} but was created as {}",
                spec.name, record.arn, arn
            );
        }
        Ok(record)
    }

    /// Read the current server-side state of a code repository
    ///
    /// Returns `NotFound` when the record does not exist.
    pub async fn describe(&self, name: &str) -> Result<CodeRepository, ReconcilerError> {
        validate_name(name)?;
        Ok(observe("describe", self.api.describe(name)).await?)
    }

    /// Re-attach management of an existing code repository by name alone
    pub async fn import(&self, name: &str) -> Result<CodeRepository, ReconcilerError> {
        info!("Importing SageMaker Code Repository: {}", name);
        self.describe(name).await
    }

    /// Delete a code repository
    ///
    /// A record that is already gone counts as deleted, so repeated deletes
    /// and cleanup after partial failures converge.
    pub async fn delete(&self, name: &str) -> Result<(), ReconcilerError> {
        validate_name(name)?;
        info!("Deleting SageMaker Code Repository: {}", name);
        match observe("delete", self.api.delete(name)).await {
            Ok(()) => Ok(()),
            Err(RemoteApiError::NotFound { .. }) => {
                debug!(
                    "SageMaker Code Repository {} already deleted, nothing to do",
                    name
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a record named `name` exists and reports `expected_name`
    ///
    /// Only `NotFound` counts as absence. Any other failure is returned so
    /// that a transient error is never mistaken for a completed delete.
    pub async fn exists_and_matches(
        &self,
        name: &str,
        expected_name: &str,
    ) -> Result<bool, ReconcilerError> {
        match self.describe(name).await {
            Ok(record) => Ok(record.name == expected_name),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Best-effort delete of every code repository in this reconciler's region
    pub async fn sweep_all(&self) -> Result<SweepReport, ReconcilerError> {
        sweep::sweep_api(self.api.as_ref()).await
    }
}

/// Run a remote call and record its outcome and duration
async fn observe<T, F>(operation: &str, call: F) -> Result<T, RemoteApiError>
where
    F: Future<Output = Result<T, RemoteApiError>>,
{
    let start = Instant::now();
    let result = call.await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(RemoteApiError::NotFound { .. }) => "not_found",
        Err(RemoteApiError::AlreadyExists { .. }) => "already_exists",
        Err(RemoteApiError::InvalidInput { .. }) => "invalid_input",
        Err(RemoteApiError::Remote { .. }) => "error",
    };
    metrics::record_operation(operation, outcome, start.elapsed().as_secs_f64());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryCodeRepositoryApi;

    const URL: &str = "https://github.com/terraform-providers/terraform-provider-aws.git";

    fn reconciler() -> (CodeRepositoryReconciler, Arc<InMemoryCodeRepositoryApi>) {
        let api = Arc::new(InMemoryCodeRepositoryApi::new("us-west-2", "123456789012"));
        (CodeRepositoryReconciler::new(api.clone()), api)
    }

    #[tokio::test]
    async fn test_invalid_name_never_reaches_api() {
        let (reconciler, api) = reconciler();
        let err = reconciler
            .create(&CodeRepositorySpec::new("bad_name", URL))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcilerError::Api(RemoteApiError::InvalidInput { .. })
        ));
        assert!(api.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_records_not_found_outcome() {
        let (reconciler, _api) = reconciler();
        let before = metrics::operation_count("delete", "not_found");
        reconciler.delete("never-created").await.unwrap();
        assert!(metrics::operation_count("delete", "not_found") > before);
    }

    #[tokio::test]
    async fn test_exists_and_matches_surfaces_transient_errors() {
        let (reconciler, api) = reconciler();
        reconciler
            .create(&CodeRepositorySpec::new("repo", URL))
            .await
            .unwrap();
        api.fail_describes_for("repo").await;

        let err = reconciler.exists_and_matches("repo", "repo").await.unwrap_err();
        assert!(!err.is_not_found());
    }
}
