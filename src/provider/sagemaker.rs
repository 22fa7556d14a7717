//! # SageMaker Code Repository Client
//!
//! Client for the AWS SageMaker code repository API.
//!
//! This module provides functionality to:
//! - Create, describe and delete code repositories
//! - Page through the regional code repository listing
//! - Classify SDK failures into [`RemoteApiError`] variants
//!
//! Credentials and region come from the AWS SDK default chain
//! (environment, profile, IRSA, instance metadata).

use super::{CodeRepositoryApi, RegionalClientFactory};
use crate::config::ReconcilerConfig;
use crate::error::RemoteApiError;
use crate::model::{CodeRepository, CodeRepositorySpec, CodeRepositorySummary, GitConfig, ListPage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sagemaker::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sagemaker::primitives::DateTime as SdkDateTime;
use aws_sdk_sagemaker::Client as SageMakerClient;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// SageMaker-backed [`CodeRepositoryApi`]
pub struct SageMakerCodeRepositoryApi {
    client: SageMakerClient,
    region: String,
    page_size: i32,
}

impl std::fmt::Debug for SageMakerCodeRepositoryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SageMakerCodeRepositoryApi")
            .field("region", &self.region)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl SageMakerCodeRepositoryApi {
    /// Create a client for the configured region using the default credential chain
    pub async fn new(config: &ReconcilerConfig) -> Result<Self> {
        let sdk_config = load_sdk_config(&config.region).await;
        Self::from_sdk_config(
            &sdk_config,
            &config.region,
            config.endpoint_url.as_deref(),
            config.list_page_size,
        )
    }

    /// Create a client from an already-loaded SDK config
    pub fn from_sdk_config(
        sdk_config: &SdkConfig,
        region: &str,
        endpoint_url: Option<&str>,
        page_size: i32,
    ) -> Result<Self> {
        if sdk_config.region().is_none() {
            anyhow::bail!("No AWS region configured for SageMaker client");
        }
        let mut builder = aws_sdk_sagemaker::config::Builder::from(sdk_config);
        if let Some(url) = endpoint_url {
            debug!("Using SageMaker endpoint override: {}", url);
            builder = builder.endpoint_url(url);
        }

        Ok(Self {
            client: SageMakerClient::from_conf(builder.build()),
            region: region.to_string(),
            page_size,
        })
    }
}

async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}

#[async_trait]
impl CodeRepositoryApi for SageMakerCodeRepositoryApi {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create(&self, spec: &CodeRepositorySpec) -> Result<String, RemoteApiError> {
        let span = info_span!(
            "sagemaker.code_repository.create",
            code_repository.name = %spec.name,
            region = %self.region
        );

        async move {
            let git_config = aws_sdk_sagemaker::types::GitConfig::builder()
                .repository_url(&spec.git_config.repository_url)
                .set_branch(spec.git_config.branch.clone())
                .set_secret_arn(spec.git_config.secret_arn.clone())
                .build();

            let output = self
                .client
                .create_code_repository()
                .code_repository_name(&spec.name)
                .git_config(git_config)
                .send()
                .await
                .map_err(|e| classify_sdk_error("CreateCodeRepository", &spec.name, &e))?;

            Ok(output
                .code_repository_arn()
                .into_option()
                .unwrap_or_default()
                .to_string())
        }
        .instrument(span)
        .await
    }

    async fn describe(&self, name: &str) -> Result<CodeRepository, RemoteApiError> {
        let span = tracing::debug_span!(
            "sagemaker.code_repository.describe",
            code_repository.name = name,
            region = %self.region
        );

        async move {
            let output = self
                .client
                .describe_code_repository()
                .code_repository_name(name)
                .send()
                .await
                .map_err(|e| classify_sdk_error("DescribeCodeRepository", name, &e))?;

            let git_config = output
                .git_config()
                .map(|g| GitConfig {
                    repository_url: g.repository_url().into_option().unwrap_or_default().to_string(),
                    branch: g.branch().map(ToString::to_string),
                    secret_arn: g.secret_arn().map(ToString::to_string),
                })
                .unwrap_or_else(|| GitConfig::new(String::new()));

            Ok(CodeRepository {
                name: output
                    .code_repository_name()
                    .into_option()
                    .unwrap_or_default()
                    .to_string(),
                arn: output
                    .code_repository_arn()
                    .into_option()
                    .unwrap_or_default()
                    .to_string(),
                git_config,
                creation_time: output.creation_time().into_option().and_then(to_chrono),
                last_modified_time: output.last_modified_time().into_option().and_then(to_chrono),
            })
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, name: &str) -> Result<(), RemoteApiError> {
        let span = info_span!(
            "sagemaker.code_repository.delete",
            code_repository.name = name,
            region = %self.region
        );

        async move {
            self.client
                .delete_code_repository()
                .code_repository_name(name)
                .send()
                .await
                .map_err(|e| classify_sdk_error("DeleteCodeRepository", name, &e))?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn list_page(&self, next_token: Option<String>) -> Result<ListPage, RemoteApiError> {
        let span = tracing::debug_span!(
            "sagemaker.code_repository.list",
            region = %self.region
        );

        async move {
            let output = self
                .client
                .list_code_repositories()
                .max_results(self.page_size)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| classify_sdk_error("ListCodeRepositories", "", &e))?;

            let items = output
                .code_repository_summary_list()
                .iter()
                .map(|summary| CodeRepositorySummary {
                    name: summary
                        .code_repository_name()
                        .into_option()
                        .unwrap_or_default()
                        .to_string(),
                    arn: summary
                        .code_repository_arn()
                        .into_option()
                        .map(ToString::to_string),
                })
                .filter(|summary| !summary.name.is_empty())
                .collect();

            Ok(ListPage {
                items,
                next_token: output
                    .next_token()
                    .filter(|t| !t.is_empty())
                    .map(ToString::to_string),
            })
        }
        .instrument(span)
        .await
    }
}

/// Builds a [`SageMakerCodeRepositoryApi`] per region
#[derive(Debug, Clone, Default)]
pub struct SageMakerClientFactory {
    endpoint_url: Option<String>,
    page_size: i32,
}

impl SageMakerClientFactory {
    pub fn new(config: &ReconcilerConfig) -> Self {
        Self {
            endpoint_url: config.endpoint_url.clone(),
            page_size: config.list_page_size,
        }
    }
}

#[async_trait]
impl RegionalClientFactory for SageMakerClientFactory {
    async fn client_for_region(&self, region: &str) -> Result<Arc<dyn CodeRepositoryApi>> {
        let sdk_config = load_sdk_config(region).await;
        let api = SageMakerCodeRepositoryApi::from_sdk_config(
            &sdk_config,
            region,
            self.endpoint_url.as_deref(),
            self.page_size,
        )
        .with_context(|| format!("Failed to build SageMaker client for {region}"))?;
        Ok(Arc::new(api))
    }
}

/// Required members are plain references in some SDK releases and `Option`s in others
trait IntoOption<'a, T: ?Sized> {
    fn into_option(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> IntoOption<'a, T> for &'a T {
    fn into_option(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> IntoOption<'a, T> for Option<&'a T> {
    fn into_option(self) -> Option<&'a T> {
        self
    }
}

fn to_chrono(value: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

fn classify_sdk_error<E, R>(operation: &str, name: &str, err: &SdkError<E, R>) -> RemoteApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let display = DisplayErrorContext(err).to_string();
    let (code, message) = match err.as_service_error() {
        Some(service) => (service.code(), service.message()),
        None => (None, None),
    };
    classify_error(operation, name, code, message.unwrap_or(&display))
}

/// Map a service error code and message onto the error taxonomy
///
/// SageMaker reports a missing code repository as a `ValidationException`
/// ("Cannot find CodeRepository ...") rather than a dedicated not-found code.
pub fn classify_error(
    operation: &str,
    name: &str,
    code: Option<&str>,
    message: &str,
) -> RemoteApiError {
    let lowered = message.to_lowercase();
    match code {
        Some("ValidationException" | "ResourceNotFound")
            if lowered.contains("cannot find")
                || lowered.contains("does not exist")
                || lowered.contains("not found") =>
        {
            RemoteApiError::not_found(name)
        }
        Some("ResourceInUse") => RemoteApiError::already_exists(name),
        Some("ValidationException") if lowered.contains("already exists") => {
            RemoteApiError::already_exists(name)
        }
        _ => RemoteApiError::remote(operation, code.map(ToString::to_string), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_missing_repository() {
        let err = classify_error(
            "DescribeCodeRepository",
            "repo",
            Some("ValidationException"),
            "Cannot find CodeRepository with name repo",
        );
        assert_eq!(err, RemoteApiError::not_found("repo"));
    }

    #[test]
    fn test_classify_duplicate_repository() {
        let err = classify_error(
            "CreateCodeRepository",
            "repo",
            Some("ValidationException"),
            "Code repository repo already exists",
        );
        assert_eq!(err, RemoteApiError::already_exists("repo"));

        let err = classify_error("CreateCodeRepository", "repo", Some("ResourceInUse"), "in use");
        assert_eq!(err, RemoteApiError::already_exists("repo"));
    }

    #[test]
    fn test_classify_other_validation_errors_stay_remote() {
        let err = classify_error(
            "CreateCodeRepository",
            "repo",
            Some("ValidationException"),
            "1 validation error detected: repositoryUrl",
        );
        assert_eq!(err.code(), Some("ValidationException"));
    }

    #[test]
    fn test_classify_transport_error() {
        let err = classify_error("ListCodeRepositories", "", None, "dispatch failure");
        assert!(matches!(err, RemoteApiError::Remote { code: None, .. }));
    }

    #[test]
    fn test_to_chrono_preserves_seconds() {
        let converted = to_chrono(&SdkDateTime::from_secs(1_700_000_000)).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }
}
