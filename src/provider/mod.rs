//! # Provider Modules
//!
//! Remote API implementations for SageMaker code repositories.
//!
//! Each provider implements [`CodeRepositoryApi`]:
//! - `sagemaker`: the AWS SageMaker control plane via `aws-sdk-sagemaker`
//! - `memory`: an in-memory store used by tests and offline runs

use crate::error::RemoteApiError;
use crate::model::{CodeRepository, CodeRepositorySpec, ListPage};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Provider trait for the code repository control plane
///
/// Implementations must not cache existence: every call reflects the
/// remote system at the time it is made.
#[async_trait]
pub trait CodeRepositoryApi: Send + Sync {
    /// Region this client talks to
    fn region(&self) -> &str;

    /// Create a code repository, returning its ARN
    async fn create(&self, spec: &CodeRepositorySpec) -> Result<String, RemoteApiError>;

    /// Describe a code repository by name
    async fn describe(&self, name: &str) -> Result<CodeRepository, RemoteApiError>;

    /// Delete a code repository by name
    async fn delete(&self, name: &str) -> Result<(), RemoteApiError>;

    /// Fetch one page of the regional listing
    async fn list_page(&self, next_token: Option<String>) -> Result<ListPage, RemoteApiError>;
}

/// Builds region-scoped API clients
///
/// Used by sweeps, which visit regions other than the reconciler's own.
#[async_trait]
pub trait RegionalClientFactory: Send + Sync {
    async fn client_for_region(&self, region: &str) -> Result<Arc<dyn CodeRepositoryApi>>;
}

pub mod memory;
pub mod sagemaker;

pub use memory::{InMemoryClientFactory, InMemoryCodeRepositoryApi};
pub use sagemaker::{SageMakerClientFactory, SageMakerCodeRepositoryApi};
