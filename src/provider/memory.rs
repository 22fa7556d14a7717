//! # In-Memory Code Repository API
//!
//! Ephemeral implementation of [`CodeRepositoryApi`] with the same observable
//! semantics as the SageMaker control plane: caller-assigned unique names,
//! deterministic regional ARNs, and token-based pagination.
//!
//! Supports fault injection so callers can exercise partial failures:
//! per-name delete failures, deletes that silently keep the record, listing
//! failures, transient describe failures, and out-of-band removal.
//!
//! Thread-safe using `Arc<RwLock>` for concurrent access.

use super::{CodeRepositoryApi, RegionalClientFactory};
use crate::constants::{DEFAULT_LIST_PAGE_SIZE, DEFAULT_PARTITION};
use crate::error::RemoteApiError;
use crate::model::{Arn, CodeRepository, CodeRepositorySpec, CodeRepositorySummary, ListPage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct StoreState {
    /// Keyed by the name describe/delete look up
    records: BTreeMap<String, CodeRepository>,
    failing_deletes: HashSet<String>,
    ignored_deletes: HashSet<String>,
    failing_describes: HashSet<String>,
    listing_failure: Option<RemoteApiError>,
    delete_calls: Vec<String>,
}

/// In-memory code repository store for one region
#[derive(Debug, Clone)]
pub struct InMemoryCodeRepositoryApi {
    region: String,
    account_id: String,
    page_size: usize,
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryCodeRepositoryApi {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            page_size: usize::try_from(DEFAULT_LIST_PAGE_SIZE).unwrap_or(100),
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// ARN the store assigns to `name`
    #[must_use]
    pub fn arn_for(&self, name: &str) -> String {
        Arn::code_repository(DEFAULT_PARTITION, &self.region, &self.account_id, name).to_string()
    }

    /// Remove a record without going through the API, as another actor would
    pub async fn remove_out_of_band(&self, name: &str) -> bool {
        let removed = self.state.write().await.records.remove(name).is_some();
        info!("  Removed code repository out-of-band: {} ({})", name, removed);
        removed
    }

    /// Store `record` under `key`, even if `record.name` differs from `key`
    pub async fn insert_record_under(&self, key: impl Into<String>, record: CodeRepository) {
        self.state.write().await.records.insert(key.into(), record);
    }

    /// Make every delete of `name` fail with a service error
    pub async fn fail_deletes_for(&self, name: impl Into<String>) {
        self.state.write().await.failing_deletes.insert(name.into());
    }

    /// Make deletes of `name` report success while the record stays in place
    pub async fn ignore_deletes_for(&self, name: impl Into<String>) {
        self.state.write().await.ignored_deletes.insert(name.into());
    }

    /// Make every describe of `name` fail with a throttling error
    pub async fn fail_describes_for(&self, name: impl Into<String>) {
        self.state.write().await.failing_describes.insert(name.into());
    }

    /// Make every listing call fail with `error`
    pub async fn fail_listing_with(&self, error: RemoteApiError) {
        self.state.write().await.listing_failure = Some(error);
    }

    pub async fn clear_faults(&self) {
        let mut state = self.state.write().await;
        state.failing_deletes.clear();
        state.ignored_deletes.clear();
        state.failing_describes.clear();
        state.listing_failure = None;
    }

    pub async fn names(&self) -> Vec<String> {
        self.state.read().await.records.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }

    /// Names passed to `delete`, in call order
    pub async fn delete_calls(&self) -> Vec<String> {
        self.state.read().await.delete_calls.clone()
    }
}

#[async_trait]
impl CodeRepositoryApi for InMemoryCodeRepositoryApi {
    fn region(&self) -> &str {
        &self.region
    }

    async fn create(&self, spec: &CodeRepositorySpec) -> Result<String, RemoteApiError> {
        spec.validate()?;
        let mut state = self.state.write().await;
        if state.records.contains_key(&spec.name) {
            return Err(RemoteApiError::already_exists(&spec.name));
        }

        let now = Utc::now();
        let arn = self.arn_for(&spec.name);
        state.records.insert(
            spec.name.clone(),
            CodeRepository {
                name: spec.name.clone(),
                arn: arn.clone(),
                git_config: spec.git_config.clone(),
                creation_time: Some(now),
                last_modified_time: Some(now),
            },
        );
        info!("  Created code repository: {}", spec.name);
        Ok(arn)
    }

    async fn describe(&self, name: &str) -> Result<CodeRepository, RemoteApiError> {
        let state = self.state.read().await;
        if state.failing_describes.contains(name) {
            return Err(RemoteApiError::remote(
                "DescribeCodeRepository",
                Some("ThrottlingException".to_string()),
                "Rate exceeded",
            ));
        }
        state
            .records
            .get(name)
            .cloned()
            .ok_or_else(|| RemoteApiError::not_found(name))
    }

    async fn delete(&self, name: &str) -> Result<(), RemoteApiError> {
        let mut state = self.state.write().await;
        state.delete_calls.push(name.to_string());
        if state.failing_deletes.contains(name) {
            return Err(RemoteApiError::remote(
                "DeleteCodeRepository",
                Some("InternalFailure".to_string()),
                format!("injected delete failure for {name}"),
            ));
        }
        if state.ignored_deletes.contains(name) {
            debug!("  Ignoring delete of code repository: {}", name);
            return Ok(());
        }
        if state.records.remove(name).is_none() {
            return Err(RemoteApiError::not_found(name));
        }
        debug!("  Deleted code repository: {}", name);
        Ok(())
    }

    async fn list_page(&self, next_token: Option<String>) -> Result<ListPage, RemoteApiError> {
        let state = self.state.read().await;
        if let Some(err) = &state.listing_failure {
            return Err(err.clone());
        }

        // The token is the last name of the previous page, so deletes between
        // pages never shift later entries out of view.
        let lower = match &next_token {
            Some(token) => Bound::Excluded(token.clone()),
            None => Bound::Unbounded,
        };
        let mut remaining = state.records.range((lower, Bound::Unbounded)).peekable();

        let mut items = Vec::new();
        while items.len() < self.page_size {
            let Some((key, record)) = remaining.next() else {
                break;
            };
            items.push((
                key.clone(),
                CodeRepositorySummary {
                    name: record.name.clone(),
                    arn: Some(record.arn.clone()),
                },
            ));
        }

        let next_token = if remaining.peek().is_some() {
            items.last().map(|(key, _)| key.clone())
        } else {
            None
        };

        Ok(ListPage {
            items: items.into_iter().map(|(_, summary)| summary).collect(),
            next_token,
        })
    }
}

/// Hands out one [`InMemoryCodeRepositoryApi`] per region
#[derive(Debug, Clone)]
pub struct InMemoryClientFactory {
    account_id: String,
    page_size: usize,
    regions: Arc<Mutex<HashMap<String, Arc<InMemoryCodeRepositoryApi>>>>,
    unavailable: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryClientFactory {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            page_size: usize::try_from(DEFAULT_LIST_PAGE_SIZE).unwrap_or(100),
            regions: Arc::new(Mutex::new(HashMap::new())),
            unavailable: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store backing `region`, created on first use
    pub fn region(&self, region: &str) -> Arc<InMemoryCodeRepositoryApi> {
        let mut regions = self
            .regions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(regions.entry(region.to_string()).or_insert_with(|| {
            Arc::new(
                InMemoryCodeRepositoryApi::new(region, self.account_id.clone())
                    .with_page_size(self.page_size),
            )
        }))
    }

    /// Make client construction fail for `region`
    pub fn mark_unavailable(&self, region: &str) {
        self.unavailable
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(region.to_string());
    }
}

#[async_trait]
impl RegionalClientFactory for InMemoryClientFactory {
    async fn client_for_region(&self, region: &str) -> Result<Arc<dyn CodeRepositoryApi>> {
        let unavailable = self
            .unavailable
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(region);
        if unavailable {
            return Err(anyhow!("no credentials available for region {region}"));
        }
        let api: Arc<dyn CodeRepositoryApi> = self.region(region);
        Ok(api)
    }
}
