//! # Verification Harness
//!
//! Drives code repositories through apply / plan / import / destroy the way a
//! declarative acceptance test does, and checks the results.
//!
//! - [`Harness`] applies desired configurations and tracks the resulting
//!   [`State`]
//! - `checks` holds the assertions (exists, attribute, regional ARN, import
//!   verify, check-destroy, disappears)
//! - `scenarios` composes them into the basic and disappears flows

use crate::constants::CODE_REPOSITORY_STATE_TYPE;
use crate::error::ReconcilerError;
use crate::model::{CodeRepository, CodeRepositorySpec};
use crate::reconciler::CodeRepositoryReconciler;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod checks;
pub mod scenarios;

pub use checks::{
    check_attr, check_destroy, check_exists, check_regional_arn, disappear, import_verify,
};

/// Assertion failure raised by the harness
#[derive(Debug, Error)]
pub enum VerificationFailure {
    #[error("Not found: {address}")]
    NotInState { address: String },

    #[error("No SageMaker Code Repository ID is set for {address}")]
    NoIdSet { address: String },

    #[error("SageMaker Code Repository {name:?} still exists")]
    StillExists { name: String },

    #[error("{address}: attribute {key:?} expected {expected:?}, got {actual:?}")]
    AttributeMismatch {
        address: String,
        key: String,
        expected: String,
        actual: Option<String>,
    },

    #[error("{address}: attribute {key:?} is not a valid regional ARN: {reason}")]
    InvalidArn {
        address: String,
        key: String,
        reason: String,
    },

    #[error("{address}: import produced {key:?} = {imported:?}, state has {expected:?}")]
    ImportMismatch {
        address: String,
        key: String,
        expected: Option<String>,
        imported: Option<String>,
    },

    #[error("expected a non-empty plan after the resource disappeared, got an empty one")]
    ExpectedNonEmptyPlan,

    #[error(transparent)]
    Reconciler(#[from] ReconcilerError),
}

/// Produces collision-free resource names for parallel runs sharing an account
pub trait NameGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// `<prefix>-<random digits>`
#[derive(Debug, Clone)]
pub struct RandomNameGenerator {
    prefix: String,
}

impl RandomNameGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl NameGenerator for RandomNameGenerator {
    fn generate(&self) -> String {
        // 19 digits keeps the name well inside the 63 character limit for
        // any reasonable prefix.
        let suffix = uuid::Uuid::new_v4().as_u128() % 10_u128.pow(19);
        format!("{}-{:019}", self.prefix, suffix)
    }
}

/// Tracked state of one managed resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState {
    pub address: String,
    pub resource_type: String,
    /// Primary identifier; the code repository name
    pub id: String,
    /// Flattened attributes, keyed like `git_config.0.repository_url`
    pub attributes: BTreeMap<String, String>,
}

impl ResourceState {
    pub fn from_record(address: impl Into<String>, record: &CodeRepository) -> Self {
        Self {
            address: address.into(),
            resource_type: CODE_REPOSITORY_STATE_TYPE.to_string(),
            id: record.name.clone(),
            attributes: flatten(record),
        }
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Snapshot of every resource the harness manages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub resources: BTreeMap<String, ResourceState>,
}

impl State {
    #[must_use]
    pub fn get(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    pub fn of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a ResourceState> {
        self.resources
            .values()
            .filter(move |r| r.resource_type == resource_type)
    }
}

/// Flatten a record into state attributes
pub fn flatten(record: &CodeRepository) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    attributes.insert("id".to_string(), record.name.clone());
    attributes.insert("code_repository_name".to_string(), record.name.clone());
    attributes.insert("arn".to_string(), record.arn.clone());
    attributes.insert("git_config.#".to_string(), "1".to_string());
    attributes.insert(
        "git_config.0.repository_url".to_string(),
        record.git_config.repository_url.clone(),
    );
    if let Some(branch) = &record.git_config.branch {
        attributes.insert("git_config.0.branch".to_string(), branch.clone());
    }
    if let Some(secret_arn) = &record.git_config.secret_arn {
        attributes.insert("git_config.0.secret_arn".to_string(), secret_arn.clone());
    }
    attributes
}

/// Resources that a refresh found missing and would recreate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub to_create: Vec<String>,
}

impl Plan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty()
    }
}

/// Applies configurations through a reconciler and tracks the resulting state
#[derive(Debug)]
pub struct Harness {
    reconciler: CodeRepositoryReconciler,
    desired: BTreeMap<String, CodeRepositorySpec>,
    state: State,
}

impl Harness {
    pub fn new(reconciler: CodeRepositoryReconciler) -> Self {
        Self {
            reconciler,
            desired: BTreeMap::new(),
            state: State::default(),
        }
    }

    #[must_use]
    pub fn reconciler(&self) -> &CodeRepositoryReconciler {
        &self.reconciler
    }

    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Replace tracked state with an earlier snapshot
    pub fn restore_state(&mut self, state: State) {
        self.state = state;
    }

    /// Converge `address` onto `spec`
    ///
    /// Creates the record when it is not tracked or has vanished. Since no
    /// attribute can be updated in place, a changed spec replaces the record.
    pub async fn apply(
        &mut self,
        address: &str,
        spec: CodeRepositorySpec,
    ) -> Result<ResourceState, VerificationFailure> {
        if let Some(current) = self.state.get(address).cloned() {
            let unchanged = self.desired.get(address) == Some(&spec);
            match self.reconciler.describe(&current.id).await {
                Ok(record) if unchanged => {
                    debug!("{} is up to date", address);
                    let refreshed = ResourceState::from_record(address, &record);
                    self.state.resources.insert(address.to_string(), refreshed.clone());
                    return Ok(refreshed);
                }
                Ok(_) => {
                    info!("{} must be replaced, configuration changed", address);
                    self.reconciler.delete(&current.id).await?;
                }
                Err(e) if e.is_not_found() => {
                    warn!("{} no longer exists, recreating", address);
                }
                Err(e) => return Err(e.into()),
            }
            self.state.resources.remove(address);
        }

        let record = self.reconciler.create(&spec).await?;
        let resource = ResourceState::from_record(address, &record);
        self.desired.insert(address.to_string(), spec);
        self.state
            .resources
            .insert(address.to_string(), resource.clone());
        Ok(resource)
    }

    /// Refresh every tracked record and report the ones that have vanished
    ///
    /// Vanished records are dropped from state, as a refresh would.
    pub async fn plan(&mut self) -> Result<Plan, VerificationFailure> {
        let mut plan = Plan::default();
        let addresses: Vec<String> = self.state.resources.keys().cloned().collect();
        for address in addresses {
            let Some(id) = self.state.get(&address).map(|r| r.id.clone()) else {
                continue;
            };
            match self.reconciler.describe(&id).await {
                Ok(record) => {
                    self.state
                        .resources
                        .insert(address.clone(), ResourceState::from_record(&address, &record));
                }
                Err(e) if e.is_not_found() => {
                    info!("{} ({}) has disappeared", address, id);
                    self.state.resources.remove(&address);
                    plan.to_create.push(address);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(plan)
    }

    /// Delete every tracked record
    ///
    /// Every record is attempted even if an earlier delete fails; the first
    /// failure is returned. State is kept so that [`check_destroy`] can verify
    /// against it.
    pub async fn destroy(&mut self) -> Result<(), VerificationFailure> {
        let mut first_error = None;
        for resource in self.state.resources.values() {
            if let Err(e) = self.reconciler.delete(&resource.id).await {
                warn!("Failed to destroy {} ({}): {}", resource.address, resource.id, e);
                first_error.get_or_insert(e);
            }
        }
        self.desired.clear();
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_names_are_prefixed_and_distinct() {
        let generator = RandomNameGenerator::new("tf-acc-test");
        let a = generator.generate();
        let b = generator.generate();
        assert!(a.starts_with("tf-acc-test-"));
        assert_eq!(a.len(), "tf-acc-test-".len() + 19);
        assert_ne!(a, b);
        assert!(crate::model::validate_name(&a).is_ok());
    }

    #[test]
    fn test_flatten_includes_optional_git_fields_only_when_set() {
        let record = CodeRepository {
            name: "repo".to_string(),
            arn: "arn:aws:sagemaker:us-west-2:123456789012:code-repository/repo".to_string(),
            git_config: crate::model::GitConfig::new("https://example.com/repo.git"),
            creation_time: None,
            last_modified_time: None,
        };
        let attributes = flatten(&record);
        assert_eq!(attributes.get("git_config.#").map(String::as_str), Some("1"));
        assert!(!attributes.contains_key("git_config.0.branch"));

        let mut with_branch = record;
        with_branch.git_config.branch = Some("main".to_string());
        assert_eq!(
            flatten(&with_branch).get("git_config.0.branch").map(String::as_str),
            Some("main")
        );
    }
}
