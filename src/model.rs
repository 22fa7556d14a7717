//! # Data Model
//!
//! Code repository records, their desired configuration, and ARN handling.

use crate::constants::{
    CODE_REPOSITORY_RESOURCE_TYPE, MAX_CODE_REPOSITORY_NAME_LEN, SAGEMAKER_SERVICE,
};
use crate::error::RemoteApiError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9](-*[a-zA-Z0-9])*$")
        .expect("Failed to compile code repository name pattern - this should never happen")
});

/// Git settings of a code repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    /// URL where the Git repository is located
    pub repository_url: String,
    /// Default branch checked out in notebook instances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Secrets Manager ARN holding the repository credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_arn: Option<String>,
}

impl GitConfig {
    pub fn new(repository_url: impl Into<String>) -> Self {
        Self {
            repository_url: repository_url.into(),
            branch: None,
            secret_arn: None,
        }
    }
}

/// Desired configuration for a code repository
///
/// Immutable once created: no update path exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRepositorySpec {
    pub name: String,
    pub git_config: GitConfig,
}

impl CodeRepositorySpec {
    pub fn new(name: impl Into<String>, repository_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            git_config: GitConfig::new(repository_url),
        }
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.git_config.branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn with_secret_arn(mut self, secret_arn: impl Into<String>) -> Self {
        self.git_config.secret_arn = Some(secret_arn.into());
        self
    }

    /// Validate locally before any remote call is made
    pub fn validate(&self) -> Result<(), RemoteApiError> {
        validate_name(&self.name)?;
        let url = &self.git_config.repository_url;
        if url.is_empty() {
            return Err(RemoteApiError::invalid_input(
                "repository_url must not be empty",
            ));
        }
        if !url.starts_with("https://") {
            return Err(RemoteApiError::invalid_input(format!(
                "repository_url {url:?} must use https://"
            )));
        }
        if let Some(secret_arn) = &self.git_config.secret_arn {
            if !secret_arn.starts_with("arn:") {
                return Err(RemoteApiError::invalid_input(format!(
                    "secret_arn {secret_arn:?} is not an ARN"
                )));
            }
        }
        Ok(())
    }
}

/// Validate a code repository name against the SageMaker entity-name rule
pub fn validate_name(name: &str) -> Result<(), RemoteApiError> {
    if name.is_empty() {
        return Err(RemoteApiError::invalid_input(
            "code repository name must not be empty",
        ));
    }
    if name.len() > MAX_CODE_REPOSITORY_NAME_LEN {
        return Err(RemoteApiError::invalid_input(format!(
            "code repository name {name:?} is longer than {MAX_CODE_REPOSITORY_NAME_LEN} characters"
        )));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(RemoteApiError::invalid_input(format!(
            "code repository name {name:?} may only contain alphanumerics and hyphens, \
             and must start and end with an alphanumeric"
        )));
    }
    Ok(())
}

/// Server-side view of a code repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRepository {
    pub name: String,
    pub arn: String,
    pub git_config: GitConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<DateTime<Utc>>,
}

impl CodeRepository {
    #[must_use]
    pub fn repository_url(&self) -> &str {
        &self.git_config.repository_url
    }

    /// Whether the configuration fields match, ignoring timestamps
    #[must_use]
    pub fn same_configuration(&self, other: &Self) -> bool {
        self.name == other.name && self.arn == other.arn && self.git_config == other.git_config
    }
}

/// Entry returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRepositorySummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<CodeRepositorySummary>,
    pub next_token: Option<String>,
}

/// Parsed Amazon Resource Name
///
/// Format: `arn:<partition>:<service>:<region>:<account>:<resource>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub resource: String,
}

impl Arn {
    /// Regional ARN of a code repository
    pub fn code_repository(
        partition: &str,
        region: &str,
        account_id: &str,
        name: &str,
    ) -> Self {
        Self {
            partition: partition.to_string(),
            service: SAGEMAKER_SERVICE.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
            resource: format!("{CODE_REPOSITORY_RESOURCE_TYPE}/{name}"),
        }
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}

impl FromStr for Arn {
    type Err = RemoteApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The resource part may itself contain ':'
        let mut parts = s.splitn(6, ':');
        let (Some("arn"), Some(partition), Some(service), Some(region), Some(account_id), Some(resource)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(RemoteApiError::invalid_input(format!("{s:?} is not an ARN")));
        };
        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return Err(RemoteApiError::invalid_input(format!("{s:?} is not an ARN")));
        }
        Ok(Self {
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
            resource: resource.to_string(),
        })
    }
}
