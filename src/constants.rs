//! # Constants
//!
//! Shared constants used throughout the reconciler.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// AWS service namespace used in code repository ARNs
pub const SAGEMAKER_SERVICE: &str = "sagemaker";

/// Resource type segment of a code repository ARN (`code-repository/<name>`)
pub const CODE_REPOSITORY_RESOURCE_TYPE: &str = "code-repository";

/// Resource type name used in harness state and sweeper registration
pub const CODE_REPOSITORY_STATE_TYPE: &str = "aws_sagemaker_code_repository";

/// Default prefix for generated resource names
pub const DEFAULT_NAME_PREFIX: &str = "tf-acc-test";

/// Default AWS region when neither `AWS_REGION` nor `AWS_DEFAULT_REGION` is set
pub const DEFAULT_REGION: &str = "us-west-2";

/// Default partition used when building ARNs locally
pub const DEFAULT_PARTITION: &str = "aws";

/// Default page size for `ListCodeRepositories` (service maximum is 100)
pub const DEFAULT_LIST_PAGE_SIZE: i32 = 100;

/// Maximum length of a SageMaker entity name
pub const MAX_CODE_REPOSITORY_NAME_LEN: usize = 63;

/// Default log level when `LOG_LEVEL` and `RUST_LOG` are unset
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Default log format (`text` or `json`)
pub const DEFAULT_LOG_FORMAT: &str = "text";
