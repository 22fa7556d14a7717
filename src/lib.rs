//! SageMaker Code Repository Reconciler
//!
//! Creates, describes, deletes and sweeps AWS SageMaker code repositories,
//! plus a verification harness that drives them through an acceptance-style
//! lifecycle. The remote API sits behind [`provider::CodeRepositoryApi`] so
//! everything above it runs unchanged against SageMaker or the in-memory store.

pub mod config;
pub mod constants;
pub mod error;
pub mod harness;
pub mod model;
pub mod observability;
pub mod provider;
pub mod reconciler;
pub mod sweep;

pub use config::ReconcilerConfig;
pub use error::{ReconcilerError, RemoteApiError};
pub use model::{CodeRepository, CodeRepositorySpec, GitConfig};
pub use reconciler::CodeRepositoryReconciler;
pub use sweep::{SweepReport, Sweeper};
