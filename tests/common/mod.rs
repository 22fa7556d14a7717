//! Shared setup for the integration tests.

#![allow(dead_code)]

use code_repository_reconciler::harness::NameGenerator;
use code_repository_reconciler::provider::{CodeRepositoryApi, InMemoryCodeRepositoryApi};
use code_repository_reconciler::CodeRepositoryReconciler;
use std::sync::{Arc, Mutex, Once};

pub const ACCOUNT_ID: &str = "123456789012";
pub const REGION: &str = "us-west-2";
pub const REPOSITORY_URL: &str =
    "https://github.com/terraform-providers/terraform-provider-aws.git";

static TRACING_INIT: Once = Once::new();

/// Route tracing output through the test harness so it shows up on failure
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Reconciler over a fresh in-memory store, plus the store for fault injection
pub fn reconciler() -> (CodeRepositoryReconciler, Arc<InMemoryCodeRepositoryApi>) {
    init_tracing();
    let store = Arc::new(InMemoryCodeRepositoryApi::new(REGION, ACCOUNT_ID));
    let api: Arc<dyn CodeRepositoryApi> = store.clone();
    (CodeRepositoryReconciler::new(api), store)
}

/// Hands out a fixed sequence of names
pub struct FixedNames {
    names: Mutex<Vec<String>>,
}

impl FixedNames {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: Mutex::new(names.iter().rev().map(ToString::to_string).collect()),
        }
    }
}

impl NameGenerator for FixedNames {
    fn generate(&self) -> String {
        self.names
            .lock()
            .unwrap()
            .pop()
            .expect("FixedNames ran out of names")
    }
}
