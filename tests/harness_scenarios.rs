//! # Harness Scenario Tests
//!
//! Runs the basic and disappears scenarios plus the individual checks
//! against the in-memory API.

mod common;

use code_repository_reconciler::harness::scenarios::{self, RESOURCE_ADDRESS, TEST_REPOSITORY_URL};
use code_repository_reconciler::harness::{
    check_attr, check_destroy, check_exists, check_regional_arn, import_verify, Harness,
    RandomNameGenerator, State, VerificationFailure,
};
use code_repository_reconciler::model::CodeRepositorySpec;
use common::{reconciler, FixedNames, REGION};

#[tokio::test]
async fn test_basic_scenario_creates_verifies_and_cleans_up() {
    let (reconciler, store) = reconciler();
    let names = FixedNames::new(&["tf-acc-test-1234"]);

    let record = scenarios::basic(&reconciler, &names).await.unwrap();

    assert_eq!(record.name, "tf-acc-test-1234");
    assert_eq!(
        record.arn,
        "arn:aws:sagemaker:us-west-2:123456789012:code-repository/tf-acc-test-1234"
    );
    assert_eq!(record.repository_url(), TEST_REPOSITORY_URL);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_disappears_scenario_passes_with_random_names() {
    let (reconciler, store) = reconciler();
    let names = RandomNameGenerator::new("tf-acc-test");

    scenarios::disappears(&reconciler, &names).await.unwrap();
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_basic_scenario_reports_teardown_failure() {
    let (reconciler, store) = reconciler();
    store.fail_deletes_for("tf-acc-test-9999").await;
    let names = FixedNames::new(&["tf-acc-test-9999"]);

    let err = scenarios::basic(&reconciler, &names).await.unwrap_err();
    assert!(matches!(err, VerificationFailure::Reconciler(_)));
    assert_eq!(store.names().await, vec!["tf-acc-test-9999"]);
}

#[tokio::test]
async fn test_checks_against_applied_state() {
    let (reconciler, _store) = reconciler();
    let mut harness = Harness::new(reconciler.clone());
    harness
        .apply(RESOURCE_ADDRESS, CodeRepositorySpec::new("checked", TEST_REPOSITORY_URL))
        .await
        .unwrap();
    let state = harness.state();

    check_exists(&reconciler, state, RESOURCE_ADDRESS).await.unwrap();
    check_attr(state, RESOURCE_ADDRESS, "id", "checked").unwrap();
    check_attr(state, RESOURCE_ADDRESS, "git_config.#", "1").unwrap();
    check_regional_arn(
        state,
        RESOURCE_ADDRESS,
        "arn",
        "sagemaker",
        "code-repository/checked",
        REGION,
    )
    .unwrap();
    import_verify(&reconciler, state, RESOURCE_ADDRESS, &[]).await.unwrap();

    let mismatch = check_attr(state, RESOURCE_ADDRESS, "code_repository_name", "other");
    assert!(matches!(
        mismatch,
        Err(VerificationFailure::AttributeMismatch { .. })
    ));

    let wrong_region = check_regional_arn(
        state,
        RESOURCE_ADDRESS,
        "arn",
        "sagemaker",
        "code-repository/checked",
        "eu-west-1",
    );
    assert!(matches!(wrong_region, Err(VerificationFailure::InvalidArn { .. })));
}

#[tokio::test]
async fn test_check_exists_on_unknown_address() {
    let (reconciler, _store) = reconciler();
    let err = check_exists(&reconciler, &State::default(), "aws_sagemaker_code_repository.nope")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Not found: aws_sagemaker_code_repository.nope");
}

#[tokio::test]
async fn test_check_destroy_fails_while_record_exists() {
    let (reconciler, _store) = reconciler();
    let mut harness = Harness::new(reconciler.clone());
    harness
        .apply(RESOURCE_ADDRESS, CodeRepositorySpec::new("lingering", TEST_REPOSITORY_URL))
        .await
        .unwrap();

    let err = check_destroy(&reconciler, harness.state()).await.unwrap_err();
    assert!(matches!(err, VerificationFailure::StillExists { ref name } if name == "lingering"));

    harness.destroy().await.unwrap();
    check_destroy(&reconciler, harness.state()).await.unwrap();
}

#[tokio::test]
async fn test_check_destroy_surfaces_transient_errors() {
    let (reconciler, store) = reconciler();
    let mut harness = Harness::new(reconciler.clone());
    harness
        .apply(RESOURCE_ADDRESS, CodeRepositorySpec::new("throttled", TEST_REPOSITORY_URL))
        .await
        .unwrap();
    harness.destroy().await.unwrap();
    store.fail_describes_for("throttled").await;

    let err = check_destroy(&reconciler, harness.state()).await.unwrap_err();
    assert!(matches!(err, VerificationFailure::Reconciler(_)));
}

#[tokio::test]
async fn test_apply_replaces_on_change_and_recreates_after_removal() {
    let (reconciler, store) = reconciler();
    let mut harness = Harness::new(reconciler);
    let spec = CodeRepositorySpec::new("evolving", TEST_REPOSITORY_URL);

    let first = harness.apply(RESOURCE_ADDRESS, spec.clone()).await.unwrap();
    let unchanged = harness.apply(RESOURCE_ADDRESS, spec.clone()).await.unwrap();
    assert_eq!(first, unchanged);
    assert!(store.delete_calls().await.is_empty());

    let changed = harness
        .apply(RESOURCE_ADDRESS, spec.clone().with_branch("release"))
        .await
        .unwrap();
    assert_eq!(changed.attribute("git_config.0.branch"), Some("release"));
    assert_eq!(store.delete_calls().await, vec!["evolving"]);

    store.remove_out_of_band("evolving").await;
    let plan = harness.plan().await.unwrap();
    assert_eq!(plan.to_create, vec![RESOURCE_ADDRESS.to_string()]);
    assert!(harness.state().get(RESOURCE_ADDRESS).is_none());

    harness.apply(RESOURCE_ADDRESS, spec).await.unwrap();
    assert_eq!(store.names().await, vec!["evolving"]);
    assert!(harness.plan().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_apply_tracks_record_whose_read_back_failed() {
    let (reconciler, store) = reconciler();
    store.fail_describes_for("unread").await;
    let mut harness = Harness::new(reconciler.clone());

    let resource = harness
        .apply(RESOURCE_ADDRESS, CodeRepositorySpec::new("unread", TEST_REPOSITORY_URL))
        .await
        .unwrap();
    assert_eq!(resource.id, "unread");

    store.clear_faults().await;
    harness.destroy().await.unwrap();
    check_destroy(&reconciler, harness.state()).await.unwrap();
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_destroy_attempts_every_record_after_a_failure() {
    let (reconciler, store) = reconciler();
    let mut harness = Harness::new(reconciler);
    harness
        .apply(
            "aws_sagemaker_code_repository.a",
            CodeRepositorySpec::new("first", TEST_REPOSITORY_URL),
        )
        .await
        .unwrap();
    harness
        .apply(
            "aws_sagemaker_code_repository.b",
            CodeRepositorySpec::new("second", TEST_REPOSITORY_URL),
        )
        .await
        .unwrap();
    store.fail_deletes_for("first").await;

    let err = harness.destroy().await.unwrap_err();
    assert!(matches!(err, VerificationFailure::Reconciler(_)));
    assert_eq!(store.delete_calls().await, vec!["first", "second"]);
    assert_eq!(store.names().await, vec!["first"]);
}

#[tokio::test]
async fn test_disappears_scenario_requires_a_non_empty_plan() {
    let (reconciler, store) = reconciler();
    store.ignore_deletes_for("tf-acc-test-5555").await;
    let names = FixedNames::new(&["tf-acc-test-5555"]);

    let err = scenarios::disappears(&reconciler, &names).await.unwrap_err();
    assert!(matches!(err, VerificationFailure::ExpectedNonEmptyPlan));
    assert_eq!(store.names().await, vec!["tf-acc-test-5555"]);
}
