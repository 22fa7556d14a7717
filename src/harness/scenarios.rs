//! End-to-end lifecycle scenarios built from the harness checks.
//!
//! Every scenario destroys what it created and runs [`check_destroy`], even
//! when a step fails; the step failure takes precedence in the result.

use super::{
    check_attr, check_destroy, check_exists, check_regional_arn, disappear, import_verify,
    Harness, NameGenerator, VerificationFailure,
};
use crate::constants::{CODE_REPOSITORY_RESOURCE_TYPE, SAGEMAKER_SERVICE};
use crate::model::{CodeRepository, CodeRepositorySpec};
use crate::reconciler::CodeRepositoryReconciler;
use tracing::{error, info};

/// Repository URL used by the scenarios
pub const TEST_REPOSITORY_URL: &str =
    "https://github.com/terraform-providers/terraform-provider-aws.git";

/// State address of the resource the scenarios manage
pub const RESOURCE_ADDRESS: &str = "aws_sagemaker_code_repository.test";

/// Create, check every attribute, import-verify, destroy
pub async fn basic(
    reconciler: &CodeRepositoryReconciler,
    names: &dyn NameGenerator,
) -> Result<CodeRepository, VerificationFailure> {
    let name = names.generate();
    info!("Running basic scenario with {}", name);
    let mut harness = Harness::new(reconciler.clone());

    let steps = basic_steps(&mut harness, &name).await;
    let teardown = teardown(&mut harness).await;
    finish(steps, teardown)
}

async fn basic_steps(
    harness: &mut Harness,
    name: &str,
) -> Result<CodeRepository, VerificationFailure> {
    harness
        .apply(
            RESOURCE_ADDRESS,
            CodeRepositorySpec::new(name, TEST_REPOSITORY_URL),
        )
        .await?;

    let reconciler = harness.reconciler();
    let state = harness.state();
    check_exists(reconciler, state, RESOURCE_ADDRESS).await?;
    check_attr(state, RESOURCE_ADDRESS, "code_repository_name", name)?;
    check_regional_arn(
        state,
        RESOURCE_ADDRESS,
        "arn",
        SAGEMAKER_SERVICE,
        &format!("{CODE_REPOSITORY_RESOURCE_TYPE}/{name}"),
        reconciler.region(),
    )?;
    check_attr(state, RESOURCE_ADDRESS, "git_config.#", "1")?;
    check_attr(
        state,
        RESOURCE_ADDRESS,
        "git_config.0.repository_url",
        TEST_REPOSITORY_URL,
    )?;

    import_verify(reconciler, state, RESOURCE_ADDRESS, &[]).await
}

/// Create, delete out-of-band, expect the next plan to recreate, destroy
pub async fn disappears(
    reconciler: &CodeRepositoryReconciler,
    names: &dyn NameGenerator,
) -> Result<(), VerificationFailure> {
    let name = names.generate();
    info!("Running disappears scenario with {}", name);
    let mut harness = Harness::new(reconciler.clone());

    let steps = disappears_steps(&mut harness, &name).await;
    let teardown = teardown(&mut harness).await;
    finish(steps, teardown)
}

async fn disappears_steps(harness: &mut Harness, name: &str) -> Result<(), VerificationFailure> {
    harness
        .apply(
            RESOURCE_ADDRESS,
            CodeRepositorySpec::new(name, TEST_REPOSITORY_URL),
        )
        .await?;
    check_exists(harness.reconciler(), harness.state(), RESOURCE_ADDRESS).await?;
    disappear(harness.reconciler(), harness.state(), RESOURCE_ADDRESS).await?;

    // Keep the vanished record in the final state so check_destroy still
    // looks it up.
    let snapshot = harness.state().clone();
    let plan = harness.plan().await?;
    if plan.is_empty() {
        return Err(VerificationFailure::ExpectedNonEmptyPlan);
    }
    harness.restore_state(snapshot);
    Ok(())
}

async fn teardown(harness: &mut Harness) -> Result<(), VerificationFailure> {
    harness.destroy().await?;
    check_destroy(harness.reconciler(), harness.state()).await
}

fn finish<T>(
    steps: Result<T, VerificationFailure>,
    teardown: Result<(), VerificationFailure>,
) -> Result<T, VerificationFailure> {
    match (steps, teardown) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(e), teardown) => {
            if let Err(teardown_err) = teardown {
                error!("Teardown also failed: {}", teardown_err);
            }
            Err(e)
        }
        (Ok(_), Err(e)) => Err(e),
    }
}
