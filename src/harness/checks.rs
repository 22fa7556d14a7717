//! Assertions over harness state and the remote system.

use super::{flatten, ResourceState, State, VerificationFailure};
use crate::constants::CODE_REPOSITORY_STATE_TYPE;
use crate::model::{Arn, CodeRepository};
use crate::reconciler::CodeRepositoryReconciler;
use tracing::{debug, info};

fn resource<'a>(state: &'a State, address: &str) -> Result<&'a ResourceState, VerificationFailure> {
    let resource = state
        .get(address)
        .ok_or_else(|| VerificationFailure::NotInState {
            address: address.to_string(),
        })?;
    if resource.id.is_empty() {
        return Err(VerificationFailure::NoIdSet {
            address: address.to_string(),
        });
    }
    Ok(resource)
}

/// The resource is in state and the remote system describes it
pub async fn check_exists(
    reconciler: &CodeRepositoryReconciler,
    state: &State,
    address: &str,
) -> Result<CodeRepository, VerificationFailure> {
    let resource = resource(state, address)?;
    Ok(reconciler.describe(&resource.id).await?)
}

/// A state attribute has exactly the expected value
pub fn check_attr(
    state: &State,
    address: &str,
    key: &str,
    expected: &str,
) -> Result<(), VerificationFailure> {
    let resource = resource(state, address)?;
    let actual = resource.attribute(key);
    if actual == Some(expected) {
        return Ok(());
    }
    Err(VerificationFailure::AttributeMismatch {
        address: address.to_string(),
        key: key.to_string(),
        expected: expected.to_string(),
        actual: actual.map(ToString::to_string),
    })
}

/// A state attribute is a regional ARN in the reconciler's region with the
/// given service and resource
///
/// The account must be a 12 digit AWS account ID.
pub fn check_regional_arn(
    state: &State,
    address: &str,
    key: &str,
    service: &str,
    resource_path: &str,
    region: &str,
) -> Result<(), VerificationFailure> {
    let resource = resource(state, address)?;
    let invalid = |reason: String| VerificationFailure::InvalidArn {
        address: address.to_string(),
        key: key.to_string(),
        reason,
    };

    let value = resource
        .attribute(key)
        .ok_or_else(|| invalid("attribute is not set".to_string()))?;
    let arn: Arn = value.parse().map_err(|e| invalid(format!("{e}")))?;

    if arn.service != service {
        return Err(invalid(format!("service {:?} != {service:?}", arn.service)));
    }
    if arn.region != region {
        return Err(invalid(format!("region {:?} != {region:?}", arn.region)));
    }
    if arn.account_id.len() != 12 || !arn.account_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(format!(
            "account {:?} is not an AWS account ID",
            arn.account_id
        )));
    }
    if arn.resource != resource_path {
        return Err(invalid(format!(
            "resource {:?} != {resource_path:?}",
            arn.resource
        )));
    }
    Ok(())
}

/// Importing by ID alone reproduces every attribute in state
///
/// Keys in `ignore` are skipped on both sides.
pub async fn import_verify(
    reconciler: &CodeRepositoryReconciler,
    state: &State,
    address: &str,
    ignore: &[&str],
) -> Result<CodeRepository, VerificationFailure> {
    let resource = resource(state, address)?;
    let imported = reconciler.import(&resource.id).await?;
    let imported_attributes = flatten(&imported);

    let keys = resource
        .attributes
        .keys()
        .chain(imported_attributes.keys())
        .filter(|k| !ignore.contains(&k.as_str()));
    for key in keys {
        let expected = resource.attributes.get(key);
        let actual = imported_attributes.get(key);
        if expected != actual {
            return Err(VerificationFailure::ImportMismatch {
                address: address.to_string(),
                key: key.clone(),
                expected: expected.cloned(),
                imported: actual.cloned(),
            });
        }
    }
    debug!("{} import verified", address);
    Ok(imported)
}

/// No code repository in state still exists remotely
///
/// A record describing under a different name does not count as existing.
/// Errors other than not-found are returned rather than read as absence.
pub async fn check_destroy(
    reconciler: &CodeRepositoryReconciler,
    state: &State,
) -> Result<(), VerificationFailure> {
    for resource in state.of_type(CODE_REPOSITORY_STATE_TYPE) {
        if reconciler
            .exists_and_matches(&resource.id, &resource.id)
            .await?
        {
            return Err(VerificationFailure::StillExists {
                name: resource.id.clone(),
            });
        }
    }
    Ok(())
}

/// Delete the resource behind the harness's back
pub async fn disappear(
    reconciler: &CodeRepositoryReconciler,
    state: &State,
    address: &str,
) -> Result<(), VerificationFailure> {
    let resource = resource(state, address)?;
    info!("Removing {} ({}) out-of-band", address, resource.id);
    reconciler.delete(&resource.id).await?;
    Ok(())
}
