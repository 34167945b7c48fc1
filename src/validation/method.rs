//! Checks on the first verification method.

use serde_json::Value;

use super::non_empty_str;
use crate::error::ValidationError;

/// The method must carry a non-empty `id`, `type` and `controller`
pub fn check_first_method(method: &Value) -> Result<(), ValidationError> {
    let complete = ["id", "type", "controller"]
        .iter()
        .all(|key| non_empty_str(method, key).is_some());

    if complete {
        Ok(())
    } else {
        Err(ValidationError::IncompleteVerificationMethod)
    }
}

/// The method's `publicKeyJwk` must carry `kty`, `crv` and `x`
pub fn check_public_key(method: &Value) -> Result<(), ValidationError> {
    let jwk = method
        .get("publicKeyJwk")
        .filter(|jwk| jwk.is_object())
        .ok_or(ValidationError::IncompleteKey)?;

    let complete = ["kty", "crv", "x"]
        .iter()
        .all(|key| non_empty_str(jwk, key).is_some());

    if complete {
        Ok(())
    } else {
        Err(ValidationError::IncompleteKey)
    }
}
