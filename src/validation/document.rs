//! Document-level checks.

use serde_json::Value;

use super::DID_CORE_CONTEXT;
use crate::error::ValidationError;

/// `@context` must be a list containing the DID core context
pub fn check_context(doc: &Value) -> Result<(), ValidationError> {
    let context = doc
        .get("@context")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingContext)?;

    if !context.iter().any(|c| c.as_str() == Some(DID_CORE_CONTEXT)) {
        return Err(ValidationError::MissingContext);
    }

    Ok(())
}

/// `id` must be a string starting with `did:`
pub fn check_id(doc: &Value) -> Result<(), ValidationError> {
    match doc.get("id").and_then(Value::as_str) {
        Some(id) if id.starts_with("did:") => Ok(()),
        _ => Err(ValidationError::InvalidId),
    }
}

/// `authentication` must be a list, possibly empty
pub fn check_authentication(doc: &Value) -> Result<(), ValidationError> {
    if doc.get("authentication").is_some_and(Value::is_array) {
        Ok(())
    } else {
        Err(ValidationError::InvalidAuthentication)
    }
}

/// `verificationMethod` must be a non-empty list
pub fn check_verification_methods(doc: &Value) -> Result<&Vec<Value>, ValidationError> {
    doc.get("verificationMethod")
        .and_then(Value::as_array)
        .filter(|methods| !methods.is_empty())
        .ok_or(ValidationError::MissingVerificationMethod)
}
