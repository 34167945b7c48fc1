//! Structural validation of DID Documents.
//!
//! Checks run in a fixed order and stop at the first failure:
//! JSON syntax, `@context`, `id`, `authentication`, `verificationMethod`,
//! then the first verification method and its `publicKeyJwk`.
//!
//! Only `verificationMethod[0]` is inspected. Later methods are accepted as
//! they are. Passing these checks is the only condition for acceptance: the
//! typed [`DIDDocument`] keeps entries it cannot type as raw JSON instead of
//! rejecting them.

mod document;
mod method;

use serde_json::Value;

use crate::error::ValidationError;
use crate::types::{AuthenticationEntry, ContextEntry, DIDDocument, MethodEntry};

pub use document::{check_authentication, check_context, check_id, check_verification_methods};
pub use method::{check_first_method, check_public_key};

/// Context URI every DID Document must list
pub const DID_CORE_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Validates a raw DID Document and returns its typed view
pub fn validate(raw: &str) -> Result<DIDDocument, ValidationError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| ValidationError::NotJSON)?;
    validate_value(value)
}

/// Validates an already parsed DID Document and returns its typed view
pub fn validate_value(value: Value) -> Result<DIDDocument, ValidationError> {
    check_context(&value)?;
    check_id(&value)?;
    check_authentication(&value)?;
    let methods = check_verification_methods(&value)?;
    check_first_method(&methods[0])?;
    check_public_key(&methods[0])?;

    into_document(value)
}

/// Splits a checked document into its typed view.
///
/// Every branch here was already decided by the checks above; the errors
/// only restate them.
fn into_document(value: Value) -> Result<DIDDocument, ValidationError> {
    let Value::Object(mut members) = value else {
        return Err(ValidationError::MissingContext);
    };

    let Some(Value::Array(context)) = members.remove("@context") else {
        return Err(ValidationError::MissingContext);
    };
    let Some(Value::String(id)) = members.remove("id") else {
        return Err(ValidationError::InvalidId);
    };
    let Some(Value::Array(authentication)) = members.remove("authentication") else {
        return Err(ValidationError::InvalidAuthentication);
    };
    let Some(Value::Array(methods)) = members.remove("verificationMethod") else {
        return Err(ValidationError::MissingVerificationMethod);
    };

    Ok(DIDDocument {
        context: context.into_iter().map(ContextEntry::from).collect(),
        id,
        authentication: authentication.into_iter().map(AuthenticationEntry::from).collect(),
        verification_method: methods.into_iter().map(MethodEntry::from).collect(),
        extra: members,
    })
}

/// Returns whether the raw document passes validation
pub fn is_valid(raw: &str) -> bool {
    validate(raw).is_ok()
}

/// Reads a member as a non-empty string
fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
