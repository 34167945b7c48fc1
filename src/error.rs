//! Error types for DID:WBA resolution and authentication.
//!
//! Parsing and validation errors are raised before any request is made.
//! Everything that happens on the wire ends up in [`ResolutionError`], which
//! knows how to map itself onto the status code carried by result envelopes.

use thiserror::Error;

/// Errors produced while turning a DID string into a document location
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The DID does not have the `did:wba:<authority>:<segment>+` shape
    #[error("Malformed DID: {0}")]
    MalformedDID(String),
}

/// Structural problems found in a DID Document, reported in check order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The input is not JSON
    #[error("Document is not valid JSON")]
    NotJSON,

    /// `@context` is missing, not a list, or lacks the DID core context
    #[error("Document @context must be a list containing https://www.w3.org/ns/did/v1")]
    MissingContext,

    /// `id` is missing or does not start with `did:`
    #[error("Document id must be a string starting with 'did:'")]
    InvalidId,

    /// `authentication` is not a list
    #[error("Document authentication must be a list")]
    InvalidAuthentication,

    /// `verificationMethod` is missing or empty
    #[error("Document verificationMethod must be a non-empty list")]
    MissingVerificationMethod,

    /// The first verification method lacks `id`, `type` or `controller`
    #[error("Verification method must have id, type and controller")]
    IncompleteVerificationMethod,

    /// The first verification method's `publicKeyJwk` lacks `kty`, `crv` or `x`
    #[error("Verification method publicKeyJwk must have kty, crv and x")]
    IncompleteKey,
}

/// Errors that can occur during resolution, upload and authentication
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// The DID could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The document failed structural validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request never produced a usable response
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    /// URL parse error
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolutionError {
    /// Status code reported in result envelopes.
    ///
    /// Only a server rejection carries a real HTTP status. Every other
    /// failure is reported as `0`.
    pub fn status(&self) -> u16 {
        match self {
            Self::ServerRejected { status, .. } => *status,
            _ => 0,
        }
    }

    /// Short label for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::ServerRejected { .. } => "server",
            Self::Url(_) => "url",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let rejected = ResolutionError::ServerRejected {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(rejected.status(), 404);
        assert_eq!(rejected.kind(), "server");

        let transport = ResolutionError::Transport("connection refused".to_string());
        assert_eq!(transport.status(), 0);
        assert_eq!(transport.kind(), "transport");

        let parse = ResolutionError::from(ParseError::MalformedDID("did:web:x".to_string()));
        assert_eq!(parse.status(), 0);
        assert_eq!(parse.kind(), "parse");
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err = ResolutionError::from(ValidationError::MissingContext);
        assert_eq!(err.to_string(), ValidationError::MissingContext.to_string());
    }
}
