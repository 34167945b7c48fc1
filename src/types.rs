//! Core types for DID:WBA resolution and authentication.
//!
//! This module provides the DID Document data structures, the result
//! envelopes returned by every client operation, and the wire shapes of the
//! authentication endpoints.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResolutionError;

/// A DID Document.
///
/// Only what validation guarantees is typed: the context and
/// authentication lists, the `id`, and verification methods that carry a
/// complete JWK. Entries of other shapes are kept as raw JSON, and any other
/// member is kept in `extra`. Everything serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DIDDocument {
    /// The context of the DID Document
    #[serde(rename = "@context")]
    pub context: Vec<ContextEntry>,

    /// The DID itself
    pub id: String,

    /// Authentication verification methods, by reference or embedded
    pub authentication: Vec<AuthenticationEntry>,

    /// Verification methods associated with this DID
    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<MethodEntry>,

    /// Vendor and extension members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DIDDocument {
    /// The first verification method, the one validation vouches for
    pub fn primary_method(&self) -> Option<&VerificationMethod> {
        self.verification_method.first().and_then(MethodEntry::as_method)
    }
}

/// An entry of `@context`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextEntry {
    Uri(String),
    /// Inline JSON-LD definitions or anything else
    Other(Value),
}

impl From<Value> for ContextEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::String(uri) => Self::Uri(uri),
            other => Self::Other(other),
        }
    }
}

/// An entry of `authentication`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthenticationEntry {
    /// A verification method id
    Reference(String),
    /// A verification method embedded in place
    Embedded(Value),
}

impl From<Value> for AuthenticationEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::String(reference) => Self::Reference(reference),
            other => Self::Embedded(other),
        }
    }
}

/// An entry of `verificationMethod`
///
/// Only the first entry is checked by the validator. Later entries that do
/// not fit [`VerificationMethod`] are kept as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodEntry {
    Method(VerificationMethod),
    Other(Value),
}

impl MethodEntry {
    pub fn as_method(&self) -> Option<&VerificationMethod> {
        match self {
            Self::Method(method) => Some(method),
            Self::Other(_) => None,
        }
    }
}

impl From<Value> for MethodEntry {
    fn from(value: Value) -> Self {
        match serde_json::from_value::<VerificationMethod>(value.clone()) {
            Ok(method) => Self::Method(method),
            Err(_) => Self::Other(value),
        }
    }
}

/// A verification method in a DID Document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// The unique identifier for this verification method
    pub id: String,

    /// The type of the verification method
    #[serde(rename = "type")]
    pub method_type: String,

    /// The controller of this verification method
    pub controller: String,

    /// The public key as a JWK
    #[serde(rename = "publicKeyJwk")]
    pub public_key_jwk: PublicKeyJwk,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A public key in JWK form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Envelope returned by every client operation.
///
/// `ok == false` means `data` is absent. A `status` of `0` means the request
/// never produced a usable response (transport, decode or input failure);
/// any other status is the one the server answered with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub ok: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResult<T> {
    /// A successful result carrying `data`
    pub fn success(status: u16, data: T) -> Self {
        Self {
            ok: true,
            status,
            data: Some(data),
            error: None,
        }
    }

    /// A failed result with the given status and message
    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Converts an error into a failed result, keeping its status
    pub fn from_error(error: &ResolutionError) -> Self {
        Self::failure(error.status(), error.to_string())
    }

    /// Transforms the payload of a successful result
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        ApiResult {
            ok: self.ok,
            status: self.status,
            data: self.data.map(f),
            error: self.error,
        }
    }
}

impl<T> From<Result<ApiResult<T>, ResolutionError>> for ApiResult<T> {
    fn from(result: Result<ApiResult<T>, ResolutionError>) -> Self {
        result.unwrap_or_else(|e| Self::from_error(&e))
    }
}

/// Outcome of a single authentication probe
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub ok: bool,
    pub status: u16,
    /// Bearer token issued by the server, without the `Bearer ` prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Challenge sent along with a 401
    #[serde(skip_serializing_if = "Option::is_none")]
    pub www_authenticate: Option<String>,
    /// Plain-text body of a successful response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuthResult {
    /// A result for a probe that never reached the server
    pub fn from_error(error: &ResolutionError) -> Self {
        Self {
            ok: false,
            status: error.status(),
            error_message: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Body posted to the signed-assertion exchange endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub did_document: String,
    pub private_key: String,
    pub auth_url: String,
}

/// Response of the signed-assertion exchange endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub authorization: String,
    #[serde(default)]
    pub auth_code: i64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub access_token: String,
}

/// Identity material issued by the generation endpoint.
///
/// The document arrives as a JSON-encoded string and is parsed again.
/// The private key is opaque and never inspected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedIdentity {
    pub did_document: DIDDocument,
    pub private_key: String,
}

/// Wire shape of the generation endpoint's response
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    pub did_document: String,
    pub private_key: String,
}

/// A document accepted by the hosting service and the DID it resolves under
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedDocument {
    pub did: String,
    pub document: DIDDocument,
}

/// Named test endpoints of the token probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestEndpoint {
    /// Answers 200 when the bearer token is accepted
    Test,
    /// Always challenges with a 401
    Test401,
}

impl TestEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Test401 => "test401",
        }
    }
}

impl FromStr for TestEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Self::Test),
            "test401" => Ok(Self::Test401),
            other => Err(format!("unknown test endpoint '{other}', expected 'test' or 'test401'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_keeps_extra_members() {
        let raw = json!({
            "@context": ["https://www.w3.org/ns/did/v1"],
            "id": "did:wba:example.com:user:alice",
            "authentication": ["did:wba:example.com:user:alice#k1"],
            "verificationMethod": [{
                "id": "k1",
                "type": "JsonWebKey2020",
                "controller": "did:wba:example.com:user:alice",
                "publicKeyJwk": {"kty": "EC", "crv": "P-256", "x": "abc", "y": "def"}
            }],
            "service": [{"id": "#agent", "type": "AgentDescription"}]
        });

        let doc: DIDDocument = serde_json::from_value(raw.clone()).unwrap();
        assert!(doc.extra.contains_key("service"));
        let jwk = &doc.primary_method().unwrap().public_key_jwk;
        assert_eq!(jwk.extra.get("y"), Some(&json!("def")));

        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_entries_of_other_shapes_round_trip() {
        let raw = json!({
            "@context": ["https://www.w3.org/ns/did/v1", {"@vocab": "https://example.com/#"}],
            "id": "did:wba:example.com:user:alice",
            "authentication": [
                "k1",
                {"id": "k2", "type": "Multikey", "controller": "did:wba:example.com:user:alice"}
            ],
            "verificationMethod": [
                {
                    "id": "k1",
                    "type": "JsonWebKey2020",
                    "controller": "did:wba:example.com:user:alice",
                    "publicKeyJwk": {"kty": "EC", "crv": "P-256", "x": "abc"}
                },
                {"id": 7, "publicKeyJwk": "z6Mk"}
            ]
        });

        let doc: DIDDocument = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(doc.context[1], ContextEntry::Other(_)));
        assert!(matches!(doc.authentication[0], AuthenticationEntry::Reference(_)));
        assert!(matches!(doc.authentication[1], AuthenticationEntry::Embedded(_)));
        assert!(doc.verification_method[0].as_method().is_some());
        assert!(doc.verification_method[1].as_method().is_none());

        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_api_result_from_error() {
        let err = ResolutionError::ServerRejected {
            status: 403,
            message: "forbidden".to_string(),
        };
        let result: ApiResult<DIDDocument> = ApiResult::from_error(&err);
        assert!(!result.ok);
        assert_eq!(result.status, 403);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("forbidden"));
    }

    #[test]
    fn test_auth_result_serializes_camel_case() {
        let result = AuthResult {
            ok: false,
            status: 401,
            www_authenticate: Some("DIDWba realm=\"test\"".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["wwwAuthenticate"], json!("DIDWba realm=\"test\""));
        assert!(value.get("token").is_none());
    }

    #[test]
    fn test_test_endpoint_from_str() {
        assert_eq!("test".parse::<TestEndpoint>(), Ok(TestEndpoint::Test));
        assert_eq!("test401".parse::<TestEndpoint>(), Ok(TestEndpoint::Test401));
        assert!("test500".parse::<TestEndpoint>().is_err());
    }
}
