//! Resolver and authentication client for the DID:WBA (web-based agent) method.
//!
//! This library turns `did:wba:` identifiers into document URLs, validates
//! DID Documents, publishes and retrieves them from a hosting service, and
//! drives the token probe and signed-assertion exchange used to authenticate
//! an agent. Every client operation returns a result envelope instead of an
//! error, with status `0` for failures that never reached a server.

mod auth;
mod config;
mod did;
mod error;
mod resolver;
mod transport;
mod types;
pub mod validation;

#[cfg(test)]
mod testing;

pub use auth::{AuthClient, AuthState};
pub use config::{ClientConfig, LogConfig, LogFormat};
pub use did::{
    did_for_user, generate_user_id, parse, user_document_url, DidAddress, ResolvedLocation,
    WbaDid,
};
pub use error::{ParseError, ResolutionError, ValidationError};
pub use resolver::{resolve_did, Resolver};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
pub use types::{
    ApiResult, AuthRequest, AuthResponse, AuthResult, AuthenticationEntry, ContextEntry,
    DIDDocument, GeneratedIdentity, MethodEntry, PublicKeyJwk, PublishedDocument, TestEndpoint,
    VerificationMethod,
};
pub use validation::{is_valid, validate};

/// Resolves a DID:WBA identifier with the default configuration
///
/// # Example
/// ```no_run
/// use wba_resolver::resolve;
///
/// #[tokio::main]
/// async fn main() {
///     let result = resolve("did:wba:pi-unlimited.com:wba:user:alice").await;
///
///     match result.data {
///         Some(doc) => println!("Resolved DID Document: {}", doc.id),
///         None => eprintln!("Resolution failed ({}): {:?}", result.status, result.error),
///     }
/// }
/// ```
pub async fn resolve(did: &str) -> ApiResult<DIDDocument> {
    resolve_did(did).await
}
