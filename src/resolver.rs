//! Core DID resolution functionality.
//!
//! This module provides the client for the hosting service: publishing DID
//! Documents, retrieving them by DID or by user id, and requesting freshly
//! generated identities. Every operation returns an [`ApiResult`]; no error
//! escapes the client.
//!
//! Uploads are replace-semantics `PUT`s. Concurrent uploads to the same user
//! id are last-write-wins; the service performs no conflict detection.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::did::{did_for_user, endpoint_url, user_document_url, DidAddress};
use crate::error::{ResolutionError, ValidationError};
use crate::transport::{HttpRequest, Method, ReqwestTransport, Transport};
use crate::types::{ApiResult, DIDDocument, GenerateResponse, GeneratedIdentity, PublishedDocument};
use crate::validation;

/// Client for publishing and resolving DID:WBA documents
#[derive(Clone)]
pub struct Resolver {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl Resolver {
    /// Creates a resolver that talks HTTP through `reqwest`
    pub fn new(config: ClientConfig) -> Result<Self, ResolutionError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a resolver on top of an arbitrary transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Uploads a DID Document for `user_id`.
    ///
    /// The document is parsed and re-serialized before sending, so the
    /// server sees normalized JSON rather than the caller's raw text. On
    /// success the document echoed back by the server is returned.
    pub async fn upload(&self, user_id: &str, document_json: &str) -> ApiResult<DIDDocument> {
        self.try_upload(user_id, document_json).await.into()
    }

    async fn try_upload(
        &self,
        user_id: &str,
        document_json: &str,
    ) -> Result<ApiResult<DIDDocument>, ResolutionError> {
        let doc: Value =
            serde_json::from_str(document_json).map_err(|_| ValidationError::NotJSON)?;
        let url = user_document_url(&self.config.base_url, user_id)?;

        info!(%url, user_id, "uploading DID Document");

        let request = HttpRequest::new(Method::Put, url).json_body(serde_json::to_string(&doc)?);
        let response = self.transport.fetch(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "upload rejected");
            return Ok(ApiResult::failure(
                response.status,
                format!("Upload failed with status: {}", response.status),
            ));
        }

        let stored: DIDDocument = serde_json::from_str(&response.body)?;
        Ok(ApiResult::success(response.status, stored))
    }

    /// Validates a raw document, then uploads it.
    ///
    /// Invalid input is rejected without a request being made. On success
    /// the DID under which the document now resolves is returned with it.
    pub async fn publish(&self, user_id: &str, document_json: &str) -> ApiResult<PublishedDocument> {
        if let Err(e) = validation::validate(document_json) {
            debug!(error = %e, "refusing to publish invalid document");
            return ApiResult::from_error(&ResolutionError::from(e));
        }

        let did = match did_for_user(&self.config.base_url, user_id) {
            Ok(did) => did,
            Err(e) => return ApiResult::from_error(&e),
        };

        self.upload(user_id, document_json)
            .await
            .map(|document| PublishedDocument { did, document })
    }

    /// Resolves a `did:wba:` identifier to its DID Document.
    ///
    /// Any failure, including a non-success status from the document host,
    /// is reported with status `0`.
    pub async fn retrieve(&self, did: &str) -> ApiResult<DIDDocument> {
        self.retrieve_address(&DidAddress::ByDid(did.to_string())).await
    }

    /// Retrieves a user's DID Document directly from the hosting service.
    ///
    /// Unlike [`Resolver::retrieve`], a rejection keeps the server's status.
    pub async fn retrieve_basic(&self, user_id: &str) -> ApiResult<DIDDocument> {
        self.retrieve_address(&DidAddress::ByUserId(user_id.to_string())).await
    }

    /// Retrieves a DID Document by either addressing mode
    pub async fn retrieve_address(&self, address: &DidAddress) -> ApiResult<DIDDocument> {
        match self.fetch_document(address).await {
            Ok((status, doc)) => ApiResult::success(status, doc),
            Err(e) => {
                warn!(error = %e, ?address, "DID Document retrieval failed");
                match (address, e) {
                    (DidAddress::ByDid(_), ResolutionError::ServerRejected { status, .. }) => {
                        ApiResult::failure(
                            0,
                            format!("Failed to resolve DID Document: server responded with status {status}"),
                        )
                    }
                    (_, e) => ApiResult::from_error(&e),
                }
            }
        }
    }

    async fn fetch_document(
        &self,
        address: &DidAddress,
    ) -> Result<(u16, DIDDocument), ResolutionError> {
        let url = address.to_url(&self.config.base_url)?;

        debug!(%url, "fetching DID Document");

        let request = HttpRequest::new(Method::Get, url).header("Accept", "application/json");
        let response = self.transport.fetch(request).await?;

        if !response.is_success() {
            return Err(ResolutionError::ServerRejected {
                status: response.status,
                message: response.body,
            });
        }

        let doc = validation::validate(&response.body)?;
        info!(id = %doc.id, "DID Document retrieved");
        Ok((response.status, doc))
    }

    /// Requests a freshly generated identity from the demo endpoint.
    ///
    /// The document comes back as a JSON-encoded string and is validated
    /// after decoding. The private key is passed through untouched.
    pub async fn generate(&self) -> ApiResult<GeneratedIdentity> {
        self.try_generate().await.into()
    }

    async fn try_generate(&self) -> Result<ApiResult<GeneratedIdentity>, ResolutionError> {
        let url = endpoint_url(&self.config.base_url, &["wba", "demo", "generate"])?;
        let response = self.transport.fetch(HttpRequest::new(Method::Get, url)).await?;

        if !response.is_success() {
            return Ok(ApiResult::failure(
                response.status,
                format!("Generation failed with status: {}", response.status),
            ));
        }

        let generated: GenerateResponse = serde_json::from_str(&response.body)?;
        let did_document = validation::validate(&generated.did_document)?;

        debug!(id = %did_document.id, "identity generated");

        Ok(ApiResult::success(
            response.status,
            GeneratedIdentity {
                did_document,
                private_key: generated.private_key,
            },
        ))
    }
}

/// Resolves a `did:wba:` identifier with the default configuration
pub async fn resolve_did(did: &str) -> ApiResult<DIDDocument> {
    match Resolver::new(ClientConfig::default()) {
        Ok(resolver) => resolver.retrieve(did).await,
        Err(e) => ApiResult::from_error(&e),
    }
}
