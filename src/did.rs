//! DID parsing and URL transformation functionality.
//!
//! This module handles the parsing of DID:WBA identifiers and their
//! transformation into HTTPS URLs for resolution, along with the user-id
//! addressing mode used by the hosting service.

use percent_encoding::percent_decode_str;
use rand::Rng;
use url::Url;

use crate::error::{ParseError, ResolutionError};

/// File name of a DID Document at its resolved location
pub const DID_DOCUMENT_FILE: &str = "did.json";

const DID_SCHEME: &str = "did";
const WBA_METHOD: &str = "wba";
const USER_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Where a DID Document lives, derived from a DID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Always `https`
    pub scheme: &'static str,
    /// Percent-decoded host, optionally with `:port`
    pub authority: String,
    /// Path segments below the authority
    pub path: Vec<String>,
}

impl ResolvedLocation {
    /// Returns the URL of the DID Document:
    /// `https://{authority}/{path joined by '/'}/did.json`
    pub fn document_url(&self) -> Result<Url, ResolutionError> {
        let url = format!(
            "{}://{}/{}/{}",
            self.scheme,
            self.authority,
            self.path.join("/"),
            DID_DOCUMENT_FILE
        );
        Url::parse(&url).map_err(ResolutionError::from)
    }
}

/// Represents a parsed DID:WBA identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WbaDid {
    did: String,
    location: ResolvedLocation,
}

impl WbaDid {
    /// Parses and validates a DID:WBA string
    pub fn parse(did: &str) -> Result<Self, ParseError> {
        let location = parse(did)?;
        Ok(Self {
            did: did.to_string(),
            location,
        })
    }

    /// The DID as originally given
    pub fn as_str(&self) -> &str {
        &self.did
    }

    /// The location this DID resolves to
    pub fn location(&self) -> &ResolvedLocation {
        &self.location
    }

    /// Converts the DID to the HTTPS URL of its document
    pub fn to_url(&self) -> Result<Url, ResolutionError> {
        self.location.document_url()
    }
}

impl std::fmt::Display for WbaDid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.did)
    }
}

/// Turns a `did:wba:<authority>:<segment>+` string into a document location.
///
/// The authority is percent-decoded, so `example.com%3A3000` becomes
/// `example.com:3000`. Path segments are used as given.
///
/// Besides the shape itself, the following are rejected as malformed:
/// - an authority that is empty or does not decode as UTF-8
/// - a decoded authority that is anything other than `host` or
///   `host:port`, such as one carrying userinfo (`@`), a path, a query or a
///   fragment
/// - an empty path segment (`did:wba:example.com::alice`)
/// - a path segment containing `?`, `#` or `\`
pub fn parse(did: &str) -> Result<ResolvedLocation, ParseError> {
    let malformed = || ParseError::MalformedDID(did.to_string());

    let parts: Vec<&str> = did.split(':').collect();
    if parts.len() < 5 || parts[0] != DID_SCHEME || parts[1] != WBA_METHOD {
        return Err(malformed());
    }

    let authority = percent_decode_str(parts[2])
        .decode_utf8()
        .map_err(|_| malformed())?
        .into_owned();
    if !is_host_and_port(&authority) {
        return Err(malformed());
    }

    let path: Vec<String> = parts[3..].iter().map(|s| s.to_string()).collect();
    if path
        .iter()
        .any(|segment| segment.is_empty() || segment.contains(['?', '#', '\\']))
    {
        return Err(malformed());
    }

    Ok(ResolvedLocation {
        scheme: "https",
        authority,
        path,
    })
}

/// True when `authority` is a bare `host` or `host:port`.
///
/// The document URL is assembled by formatting, so anything the URL parser
/// would read as userinfo, path, query or fragment must not get through.
fn is_host_and_port(authority: &str) -> bool {
    if authority.is_empty()
        || authority
            .chars()
            .any(|c| matches!(c, '@' | '/' | '?' | '#' | '\\') || c.is_whitespace() || c.is_control())
    {
        return false;
    }

    match Url::parse(&format!("https://{authority}/")) {
        Ok(url) => {
            url.host_str().is_some()
                && url.username().is_empty()
                && url.password().is_none()
                && url.path() == "/"
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}

/// The two ways a DID Document can be addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DidAddress {
    /// A user id on the configured hosting service
    ByUserId(String),
    /// A full `did:wba:` identifier
    ByDid(String),
}

impl DidAddress {
    /// Builds the document URL for this address.
    ///
    /// `base_url` is only consulted for [`DidAddress::ByUserId`].
    pub fn to_url(&self, base_url: &str) -> Result<Url, ResolutionError> {
        match self {
            Self::ByUserId(user_id) => user_document_url(base_url, user_id),
            Self::ByDid(did) => parse(did)?.document_url(),
        }
    }
}

/// URL of a user's document on the hosting service:
/// `{base}/wba/user/{user_id}/did.json`
pub fn user_document_url(base_url: &str, user_id: &str) -> Result<Url, ResolutionError> {
    endpoint_url(base_url, &[WBA_METHOD, "user", user_id, DID_DOCUMENT_FILE])
}

/// Appends path segments to the base URL, encoding each segment.
pub(crate) fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<Url, ResolutionError> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| ResolutionError::Config(format!("base URL cannot be a base: {base_url}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// The DID under which a user's document on the hosting service resolves.
///
/// Ports are percent-encoded (`:` becomes `%3A`).
///
/// # Examples
/// - `https://pi-unlimited.com`, `alice` -> `did:wba:pi-unlimited.com:wba:user:alice`
/// - `https://localhost:3000`, `alice` -> `did:wba:localhost%3A3000:wba:user:alice`
pub fn did_for_user(base_url: &str, user_id: &str) -> Result<String, ResolutionError> {
    let parsed = Url::parse(base_url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ResolutionError::Config(format!("base URL has no host: {base_url}")))?;

    let authority = match parsed.port() {
        Some(port) => format!("{host}%3A{port}"),
        None => host.to_string(),
    };

    Ok(format!("did:wba:{authority}:wba:user:{user_id}"))
}

/// Generates a random lowercase alphanumeric user id of the given length
pub fn generate_user_id(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| USER_ID_ALPHABET[rng.gen_range(0..USER_ID_ALPHABET.len())] as char)
        .collect()
}
