//! Caller API key extraction.
//!
//! HTTP requests carry the key in the `Roblox-Api-Key` header or, when the
//! header is absent, in the `apiKey` query parameter. RPC calls carry it in
//! call metadata under the same header name. Missing and malformed keys both
//! parse to `None`. A repeated query parameter resolves to its first value.

use http::header::HeaderName;
use http::{HeaderMap, Uri};
use url::form_urlencoded;
use uuid::Uuid;

/// Display name of the API key header, as used in caller-facing messages.
pub const API_KEY_HEADER: &str = "Roblox-Api-Key";
/// Query parameter consulted by the HTTP parser when the header is absent.
pub const API_KEY_QUERY_PARAMETER: &str = "apiKey";
/// Header naming the calling application, used as a metrics label.
pub const APPLICATION_NAME_HEADER: &str = "Roblox-Application-Name";
/// Application label used when the header is absent.
pub const UNKNOWN_APPLICATION_NAME: &str = "Unknown";

static API_KEY_HEADER_NAME: HeaderName = HeaderName::from_static("roblox-api-key");
static APPLICATION_NAME_HEADER_NAME: HeaderName = HeaderName::from_static("roblox-application-name");

/// Extracts the caller's key from request headers and URI.
pub trait ApiKeyParser: Send + Sync {
    fn try_parse(&self, headers: &HeaderMap, uri: &Uri) -> Option<Uuid>;
}

/// Parser for the HTTP surface: header first, then query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpApiKeyParser;

/// Parser for the RPC surface: metadata header only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcApiKeyParser;

impl ApiKeyParser for HttpApiKeyParser {
    fn try_parse(&self, headers: &HeaderMap, uri: &Uri) -> Option<Uuid> {
        if headers.contains_key(&API_KEY_HEADER_NAME) {
            return parse_header(headers);
        }

        let query = uri.query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == API_KEY_QUERY_PARAMETER)
            .and_then(|(_, value)| parse_key(&value))
    }
}

impl ApiKeyParser for RpcApiKeyParser {
    fn try_parse(&self, headers: &HeaderMap, _uri: &Uri) -> Option<Uuid> {
        parse_header(headers)
    }
}

/// Calling application name from the `Roblox-Application-Name` header.
#[must_use]
pub fn application_name(headers: &HeaderMap) -> &str {
    headers
        .get(&APPLICATION_NAME_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_APPLICATION_NAME)
}

fn parse_header(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(&API_KEY_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_key)
}

fn parse_key(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
