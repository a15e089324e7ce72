//! Backend-agnostic client contract

use std::fmt::Debug;
use std::sync::Arc;

use url::Url;

use crate::entity::{Entity, CONTENT_TYPE};
use crate::error::HttpError;
use crate::options::Options;
use crate::request::{Method, Request};
use crate::response::Response;

/// `Accept` header name
pub const ACCEPT: &str = "Accept";
/// `Content-Length` header name
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Blocking HTTP client
///
/// Implementations are safe to share between threads. Each call blocks for
/// connect, transfer and any retries.
pub trait Client: Send + Sync + Debug {
    /// Execute `request`, using `options` when given and the client's own
    /// defaults otherwise.
    ///
    /// Fails with [`HttpError::UrlSyntax`] before any I/O when the URL is not
    /// an absolute http(s) URL, and with [`HttpError::Transport`] on I/O
    /// failure once retries are spent. Any HTTP status is a response.
    fn execute(&self, request: Arc<Request>, options: Option<&Options>)
        -> Result<Response, HttpError>;
}

/// Parse and check the request URL before touching the network
pub(crate) fn validate_url(raw: &str) -> Result<Url, HttpError> {
    let url = Url::parse(raw).map_err(|e| HttpError::url_syntax(raw, e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(HttpError::url_syntax(
                raw,
                format!("unsupported scheme `{}`", other),
            ))
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(HttpError::url_syntax(raw, "missing host"));
    }

    Ok(url)
}

/// Options for this call and whether they differ from the client defaults
pub(crate) fn effective_options<'a>(
    defaults: &'a Options,
    options: Option<&'a Options>,
) -> (&'a Options, bool) {
    match options {
        Some(options) if options != defaults => (options, true),
        _ => (defaults, false),
    }
}

/// Headers to forward to the transport.
///
/// `Content-Length` is always dropped; the transport computes it. A caller
/// `Content-Type` is dropped when the entity supplies the resolved one.
/// `Accept: */*` is added when the caller set no `Accept`.
pub(crate) fn outgoing_headers(
    request: &Request,
    entity: Option<&Entity>,
) -> Vec<(String, String)> {
    let entity_sets_content_type = match entity {
        Some(Entity::Bytes { content_type, .. }) => content_type.is_some(),
        Some(Entity::Multipart(_)) => true,
        None => false,
    };

    let mut headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_LENGTH))
        .filter(|(name, _)| {
            !(entity_sets_content_type && name.eq_ignore_ascii_case(CONTENT_TYPE))
        })
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    if !request.headers().contains(ACCEPT) {
        headers.push((ACCEPT.to_string(), "*/*".to_string()));
    }

    headers
}

/// Whether a response to `method` with `status` can carry an entity
pub(crate) fn response_has_body(method: Method, status: u16) -> bool {
    !(method == Method::Head || status == 204 || status == 304 || (100..200).contains(&status))
}
