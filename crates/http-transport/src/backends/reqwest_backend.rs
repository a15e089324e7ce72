//! reqwest-based Client implementation

use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;

use crate::client::{self, Client};
use crate::entity::{Entity, CONTENT_TYPE};
use crate::error::HttpError;
use crate::headers::Headers;
use crate::options::{Options, ProxyInfo, ProxyType, MAX_REDIRECTS};
use crate::request::{Method, Request};
use crate::response::{Response, ResponseBody};
use crate::retry;

/// Client backed by a blocking reqwest client
///
/// Transport failures go through the per-failure retry rules of
/// [`RetryPolicy::decide`](crate::RetryPolicy::decide).
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
    defaults: Options,
}

impl ReqwestClient {
    /// Create a client with default options
    pub fn new() -> Result<Self, HttpError> {
        Self::with_options(Options::default())
    }

    /// Create a client whose native client is configured from `defaults`
    pub fn with_options(defaults: Options) -> Result<Self, HttpError> {
        let inner = build_native(&defaults)?;
        Ok(Self { inner, defaults })
    }

    /// Wrap an existing reqwest client; `defaults` should describe how it was
    /// configured
    pub fn from_reqwest(client: reqwest::blocking::Client, defaults: Options) -> Self {
        Self {
            inner: client,
            defaults,
        }
    }

    /// Options used when a call supplies none
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }
}

impl Client for ReqwestClient {
    fn execute(
        &self,
        request: Arc<Request>,
        options: Option<&Options>,
    ) -> Result<Response, HttpError> {
        let url = client::validate_url(request.url())?;
        let (options, scoped) = client::effective_options(&self.defaults, options);

        let scoped_client;
        let native = if scoped {
            tracing::debug!(
                "Building call-scoped reqwest client for {} {}",
                request.method(),
                request.url()
            );
            scoped_client = build_native(options)?;
            &scoped_client
        } else {
            &self.inner
        };

        let entity = Entity::prepare(&request)?;
        let mut headers = client::outgoing_headers(&request, entity.as_ref());
        let data = match entity {
            Some(entity) => {
                let (data, content_type) = entity.into_wire()?;
                if let Some(content_type) = content_type {
                    headers.push((CONTENT_TYPE.to_string(), content_type));
                }
                Some(data)
            }
            None => None,
        };
        let method = native_method(request.method());

        let response = retry::run(options.retry_policy(), request.has_body(), |attempt| {
            tracing::debug!(
                "{} {} (attempt {})",
                request.method(),
                request.url(),
                attempt
            );

            let mut builder = native.request(method.clone(), url.clone());
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            if let Some(data) = &data {
                builder = builder.body(data.clone());
            }

            builder.send().map_err(HttpError::from)
        })?;

        Ok(into_response(response, request))
    }
}

fn build_native(options: &Options) -> Result<reqwest::blocking::Client, HttpError> {
    // past the cap the last 3xx is returned rather than failing the call
    let redirect = if options.follow_redirects() {
        Policy::custom(|attempt| {
            if attempt.previous().len() > MAX_REDIRECTS as usize {
                attempt.stop()
            } else {
                attempt.follow()
            }
        })
    } else {
        Policy::none()
    };

    let builder = reqwest::blocking::Client::builder()
        .connect_timeout(options.connect_timeout())
        .timeout(io_timeout(options))
        .redirect(redirect);

    let builder = match options.proxy_info() {
        Some(proxy) => builder.proxy(native_proxy(proxy)?),
        None => builder.no_proxy(),
    };

    builder.build().map_err(HttpError::from)
}

/// reqwest has a single I/O timeout, so read and write collapse into the
/// larger of the two. Either one disabled disables it.
fn io_timeout(options: &Options) -> Option<Duration> {
    if options.write_timeout_millis() != options.read_timeout_millis() {
        tracing::warn!(
            "reqwest has no separate write timeout, using max(read {} ms, write {} ms)",
            options.read_timeout_millis(),
            options.write_timeout_millis()
        );
    }

    match (options.read_timeout(), options.write_timeout()) {
        (Some(read), Some(write)) => Some(read.max(write)),
        _ => None,
    }
}

fn native_proxy(proxy: &ProxyInfo) -> Result<reqwest::Proxy, HttpError> {
    let proxy_error = |e: reqwest::Error| HttpError::Proxy(e.to_string());

    match proxy.proxy_type {
        ProxyType::Http => {
            let native = reqwest::Proxy::all(proxy.url()?.as_str()).map_err(proxy_error)?;
            Ok(match proxy.credentials() {
                Some((username, password)) => native.basic_auth(username, password),
                None => native,
            })
        }
        // SOCKS5 authenticates through the URL userinfo
        ProxyType::Socks => {
            reqwest::Proxy::all(proxy.url_with_credentials()?.as_str()).map_err(proxy_error)
        }
    }
}

fn native_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
        Method::Trace => reqwest::Method::TRACE,
    }
}

fn into_response(response: reqwest::blocking::Response, request: Arc<Request>) -> Response {
    let status = response.status();
    let headers: Headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = if client::response_has_body(request.method(), status.as_u16()) {
        let content_length = response.content_length();
        let content_type = headers.get(CONTENT_TYPE).map(str::to_string);
        Some(ResponseBody::new(response, content_length, content_type))
    } else {
        None
    };

    Response::new(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        headers,
        request,
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new() {
        let client = ReqwestClient::new().expect("Default client builds");
        assert_eq!(client.defaults(), &Options::default());
        let _ = format!("{:?}", client);
    }

    #[test]
    fn test_from_reqwest() {
        let client =
            ReqwestClient::from_reqwest(reqwest::blocking::Client::new(), Options::default());
        let _ = format!("{:?}", client);
    }

    #[test]
    fn test_io_timeout_is_max_of_read_and_write() {
        let options = Options::builder()
            .read_timeout(Duration::from_secs(5))
            .write_timeout(Duration::from_secs(30))
            .build();
        assert_eq!(io_timeout(&options), Some(Duration::from_secs(30)));

        let options = Options::builder().write_timeout(Duration::ZERO).build();
        assert_eq!(io_timeout(&options), None);
    }

    #[test]
    fn test_builds_with_proxies() {
        let http = ProxyInfo::new("localhost", 3128, ProxyType::Http)
            .with_credentials("user", "secret");
        let options = Options::builder().proxy(http).build();
        assert!(ReqwestClient::with_options(options).is_ok());

        let socks = ProxyInfo::new("localhost", 1080, ProxyType::Socks)
            .with_credentials("user", "secret");
        let options = Options::builder().proxy(socks).build();
        assert!(ReqwestClient::with_options(options).is_ok());
    }

    #[test]
    fn test_invalid_proxy_host() {
        let options = Options::builder()
            .proxy(ProxyInfo::new("bad host", 8080, ProxyType::Http))
            .build();
        assert!(matches!(
            ReqwestClient::with_options(options),
            Err(HttpError::Proxy(_))
        ));
    }

    #[test]
    fn test_invalid_url_fails_before_io() {
        let client = ReqwestClient::new().expect("Default client builds");
        let result = client.execute(Arc::new(Request::get("no-scheme/path")), None);
        assert!(matches!(result, Err(HttpError::UrlSyntax { .. })));
    }

    #[test]
    fn test_native_method() {
        assert_eq!(native_method(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(native_method(Method::Trace), reqwest::Method::TRACE);
    }
}
