//! ureq-based Client implementation

use std::sync::Arc;

use ureq::config::Config;
use ureq::http;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, Body, ProxyProtocol, RequestBuilder};

use crate::client::{self, Client};
use crate::entity::{Entity, CONTENT_TYPE};
use crate::error::HttpError;
use crate::headers::Headers;
use crate::options::{Options, ProxyType, MAX_REDIRECTS};
use crate::request::{Method, Request};
use crate::response::{Response, ResponseBody};

/// Client backed by a ureq [`Agent`]
///
/// Received responses are retried coarsely: any non-2xx status is retried
/// while the budget allows, whatever the method, and the last response is
/// returned. Transport failures go through the per-failure rules of
/// [`RetryPolicy::decide`](crate::RetryPolicy::decide).
#[derive(Debug, Clone)]
pub struct UreqClient {
    agent: Agent,
    defaults: Options,
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqClient {
    /// Create a client with default options
    pub fn new() -> Self {
        Self {
            agent: build_agent(&Options::default(), None),
            defaults: Options::default(),
        }
    }

    /// Create a client whose agent is configured from `defaults`
    pub fn with_options(defaults: Options) -> Result<Self, HttpError> {
        let agent = build_agent(&defaults, native_proxy(&defaults)?);
        Ok(Self { agent, defaults })
    }

    /// Options used when a call supplies none
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }
}

impl Client for UreqClient {
    fn execute(
        &self,
        request: Arc<Request>,
        options: Option<&Options>,
    ) -> Result<Response, HttpError> {
        let url = client::validate_url(request.url())?;
        let (options, scoped) = client::effective_options(&self.defaults, options);

        let scoped_agent;
        let agent = if scoped {
            tracing::debug!(
                "Building call-scoped ureq agent for {} {}",
                request.method(),
                request.url()
            );
            scoped_agent = build_agent(options, native_proxy(options)?);
            &scoped_agent
        } else {
            &self.agent
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

        let policy = options.retry_policy();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            tracing::debug!(
                "{} {} (attempt {})",
                request.method(),
                request.url(),
                attempts
            );

            let sent = send(
                agent,
                request.method(),
                url.as_str(),
                &headers,
                data.as_deref(),
            );
            match sent {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if policy.decide_status(status, attempts).is_retry() {
                        tracing::warn!(
                            "Retrying after status {} (attempt {} of {})",
                            status,
                            attempts,
                            policy.max_attempts()
                        );
                        continue;
                    }
                    return Ok(into_response(response, request));
                }
                Err(err) => {
                    let err = HttpError::from(err);
                    let Some(kind) = err.failure_kind() else {
                        return Err(err);
                    };
                    if !policy
                        .decide(kind, attempts, request.has_body())
                        .is_retry()
                    {
                        return Err(err);
                    }
                    tracing::warn!(
                        "Retrying after {} failure (attempt {} of {}): {}",
                        kind,
                        attempts,
                        policy.max_attempts(),
                        err
                    );
                }
            }
        }
    }
}

fn build_agent(options: &Options, proxy: Option<ureq::Proxy>) -> Agent {
    let max_redirects = if options.follow_redirects() {
        MAX_REDIRECTS
    } else {
        0
    };

    let config = Config::builder()
        .timeout_connect(options.connect_timeout())
        .timeout_recv_response(options.read_timeout())
        .timeout_recv_body(options.read_timeout())
        .timeout_send_request(options.write_timeout())
        .timeout_send_body(options.write_timeout())
        .max_redirects(max_redirects)
        // the last 3xx is returned rather than failing the call
        .max_redirects_will_error(false)
        .http_status_as_error(false)
        .proxy(proxy)
        .build();

    Agent::new_with_config(config)
}

fn native_proxy(options: &Options) -> Result<Option<ureq::Proxy>, HttpError> {
    let Some(proxy) = options.proxy_info() else {
        return Ok(None);
    };
    let protocol = match proxy.proxy_type {
        ProxyType::Http => ProxyProtocol::Http,
        ProxyType::Socks => ProxyProtocol::Socks5,
    };
    let url = proxy.url()?;
    let host = url
        .host_str()
        .ok_or_else(|| HttpError::Proxy(format!("Invalid proxy address `{}`", proxy.host)))?;

    let mut builder = ureq::Proxy::builder(protocol).host(host).port(proxy.port);
    if let Some((username, password)) = proxy.credentials() {
        check_credentials(username, password)?;
        builder = builder.username(username).password(password);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| HttpError::Proxy(e.to_string()))
}

/// ureq sends the proxy userinfo verbatim, so credentials must already be
/// valid URI userinfo. The password is split off at the last `:`.
fn check_credentials(username: &str, password: &str) -> Result<(), HttpError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=@%".contains(c);
    let valid = username.chars().all(|c| allowed(c) || c == ':') && password.chars().all(allowed);
    if valid {
        Ok(())
    } else {
        Err(HttpError::Proxy(
            "ureq only sends proxy credentials made of URI userinfo characters, \
             with no `:` in the password"
                .to_string(),
        ))
    }
}

fn apply_headers<B>(
    builder: RequestBuilder<B>,
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    headers.iter().fold(builder, |builder, (name, value)| {
        builder.header(name.as_str(), value.as_str())
    })
}

fn send(
    agent: &Agent,
    method: Method,
    url: &str,
    headers: &[(String, String)],
    data: Option<&[u8]>,
) -> Result<http::Response<Body>, ureq::Error> {
    match method {
        Method::Post | Method::Put | Method::Patch => {
            let builder: RequestBuilder<WithBody> = match method {
                Method::Post => agent.post(url),
                Method::Put => agent.put(url),
                _ => agent.patch(url),
            };
            let builder = apply_headers(builder, headers);
            match data {
                Some(data) => builder.send(data),
                None => builder.send_empty(),
            }
        }
        _ => {
            let builder: RequestBuilder<WithoutBody> = match method {
                Method::Head => agent.head(url),
                Method::Delete => agent.delete(url),
                Method::Options => agent.options(url),
                Method::Trace => agent.trace(url),
                _ => agent.get(url),
            };
            let builder = apply_headers(builder, headers);
            match data {
                Some(data) => builder.force_send_body().send(data),
                None => builder.call(),
            }
        }
    }
}

fn into_response(response: http::Response<Body>, request: Arc<Request>) -> Response {
    let (parts, body) = response.into_parts();
    let headers: Headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let status = parts.status.as_u16();
    let body = if client::response_has_body(request.method(), status) {
        let content_length = body.content_length();
        let content_type = headers.get(CONTENT_TYPE).map(str::to_string);
        Some(ResponseBody::new(
            body.into_reader(),
            content_length,
            content_type,
        ))
    } else {
        None
    };

    Response::new(
        status,
        parts.status.canonical_reason().unwrap_or_default(),
        headers,
        request,
        body,
    )
}
