//! Backend-agnostic blocking HTTP client
//!
//! This crate describes an HTTP call once, as a [`Request`], and executes it
//! through any [`Client`] implementation. Two adapters are provided, over
//! reqwest ([`ReqwestClient`]) and ureq ([`UreqClient`]), sharing the same
//! contract for timeouts, proxies, redirects, retries, form and multipart
//! encoding and streamed response bodies.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use http_transport::{Client, HttpError, Options, Request, UreqClient};
//!
//! fn example() -> Result<String, HttpError> {
//!     let client = UreqClient::with_options(Options::builder().retry_count(2).build())?;
//!     let request = Arc::new(Request::get("https://api.example.com/data"));
//!     let mut response = client.execute(request, None)?;
//!     match response.body() {
//!         Some(body) => body.string(None),
//!         None => Ok(String::new()),
//!     }
//! }
//! ```

pub mod backends;
mod body;
mod client;
mod content_type;
mod entity;
mod error;
mod headers;
mod options;
mod request;
mod response;
mod retry;
mod settings;

#[cfg(feature = "reqwest")]
pub use backends::ReqwestClient;
#[cfg(feature = "ureq")]
pub use backends::UreqClient;
pub use body::{FormBody, MultipartBody, Part, PartPayload, RequestBody, StreamPayload};
pub use client::{Client, ACCEPT, CONTENT_LENGTH};
pub use content_type::{Charset, ContentType, DEFAULT_CHARSET};
pub use encoding_rs;
pub use entity::{encode_form, resolve_content_type, CONTENT_TYPE};
pub use error::{BoxError, HttpError};
pub use headers::Headers;
pub use options::{
    Options, OptionsBuilder, ProxyInfo, ProxyType, DEFAULT_CONNECT_TIMEOUT_MILLIS,
    DEFAULT_READ_TIMEOUT_MILLIS, DEFAULT_WRITE_TIMEOUT_MILLIS, MAX_REDIRECTS,
};
pub use request::{Method, Request};
pub use response::{Response, ResponseBody};
pub use retry::{FailureKind, RetryDecision, RetryPolicy};
pub use settings::{Backend, Settings, ENV_PREFIX};
