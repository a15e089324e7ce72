//! Outbound request description

use std::fmt;
use std::str::FromStr;

use crate::body::RequestBody;
use crate::error::HttpError;
use crate::headers::Headers;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
}

impl Method {
    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }

    /// POST, PUT and PATCH conventionally carry a body
    pub fn is_body_bearing(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            _ => Err(HttpError::Build(format!("Unknown HTTP method: {}", s))),
        }
    }
}

/// Immutable description of an outbound call.
///
/// Built by value and handed to [`Client::execute`](crate::Client::execute)
/// inside an `Arc`; the returned response points back at the same request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: String,
    headers: Headers,
    body: Option<RequestBody>,
}

impl Request {
    /// Request without headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// GET `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// HEAD `url`
    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    /// POST `url`
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// PUT `url`
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// PATCH `url`
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    /// DELETE `url`
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Append a header value
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace all headers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Attach a body
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Method
    pub fn method(&self) -> Method {
        self.method
    }

    /// URL as supplied
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers as supplied
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Body, if any
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// A request carrying a body is treated as non-idempotent when retrying
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_bearing_methods() {
        assert!(Method::Post.is_body_bearing());
        assert!(Method::Put.is_body_bearing());
        assert!(Method::Patch.is_body_bearing());
        assert!(!Method::Get.is_body_bearing());
        assert!(!Method::Delete.is_body_bearing());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("get".parse::<Method>().expect("Known method"), Method::Get);
        assert_eq!("PATCH".parse::<Method>().expect("Known method"), Method::Patch);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_builder() {
        let request = Request::post("http://localhost/items")
            .with_header("X-Trace", "1")
            .with_header("x-trace", "2")
            .with_body(RequestBody::text("hello"));

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.url(), "http://localhost/items");
        assert_eq!(request.headers().get_all("X-TRACE").len(), 2);
        assert!(request.has_body());
        assert!(!Request::get("http://localhost").has_body());
    }
}
