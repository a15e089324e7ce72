//! HTTP response types

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use crate::content_type::{Charset, ContentType, DEFAULT_CHARSET};
use crate::error::HttpError;
use crate::headers::Headers;
use crate::request::Request;

/// Result of executing a [`Request`]
///
/// Non-2xx statuses are ordinary responses, not errors.
#[derive(Debug)]
pub struct Response {
    status: u16,
    reason: String,
    headers: Headers,
    request: Arc<Request>,
    body: Option<ResponseBody>,
}

impl Response {
    pub(crate) fn new(
        status: u16,
        reason: impl Into<String>,
        headers: Headers,
        request: Arc<Request>,
        body: Option<ResponseBody>,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers,
            request,
            body,
        }
    }

    /// Status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Check if the response status is a success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of header `name`
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The request this response answers, the caller's own object
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// Body handle, if the response has one
    pub fn body(&mut self) -> Option<&mut ResponseBody> {
        self.body.as_mut()
    }

    /// Take ownership of the body handle
    pub fn into_body(self) -> Option<ResponseBody> {
        self.body
    }
}

/// One-shot handle over a received entity.
///
/// Reading is single-consumer. The underlying connection is released by
/// [`ResponseBody::close`], by draining helpers such as
/// [`ResponseBody::string`], or when the handle is dropped.
pub struct ResponseBody {
    reader: Option<Box<dyn Read + Send>>,
    content_length: Option<u64>,
    content_type: Option<String>,
    exhausted: bool,
}

impl ResponseBody {
    pub(crate) fn new<R>(
        reader: R,
        content_length: Option<u64>,
        content_type: Option<String>,
    ) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            reader: Some(Box::new(reader)),
            content_length,
            content_type,
            exhausted: false,
        }
    }

    /// Declared length, `None` when unknown or beyond `i32::MAX`
    ///
    /// A known length is what the server declared; a chunked transfer may
    /// still deliver a different amount.
    pub fn length(&self) -> Option<i32> {
        self.content_length
            .and_then(|length| i32::try_from(length).ok())
    }

    /// Streaming bodies can be read only once
    pub fn is_repeatable(&self) -> bool {
        false
    }

    /// Raw `Content-Type` of the response
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Stream over the entity; reading to the end marks the body exhausted
    pub fn byte_stream(&mut self) -> impl Read + '_ {
        self
    }

    /// `true` once a read hit end of stream
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// `true` once the underlying resource was released
    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }

    /// Read the remaining bytes and release the body, even on failure
    pub fn bytes(&mut self) -> Result<Vec<u8>, HttpError> {
        let mut buf = Vec::new();
        let result = self.read_to_end(&mut buf);
        self.close();
        result.map_err(HttpError::from)?;
        Ok(buf)
    }

    /// Decode the remaining bytes and release the body, even on failure.
    ///
    /// With `charset` unset, the response's own `Content-Type` charset is
    /// used, falling back to UTF-8.
    pub fn string(&mut self, charset: Option<Charset>) -> Result<String, HttpError> {
        let charset = charset.unwrap_or_else(|| self.declared_charset());
        let bytes = self.bytes()?;
        let (text, _) = charset.decode_without_bom_handling(&bytes);
        Ok(text.into_owned())
    }

    fn declared_charset(&self) -> Charset {
        self.content_type
            .as_deref()
            .and_then(|value| ContentType::parse(value).ok())
            .and_then(|content_type| content_type.charset())
            .unwrap_or(DEFAULT_CHARSET)
    }

    /// Release the underlying connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.reader.take().is_some() && !self.exhausted {
            tracing::debug!("Releasing response body before end of stream");
        }
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.exhausted {
            return Ok(0);
        }
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| io::Error::other("response body already released"))?;
        let read = reader.read(buf)?;
        if read == 0 && !buf.is_empty() {
            self.exhausted = true;
        }
        Ok(read)
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .field("exhausted", &self.exhausted)
            .field("released", &self.is_released())
            .finish()
    }
}
