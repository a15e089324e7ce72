//! Request bodies
//!
//! A body is exactly one of raw bytes, an URL-encoded form or a multipart
//! entity, and every multipart part holds exactly one payload kind.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::content_type::{Charset, ContentType, DEFAULT_CHARSET};

/// Body of an outbound request
#[derive(Debug)]
pub enum RequestBody {
    /// Opaque bytes, optionally typed
    Raw {
        /// Payload
        data: Vec<u8>,
        /// Declared content type
        content_type: Option<ContentType>,
    },
    /// `application/x-www-form-urlencoded` fields
    Form(FormBody),
    /// `multipart/form-data` parts
    Multipart(MultipartBody),
}

impl RequestBody {
    /// Raw bytes with a declared content type
    pub fn raw(data: impl Into<Vec<u8>>, content_type: ContentType) -> Self {
        RequestBody::Raw {
            data: data.into(),
            content_type: Some(content_type),
        }
    }

    /// Raw bytes without a declared content type
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        RequestBody::Raw {
            data: data.into(),
            content_type: None,
        }
    }

    /// UTF-8 text typed `text/plain; charset=UTF-8`
    pub fn text(text: impl Into<String>) -> Self {
        Self::raw(
            text.into().into_bytes(),
            ContentType::TEXT_PLAIN.with_charset(DEFAULT_CHARSET),
        )
    }

    /// Content type the body declares for itself
    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            RequestBody::Raw { content_type, .. } => content_type.clone(),
            RequestBody::Form(form) => Some(form.content_type()),
            RequestBody::Multipart(multipart) => Some(multipart.content_type()),
        }
    }
}

impl From<FormBody> for RequestBody {
    fn from(form: FormBody) -> Self {
        RequestBody::Form(form)
    }
}

impl From<MultipartBody> for RequestBody {
    fn from(multipart: MultipartBody) -> Self {
        RequestBody::Multipart(multipart)
    }
}

/// Ordered form fields encoded with one charset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormBody {
    items: Vec<(String, String)>,
    charset: Charset,
}

impl Default for FormBody {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            charset: DEFAULT_CHARSET,
        }
    }
}

impl FormBody {
    /// Empty UTF-8 form
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `charset` to encode names and values
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Append a field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.items.push((name.into(), value.into()));
        self
    }

    /// Fields in insertion order
    pub fn items(&self) -> &[(String, String)] {
        &self.items
    }

    /// Encoding charset
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// `application/x-www-form-urlencoded; charset=...`
    pub fn content_type(&self) -> ContentType {
        ContentType::APPLICATION_FORM_URLENCODED.with_charset(self.charset)
    }
}

impl<K, V> FromIterator<(K, V)> for FormBody
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(FormBody::new(), |form, (name, value)| form.field(name, value))
    }
}

/// `multipart/form-data` entity
#[derive(Debug)]
pub struct MultipartBody {
    boundary: Option<String>,
    charset: Charset,
    parts: Vec<Part>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self {
            boundary: None,
            charset: DEFAULT_CHARSET,
            parts: Vec::new(),
        }
    }
}

impl MultipartBody {
    /// Empty multipart body; the boundary is generated at send time
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-chosen boundary
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Charset for part names and text values
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Append a part
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Caller-supplied boundary
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    /// Charset for part names and text values
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Parts in insertion order
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `multipart/form-data; charset=...` (the boundary is added on the wire)
    pub fn content_type(&self) -> ContentType {
        ContentType::MULTIPART_FORM_DATA.with_charset(self.charset)
    }
}

/// One named section of a multipart entity
#[derive(Debug)]
pub struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<ContentType>,
    payload: PartPayload,
}

impl Part {
    fn with_payload(name: impl Into<String>, payload: PartPayload) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            payload,
        }
    }

    /// Plain text field
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_payload(name, PartPayload::Value(value.into()))
    }

    /// In-memory binary content
    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::with_payload(name, PartPayload::Bytes(data.into()))
    }

    /// File read from disk at send time; the file name defaults to the path's
    /// last component
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|file_name| file_name.to_string_lossy().into_owned());
        Self {
            file_name,
            ..Self::with_payload(name, PartPayload::File(path))
        }
    }

    /// One-shot reader, consumed by the first `execute` that sends it
    pub fn stream<R>(name: impl Into<String>, reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::with_payload(name, PartPayload::Stream(StreamPayload::new(reader)))
    }

    /// Set the `filename` of the part's `Content-Disposition`
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the part's content type
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name, if any
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Explicit content type, if any
    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    /// Payload
    pub fn payload(&self) -> &PartPayload {
        &self.payload
    }

    /// Content type sent for this part: the explicit one, else derived from
    /// the payload kind
    pub fn effective_content_type(&self, charset: Charset) -> ContentType {
        if let Some(content_type) = &self.content_type {
            return content_type.clone();
        }
        match &self.payload {
            PartPayload::File(path) => content_type_for_path(path),
            PartPayload::Stream(_) | PartPayload::Bytes(_) => {
                ContentType::APPLICATION_OCTET_STREAM
            }
            PartPayload::Value(_) => ContentType::TEXT_PLAIN.with_charset(charset),
        }
    }
}

fn content_type_for_path(path: &Path) -> ContentType {
    path.extension()
        .map(|ext| ContentType::parse_by_file_extension(&ext.to_string_lossy()))
        .unwrap_or(ContentType::APPLICATION_OCTET_STREAM)
}

/// Content of a multipart part
#[derive(Debug)]
pub enum PartPayload {
    /// File on disk
    File(PathBuf),
    /// One-shot reader
    Stream(StreamPayload),
    /// In-memory bytes
    Bytes(Vec<u8>),
    /// Text value
    Value(String),
}

/// Reader that can be taken exactly once
pub struct StreamPayload(Mutex<Option<Box<dyn Read + Send>>>);

impl StreamPayload {
    fn new<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self(Mutex::new(Some(Box::new(reader))))
    }

    /// Take the reader, leaving the payload consumed
    pub(crate) fn take(&self) -> Option<Box<dyn Read + Send>> {
        match self.0.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Whether the reader was already taken
    pub fn is_consumed(&self) -> bool {
        match self.0.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl fmt::Debug for StreamPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamPayload")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
