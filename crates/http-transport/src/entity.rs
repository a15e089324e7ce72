//! Wire encoding of request bodies shared by both backends

use std::io::Read;
use std::path::PathBuf;

use rand::distr::{Alphanumeric, SampleString};
use url::form_urlencoded::byte_serialize;

use crate::body::{FormBody, MultipartBody, PartPayload, RequestBody};
use crate::content_type::{Charset, ContentType, DEFAULT_CHARSET};
use crate::error::HttpError;
use crate::request::Request;

/// `Content-Type` header name
pub const CONTENT_TYPE: &str = "Content-Type";

const BOUNDARY_LEN: usize = 30;

/// Effective content type of a request body.
///
/// The body's own declared type wins; otherwise the first `Content-Type`
/// header is parsed and UTF-8 assumed when it names no charset. `None` leaves
/// the transport default in place.
pub fn resolve_content_type(request: &Request) -> Result<Option<ContentType>, HttpError> {
    if let Some(content_type) = request.body().and_then(RequestBody::content_type) {
        return Ok(Some(content_type));
    }

    match request.headers().get(CONTENT_TYPE) {
        Some(value) => {
            let content_type = ContentType::parse(value)?;
            Ok(Some(match content_type.charset() {
                Some(_) => content_type,
                None => content_type.with_charset(DEFAULT_CHARSET),
            }))
        }
        None => Ok(None),
    }
}

/// Encode form fields as `application/x-www-form-urlencoded`
pub fn encode_form(form: &FormBody) -> String {
    let charset = form.charset();
    let mut out = String::new();
    for (idx, (name, value)) in form.items().iter().enumerate() {
        if idx > 0 {
            out.push('&');
        }
        out.extend(byte_serialize(&charset.encode(name).0));
        out.push('=');
        out.extend(byte_serialize(&charset.encode(value).0));
    }
    out
}

/// Body ready to be handed to a backend, produced once per `execute`
#[derive(Debug)]
pub(crate) enum Entity {
    /// Fully encoded bytes
    Bytes {
        data: Vec<u8>,
        content_type: Option<String>,
    },
    /// Multipart parts with streams already spooled
    Multipart(PreparedMultipart),
}

impl Entity {
    /// Prepare the request's body, spooling stream parts into memory
    pub(crate) fn prepare(request: &Request) -> Result<Option<Self>, HttpError> {
        let Some(body) = request.body() else {
            return Ok(None);
        };

        let entity = match body {
            RequestBody::Raw { data, .. } => Entity::Bytes {
                data: data.clone(),
                content_type: resolve_content_type(request)?.map(|ct| ct.to_string()),
            },
            RequestBody::Form(form) => Entity::Bytes {
                data: encode_form(form).into_bytes(),
                content_type: Some(form.content_type().to_string()),
            },
            RequestBody::Multipart(multipart) => {
                Entity::Multipart(PreparedMultipart::prepare(multipart)?)
            }
        };

        Ok(Some(entity))
    }

    /// Bytes to send and their `Content-Type` value. Multipart bodies are
    /// framed here, once per `execute`, so every attempt sends the same bytes.
    pub(crate) fn into_wire(self) -> Result<(Vec<u8>, Option<String>), HttpError> {
        match self {
            Entity::Bytes { data, content_type } => Ok((data, content_type)),
            Entity::Multipart(multipart) => {
                let encoded = multipart.encode()?;
                Ok((encoded.data, Some(encoded.content_type)))
            }
        }
    }
}

/// Multipart body whose payloads can be sent any number of times
#[derive(Debug)]
pub(crate) struct PreparedMultipart {
    pub boundary: Option<String>,
    pub charset: Charset,
    pub parts: Vec<PreparedPart>,
}

#[derive(Debug)]
pub(crate) struct PreparedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: ContentType,
    /// Set from `Part::with_content_type`; forces the `Content-Type` line
    pub explicit_content_type: bool,
    pub payload: PreparedPayload,
}

#[derive(Debug)]
pub(crate) enum PreparedPayload {
    File(PathBuf),
    Bytes(Vec<u8>),
    Text(String),
}

impl PreparedPayload {
    /// Binary parts always get a `Content-Type` line on the wire
    fn is_binary(&self) -> bool {
        !matches!(self, PreparedPayload::Text(_))
    }
}

impl PreparedMultipart {
    fn prepare(multipart: &MultipartBody) -> Result<Self, HttpError> {
        let charset = multipart.charset();
        let mut parts = Vec::with_capacity(multipart.parts().len());

        for part in multipart.parts() {
            let payload = match part.payload() {
                PartPayload::File(path) => PreparedPayload::File(path.clone()),
                PartPayload::Stream(stream) => {
                    let mut reader = stream.take().ok_or_else(|| {
                        HttpError::Body(format!(
                            "Stream payload of part `{}` was already consumed",
                            part.name()
                        ))
                    })?;
                    let mut data = Vec::new();
                    reader.read_to_end(&mut data).map_err(|e| {
                        HttpError::Body(format!(
                            "Cannot read stream payload of part `{}`: {}",
                            part.name(),
                            e
                        ))
                    })?;
                    PreparedPayload::Bytes(data)
                }
                PartPayload::Bytes(data) => PreparedPayload::Bytes(data.clone()),
                PartPayload::Value(value) => PreparedPayload::Text(value.clone()),
            };

            parts.push(PreparedPart {
                name: part.name().to_string(),
                file_name: part.file_name().map(str::to_string),
                content_type: part.effective_content_type(charset),
                explicit_content_type: part.content_type().is_some(),
                payload,
            });
        }

        Ok(Self {
            boundary: multipart.boundary().map(str::to_string),
            charset,
            parts,
        })
    }

    /// Encode with the caller's boundary, or a freshly generated one
    pub(crate) fn encode(&self) -> Result<EncodedMultipart, HttpError> {
        let boundary = match &self.boundary {
            Some(boundary) => boundary.clone(),
            None => generate_boundary(),
        };
        self.encode_with_boundary(&boundary)
    }

    fn encode_with_boundary(&self, boundary: &str) -> Result<EncodedMultipart, HttpError> {
        let mut data = Vec::new();

        for part in &self.parts {
            data.extend_from_slice(b"--");
            data.extend_from_slice(boundary.as_bytes());
            data.extend_from_slice(b"\r\nContent-Disposition: form-data; name=\"");
            data.extend_from_slice(&self.header_param(&part.name));
            data.push(b'"');
            if let Some(file_name) = &part.file_name {
                data.extend_from_slice(b"; filename=\"");
                data.extend_from_slice(&self.header_param(file_name));
                data.push(b'"');
            }
            data.extend_from_slice(b"\r\n");
            if part.explicit_content_type || part.payload.is_binary() {
                data.extend_from_slice(b"Content-Type: ");
                data.extend_from_slice(part.content_type.to_string().as_bytes());
                data.extend_from_slice(b"\r\n");
            }
            data.extend_from_slice(b"\r\n");

            match &part.payload {
                PreparedPayload::File(path) => {
                    let contents = std::fs::read(path).map_err(|e| {
                        HttpError::Body(format!(
                            "Cannot read file part `{}` from {}: {}",
                            part.name,
                            path.display(),
                            e
                        ))
                    })?;
                    data.extend_from_slice(&contents);
                }
                PreparedPayload::Bytes(bytes) => data.extend_from_slice(bytes),
                PreparedPayload::Text(text) => {
                    let charset = part.content_type.charset().unwrap_or(self.charset);
                    data.extend_from_slice(&charset.encode(text).0);
                }
            }
            data.extend_from_slice(b"\r\n");
        }

        data.extend_from_slice(b"--");
        data.extend_from_slice(boundary.as_bytes());
        data.extend_from_slice(b"--\r\n");

        Ok(EncodedMultipart {
            data,
            content_type: format!(
                "multipart/form-data; boundary={}; charset={}",
                boundary,
                self.charset.name()
            ),
        })
    }

    /// Names are written raw in the body charset, with quotes and line breaks
    /// escaped the way browsers do
    fn header_param(&self, value: &str) -> Vec<u8> {
        let escaped = value
            .replace('"', "%22")
            .replace('\r', "%0D")
            .replace('\n', "%0A");
        self.charset.encode(&escaped).0.into_owned()
    }
}

/// Encoded multipart entity and its full `Content-Type` value
#[derive(Debug)]
pub(crate) struct EncodedMultipart {
    pub data: Vec<u8>,
    pub content_type: String,
}

fn generate_boundary() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), BOUNDARY_LEN)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::body::{MultipartBody, Part};

    #[test]
    fn test_encode_form() {
        let form = FormBody::new().field("a", "1").field("b", "2 ");
        assert_eq!(encode_form(&form), "a=1&b=2+");
    }

    #[test]
    fn test_encode_form_escapes_reserved() {
        let form = FormBody::new().field("q", "a&b=c/d").field("name", "José");
        assert_eq!(encode_form(&form), "q=a%26b%3Dc%2Fd&name=Jos%C3%A9");
    }

    #[test]
    fn test_encode_form_other_charset() {
        let form = FormBody::new()
            .with_charset(encoding_rs::GBK)
            .field("k", "中");
        assert_eq!(encode_form(&form), "k=%D6%D0");
    }

    #[test]
    fn test_encode_empty_form() {
        assert_eq!(encode_form(&FormBody::new()), "");
    }

    #[test]
    fn test_resolve_body_type_wins() {
        let request = Request::post("http://localhost")
            .with_header("Content-Type", "text/plain")
            .with_body(RequestBody::raw(b"{}".to_vec(), ContentType::APPLICATION_JSON));
        assert_eq!(
            resolve_content_type(&request).expect("Resolvable"),
            Some(ContentType::APPLICATION_JSON)
        );
    }

    #[test]
    fn test_resolve_header_assumes_utf8() {
        let request = Request::post("http://localhost")
            .with_header("content-type", "application/xml")
            .with_body(RequestBody::bytes(b"<a/>".to_vec()));
        assert_eq!(
            resolve_content_type(&request)
                .expect("Resolvable")
                .map(|ct| ct.to_string()),
            Some("application/xml; charset=UTF-8".to_string())
        );
    }

    #[test]
    fn test_resolve_header_keeps_charset() {
        let request = Request::post("http://localhost")
            .with_header("Content-Type", "text/plain; charset=GBK")
            .with_body(RequestBody::bytes(b"x".to_vec()));
        assert_eq!(
            resolve_content_type(&request)
                .expect("Resolvable")
                .and_then(|ct| ct.charset()),
            Some(encoding_rs::GBK)
        );
    }

    #[test]
    fn test_resolve_undefined() {
        let request =
            Request::post("http://localhost").with_body(RequestBody::bytes(b"x".to_vec()));
        assert_eq!(resolve_content_type(&request).expect("Resolvable"), None);
    }

    #[test]
    fn test_resolve_malformed_header() {
        let request = Request::post("http://localhost")
            .with_header("Content-Type", "nonsense")
            .with_body(RequestBody::bytes(b"x".to_vec()));
        assert!(matches!(
            resolve_content_type(&request),
            Err(HttpError::MalformedContentType { .. })
        ));
    }

    #[test]
    fn test_prepare_raw_and_form() {
        let request = Request::post("http://localhost")
            .with_body(FormBody::new().field("a", "1"));
        match Entity::prepare(&request).expect("Preparable") {
            Some(Entity::Bytes { data, content_type }) => {
                assert_eq!(data, b"a=1");
                assert_eq!(
                    content_type.as_deref(),
                    Some("application/x-www-form-urlencoded; charset=UTF-8")
                );
            }
            other => panic!("Unexpected entity: {:?}", other),
        }

        assert!(Entity::prepare(&Request::get("http://localhost"))
            .expect("Preparable")
            .is_none());
    }

    #[test]
    fn test_multipart_wire_format() {
        let multipart = MultipartBody::new()
            .with_boundary("XyZ")
            .part(Part::text("title", "hi"))
            .part(Part::bytes("blob", vec![1u8, 2, 3]).with_file_name("b.bin"));
        let request = Request::post("http://localhost").with_body(multipart);

        let Some(Entity::Multipart(prepared)) = Entity::prepare(&request).expect("Preparable")
        else {
            panic!("Expected multipart entity");
        };
        let encoded = prepared.encode().expect("Encodable");

        assert_eq!(
            encoded.content_type,
            "multipart/form-data; boundary=XyZ; charset=UTF-8"
        );
        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"--XyZ\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nhi\r\n",
        );
        expected.extend_from_slice(
            b"--XyZ\r\nContent-Disposition: form-data; name=\"blob\"; filename=\"b.bin\"\r\n",
        );
        expected.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        expected.extend_from_slice(&[1, 2, 3]);
        expected.extend_from_slice(b"\r\n--XyZ--\r\n");
        assert_eq!(encoded.data, expected);
    }

    #[test]
    fn test_multipart_explicit_value_type() {
        let meta =
            Part::text("meta", r#"{"a":1}"#).with_content_type(ContentType::APPLICATION_JSON);
        let multipart = MultipartBody::new().with_boundary("B").part(meta);
        let request = Request::post("http://localhost").with_body(multipart);

        let (data, content_type) = Entity::prepare(&request)
            .expect("Preparable")
            .expect("Has entity")
            .into_wire()
            .expect("Encodable");

        assert_eq!(
            content_type.as_deref(),
            Some("multipart/form-data; boundary=B; charset=UTF-8")
        );
        assert_eq!(
            data,
            b"--B\r\nContent-Disposition: form-data; name=\"meta\"\r\n\
              Content-Type: application/json\r\n\r\n{\"a\":1}\r\n--B--\r\n"
                .to_vec()
        );
    }

    #[test]
    fn test_multipart_generated_boundary() {
        let request = Request::post("http://localhost")
            .with_body(MultipartBody::new().part(Part::text("a", "b")));
        let Some(Entity::Multipart(prepared)) = Entity::prepare(&request).expect("Preparable")
        else {
            panic!("Expected multipart entity");
        };
        let encoded = prepared.encode().expect("Encodable");
        let boundary = encoded
            .content_type
            .split("boundary=")
            .nth(1)
            .and_then(|rest| rest.split(';').next())
            .expect("Boundary present");
        assert_eq!(boundary.len(), BOUNDARY_LEN);
        assert!(boundary.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_stream_part_spooled_once() {
        let request = Request::post("http://localhost").with_body(
            MultipartBody::new()
                .with_boundary("b")
                .part(Part::stream("s", Cursor::new(b"streamed".to_vec()))),
        );

        let Some(Entity::Multipart(prepared)) = Entity::prepare(&request).expect("Preparable")
        else {
            panic!("Expected multipart entity");
        };
        assert!(matches!(
            &prepared.parts[0].payload,
            PreparedPayload::Bytes(data) if data == b"streamed"
        ));

        let err = Entity::prepare(&request).expect_err("Stream already consumed");
        assert!(matches!(err, HttpError::Body(_)));
    }

    #[test]
    fn test_missing_file_part() {
        let request = Request::post("http://localhost").with_body(
            MultipartBody::new().part(Part::file("f", "/definitely/not/here.txt")),
        );
        let Some(Entity::Multipart(prepared)) = Entity::prepare(&request).expect("Preparable")
        else {
            panic!("Expected multipart entity");
        };
        assert!(matches!(prepared.encode(), Err(HttpError::Body(_))));
    }

    #[test]
    fn test_header_param_escaping() {
        let prepared = PreparedMultipart {
            boundary: None,
            charset: DEFAULT_CHARSET,
            parts: Vec::new(),
        };
        assert_eq!(prepared.header_param("a\"b\r\n"), b"a%22b%0D%0A".to_vec());
    }
}
