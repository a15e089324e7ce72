//! MIME content types
//!
//! Only the `charset` parameter survives parsing; every other parameter is
//! dropped. Type and subtype are stored lower-cased, so comparisons are case
//! insensitive.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;

use crate::error::HttpError;

/// Character set used to encode or decode text
pub type Charset = &'static Encoding;

/// Charset assumed whenever one is required but absent
pub const DEFAULT_CHARSET: Charset = encoding_rs::UTF_8;

/// Immutable MIME type with an optional charset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    type_: Cow<'static, str>,
    subtype: Cow<'static, str>,
    charset: Option<Charset>,
}

const fn constant(type_: &'static str, subtype: &'static str) -> ContentType {
    ContentType {
        type_: Cow::Borrowed(type_),
        subtype: Cow::Borrowed(subtype),
        charset: None,
    }
}

impl ContentType {
    /// `application/octet-stream`, the fallback for unknown binary content
    pub const APPLICATION_OCTET_STREAM: ContentType = constant("application", "octet-stream");
    /// `application/json`
    pub const APPLICATION_JSON: ContentType = constant("application", "json");
    /// `application/x-www-form-urlencoded`
    pub const APPLICATION_FORM_URLENCODED: ContentType =
        constant("application", "x-www-form-urlencoded");
    /// `multipart/form-data`
    pub const MULTIPART_FORM_DATA: ContentType = constant("multipart", "form-data");
    /// `text/plain`
    pub const TEXT_PLAIN: ContentType = constant("text", "plain");
    /// `text/html`
    pub const TEXT_HTML: ContentType = constant("text", "html");

    /// Build a content type from its parts, validating them like [`ContentType::parse`]
    pub fn new(type_: &str, subtype: &str) -> Result<Self, HttpError> {
        Self::parse(&format!("{}/{}", type_, subtype))
    }

    /// Parse a `Content-Type` header value.
    ///
    /// Fails when the `/` separator is missing, when either half is empty, or
    /// when a wildcard type is paired with a concrete subtype. A `;` inside a
    /// quoted parameter value does not end the parameter.
    pub fn parse(text: &str) -> Result<Self, HttpError> {
        let malformed = |reason: &'static str| HttpError::MalformedContentType {
            value: text.to_string(),
            reason,
        };

        let (media_range, params) = match text.find(';') {
            Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
            None => (text, None),
        };

        let (type_, subtype) = media_range
            .trim()
            .split_once('/')
            .ok_or_else(|| malformed("missing `/` separator"))?;
        let type_ = type_.trim().to_ascii_lowercase();
        let subtype = subtype.trim().to_ascii_lowercase();

        if type_.is_empty() {
            return Err(malformed("empty type"));
        }
        if subtype.is_empty() {
            return Err(malformed("empty subtype"));
        }
        if type_ == "*" && subtype != "*" {
            return Err(malformed("wildcard type with a concrete subtype"));
        }

        let mut charset = None;
        if let Some(params) = params {
            for param in split_params(params) {
                let Some((key, value)) = param.split_once('=') else {
                    continue;
                };
                if key.trim().eq_ignore_ascii_case("charset") {
                    let label = unquote(value.trim());
                    if label.is_empty() {
                        continue;
                    }
                    charset = Some(
                        Encoding::for_label(label.as_bytes())
                            .ok_or_else(|| HttpError::UnsupportedCharset(label.into_owned()))?,
                    );
                }
            }
        }

        Ok(Self {
            type_: Cow::Owned(type_),
            subtype: Cow::Owned(subtype),
            charset,
        })
    }

    /// Map a file extension to a content type.
    ///
    /// Matching is case insensitive and ignores a leading `.`. Unknown or
    /// empty extensions map to `application/octet-stream`.
    pub fn parse_by_file_extension(ext: &str) -> Self {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "json" => Self::APPLICATION_JSON,
            "doc" => constant("application", "msword"),
            "docx" => constant(
                "application",
                "vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
            "xls" => constant("application", "vnd.ms-excel"),
            "xlsx" => constant(
                "application",
                "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            "ppt" => constant("application", "vnd.ms-powerpoint"),
            "pptx" => constant(
                "application",
                "vnd.openxmlformats-officedocument.presentationml.presentation",
            ),
            "pdf" => constant("application", "pdf"),
            "zip" => constant("application", "zip"),
            "gzip" | "gz" => constant("application", "gzip"),
            "png" => constant("image", "png"),
            "jpeg" | "jpg" => constant("image", "jpeg"),
            "gif" => constant("image", "gif"),
            "html" | "htm" => Self::TEXT_HTML,
            "txt" => Self::TEXT_PLAIN,
            "apk" => constant("application", "vnd.android.package-archive"),
            "ipa" => constant("application", "x-ios-app"),
            _ => Self::APPLICATION_OCTET_STREAM,
        }
    }

    /// Same type with `charset` set
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = Some(charset);
        self
    }

    /// Top-level type, e.g. `text`
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// Subtype, e.g. `plain`
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// `type/subtype` without parameters
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// Declared charset, if any
    pub fn charset(&self) -> Option<Charset> {
        self.charset
    }

    /// Declared charset, or UTF-8
    pub fn charset_or_default(&self) -> Charset {
        self.charset.unwrap_or(DEFAULT_CHARSET)
    }

    /// Compare type and subtype only, ignoring the charset
    pub fn same_mime_type(&self, other: &ContentType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        if let Some(charset) = self.charset {
            write!(f, "; charset={}", charset.name())?;
        }
        Ok(())
    }
}

impl FromStr for ContentType {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split a parameter list on `;`, leaving quoted sections intact
fn split_params(params: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (idx, ch) in params.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push(&params[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&params[start..]);
    out
}

fn unquote(value: &str) -> Cow<'_, str> {
    match value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) if inner.contains('\\') => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(ch) = chars.next() {
                if ch == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else {
                    out.push(ch);
                }
            }
            Cow::Owned(out)
        }
        Some(inner) => Cow::Borrowed(inner),
        None => Cow::Borrowed(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let ct = ContentType::parse("application/json").expect("Valid content type");
        assert_eq!(ct.type_(), "application");
        assert_eq!(ct.subtype(), "json");
        assert_eq!(ct.charset(), None);
        assert_eq!(ct, ContentType::APPLICATION_JSON);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let ct = ContentType::parse(" Text/HTML ; Charset=utf-8").expect("Valid content type");
        assert_eq!(ct.mime_type(), "text/html");
        assert_eq!(ct.charset(), Some(encoding_rs::UTF_8));
        assert_eq!(ct, ContentType::TEXT_HTML.with_charset(encoding_rs::UTF_8));
    }

    #[test]
    fn test_parse_drops_other_parameters() {
        let ct = ContentType::parse("multipart/form-data; boundary=abc; charset=GBK")
            .expect("Valid content type");
        assert_eq!(ct.to_string(), "multipart/form-data; charset=GBK");
    }

    #[test]
    fn test_parse_quoted_semicolon() {
        let ct = ContentType::parse(r#"text/plain; title="a;b"; charset="ISO-8859-2""#)
            .expect("Valid content type");
        assert_eq!(ct.charset(), Some(encoding_rs::ISO_8859_2));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        let err = ContentType::parse("json").expect_err("No slash");
        assert!(matches!(err, HttpError::MalformedContentType { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_halves() {
        assert!(ContentType::parse("text/").is_err());
        assert!(ContentType::parse("/plain").is_err());
        assert!(ContentType::parse("  /  ; charset=utf-8").is_err());
    }

    #[test]
    fn test_parse_wildcards() {
        assert!(ContentType::parse("*/*").is_ok());
        assert!(ContentType::parse("text/*").is_ok());
        let err = ContentType::parse("*/json").expect_err("Wildcard type, concrete subtype");
        assert!(matches!(err, HttpError::MalformedContentType { .. }));
    }

    #[test]
    fn test_parse_unknown_charset() {
        let err = ContentType::parse("text/plain; charset=klingon").expect_err("Unknown label");
        assert!(matches!(err, HttpError::UnsupportedCharset(label) if label == "klingon"));
    }

    #[test]
    fn test_display() {
        assert_eq!(ContentType::TEXT_PLAIN.to_string(), "text/plain");
        assert_eq!(
            ContentType::TEXT_PLAIN
                .with_charset(encoding_rs::GBK)
                .to_string(),
            "text/plain; charset=GBK"
        );
    }

    #[test]
    fn test_round_trip() {
        for text in [
            "application/json",
            "text/plain; charset=UTF-8",
            "image/png",
            "text/html; charset=Shift_JIS",
            "application/vnd.ms-excel; charset=windows-1252",
        ] {
            let ct = ContentType::parse(text).expect("Valid content type");
            let again = ContentType::parse(&ct.to_string()).expect("Display output parses");
            assert_eq!(ct, again);
            assert_eq!(ct.charset(), again.charset());
        }
    }

    #[test]
    fn test_equality_includes_charset() {
        let plain = ContentType::TEXT_PLAIN;
        let utf8 = ContentType::TEXT_PLAIN.with_charset(encoding_rs::UTF_8);
        assert_ne!(plain, utf8);
        assert!(plain.same_mime_type(&utf8));
    }

    #[test]
    fn test_parse_by_file_extension() {
        assert_eq!(
            ContentType::parse_by_file_extension("json"),
            ContentType::APPLICATION_JSON
        );
        assert_eq!(
            ContentType::parse_by_file_extension("JPG").mime_type(),
            "image/jpeg"
        );
        assert_eq!(
            ContentType::parse_by_file_extension(".Docx").mime_type(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(
            ContentType::parse_by_file_extension("apk").mime_type(),
            "application/vnd.android.package-archive"
        );
    }

    #[test]
    fn test_parse_by_file_extension_unknown_defaults() {
        for ext in ["", "exe", "unknown", "."] {
            assert_eq!(
                ContentType::parse_by_file_extension(ext),
                ContentType::APPLICATION_OCTET_STREAM
            );
        }
    }

    #[test]
    fn test_charset_or_default() {
        assert_eq!(
            ContentType::APPLICATION_JSON.charset_or_default(),
            encoding_rs::UTF_8
        );
        assert_eq!(
            ContentType::TEXT_PLAIN
                .with_charset(encoding_rs::GBK)
                .charset_or_default(),
            encoding_rs::GBK
        );
    }
}
