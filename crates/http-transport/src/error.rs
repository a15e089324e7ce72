//! HTTP error types

use thiserror::Error;

use crate::retry::FailureKind;

/// Boxed error preserved as the cause of a transport failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while building, executing or consuming a request
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HttpError {
    /// The request URL is not a usable absolute http(s) URL
    #[error("Invalid URL `{url}`: {reason}")]
    UrlSyntax {
        /// URL as supplied by the caller
        url: String,
        /// Why it was rejected
        reason: String,
    },
    /// I/O failure while connecting, writing the request or reading the response
    #[error("Transport error ({kind}): {source}")]
    Transport {
        /// Classified failure, fed to the retry decision
        kind: FailureKind,
        /// Underlying cause
        #[source]
        source: BoxError,
    },
    /// A `Content-Type` value could not be parsed
    #[error("Malformed content type `{value}`: {reason}")]
    MalformedContentType {
        /// Offending header value
        value: String,
        /// Parse failure
        reason: &'static str,
    },
    /// A `charset` parameter names no known encoding
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),
    /// Proxy error
    #[error("Proxy error: {0}")]
    Proxy(String),
    /// Client build error
    #[error("Client build error: {0}")]
    Build(String),
    /// The request body could not be produced
    #[error("Request body error: {0}")]
    Body(String),
    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl HttpError {
    /// Wrap an I/O level failure as a transport error
    pub fn transport<E>(kind: FailureKind, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        HttpError::Transport {
            kind,
            source: source.into(),
        }
    }

    /// Failure kind when this is a transport error
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            HttpError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn url_syntax(url: &str, reason: impl ToString) -> Self {
        HttpError::UrlSyntax {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        HttpError::transport(FailureKind::from_io(&err), err)
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return HttpError::Build(err.to_string());
        }
        let kind = classify_reqwest(&err);
        HttpError::transport(kind, err)
    }
}

/// Walk the cause chain of a reqwest failure looking for the I/O, hyper or
/// rustls error that explains it
#[cfg(feature = "reqwest")]
fn classify_reqwest(err: &reqwest::Error) -> FailureKind {
    use std::error::Error as _;

    let mut kind = None;
    let mut cause = err.source();
    while let Some(current) = cause {
        if let Some(tls) = current.downcast_ref::<rustls::Error>() {
            kind = Some(classify_rustls(tls));
            break;
        }
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            // rustls failures surface as custom io errors
            kind = Some(
                io.get_ref()
                    .and_then(|inner| inner.downcast_ref::<rustls::Error>())
                    .map(classify_rustls)
                    .unwrap_or_else(|| FailureKind::from_io(io)),
            );
            break;
        }
        if let Some(hyper) = current.downcast_ref::<hyper::Error>() {
            if hyper.is_incomplete_message() {
                kind = Some(FailureKind::ConnectionDropped);
                break;
            }
            if hyper.is_timeout() {
                kind = Some(FailureKind::Timeout);
                break;
            }
        }
        cause = current.source();
    }

    match kind {
        Some(FailureKind::Io) | None if err.is_timeout() => FailureKind::Timeout,
        Some(FailureKind::Io) | None if err.is_connect() => FailureKind::Unreachable,
        Some(kind) => kind,
        None => FailureKind::Io,
    }
}

#[cfg(feature = "reqwest")]
fn classify_rustls(err: &rustls::Error) -> FailureKind {
    match err {
        rustls::Error::InvalidCertificate(_)
        | rustls::Error::NoCertificatesPresented
        | rustls::Error::AlertReceived(_)
        | rustls::Error::PeerIncompatible(_)
        | rustls::Error::PeerMisbehaved(_)
        | rustls::Error::InappropriateMessage { .. }
        | rustls::Error::InappropriateHandshakeMessage { .. }
        | rustls::Error::HandshakeNotComplete => FailureKind::TlsHandshake,
        _ => FailureKind::Tls,
    }
}

#[cfg(feature = "ureq")]
impl From<ureq::Error> for HttpError {
    fn from(err: ureq::Error) -> Self {
        use ureq::Error;

        match err {
            Error::Io(io_err) => io_err.into(),
            Error::Timeout(_) => HttpError::transport(FailureKind::Timeout, err),
            Error::HostNotFound | Error::ConnectionFailed => {
                HttpError::transport(FailureKind::Unreachable, err)
            }
            Error::Tls(_) => HttpError::transport(FailureKind::Tls, err),
            Error::InvalidProxyUrl | Error::ConnectProxyFailed(_) => {
                HttpError::Proxy(err.to_string())
            }
            Error::BadUri(_) | Error::Http(_) => HttpError::Build(err.to_string()),
            _ => HttpError::transport(FailureKind::Io, err),
        }
    }
}
