//! Per-client and per-call transport options

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::HttpError;
use crate::retry::RetryPolicy;

/// Default connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MILLIS: u64 = 10_000;
/// Default read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MILLIS: u64 = 60_000;
/// Default write timeout in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MILLIS: u64 = 60_000;
/// Redirect hops followed when redirects are enabled
pub const MAX_REDIRECTS: u32 = 10;

/// Proxy protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// HTTP proxy (CONNECT for https targets)
    #[default]
    Http,
    /// SOCKS5 proxy
    Socks,
}

/// Proxy descriptor
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyInfo {
    /// Proxy host name or address
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Proxy protocol
    #[serde(default, rename = "type")]
    pub proxy_type: ProxyType,
    /// Basic auth user name
    #[serde(default)]
    pub username: Option<String>,
    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for ProxyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyInfo")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("proxy_type", &self.proxy_type)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProxyInfo {
    /// Unauthenticated proxy
    pub fn new(host: impl Into<String>, port: u16, proxy_type: ProxyType) -> Self {
        Self {
            host: host.into(),
            port,
            proxy_type,
            username: None,
            password: None,
        }
    }

    /// Attach basic auth credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Credentials when either half is set; the missing half is empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_none() && self.password.is_none() {
            return None;
        }
        Some((
            self.username.as_deref().unwrap_or(""),
            self.password.as_deref().unwrap_or(""),
        ))
    }

    /// Proxy URL without credentials, e.g. `socks5://10.0.0.1:1080`
    pub fn url(&self) -> Result<Url, HttpError> {
        let scheme = match self.proxy_type {
            ProxyType::Http => "http",
            ProxyType::Socks => "socks5",
        };
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Url::parse(&format!("{}://{}:{}", scheme, host, self.port))
            .map_err(|e| HttpError::Proxy(format!("Invalid proxy address `{}`: {}", self.host, e)))
    }

    /// Proxy URL with percent-encoded credentials in its userinfo
    pub fn url_with_credentials(&self) -> Result<Url, HttpError> {
        let mut url = self.url()?;
        if let Some((username, password)) = self.credentials() {
            url.set_username(username)
                .and_then(|_| url.set_password(Some(password)))
                .map_err(|_| HttpError::Proxy("Proxy URL cannot carry credentials".to_string()))?;
        }
        Ok(url)
    }
}

/// Transport options.
///
/// Immutable once built. A timeout of zero disables that timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    connect_timeout_millis: u64,
    read_timeout_millis: u64,
    write_timeout_millis: u64,
    follow_redirects: bool,
    retry_count: u32,
    proxy_info: Option<ProxyInfo>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            connect_timeout_millis: DEFAULT_CONNECT_TIMEOUT_MILLIS,
            read_timeout_millis: DEFAULT_READ_TIMEOUT_MILLIS,
            write_timeout_millis: DEFAULT_WRITE_TIMEOUT_MILLIS,
            follow_redirects: true,
            retry_count: 0,
            proxy_info: None,
        }
    }
}

fn millis(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_millis(value))
}

impl Options {
    /// Start from the defaults
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Connect timeout in milliseconds
    pub fn connect_timeout_millis(&self) -> u64 {
        self.connect_timeout_millis
    }

    /// Read timeout in milliseconds
    pub fn read_timeout_millis(&self) -> u64 {
        self.read_timeout_millis
    }

    /// Write timeout in milliseconds
    pub fn write_timeout_millis(&self) -> u64 {
        self.write_timeout_millis
    }

    /// Connect timeout, `None` when disabled
    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_millis)
    }

    /// Read timeout, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_millis)
    }

    /// Write timeout, `None` when disabled
    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_millis)
    }

    /// Whether 3xx responses are followed
    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Attempts allowed beyond the first
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Retry policy for `retry_count`
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count)
    }

    /// Proxy, if any
    pub fn proxy_info(&self) -> Option<&ProxyInfo> {
        self.proxy_info.as_ref()
    }

    /// Builder seeded with these options
    pub fn to_builder(&self) -> OptionsBuilder {
        OptionsBuilder {
            options: self.clone(),
        }
    }
}

/// Builder for [`Options`]
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Connect timeout; zero disables it
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout_millis = duration_millis(timeout);
        self
    }

    /// Read timeout; zero disables it
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout_millis = duration_millis(timeout);
        self
    }

    /// Write timeout; zero disables it
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.options.write_timeout_millis = duration_millis(timeout);
        self
    }

    /// Follow 3xx responses
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.options.follow_redirects = follow;
        self
    }

    /// Attempts allowed beyond the first
    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.options.retry_count = retry_count;
        self
    }

    /// Route calls through `proxy`
    pub fn proxy(mut self, proxy: ProxyInfo) -> Self {
        self.options.proxy_info = Some(proxy);
        self
    }

    /// Connect directly
    pub fn no_proxy(mut self) -> Self {
        self.options.proxy_info = None;
        self
    }

    /// Freeze the options
    pub fn build(self) -> Options {
        self.options
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
