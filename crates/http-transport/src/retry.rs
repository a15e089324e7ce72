//! Retry decisions
//!
//! Failures are classified into a [`FailureKind`] by each backend, then fed to
//! [`RetryPolicy`], a pure function of the failure, the number of attempts made
//! so far and whether the request carries a body. The total number of
//! executions is always bounded by `1 + retry_count`.

use std::fmt;
use std::io;

use crate::error::HttpError;

/// Classified transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Peer closed the connection before a response was received
    ConnectionDropped,
    /// TLS handshake failed (certificate, protocol mismatch, peer alert)
    TlsHandshake,
    /// The operation was interrupted
    Interrupted,
    /// Target host could not be resolved or reached
    Unreachable,
    /// Any other TLS failure
    Tls,
    /// Connect or I/O timeout
    Timeout,
    /// Any other I/O failure
    Io,
}

impl FailureKind {
    /// Classify a raw I/O error
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => FailureKind::ConnectionDropped,
            io::ErrorKind::Interrupted => FailureKind::Interrupted,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureKind::Timeout,
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable => FailureKind::Unreachable,
            _ => FailureKind::Io,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::ConnectionDropped => "connection dropped",
            FailureKind::TlsHandshake => "TLS handshake",
            FailureKind::Interrupted => "interrupted",
            FailureKind::Unreachable => "host unreachable",
            FailureKind::Tls => "TLS",
            FailureKind::Timeout => "timeout",
            FailureKind::Io => "I/O",
        };
        f.write_str(name)
    }
}

/// Outcome of a retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Execute the request again
    Retry,
    /// Surface the last failure
    Stop,
}

impl RetryDecision {
    /// `true` for [`RetryDecision::Retry`]
    pub fn is_retry(self) -> bool {
        self == RetryDecision::Retry
    }
}

/// Retry budget and decision rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    retry_count: u32,
}

impl RetryPolicy {
    /// Policy allowing `retry_count` attempts beyond the first one
    pub fn new(retry_count: u32) -> Self {
        Self { retry_count }
    }

    /// Policy that never retries
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Configured retry budget
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Upper bound on executions, the initial one included
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Per-failure decision.
    ///
    /// `attempts` counts executions made so far, the failed one included.
    /// Rules apply in order; the first match wins:
    ///
    /// 1. budget exhausted: stop
    /// 2. connection dropped by peer: retry
    /// 3. TLS handshake failure: stop
    /// 4. interrupted: stop
    /// 5. host unreachable: retry
    /// 6. other TLS failure: stop
    /// 7. request carries a body: stop
    /// 8. otherwise: retry
    pub fn decide(&self, kind: FailureKind, attempts: u32, has_body: bool) -> RetryDecision {
        if attempts > self.retry_count {
            return RetryDecision::Stop;
        }
        match kind {
            FailureKind::ConnectionDropped => RetryDecision::Retry,
            FailureKind::TlsHandshake => RetryDecision::Stop,
            FailureKind::Interrupted => RetryDecision::Stop,
            FailureKind::Unreachable => RetryDecision::Retry,
            FailureKind::Tls => RetryDecision::Stop,
            FailureKind::Timeout | FailureKind::Io if has_body => RetryDecision::Stop,
            FailureKind::Timeout | FailureKind::Io => RetryDecision::Retry,
        }
    }

    /// Coarse decision for a received status: non-2xx retries while budget
    /// remains, regardless of method or body
    pub fn decide_status(&self, status: u16, attempts: u32) -> RetryDecision {
        if (200..300).contains(&status) || attempts > self.retry_count {
            RetryDecision::Stop
        } else {
            RetryDecision::Retry
        }
    }
}

/// Drive `attempt` until it succeeds or [`RetryPolicy::decide`] says stop.
///
/// `attempt` receives the 1-based attempt number. Errors that are not
/// transport failures end the loop immediately.
pub(crate) fn run<T, F>(
    policy: RetryPolicy,
    has_body: bool,
    mut attempt: F,
) -> Result<T, HttpError>
where
    F: FnMut(u32) -> Result<T, HttpError>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let err = match attempt(attempts) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(kind) = err.failure_kind() else {
            return Err(err);
        };

        if !policy.decide(kind, attempts, has_body).is_retry() {
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
