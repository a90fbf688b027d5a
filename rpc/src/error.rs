use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("binding {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("connecting to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("`{method}` timed out after {}ms", timeout.as_millis())]
    Timeout {
        method: &'static str,
        timeout: Duration,
    },
    #[error("connection to {peer} closed")]
    Closed { peer: SocketAddr },
    #[error("server rejected `{method}` ({code}): {message}")]
    Remote {
        method: &'static str,
        code: i64,
        message: String,
    },
    #[error("unexpected response to `{method}`: {detail}")]
    UnexpectedResponse {
        method: &'static str,
        detail: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl RpcError {
    /// Whether retrying on a fresh connection could succeed.
    ///
    /// Protocol-level rejections are deterministic; everything else is the
    /// network's fault.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Remote { .. } | Self::UnexpectedResponse { .. })
    }
}
