//! Shared channel to the order engine.
//!
//! # Responsibilities
//! - Build the single channel from configured host/port
//! - Hand out cheap clones to concurrent callers
//! - Release the transport exactly once at shutdown
//!
//! The channel connects lazily: opening never fails because the engine is
//! down, the first call does instead.

use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tonic::transport::{Channel, Endpoint};

use crate::backend::BackendError;
use crate::config::BackendConfig;

/// Lifecycle state of the backend channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Open,
    Closed,
}

/// Process-wide handle to the order engine.
///
/// `tonic` channels multiplex concurrent calls over one HTTP/2 connection, so
/// every request clones the same inner channel. Once closed, no clone is
/// handed out again.
#[derive(Debug)]
pub struct BackendChannel {
    target: String,
    inner: ArcSwapOption<Channel>,
}

impl BackendChannel {
    /// Create the channel without waiting for the backend to accept connections.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: &BackendConfig) -> Result<Self, BackendError> {
        let target = format!("{}:{}", config.host, config.port);
        let endpoint = Endpoint::from_shared(format!("http://{}", target))
            .map_err(|e| BackendError::InvalidEndpoint {
                endpoint: target.clone(),
                reason: e.to_string(),
            })?
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .tcp_nodelay(true);

        let channel = endpoint.connect_lazy();

        tracing::info!(
            backend = %target,
            connect_timeout_ms = config.connect_timeout_ms,
            "Backend channel opened (lazy connect)"
        );

        Ok(Self {
            target,
            inner: ArcSwapOption::from_pointee(channel),
        })
    }

    /// `host:port` of the order engine.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> ChannelState {
        if self.inner.load().is_some() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    /// Clone of the shared channel for one call.
    pub fn handle(&self) -> Result<Channel, BackendError> {
        self.inner
            .load_full()
            .map(|channel| channel.as_ref().clone())
            .ok_or(BackendError::ChannelClosed)
    }

    /// Release the channel. Returns `true` only for the call that closed it.
    ///
    /// Calls already in flight keep their clone and finish normally.
    pub fn close(&self) -> bool {
        match self.inner.swap(None) {
            Some(_) => {
                tracing::info!(backend = %self.target, "Backend channel closed");
                true
            }
            None => false,
        }
    }
}

impl Drop for BackendChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str, port: u16) -> BackendConfig {
        BackendConfig {
            host: host.to_string(),
            port,
            ..BackendConfig::default()
        }
    }

    #[tokio::test]
    async fn open_succeeds_without_reachable_backend() {
        // Nothing listens on port 1 locally; lazy connect must not care.
        let channel = BackendChannel::open(&config("127.0.0.1", 1)).unwrap();
        assert_eq!(channel.state(), ChannelState::Open);
        assert_eq!(channel.target(), "127.0.0.1:1");
        assert!(channel.handle().is_ok());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let channel = BackendChannel::open(&config("localhost", 50051)).unwrap();
        assert!(channel.close());
        assert!(!channel.close());
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn no_handle_after_close() {
        let channel = BackendChannel::open(&config("localhost", 50051)).unwrap();
        channel.close();
        assert!(matches!(channel.handle(), Err(BackendError::ChannelClosed)));
    }

    #[tokio::test]
    async fn invalid_host_is_rejected() {
        let err = BackendChannel::open(&config("bad host", 50051)).unwrap_err();
        assert!(matches!(err, BackendError::InvalidEndpoint { .. }));
    }
}
