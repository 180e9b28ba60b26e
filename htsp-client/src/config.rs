//! Connection configuration.
//!
//! Configuration comes from the caller or, for quick setups, from
//! `HTSP_*` environment variables with sensible defaults.

use std::time::Duration;

use log::debug;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct HtspConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Client name reported in the `hello` handshake.
    pub client_name: String,
    /// Client version reported in the `hello` handshake.
    pub client_version: String,
    pub connect_timeout: Duration,
    /// Default deadline for a request awaiting its response, and for the
    /// demuxer's open/seek acknowledgement waits.
    pub response_timeout: Duration,
    /// Streaming profile requested with new subscriptions.
    pub streaming_profile: Option<String>,
}

impl Default for HtspConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9982,
            username: String::new(),
            password: String::new(),
            client_name: "htsp-client".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(5),
            streaming_profile: None,
        }
    }
}

impl HtspConfig {
    /// Whether an `authenticate` request should follow the handshake.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration from environment variables.
    pub fn load_from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HTSP_HOST").unwrap_or(defaults.host);

        let port = std::env::var("HTSP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let username = std::env::var("HTSP_USERNAME").unwrap_or_default();
        let password = std::env::var("HTSP_PASSWORD").unwrap_or_default();

        let connect_timeout = std::env::var("HTSP_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.connect_timeout);

        let response_timeout = std::env::var("HTSP_RESPONSE_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.response_timeout);

        let streaming_profile = std::env::var("HTSP_STREAMING_PROFILE")
            .ok()
            .filter(|s| !s.is_empty());

        debug!("Using environment/default config: server={}:{}", host, port);

        Self {
            host,
            port,
            username,
            password,
            connect_timeout,
            response_timeout,
            streaming_profile,
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HtspConfig::default();
        assert_eq!(config.port, 9982);
        assert!(!config.has_credentials());
        assert_eq!(config.server_addr(), "127.0.0.1:9982");
    }

    #[test]
    fn test_credentials() {
        let config = HtspConfig {
            username: "viewer".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        assert!(config.has_credentials());
    }
}
