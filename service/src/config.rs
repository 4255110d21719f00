//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Server configuration

use crate::{Result, tls};
use frameline_codec::DEFAULT_MAX_FRAME_LENGTH;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Server configuration
///
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use frameline_service::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("127.0.0.1:9999")
///     .with_max_frame_length(Some(64 * 1024))
///     .with_accept_backoff(Duration::from_millis(50));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to, as `host:port`
    pub bind_address: String,

    /// TLS configuration; plain TCP when `None`
    pub tls: Option<Arc<rustls::ServerConfig>>,

    /// Largest frame accepted or sent; `None` for no limit
    pub max_frame_length: Option<usize>,

    /// Pause after a failed `accept` before trying again
    pub accept_backoff: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9999".to_string(),
            tls: None,
            max_frame_length: Some(DEFAULT_MAX_FRAME_LENGTH),
            accept_backoff: Duration::from_millis(100),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: impl Into<String>) -> Self {
        Self {
            bind_address: bind_address.into(),
            ..Default::default()
        }
    }

    /// Use a prepared TLS configuration
    pub fn with_tls(mut self, tls: Arc<rustls::ServerConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Load TLS material from PEM certificate and key files
    pub fn with_tls_files(
        mut self,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self> {
        self.tls = Some(tls::server_config(cert_path, key_path)?);
        Ok(self)
    }

    /// Set the maximum frame length (`None` disables the limit)
    pub fn with_max_frame_length(mut self, max: Option<usize>) -> Self {
        self.max_frame_length = max;
        self
    }

    /// Set the back-off applied after a failed accept
    pub fn with_accept_backoff(mut self, backoff: Duration) -> Self {
        self.accept_backoff = backoff;
        self
    }

    /// Whether connections will be TLS-wrapped
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.bind_address.trim().is_empty() {
            return Err("bind_address must not be empty".to_string());
        }

        if self.max_frame_length == Some(0) {
            return Err("max_frame_length must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_frame_length, Some(DEFAULT_MAX_FRAME_LENGTH));
        assert_eq!(config.accept_backoff, Duration::from_millis(100));
        assert!(!config.is_tls());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::new("0.0.0.0:7000")
            .with_max_frame_length(None)
            .with_accept_backoff(Duration::from_millis(5));

        assert_eq!(config.bind_address, "0.0.0.0:7000");
        assert_eq!(config.max_frame_length, None);
        assert_eq!(config.accept_backoff, Duration::from_millis(5));
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::new("");
        assert!(config.validate().is_err());

        config.bind_address = "localhost:9000".to_string();
        assert!(config.validate().is_ok());

        config.max_frame_length = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tls_files_missing() {
        let result = ServerConfig::new("localhost:0").with_tls_files("missing.pem", "missing.key");
        assert!(result.unwrap_err().is_startup_error());
    }
}
