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

//! Certificate loading for TLS listeners
//!
//! Turns a PEM certificate chain and a PEM private key into a ready-made
//! [`rustls::ServerConfig`]. The server treats the result as opaque
//! configuration.

use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Errors raised while loading certificate material
#[derive(Debug, Clone, thiserror::Error)]
pub enum TlsError {
    /// A certificate or key file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed to load
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The certificate file did not contain a usable certificate
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The key file did not contain a usable private key
    #[error("no private key found in {}", .0.display())]
    InvalidPrivateKey(PathBuf),

    /// rustls rejected the certificate/key pair
    #[error("TLS configuration error: {0}")]
    Configuration(String),
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| TlsError::Io {
            path: path.to_path_buf(),
            source: Arc::new(err),
        })
}

/// Load a certificate chain from a PEM file
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| TlsError::InvalidCertificate(err.to_string()))?;

    if certs.is_empty() {
        return Err(TlsError::InvalidCertificate(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    debug!("Loaded {} certificates from {:?}", certs.len(), path);
    Ok(certs)
}

/// Load the first private key from a PEM file
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;

    let key = rustls_pemfile::private_key(&mut reader)
        .map_err(|err| TlsError::Io {
            path: path.to_path_buf(),
            source: Arc::new(err),
        })?
        .ok_or_else(|| TlsError::InvalidPrivateKey(path.to_path_buf()))?;

    debug!("Loaded private key from {:?}", path);
    Ok(key)
}

/// Build a server TLS configuration from certificate and key files
///
/// Client certificates are not requested.
pub fn server_config(
    cert_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> Result<Arc<ServerConfig>, TlsError> {
    let certs = load_certs(cert_path.as_ref())?;
    let key = load_private_key(key_path.as_ref())?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| TlsError::Configuration(err.to_string()))?;

    info!(
        "Created server TLS configuration from {:?}",
        cert_path.as_ref()
    );
    Ok(Arc::new(config))
}
