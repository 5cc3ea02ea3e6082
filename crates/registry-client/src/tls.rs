//! Building a `reqwest::Client` from a registry's [`TlsOptions`] and timeout.

use std::time::Duration;

use registry_core::TlsOptions;

use crate::error::{ClientError, ClientResult};

/// Per-HTTP-call timeout default (spec §5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used by `test_connection` probes (spec §4.2).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn build_http_client(tls: &TlsOptions, timeout: Duration) -> ClientResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(5));

    if tls.insecure_skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(path) = &tls.ca_bundle_path {
        let pem = std::fs::read(path)
            .map_err(|e| ClientError::Internal(format!("reading CA bundle {path}: {e}")))?;
        let cert = reqwest::Certificate::from_pem(&pem)
            .map_err(|e| ClientError::Internal(format!("parsing CA bundle {path}: {e}")))?;
        builder = builder.add_root_certificate(cert);
    }

    if let (Some(cert_path), Some(key_path)) = (&tls.client_cert_path, &tls.client_key_path) {
        let mut combined = std::fs::read(cert_path)
            .map_err(|e| ClientError::Internal(format!("reading client cert {cert_path}: {e}")))?;
        let mut key = std::fs::read(key_path)
            .map_err(|e| ClientError::Internal(format!("reading client key {key_path}: {e}")))?;
        combined.append(&mut key);
        let identity = reqwest::Identity::from_pem(&combined)
            .map_err(|e| ClientError::Internal(format!("building client identity: {e}")))?;
        builder = builder.identity(identity);
    }

    builder
        .build()
        .map_err(|e| ClientError::Internal(format!("building http client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_plain_client_with_default_tls_options() {
        let client = build_http_client(&TlsOptions::default(), DEFAULT_TIMEOUT);
        assert!(client.is_ok());
    }
}
