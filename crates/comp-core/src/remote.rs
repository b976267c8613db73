//! Remote Sync Client
//!
//! Posts the current manifest to the remote authority and receives either
//! "no change" or a full replacement manifest. Performs no persistence.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::Settings;
use crate::manifest::Manifest;
use crate::{Error, Result};

/// Host suffixes treated as local development hosts.
const DEV_HOST_SUFFIXES: &[&str] = &[
    ".local",
    ".test",
    ".invalid",
    ".example",
    ".localhost",
    ".ddev.site",
    ".lndo.site",
];
/// Hosts treated as local development hosts.
const DEV_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]", "::1", "0.0.0.0"];

/// What the remote authority answered.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResult {
    NoUpdateAvailable,
    NewManifest(Manifest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

/// Error body returned by the remote for status codes >= 400.
#[derive(Debug, Default, Deserialize)]
struct RemoteErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the remote update endpoint.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    endpoint: String,
    credentials: Credentials,
    timeout: Duration,
    insecure: bool,
}

impl RemoteClient {
    /// Create a client. TLS verification is relaxed only for development
    /// hosts or when `debug` is set.
    pub fn new(endpoint: impl Into<String>, credentials: Credentials, timeout: Duration, debug: bool) -> Self {
        let endpoint = endpoint.into();
        let insecure = debug || is_dev_host(&endpoint);
        if insecure {
            tracing::debug!(endpoint = %endpoint, "TLS certificate verification disabled");
        }
        Self {
            endpoint,
            credentials,
            timeout,
            insecure,
        }
    }

    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteNotConfigured`] if the endpoint, key or secret
    /// is missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let remote = &settings.remote;
        match (&remote.endpoint, &remote.key, &remote.secret) {
            (Some(endpoint), Some(key), Some(secret)) => Ok(Self::new(
                endpoint.clone(),
                Credentials {
                    key: key.clone(),
                    secret: secret.clone(),
                },
                remote.timeout(),
                settings.debug,
            )),
            _ => Err(Error::RemoteNotConfigured),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn verifies_tls(&self) -> bool {
        !self.insecure
    }

    /// Send `current` and interpret the answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteError`] for network failures, status codes of
    /// 400 and above, and bodies that are not a JSON manifest.
    pub fn check_for_update(&self, current: &Manifest) -> Result<UpdateResult> {
        let client = Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.insecure)
            .build()
            .map_err(|e| Error::remote("http_client", e.to_string()))?;

        tracing::debug!(endpoint = %self.endpoint, "Checking for manifest update");
        let response = client
            .post(&self.endpoint)
            .basic_auth(&self.credentials.key, Some(&self.credentials.secret))
            .json(&json!({ "composer": current }))
            .send()
            .map_err(|e| Error::remote("http_request_failed", e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            tracing::info!("No manifest update available");
            return Ok(UpdateResult::NoUpdateAvailable);
        }

        let body = response
            .text()
            .map_err(|e| Error::remote("http_request_failed", e.to_string()))?;

        if status.as_u16() >= 400 {
            let parsed: RemoteErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let err = Error::RemoteError {
                status: Some(status.as_u16()),
                code: parsed.code.unwrap_or_else(|| "http_error".to_string()),
                message: parsed.message.unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("Request failed").to_string()
                }),
            };
            tracing::warn!(code = status.as_u16(), error = %err, "Remote rejected update check");
            return Err(err);
        }

        if !status.is_success() {
            return Err(Error::RemoteError {
                status: Some(status.as_u16()),
                code: "unexpected_status".to_string(),
                message: format!("Unexpected status {status}"),
            });
        }

        let manifest = Manifest::from_json(&body)
            .map_err(|e| Error::remote("invalid_json", format!("Malformed manifest in response: {e}")))?;
        tracing::info!(packages = manifest.require.len(), "Received new manifest");
        Ok(UpdateResult::NewManifest(manifest))
    }
}

/// Whether `endpoint` points at a local or development host.
pub fn is_dev_host(endpoint: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(endpoint) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    DEV_HOSTS.contains(&host.as_str()) || DEV_HOST_SUFFIXES.iter().any(|s| host.ends_with(s))
}
