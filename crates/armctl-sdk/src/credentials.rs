//! Token credentials.
//!
//! [`TokenCredential`] is implemented once per authentication strategy:
//!
//! * [`ManagedIdentityCredential`] asks the workload-local identity
//!   endpoint for a token (no stored secret, no interactive login).
//! * [`StaticTokenCredential`] hands out a token obtained elsewhere.
//!
//! Which one a client uses is decided by
//! [`ClientConfig::credential`](crate::config::ClientConfig::credential).
//! None of them cache: every call is a fresh acquisition, and lifetime or
//! refresh policy belongs to the caller.

use std::fmt;
use std::time::Duration;

use armctl_models::{Credential, Token};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SdkError;

/// Path of the token endpoint on the local identity service.
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Something that can produce a bearer token.
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// Acquire a token, giving up after `timeout`.
    async fn retrieve_token(&self, timeout: Duration) -> Result<Token, SdkError>;
}

// ---------------------------------------------------------------------------
// Managed identity
// ---------------------------------------------------------------------------

/// Exchanges a [`Credential`] for a [`Token`] at
/// `http://localhost:{port}/oauth2/token`.
///
/// One `POST` per call, with `Metadata: true` and a form-encoded
/// `resource`. Failures map to:
///
/// | Failure | Error |
/// |---------|-------|
/// | connect / DNS / timeout | [`SdkError::Transport`] |
/// | non-2xx status | [`SdkError::TokenRequestFailed`] |
/// | body is not a token | [`SdkError::MalformedResponse`] |
///
/// Nothing is retried.
#[derive(Debug, Clone)]
pub struct ManagedIdentityCredential {
    credential: Credential,
    http: reqwest::Client,
}

impl ManagedIdentityCredential {
    /// Credential that asks the identity endpoint described by `credential`.
    pub fn new(credential: Credential) -> Self {
        Self::with_client(credential, reqwest::Client::new())
    }

    /// Use a caller-provided HTTP client (proxy settings, connection pool).
    pub fn with_client(credential: Credential, http: reqwest::Client) -> Self {
        Self { credential, http }
    }

    /// The resource and port this credential requests tokens for.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    fn token_url(&self) -> String {
        format!(
            "http://localhost:{}{TOKEN_PATH}",
            self.credential.endpoint_port()
        )
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn retrieve_token(&self, timeout: Duration) -> Result<Token, SdkError> {
        let url = self.token_url();
        let resource = self.credential.resource();
        debug!(%url, %resource, "requesting managed identity token");

        let res = self
            .http
            .post(&url)
            .header("Metadata", "true")
            .form(&[("resource", resource.as_str())])
            .timeout(timeout)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), %resource, "identity endpoint rejected token request");
            return Err(SdkError::TokenRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token = parse_token(&body)?;
        debug!(%resource, token_type = token.token_type(), "managed identity token acquired");
        Ok(token)
    }
}

/// Decode a token response body. Only `token_type` and `access_token` are read.
fn parse_token(body: &str) -> Result<Token, SdkError> {
    serde_json::from_str(body).map_err(|e| SdkError::MalformedResponse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Static token
// ---------------------------------------------------------------------------

/// Returns the same pre-acquired token on every call.
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: Token,
}

impl StaticTokenCredential {
    /// Wrap a token acquired elsewhere.
    pub fn new(token: Token) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn retrieve_token(&self, _timeout: Duration) -> Result<Token, SdkError> {
        Ok(self.token.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
