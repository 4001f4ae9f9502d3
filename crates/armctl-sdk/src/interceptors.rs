//! Built-in interceptors.
//!
//! | Interceptor | Effect |
//! |-------------|--------|
//! | [`UserAgentInterceptor`] | overwrites `user-agent` with the client identifier |
//! | [`BearerTokenInterceptor`] | acquires a token and sets `authorization` |
//! | [`RequestLoggingInterceptor`] | dumps request and response at `trace` level |

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Request;
use tracing::{debug, trace, Level};

use crate::credentials::TokenCredential;
use crate::error::SdkError;
use crate::pipeline::{Interceptor, Next};
use crate::response::HttpResponse;

// ---------------------------------------------------------------------------
// User agent
// ---------------------------------------------------------------------------

/// Identifies the calling application to the server.
///
/// The header is overwritten unconditionally, so a default identifier and
/// a user-supplied one can both be applied and the last one wins.
#[derive(Debug, Clone)]
pub struct UserAgentInterceptor {
    value: HeaderValue,
}

impl UserAgentInterceptor {
    /// Build the interceptor for `identifier`.
    ///
    /// Fails when the identifier is blank or not a valid header value.
    pub fn create(identifier: &str) -> Result<Self, SdkError> {
        if identifier.trim().is_empty() {
            return Err(SdkError::Config("user agent must not be empty".into()));
        }
        let value = HeaderValue::from_str(identifier)
            .map_err(|e| SdkError::Config(format!("invalid user agent {identifier:?}: {e}")))?;
        Ok(Self { value })
    }

    /// Set the header on `request`. No I/O.
    pub fn apply(&self, request: &mut Request) {
        request.headers_mut().insert(USER_AGENT, self.value.clone());
    }
}

#[async_trait]
impl Interceptor for UserAgentInterceptor {
    fn name(&self) -> &str {
        "user-agent"
    }

    async fn handle(&self, mut request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
        self.apply(&mut request);
        next.run(request).await
    }
}

// ---------------------------------------------------------------------------
// Bearer token
// ---------------------------------------------------------------------------

/// Attaches `authorization: <token_type> <access_token>` to every request.
///
/// A token is acquired per request; a failed acquisition aborts the request
/// with the credential's error.
#[derive(Debug, Clone)]
pub struct BearerTokenInterceptor {
    credential: Arc<dyn TokenCredential>,
    timeout: Duration,
}

impl BearerTokenInterceptor {
    /// Fetch tokens from `credential`, waiting at most `timeout` for each.
    pub fn new(credential: Arc<dyn TokenCredential>, timeout: Duration) -> Self {
        Self {
            credential,
            timeout,
        }
    }
}

#[async_trait]
impl Interceptor for BearerTokenInterceptor {
    fn name(&self) -> &str {
        "bearer-token"
    }

    async fn handle(&self, mut request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
        let token = self.credential.retrieve_token(self.timeout).await?;
        let mut value = HeaderValue::from_str(&token.authorization_value()).map_err(|_| {
            SdkError::MalformedResponse("access token is not a valid header value".into())
        })?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        next.run(request).await
    }
}

// ---------------------------------------------------------------------------
// Request logging
// ---------------------------------------------------------------------------

/// Bodies larger than this are not written to the log.
const MAX_LOGGED_BODY: usize = 2 * 1024 * 1024;

/// Traces each request and its response.
///
/// The `authorization` header never reaches the log. Register it last so
/// it sees the request as it goes on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggingInterceptor;

#[async_trait]
impl Interceptor for RequestLoggingInterceptor {
    fn name(&self) -> &str {
        "request-logging"
    }

    async fn handle(&self, request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
        if tracing::enabled!(Level::TRACE) {
            trace!(
                method = %request.method(),
                url = %request.url(),
                headers = ?redacted(request.headers()),
                body = %describe_request_body(request.body()),
                "request"
            );
        }

        let result = next.run(request).await;

        match &result {
            Ok(resp) => trace!(
                status = %resp.status(),
                headers = ?redacted(resp.headers()),
                body = %describe_body(resp.body()),
                "response"
            ),
            Err(err) => debug!(error = %err, "request failed"),
        }
        result
    }
}

/// Copy of `headers` without credentials.
fn redacted(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    headers.remove(AUTHORIZATION);
    headers
}

/// Streamed bodies are never read for logging.
fn describe_request_body(body: Option<&reqwest::Body>) -> Cow<'_, str> {
    match body.map(reqwest::Body::as_bytes) {
        None => Cow::Borrowed(""),
        Some(None) => Cow::Borrowed("<streamed body omitted from log>"),
        Some(Some(bytes)) => describe_body(bytes),
    }
}

fn describe_body(bytes: &[u8]) -> Cow<'_, str> {
    if bytes.len() > MAX_LOGGED_BODY {
        Cow::Owned(format!(
            "<{} bytes omitted from log due to size>",
            bytes.len()
        ))
    } else {
        String::from_utf8_lossy(bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
