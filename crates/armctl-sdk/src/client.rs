//! Control-plane HTTP client.
//!
//! [`ArmClient`] turns `(method, path, api-version, body)` into a request
//! and runs it through an [`InterceptorChain`]. It does not interpret the
//! response: non-2xx statuses come back as ordinary [`HttpResponse`]s and
//! the command layer decides what they mean.
//!
//! # Typical usage
//!
//! ```rust,no_run
//! use armctl_sdk::{ArmClient, ClientConfig};
//! use reqwest::Method;
//!
//! # async fn run() -> Result<(), armctl_sdk::SdkError> {
//! let config = ClientConfig::from_env()?;
//! let client = ArmClient::new(&config)?;
//!
//! let resp = client
//!     .send(Method::GET, "/subscriptions", "2022-12-01", None)
//!     .await?;
//! println!("{}", resp.text());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Request, Url};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::SdkError;
use crate::interceptors::{BearerTokenInterceptor, RequestLoggingInterceptor, UserAgentInterceptor};
use crate::pipeline::{InterceptorChain, ReqwestTransport};
use crate::response::HttpResponse;

/// Authenticated client for one control-plane endpoint.
#[derive(Debug, Clone)]
pub struct ArmClient {
    endpoint: Url,
    chain: InterceptorChain,
}

impl ArmClient {
    /// Build a client with the default chain:
    /// `user-agent` → `bearer-token` → `request-logging` → reqwest.
    pub fn new(config: &ClientConfig) -> Result<Self, SdkError> {
        let credential = config.credential()?;
        let chain = InterceptorChain::builder(Arc::new(ReqwestTransport::new()))
            .with(UserAgentInterceptor::create(&config.user_agent)?)
            .with(BearerTokenInterceptor::new(credential, config.token_timeout))
            .with(RequestLoggingInterceptor)
            .build();

        debug!(endpoint = %config.endpoint, auth = %config.auth, stages = ?chain.names(), "client ready");
        Ok(Self::with_chain(config.endpoint.clone(), chain))
    }

    /// Build a client over a caller-assembled chain.
    pub fn with_chain(endpoint: Url, chain: InterceptorChain) -> Self {
        Self { endpoint, chain }
    }

    /// Base URL that request paths are resolved against.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The interceptor chain every request goes through.
    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Assemble the request without sending it.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Request, SdkError> {
        let mut url = self
            .endpoint
            .join(path)
            .map_err(|e| SdkError::InvalidUrl(format!("{path}: {e}")))?;
        url.query_pairs_mut().append_pair("api-version", api_version);

        let mut request = Request::new(method, url);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(body) = body {
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(serde_json::to_vec(body)?.into());
        }
        Ok(request)
    }

    /// Send one request through the chain.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, SdkError> {
        let request = self.build_request(method, path, api_version, body)?;
        self.chain.send(request).await
    }
}
