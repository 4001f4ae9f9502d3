//! SDK error types.
//!
//! [`SdkError`] is the single error type returned by every fallible
//! operation in the SDK: token retrieval, the interceptor chain, and the
//! client. The SDK never retries or logs-and-swallows; every failure is
//! handed back to the caller through this enum.

use armctl_models::ModelError;

/// Error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Invalid or missing configuration (e.g. bad header value, unknown auth method).
    #[error("configuration error: {0}")]
    Config(String),

    /// A credential descriptor or token failed validation.
    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] ModelError),

    /// The HTTP call failed at the transport level (connect, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The identity endpoint answered with a non-success status.
    #[error("token request failed with status {status}: {body}")]
    TokenRequestFailed {
        /// HTTP status code returned by the identity endpoint.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The identity endpoint answered 2xx but the body is not a token.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// An interceptor completed without invoking the next stage.
    #[error("interceptor `{interceptor}` returned without invoking the next stage")]
    ChainProtocolViolation {
        /// Name of the offending interceptor.
        interceptor: String,
    },

    /// An interceptor got an error from the rest of the chain and returned `Ok` anyway.
    #[error("interceptor `{interceptor}` suppressed a downstream error: {message}")]
    ErrorSuppressed {
        /// Name of the offending interceptor.
        interceptor: String,
        /// The downstream error that was dropped.
        message: String,
    },

    /// The transport panicked while sending a request.
    #[error("transport panicked: {message}")]
    TransportPanicked {
        /// Panic payload, when it was a string.
        message: String,
    },

    /// An interceptor panicked while handling a request.
    #[error("interceptor `{interceptor}` panicked: {message}")]
    InterceptorPanicked {
        /// Name of the offending interceptor.
        interceptor: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
