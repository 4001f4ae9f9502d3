#![deny(missing_docs)]

//! # armctl SDK
//!
//! Token acquisition and the outbound request pipeline for the `armctl`
//! control-plane client.
//!
//! The SDK provides:
//!
//! * [`TokenCredential`]: one implementation per authentication
//!   strategy: [`ManagedIdentityCredential`] (local identity endpoint) and
//!   [`StaticTokenCredential`] (pre-acquired token).
//! * [`InterceptorChain`]: ordered, named [`Interceptor`]s that every
//!   request passes through before the [`Transport`] sends it.
//! * Built-in interceptors in [`interceptors`]: user agent, bearer token,
//!   request logging.
//! * [`ArmClient`]: the default chain wired to a control-plane endpoint.
//! * [`ClientConfig`]: environment-driven configuration.
//! * [`SdkError`]: unified error type for all SDK operations.
//!
//! Types from [`armctl_models`] are re-exported for convenience.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use armctl_sdk::{Credential, ManagedIdentityCredential, TokenCredential};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), armctl_sdk::SdkError> {
//! let credential = Credential::parse("https://management.core.windows.net/", 50342)?;
//! let token = ManagedIdentityCredential::new(credential)
//!     .retrieve_token(Duration::from_secs(30))
//!     .await?;
//! println!("Authorization: {}", token.authorization_value());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod interceptors;
pub mod pipeline;
pub mod response;

pub use client::ArmClient;
pub use config::{AuthMethod, ClientConfig};
pub use credentials::{ManagedIdentityCredential, StaticTokenCredential, TokenCredential};
pub use error::SdkError;
pub use pipeline::{Interceptor, InterceptorChain, Next, ReqwestTransport, Transport};
pub use response::HttpResponse;

pub use armctl_models::{Credential, EndpointPort, ResourceScope, Token};
