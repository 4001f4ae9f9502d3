//! Client configuration.
//!
//! Built from environment variables at startup and passed explicitly to
//! [`ArmClient::new`](crate::client::ArmClient::new); nothing in the SDK
//! reads the environment after that.

use std::sync::Arc;
use std::time::Duration;

use armctl_models::{Credential, EndpointPort, ResourceScope, Token};
use reqwest::Url;
use strum::VariantNames;

use crate::credentials::{ManagedIdentityCredential, StaticTokenCredential, TokenCredential};
use crate::error::SdkError;

/// Control-plane base URL used when `ARMCTL_ENDPOINT` is unset.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com/";
/// Token audience used when `ARMCTL_RESOURCE` is unset.
pub const DEFAULT_RESOURCE: &str = "https://management.core.windows.net/";
/// Port of the managed-identity VM extension.
pub const DEFAULT_MSI_PORT: u16 = 50342;
/// How long token acquisition may take when `ARMCTL_TOKEN_TIMEOUT_SECS` is unset.
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// How the client obtains its bearer token.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum AuthMethod {
    /// Ask the local identity endpoint.
    ManagedIdentity,
    /// Use a token supplied in `ARMCTL_ACCESS_TOKEN`.
    AccessToken,
}

impl AuthMethod {
    /// Parse a method name, listing the accepted values on failure.
    pub fn parse(value: &str) -> Result<Self, SdkError> {
        value.trim().parse().map_err(|_| {
            SdkError::Config(format!(
                "unknown auth method {value:?}, expected one of: {}",
                Self::VARIANTS.join(", ")
            ))
        })
    }
}

/// Everything needed to build an [`ArmClient`](crate::client::ArmClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Control-plane base URL.
    pub endpoint: Url,
    /// Credential strategy.
    pub auth: AuthMethod,
    /// Audience requested from the identity endpoint.
    pub resource: ResourceScope,
    /// Local identity endpoint port.
    pub msi_port: EndpointPort,
    /// Pre-acquired token for [`AuthMethod::AccessToken`].
    pub access_token: Option<String>,
    /// Value of the `user-agent` header.
    pub user_agent: String,
    /// Timeout handed to every token acquisition.
    pub token_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            auth: AuthMethod::ManagedIdentity,
            resource: ResourceScope::new(DEFAULT_RESOURCE).expect("default resource is non-empty"),
            msi_port: EndpointPort::new(DEFAULT_MSI_PORT).expect("default port is non-zero"),
            access_token: None,
            user_agent: default_user_agent(),
            token_timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }
}

/// `armctl/<crate version>`.
pub fn default_user_agent() -> String {
    format!("armctl/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                    | Default                                 |
    /// |-----------------------------|-----------------------------------------|
    /// | `ARMCTL_ENDPOINT`           | `https://management.azure.com/`         |
    /// | `ARMCTL_AUTH`               | `managed-identity`                      |
    /// | `ARMCTL_RESOURCE`           | `https://management.core.windows.net/`  |
    /// | `ARMCTL_MSI_PORT`           | `50342`                                 |
    /// | `ARMCTL_ACCESS_TOKEN`       | unset                                   |
    /// | `ARMCTL_USER_AGENT`         | `armctl/<version>`                      |
    /// | `ARMCTL_TOKEN_TIMEOUT_SECS` | `30`                                    |
    ///
    /// Blank values count as unset.
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SdkError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("ARMCTL_ENDPOINT") {
            cfg.endpoint = parse_endpoint(&v)?;
        }
        if let Some(v) = get("ARMCTL_AUTH") {
            cfg.auth = AuthMethod::parse(&v)?;
        }
        if let Some(v) = get("ARMCTL_RESOURCE") {
            cfg.resource = ResourceScope::new(&v)?;
        }
        if let Some(v) = get("ARMCTL_MSI_PORT") {
            cfg.msi_port = v.parse()?;
        }
        cfg.access_token = get("ARMCTL_ACCESS_TOKEN");
        if let Some(v) = get("ARMCTL_USER_AGENT") {
            cfg.user_agent = v;
        }
        if let Some(v) = get("ARMCTL_TOKEN_TIMEOUT_SECS") {
            cfg.token_timeout = parse_timeout(&v)?;
        }

        Ok(cfg)
    }

    /// Build the credential selected by [`auth`](Self::auth).
    pub fn credential(&self) -> Result<Arc<dyn TokenCredential>, SdkError> {
        match self.auth {
            AuthMethod::ManagedIdentity => Ok(Arc::new(ManagedIdentityCredential::new(
                Credential::new(self.resource.clone(), self.msi_port),
            ))),
            AuthMethod::AccessToken => {
                let token = self.access_token.as_deref().ok_or_else(|| {
                    SdkError::Config(
                        "ARMCTL_ACCESS_TOKEN is required with the access-token auth method".into(),
                    )
                })?;
                Ok(Arc::new(StaticTokenCredential::new(Token::new(
                    "Bearer", token,
                )?)))
            }
        }
    }
}

/// Parse a control-plane base URL. Only `http` and `https` are accepted.
pub fn parse_endpoint(value: &str) -> Result<Url, SdkError> {
    let url = Url::parse(value.trim()).map_err(|e| SdkError::InvalidUrl(format!("{value}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SdkError::InvalidUrl(format!(
            "{value}: unsupported scheme {other:?}"
        ))),
    }
}

/// Parse a positive number of seconds.
pub fn parse_timeout(value: &str) -> Result<Duration, SdkError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(SdkError::Config(format!(
            "invalid token timeout {value:?}, expected a positive number of seconds"
        ))),
    }
}
