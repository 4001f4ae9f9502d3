//! Token-exchange descriptor and result.
//!
//! A [`Credential`] says *what* to ask the identity endpoint for and
//! *where* that endpoint listens. A [`Token`] is what comes back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::scope::{EndpointPort, ResourceScope};

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Request for a bearer token from a local identity endpoint.
///
/// Built once when the authentication strategy is selected and never
/// mutated afterwards. It holds no connection or secret, only the two
/// validated inputs of the exchange.
///
/// # Examples
///
/// ```
/// use armctl_models::Credential;
///
/// let cred = Credential::parse("https://management.core.windows.net/", 50342).unwrap();
/// assert_eq!(cred.endpoint_port().get(), 50342);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    resource: ResourceScope,
    endpoint_port: EndpointPort,
}

impl Credential {
    /// Create a credential from already-validated parts.
    pub fn new(resource: ResourceScope, endpoint_port: EndpointPort) -> Self {
        Self {
            resource,
            endpoint_port,
        }
    }

    /// Validate raw values and build a credential.
    pub fn parse(resource: &str, endpoint_port: u16) -> Result<Self, ModelError> {
        Ok(Self::new(
            ResourceScope::new(resource)?,
            EndpointPort::new(endpoint_port)?,
        ))
    }

    /// The audience the token will be scoped to.
    pub fn resource(&self) -> &ResourceScope {
        &self.resource
    }

    /// Port of the identity endpoint.
    pub fn endpoint_port(&self) -> EndpointPort {
        self.endpoint_port
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Result of a successful credential exchange.
///
/// Both fields are always present and non-empty. Deserialisation goes
/// through the same check, so an identity endpoint answering
/// `{"token_type": "", ...}` never yields a half-filled token.
///
/// `Debug` output hides the access token.
///
/// # Examples
///
/// ```
/// use armctl_models::Token;
///
/// let token: Token =
///     serde_json::from_str(r#"{"token_type":"Bearer","access_token":"abc123"}"#).unwrap();
/// assert_eq!(token.authorization_value(), "Bearer abc123");
/// assert!(!format!("{token:?}").contains("abc123"));
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(try_from = "RawToken")]
pub struct Token {
    token_type: String,
    access_token: String,
}

/// Wire shape of a token response; unknown fields are ignored.
#[derive(Deserialize)]
struct RawToken {
    token_type: String,
    access_token: String,
}

impl TryFrom<RawToken> for Token {
    type Error = ModelError;

    fn try_from(raw: RawToken) -> Result<Self, Self::Error> {
        Self::new(raw.token_type, raw.access_token)
    }
}

impl Token {
    /// Build a token, rejecting empty fields.
    pub fn new(
        token_type: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let token_type = token_type.into();
        let access_token = access_token.into();
        if token_type.is_empty() {
            return Err(ModelError::EmptyTokenField { field: "token_type" });
        }
        if access_token.is_empty() {
            return Err(ModelError::EmptyTokenField {
                field: "access_token",
            });
        }
        Ok(Self {
            token_type,
            access_token,
        })
    }

    /// Scheme label, typically `Bearer`.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// The opaque access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Value for an `Authorization` header: `"{token_type} {access_token}"`.
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.token_type)
            .field("access_token", &"<redacted>")
            .finish()
    }
}
