//! Validated newtypes for the two inputs of a token exchange.
//!
//! A [`ResourceScope`] names the audience a token is issued for (e.g.
//! `https://management.core.windows.net/`). An [`EndpointPort`] is the
//! local port the identity endpoint listens on. Both are checked once at
//! construction so the rest of the workspace can rely on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// ---------------------------------------------------------------------------
// ResourceScope
// ---------------------------------------------------------------------------

/// Target audience of a bearer token.
///
/// Never empty: surrounding whitespace is trimmed and an empty result is
/// rejected with [`ModelError::EmptyResource`].
///
/// # Examples
///
/// ```
/// use armctl_models::ResourceScope;
///
/// let scope = ResourceScope::new("https://management.core.windows.net/").unwrap();
/// assert_eq!(scope.as_str(), "https://management.core.windows.net/");
///
/// assert!(ResourceScope::new("   ").is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceScope(String);

impl ResourceScope {
    /// Create a new `ResourceScope`, rejecting empty values.
    pub fn new(scope: &str) -> Result<Self, ModelError> {
        let trimmed = scope.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyResource);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for ResourceScope {
    type Error = ModelError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceScope {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<ResourceScope> for String {
    fn from(scope: ResourceScope) -> Self {
        scope.0
    }
}

impl FromStr for ResourceScope {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// EndpointPort
// ---------------------------------------------------------------------------

/// Local port of the identity endpoint.
///
/// Port `0` is rejected: it is not addressable as a destination.
///
/// # Examples
///
/// ```
/// use armctl_models::EndpointPort;
///
/// let port: EndpointPort = "50342".parse().unwrap();
/// assert_eq!(port.get(), 50342);
///
/// assert!(EndpointPort::new(0).is_err());
/// assert!("-1".parse::<EndpointPort>().is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "u16", into = "u16")]
pub struct EndpointPort(u16);

impl EndpointPort {
    /// Create a new `EndpointPort`, rejecting `0`.
    pub fn new(port: u16) -> Result<Self, ModelError> {
        if port == 0 {
            return Err(ModelError::InvalidPort {
                value: port.to_string(),
                reason: "must be between 1 and 65535".into(),
            });
        }
        Ok(Self(port))
    }

    /// Return the port number.
    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for EndpointPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for EndpointPort {
    type Error = ModelError;

    fn try_from(port: u16) -> Result<Self, Self::Error> {
        Self::new(port)
    }
}

impl From<EndpointPort> for u16 {
    fn from(port: EndpointPort) -> Self {
        port.0
    }
}

impl FromStr for EndpointPort {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let port: u16 = s.trim().parse().map_err(|_| ModelError::InvalidPort {
            value: s.to_string(),
            reason: "must be a number between 1 and 65535".into(),
        })?;
        Self::new(port)
    }
}
