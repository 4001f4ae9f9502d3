#![deny(missing_docs)]

//! # armctl models
//!
//! Plain data types for authenticating against the resource-management
//! control plane.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`scope`] | Validated newtypes: `ResourceScope`, `EndpointPort` |
//! | [`credential`] | `Credential` descriptor and the `Token` it exchanges for |
//! | [`error`] | `ModelError` returned by every validating constructor |

pub mod credential;
pub mod error;
pub mod scope;

// Re-export all public types at crate root for convenience.
pub use credential::*;
pub use error::*;
pub use scope::*;
