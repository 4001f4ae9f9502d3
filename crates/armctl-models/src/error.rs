//! Error types for the `armctl-models` crate.
//!
//! All fallible constructors and `TryFrom` implementations in this crate
//! return variants of [`ModelError`].

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A resource scope was empty or whitespace only.
    #[error("resource scope must not be empty")]
    EmptyResource,

    /// An identity endpoint port was zero or not a number in `1..=65535`.
    #[error("invalid endpoint port \"{value}\": {reason}")]
    InvalidPort {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A token field came back empty from the identity endpoint.
    #[error("token field `{field}` must not be empty")]
    EmptyTokenField {
        /// The name of the empty field.
        field: &'static str,
    },
}
