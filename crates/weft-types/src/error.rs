//! Type system errors

use thiserror::Error;

/// Errors reported while constructing or validating type definitions.
///
/// Each is fatal to the definition (or annotation) being processed and
/// carries no partial state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// A named type reference did not resolve in the environment
    #[error("unbound type name: {name}")]
    UnboundTypeName {
        /// The name that was not found
        name: String,
    },

    /// A type name was bound twice in one environment
    #[error("duplicate type name: {name}")]
    DuplicateTypeName {
        /// The rebound name
        name: String,
    },

    /// An alias cycle with no constructor between the names; such a type
    /// would require infinite unfolding
    #[error("type {name} unfolds to itself without a constructor")]
    NonProductiveCycle {
        /// A name on the cycle
        name: String,
    },

    /// Two fields of one record or variant share a numeric label. The wire
    /// format cannot represent this, whether the labels were spelled the
    /// same or merely hash to the same value.
    #[error("duplicate label {id} in {kind}")]
    DuplicateLabel {
        /// `"record"` or `"variant"`
        kind: &'static str,
        /// The colliding numeric label
        id: u32,
    },

    /// A service method's type did not resolve to a function type
    #[error("service method {method} does not have a function type")]
    NotAFunction {
        /// The offending method name
        method: String,
    },

    /// A method looked up on a service that does not declare it
    #[error("service has no method named {name}")]
    MissingMethod {
        /// The requested method name
        name: String,
    },

    /// A value did not fit the type it was annotated with
    #[error("type mismatch: value {value} cannot have type {ty}")]
    Mismatch {
        /// Display form of the value
        value: String,
        /// Display form of the expected type
        ty: String,
    },

    /// A malformed principal identifier
    #[error("invalid principal: {reason}")]
    InvalidPrincipal {
        /// What was wrong with it
        reason: String,
    },
}
