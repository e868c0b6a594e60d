//! Weft Type System
//!
//! Type and value representation, environments, and structural subtyping
//! for the Weft interface description language.

#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod principal;
pub mod subtyping;
pub mod ty;
pub mod value;

pub use env::TypeEnv;
pub use error::TypeError;
pub use principal::Principal;
pub use subtyping::{equal, subtype, SubtypeChecker};
pub use ty::{label_hash, Field, FuncMode, FuncType, Label, Type};
pub use value::{Value, ValueField};
