//! Weft
//!
//! A structurally typed interface description language. Interfaces are
//! plain text, values travel in a self-describing binary format, and a
//! subtyping relation says which interface changes are safe to ship.
//!
//! # Example
//!
//! ```
//! use weft::{decode, encode, find_method, parse_args, parse_program};
//!
//! let program = parse_program(
//!     "service : { pay : (nat, opt text) -> (bool); }",
//! ).unwrap();
//! let actor = program.actor.unwrap();
//! let func = find_method(&program.env, &actor, "pay").unwrap();
//!
//! let args = parse_args(r#"(42, opt "memo")"#).unwrap();
//! let bytes = encode(&program.env, &func.args, &args).unwrap();
//! let back = decode(&program.env, &bytes, &func.args).unwrap();
//! assert_eq!(back.len(), 2);
//! ```

#![warn(missing_docs)]

use thiserror::Error;

pub use weft_codec::{decode, decode_untyped, encode, DecodeError, EncodeError};
pub use weft_parser::{
    parse_args, parse_program, parse_signature, parse_type, parse_value, ParseError, Program,
};
pub use weft_types::{
    equal, label_hash, subtype, Field, FuncMode, FuncType, Label, Principal, SubtypeChecker,
    Type, TypeEnv, TypeError, Value, ValueField,
};

/// Any failure from parsing, type checking, or the codec.
#[derive(Debug, Error)]
pub enum Error {
    /// Type-level failure
    #[error(transparent)]
    Type(#[from] TypeError),
    /// Source text failure
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Serialization failure
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Deserialization failure
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Look up a method on a service type, resolving names along the way.
pub fn find_method<'a>(
    env: &'a TypeEnv,
    actor: &'a Type,
    name: &str,
) -> Result<&'a FuncType, Error> {
    let methods = match env.trans(actor)? {
        Type::Service(methods) => methods,
        other => {
            return Err(Error::Type(TypeError::Mismatch {
                value: other.to_string(),
                ty: "a service type".to_string(),
            }))
        }
    };
    match methods.binary_search_by(|(n, _)| n.as_str().cmp(name)) {
        Ok(i) => Ok(env.as_func(&methods[i].1)?),
        Err(_) => Err(Error::Type(TypeError::MissingMethod {
            name: name.to_string(),
        })),
    }
}

/// Is it safe to replace a service of the old type with one of the new
/// type, for clients written against the old interface? Each type
/// resolves in its own environment.
pub fn compatible(
    new_env: &TypeEnv,
    new: &Type,
    old_env: &TypeEnv,
    old: &Type,
) -> Result<bool, Error> {
    Ok(SubtypeChecker::with_envs(new_env, old_env).subtype(new, old)?)
}

/// Parse an argument sequence and encode it at the given types in one
/// step.
pub fn encode_text(env: &TypeEnv, types: &[Type], source: &str) -> Result<Vec<u8>, Error> {
    let values = parse_args(source)?;
    Ok(encode(env, types, &values)?)
}

/// Parse a value literal and coerce it to an expected type.
pub fn parse_value_as(env: &TypeEnv, source: &str, expected: &Type) -> Result<Value, Error> {
    let value = parse_value(source)?;
    Ok(value.annotate(env, expected)?)
}

/// Render a value in the textual syntax.
///
/// With a type, field and tag names are restored from it; without one,
/// labels print as their numeric hashes, which is all the wire carries.
pub fn print_value(env: &TypeEnv, value: &Value, ty: Option<&Type>) -> Result<String, Error> {
    match ty {
        Some(ty) => Ok(value.annotate(env, ty)?.to_string()),
        None => Ok(value.to_string()),
    }
}

/// Render an argument sequence the way [`parse_args`] reads it.
pub fn format_args(values: &[Value]) -> String {
    let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("({})", rendered.join(", "))
}
