//! Weft Wire Codec
//!
//! Self-describing binary serialization for Weft argument sequences.
//! Every message carries its own type table, so receivers decode against
//! their expected types and coerce across compatible interface versions.

#![warn(missing_docs)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod leb128;
pub mod opcode;

pub use decode::{decode, decode_untyped};
pub use encode::{encode, MAGIC};
pub use error::{DecodeError, EncodeError};
