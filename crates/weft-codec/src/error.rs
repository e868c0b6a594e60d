//! Codec errors
//!
//! Decoding errors carry the byte offset where the problem was detected,
//! which makes corrupt-message reports actionable.

use thiserror::Error;
use weft_types::TypeError;

/// Errors raised while serializing values.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A value does not inhabit the type it is being encoded at.
    #[error("value {value} does not match type {ty}")]
    Mismatch {
        /// Rendered value
        value: String,
        /// Rendered type
        ty: String,
    },
    /// The argument type list and value list disagree in length.
    #[error("cannot encode {values} values at {types} types")]
    Arity {
        /// Number of values supplied
        values: usize,
        /// Number of types supplied
        types: usize,
    },
    /// A type mentioned during encoding failed to resolve.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Errors raised while deserializing messages.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The message does not start with the magic header.
    #[error("bad magic header {0:02x?}, expected \"DIDL\"")]
    BadMagic([u8; 4]),
    /// The message ended before a read at this offset completed.
    #[error("unexpected end of message at offset {0}")]
    Truncated(usize),
    /// An LEB128 integer at this offset was malformed or out of range.
    #[error("malformed LEB128 integer at offset {0}")]
    Leb128(usize),
    /// The table section used an opcode this decoder does not know.
    #[error("unknown type opcode {opcode} at offset {offset}")]
    UnknownOpcode {
        /// The offending signed opcode
        opcode: i64,
        /// Byte offset of the opcode
        offset: usize,
    },
    /// A type reference pointed past the end of the type table.
    #[error("type index {index} out of range at offset {offset}")]
    IndexOutOfRange {
        /// The out-of-range table index
        index: i64,
        /// Byte offset of the reference
        offset: usize,
    },
    /// A text value was not valid UTF-8.
    #[error("invalid utf-8 in text value at offset {0}")]
    InvalidUtf8(usize),
    /// Structurally invalid table or value data.
    #[error("malformed message at offset {offset}: {reason}")]
    Malformed {
        /// Byte offset of the problem
        offset: usize,
        /// What was wrong
        reason: String,
    },
    /// Record or variant fields in the table were not sorted by label.
    #[error("unordered field labels in type table at offset {0}")]
    UnorderedFields(usize),
    /// A wire type cannot be coerced to the expected type.
    #[error("argument {position}: wire type {wire} is not a subtype of expected type {expected}")]
    Mismatch {
        /// Zero-based argument position
        position: usize,
        /// Rendered wire-side type
        wire: String,
        /// Rendered expected type
        expected: String,
    },
    /// Fewer arguments on the wire than expected, and the missing one is
    /// not defaultable.
    #[error("missing argument {position} of expected type {expected}")]
    MissingArgument {
        /// Zero-based argument position
        position: usize,
        /// Rendered expected type
        expected: String,
    },
    /// Bytes remained after the value section was fully consumed.
    #[error("trailing bytes after message at offset {0}")]
    TrailingBytes(usize),
    /// A type-level failure, such as an unbound name in the expected
    /// types.
    #[error(transparent)]
    Type(#[from] TypeError),
}
