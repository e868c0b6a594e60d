//! Parse errors

use thiserror::Error;
use weft_types::TypeError;

/// Errors produced while lexing or parsing source text.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    /// A character no token starts with.
    #[error("unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedCharacter {
        /// The offending character
        ch: char,
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
    },
    /// A token that does not fit the grammar here.
    #[error("unexpected {found} at line {line}, column {column}, expected {expected}")]
    UnexpectedToken {
        /// Description of the found token
        found: String,
        /// What the parser wanted
        expected: String,
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
    },
    /// Input ended mid-construct.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof {
        /// What the parser wanted
        expected: String,
    },
    /// An integer or float literal that does not parse.
    #[error("invalid number literal '{text}' at line {line}, column {column}")]
    InvalidNumber {
        /// The literal as written
        text: String,
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
    },
    /// A string literal where text was required but the bytes are not
    /// UTF-8.
    #[error("string literal at line {line}, column {column} is not valid utf-8")]
    InvalidText {
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
    },
    /// A syntactically valid program with a type-level problem.
    #[error(transparent)]
    Type(#[from] TypeError),
}
