//! Weft Textual Syntax
//!
//! Lexer and recursive descent parser for interface files (`type`
//! definitions and `service` declarations) and for value literals.

#![warn(missing_docs)]

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::ParseError;
pub use lexer::{Span, Token};
pub use parser::{
    parse_args, parse_program, parse_signature, parse_type, parse_value, Parser, Program,
};
