//! Lexer for the Weft interface description language.
//!
//! Built on logos. Source is tokenized up front into a vector of tokens
//! with line and column information, which the recursive descent parser
//! then walks.

use logos::Logos;

use crate::error::ParseError;

/// A half-open byte range with the line and column of its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// 1-based line of the start
    pub line: u32,
    /// 1-based column of the start
    pub column: u32,
}

impl Span {
    /// Build a span.
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Span {
            start,
            end,
            line,
            column,
        }
    }
}

/// Logos-based token enum, converted to [`Token`] after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"/\*", lex_block_comment)]
    Skip,

    #[token("type")]
    KwType,
    #[token("service")]
    KwService,
    #[token("func")]
    KwFunc,
    #[token("record")]
    KwRecord,
    #[token("variant")]
    KwVariant,
    #[token("opt")]
    KwOpt,
    #[token("vec")]
    KwVec,
    #[token("blob")]
    KwBlob,
    #[token("principal")]
    KwPrincipal,
    #[token("query")]
    KwQuery,
    #[token("oneway")]
    KwOneway,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,
    #[token("null")]
    KwNull,

    #[token("=")]
    Equals,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("->")]
    Arrow,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9][0-9_]*", |lex| lex.slice().to_string())]
    #[regex(r"0x[0-9a-fA-F][0-9a-fA-F_]*", |lex| lex.slice().to_string())]
    Number(String),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", |lex| lex.slice().to_string())]
    Float(String),

    #[regex(r#""([^"\\\n]|\\[^\n])*""#, lex_string)]
    Bytes(Vec<u8>),
}

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `type` keyword
    KwType,
    /// `service` keyword
    KwService,
    /// `func` keyword
    KwFunc,
    /// `record` keyword
    KwRecord,
    /// `variant` keyword
    KwVariant,
    /// `opt` keyword
    KwOpt,
    /// `vec` keyword
    KwVec,
    /// `blob` keyword
    KwBlob,
    /// `principal` keyword
    KwPrincipal,
    /// `query` annotation
    KwQuery,
    /// `oneway` annotation
    KwOneway,
    /// `true`
    KwTrue,
    /// `false`
    KwFalse,
    /// `null`
    KwNull,
    /// `=`
    Equals,
    /// `;`
    Semi,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `->`
    Arrow,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// Identifier or primitive type name (`nat`, `int32`, ...).
    Ident(String),
    /// Decimal or hex integer literal, kept raw so the parser can report
    /// the original spelling on overflow.
    Number(String),
    /// Float literal, kept raw.
    Float(String),
    /// String literal, unescaped to raw bytes. Byte escapes may produce
    /// invalid UTF-8, which is fine for blob literals; text consumers
    /// re-validate.
    Bytes(Vec<u8>),
    /// End of input, appended by the driver.
    Eof,
}

fn convert(token: LogosToken) -> Token {
    match token {
        LogosToken::Skip => unreachable!("skipped by logos"),
        LogosToken::KwType => Token::KwType,
        LogosToken::KwService => Token::KwService,
        LogosToken::KwFunc => Token::KwFunc,
        LogosToken::KwRecord => Token::KwRecord,
        LogosToken::KwVariant => Token::KwVariant,
        LogosToken::KwOpt => Token::KwOpt,
        LogosToken::KwVec => Token::KwVec,
        LogosToken::KwBlob => Token::KwBlob,
        LogosToken::KwPrincipal => Token::KwPrincipal,
        LogosToken::KwQuery => Token::KwQuery,
        LogosToken::KwOneway => Token::KwOneway,
        LogosToken::KwTrue => Token::KwTrue,
        LogosToken::KwFalse => Token::KwFalse,
        LogosToken::KwNull => Token::KwNull,
        LogosToken::Equals => Token::Equals,
        LogosToken::Semi => Token::Semi,
        LogosToken::Colon => Token::Colon,
        LogosToken::Comma => Token::Comma,
        LogosToken::Dot => Token::Dot,
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::LBrace => Token::LBrace,
        LogosToken::RBrace => Token::RBrace,
        LogosToken::Arrow => Token::Arrow,
        LogosToken::Plus => Token::Plus,
        LogosToken::Minus => Token::Minus,
        LogosToken::Ident(s) => Token::Ident(s),
        LogosToken::Number(s) => Token::Number(s),
        LogosToken::Float(s) => Token::Float(s),
        LogosToken::Bytes(b) => Token::Bytes(b),
    }
}

fn lex_block_comment(lex: &mut logos::Lexer<LogosToken>) -> logos::Skip {
    // "/*" is consumed; find the matching "*/", allowing nesting.
    let remainder = lex.remainder();
    let bytes = remainder.as_bytes();
    let mut depth = 1usize;
    let mut pos = 0;
    while pos + 1 < bytes.len() && depth > 0 {
        match &bytes[pos..pos + 2] {
            b"*/" => {
                depth -= 1;
                pos += 2;
            }
            b"/*" => {
                depth += 1;
                pos += 2;
            }
            _ => pos += 1,
        }
    }
    if depth > 0 {
        // Unterminated; consume to end and let the parser hit Eof.
        lex.bump(remainder.len());
    } else {
        lex.bump(pos);
    }
    logos::Skip
}

fn lex_string(lex: &mut logos::Lexer<LogosToken>) -> Option<Vec<u8>> {
    let slice = lex.slice();
    unescape(&slice[1..slice.len() - 1])
}

/// Decode the escape sequences of a quoted literal into raw bytes.
fn unescape(raw: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next()? {
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            '\'' => out.push(b'\''),
            'u' => {
                // \u{XXXX}
                if chars.next()? != '{' {
                    return None;
                }
                let mut hex = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        h => hex.push(h),
                    }
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                let c = char::from_u32(code)?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            // \XX byte escape
            h1 if h1.is_ascii_hexdigit() => {
                let h2 = chars.next()?;
                if !h2.is_ascii_hexdigit() {
                    return None;
                }
                let hex: String = [h1, h2].iter().collect();
                out.push(u8::from_str_radix(&hex, 16).ok()?);
            }
            _ => return None,
        }
    }
    Some(out)
}

/// Tokenize a whole source string, tracking line and column positions.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens = Vec::new();
    let mut lexer = LogosToken::lexer(source);
    let mut line = 1u32;
    let mut column = 1u32;
    let mut last_end = 0;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        for c in source[last_end..range.start].chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        let span = Span::new(range.start, range.end, line, column);
        match result {
            Ok(token) => tokens.push((convert(token), span)),
            Err(()) => {
                let ch = source[range.start..].chars().next().unwrap_or('\0');
                return Err(ParseError::UnexpectedCharacter { ch, line, column });
            }
        }
        for c in source[range.start..range.end].chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        last_end = range.end;
    }

    tokens.push((Token::Eof, Span::new(source.len(), source.len(), line, column)));
    Ok(tokens)
}
