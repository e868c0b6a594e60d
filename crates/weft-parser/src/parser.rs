//! Recursive descent parser for interface files and value literals.
//!
//! The grammar is small enough for single-token lookahead almost
//! everywhere; distinguishing `field : type` from a bare positional type
//! inside braces takes one extra token of lookahead.

use num_bigint::BigInt;
use weft_types::{Field, FuncMode, FuncType, Label, Type, TypeEnv, Value, ValueField};

use crate::error::ParseError;
use crate::lexer::{tokenize, Span, Token};

/// A parsed interface file: its named type definitions and, when the
/// file declares one, the service the interface describes.
#[derive(Debug, Clone)]
pub struct Program {
    /// Named type bindings
    pub env: TypeEnv,
    /// The declared service type, if any
    pub actor: Option<Type>,
}

/// Parser state over a pre-tokenized source.
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl Parser {
    /// Tokenize `source` and set up a parser over it.
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].0
    }

    fn span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn advance(&mut self) -> (Token, Span) {
        let entry = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        entry
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let span = self.span();
        match self.peek() {
            Token::Eof => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
            found => ParseError::UnexpectedToken {
                found: describe(found),
                expected: expected.to_string(),
                line: span.line,
                column: span.column,
            },
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    // ---- types ----

    /// Parse one type expression.
    pub fn parse_type(&mut self) -> Result<Type, ParseError> {
        match self.peek().clone() {
            Token::KwOpt => {
                self.advance();
                Ok(Type::Opt(Box::new(self.parse_type()?)))
            }
            Token::KwVec => {
                self.advance();
                Ok(Type::Vec(Box::new(self.parse_type()?)))
            }
            Token::KwBlob => {
                self.advance();
                Ok(Type::Blob)
            }
            Token::KwRecord => {
                self.advance();
                Ok(Type::record(self.parse_field_types(false)?))
            }
            Token::KwVariant => {
                self.advance();
                Ok(Type::variant(self.parse_field_types(true)?))
            }
            Token::KwFunc => {
                self.advance();
                Ok(Type::Func(self.parse_func_type()?))
            }
            Token::KwService => {
                self.advance();
                Ok(Type::service(self.parse_service_methods()?))
            }
            Token::KwPrincipal => {
                self.advance();
                Ok(Type::Principal)
            }
            Token::KwNull => {
                self.advance();
                Ok(Type::Null)
            }
            Token::Ident(name) => {
                self.advance();
                Ok(primitive_type(&name).unwrap_or(Type::Var(name)))
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    /// The brace-enclosed fields of a record or variant type. Unlabeled
    /// entries get positional labels counting up from the previous one.
    fn parse_field_types(&mut self, variant: bool) -> Result<Vec<Field>, ParseError> {
        self.expect(Token::LBrace, "'{'")?;
        let mut fields = Vec::new();
        let mut next_id: u32 = 0;
        while !self.eat(&Token::RBrace) {
            // A label is a number, or a name followed by ':'. In a
            // variant a bare name is a tag; in a record it is a
            // positional type.
            let labelled = match self.peek() {
                Token::Number(_) => true,
                Token::Ident(_) | Token::Bytes(_) => {
                    *self.peek_at(1) == Token::Colon
                        || (variant && matches!(self.peek_at(1), Token::Semi | Token::RBrace))
                }
                _ => false,
            };
            let (label, ty) = if labelled {
                let label = self.take_label()?;
                let ty = if self.eat(&Token::Colon) {
                    self.parse_type()?
                } else if variant {
                    Type::Null
                } else {
                    return Err(self.unexpected("':'"));
                };
                (label, ty)
            } else if variant {
                return Err(self.unexpected("a variant tag"));
            } else {
                (Label::Id(next_id), self.parse_type()?)
            };
            next_id = label.id().wrapping_add(1);
            fields.push(Field { label, ty });
            if !self.eat(&Token::Semi) && *self.peek() != Token::RBrace {
                return Err(self.unexpected("';' or '}'"));
            }
        }
        Ok(fields)
    }

    /// Consume one field label: a numeric id, an identifier, or a
    /// quoted name.
    fn take_label(&mut self) -> Result<Label, ParseError> {
        let span = self.span();
        match self.peek().clone() {
            Token::Number(text) => {
                self.advance();
                let id = parse_u32(&text).ok_or(ParseError::InvalidNumber {
                    text,
                    line: span.line,
                    column: span.column,
                })?;
                Ok(Label::Id(id))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Label::Named(name))
            }
            Token::Bytes(bytes) => {
                self.advance();
                let name = String::from_utf8(bytes).map_err(|_| ParseError::InvalidText {
                    line: span.line,
                    column: span.column,
                })?;
                Ok(Label::Named(name))
            }
            _ => Err(self.unexpected("a field label")),
        }
    }

    /// `(args) -> (rets) mode*`, the `func` keyword already consumed.
    pub fn parse_func_type(&mut self) -> Result<FuncType, ParseError> {
        let args = self.parse_type_tuple()?;
        self.expect(Token::Arrow, "'->'")?;
        let rets = self.parse_type_tuple()?;
        let mut modes = Vec::new();
        loop {
            if self.eat(&Token::KwQuery) {
                modes.push(FuncMode::Query);
            } else if self.eat(&Token::KwOneway) {
                modes.push(FuncMode::Oneway);
            } else {
                break;
            }
        }
        Ok(FuncType::new(args, rets, modes))
    }

    /// A parenthesized type list. Parameter names are accepted and
    /// discarded; only positions matter.
    pub fn parse_type_tuple(&mut self) -> Result<Vec<Type>, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut types = Vec::new();
        while !self.eat(&Token::RParen) {
            if matches!(self.peek(), Token::Ident(_) | Token::Bytes(_))
                && *self.peek_at(1) == Token::Colon
            {
                self.advance();
                self.advance();
            }
            types.push(self.parse_type()?);
            if !self.eat(&Token::Comma) && *self.peek() != Token::RParen {
                return Err(self.unexpected("',' or ')'"));
            }
        }
        Ok(types)
    }

    /// The brace-enclosed method list of a service type.
    fn parse_service_methods(&mut self) -> Result<Vec<(String, Type)>, ParseError> {
        self.expect(Token::LBrace, "'{'")?;
        let mut methods = Vec::new();
        while !self.eat(&Token::RBrace) {
            let span = self.span();
            let name = match self.advance().0 {
                Token::Ident(name) => name,
                Token::Bytes(bytes) => {
                    String::from_utf8(bytes).map_err(|_| ParseError::InvalidText {
                        line: span.line,
                        column: span.column,
                    })?
                }
                _ => return Err(self.unexpected("a method name")),
            };
            self.expect(Token::Colon, "':'")?;
            let ty = match self.peek().clone() {
                Token::LParen => Type::Func(self.parse_func_type()?),
                Token::KwFunc => {
                    self.advance();
                    Type::Func(self.parse_func_type()?)
                }
                Token::Ident(name) => {
                    self.advance();
                    Type::Var(name)
                }
                _ => return Err(self.unexpected("a function type")),
            };
            methods.push((name, ty));
            if !self.eat(&Token::Semi) && *self.peek() != Token::RBrace {
                return Err(self.unexpected("';' or '}'"));
            }
        }
        Ok(methods)
    }

    // ---- programs ----

    /// Parse a whole interface file: `type` definitions followed by an
    /// optional `service` declaration. The resulting environment is
    /// validated before it is returned.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut env = TypeEnv::new();
        let mut actor = None;
        while !self.at_end() {
            if self.eat(&Token::KwType) {
                let name = match self.advance().0 {
                    Token::Ident(name) => name,
                    _ => return Err(self.unexpected("a type name")),
                };
                self.expect(Token::Equals, "'='")?;
                let ty = self.parse_type()?;
                self.expect(Token::Semi, "';'")?;
                env.insert(&name, ty)?;
            } else if self.eat(&Token::KwService) {
                // `service name? : { methods }` or a reference to a
                // named service type.
                if let Token::Ident(_) = self.peek() {
                    self.advance();
                }
                self.expect(Token::Colon, "':'")?;
                let ty = match self.peek().clone() {
                    Token::LBrace => Type::service(self.parse_service_methods()?),
                    Token::Ident(name) => {
                        self.advance();
                        Type::Var(name)
                    }
                    _ => return Err(self.unexpected("'{' or a type name")),
                };
                self.eat(&Token::Semi);
                actor = Some(ty);
            } else {
                return Err(self.unexpected("'type' or 'service'"));
            }
        }
        env.validate()?;
        if let Some(actor) = &actor {
            env.validate_type(actor)?;
            if !matches!(env.trans(actor)?, Type::Service(_)) {
                return Err(ParseError::Type(weft_types::TypeError::Mismatch {
                    value: actor.to_string(),
                    ty: "a service type".to_string(),
                }));
            }
        }
        Ok(Program { env, actor })
    }

    // ---- values ----

    /// Parse one value literal, with an optional `: type` annotation.
    pub fn parse_value(&mut self) -> Result<Value, ParseError> {
        let value = self.parse_bare_value()?;
        if self.eat(&Token::Colon) {
            let ty = self.parse_type()?;
            let env = TypeEnv::new();
            return Ok(value.annotate(&env, &ty)?);
        }
        Ok(value)
    }

    fn parse_bare_value(&mut self) -> Result<Value, ParseError> {
        let span = self.span();
        match self.peek().clone() {
            Token::KwTrue => {
                self.advance();
                Ok(Value::Bool(true))
            }
            Token::KwFalse => {
                self.advance();
                Ok(Value::Bool(false))
            }
            Token::KwNull => {
                self.advance();
                Ok(Value::Null)
            }
            Token::Plus | Token::Minus => {
                let negative = matches!(self.advance().0, Token::Minus);
                let span = self.span();
                match self.advance().0 {
                    Token::Number(text) => {
                        let mut n = parse_bigint(&text).ok_or(ParseError::InvalidNumber {
                            text,
                            line: span.line,
                            column: span.column,
                        })?;
                        if negative {
                            n = -n;
                        }
                        Ok(Value::Int(n))
                    }
                    Token::Float(text) => {
                        let f = parse_float(&text).ok_or(ParseError::InvalidNumber {
                            text,
                            line: span.line,
                            column: span.column,
                        })?;
                        Ok(Value::Float64(if negative { -f } else { f }))
                    }
                    _ => Err(self.unexpected("a number")),
                }
            }
            Token::Number(text) => {
                self.advance();
                let n = parse_bigint(&text).ok_or(ParseError::InvalidNumber {
                    text,
                    line: span.line,
                    column: span.column,
                })?;
                Ok(Value::Int(n))
            }
            Token::Float(text) => {
                self.advance();
                let f = parse_float(&text).ok_or(ParseError::InvalidNumber {
                    text,
                    line: span.line,
                    column: span.column,
                })?;
                Ok(Value::Float64(f))
            }
            Token::Bytes(bytes) => {
                self.advance();
                let s = String::from_utf8(bytes).map_err(|_| ParseError::InvalidText {
                    line: span.line,
                    column: span.column,
                })?;
                Ok(Value::Text(s))
            }
            Token::KwOpt => {
                self.advance();
                Ok(Value::Opt(Box::new(self.parse_bare_value()?)))
            }
            Token::KwVec => {
                self.advance();
                self.expect(Token::LBrace, "'{'")?;
                let mut elems = Vec::new();
                while !self.eat(&Token::RBrace) {
                    elems.push(self.parse_bare_value()?);
                    if !self.eat(&Token::Semi) && *self.peek() != Token::RBrace {
                        return Err(self.unexpected("';' or '}'"));
                    }
                }
                Ok(Value::Vec(elems))
            }
            Token::KwRecord => {
                self.advance();
                self.expect(Token::LBrace, "'{'")?;
                let mut fields = Vec::new();
                let mut next_id: u32 = 0;
                while !self.eat(&Token::RBrace) {
                    // `label = value` or a bare positional value.
                    let labelled = matches!(
                        self.peek(),
                        Token::Number(_) | Token::Ident(_) | Token::Bytes(_)
                    ) && *self.peek_at(1) == Token::Equals;
                    let (label, value) = if labelled {
                        let label = self.take_label()?;
                        self.expect(Token::Equals, "'='")?;
                        (label, self.parse_bare_value()?)
                    } else {
                        (Label::Id(next_id), self.parse_bare_value()?)
                    };
                    next_id = label.id().wrapping_add(1);
                    fields.push(ValueField { label, value });
                    if !self.eat(&Token::Semi) && *self.peek() != Token::RBrace {
                        return Err(self.unexpected("';' or '}'"));
                    }
                }
                Ok(Value::record(fields))
            }
            Token::KwVariant => {
                self.advance();
                self.expect(Token::LBrace, "'{'")?;
                let label = self.take_label()?;
                let value = if self.eat(&Token::Equals) {
                    self.parse_bare_value()?
                } else {
                    Value::Null
                };
                self.eat(&Token::Semi);
                self.expect(Token::RBrace, "'}'")?;
                Ok(Value::variant(label, value))
            }
            Token::KwBlob => {
                self.advance();
                match self.advance().0 {
                    Token::Bytes(bytes) => Ok(Value::Blob(bytes)),
                    _ => Err(self.unexpected("a string literal")),
                }
            }
            Token::KwPrincipal => {
                self.advance();
                Ok(Value::Principal(self.parse_principal_text()?))
            }
            Token::KwService => {
                self.advance();
                Ok(Value::Service(self.parse_principal_text()?))
            }
            Token::KwFunc => {
                self.advance();
                let principal = self.parse_principal_text()?;
                self.expect(Token::Dot, "'.'")?;
                let span = self.span();
                let method = match self.advance().0 {
                    Token::Ident(name) => name,
                    Token::Bytes(bytes) => {
                        String::from_utf8(bytes).map_err(|_| ParseError::InvalidText {
                            line: span.line,
                            column: span.column,
                        })?
                    }
                    _ => return Err(self.unexpected("a method name")),
                };
                Ok(Value::Func(principal, method))
            }
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_principal_text(&mut self) -> Result<weft_types::Principal, ParseError> {
        let span = self.span();
        match self.advance().0 {
            Token::Bytes(bytes) => {
                let text = String::from_utf8(bytes).map_err(|_| ParseError::InvalidText {
                    line: span.line,
                    column: span.column,
                })?;
                Ok(text.parse()?)
            }
            _ => Err(self.unexpected("a string literal")),
        }
    }

    /// A parenthesized argument sequence, `(v1, v2, ...)`.
    pub fn parse_args(&mut self) -> Result<Vec<Value>, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut values = Vec::new();
        while !self.eat(&Token::RParen) {
            values.push(self.parse_value()?);
            if !self.eat(&Token::Comma) && *self.peek() != Token::RParen {
                return Err(self.unexpected("',' or ')'"));
            }
        }
        Ok(values)
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Number(text) | Token::Float(text) => format!("number '{}'", text),
        Token::Bytes(_) => "string literal".to_string(),
        other => format!("{:?}", other),
    }
}

fn primitive_type(name: &str) -> Option<Type> {
    let ty = match name {
        "bool" => Type::Bool,
        "nat" => Type::Nat,
        "int" => Type::Int,
        "nat8" => Type::Nat8,
        "nat16" => Type::Nat16,
        "nat32" => Type::Nat32,
        "nat64" => Type::Nat64,
        "int8" => Type::Int8,
        "int16" => Type::Int16,
        "int32" => Type::Int32,
        "int64" => Type::Int64,
        "float32" => Type::Float32,
        "float64" => Type::Float64,
        "text" => Type::Text,
        "reserved" => Type::Reserved,
        "empty" => Type::Empty,
        _ => return None,
    };
    Some(ty)
}

fn parse_bigint(text: &str) -> Option<BigInt> {
    let clean = text.replace('_', "");
    if let Some(hex) = clean.strip_prefix("0x") {
        BigInt::parse_bytes(hex.as_bytes(), 16)
    } else {
        BigInt::parse_bytes(clean.as_bytes(), 10)
    }
}

fn parse_u32(text: &str) -> Option<u32> {
    let clean = text.replace('_', "");
    if let Some(hex) = clean.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).ok()
    } else {
        clean.parse().ok()
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.replace('_', "").parse().ok()
}

/// Parse an interface file.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(source)?;
    let program = parser.parse_program()?;
    Ok(program)
}

/// Parse a single type expression.
pub fn parse_type(source: &str) -> Result<Type, ParseError> {
    let mut parser = Parser::new(source)?;
    let ty = parser.parse_type()?;
    parser.expect_end()?;
    Ok(ty)
}

/// Parse a single value literal.
pub fn parse_value(source: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(source)?;
    let value = parser.parse_value()?;
    parser.expect_end()?;
    Ok(value)
}

/// Parse a parenthesized type signature, `(t1, t2, ...)`.
pub fn parse_signature(source: &str) -> Result<Vec<Type>, ParseError> {
    let mut parser = Parser::new(source)?;
    let types = parser.parse_type_tuple()?;
    parser.expect_end()?;
    Ok(types)
}

/// Parse a parenthesized argument sequence.
pub fn parse_args(source: &str) -> Result<Vec<Value>, ParseError> {
    let mut parser = Parser::new(source)?;
    let values = parser.parse_args()?;
    parser.expect_end()?;
    Ok(values)
}
