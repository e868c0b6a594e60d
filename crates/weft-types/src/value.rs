//! Runtime values
//!
//! `Value` mirrors the shape of [`Type`]: every well-typed message decodes
//! into a tree of these. Values are immutable once built.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;

use crate::env::TypeEnv;
use crate::error::TypeError;
use crate::principal::Principal;
use crate::ty::{Label, Type};

/// A labelled field of a record or variant value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueField {
    /// Field label
    pub label: Label,
    /// Field value
    pub value: Value,
}

/// An untyped runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The unit value
    Null,
    /// Boolean
    Bool(bool),
    /// Unbounded natural
    Nat(BigUint),
    /// Unbounded integer
    Int(BigInt),
    /// 8-bit natural
    Nat8(u8),
    /// 16-bit natural
    Nat16(u16),
    /// 32-bit natural
    Nat32(u32),
    /// 64-bit natural
    Nat64(u64),
    /// 8-bit integer
    Int8(i8),
    /// 16-bit integer
    Int16(i16),
    /// 32-bit integer
    Int32(i32),
    /// 64-bit integer
    Int64(i64),
    /// Single-precision float
    Float32(f32),
    /// Double-precision float
    Float64(f64),
    /// Unicode text
    Text(String),
    /// Raw bytes; the canonical value form of `blob` and `vec nat8`
    Blob(Vec<u8>),
    /// Absent optional
    None,
    /// Present optional
    Opt(Box<Value>),
    /// Sequence
    Vec(Vec<Value>),
    /// Record, fields ascending by label
    Record(Vec<ValueField>),
    /// One tagged alternative
    Variant(Box<ValueField>),
    /// Principal reference
    Principal(Principal),
    /// Service reference
    Service(Principal),
    /// Function reference: service principal and method name
    Func(Principal, String),
    /// Value of type `reserved`; carries no information
    Reserved,
}

impl Value {
    /// Build a record value, canonicalizing field order ascending by label.
    pub fn record(mut fields: Vec<ValueField>) -> Value {
        fields.sort_by_key(|f| f.label.id());
        Value::Record(fields)
    }

    /// Build a variant value.
    pub fn variant(label: Label, value: Value) -> Value {
        Value::Variant(Box::new(ValueField { label, value }))
    }

    /// Coerce this value into the shape of an expected type.
    ///
    /// Untyped parse output uses `int` for every integer literal and
    /// `float64` for every float literal; annotation retypes literals,
    /// wraps optionals, restores field names from the type, and fills in
    /// defaultable missing record fields. Fails with
    /// [`TypeError::Mismatch`] when the value cannot have the type. This is
    /// the strict, parse-time counterpart of the decoder's graceful
    /// coercions.
    pub fn annotate(&self, env: &TypeEnv, ty: &Type) -> Result<Value, TypeError> {
        let t = env.trans(ty)?;
        let mismatch = || TypeError::Mismatch {
            value: self.to_string(),
            ty: t.to_string(),
        };
        match (t, self) {
            (Type::Null, Value::Null) | (Type::Null, Value::None) => Ok(Value::Null),
            (Type::Bool, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (Type::Nat, Value::Nat(n)) => Ok(Value::Nat(n.clone())),
            (Type::Nat, v) => v
                .to_int()
                .and_then(|i| i.to_biguint())
                .map(Value::Nat)
                .ok_or_else(mismatch),
            (Type::Int, Value::Int(i)) => Ok(Value::Int(i.clone())),
            (Type::Int, v) => v.to_int().map(Value::Int).ok_or_else(mismatch),
            (Type::Nat8, v) => v.to_int().and_then(|i| i.to_u8()).map(Value::Nat8).ok_or_else(mismatch),
            (Type::Nat16, v) => v.to_int().and_then(|i| i.to_u16()).map(Value::Nat16).ok_or_else(mismatch),
            (Type::Nat32, v) => v.to_int().and_then(|i| i.to_u32()).map(Value::Nat32).ok_or_else(mismatch),
            (Type::Nat64, v) => v.to_int().and_then(|i| i.to_u64()).map(Value::Nat64).ok_or_else(mismatch),
            (Type::Int8, v) => v.to_int().and_then(|i| i.to_i8()).map(Value::Int8).ok_or_else(mismatch),
            (Type::Int16, v) => v.to_int().and_then(|i| i.to_i16()).map(Value::Int16).ok_or_else(mismatch),
            (Type::Int32, v) => v.to_int().and_then(|i| i.to_i32()).map(Value::Int32).ok_or_else(mismatch),
            (Type::Int64, v) => v.to_int().and_then(|i| i.to_i64()).map(Value::Int64).ok_or_else(mismatch),
            (Type::Float32, Value::Float32(f)) => Ok(Value::Float32(*f)),
            (Type::Float32, Value::Float64(f)) => Ok(Value::Float32(*f as f32)),
            (Type::Float32, v) => v
                .to_int()
                .and_then(|i| i.to_f32())
                .map(Value::Float32)
                .ok_or_else(mismatch),
            (Type::Float64, Value::Float64(f)) => Ok(Value::Float64(*f)),
            (Type::Float64, Value::Float32(f)) => Ok(Value::Float64(*f as f64)),
            (Type::Float64, v) => v
                .to_int()
                .and_then(|i| i.to_f64())
                .map(Value::Float64)
                .ok_or_else(mismatch),
            (Type::Text, Value::Text(s)) => Ok(Value::Text(s.clone())),
            (Type::Blob, Value::Blob(b)) => Ok(Value::Blob(b.clone())),
            (Type::Blob, Value::Text(s)) => Ok(Value::Blob(s.as_bytes().to_vec())),
            (Type::Blob, Value::Vec(elems)) => elems
                .iter()
                .map(|e| e.to_int().and_then(|i| i.to_u8()))
                .collect::<Option<Vec<u8>>>()
                .map(Value::Blob)
                .ok_or_else(mismatch),
            (Type::Principal, Value::Principal(p)) => Ok(Value::Principal(p.clone())),
            (Type::Opt(_), Value::None) | (Type::Opt(_), Value::Null) => Ok(Value::None),
            (Type::Opt(inner), Value::Opt(v)) => {
                Ok(Value::Opt(Box::new(v.annotate(env, inner)?)))
            }
            (Type::Opt(inner), v) => Ok(Value::Opt(Box::new(v.annotate(env, inner)?))),
            (Type::Vec(inner), Value::Vec(elems)) => {
                if *env.trans(inner)? == Type::Nat8 {
                    return self.annotate(env, &Type::Blob);
                }
                let elems = elems
                    .iter()
                    .map(|e| e.annotate(env, inner))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Vec(elems))
            }
            (Type::Vec(inner), Value::Blob(b)) => {
                if *env.trans(inner)? == Type::Nat8 {
                    Ok(Value::Blob(b.clone()))
                } else {
                    Err(mismatch())
                }
            }
            (Type::Record(tfs), Value::Record(vfs)) => {
                // Every value field must exist in the type.
                for vf in vfs {
                    if Type::find_field(tfs, vf.label.id()).is_none() {
                        return Err(mismatch());
                    }
                }
                let mut out = Vec::with_capacity(tfs.len());
                for tf in tfs {
                    let value = match vfs.iter().find(|vf| vf.label.id() == tf.label.id()) {
                        Some(vf) => vf.value.annotate(env, &tf.ty)?,
                        None => match env.trans(&tf.ty)? {
                            Type::Opt(_) => Value::None,
                            Type::Null => Value::Null,
                            Type::Reserved => Value::Reserved,
                            _ => return Err(mismatch()),
                        },
                    };
                    out.push(ValueField {
                        label: tf.label.clone(),
                        value,
                    });
                }
                Ok(Value::Record(out))
            }
            (Type::Variant(tfs), Value::Variant(vf)) => {
                let tf = Type::find_field(tfs, vf.label.id()).ok_or_else(mismatch)?;
                Ok(Value::variant(
                    tf.label.clone(),
                    vf.value.annotate(env, &tf.ty)?,
                ))
            }
            (Type::Func(_), Value::Func(p, m)) => Ok(Value::Func(p.clone(), m.clone())),
            (Type::Service(_), Value::Service(p)) | (Type::Service(_), Value::Principal(p)) => {
                Ok(Value::Service(p.clone()))
            }
            (Type::Reserved, _) => Ok(Value::Reserved),
            (Type::Empty, _) => Err(mismatch()),
            _ => Err(mismatch()),
        }
    }

    /// View a numeric value as an unbounded integer, when it is one.
    pub fn to_int(&self) -> Option<BigInt> {
        match self {
            Value::Nat(n) => Some(BigInt::from(n.clone())),
            Value::Int(i) => Some(i.clone()),
            Value::Nat8(n) => Some(BigInt::from(*n)),
            Value::Nat16(n) => Some(BigInt::from(*n)),
            Value::Nat32(n) => Some(BigInt::from(*n)),
            Value::Nat64(n) => Some(BigInt::from(*n)),
            Value::Int8(n) => Some(BigInt::from(*n)),
            Value::Int16(n) => Some(BigInt::from(*n)),
            Value::Int32(n) => Some(BigInt::from(*n)),
            Value::Int64(n) => Some(BigInt::from(*n)),
            _ => Option::None,
        }
    }
}

fn write_text(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            '\\' => write!(f, "\\\\")?,
            '"' => write!(f, "\\\"")?,
            c if c.is_control() => write!(f, "\\u{{{:x}}}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_finite() && v.fract() == 0.0 {
        write!(f, "{:.1}", v)
    } else {
        write!(f, "{}", v)
    }
}

fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::None => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nat(n) => write!(f, "{}", n),
            Value::Int(i) => write!(f, "{}", i),
            Value::Nat8(n) => write!(f, "{}", n),
            Value::Nat16(n) => write!(f, "{}", n),
            Value::Nat32(n) => write!(f, "{}", n),
            Value::Nat64(n) => write!(f, "{}", n),
            Value::Int8(n) => write!(f, "{}", n),
            Value::Int16(n) => write!(f, "{}", n),
            Value::Int32(n) => write!(f, "{}", n),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Float32(v) => write_float(f, *v as f64),
            Value::Float64(v) => write_float(f, *v),
            Value::Text(s) => write_text(f, s),
            Value::Blob(bytes) => {
                write!(f, "blob \"")?;
                for b in bytes {
                    if b.is_ascii_graphic() && *b != b'"' && *b != b'\\' {
                        write!(f, "{}", *b as char)?;
                    } else {
                        write!(f, "\\{:02x}", b)?;
                    }
                }
                write!(f, "\"")
            }
            Value::Opt(v) => write!(f, "opt {}", v),
            Value::Vec(elems) => {
                write!(f, "vec {{")?;
                for e in elems {
                    write!(f, " {};", e)?;
                }
                write!(f, " }}")
            }
            Value::Record(fields) => {
                write!(f, "record {{")?;
                for field in fields {
                    write!(f, " {} = {};", field.label, field.value)?;
                }
                write!(f, " }}")
            }
            Value::Variant(field) => {
                if field.value == Value::Null {
                    write!(f, "variant {{ {} }}", field.label)
                } else {
                    write!(f, "variant {{ {} = {} }}", field.label, field.value)
                }
            }
            Value::Principal(p) => write!(f, "principal \"{}\"", p),
            Value::Service(p) => write!(f, "service \"{}\"", p),
            Value::Func(p, method) => {
                if is_plain_ident(method) {
                    write!(f, "func \"{}\".{}", p, method)
                } else {
                    write!(f, "func \"{}\".\"{}\"", p, method)
                }
            }
            Value::Reserved => write!(f, "reserved"),
        }
    }
}
