//! Core type definitions for the Weft type system

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Deterministic 32-bit hash mapping a field or method name to its wire label.
///
/// The binary format carries only the numeric label, so this function is the
/// single source of truth for how textual names appear on the wire. Two
/// different spellings that hash to the same value cannot coexist in one
/// record or variant.
#[inline]
pub fn label_hash(name: &str) -> u32 {
    let mut h: u32 = 0;
    for b in name.as_bytes() {
        h = h.wrapping_mul(223).wrapping_add(*b as u32);
    }
    h
}

/// A record or variant field label.
///
/// Labels written as names and labels written as raw numbers occupy the same
/// 32-bit namespace: `Named(s)` is identical to `Id(label_hash(s))` for
/// equality, ordering and hashing. The name is kept only for display.
#[derive(Debug, Clone, Eq)]
pub enum Label {
    /// A label that still carries its original spelling.
    Named(String),
    /// A bare numeric label, either written explicitly or recovered from the
    /// wire (which never carries names).
    Id(u32),
}

impl Label {
    /// The numeric value this label has on the wire.
    pub fn id(&self) -> u32 {
        match self {
            Label::Named(name) => label_hash(name),
            Label::Id(id) => *id,
        }
    }

    /// The original spelling, when one is known.
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Named(name) => Some(name),
            Label::Id(_) => None,
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.id());
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Named(name) => write!(f, "{}", name),
            Label::Id(id) => write!(f, "{}", id),
        }
    }
}

/// A labelled field of a record or variant type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Field label
    pub label: Label,
    /// Field type
    pub ty: Type,
}

/// Annotations on a function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FuncMode {
    /// Read-only call, no state changes observable.
    Query,
    /// Fire-and-forget call with no results.
    Oneway,
}

impl fmt::Display for FuncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuncMode::Query => write!(f, "query"),
            FuncMode::Oneway => write!(f, "oneway"),
        }
    }
}

/// A function type: argument sequence, result sequence and annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncType {
    /// Argument types, in call order
    pub args: Vec<Type>,
    /// Result types, in return order
    pub rets: Vec<Type>,
    /// Annotations, kept sorted
    pub modes: Vec<FuncMode>,
}

impl FuncType {
    /// Create a function type, canonicalizing the annotation list.
    pub fn new(args: Vec<Type>, rets: Vec<Type>, mut modes: Vec<FuncMode>) -> Self {
        modes.sort_unstable();
        modes.dedup();
        FuncType { args, rets, modes }
    }

    /// Whether this function is annotated as a query.
    pub fn is_query(&self) -> bool {
        self.modes.contains(&FuncMode::Query)
    }
}

/// The core type representation of the Weft IDL.
///
/// Named types are represented as `Var` references resolved through a
/// [`TypeEnv`](crate::TypeEnv), so recursive definitions form finite graphs
/// rather than infinite trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The unit type with the single value `null`
    Null,
    /// Booleans
    Bool,
    /// Unbounded natural numbers
    Nat,
    /// Unbounded integers
    Int,
    /// Fixed-width naturals
    Nat8,
    /// 16-bit natural
    Nat16,
    /// 32-bit natural
    Nat32,
    /// 64-bit natural
    Nat64,
    /// 8-bit integer
    Int8,
    /// 16-bit integer
    Int16,
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// IEEE 754 single precision
    Float32,
    /// IEEE 754 double precision
    Float64,
    /// Unicode text
    Text,
    /// Raw byte sequence; interchangeable with `vec nat8`
    Blob,
    /// Accepts and discards any value
    Reserved,
    /// The uninhabited type
    Empty,
    /// An opaque identifier
    Principal,
    /// Optional wrapper
    Opt(Box<Type>),
    /// Homogeneous sequence
    Vec(Box<Type>),
    /// All of the listed fields, sorted ascending by label
    Record(Vec<Field>),
    /// Exactly one of the listed tags, sorted ascending by label
    Variant(Vec<Field>),
    /// Function reference type
    Func(FuncType),
    /// Service reference type: method name to function type, sorted by name.
    /// Method types may be `Var` references that resolve to functions.
    Service(Vec<(String, Type)>),
    /// Reference to a named type in the environment
    Var(String),
}

impl Type {
    /// Build a record type, canonicalizing field order ascending by label.
    pub fn record(mut fields: Vec<Field>) -> Type {
        fields.sort_by_key(|f| f.label.id());
        Type::Record(fields)
    }

    /// Build a variant type, canonicalizing tag order ascending by label.
    pub fn variant(mut fields: Vec<Field>) -> Type {
        fields.sort_by_key(|f| f.label.id());
        Type::Variant(fields)
    }

    /// Build a service type, canonicalizing method order by name.
    pub fn service(mut methods: Vec<(String, Type)>) -> Type {
        methods.sort_by(|a, b| a.0.cmp(&b.0));
        Type::Service(methods)
    }

    /// Whether this type has a fixed inline opcode on the wire (no type
    /// table entry).
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Type::Opt(_)
                | Type::Vec(_)
                | Type::Record(_)
                | Type::Variant(_)
                | Type::Func(_)
                | Type::Service(_)
                | Type::Blob
                | Type::Var(_)
        )
    }

    /// Binary search a sorted field list by numeric label.
    pub fn find_field(fields: &[Field], id: u32) -> Option<&Field> {
        fields
            .binary_search_by_key(&id, |f| f.label.id())
            .ok()
            .map(|i| &fields[i])
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[Field], variant: bool) -> fmt::Result {
    write!(f, " {{")?;
    for field in fields {
        if variant && field.ty == Type::Null {
            write!(f, " {};", field.label)?;
        } else {
            write!(f, " {} : {};", field.label, field.ty)?;
        }
    }
    write!(f, " }}")
}

fn write_type_seq(f: &mut fmt::Formatter<'_>, types: &[Type]) -> fmt::Result {
    write!(f, "(")?;
    for (i, t) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", t)?;
    }
    write!(f, ")")
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_seq(f, &self.args)?;
        write!(f, " -> ")?;
        write_type_seq(f, &self.rets)?;
        for mode in &self.modes {
            write!(f, " {}", mode)?;
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Nat => write!(f, "nat"),
            Type::Int => write!(f, "int"),
            Type::Nat8 => write!(f, "nat8"),
            Type::Nat16 => write!(f, "nat16"),
            Type::Nat32 => write!(f, "nat32"),
            Type::Nat64 => write!(f, "nat64"),
            Type::Int8 => write!(f, "int8"),
            Type::Int16 => write!(f, "int16"),
            Type::Int32 => write!(f, "int32"),
            Type::Int64 => write!(f, "int64"),
            Type::Float32 => write!(f, "float32"),
            Type::Float64 => write!(f, "float64"),
            Type::Text => write!(f, "text"),
            Type::Blob => write!(f, "blob"),
            Type::Reserved => write!(f, "reserved"),
            Type::Empty => write!(f, "empty"),
            Type::Principal => write!(f, "principal"),
            Type::Opt(t) => write!(f, "opt {}", t),
            Type::Vec(t) => write!(f, "vec {}", t),
            Type::Record(fields) => {
                write!(f, "record")?;
                write_fields(f, fields, false)
            }
            Type::Variant(fields) => {
                write!(f, "variant")?;
                write_fields(f, fields, true)
            }
            Type::Func(func) => write!(f, "func {}", func),
            Type::Service(methods) => {
                write!(f, "service {{")?;
                for (name, ty) in methods {
                    match ty {
                        // Skip the "func" keyword in method position.
                        Type::Func(func) => write!(f, " {} : {};", name, func)?,
                        other => write!(f, " {} : {};", name, other)?,
                    }
                }
                write!(f, " }}")
            }
            Type::Var(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_hash_known_values() {
        assert_eq!(label_hash(""), 0);
        assert_eq!(label_hash("a"), 97);
        assert_eq!(label_hash("ok"), 24_860);
        assert_eq!(label_hash("name"), 1_224_700_491);
    }

    #[test]
    fn test_label_equality_ignores_spelling() {
        let named = Label::Named("name".to_string());
        let id = Label::Id(1_224_700_491);
        assert_eq!(named, id);
        assert_eq!(named.id(), id.id());
    }

    #[test]
    fn test_record_canonical_order() {
        let t = Type::record(vec![
            Field {
                label: Label::Named("b".to_string()),
                ty: Type::Nat,
            },
            Field {
                label: Label::Named("a".to_string()),
                ty: Type::Text,
            },
        ]);
        let u = Type::record(vec![
            Field {
                label: Label::Named("a".to_string()),
                ty: Type::Text,
            },
            Field {
                label: Label::Named("b".to_string()),
                ty: Type::Nat,
            },
        ]);
        assert_eq!(t, u);
    }

    #[test]
    fn test_type_display() {
        let t = Type::Opt(Box::new(Type::Vec(Box::new(Type::Nat8))));
        assert_eq!(t.to_string(), "opt vec nat8");

        let r = Type::record(vec![Field {
            label: Label::Named("head".to_string()),
            ty: Type::Int,
        }]);
        assert_eq!(r.to_string(), "record { head : int; }");
    }

    #[test]
    fn test_numeric_label_display() {
        let r = Type::record(vec![Field {
            label: Label::Id(42),
            ty: Type::Text,
        }]);
        assert_eq!(r.to_string(), "record { 42 : text; }");
    }
}
