//! Wire opcodes
//!
//! Every type in the table section is written as a signed LEB128 opcode.
//! Negative values are primitives or constructor heads; non-negative
//! values index into the type table.

use weft_types::Type;

/// `null`
pub const NULL: i64 = -1;
/// `bool`
pub const BOOL: i64 = -2;
/// `nat`
pub const NAT: i64 = -3;
/// `int`
pub const INT: i64 = -4;
/// `nat8`
pub const NAT8: i64 = -5;
/// `nat16`
pub const NAT16: i64 = -6;
/// `nat32`
pub const NAT32: i64 = -7;
/// `nat64`
pub const NAT64: i64 = -8;
/// `int8`
pub const INT8: i64 = -9;
/// `int16`
pub const INT16: i64 = -10;
/// `int32`
pub const INT32: i64 = -11;
/// `int64`
pub const INT64: i64 = -12;
/// `float32`
pub const FLOAT32: i64 = -13;
/// `float64`
pub const FLOAT64: i64 = -14;
/// `text`
pub const TEXT: i64 = -15;
/// `reserved`
pub const RESERVED: i64 = -16;
/// `empty`
pub const EMPTY: i64 = -17;
/// `opt` constructor head
pub const OPT: i64 = -18;
/// `vec` constructor head
pub const VEC: i64 = -19;
/// `record` constructor head
pub const RECORD: i64 = -20;
/// `variant` constructor head
pub const VARIANT: i64 = -21;
/// `func` constructor head
pub const FUNC: i64 = -22;
/// `service` constructor head
pub const SERVICE: i64 = -23;
/// `principal`
pub const PRINCIPAL: i64 = -24;

/// The opcode of a primitive type, or `None` for constructed types.
pub fn primitive_opcode(ty: &Type) -> Option<i64> {
    let op = match ty {
        Type::Null => NULL,
        Type::Bool => BOOL,
        Type::Nat => NAT,
        Type::Int => INT,
        Type::Nat8 => NAT8,
        Type::Nat16 => NAT16,
        Type::Nat32 => NAT32,
        Type::Nat64 => NAT64,
        Type::Int8 => INT8,
        Type::Int16 => INT16,
        Type::Int32 => INT32,
        Type::Int64 => INT64,
        Type::Float32 => FLOAT32,
        Type::Float64 => FLOAT64,
        Type::Text => TEXT,
        Type::Reserved => RESERVED,
        Type::Empty => EMPTY,
        Type::Principal => PRINCIPAL,
        _ => return None,
    };
    Some(op)
}

/// The primitive type a negative opcode denotes, if it is one.
pub fn primitive_from_opcode(op: i64) -> Option<Type> {
    let ty = match op {
        NULL => Type::Null,
        BOOL => Type::Bool,
        NAT => Type::Nat,
        INT => Type::Int,
        NAT8 => Type::Nat8,
        NAT16 => Type::Nat16,
        NAT32 => Type::Nat32,
        NAT64 => Type::Nat64,
        INT8 => Type::Int8,
        INT16 => Type::Int16,
        INT32 => Type::Int32,
        INT64 => Type::Int64,
        FLOAT32 => Type::Float32,
        FLOAT64 => Type::Float64,
        TEXT => Type::Text,
        RESERVED => Type::Reserved,
        EMPTY => Type::Empty,
        PRINCIPAL => Type::Principal,
        _ => return None,
    };
    Some(ty)
}
