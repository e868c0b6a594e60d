//! Message decoding
//!
//! Decoding is driven by the receiver's expected types. The wire type
//! table says how to read the bytes; the expected types say what to make
//! of them. Where the two differ, the coercion rules apply: `nat` reads
//! as `int`, missing optional fields default to absent, and an
//! incompatible optional payload is consumed and dropped rather than
//! failing the whole message.

use weft_types::{Field, FuncMode, FuncType, Label, Principal, SubtypeChecker, Type, TypeEnv, Value, ValueField};

use crate::error::DecodeError;
use crate::leb128;
use crate::opcode;

/// Cursor over the raw message bytes. Every read knows its offset so
/// errors can point at the byte that broke.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(DecodeError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(DecodeError::Truncated(self.bytes.len()))?;
        let s = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(N)?);
        Ok(out)
    }

    fn uleb(&mut self) -> Result<u64, DecodeError> {
        leb128::read_uleb128(self.bytes, &mut self.pos)
    }

    fn sleb(&mut self) -> Result<i64, DecodeError> {
        leb128::read_sleb128(self.bytes, &mut self.pos)
    }

    fn len(&mut self) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let n = self.uleb()?;
        // A byte length cannot exceed the bytes that remain; this bounds
        // all preallocations against hostile counts.
        if n > (self.bytes.len() - self.pos) as u64 {
            return Err(DecodeError::Truncated(offset));
        }
        Ok(n as usize)
    }

    /// An element count in the value section. Elements may occupy zero
    /// bytes (`null`, `reserved`, empty records), so the count is not
    /// bounded by the remaining input; preallocation is, via
    /// [`remaining`](Self::remaining).
    fn count(&mut self) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let n = self.uleb()?;
        usize::try_from(n).map_err(|_| DecodeError::Leb128(offset))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn text(&mut self) -> Result<String, DecodeError> {
        let offset = self.pos;
        let len = self.len()?;
        let bytes = self.slice(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(offset))
    }
}

/// The name a table slot resolves under in the wire-side environment.
fn slot_name(index: u64) -> String {
    format!("@{}", index)
}

/// Parse the header and type table, yielding the wire-side environment
/// and the argument types announced by the sender.
fn parse_header(reader: &mut Reader<'_>) -> Result<(TypeEnv, Vec<Type>), DecodeError> {
    let magic = reader.array::<4>()?;
    if magic != crate::encode::MAGIC {
        return Err(DecodeError::BadMagic(magic));
    }
    let count = reader.len()? as u64;

    let type_ref = |reader: &mut Reader<'_>| -> Result<Type, DecodeError> {
        let offset = reader.pos;
        let code = reader.sleb()?;
        if code >= 0 {
            if (code as u64) < count {
                Ok(Type::Var(slot_name(code as u64)))
            } else {
                Err(DecodeError::IndexOutOfRange {
                    index: code,
                    offset,
                })
            }
        } else {
            opcode::primitive_from_opcode(code)
                .ok_or(DecodeError::UnknownOpcode { opcode: code, offset })
        }
    };

    let mut env = TypeEnv::new();
    for slot in 0..count {
        let offset = reader.pos;
        let head = reader.sleb()?;
        let ty = match head {
            opcode::OPT => Type::Opt(Box::new(type_ref(reader)?)),
            opcode::VEC => Type::Vec(Box::new(type_ref(reader)?)),
            opcode::RECORD | opcode::VARIANT => {
                let n = reader.len()?;
                let mut fields = Vec::with_capacity(n);
                let mut prev: Option<u64> = None;
                for _ in 0..n {
                    let label_offset = reader.pos;
                    let id = reader.uleb()?;
                    if id > u32::MAX as u64 || prev.is_some_and(|p| p >= id) {
                        return Err(DecodeError::UnorderedFields(label_offset));
                    }
                    prev = Some(id);
                    fields.push(Field {
                        label: Label::Id(id as u32),
                        ty: type_ref(reader)?,
                    });
                }
                if head == opcode::RECORD {
                    Type::Record(fields)
                } else {
                    Type::Variant(fields)
                }
            }
            opcode::FUNC => {
                let n_args = reader.len()?;
                let mut args = Vec::with_capacity(n_args);
                for _ in 0..n_args {
                    args.push(type_ref(reader)?);
                }
                let n_rets = reader.len()?;
                let mut rets = Vec::with_capacity(n_rets);
                for _ in 0..n_rets {
                    rets.push(type_ref(reader)?);
                }
                let n_modes = reader.len()?;
                let mut modes = Vec::with_capacity(n_modes);
                for _ in 0..n_modes {
                    let mode_offset = reader.pos;
                    modes.push(match reader.byte()? {
                        1 => FuncMode::Query,
                        2 => FuncMode::Oneway,
                        m => {
                            return Err(DecodeError::Malformed {
                                offset: mode_offset,
                                reason: format!("unknown function mode {}", m),
                            })
                        }
                    });
                }
                Type::Func(FuncType::new(args, rets, modes))
            }
            opcode::SERVICE => {
                let n = reader.len()?;
                let mut methods = Vec::with_capacity(n);
                let mut prev: Option<String> = None;
                for _ in 0..n {
                    let name_offset = reader.pos;
                    let name = reader.text()?;
                    if prev.as_deref().is_some_and(|p| p >= name.as_str()) {
                        return Err(DecodeError::UnorderedFields(name_offset));
                    }
                    prev = Some(name.clone());
                    methods.push((name, type_ref(reader)?));
                }
                Type::Service(methods)
            }
            _ => {
                return Err(DecodeError::Malformed {
                    offset,
                    reason: format!("opcode {} is not a constructed type", head),
                })
            }
        };
        // Slot names are fresh in an empty environment.
        env.insert(&slot_name(slot), ty)
            .map_err(DecodeError::Type)?;
    }

    let n_args = reader.len()?;
    let mut arg_types = Vec::with_capacity(n_args);
    for _ in 0..n_args {
        arg_types.push(type_ref(reader)?);
    }
    Ok((env, arg_types))
}

struct Decoder<'a> {
    reader: Reader<'a>,
    wire_env: TypeEnv,
    expect_env: &'a TypeEnv,
    /// Argument position, for error reports only.
    position: usize,
}

impl<'a> Decoder<'a> {
    fn mismatch(&self, wire: &Type, expected: &Type) -> DecodeError {
        DecodeError::Mismatch {
            position: self.position,
            wire: wire.to_string(),
            expected: expected.to_string(),
        }
    }

    fn is_wire_subtype(&self, wire: &Type, expected: &Type) -> Result<bool, DecodeError> {
        SubtypeChecker::with_envs(&self.wire_env, self.expect_env)
            .subtype(wire, expected)
            .map_err(DecodeError::Type)
    }

    fn read_principal(&mut self) -> Result<Principal, DecodeError> {
        let offset = self.reader.pos;
        match self.reader.byte()? {
            1 => {}
            flag => {
                return Err(DecodeError::Malformed {
                    offset,
                    reason: format!("unsupported reference flag {}", flag),
                })
            }
        }
        let offset = self.reader.pos;
        let len = self.reader.len()?;
        let bytes = self.reader.slice(len)?;
        Principal::from_slice(bytes).map_err(|e| DecodeError::Malformed {
            offset,
            reason: e.to_string(),
        })
    }

    /// Decode one value whose bytes follow `wire` and whose result must
    /// have type `expected`.
    fn value(&mut self, wire: &Type, expected: &Type) -> Result<Value, DecodeError> {
        let wire = self.wire_env.trans(wire).map_err(DecodeError::Type)?.clone();
        let expected = self
            .expect_env
            .trans(expected)
            .map_err(DecodeError::Type)?
            .clone();

        // Coercions that do not depend on the wire type's shape.
        match &expected {
            Type::Reserved => {
                self.skip(&wire)?;
                return Ok(Value::Reserved);
            }
            Type::Opt(inner) => return self.opt_value(&wire, inner),
            Type::Empty => return Err(self.mismatch(&wire, &expected)),
            _ => {}
        }

        let v = match (&wire, &expected) {
            (Type::Null, Type::Null) => Value::Null,
            (Type::Bool, Type::Bool) => {
                let offset = self.reader.pos;
                match self.reader.byte()? {
                    0 => Value::Bool(false),
                    1 => Value::Bool(true),
                    b => {
                        return Err(DecodeError::Malformed {
                            offset,
                            reason: format!("invalid boolean byte {}", b),
                        })
                    }
                }
            }
            (Type::Nat, Type::Nat) => {
                Value::Nat(leb128::read_big_uleb128(self.reader.bytes, &mut self.reader.pos)?)
            }
            (Type::Nat, Type::Int) => Value::Int(
                leb128::read_big_uleb128(self.reader.bytes, &mut self.reader.pos)?.into(),
            ),
            (Type::Int, Type::Int) => {
                Value::Int(leb128::read_big_sleb128(self.reader.bytes, &mut self.reader.pos)?)
            }
            (Type::Nat8, Type::Nat8) => Value::Nat8(self.reader.byte()?),
            (Type::Nat16, Type::Nat16) => Value::Nat16(u16::from_le_bytes(self.reader.array()?)),
            (Type::Nat32, Type::Nat32) => Value::Nat32(u32::from_le_bytes(self.reader.array()?)),
            (Type::Nat64, Type::Nat64) => Value::Nat64(u64::from_le_bytes(self.reader.array()?)),
            (Type::Int8, Type::Int8) => Value::Int8(i8::from_le_bytes(self.reader.array()?)),
            (Type::Int16, Type::Int16) => Value::Int16(i16::from_le_bytes(self.reader.array()?)),
            (Type::Int32, Type::Int32) => Value::Int32(i32::from_le_bytes(self.reader.array()?)),
            (Type::Int64, Type::Int64) => Value::Int64(i64::from_le_bytes(self.reader.array()?)),
            (Type::Float32, Type::Float32) => {
                Value::Float32(f32::from_le_bytes(self.reader.array()?))
            }
            (Type::Float64, Type::Float64) => {
                Value::Float64(f64::from_le_bytes(self.reader.array()?))
            }
            (Type::Text, Type::Text) => Value::Text(self.reader.text()?),
            (Type::Vec(w), Type::Blob) => {
                if *self.wire_env.trans(w).map_err(DecodeError::Type)? != Type::Nat8 {
                    return Err(self.mismatch(&wire, &expected));
                }
                let len = self.reader.len()?;
                Value::Blob(self.reader.slice(len)?.to_vec())
            }
            (Type::Vec(w), Type::Vec(e)) => {
                let w_elem = self.wire_env.trans(w).map_err(DecodeError::Type)?.clone();
                let e_elem = self.expect_env.trans(e).map_err(DecodeError::Type)?.clone();
                if w_elem == Type::Nat8 && e_elem == Type::Nat8 {
                    let len = self.reader.len()?;
                    Value::Blob(self.reader.slice(len)?.to_vec())
                } else {
                    let len = self.reader.count()?;
                    let mut elems = Vec::with_capacity(len.min(self.reader.remaining()));
                    for _ in 0..len {
                        elems.push(self.value(&w_elem, &e_elem)?);
                    }
                    Value::Vec(elems)
                }
            }
            (Type::Record(wfs), Type::Record(efs)) => self.record_value(wfs, efs)?,
            (Type::Variant(wfs), Type::Variant(efs)) => {
                let offset = self.reader.pos;
                let index = self.reader.uleb()? as usize;
                let wf = wfs.get(index).ok_or_else(|| DecodeError::Malformed {
                    offset,
                    reason: format!("variant index {} out of range", index),
                })?;
                let ef = Type::find_field(efs, wf.label.id())
                    .ok_or_else(|| self.mismatch(&wire, &expected))?;
                let payload = self.value(&wf.ty, &ef.ty)?;
                Value::variant(ef.label.clone(), payload)
            }
            (Type::Principal, Type::Principal) => Value::Principal(self.read_principal()?),
            (Type::Func(_), Type::Func(_)) => {
                if !self.is_wire_subtype(&wire, &expected)? {
                    return Err(self.mismatch(&wire, &expected));
                }
                let offset = self.reader.pos;
                match self.reader.byte()? {
                    1 => {}
                    flag => {
                        return Err(DecodeError::Malformed {
                            offset,
                            reason: format!("unsupported reference flag {}", flag),
                        })
                    }
                }
                let principal = self.read_principal()?;
                let method = self.reader.text()?;
                Value::Func(principal, method)
            }
            (Type::Service(_), Type::Service(_)) => {
                if !self.is_wire_subtype(&wire, &expected)? {
                    return Err(self.mismatch(&wire, &expected));
                }
                Value::Service(self.read_principal()?)
            }
            _ => return Err(self.mismatch(&wire, &expected)),
        };
        Ok(v)
    }

    /// The expected type is `opt inner`. This coercion never fails: an
    /// incompatible payload is consumed and comes back absent.
    fn opt_value(&mut self, wire: &Type, inner: &Type) -> Result<Value, DecodeError> {
        match wire {
            Type::Null | Type::Reserved => Ok(Value::None),
            Type::Opt(w_inner) => {
                let offset = self.reader.pos;
                match self.reader.byte()? {
                    0 => Ok(Value::None),
                    1 => {
                        if self.is_wire_subtype(w_inner, inner)?
                            && !matches!(self.expect_env.trans(inner)?, Type::Null | Type::Reserved | Type::Empty)
                        {
                            Ok(Value::Opt(Box::new(self.value(w_inner, inner)?)))
                        } else {
                            self.skip(w_inner)?;
                            Ok(Value::None)
                        }
                    }
                    b => Err(DecodeError::Malformed {
                        offset,
                        reason: format!("invalid option flag {}", b),
                    }),
                }
            }
            w => {
                // Non-optional wire value against an optional slot.
                if self.is_wire_subtype(w, inner)?
                    && !matches!(self.expect_env.trans(inner)?, Type::Null | Type::Reserved | Type::Empty)
                {
                    Ok(Value::Opt(Box::new(self.value(w, inner)?)))
                } else {
                    self.skip(w)?;
                    Ok(Value::None)
                }
            }
        }
    }

    fn record_value(&mut self, wfs: &[Field], efs: &[Field]) -> Result<Value, DecodeError> {
        let mut out = Vec::with_capacity(efs.len());
        let mut j = 0;
        for wf in wfs {
            // Expected fields the wire skipped over must be defaultable.
            while j < efs.len() && efs[j].label.id() < wf.label.id() {
                out.push(ValueField {
                    label: efs[j].label.clone(),
                    value: self.default_value(&efs[j])?,
                });
                j += 1;
            }
            if j < efs.len() && efs[j].label.id() == wf.label.id() {
                let value = self.value(&wf.ty, &efs[j].ty)?;
                out.push(ValueField {
                    label: efs[j].label.clone(),
                    value,
                });
                j += 1;
            } else {
                // Field the receiver does not know about; consume it.
                self.skip(&wf.ty)?;
            }
        }
        while j < efs.len() {
            out.push(ValueField {
                label: efs[j].label.clone(),
                value: self.default_value(&efs[j])?,
            });
            j += 1;
        }
        Ok(Value::Record(out))
    }

    fn default_value(&self, field: &Field) -> Result<Value, DecodeError> {
        match self.expect_env.trans(&field.ty).map_err(DecodeError::Type)? {
            Type::Opt(_) => Ok(Value::None),
            Type::Null => Ok(Value::Null),
            Type::Reserved => Ok(Value::Reserved),
            ty => Err(DecodeError::Mismatch {
                position: self.position,
                wire: format!("record without field {}", field.label),
                expected: ty.to_string(),
            }),
        }
    }

    /// Walk past one value of a wire type without building anything.
    fn skip(&mut self, wire: &Type) -> Result<(), DecodeError> {
        let wire = self.wire_env.trans(wire).map_err(DecodeError::Type)?.clone();
        match &wire {
            Type::Null | Type::Reserved => {}
            Type::Bool | Type::Nat8 | Type::Int8 => {
                self.reader.byte()?;
            }
            Type::Nat16 | Type::Int16 => {
                self.reader.slice(2)?;
            }
            Type::Nat32 | Type::Int32 | Type::Float32 => {
                self.reader.slice(4)?;
            }
            Type::Nat64 | Type::Int64 | Type::Float64 => {
                self.reader.slice(8)?;
            }
            Type::Nat => {
                leb128::read_big_uleb128(self.reader.bytes, &mut self.reader.pos)?;
            }
            Type::Int => {
                leb128::read_big_sleb128(self.reader.bytes, &mut self.reader.pos)?;
            }
            Type::Text | Type::Blob => {
                let len = self.reader.len()?;
                self.reader.slice(len)?;
            }
            Type::Opt(inner) => {
                let offset = self.reader.pos;
                match self.reader.byte()? {
                    0 => {}
                    1 => self.skip(inner)?,
                    b => {
                        return Err(DecodeError::Malformed {
                            offset,
                            reason: format!("invalid option flag {}", b),
                        })
                    }
                }
            }
            Type::Vec(inner) => {
                let len = self.reader.count()?;
                for _ in 0..len {
                    self.skip(inner)?;
                }
            }
            Type::Record(fields) => {
                for field in fields {
                    self.skip(&field.ty)?;
                }
            }
            Type::Variant(fields) => {
                let offset = self.reader.pos;
                let index = self.reader.uleb()? as usize;
                let field = fields.get(index).ok_or_else(|| DecodeError::Malformed {
                    offset,
                    reason: format!("variant index {} out of range", index),
                })?;
                self.skip(&field.ty)?;
            }
            Type::Principal | Type::Service(_) => {
                self.read_principal()?;
            }
            Type::Func(_) => {
                let offset = self.reader.pos;
                match self.reader.byte()? {
                    1 => {}
                    flag => {
                        return Err(DecodeError::Malformed {
                            offset,
                            reason: format!("unsupported reference flag {}", flag),
                        })
                    }
                }
                self.read_principal()?;
                let len = self.reader.len()?;
                self.reader.slice(len)?;
            }
            Type::Empty | Type::Var(_) => {
                return Err(DecodeError::Malformed {
                    offset: self.reader.pos,
                    reason: format!("cannot skip a value of type {}", wire),
                })
            }
        }
        Ok(())
    }
}

/// Decode a message against the receiver's expected argument types.
///
/// Extra wire arguments are consumed and dropped; missing trailing
/// arguments are filled in when the expected type is defaultable.
pub fn decode(env: &TypeEnv, bytes: &[u8], expected: &[Type]) -> Result<Vec<Value>, DecodeError> {
    let mut reader = Reader::new(bytes);
    let (wire_env, wire_args) = parse_header(&mut reader)?;
    let mut decoder = Decoder {
        reader,
        wire_env,
        expect_env: env,
        position: 0,
    };

    let mut out = Vec::with_capacity(expected.len());
    for (position, ty) in expected.iter().enumerate() {
        decoder.position = position;
        match wire_args.get(position) {
            Some(wire) => out.push(decoder.value(wire, ty)?),
            None => {
                let v = match env.trans(ty).map_err(DecodeError::Type)? {
                    Type::Opt(_) => Value::None,
                    Type::Reserved => Value::Reserved,
                    Type::Null => Value::Null,
                    t => {
                        return Err(DecodeError::MissingArgument {
                            position,
                            expected: t.to_string(),
                        })
                    }
                };
                out.push(v);
            }
        }
    }
    for wire in wire_args.iter().skip(expected.len()) {
        decoder.skip(wire)?;
    }
    if decoder.reader.pos != bytes.len() {
        return Err(DecodeError::TrailingBytes(decoder.reader.pos));
    }
    Ok(out)
}

/// Decode a message with no expectations, yielding values shaped exactly
/// as the sender described them. Field labels come back numeric.
pub fn decode_untyped(bytes: &[u8]) -> Result<Vec<Value>, DecodeError> {
    let mut reader = Reader::new(bytes);
    let (wire_env, wire_args) = parse_header(&mut reader)?;
    let expect_env = wire_env.clone();
    let mut decoder = Decoder {
        reader,
        wire_env,
        expect_env: &expect_env,
        position: 0,
    };
    let mut out = Vec::with_capacity(wire_args.len());
    for (position, wire) in wire_args.iter().enumerate() {
        decoder.position = position;
        out.push(decoder.value(wire, wire)?);
    }
    if decoder.reader.pos != bytes.len() {
        return Err(DecodeError::TrailingBytes(decoder.reader.pos));
    }
    Ok(out)
}
