//! Message encoding
//!
//! A message is a self-describing frame: the magic header, a type table
//! describing every constructed type in use, the argument type signature,
//! and the flat value section. Layout:
//!
//! ```text
//! "DIDL"  table_count  table_entry*  arg_count  arg_typeref*  value*
//! ```
//!
//! Counts and lengths are unsigned LEB128; type references are signed
//! LEB128, negative for primitives and non-negative for table indices.

use rustc_hash::FxHashMap;
use weft_types::{FuncMode, Type, TypeEnv, Value};

use crate::error::EncodeError;
use crate::leb128::{write_big_sleb128, write_big_uleb128, write_sleb128, write_uleb128};
use crate::opcode;

/// Magic header of every message.
pub const MAGIC: [u8; 4] = *b"DIDL";

/// Builder for the wire type table.
///
/// Constructed types get one table slot each, deduplicated structurally.
/// A named type claims its slot before its body is built, so recursive
/// references land on the slot being filled.
struct TypeTable<'a> {
    env: &'a TypeEnv,
    entries: Vec<Vec<u8>>,
    indices: FxHashMap<Type, i64>,
}

impl<'a> TypeTable<'a> {
    fn new(env: &'a TypeEnv) -> Self {
        TypeTable {
            env,
            entries: Vec::new(),
            indices: FxHashMap::default(),
        }
    }

    /// The signed reference for a type: a primitive opcode or a table
    /// index, building the table entry on first sight.
    fn reference(&mut self, ty: &Type) -> Result<i64, EncodeError> {
        if let Some(op) = opcode::primitive_opcode(ty) {
            return Ok(op);
        }
        if *ty == Type::Blob {
            return self.reference(&Type::Vec(Box::new(Type::Nat8)));
        }
        if let Some(&index) = self.indices.get(ty) {
            return Ok(index);
        }
        let body = match ty {
            Type::Var(_) => {
                let resolved = self.env.trans(ty)?.clone();
                if let Some(op) = opcode::primitive_opcode(&resolved) {
                    return Ok(op);
                }
                if resolved == Type::Blob {
                    return self.reference(&Type::Vec(Box::new(Type::Nat8)));
                }
                // Claim the slot first; the body may refer back to it.
                self.claim(ty.clone());
                self.build_entry(&resolved)?
            }
            _ => {
                self.claim(ty.clone());
                self.build_entry(ty)?
            }
        };
        let index = self.indices[ty];
        self.entries[index as usize] = body;
        Ok(index)
    }

    fn claim(&mut self, ty: Type) {
        let index = self.entries.len() as i64;
        self.indices.insert(ty, index);
        self.entries.push(Vec::new());
    }

    fn build_entry(&mut self, ty: &Type) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        match ty {
            Type::Opt(inner) => {
                write_sleb128(&mut buf, opcode::OPT);
                let r = self.reference(inner)?;
                write_sleb128(&mut buf, r);
            }
            Type::Vec(inner) => {
                write_sleb128(&mut buf, opcode::VEC);
                let r = self.reference(inner)?;
                write_sleb128(&mut buf, r);
            }
            Type::Record(fields) | Type::Variant(fields) => {
                let head = if matches!(ty, Type::Record(_)) {
                    opcode::RECORD
                } else {
                    opcode::VARIANT
                };
                write_sleb128(&mut buf, head);
                write_uleb128(&mut buf, fields.len() as u64);
                for field in fields {
                    write_uleb128(&mut buf, field.label.id() as u64);
                    let r = self.reference(&field.ty)?;
                    write_sleb128(&mut buf, r);
                }
            }
            Type::Func(f) => {
                write_sleb128(&mut buf, opcode::FUNC);
                write_uleb128(&mut buf, f.args.len() as u64);
                for arg in &f.args {
                    let r = self.reference(arg)?;
                    write_sleb128(&mut buf, r);
                }
                write_uleb128(&mut buf, f.rets.len() as u64);
                for ret in &f.rets {
                    let r = self.reference(ret)?;
                    write_sleb128(&mut buf, r);
                }
                write_uleb128(&mut buf, f.modes.len() as u64);
                for mode in &f.modes {
                    buf.push(match mode {
                        FuncMode::Query => 1,
                        FuncMode::Oneway => 2,
                    });
                }
            }
            Type::Service(methods) => {
                write_sleb128(&mut buf, opcode::SERVICE);
                write_uleb128(&mut buf, methods.len() as u64);
                for (name, mty) in methods {
                    write_uleb128(&mut buf, name.len() as u64);
                    buf.extend_from_slice(name.as_bytes());
                    let r = self.reference(mty)?;
                    write_sleb128(&mut buf, r);
                }
            }
            // Primitives, blob and vars never reach here.
            _ => unreachable!("constructed types only"),
        }
        Ok(buf)
    }
}

/// Encode a typed argument sequence into a self-describing message.
///
/// Each value is first annotated at its declared type, so parse output
/// (untyped literals, unwrapped optionals) is accepted directly.
pub fn encode(env: &TypeEnv, types: &[Type], values: &[Value]) -> Result<Vec<u8>, EncodeError> {
    if types.len() != values.len() {
        return Err(EncodeError::Arity {
            values: values.len(),
            types: types.len(),
        });
    }
    let mut table = TypeTable::new(env);
    let mut refs = Vec::with_capacity(types.len());
    for ty in types {
        refs.push(table.reference(ty)?);
    }

    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    write_uleb128(&mut out, table.entries.len() as u64);
    for entry in &table.entries {
        out.extend_from_slice(entry);
    }
    write_uleb128(&mut out, refs.len() as u64);
    for r in refs {
        write_sleb128(&mut out, r);
    }
    for (ty, value) in types.iter().zip(values) {
        let value = value.annotate(env, ty)?;
        encode_value(env, &mut out, ty, &value)?;
    }
    Ok(out)
}

fn mismatch(value: &Value, ty: &Type) -> EncodeError {
    EncodeError::Mismatch {
        value: value.to_string(),
        ty: ty.to_string(),
    }
}

fn encode_value(
    env: &TypeEnv,
    buf: &mut Vec<u8>,
    ty: &Type,
    value: &Value,
) -> Result<(), EncodeError> {
    let ty = env.trans(ty)?;
    match (ty, value) {
        (Type::Null, Value::Null) | (Type::Reserved, _) => {}
        (Type::Bool, Value::Bool(b)) => buf.push(*b as u8),
        (Type::Nat, Value::Nat(n)) => write_big_uleb128(buf, n),
        (Type::Int, Value::Int(i)) => write_big_sleb128(buf, i),
        (Type::Nat8, Value::Nat8(n)) => buf.push(*n),
        (Type::Nat16, Value::Nat16(n)) => buf.extend_from_slice(&n.to_le_bytes()),
        (Type::Nat32, Value::Nat32(n)) => buf.extend_from_slice(&n.to_le_bytes()),
        (Type::Nat64, Value::Nat64(n)) => buf.extend_from_slice(&n.to_le_bytes()),
        (Type::Int8, Value::Int8(n)) => buf.extend_from_slice(&n.to_le_bytes()),
        (Type::Int16, Value::Int16(n)) => buf.extend_from_slice(&n.to_le_bytes()),
        (Type::Int32, Value::Int32(n)) => buf.extend_from_slice(&n.to_le_bytes()),
        (Type::Int64, Value::Int64(n)) => buf.extend_from_slice(&n.to_le_bytes()),
        (Type::Float32, Value::Float32(f)) => buf.extend_from_slice(&f.to_le_bytes()),
        (Type::Float64, Value::Float64(f)) => buf.extend_from_slice(&f.to_le_bytes()),
        (Type::Text, Value::Text(s)) => {
            write_uleb128(buf, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        (Type::Blob, Value::Blob(b)) => {
            write_uleb128(buf, b.len() as u64);
            buf.extend_from_slice(b);
        }
        (Type::Opt(_), Value::None) => buf.push(0),
        (Type::Opt(inner), Value::Opt(v)) => {
            buf.push(1);
            encode_value(env, buf, inner, v)?;
        }
        (Type::Vec(inner), Value::Vec(elems)) => {
            write_uleb128(buf, elems.len() as u64);
            for e in elems {
                encode_value(env, buf, inner, e)?;
            }
        }
        (Type::Vec(inner), Value::Blob(b)) if *env.trans(inner)? == Type::Nat8 => {
            write_uleb128(buf, b.len() as u64);
            buf.extend_from_slice(b);
        }
        (Type::Record(tfs), Value::Record(vfs)) => {
            // Annotation has aligned the value fields with the type.
            if tfs.len() != vfs.len() {
                return Err(mismatch(value, ty));
            }
            for (tf, vf) in tfs.iter().zip(vfs) {
                if tf.label.id() != vf.label.id() {
                    return Err(mismatch(value, ty));
                }
                encode_value(env, buf, &tf.ty, &vf.value)?;
            }
        }
        (Type::Variant(tfs), Value::Variant(vf)) => {
            let index = tfs
                .iter()
                .position(|tf| tf.label.id() == vf.label.id())
                .ok_or_else(|| mismatch(value, ty))?;
            write_uleb128(buf, index as u64);
            encode_value(env, buf, &tfs[index].ty, &vf.value)?;
        }
        (Type::Principal, Value::Principal(p)) => {
            buf.push(1);
            write_uleb128(buf, p.as_slice().len() as u64);
            buf.extend_from_slice(p.as_slice());
        }
        (Type::Service(_), Value::Service(p)) => {
            buf.push(1);
            write_uleb128(buf, p.as_slice().len() as u64);
            buf.extend_from_slice(p.as_slice());
        }
        (Type::Func(_), Value::Func(p, method)) => {
            buf.push(1);
            buf.push(1);
            write_uleb128(buf, p.as_slice().len() as u64);
            buf.extend_from_slice(p.as_slice());
            write_uleb128(buf, method.len() as u64);
            buf.extend_from_slice(method.as_bytes());
        }
        _ => return Err(mismatch(value, ty)),
    }
    Ok(())
}
