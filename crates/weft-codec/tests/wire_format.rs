//! Byte-exact wire format tests
//!
//! These pin the frame layout down to individual bytes so the format
//! cannot drift silently.

use num_bigint::BigInt;
use weft_codec::{decode, decode_untyped, encode, DecodeError};
use weft_types::{Field, Label, Type, TypeEnv, Value, ValueField};

fn enc(ty: Type, value: Value) -> Vec<u8> {
    let env = TypeEnv::new();
    encode(&env, &[ty], &[value]).expect("encode failed")
}

#[test]
fn test_empty_argument_sequence() {
    let env = TypeEnv::new();
    let bytes = encode(&env, &[], &[]).unwrap();
    assert_eq!(bytes, b"DIDL\x00\x00");
    assert_eq!(decode(&env, &bytes, &[]).unwrap(), vec![]);
}

#[test]
fn test_nat_42() {
    assert_eq!(
        enc(Type::Nat, Value::Int(BigInt::from(42))),
        b"DIDL\x00\x01\x7d\x2a"
    );
}

#[test]
fn test_int_negative_42() {
    assert_eq!(
        enc(Type::Int, Value::Int(BigInt::from(-42))),
        b"DIDL\x00\x01\x7c\x56"
    );
}

#[test]
fn test_opt_bool_true() {
    assert_eq!(
        enc(
            Type::Opt(Box::new(Type::Bool)),
            Value::Opt(Box::new(Value::Bool(true)))
        ),
        b"DIDL\x01\x6e\x7e\x01\x00\x01\x01"
    );
}

#[test]
fn test_text() {
    assert_eq!(
        enc(Type::Text, Value::Text("hi".to_string())),
        b"DIDL\x00\x01\x71\x02hi"
    );
}

#[test]
fn test_record_single_field() {
    let ty = Type::record(vec![Field {
        label: Label::Named("a".to_string()),
        ty: Type::Bool,
    }]);
    let value = Value::record(vec![ValueField {
        label: Label::Named("a".to_string()),
        value: Value::Bool(true),
    }]);
    // Label "a" hashes to 97 = 0x61.
    assert_eq!(enc(ty, value), b"DIDL\x01\x6c\x01\x61\x7e\x01\x00\x01");
}

#[test]
fn test_blob_encodes_as_vec_nat8() {
    let blob = enc(Type::Blob, Value::Blob(vec![0xde, 0xad]));
    let vec8 = enc(
        Type::Vec(Box::new(Type::Nat8)),
        Value::Blob(vec![0xde, 0xad]),
    );
    assert_eq!(blob, vec8);
    assert_eq!(blob, b"DIDL\x01\x6d\x7b\x01\x00\x02\xde\xad");
}

#[test]
fn test_megabyte_payload_framing_overhead() {
    // A vector of 125,000 nat64 values is one megabyte of payload. The
    // self-describing frame adds exactly twelve bytes: four of magic,
    // three of type table, two of argument signature and three for the
    // vector length.
    let env = TypeEnv::new();
    let ty = Type::Vec(Box::new(Type::Nat64));
    let value = Value::Vec((0..125_000u64).map(Value::Nat64).collect());
    let bytes = encode(&env, &[ty.clone()], &[value]).unwrap();
    assert_eq!(bytes.len(), 1_000_012);

    let decoded = decode(&env, &bytes, &[ty]).unwrap();
    match &decoded[0] {
        Value::Vec(elems) => {
            assert_eq!(elems.len(), 125_000);
            assert_eq!(elems[0], Value::Nat64(0));
            assert_eq!(elems[124_999], Value::Nat64(124_999));
        }
        other => panic!("expected vec, got {}", other),
    }
}

#[test]
fn test_bad_magic_rejected() {
    let env = TypeEnv::new();
    assert!(matches!(
        decode(&env, b"DIDX\x00\x00", &[]),
        Err(DecodeError::BadMagic(_))
    ));
}

#[test]
fn test_truncated_rejected() {
    let env = TypeEnv::new();
    let bytes = enc(Type::Text, Value::Text("hello".to_string()));
    assert!(matches!(
        decode(&env, &bytes[..bytes.len() - 1], &[Type::Text]),
        Err(DecodeError::Truncated(_))
    ));
}

#[test]
fn test_trailing_bytes_rejected() {
    let env = TypeEnv::new();
    let mut bytes = enc(Type::Bool, Value::Bool(false));
    bytes.push(0xff);
    assert!(matches!(
        decode(&env, &bytes, &[Type::Bool]),
        Err(DecodeError::TrailingBytes(_))
    ));
}

#[test]
fn test_out_of_range_table_index_rejected() {
    // Table is empty but the signature references slot 0.
    let env = TypeEnv::new();
    assert!(matches!(
        decode(&env, b"DIDL\x00\x01\x00", &[Type::Null]),
        Err(DecodeError::IndexOutOfRange { index: 0, .. })
    ));
}

#[test]
fn test_unordered_record_labels_rejected() {
    // record { 1 : null; 0 : null } in the table, labels descending.
    let bytes = b"DIDL\x01\x6c\x02\x01\x7f\x00\x7f\x01\x00";
    assert!(matches!(
        decode_untyped(bytes),
        Err(DecodeError::UnorderedFields(_))
    ));
}

#[test]
fn test_untyped_decode_sees_numeric_labels() {
    let ty = Type::record(vec![Field {
        label: Label::Named("name".to_string()),
        ty: Type::Text,
    }]);
    let value = Value::record(vec![ValueField {
        label: Label::Named("name".to_string()),
        value: Value::Text("weft".to_string()),
    }]);
    let bytes = enc(ty, value);
    let values = decode_untyped(&bytes).unwrap();
    // The hash of "name"; the spelling never crosses the wire.
    assert_eq!(values[0].to_string(), "record { 1224700491 = \"weft\"; }");
}
