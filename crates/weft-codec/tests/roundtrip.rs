//! Round trips and cross-version decoding
//!
//! The interesting half of the codec is not encode-then-decode at one
//! type, but decoding at a *different* type the sender's type relates to
//! by subtyping. These tests exercise the coercions one by one.

use num_bigint::{BigInt, BigUint};
use weft_codec::{decode, encode, DecodeError};
use weft_types::{Field, Label, Principal, Type, TypeEnv, Value, ValueField};

fn field(name: &str, ty: Type) -> Field {
    Field {
        label: Label::Named(name.to_string()),
        ty,
    }
}

fn vfield(name: &str, value: Value) -> ValueField {
    ValueField {
        label: Label::Named(name.to_string()),
        value,
    }
}

#[test]
fn test_nested_value_roundtrip() {
    let env = TypeEnv::new();
    let ty = Type::record(vec![
        field("id", Type::Nat),
        field("name", Type::Text),
        field("tags", Type::Vec(Box::new(Type::Text))),
        field(
            "status",
            Type::variant(vec![field("ok", Type::Null), field("err", Type::Text)]),
        ),
        field("owner", Type::Opt(Box::new(Type::Principal))),
    ]);
    let value = Value::record(vec![
        vfield("id", Value::Nat(BigUint::from(7u8))),
        vfield("name", Value::Text("loom".to_string())),
        vfield(
            "tags",
            Value::Vec(vec![Value::Text("a".into()), Value::Text("b".into())]),
        ),
        vfield("status", Value::variant(Label::Named("ok".into()), Value::Null)),
        vfield(
            "owner",
            Value::Opt(Box::new(Value::Principal(Principal::anonymous()))),
        ),
    ]);
    let bytes = encode(&env, &[ty.clone()], &[value.clone()]).unwrap();
    let decoded = decode(&env, &bytes, &[ty.clone()]).unwrap();
    // Annotation is idempotent, so the decoded value matches the
    // annotated original.
    assert_eq!(decoded, vec![value.annotate(&env, &ty).unwrap()]);
}

#[test]
fn test_recursive_value_roundtrip() {
    let mut env = TypeEnv::new();
    env.insert(
        "list",
        Type::Opt(Box::new(Type::record(vec![
            field("head", Type::Int),
            field("tail", Type::Var("list".to_string())),
        ]))),
    )
    .unwrap();
    let ty = Type::Var("list".to_string());
    let cons = |head: i64, tail: Value| {
        Value::Opt(Box::new(Value::record(vec![
            vfield("head", Value::Int(BigInt::from(head))),
            vfield("tail", tail),
        ])))
    };
    let value = cons(1, cons(2, cons(3, Value::None)));
    let bytes = encode(&env, &[ty.clone()], &[value.clone()]).unwrap();
    let decoded = decode(&env, &bytes, &[ty]).unwrap();
    assert_eq!(decoded, vec![value]);
}

#[test]
fn test_nat_decodes_as_int() {
    let env = TypeEnv::new();
    let bytes = encode(&env, &[Type::Nat], &[Value::Nat(BigUint::from(99u8))]).unwrap();
    let decoded = decode(&env, &bytes, &[Type::Int]).unwrap();
    assert_eq!(decoded, vec![Value::Int(BigInt::from(99))]);
    // The other direction is not a subtype.
    let bytes = encode(&env, &[Type::Int], &[Value::Int(BigInt::from(99))]).unwrap();
    assert!(matches!(
        decode(&env, &bytes, &[Type::Nat]),
        Err(DecodeError::Mismatch { .. })
    ));
}

#[test]
fn test_added_opt_field_defaults_to_absent() {
    // Old sender, new receiver: the receiver's record gained an opt
    // field the sender never heard of.
    let env = TypeEnv::new();
    let old = Type::record(vec![field("name", Type::Text)]);
    let new = Type::record(vec![
        field("name", Type::Text),
        field("nickname", Type::Opt(Box::new(Type::Text))),
    ]);
    let bytes = encode(
        &env,
        &[old],
        &[Value::record(vec![vfield("name", Value::Text("w".into()))])],
    )
    .unwrap();
    let decoded = decode(&env, &bytes, &[new]).unwrap();
    assert_eq!(
        decoded,
        vec![Value::record(vec![
            vfield("name", Value::Text("w".into())),
            vfield("nickname", Value::None),
        ])]
    );
}

#[test]
fn test_unknown_field_skipped() {
    // New sender, old receiver: an extra field on the wire is consumed
    // and dropped, even mid-record.
    let env = TypeEnv::new();
    let new = Type::record(vec![
        field("age", Type::Nat),
        field("name", Type::Text),
    ]);
    let old = Type::record(vec![field("name", Type::Text)]);
    let bytes = encode(
        &env,
        &[new],
        &[Value::record(vec![
            vfield("age", Value::Nat(BigUint::from(30u8))),
            vfield("name", Value::Text("w".into())),
        ])],
    )
    .unwrap();
    let decoded = decode(&env, &bytes, &[old]).unwrap();
    assert_eq!(
        decoded,
        vec![Value::record(vec![vfield("name", Value::Text("w".into()))])]
    );
}

#[test]
fn test_missing_mandatory_field_fails() {
    let env = TypeEnv::new();
    let old = Type::record(vec![field("name", Type::Text)]);
    let new = Type::record(vec![
        field("age", Type::Nat),
        field("name", Type::Text),
    ]);
    let bytes = encode(
        &env,
        &[old],
        &[Value::record(vec![vfield("name", Value::Text("w".into()))])],
    )
    .unwrap();
    assert!(matches!(
        decode(&env, &bytes, &[new]),
        Err(DecodeError::Mismatch { .. })
    ));
}

#[test]
fn test_incompatible_opt_payload_degrades_to_absent() {
    // opt text on the wire, opt nat expected: the payload is consumed
    // and the option comes back absent instead of failing the message.
    let env = TypeEnv::new();
    let bytes = encode(
        &env,
        &[
            Type::Opt(Box::new(Type::Text)),
            Type::Bool,
        ],
        &[
            Value::Opt(Box::new(Value::Text("surprise".into()))),
            Value::Bool(true),
        ],
    )
    .unwrap();
    let decoded = decode(
        &env,
        &bytes,
        &[Type::Opt(Box::new(Type::Nat)), Type::Bool],
    )
    .unwrap();
    // The argument after the degraded option still decodes, proving the
    // payload was consumed at the right width.
    assert_eq!(decoded, vec![Value::None, Value::Bool(true)]);
}

#[test]
fn test_non_opt_wire_value_fills_opt_slot() {
    let env = TypeEnv::new();
    let bytes = encode(&env, &[Type::Nat], &[Value::Nat(BigUint::from(5u8))]).unwrap();
    let decoded = decode(&env, &bytes, &[Type::Opt(Box::new(Type::Nat))]).unwrap();
    assert_eq!(
        decoded,
        vec![Value::Opt(Box::new(Value::Nat(BigUint::from(5u8))))]
    );
    // Incompatible non-opt value degrades instead.
    let bytes = encode(&env, &[Type::Text], &[Value::Text("x".into())]).unwrap();
    let decoded = decode(&env, &bytes, &[Type::Opt(Box::new(Type::Nat))]).unwrap();
    assert_eq!(decoded, vec![Value::None]);
}

#[test]
fn test_missing_trailing_argument_defaults() {
    let env = TypeEnv::new();
    let bytes = encode(&env, &[Type::Bool], &[Value::Bool(true)]).unwrap();
    let decoded = decode(
        &env,
        &bytes,
        &[
            Type::Bool,
            Type::Opt(Box::new(Type::Nat)),
            Type::Reserved,
        ],
    )
    .unwrap();
    assert_eq!(decoded, vec![Value::Bool(true), Value::None, Value::Reserved]);
    // A missing non-defaultable argument is an error.
    assert!(matches!(
        decode(&env, &bytes, &[Type::Bool, Type::Nat]),
        Err(DecodeError::MissingArgument { position: 1, .. })
    ));
}

#[test]
fn test_extra_wire_arguments_dropped() {
    let env = TypeEnv::new();
    let bytes = encode(
        &env,
        &[Type::Bool, Type::Text],
        &[Value::Bool(true), Value::Text("extra".into())],
    )
    .unwrap();
    let decoded = decode(&env, &bytes, &[Type::Bool]).unwrap();
    assert_eq!(decoded, vec![Value::Bool(true)]);
}

#[test]
fn test_variant_decodes_against_wider_expectation() {
    let env = TypeEnv::new();
    let narrow = Type::variant(vec![field("ok", Type::Nat)]);
    let wide = Type::variant(vec![field("err", Type::Text), field("ok", Type::Nat)]);
    let bytes = encode(
        &env,
        &[narrow],
        &[Value::variant(
            Label::Named("ok".into()),
            Value::Nat(BigUint::from(1u8)),
        )],
    )
    .unwrap();
    let decoded = decode(&env, &bytes, &[wide]).unwrap();
    assert_eq!(
        decoded,
        vec![Value::variant(
            Label::Named("ok".into()),
            Value::Nat(BigUint::from(1u8))
        )]
    );
}

#[test]
fn test_unknown_variant_tag_fails() {
    let env = TypeEnv::new();
    let wide = Type::variant(vec![field("err", Type::Text), field("ok", Type::Nat)]);
    let narrow = Type::variant(vec![field("ok", Type::Nat)]);
    let bytes = encode(
        &env,
        &[wide],
        &[Value::variant(Label::Named("err".into()), Value::Text("boom".into()))],
    )
    .unwrap();
    assert!(matches!(
        decode(&env, &bytes, &[narrow]),
        Err(DecodeError::Mismatch { .. })
    ));
}

#[test]
fn test_reserved_swallows_anything() {
    let env = TypeEnv::new();
    let ty = Type::record(vec![field("a", Type::Nat), field("b", Type::Text)]);
    let value = Value::record(vec![
        vfield("a", Value::Nat(BigUint::from(1u8))),
        vfield("b", Value::Text("x".into())),
    ]);
    let bytes = encode(&env, &[ty, Type::Bool], &[value, Value::Bool(false)]).unwrap();
    let decoded = decode(&env, &bytes, &[Type::Reserved, Type::Bool]).unwrap();
    assert_eq!(decoded, vec![Value::Reserved, Value::Bool(false)]);
}

#[test]
fn test_empty_never_decodes() {
    let env = TypeEnv::new();
    let bytes = encode(&env, &[Type::Nat], &[Value::Nat(BigUint::from(1u8))]).unwrap();
    assert!(matches!(
        decode(&env, &bytes, &[Type::Empty]),
        Err(DecodeError::Mismatch { .. })
    ));
}

#[test]
fn test_vector_of_zero_sized_elements_roundtrips() {
    // null, reserved and empty records occupy no bytes per element, so
    // the element count alone exceeds what remains in the buffer.
    let env = TypeEnv::new();
    let cases = [
        (
            Type::Vec(Box::new(Type::Null)),
            Value::Vec(vec![Value::Null; 3]),
        ),
        (
            Type::Vec(Box::new(Type::Reserved)),
            Value::Vec(vec![Value::Reserved; 4]),
        ),
        (
            Type::Vec(Box::new(Type::record(vec![]))),
            Value::Vec(vec![Value::Record(vec![]); 2]),
        ),
    ];
    for (ty, value) in cases {
        let bytes = encode(
            &env,
            &[ty.clone(), Type::Bool],
            &[value.clone(), Value::Bool(true)],
        )
        .unwrap();
        let decoded = decode(&env, &bytes, &[ty.clone(), Type::Bool]).unwrap();
        // The argument after the vector still decodes, so the element
        // loop consumed exactly the encoded bytes.
        assert_eq!(decoded, vec![value.clone(), Value::Bool(true)], "{}", ty);

        // Skipping such a vector walks past it cleanly too.
        let decoded = decode(&env, &bytes, &[Type::Reserved, Type::Bool]).unwrap();
        assert_eq!(decoded, vec![Value::Reserved, Value::Bool(true)], "{}", ty);
    }
}

#[test]
fn test_principal_roundtrip() {
    let env = TypeEnv::new();
    let p = Principal::from_slice(&[1, 2, 3, 4]).unwrap();
    let bytes = encode(&env, &[Type::Principal], &[Value::Principal(p.clone())]).unwrap();
    let decoded = decode(&env, &bytes, &[Type::Principal]).unwrap();
    assert_eq!(decoded, vec![Value::Principal(p)]);
}
