//! End-to-end tests across all three layers: text in, bytes out, and the
//! subtyping relation that makes interface upgrades safe.

use num_bigint::BigInt;
use weft::{
    compatible, decode, decode_untyped, encode, encode_text, equal, find_method, format_args,
    label_hash, parse_program, parse_type, parse_value, subtype, DecodeError, Type,
    TypeEnv, TypeError, Value,
};

#[test]
fn test_subtype_reflexive() {
    let program = parse_program(
        "type list = opt record { head : int; tail : list };
         type tree = variant { leaf : int; node : record { tree; tree } };",
    )
    .unwrap();
    let env = &program.env;
    for source in [
        "nat",
        "opt vec text",
        "record { a : nat; b : variant { x; y : blob } }",
        "func (list) -> (tree) query",
        "list",
        "tree",
    ] {
        let ty = parse_type(source).unwrap();
        assert!(subtype(env, &ty, &ty).unwrap(), "{} <: {}", source, source);
    }
}

#[test]
fn test_subtype_transitive_samples() {
    let env = TypeEnv::new();
    let triples = [
        ("record { a : nat; b : text }", "record { a : nat }", "record {}"),
        ("nat", "int", "opt int"),
        (
            "variant { ok }",
            "variant { ok; err : text }",
            "variant { ok; err : text; warn }",
        ),
    ];
    for (a, b, c) in triples {
        let (a, b, c) = (
            parse_type(a).unwrap(),
            parse_type(b).unwrap(),
            parse_type(c).unwrap(),
        );
        assert!(subtype(&env, &a, &b).unwrap());
        assert!(subtype(&env, &b, &c).unwrap());
        assert!(subtype(&env, &a, &c).unwrap());
    }
}

#[test]
fn test_text_to_wire_and_back() {
    let program = parse_program(
        "type entry = record { id : nat64; label : text };
         service : { put : (vec entry, opt principal) -> (bool); }",
    )
    .unwrap();
    let actor = program.actor.clone().unwrap();
    let func = find_method(&program.env, &actor, "put").unwrap();

    let bytes = encode_text(
        &program.env,
        &func.args,
        r#"(vec { record { id = 1; label = "a" }; record { id = 2; label = "b" } }, null)"#,
    )
    .unwrap();
    let values = decode(&program.env, &bytes, &func.args).unwrap();
    assert_eq!(
        format_args(&values),
        r#"(vec { record { id = 1; label = "a"; }; record { id = 2; label = "b"; }; }, null)"#
    );
}

#[test]
fn test_interface_upgrade_is_compatible() {
    // The new interface adds a method, narrows a result variant, and
    // appends an optional parameter. All three are safe for old clients.
    let old = parse_program(
        "service : {
            balance : (nat) -> (nat) query;
            transfer : (principal, nat) -> (variant { ok; err; pending });
         }",
    )
    .unwrap();
    let new = parse_program(
        "service : {
            balance : (nat) -> (nat) query;
            transfer : (principal, nat, opt text) -> (variant { ok; err });
            burn : (nat) -> ();
         }",
    )
    .unwrap();
    let old_actor = old.actor.unwrap();
    let new_actor = new.actor.unwrap();
    assert!(compatible(&new.env, &new_actor, &old.env, &old_actor).unwrap());
    // The reverse direction drops a method, so it is not compatible.
    assert!(!compatible(&old.env, &old_actor, &new.env, &new_actor).unwrap());
}

#[test]
fn test_renaming_a_mandatory_parameter_type_breaks() {
    let old = parse_program("service : { f : (nat) -> (); }").unwrap();
    let new = parse_program("service : { f : (text) -> (); }").unwrap();
    let old_actor = old.actor.unwrap();
    let new_actor = new.actor.unwrap();
    assert!(!compatible(&new.env, &new_actor, &old.env, &old_actor).unwrap());
}

#[test]
fn test_cross_version_message() {
    // An old sender encodes at the old argument types; the upgraded
    // receiver decodes at the new ones.
    let old_args = [parse_type("record { amount : nat }").unwrap()];
    let new_args = [parse_type("record { amount : int; memo : opt text }").unwrap()];
    let env = TypeEnv::new();
    let bytes = encode_text(&env, &old_args, "(record { amount = 7 })").unwrap();
    let values = decode(&env, &bytes, &new_args).unwrap();
    // Fields print in label hash order; "memo" hashes below "amount".
    assert_eq!(
        format_args(&values),
        "(record { memo = null; amount = 7; })"
    );
}

#[test]
fn test_label_spelling_never_crosses_the_wire() {
    // "dwaourt" and "sksnljg" hash to the same label id, so the two
    // record types are interchangeable on the wire.
    assert_eq!(label_hash("dwaourt"), label_hash("sksnljg"));
    let a = parse_type("record { dwaourt : nat }").unwrap();
    let b = parse_type("record { sksnljg : nat }").unwrap();
    let env = TypeEnv::new();
    assert!(subtype(&env, &a, &b).unwrap());
    assert!(equal(&env, &a, &env, &b).unwrap());

    let bytes = encode_text(&env, &[a], "(record { dwaourt = 3 })").unwrap();
    let values = decode(&env, &bytes, &[b]).unwrap();
    assert_eq!(format_args(&values), "(record { sksnljg = 3; })");
}

#[test]
fn test_colliding_labels_in_one_record_rejected() {
    let ty = parse_type("record { dwaourt : nat; sksnljg : nat }").unwrap();
    let env = TypeEnv::new();
    assert!(matches!(
        env.validate_type(&ty),
        Err(TypeError::DuplicateLabel { kind: "record", .. })
    ));
}

#[test]
fn test_untyped_inspection() {
    let env = TypeEnv::new();
    let ty = parse_type(r#"record { name : text; age : nat }"#).unwrap();
    let bytes = encode_text(&env, &[ty], r#"(record { name = "ada"; age = 36 })"#).unwrap();
    let values = decode_untyped(&bytes).unwrap();
    // Without the interface, labels are bare hashes.
    assert_eq!(
        format_args(&values),
        format!(
            "(record {{ {} = 36; {} = \"ada\"; }})",
            label_hash("age"),
            label_hash("name"),
        )
    );
}

#[test]
fn test_empty_decodes_nothing() {
    let env = TypeEnv::new();
    let bytes = encode(&env, &[Type::Nat], &[Value::Int(BigInt::from(1))]).unwrap();
    assert!(matches!(
        decode(&env, &bytes, &[Type::Empty]),
        Err(DecodeError::Mismatch { .. })
    ));
    // But empty is a subtype of everything at the type level.
    assert!(subtype(&env, &Type::Empty, &Type::Nat).unwrap());
}

#[test]
fn test_value_annotation_roundtrip_display() {
    let v = parse_value(r#"variant { err = "boom" }"#).unwrap();
    assert_eq!(v.to_string(), r#"variant { err = "boom" }"#);
    let v = parse_value("opt opt null").unwrap();
    assert_eq!(v.to_string(), "opt opt null");
}
