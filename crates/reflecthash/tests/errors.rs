use reflecthash::{
    hash_message, FieldDescriptor, HashError, HashOptions, Kind, MessageDescriptor,
    MessageHasher, ReflectMessage, Registry, ValidationError, Value,
};
use serde_json::json;

/// Message with hand-supplied values, bypassing the checks of `DynamicMessage`.
struct Fixed {
    descriptor: MessageDescriptor,
    values: Vec<(u32, Value<'static>)>,
}

impl ReflectMessage for Fixed {
    fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    fn has(&self, field: &FieldDescriptor) -> bool {
        self.values.iter().any(|(number, _)| *number == field.number())
    }

    fn get(&self, field: &FieldDescriptor) -> Value<'_> {
        self.values
            .iter()
            .find(|(number, _)| *number == field.number())
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Nil)
    }
}

fn fixed(fields: Vec<FieldDescriptor>, values: Vec<(u32, Value<'static>)>) -> Fixed {
    Fixed {
        descriptor: MessageDescriptor::new("test.Fixed", fields, vec![]),
        values,
    }
}

fn legacy_registry() -> Registry {
    Registry::from_json_str(include_str!("fixtures/legacy_schema.json")).unwrap()
}

#[test]
fn missing_required_field_is_rejected() {
    let msg = legacy_registry()
        .decode_json("test.v2.Required", &json!({ "name": "x" }))
        .unwrap();
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    assert!(matches!(
        &err,
        HashError::Invalid(ValidationError::MissingRequired { path }) if path == "id"
    ));
    assert_eq!(err.to_string(), "invalid message: required field id is not set");
}

#[test]
fn nested_required_field_reports_its_path() {
    let msg = legacy_registry()
        .decode_json("test.v2.Legacy", &json!({ "payload": {} }))
        .unwrap();
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        HashError::Invalid(ValidationError::MissingRequired { path }) if path == "payload.id"
    ));
}

#[test]
fn group_fields_are_unsupported() {
    let registry = legacy_registry();
    let msg = registry
        .decode_json("test.v2.Legacy", &json!({ "id": 4, "payload": { "id": 1 } }))
        .unwrap();
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        HashError::UnsupportedKind { kind: Kind::Group, number: 2, .. }
    ));

    let without_group = registry
        .decode_json("test.v2.Legacy", &json!({ "id": 4 }))
        .unwrap();
    assert!(hash_message(Some(&without_group), &HashOptions::default()).is_ok());
}

#[test]
fn mismatched_value_fails_validation() {
    let msg = fixed(
        vec![FieldDescriptor::new("count", 1, Kind::Int64)],
        vec![(1, Value::String("seven"))],
    );
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        HashError::Invalid(ValidationError::KindMismatch { found: "string", .. })
    ));

    // Skipping validation surfaces the same problem from the traversal.
    let err = MessageHasher::default().hash_message(&msg).unwrap_err();
    assert!(matches!(err, HashError::KindMismatch { found: "string", .. }));
}

#[test]
fn narrow_integers_are_range_checked() {
    let msg = fixed(
        vec![FieldDescriptor::new("small", 1, Kind::Uint32)],
        vec![(1, Value::Uint(u64::from(u32::MAX) + 1))],
    );
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        HashError::Invalid(ValidationError::OutOfRange { kind: Kind::Uint32, .. })
    ));
}

#[test]
fn single_precision_values_must_be_representable() {
    let msg = fixed(
        vec![FieldDescriptor::new("ratio", 1, Kind::Float)],
        vec![(1, Value::Float(0.1))],
    );
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        HashError::Invalid(ValidationError::OutOfRange { kind: Kind::Float, .. })
    ));
}

#[test]
fn several_oneof_members_are_rejected() {
    let msg = Fixed {
        descriptor: MessageDescriptor::new(
            "test.Fixed",
            vec![
                FieldDescriptor::new("a", 1, Kind::String),
                FieldDescriptor::new("b", 2, Kind::Bool),
            ],
            vec![("pick".to_string(), vec!["a".to_string(), "b".to_string()])],
        ),
        values: vec![(1, Value::String("x")), (2, Value::Bool(true))],
    };
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    match err {
        HashError::Invalid(ValidationError::OneofConflict { oneof, fields, .. }) => {
            assert_eq!(oneof, "pick");
            assert_eq!(fields, vec!["a", "b"]);
        }
        other => panic!("expected oneof conflict, got {:?}", other),
    }
}

#[test]
fn duplicate_map_keys_are_rejected() {
    let lookup = FieldDescriptor::map(
        "lookup",
        1,
        Kind::String,
        FieldDescriptor::new("", 0, Kind::Int64),
    );
    let msg = fixed(
        vec![lookup],
        vec![(
            1,
            Value::Map(vec![
                (Value::String("a"), Value::Int(1)),
                (Value::String("a"), Value::Int(2)),
            ]),
        )],
    );
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        HashError::Invalid(ValidationError::DuplicateMapKey { key, .. }) if key == "\"a\""
    ));
}

#[test]
fn map_entry_failures_name_the_key() {
    let lookup = FieldDescriptor::map(
        "lookup",
        1,
        Kind::String,
        FieldDescriptor::new("", 0, Kind::Int64),
    );
    let msg = fixed(
        vec![lookup],
        vec![(1, Value::Map(vec![(Value::String("a"), Value::Bool(true))]))],
    );
    let err = MessageHasher::default().hash_message(&msg).unwrap_err();
    match err {
        HashError::MapEntry { path, key, source } => {
            assert_eq!(path, "lookup");
            assert_eq!(key, "\"a\"");
            assert!(matches!(*source, HashError::KindMismatch { .. }));
        }
        other => panic!("expected map entry error, got {:?}", other),
    }
}

#[test]
fn nested_message_of_wrong_type_is_rejected() {
    let inner = fixed(vec![], vec![]);
    let inner: &'static Fixed = Box::leak(Box::new(inner));
    let msg = fixed(
        vec![FieldDescriptor::new("child", 1, Kind::Message).with_type_name("test.Other")],
        vec![(1, Value::Message(inner))],
    );
    let err = hash_message(Some(&msg), &HashOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        HashError::Invalid(ValidationError::TypeMismatch { expected, found, .. })
            if expected == "test.Other" && found == "test.Fixed"
    ));
}

#[test]
fn decoding_rejects_values_that_do_not_fit() {
    let registry = legacy_registry();
    let err = registry
        .decode_json("test.v2.Required", &json!({ "id": "twelve" }))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid value at id: 'twelve' is not a signed 64-bit integer"
    );
    assert!(registry.decode_json_str("test.v2.Missing", "{}").is_err());
}
