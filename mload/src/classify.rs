//! Classifies raw record fields against schema types into [`FieldValue`]s.
//!
//! The same classification feeds the NDF converter (against object types) and
//! the mutation builder (against input types).

use serde_json::Value;

use crate::coerce::{CoerceOptions, coerce};
use crate::errors::RecordError;
use crate::reader::Record;
use crate::reflector::{FieldInfo, SchemaReflector};
use crate::utils::id::normalize_id;
use crate::value::{FieldValue, Scalar, shape_of};

pub const ID_FIELD: &str = "id";

/// Separator for list values packed into one CSV cell.
pub const LIST_SEPARATOR: char = '|';

/// The non-id fields of one record, in record order. Fields whose value is
/// absent or coerces to null are left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedRecord {
    pub fields: Vec<(String, FieldValue)>,
    pub warnings: Vec<String>,
}

/// Returns the record's raw id as text, if it has a non-empty one.
pub fn raw_id(record: &Record) -> Option<String> {
    match record.get(ID_FIELD)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn classify_record(
    reflector: &mut SchemaReflector<'_>,
    type_name: &str,
    record: &Record,
    options: CoerceOptions,
) -> Result<ClassifiedRecord, RecordError> {
    let mut classified = ClassifiedRecord::default();
    for (name, raw) in record {
        if name == ID_FIELD {
            continue;
        }
        let info = reflector.field(type_name, name)?;
        if let Some(value) = classify_field(reflector, &info, raw, options, &mut classified.warnings)? {
            classified.fields.push((name.clone(), value));
        }
    }
    Ok(classified)
}

fn classify_field(
    reflector: &mut SchemaReflector<'_>,
    info: &FieldInfo,
    raw: &Value,
    options: CoerceOptions,
    warnings: &mut Vec<String>,
) -> Result<Option<FieldValue>, RecordError> {
    if raw.is_null() {
        return Ok(None);
    }
    if info.is_object_type {
        return relation(info, raw);
    }
    if info.is_input_object() {
        return nested_object(reflector, info, raw, options, warnings);
    }
    if info.is_list {
        return scalar_list(info, raw, options, warnings).map(Some);
    }

    match raw {
        Value::Array(_) | Value::Object(_) => Err(mismatch(info, "a single value", raw)),
        _ => {
            let scalar = scalar(info, raw, options, warnings)?;
            Ok((!scalar.is_null()).then_some(FieldValue::Scalar(scalar)))
        }
    }
}

fn relation(info: &FieldInfo, raw: &Value) -> Result<Option<FieldValue>, RecordError> {
    let targets: Vec<Value> = match raw {
        Value::Array(items) if info.is_list => items.clone(),
        Value::Array(_) => return Err(mismatch(info, "a single reference", raw)),
        Value::String(s) if info.is_list => expand_list(s),
        Value::Bool(_) => return Err(mismatch(info, "a reference", raw)),
        other => vec![other.clone()],
    };

    let mut ids = Vec::with_capacity(targets.len());
    for target in &targets {
        let id = match target {
            Value::Null => continue,
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Object(obj) => match obj.get(ID_FIELD) {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(mismatch(info, "a reference with an id", target)),
            },
            other => return Err(mismatch(info, "a reference", other)),
        };
        if !id.is_empty() {
            ids.push(normalize_id(&id));
        }
    }

    if ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(FieldValue::Relation {
        to_type: info.named_type.clone(),
        ids,
    }))
}

fn nested_object(
    reflector: &mut SchemaReflector<'_>,
    info: &FieldInfo,
    raw: &Value,
    options: CoerceOptions,
    warnings: &mut Vec<String>,
) -> Result<Option<FieldValue>, RecordError> {
    // CSV cells can only carry nested objects as JSON text.
    let parsed;
    let raw = match raw {
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s).map_err(|_| mismatch(info, "an object", raw))?;
            &parsed
        }
        other => other,
    };

    let mut classify_object = |value: &Value| -> Result<Vec<(String, FieldValue)>, RecordError> {
        let Value::Object(fields) = value else {
            return Err(mismatch(info, "an object", value));
        };
        let mut nested = classify_record(reflector, &info.named_type, fields, options)?;
        warnings.append(&mut nested.warnings);
        let mut out = nested.fields;
        if let Some(id) = fields.get(ID_FIELD).filter(|v| !v.is_null()) {
            if reflector.field(&info.named_type, ID_FIELD).is_ok() {
                let id = match id {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.insert(0, (ID_FIELD.to_string(), FieldValue::Scalar(Scalar::String(normalize_id(&id)))));
            }
        }
        Ok(out)
    };

    match (raw, info.is_list) {
        (Value::Array(items), true) => {
            let objects = items
                .iter()
                .filter(|item| !item.is_null())
                .map(&mut classify_object)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(FieldValue::ObjectList(objects)))
        }
        (Value::Object(_), false) => Ok(Some(FieldValue::Object(classify_object(raw)?))),
        (Value::Object(_), true) => Ok(Some(FieldValue::ObjectList(vec![classify_object(raw)?]))),
        (_, true) => Err(mismatch(info, "a list of objects", raw)),
        (_, false) => Err(mismatch(info, "an object", raw)),
    }
}

fn scalar_list(
    info: &FieldInfo,
    raw: &Value,
    options: CoerceOptions,
    warnings: &mut Vec<String>,
) -> Result<FieldValue, RecordError> {
    let items = match raw {
        Value::Array(items) => items.clone(),
        Value::String(s) => expand_list(s),
        other => return Err(mismatch(info, "a list", other)),
    };

    let mut values = Vec::with_capacity(items.len());
    for item in &items {
        if matches!(item, Value::Array(_) | Value::Object(_)) {
            return Err(mismatch(info, "a list of scalars", item));
        }
        let value = scalar(info, item, options, warnings)?;
        if !value.is_null() {
            values.push(value);
        }
    }
    Ok(FieldValue::List(values))
}

fn scalar(
    info: &FieldInfo,
    raw: &Value,
    options: CoerceOptions,
    warnings: &mut Vec<String>,
) -> Result<Scalar, RecordError> {
    if info.is_enum() {
        return enum_value(info, raw);
    }

    let coerced = coerce(&info.named_type, raw, Scalar::Null, options).map_err(|source| {
        RecordError::Coercion {
            field: info.name.clone(),
            source,
        }
    })?;
    if let Some(warning) = coerced.warning {
        warnings.push(format!("field '{}': {warning}", info.name));
    }
    Ok(coerced.value)
}

/// Enum values are written bare into mutation text, so only the schema's own
/// values get through.
fn enum_value(info: &FieldInfo, raw: &Value) -> Result<Scalar, RecordError> {
    let value = match raw {
        Value::Null => return Ok(Scalar::Null),
        Value::String(s) if s.trim().is_empty() => return Ok(Scalar::Null),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if !info.has_enum_value(&value) {
        return Err(RecordError::InvalidEnum {
            field: info.name.clone(),
            enum_type: info.named_type.clone(),
            value,
        });
    }
    Ok(Scalar::Enum(value))
}

/// Splits a list packed into a string: a JSON array literal, or values
/// separated by `|`.
pub fn expand_list(s: &str) -> Vec<Value> {
    let trimmed = s.trim();
    if trimmed.starts_with('[') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
            return items;
        }
    }
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split(LIST_SEPARATOR)
        .map(|part| Value::String(part.trim().to_string()))
        .collect()
}

fn mismatch(info: &FieldInfo, expected: &'static str, found: &Value) -> RecordError {
    RecordError::ShapeMismatch {
        field: info.name.clone(),
        expected,
        found: shape_of(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CoercionError, SchemaError};
    use crate::schema::Schema;
    use serde_json::json;

    const SDL: &str = r#"
        type User {
            id: ID!
            name: String
            age: Int
            role: Role
            tags: [String]
            scores: [Int]
            manager: User
            friends: [User]
            joined: Date
        }
        enum Role { ADMIN MEMBER }
        input AddressInput { id: ID street: String zip: Int }
        input UserInput {
            name: String
            address: AddressInput
            previous: [AddressInput]
        }
    "#;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn classify(type_name: &str, value: Value) -> Result<ClassifiedRecord, RecordError> {
        let schema = Schema::from_sdl(SDL).unwrap();
        let mut reflector = SchemaReflector::new(&schema);
        classify_record(&mut reflector, type_name, &record(value), CoerceOptions::iso())
    }

    #[test]
    fn splits_fields_by_category() {
        let classified = classify(
            "User",
            json!({
                "id": "u1",
                "name": "Ada",
                "age": "36",
                "role": "ADMIN",
                "tags": "math|poetry",
                "scores": [1, "2"],
                "manager": {"id": "u0"},
                "friends": ["u2", {"id": "u3"}],
            }),
        )
        .unwrap();

        let fields: Vec<(&str, &FieldValue)> =
            classified.fields.iter().map(|(n, v)| (n.as_str(), v)).collect();
        assert_eq!(
            fields,
            vec![
                ("name", &FieldValue::Scalar(Scalar::String("Ada".into()))),
                ("age", &FieldValue::Scalar(Scalar::Int(36))),
                ("role", &FieldValue::Scalar(Scalar::Enum("ADMIN".into()))),
                (
                    "tags",
                    &FieldValue::List(vec![Scalar::String("math".into()), Scalar::String("poetry".into())])
                ),
                ("scores", &FieldValue::List(vec![Scalar::Int(1), Scalar::Int(2)])),
                (
                    "manager",
                    &FieldValue::Relation { to_type: "User".into(), ids: vec!["u0".into()] }
                ),
                (
                    "friends",
                    &FieldValue::Relation { to_type: "User".into(), ids: vec!["u2".into(), "u3".into()] }
                ),
            ]
        );
        assert!(classified.warnings.is_empty());
    }

    #[test]
    fn list_values_against_single_fields_are_mismatches() {
        let err = classify("User", json!({"id": "u1", "name": ["a", "b"]})).unwrap_err();
        assert_eq!(
            err,
            RecordError::ShapeMismatch {
                field: "name".into(),
                expected: "a single value",
                found: "a list"
            }
        );
        let err = classify("User", json!({"id": "u1", "manager": ["u2", "u3"]})).unwrap_err();
        assert!(matches!(err, RecordError::ShapeMismatch { expected: "a single reference", .. }));
        let err = classify("User", json!({"id": "u1", "tags": 4})).unwrap_err();
        assert!(matches!(err, RecordError::ShapeMismatch { expected: "a list", .. }));
    }

    #[test]
    fn coercion_problems_surface_per_field() {
        let classified = classify("User", json!({"id": "u1", "age": "old"})).unwrap();
        assert!(classified.fields.is_empty());
        assert_eq!(classified.warnings, vec!["field 'age': 'old' is not a valid Int".to_string()]);

        let err = classify("User", json!({"id": "u1", "joined": "someday"})).unwrap_err();
        assert_eq!(
            err,
            RecordError::Coercion {
                field: "joined".into(),
                source: CoercionError::InvalidDate {
                    type_name: "Date".into(),
                    value: "someday".into()
                }
            }
        );
    }

    #[test]
    fn enum_fields_accept_only_declared_values() {
        let classified = classify("User", json!({"id": "u1", "role": " MEMBER "})).unwrap();
        assert_eq!(
            classified.fields[0],
            ("role".to_string(), FieldValue::Scalar(Scalar::Enum("MEMBER".into())))
        );
        assert!(classify("User", json!({"id": "u1", "role": ""})).unwrap().fields.is_empty());

        let err = classify("User", json!({"id": "u1", "role": "admin"})).unwrap_err();
        assert_eq!(
            err,
            RecordError::InvalidEnum {
                field: "role".into(),
                enum_type: "Role".into(),
                value: "admin".into()
            }
        );
        let err = classify("User", json!({"id": "u1", "role": 1})).unwrap_err();
        assert!(matches!(err, RecordError::InvalidEnum { ref value, .. } if value == "1"));
    }

    #[test]
    fn unknown_fields_are_schema_errors() {
        let err = classify("User", json!({"id": "u1", "nickname": "a"})).unwrap_err();
        assert_eq!(
            err,
            RecordError::Schema(SchemaError::UndefinedField {
                type_name: "User".into(),
                field: "nickname".into()
            })
        );
    }

    #[test]
    fn nested_input_objects_are_classified_recursively() {
        let classified = classify(
            "UserInput",
            json!({
                "name": "Ada",
                "address": {"street": "Main", "zip": "1010"},
                "previous": "[{\"id\": \"a1\", \"zip\": 2020}]",
            }),
        )
        .unwrap();
        assert_eq!(
            classified.fields[1].1.to_graphql(),
            r#"{street: "Main", zip: 1010}"#
        );
        assert_eq!(
            classified.fields[2].1.to_graphql(),
            r#"[{id: "a1", zip: 2020}]"#
        );
    }

    #[test]
    fn expands_packed_lists() {
        assert_eq!(expand_list("a | b|c"), vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(expand_list(r#"["a|b", 2]"#), vec![json!("a|b"), json!(2)]);
        assert!(expand_list("  ").is_empty());
    }

    #[test]
    fn raw_ids_accept_strings_and_numbers() {
        assert_eq!(raw_id(&record(json!({"id": " u1 "}))), Some("u1".into()));
        assert_eq!(raw_id(&record(json!({"id": 7}))), Some("7".into()));
        assert_eq!(raw_id(&record(json!({"id": ""}))), None);
        assert_eq!(raw_id(&record(json!({"name": "x"}))), None);
    }
}
