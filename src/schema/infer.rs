use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::Value;

use super::field::{BaseType, SchemaField};

/// Recursively infer a schema from one JSON value.
///
/// Object properties are `required` on first sight; they only become
/// optional when a later observation is merged in.
pub fn infer_schema(value: &Value) -> SchemaField {
    match value {
        Value::Null => SchemaField::leaf(BaseType::Null),
        Value::Bool(_) => SchemaField::leaf(BaseType::Boolean),
        Value::Number(_) => SchemaField::leaf(BaseType::Number),
        Value::String(_) => SchemaField::leaf(BaseType::String),
        Value::Array(values) => SchemaField {
            items: values.first().map(|first| Box::new(infer_schema(first))),
            ..SchemaField::leaf(BaseType::Array)
        },
        Value::Object(map) => {
            let properties = map
                .iter()
                .map(|(key, value)| {
                    let mut field = infer_schema(value);
                    field.required = Some(true);
                    (key.clone(), field)
                })
                .collect();
            SchemaField {
                properties: Some(properties),
                ..SchemaField::leaf(BaseType::Object)
            }
        }
    }
}

/// Widen `existing` so it also describes `incoming`.
///
/// Precedence:
/// 1. exactly one side is `null` → the other side, nullable and optional;
/// 2. equal type sets → deep object merge, array items merge, or the
///    shared primitive;
/// 3. otherwise → union of both type sets, structure dropped.
pub fn merge_schemas(existing: &SchemaField, incoming: &SchemaField) -> SchemaField {
    match (existing.ty.is_null(), incoming.ty.is_null()) {
        (true, false) => return nullable(incoming),
        (false, true) => return nullable(existing),
        _ => {}
    }

    let required = Some(existing.is_required() && incoming.is_required());

    if existing.ty != incoming.ty {
        return SchemaField {
            required,
            ..SchemaField::of(existing.ty.union(&incoming.ty))
        };
    }

    if existing.ty.contains(BaseType::Object) {
        if let (Some(ours), Some(theirs)) = (&existing.properties, &incoming.properties) {
            return SchemaField {
                properties: Some(merge_properties(ours, theirs)),
                required,
                ..SchemaField::of(existing.ty.clone())
            };
        }
    }

    if existing.ty.contains(BaseType::Array) {
        let items = match (&existing.items, &incoming.items) {
            (Some(ours), Some(theirs)) => Some(Box::new(merge_schemas(ours, theirs))),
            (ours, theirs) => ours.clone().or_else(|| theirs.clone()),
        };
        return SchemaField {
            items,
            required,
            ..SchemaField::of(existing.ty.clone())
        };
    }

    SchemaField {
        required,
        ..SchemaField::of(existing.ty.clone())
    }
}

fn nullable(field: &SchemaField) -> SchemaField {
    let mut merged = field.clone();
    merged.ty = merged.ty.nullable();
    merged.required = Some(false);
    merged
}

/// Keys on both sides merge recursively; keys on one side become optional.
fn merge_properties(
    ours: &BTreeMap<String, SchemaField>,
    theirs: &BTreeMap<String, SchemaField>,
) -> BTreeMap<String, SchemaField> {
    let mut merged = BTreeMap::new();

    for (key, field) in ours {
        let value = match theirs.get(key) {
            Some(other) => merge_schemas(field, other),
            None => optional(field),
        };
        merged.insert(key.clone(), value);
    }
    for (key, field) in theirs {
        if !ours.contains_key(key) {
            merged.insert(key.clone(), optional(field));
        }
    }

    merged
}

fn optional(field: &SchemaField) -> SchemaField {
    SchemaField {
        required: Some(false),
        ..field.clone()
    }
}

/// Canonical string of a schema's shape.
///
/// Objects render as `{key:hash,...}` sorted by key, arrays as `[items]`,
/// everything else as the type string. `required` flags are ignored, so a
/// presence-only change hashes the same.
pub fn schema_hash(field: &SchemaField) -> String {
    let mut out = String::new();
    write_hash(field, &mut out);
    out
}

fn write_hash(field: &SchemaField, out: &mut String) {
    if let Some(properties) = &field.properties {
        out.push('{');
        for (i, (key, child)) in properties.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(key);
            out.push(':');
            write_hash(child, out);
        }
        out.push('}');
    } else if let Some(items) = &field.items {
        out.push('[');
        write_hash(items, out);
        out.push(']');
    } else {
        let _ = write!(out, "{}", field.ty);
    }
}
