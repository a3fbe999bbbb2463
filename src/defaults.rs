//! Default overlays and the merge of a parsed document onto the destination's tree.

use std::collections::BTreeMap;

use facet_core::{Def, Shape, Type, UserType};

use crate::{
    Result, Value,
    options::Registry,
    schema::{is_bound, is_skipped},
};

fn record_fields(shape: &'static Shape) -> Option<&'static [facet_core::Field]> {
    match shape.ty {
        Type::User(UserType::Struct(struct_type)) if shape.inner.is_none() => {
            Some(struct_type.fields)
        }
        _ => None,
    }
}

/// The starting tree for a freshly created value of `shape`.
fn fresh(shape: &'static Shape, registry: &Registry) -> Result<Value> {
    Ok(match registry.seed(shape)? {
        Some(seed) => seed.seeded.clone(),
        None => Value::Null,
    })
}

/// Merges `document` onto `base`, both shaped like `shape`.
///
/// Struct positions merge field by field and map positions key by key. Lists, arrays and
/// scalars are replaced. New list elements, map values and `Some` payloads start from their type's
/// registered defaults.
pub(crate) fn merge(
    shape: &'static Shape,
    base: Value,
    document: Value,
    registry: &Registry,
) -> Result<Value> {
    match shape.def {
        Def::Option(option_def) => {
            if document.is_null() {
                return Ok(Value::Null);
            }
            let base = match base {
                Value::Null => fresh(option_def.t, registry)?,
                base => base,
            };
            return merge(option_def.t, base, document, registry);
        }
        Def::List(list_def) => return merge_items(list_def.t(), document, registry),
        Def::Array(array_def) => return merge_items(array_def.t(), document, registry),
        Def::Map(map_def) => {
            let Value::Mapping(incoming) = document else {
                return Ok(if document.is_null() { base } else { document });
            };
            let mut entries = match base {
                Value::Mapping(entries) => entries,
                _ => BTreeMap::new(),
            };
            let element = map_def.v();
            for (key, value) in incoming {
                let merged = merge(element, fresh(element, registry)?, value, registry)?;
                entries.insert(key, merged);
            }
            return Ok(Value::Mapping(entries));
        }
        _ => {}
    }

    let Some(fields) = record_fields(shape) else {
        return Ok(document);
    };
    let Value::Mapping(incoming) = document else {
        return Ok(if document.is_null() { base } else { document });
    };
    let mut entries = match base {
        Value::Mapping(entries) => entries,
        _ => BTreeMap::new(),
    };

    for (key, value) in incoming {
        let Some(field) = fields
            .iter()
            .find(|field| field.name == key && !is_skipped(field) && is_bound(field.shape()))
        else {
            log::debug!("Ignoring unknown key '{key}' for {shape}");
            continue;
        };
        let field_shape = field.shape();
        let current = match entries.remove(&key) {
            Some(current) => current,
            None => fresh(field_shape, registry)?,
        };
        entries.insert(key, merge(field_shape, current, value, registry)?);
    }

    Ok(Value::Mapping(entries))
}

/// A replacement sequence whose elements each start from `element`'s registered defaults.
fn merge_items(element: &'static Shape, document: Value, registry: &Registry) -> Result<Value> {
    let items = match document {
        Value::Sequence(items) => items,
        Value::Null => Vec::new(),
        scalar => vec![scalar],
    };
    let items = items
        .into_iter()
        .map(|item| merge(element, fresh(element, registry)?, item, registry))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Sequence(items))
}

/// Overlays registered defaults onto `value`, shaped like `shape`.
///
/// The root, nested struct fields and populated `Option`s of structs are visited; a
/// parent's defaults land before its children's, so the innermost setter wins.
pub(crate) fn apply(shape: &'static Shape, value: Value, registry: &Registry) -> Result<Value> {
    if let Def::Option(option_def) = shape.def {
        return match value {
            Value::Null => Ok(Value::Null),
            value => apply(option_def.t, value, registry),
        };
    }

    let Some(fields) = record_fields(shape) else {
        return Ok(value);
    };

    let mut value = value;
    if let Some(seed) = registry.seed(shape)? {
        log::trace!("Applying defaults of {shape}");
        value = overlay(value, &seed.zero, &seed.seeded);
    }

    let Value::Mapping(mut entries) = value else {
        return Ok(value);
    };
    for field in fields {
        if let Some(field_value) = entries.remove(field.name) {
            let applied = apply(field.shape(), field_value, registry)?;
            entries.insert(field.name.to_string(), applied);
        }
    }

    Ok(Value::Mapping(entries))
}

/// Writes every part of `seeded` that differs from `zero` into `value`.
fn overlay(value: Value, zero: &Value, seeded: &Value) -> Value {
    let Value::Mapping(seeded_entries) = seeded else {
        return if zero == seeded { value } else { seeded.clone() };
    };
    let mut entries = match value {
        Value::Mapping(entries) => entries,
        _ => BTreeMap::new(),
    };

    for (key, seeded_value) in seeded_entries {
        let zero_value = zero.get(key).unwrap_or(&Value::Null);
        if zero_value == seeded_value {
            continue;
        }
        let current = entries.remove(key).unwrap_or(Value::Null);
        let merged = if matches!(current, Value::Mapping(_)) {
            overlay(current, zero_value, seeded_value)
        } else {
            seeded_value.clone()
        };
        entries.insert(key.clone(), merged);
    }

    Value::Mapping(entries)
}
