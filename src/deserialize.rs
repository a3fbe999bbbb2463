use facet_core::{Def, Facet, Type, UserType};
use facet_reflect::Partial;

use crate::{CfgErrorKind, Result, Value, schema::is_bound};

/// Builds a fresh `T` from a value tree.
///
/// Struct fields missing from a mapping take their type's default, as do fields whose type
/// is not bound. Mapping keys that name no field are ignored.
pub(crate) fn from_value<T: Facet<'static>>(value: Value) -> Result<T> {
    log::trace!("Entering `from_value` function");

    let mut typed_partial = Partial::alloc::<T>()?;
    deserialize_value(typed_partial.inner_mut(), value)?;
    let boxed_value = typed_partial.build()?;

    log::trace!("Exiting `from_value` function");
    Ok(*boxed_value)
}

fn deserialize_value(partial: &mut Partial<'static>, value: Value) -> Result<()> {
    log::trace!("Decoding {value:?} into {}", partial.path());

    let shape = partial.shape();

    match shape.def {
        Def::Option(_) => {
            if value.is_null() {
                partial.set_default()?;
            } else {
                partial.begin_some()?;
                deserialize_value(partial, value)?;
                partial.end()?;
            }
            return Ok(());
        }
        Def::List(_) => {
            let items = match value {
                Value::Sequence(items) => items,
                Value::Null => Vec::new(),
                scalar => vec![scalar],
            };
            partial.begin_list()?;
            for item in items {
                partial.begin_list_item()?;
                deserialize_value(partial, item)?;
                partial.end()?;
            }
            return Ok(());
        }
        Def::Array(array_def) => {
            let items = match value {
                Value::Sequence(items) => items,
                Value::Null => Vec::new(),
                scalar => vec![scalar],
            };
            if items.len() > array_def.n {
                return Err(CfgErrorKind::InvalidValueForShape(format!(
                    "{shape} holds {} items, found {}",
                    array_def.n,
                    items.len()
                ))
                .into());
            }
            // Positions past the given items take their default.
            let mut items = items.into_iter();
            for idx in 0..array_def.n {
                partial.begin_nth_field(idx)?;
                deserialize_value(partial, items.next().unwrap_or(Value::Null))?;
                partial.end()?;
            }
            return Ok(());
        }
        Def::Map(_) => {
            let entries = match value {
                Value::Mapping(entries) => entries,
                Value::Null => Default::default(),
                other => {
                    return Err(CfgErrorKind::InvalidValueForShape(format!(
                        "expected a mapping for {shape}, found {other}"
                    ))
                    .into());
                }
            };
            partial.begin_map()?;
            for (key, value) in entries {
                partial.begin_key()?;
                deserialize_value(partial, Value::Scalar(key))?;
                partial.end()?;
                partial.begin_value()?;
                deserialize_value(partial, value)?;
                partial.end()?;
            }
            return Ok(());
        }
        _ => {}
    }

    if let Type::User(UserType::Struct(struct_type)) = shape.ty {
        // Transparent wrappers decode as their inner type.
        if shape.inner.is_some() {
            partial.begin_inner()?;
            deserialize_value(partial, value)?;
            partial.end()?;
            return Ok(());
        }

        let mut entries = match value {
            Value::Mapping(entries) => entries,
            Value::Null => Default::default(),
            other => {
                return Err(CfgErrorKind::InvalidValueForShape(format!(
                    "expected a mapping for {shape}, found {other}"
                ))
                .into());
            }
        };

        for (idx, field) in struct_type.fields.iter().enumerate() {
            match entries.remove(field.name) {
                Some(field_value) if is_bound(field.shape()) => {
                    partial.begin_field(field.name)?;
                    deserialize_value(partial, field_value)?;
                    partial.end()?;
                }
                // Fields that are not bound never carry a value and restart from default.
                _ => {
                    partial.set_nth_field_to_default(idx)?;
                }
            }
        }

        for key in entries.keys() {
            log::debug!("Ignoring unknown key '{key}' for {shape}");
        }
        return Ok(());
    }

    if !matches!(shape.def, Def::Scalar) {
        return Err(CfgErrorKind::UnsupportedShape(format!("{:?}", shape.def)).into());
    }

    match value {
        Value::Scalar(text) => deserialize_scalar(partial, text),
        Value::Null => {
            partial.set_default()?;
            Ok(())
        }
        other => Err(CfgErrorKind::InvalidValueForShape(format!(
            "expected a scalar for {shape}, found {other}"
        ))
        .into()),
    }
}

fn deserialize_scalar(partial: &mut Partial<'static>, text: String) -> Result<()> {
    let shape = partial.shape();

    if shape == String::SHAPE {
        partial.set(text)?;
        return Ok(());
    }
    if !shape.vtable.has_parse() {
        return Err(
            CfgErrorKind::UnsupportedShape(format!("no text conversion for {shape}")).into(),
        );
    }

    partial.parse_from_str(text.trim()).map_err(|err| {
        log::debug!("Parsing '{text}' as {shape} failed: {err}");
        CfgErrorKind::InvalidValueForShape(format!("cannot parse '{text}' as {shape}"))
    })?;
    Ok(())
}
