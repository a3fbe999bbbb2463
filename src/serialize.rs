use std::{collections::BTreeMap, path::PathBuf};

use facet_core::{Def, Type, UserType};
use facet_reflect::{HasFields, Peek};

use crate::{CfgErrorKind, Result, Value, schema::is_bound};

/// Captures a value as a [`Value`] tree.
///
/// Structs become mappings keyed by serialized field name, lists and arrays become
/// sequences, maps become mappings keyed by the key's display text, `None` becomes
/// [`Value::Null`] and scalars become their display text. Struct fields whose type is not
/// bound are left out.
pub(crate) fn to_value(peek: Peek<'_, '_>) -> Result<Value> {
    let shape = peek.shape();

    match shape.def {
        Def::Option(_) => {
            let option = peek.into_option()?;
            return match option.value() {
                Some(inner) => to_value(inner),
                None => Ok(Value::Null),
            };
        }
        Def::List(_) | Def::Array(_) => {
            let list = peek.into_list_like()?;
            let items = list.iter().map(to_value).collect::<Result<Vec<_>>>()?;
            return Ok(Value::Sequence(items));
        }
        Def::Map(_) => {
            let map = peek.into_map()?;
            let mut entries = BTreeMap::new();
            for (key, value) in map.iter() {
                entries.insert(scalar_text(key)?, to_value(value)?);
            }
            return Ok(Value::Mapping(entries));
        }
        Def::Scalar => return scalar_text(peek).map(Value::Scalar),
        _ => {}
    }

    if let Type::User(UserType::Struct(_)) = shape.ty {
        // Transparent wrappers capture as their inner value.
        if shape.inner.is_some() {
            return to_value(unwrap_transparent(peek)?);
        }

        let struct_peek = peek.into_struct()?;
        let mut entries = BTreeMap::new();
        for (field, field_peek) in struct_peek.fields() {
            let field_shape = field.shape();
            if !is_bound(field_shape) {
                log::debug!(
                    "Leaving '{}' of {shape} out: {field_shape} is not bound",
                    field.name
                );
                continue;
            }
            entries.insert(field.name.to_string(), to_value(field_peek)?);
        }
        return Ok(Value::Mapping(entries));
    }

    Err(CfgErrorKind::UnsupportedShape(format!("cannot capture {shape}")).into())
}

/// Display text of a scalar. Paths have no display of their own and render lossily.
fn scalar_text(peek: Peek<'_, '_>) -> Result<String> {
    let shape = peek.shape();
    if matches!(shape.ty, Type::User(UserType::Struct(_))) && shape.inner.is_some() {
        return scalar_text(unwrap_transparent(peek)?);
    }
    if let Ok(path) = peek.get::<PathBuf>() {
        return Ok(path.display().to_string());
    }
    if !shape.vtable.has_display() {
        return Err(
            CfgErrorKind::UnsupportedShape(format!("no text form for {shape}")).into(),
        );
    }
    Ok(peek.to_string())
}

fn unwrap_transparent<'mem, 'facet>(peek: Peek<'mem, 'facet>) -> Result<Peek<'mem, 'facet>> {
    let shape = peek.shape();
    let inner = peek.innermost_peek();
    if inner.shape() == shape {
        return Err(CfgErrorKind::UnsupportedShape(format!(
            "cannot borrow the inner value of {shape}"
        ))
        .into());
    }
    Ok(inner)
}
