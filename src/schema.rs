//! Reflection of a destination type into the catalog of settable leaves.

use std::{
    fmt::{self, Display},
    path::PathBuf,
};

use facet_core::{Def, Facet, Field, FieldAttribute, Shape, Type, UserType};

use crate::{Result, Segment, Value, options::Registry};

/// One step in a leaf's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNode {
    pub(crate) key: String,
    pub(crate) is_slice: bool,
    pub(crate) is_map: bool,
    pub(crate) map_key: Option<&'static str>,
    pub(crate) usage: String,
}

impl PathNode {
    /// The field's serialized name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// `true` when this node is a list and is followed by an index segment.
    pub fn is_slice(&self) -> bool {
        self.is_slice
    }

    /// `true` when this node is a map and is followed by a key segment.
    pub fn is_map(&self) -> bool {
        self.is_map
    }

    /// Type of the map's keys, for map nodes.
    pub fn map_key(&self) -> Option<&'static str> {
        self.map_key
    }

    /// Usage text of the field at this node.
    pub fn usage(&self) -> &str {
        &self.usage
    }
}

/// The user-facing type of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A plain scalar, such as `String` or `u16`.
    Scalar(&'static str),
    /// An optional scalar.
    Optional(&'static str),
    /// A list of scalars.
    List(&'static str),
    /// A fixed-size array of scalars.
    Array(&'static str, usize),
    /// A map from scalar keys to scalar values.
    Map(&'static str, &'static str),
}

impl FieldType {
    /// `true` for `bool` and `Option<bool>`, which may be given as bare flags.
    pub fn is_bool(&self) -> bool {
        matches!(self, FieldType::Scalar("bool") | FieldType::Optional("bool"))
    }

    /// `true` for lists and arrays of scalars.
    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::List(_) | FieldType::Array(..))
    }

    /// The scalar type found at one value position: the element of a list, the value of
    /// a map, the payload of an option.
    pub fn placeholder(&self) -> &'static str {
        match self {
            FieldType::Scalar(ty)
            | FieldType::Optional(ty)
            | FieldType::List(ty)
            | FieldType::Array(ty, _) => ty,
            FieldType::Map(_, value) => value,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(ty) => write!(f, "{ty}"),
            FieldType::Optional(ty) => write!(f, "Option<{ty}>"),
            FieldType::List(ty) => write!(f, "Vec<{ty}>"),
            FieldType::Array(ty, len) => write!(f, "[{ty}; {len}]"),
            FieldType::Map(key, value) => write!(f, "Map<{key}, {value}>"),
        }
    }
}

/// A settable leaf of the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub(crate) path: Vec<PathNode>,
    pub(crate) short: Option<String>,
    pub(crate) field_type: FieldType,
    pub(crate) default_value: Option<String>,
}

impl FieldInfo {
    /// Nodes from the root down to the leaf.
    pub fn nodes(&self) -> &[PathNode] {
        &self.path
    }

    /// The flag key with `[i]` standing for list indices and `[k]` for map keys,
    /// such as `array[i].key` or `raw-map[k]`.
    pub fn path(&self) -> String {
        self.display_key('.')
    }

    /// The short alias, if it survived the placement rules.
    pub fn short(&self) -> Option<&str> {
        self.short.as_deref()
    }

    /// The leaf's type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// The registered default, rendered as text, when it differs from the zero value.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Usage text of the leaf: the usage of every node on the path, joined by spaces.
    pub fn usage(&self) -> String {
        self.path
            .iter()
            .map(|node| node.usage.trim())
            .filter(|usage| !usage.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Renders the key with `delimiter`, writing `slice_key` into list brackets and `map_key`
    /// into map brackets. A trailing scalar list gets a bracket only when `leaf_index` is set.
    pub(crate) fn key_with(
        &self,
        delimiter: char,
        slice_key: &str,
        map_key: &str,
        leaf_index: bool,
    ) -> String {
        let mut key = String::new();
        let last = self.path.len().saturating_sub(1);
        for (i, node) in self.path.iter().enumerate() {
            if i > 0 {
                key.push(delimiter);
            }
            key.push_str(&node.key);
            let bracket = if node.is_slice && (i != last || leaf_index) {
                Some(slice_key)
            } else if node.is_map {
                Some(map_key)
            } else {
                None
            };
            if let Some(inner) = bracket {
                key.push(delimiter);
                key.push('[');
                key.push_str(inner);
                key.push(']');
            }
        }
        key
    }

    pub(crate) fn display_key(&self, delimiter: char) -> String {
        self.key_with(delimiter, "i", "k", false)
            .replace(&format!("{delimiter}["), "[")
    }

    /// Matches parsed segments against this leaf's path, returning the role of each segment.
    fn match_segments(&self, segments: &[Segment]) -> Option<Vec<Role>> {
        let mut roles = Vec::with_capacity(segments.len());
        let mut position = 0;
        let last = self.path.len().saturating_sub(1);

        for (i, node) in self.path.iter().enumerate() {
            match segments.get(position)? {
                Segment::Key(text) if *text == node.key => roles.push(Role::Field),
                _ => return None,
            }
            position += 1;

            if node.is_slice || node.is_map {
                match segments.get(position) {
                    Some(_) => {
                        roles.push(if node.is_slice { Role::Index } else { Role::MapKey });
                        position += 1;
                    }
                    None if i == last => {}
                    None => return None,
                }
            }
        }

        (position == segments.len()).then_some(roles)
    }
}

/// What a parsed segment addresses once matched against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Field,
    Index,
    MapKey,
}

/// All settable leaves of a destination type, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    fields: Vec<FieldInfo>,
}

impl Catalog {
    /// Walks `shape` depth-first.
    pub(crate) fn build(shape: &'static Shape, registry: &Registry) -> Result<Self> {
        log::trace!("Entering `Catalog::build` for {shape}");

        let mut fields = Vec::new();
        scan(shape, &[], registry, &mut fields)?;

        for field in &mut fields {
            if field.short.is_some() && !short_allowed(&field.path) {
                log::debug!(
                    "Dropping short alias of '{}': it sits below a list or map",
                    field.path()
                );
                field.short = None;
            }
        }

        log::trace!("Exiting `Catalog::build` with {} leaves", fields.len());
        Ok(Catalog { fields })
    }

    /// The leaves.
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// The leaf whose short alias is `alias`.
    pub fn find_by_short(&self, alias: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|field| field.short.as_deref() == Some(alias))
    }

    /// The leaf addressed by `segments`, if any.
    pub fn find_by_path(&self, segments: &[Segment]) -> Option<&FieldInfo> {
        self.resolve(segments).map(|(field, _)| field)
    }

    pub(crate) fn resolve(&self, segments: &[Segment]) -> Option<(&FieldInfo, Vec<Role>)> {
        self.fields
            .iter()
            .find_map(|field| field.match_segments(segments).map(|roles| (field, roles)))
    }

    /// Sorts the leaves with `compare`.
    pub fn sort_by(&mut self, compare: impl FnMut(&FieldInfo, &FieldInfo) -> std::cmp::Ordering) {
        self.fields.sort_by(compare);
    }

    /// Drops every leaf for which `drop` returns `true`.
    pub fn filter(&mut self, mut drop: impl FnMut(&FieldInfo) -> bool) {
        self.fields.retain(|field| !drop(field));
    }
}

/// A short alias is usable only when no list or map sits above the leaf.
fn short_allowed(path: &[PathNode]) -> bool {
    let Some((leaf, ancestors)) = path.split_last() else {
        return false;
    };
    !leaf.is_map && ancestors.iter().all(|node| !node.is_slice && !node.is_map)
}

enum Kind {
    Record(&'static Shape),
    RecordList(&'static Shape),
    RecordMap(&'static Shape, &'static Shape),
    Leaf(FieldType),
    Unsupported,
}

fn scan(
    shape: &'static Shape,
    parent: &[PathNode],
    registry: &Registry,
    out: &mut Vec<FieldInfo>,
) -> Result<()> {
    let Type::User(UserType::Struct(struct_type)) = shape.ty else {
        return Ok(());
    };

    for field in struct_type.fields {
        if is_skipped(field) {
            log::debug!("Skipping field '{}' of {shape}", field.name);
            continue;
        }

        let mut node = PathNode {
            key: field.name.to_string(),
            is_slice: false,
            is_map: false,
            map_key: None,
            usage: resolve_usage(shape, field, registry),
        };
        let mut path = parent.to_vec();

        match classify(field.shape()) {
            Kind::Record(inner) => {
                path.push(node);
                scan(inner, &path, registry, out)?;
            }
            Kind::RecordList(element) => {
                node.is_slice = true;
                path.push(node);
                scan(element, &path, registry, out)?;
            }
            Kind::RecordMap(key, element) => {
                node.is_map = true;
                node.map_key = Some(key.type_identifier);
                path.push(node);
                scan(element, &path, registry, out)?;
            }
            Kind::Leaf(field_type) => {
                match field_type {
                    FieldType::List(_) | FieldType::Array(..) => node.is_slice = true,
                    FieldType::Map(key, _) => {
                        node.is_map = true;
                        node.map_key = Some(key);
                    }
                    _ => {}
                }
                path.push(node);
                out.push(FieldInfo {
                    path,
                    short: attribute_value(field, "short").filter(|s| !s.is_empty()),
                    field_type,
                    default_value: default_for(shape, field.name, registry)?,
                });
            }
            Kind::Unsupported => {
                log::debug!(
                    "Field '{}' of {shape} has unsupported type {}",
                    field.name,
                    field.shape()
                );
            }
        }
    }

    Ok(())
}

fn classify(shape: &'static Shape) -> Kind {
    match shape.def {
        Def::Option(option_def) => {
            let inner = option_def.t;
            if is_record(inner) {
                Kind::Record(inner)
            } else if is_scalar(inner) {
                Kind::Leaf(FieldType::Optional(inner.type_identifier))
            } else {
                Kind::Unsupported
            }
        }
        Def::List(list_def) => {
            let element = unwrap_option(list_def.t());
            if is_record(element) {
                Kind::RecordList(element)
            } else if is_scalar(element) {
                Kind::Leaf(FieldType::List(element.type_identifier))
            } else {
                Kind::Unsupported
            }
        }
        Def::Array(array_def) => {
            let element = unwrap_option(array_def.t());
            if is_record(element) {
                Kind::RecordList(element)
            } else if is_scalar(element) {
                Kind::Leaf(FieldType::Array(element.type_identifier, array_def.n))
            } else {
                Kind::Unsupported
            }
        }
        Def::Map(map_def) => {
            let key = map_def.k();
            let value = unwrap_option(map_def.v());
            if !is_scalar(key) {
                Kind::Unsupported
            } else if is_record(value) {
                Kind::RecordMap(key, value)
            } else if is_scalar(value) {
                Kind::Leaf(FieldType::Map(key.type_identifier, value.type_identifier))
            } else {
                Kind::Unsupported
            }
        }
        _ if is_record(shape) => Kind::Record(shape),
        _ if is_scalar(shape) => Kind::Leaf(FieldType::Scalar(shape.type_identifier)),
        _ => Kind::Unsupported,
    }
}

fn unwrap_option(shape: &'static Shape) -> &'static Shape {
    match shape.def {
        Def::Option(option_def) => option_def.t,
        _ => shape,
    }
}

fn is_record(shape: &Shape) -> bool {
    matches!(shape.ty, Type::User(UserType::Struct(_))) && shape.inner.is_none()
}

/// A scalar is bound when its text can be both parsed and rendered. Transparent newtypes
/// follow their inner type.
fn is_scalar(shape: &Shape) -> bool {
    if matches!(shape.def, Def::Scalar) {
        return shape.vtable.has_parse()
            && (shape.vtable.has_display() || shape == PathBuf::SHAPE);
    }
    match shape.inner {
        Some(inner) if matches!(shape.ty, Type::User(UserType::Struct(_))) => is_scalar(inner()),
        _ => false,
    }
}

/// `true` when values of `shape` take part in decoding: records, bindable scalars and the
/// options, lists, arrays and maps built from them.
pub(crate) fn is_bound(shape: &'static Shape) -> bool {
    !matches!(classify(shape), Kind::Unsupported)
}

/// Fields marked `#[facet(skip)]` are never bound.
pub(crate) fn is_skipped(field: &Field) -> bool {
    field.attributes.contains(&FieldAttribute::Arbitrary("skip"))
}

/// Provider, then the type's own [`FieldUsage`](crate::FieldUsage), then the `usage`
/// attribute, then the doc comment.
fn resolve_usage(parent: &'static Shape, field: &Field, registry: &Registry) -> String {
    if let Some(usage) = registry.usage(parent, field.name) {
        return usage;
    }
    if let Some(usage) = attribute_value(field, "usage") {
        return usage;
    }
    field
        .doc
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads `name = "value"` out of the field's arbitrary attributes.
fn attribute_value(field: &Field, name: &str) -> Option<String> {
    field.attributes.iter().find_map(|attr| {
        let FieldAttribute::Arbitrary(raw) = attr;
        let (key, value) = raw.split_once('=')?;
        if key.trim() != name {
            return None;
        }
        let value = value.trim();
        let unquoted = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some(unquoted.replace("\\\"", "\""))
    })
}

/// The registered default of `field` on the record `parent`, when it differs from zero.
fn default_for(parent: &'static Shape, field: &str, registry: &Registry) -> Result<Option<String>> {
    let Some(seed) = registry.seed(parent)? else {
        return Ok(None);
    };
    let seeded = seed.seeded.get(field);
    if seeded == seed.zero.get(field) {
        return Ok(None);
    }
    Ok(seeded.filter(|value| !value.is_null()).map(Value::to_string))
}
