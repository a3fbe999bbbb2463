//! Session options and the registries of default setters and usage providers.

use std::cell::OnceCell;

use facet_core::{Facet, Shape};
use facet_reflect::Peek;

use crate::{Result, Value, serialize};

/// Lexical settings for flags and environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    key_delimiter: char,
    assign_sign: char,
    prefix_long: String,
    prefix_short: String,
    prefix_env: String,
    auto_apply_defaults: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            key_delimiter: '.',
            assign_sign: '=',
            prefix_long: "--".to_string(),
            prefix_short: "-".to_string(),
            prefix_env: "CFG_".to_string(),
            auto_apply_defaults: true,
        }
    }
}

impl Options {
    /// Sets the character separating path segments.
    pub fn with_key_delimiter(mut self, delimiter: char) -> Self {
        self.key_delimiter = delimiter;
        self
    }

    /// Sets the character separating a key from its value.
    pub fn with_assign_sign(mut self, sign: char) -> Self {
        self.assign_sign = sign;
        self
    }

    /// Sets the long flag prefix.
    pub fn with_prefix_long(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_long = prefix.into();
        self
    }

    /// Sets the short alias prefix.
    pub fn with_prefix_short(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_short = prefix.into();
        self
    }

    /// Sets the environment variable prefix. An empty prefix disables environment binding.
    pub fn with_prefix_env(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_env = prefix.into();
        self
    }

    /// Controls automatic default application on the first parse.
    pub fn with_auto_apply_defaults(mut self, auto_apply: bool) -> Self {
        self.auto_apply_defaults = auto_apply;
        self
    }

    /// Path segment delimiter.
    pub fn key_delimiter(&self) -> char {
        self.key_delimiter
    }

    /// Key/value separator.
    pub fn assign_sign(&self) -> char {
        self.assign_sign
    }

    /// Long flag prefix.
    pub fn prefix_long(&self) -> &str {
        &self.prefix_long
    }

    /// Short alias prefix.
    pub fn prefix_short(&self) -> &str {
        &self.prefix_short
    }

    /// Environment variable prefix.
    pub fn prefix_env(&self) -> &str {
        &self.prefix_env
    }

    /// Whether defaults are applied on the first parse.
    pub fn auto_apply_defaults(&self) -> bool {
        self.auto_apply_defaults
    }
}

/// Implemented by record types that describe their own fields.
///
/// Consulted for a field when no usage provider registered with
/// [`Config::with_usage`](crate::Config::with_usage) answers for it.
pub trait FieldUsage {
    /// Usage text for the field with the given serialized name, or `None`.
    fn field_usage(&self, field: &str) -> Option<String>;
}

/// The recorded effect of a default setter: the type's zero value and the value after
/// the setter ran, both as value trees.
#[derive(Debug, Clone)]
pub(crate) struct Seed {
    pub(crate) zero: Value,
    pub(crate) seeded: Value,
}

type SeedFn = Box<dyn Fn() -> Result<Seed>>;
type UsageFn = Box<dyn Fn(&str) -> Option<String>>;

struct DefaultSetter {
    shape: &'static Shape,
    compute: SeedFn,
    seed: OnceCell<Seed>,
}

struct UsageSource {
    shape: &'static Shape,
    resolve: UsageFn,
}

/// Per-session lookups keyed by record shape.
#[derive(Default)]
pub(crate) struct Registry {
    defaults: Vec<DefaultSetter>,
    usage_providers: Vec<UsageSource>,
    field_usages: Vec<UsageSource>,
}

impl Registry {
    pub(crate) fn register_defaults<D>(&mut self, setter: impl Fn(&mut D) + 'static)
    where
        D: Facet<'static> + Default + 'static,
    {
        log::trace!("Registering default setter for {}", D::SHAPE);

        let compute = move || -> Result<Seed> {
            let zero = D::default();
            let mut seeded = D::default();
            setter(&mut seeded);
            Ok(Seed {
                zero: serialize::to_value(Peek::new(&zero))?,
                seeded: serialize::to_value(Peek::new(&seeded))?,
            })
        };

        // A later registration for the same type replaces the earlier one.
        self.defaults.retain(|d| d.shape != D::SHAPE);
        self.defaults.push(DefaultSetter {
            shape: D::SHAPE,
            compute: Box::new(compute),
            seed: OnceCell::new(),
        });
    }

    pub(crate) fn register_usage<D>(&mut self, provider: impl Fn(&D, &str) -> String + 'static)
    where
        D: Facet<'static> + Default + 'static,
    {
        let resolve = move |field: &str| {
            let usage = provider(&D::default(), field);
            (!usage.is_empty()).then_some(usage)
        };
        self.usage_providers.retain(|u| u.shape != D::SHAPE);
        self.usage_providers.push(UsageSource {
            shape: D::SHAPE,
            resolve: Box::new(resolve),
        });
    }

    pub(crate) fn register_field_usage<D>(&mut self)
    where
        D: Facet<'static> + Default + FieldUsage + 'static,
    {
        let resolve = |field: &str| D::default().field_usage(field).filter(|u| !u.is_empty());
        self.field_usages.retain(|u| u.shape != D::SHAPE);
        self.field_usages.push(UsageSource {
            shape: D::SHAPE,
            resolve: Box::new(resolve),
        });
    }

    pub(crate) fn has_defaults(&self) -> bool {
        !self.defaults.is_empty()
    }

    /// The seed for `shape`, computing it on first request.
    pub(crate) fn seed(&self, shape: &'static Shape) -> Result<Option<&Seed>> {
        let Some(setter) = self.defaults.iter().find(|d| d.shape == shape) else {
            return Ok(None);
        };

        if let Some(seed) = setter.seed.get() {
            return Ok(Some(seed));
        }

        log::debug!("Running default setter for {shape}");
        let seed = (setter.compute)()?;
        Ok(Some(setter.seed.get_or_init(|| seed)))
    }

    /// Usage text for `field` of the record `shape`, from a provider or the type itself.
    pub(crate) fn usage(&self, shape: &'static Shape, field: &str) -> Option<String> {
        let lookup = |sources: &[UsageSource]| {
            sources
                .iter()
                .filter(|source| source.shape == shape)
                .find_map(|source| (source.resolve)(field))
        };
        lookup(&self.usage_providers).or_else(|| lookup(&self.field_usages))
    }
}
