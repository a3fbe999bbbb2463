#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use std::{
    error::Error,
    fmt::{self, Display},
    io::Read,
};

use facet_core::Facet;
use facet_reflect::{Peek, ReflectError};

mod defaults;
mod deserialize;
mod document;
mod help;
mod options;
mod schema;
mod serialize;
mod synthesize;
mod tokenize;

pub use document::{Value, parse_document};
pub use help::{HelpOptions, path_sorter};
pub use options::{FieldUsage, Options};
pub use schema::{Catalog, FieldInfo, FieldType, PathNode};
pub use synthesize::{DocumentReader, synthesize};
pub use tokenize::{Entry, Segment, Tokenizer, env_to_args, tokenize};

use options::Registry;

/// Error type for binding flags, environment variables and documents onto a destination.
#[derive(Debug)]
pub struct CfgError {
    kind: CfgErrorKind,
}

impl CfgError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &CfgErrorKind {
        &self.kind
    }
}

impl Display for CfgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")
    }
}
impl Error for CfgError {}

impl<K: Into<CfgErrorKind>> From<K> for CfgError {
    fn from(value: K) -> Self {
        let kind = value.into();
        CfgError { kind }
    }
}

/// Detailed classification of binding errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum CfgErrorKind {
    /// The environment prefix does not compile into a matching pattern.
    InvalidEnvPrefix(regex::Error),
    /// The flag prefixes and assign sign do not compile into flag patterns.
    InvalidFlagSyntax(regex::Error),
    /// The synthesized (or supplied) document is malformed.
    Document {
        /// One-based line number of the offending line, `0` when it is unknown.
        line: usize,
        /// What went wrong on that line.
        message: String,
    },
    /// Error from the reflection system while reading or building a value.
    Reflect(ReflectError),
    /// The destination contains a shape that cannot be bound.
    UnsupportedShape(String),
    /// A document value does not fit the shape it is decoded into.
    InvalidValueForShape(String),
    /// Reading the document stream failed.
    Io(String),
}

impl Display for CfgErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CfgErrorKind::InvalidEnvPrefix(regex_error) => {
                write!(f, "invalid environment prefix: {regex_error}")
            }
            CfgErrorKind::InvalidFlagSyntax(regex_error) => {
                write!(f, "invalid flag syntax: {regex_error}")
            }
            CfgErrorKind::Document { line, message } => {
                write!(f, "malformed document at line {line}: {message}")
            }
            CfgErrorKind::Reflect(reflect_error) => write!(f, "{reflect_error}"),
            CfgErrorKind::UnsupportedShape(msg) => write!(f, "unsupported shape: {msg}"),
            CfgErrorKind::InvalidValueForShape(msg) => {
                write!(f, "invalid value for shape: {msg}")
            }
            CfgErrorKind::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl From<regex::Error> for CfgErrorKind {
    fn from(value: regex::Error) -> Self {
        Self::InvalidEnvPrefix(value)
    }
}

impl From<ReflectError> for CfgErrorKind {
    fn from(value: ReflectError) -> Self {
        Self::Reflect(value)
    }
}

impl From<std::io::Error> for CfgErrorKind {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, CfgError>;

/// A binding session over one destination value.
///
/// The session owns its [`Options`], the registered default setters and usage providers,
/// and the first-parse flag. Every `parse_*` call decodes into a fresh value that starts
/// from the destination's current contents and replaces the destination on success.
///
/// # Example
/// ```
/// # use facet::Facet;
/// # use facet_cfg::Config;
/// #[derive(Facet, Default)]
/// struct Server {
///     #[facet(short = "p")]
///     port: u16,
///     host: String,
///     tags: Vec<String>,
/// }
///
/// # fn main() -> Result<(), facet_cfg::CfgError> {
/// let mut server = Server::default();
/// Config::new(&mut server)
///     .with_defaults(|s: &mut Server| s.host = "localhost".into())
///     .parse_args(["-p", "8080", "--tags=a", "--tags=b"])?;
/// assert_eq!(server.port, 8080);
/// assert_eq!(server.host, "localhost");
/// assert_eq!(server.tags, ["a", "b"]);
/// # Ok(())
/// # }
/// ```
pub struct Config<'dest, T: Facet<'static>> {
    dest: &'dest mut T,
    options: Options,
    registry: Registry,
    first_parse: bool,
}

impl<'dest, T: Facet<'static>> Config<'dest, T> {
    /// Starts a session over `dest` with default [`Options`].
    pub fn new(dest: &'dest mut T) -> Self {
        Self {
            dest,
            options: Options::default(),
            registry: Registry::default(),
            first_parse: true,
        }
    }

    /// Replaces all options at once.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Sets the character separating path segments in flag keys (default `.`).
    pub fn with_key_delimiter(mut self, delimiter: char) -> Self {
        self.options = self.options.with_key_delimiter(delimiter);
        self
    }

    /// Sets the character separating a flag key from its value (default `=`).
    pub fn with_assign_sign(mut self, sign: char) -> Self {
        self.options = self.options.with_assign_sign(sign);
        self
    }

    /// Sets the prefix introducing long flags (default `--`).
    pub fn with_prefix_long(mut self, prefix: impl Into<String>) -> Self {
        self.options = self.options.with_prefix_long(prefix);
        self
    }

    /// Sets the prefix introducing short aliases (default `-`).
    pub fn with_prefix_short(mut self, prefix: impl Into<String>) -> Self {
        self.options = self.options.with_prefix_short(prefix);
        self
    }

    /// Sets the prefix selecting environment variables (default `CFG_`, empty disables them).
    pub fn with_prefix_env(mut self, prefix: impl Into<String>) -> Self {
        self.options = self.options.with_prefix_env(prefix);
        self
    }

    /// Controls whether defaults are applied before the first parse (default `true`).
    pub fn with_auto_apply_defaults(mut self, auto_apply: bool) -> Self {
        self.options = self.options.with_auto_apply_defaults(auto_apply);
        self
    }

    /// Registers a default setter for every value of type `D` in the destination tree.
    ///
    /// The setter is called at most once per session. Its effect is recorded as the difference
    /// between `D::default()` before and after the call, and that difference is overlaid
    /// wherever a `D` is defaulted or freshly created by a flag.
    pub fn with_defaults<D>(mut self, setter: impl Fn(&mut D) + 'static) -> Self
    where
        D: Facet<'static> + Default + 'static,
    {
        self.registry.register_defaults(setter);
        self
    }

    /// Registers a usage provider for the fields of type `D`.
    ///
    /// The provider receives a default `D` and the field's serialized name. An empty answer
    /// falls through to [`FieldUsage`], then to the `usage` attribute, then to doc comments.
    pub fn with_usage<D>(mut self, provider: impl Fn(&D, &str) -> String + 'static) -> Self
    where
        D: Facet<'static> + Default + 'static,
    {
        self.registry.register_usage(provider);
        self
    }

    /// Registers `D`'s own [`FieldUsage`] implementation as a usage source.
    pub fn with_field_usage<D>(mut self) -> Self
    where
        D: Facet<'static> + Default + FieldUsage + 'static,
    {
        self.registry.register_field_usage::<D>();
        self
    }

    /// The options in effect.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Read access to the destination.
    pub fn destination(&self) -> &T {
        self.dest
    }

    /// Reflects the destination type into its catalog of settable leaves.
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::build(T::SHAPE, &self.registry)
    }

    /// Overlays registered defaults onto the destination.
    ///
    /// Only positions holding a struct are touched: the root, nested struct fields and
    /// populated `Option`s of structs. Collection elements are left alone.
    pub fn apply_defaults(&mut self) -> Result<()> {
        log::trace!("Entering `apply_defaults` method");

        if !self.registry.has_defaults() {
            log::debug!("No default setters registered, leaving destination untouched");
            return Ok(());
        }

        let current = serialize::to_value(Peek::new(&*self.dest))?;
        let applied = defaults::apply(T::SHAPE, current, &self.registry)?;
        *self.dest = deserialize::from_value(applied)?;

        log::trace!("Exiting `apply_defaults` method");
        Ok(())
    }

    /// Binds command-line arguments onto the destination.
    ///
    /// Arguments that are not recognized flags are ignored. An empty argument list only
    /// applies the first-parse defaults.
    pub fn parse_args<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        log::trace!("Entering `parse_args` method with {} arguments", args.len());

        self.before_parse()?;
        if args.is_empty() {
            return Ok(());
        }

        let catalog = self.catalog()?;
        let entries = tokenize(&args, Some(&catalog), &self.options)?;
        if entries.is_empty() {
            log::debug!("No recognized flags among {} arguments", args.len());
            return Ok(());
        }

        self.decode(synthesize(entries))?;

        log::trace!("Exiting `parse_args` method");
        Ok(())
    }

    /// Binds the process arguments, without the program name.
    pub fn parse_os_args(&mut self) -> Result<()> {
        self.parse_args(std::env::args().skip(1))
    }

    /// Binds environment entries of the form `NAME=token`.
    ///
    /// Every entry whose name starts with the env prefix contributes its value as one
    /// command-line token, so `CFG_0=--port=80` behaves like the argument `--port=80`.
    /// With an empty prefix this is a no-op. The prefix is compiled as a pattern, so a prefix
    /// that is not a valid pattern fails with [`CfgErrorKind::InvalidEnvPrefix`].
    pub fn parse_env<I, S>(&mut self, env: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        log::trace!("Entering `parse_env` method");

        if self.options.prefix_env().is_empty() {
            log::debug!("No environment prefix configured, skipping environment");
            return Ok(());
        }

        let args = env_to_args(env, &self.options)?;
        self.parse_args(args)
    }

    /// Binds the process environment.
    pub fn parse_os_env(&mut self) -> Result<()> {
        let vars: Vec<String> = std::env::vars()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        self.parse_env(vars)
    }

    /// Binds a YAML document, for example a saved configuration.
    pub fn parse_document<R: Read>(&mut self, reader: R) -> Result<()> {
        log::trace!("Entering `parse_document` method");

        self.before_parse()?;
        self.decode(reader)?;

        log::trace!("Exiting `parse_document` method");
        Ok(())
    }

    /// Renders the flag table.
    pub fn help_flags(&self, help: &HelpOptions) -> Result<String> {
        let catalog = self.catalog()?;
        Ok(help::render_flags(&catalog, &self.options, help))
    }

    /// Renders an example document with type names as values and usage as comments.
    pub fn help_document(&self, help: &HelpOptions) -> Result<String> {
        let catalog = self.catalog()?;
        Ok(help::render_document(&catalog, &self.options, help))
    }

    fn before_parse(&mut self) -> Result<()> {
        if self.first_parse && self.options.auto_apply_defaults() {
            log::debug!("First parse, applying registered defaults");
            self.apply_defaults()?;
        }
        self.first_parse = false;
        Ok(())
    }

    fn decode<R: Read>(&mut self, reader: R) -> Result<()> {
        let document = parse_document(reader)?;
        if document.is_null() {
            log::debug!("Empty document, nothing to decode");
            return Ok(());
        }

        let current = serialize::to_value(Peek::new(&*self.dest))?;
        let merged = defaults::merge(T::SHAPE, current, document, &self.registry)?;
        *self.dest = deserialize::from_value(merged)?;
        Ok(())
    }
}
