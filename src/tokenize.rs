//! Turns raw flags and environment pairs into path/value entries.

use std::fmt::{self, Display};

use regex::Regex;

use crate::{Catalog, CfgErrorKind, FieldInfo, Options, Result, schema::Role};

/// Digits of the index given to repeated scalar list flags.
const ORDINAL_WIDTH: usize = 6;

/// One step of a parsed flag key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A field name or map key.
    Key(String),
    /// Text that was written inside `[...]`.
    Bracket(String),
}

impl Segment {
    /// The segment's text without brackets.
    pub fn text(&self) -> &str {
        match self {
            Segment::Key(text) | Segment::Bracket(text) => text,
        }
    }

    /// `true` for a bracket segment holding a non-negative integer.
    pub fn is_index(&self) -> bool {
        matches!(
            self,
            Segment::Bracket(text) if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
        )
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(text) => write!(f, "{text}"),
            Segment::Bracket(text) => write!(f, "[{text}]"),
        }
    }
}

/// A recognized flag: where it goes and the raw text it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Segments from the root to the assigned position.
    pub path: Vec<Segment>,
    /// The value text, with any user-supplied outer quotes removed.
    pub value: String,
    /// Trailing comment written after the value.
    pub comment: Option<String>,
}

impl Entry {
    /// An entry without a comment.
    pub fn new(path: Vec<Segment>, value: impl Into<String>) -> Self {
        Self {
            path,
            value: value.into(),
            comment: None,
        }
    }

    /// Attaches a trailing comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = (!comment.is_empty()).then_some(comment);
        self
    }
}

/// Recognizes long flags, short aliases and their values.
///
/// Tokens are tried in order: short alias with value, bare short alias, long flag with
/// value, bare long flag. Anything else is ignored.
pub struct Tokenizer<'a> {
    options: &'a Options,
    catalog: Option<&'a Catalog>,
    long_assign: Regex,
    long_bare: Regex,
    short_assign: Regex,
    short_bare: Regex,
}

impl<'a> Tokenizer<'a> {
    /// Prepares the flag patterns for `options`. Without a catalog, short aliases are never
    /// recognized and bracket segments are taken as written.
    ///
    /// Prefixes and the assign sign are escaped, so this only fails when a pattern outgrows
    /// the regex size limit.
    pub fn new(options: &'a Options, catalog: Option<&'a Catalog>) -> Result<Self> {
        let assign = regex::escape(&options.assign_sign().to_string());
        let long = regex::escape(options.prefix_long());
        let short = regex::escape(options.prefix_short());
        let pattern = |prefix: &str, with_value: bool| {
            let source = if with_value {
                format!("(?s)^{prefix}([^{assign}]*){assign}(.*)$")
            } else {
                format!("(?s)^{prefix}([^{assign}]*)$")
            };
            Regex::new(&source).map_err(CfgErrorKind::InvalidFlagSyntax)
        };

        Ok(Self {
            options,
            catalog,
            long_assign: pattern(&long, true)?,
            long_bare: pattern(&long, false)?,
            short_assign: pattern(&short, true)?,
            short_bare: pattern(&short, false)?,
        })
    }

    /// Tokenizes `args` in order.
    pub fn tokenize(&self, args: &[String]) -> Vec<Entry> {
        log::trace!("Entering `tokenize` method with {} arguments", args.len());

        let mut entries = Vec::new();
        let mut index = 0;
        while index < args.len() {
            let ordinal = index;
            let arg = &args[index];
            index += 1;

            let is_long = self.is_long(arg);
            let (key, value) = if let Some((key, value)) =
                self.try_short_assign(arg).filter(|_| !is_long)
            {
                (key, value)
            } else if let Some((key, value, consumed)) = (!is_long)
                .then(|| self.try_short_bare(arg, args.get(index)))
                .flatten()
            {
                if consumed {
                    index += 1;
                }
                (key, value)
            } else if let Some(captures) = self.long_assign.captures(arg) {
                (captures[1].to_string(), captures[2].to_string())
            } else if let Some(captures) = self.long_bare.captures(arg) {
                (captures[1].to_string(), "true".to_string())
            } else {
                log::debug!("Ignoring argument {arg:?}");
                continue;
            };

            let mut path = split_path(&key, self.options.key_delimiter());
            if path.is_empty() {
                log::debug!("Ignoring argument {arg:?} with an empty key");
                continue;
            }
            self.refine(&mut path, ordinal);

            entries.push(Entry::new(path, unwrap_quotes(&value)));
        }

        log::trace!("Exiting `tokenize` method with {} entries", entries.len());
        entries
    }

    /// A token carrying the long prefix is never read as a short alias, even when the short
    /// prefix is a prefix of the long one.
    fn is_long(&self, arg: &str) -> bool {
        let long = self.options.prefix_long();
        long.len() > self.options.prefix_short().len() && arg.starts_with(long)
    }

    fn short_field(&self, alias: &str) -> Option<&'a FieldInfo> {
        self.catalog?.find_by_short(alias)
    }

    fn try_short_assign(&self, arg: &str) -> Option<(String, String)> {
        let captures = self.short_assign.captures(arg)?;
        let field = self.short_field(&captures[1])?;
        Some((self.canonical_key(field), captures[2].to_string()))
    }

    /// A bare short alias is `true` for booleans and takes the next argument otherwise.
    fn try_short_bare(&self, arg: &str, next: Option<&String>) -> Option<(String, String, bool)> {
        let captures = self.short_bare.captures(arg)?;
        let field = self.short_field(&captures[1])?;
        let key = self.canonical_key(field);
        if field.field_type.is_bool() {
            return Some((key, "true".to_string(), false));
        }
        match next {
            Some(value) => Some((key, value.clone(), true)),
            None => {
                log::debug!("Short alias {arg:?} is missing its value");
                None
            }
        }
    }

    fn canonical_key(&self, field: &FieldInfo) -> String {
        field.key_with(self.options.key_delimiter(), "0", "", false)
    }

    /// Resolves list and map segments against the catalog and gives un-indexed scalar list
    /// flags an index from their position on the command line.
    fn refine(&self, path: &mut Vec<Segment>, ordinal: usize) {
        let Some((field, roles)) = self.catalog.and_then(|catalog| catalog.resolve(path)) else {
            return;
        };

        let indexed = roles.last() == Some(&Role::Index);
        for (segment, role) in path.iter_mut().zip(roles) {
            *segment = match (role, std::mem::replace(segment, Segment::Key(String::new()))) {
                (Role::Index, Segment::Key(text)) => Segment::Bracket(text),
                (Role::MapKey, Segment::Bracket(text)) => Segment::Key(text),
                (_, segment) => segment,
            };
        }

        if field.field_type.is_list() && !indexed {
            path.push(Segment::Bracket(format!("{ordinal:0width$}", width = ORDINAL_WIDTH)));
        }
    }
}

/// Tokenizes `args` with an optional catalog.
pub fn tokenize(
    args: &[String],
    catalog: Option<&Catalog>,
    options: &Options,
) -> Result<Vec<Entry>> {
    Ok(Tokenizer::new(options, catalog)?.tokenize(args))
}

/// Collects the values of `NAME=token` entries whose name starts with the env prefix.
///
/// Each kept value is one token, as if it had been passed on the command line. The prefix
/// is used as a pattern anchored at the start of the name and must compile.
pub fn env_to_args<I, S>(env: I, options: &Options) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if options.prefix_env().is_empty() {
        return Ok(Vec::new());
    }

    let pattern = Regex::new(&format!("(?s)^{}[^=]*=(.*)$", options.prefix_env()))?;
    let args = env
        .into_iter()
        .filter_map(|pair| {
            let captures = pattern.captures(pair.as_ref())?;
            Some(captures[1].to_string())
        })
        .collect::<Vec<_>>();

    log::debug!("Environment yielded {} tokens", args.len());
    Ok(args)
}

/// Splits a key on `delimiter`, keeping delimiters inside brackets.
///
/// A bracket glued to the previous segment starts a new one, so `array[0].key` and
/// `array.[0].key` split the same way.
pub(crate) fn split_path(key: &str, delimiter: char) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    let mut flush = |current: &mut String| {
        if current.is_empty() {
            return;
        }
        let text = std::mem::take(current);
        let segment = match text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            Some(inner) => Segment::Bracket(inner.to_string()),
            None => Segment::Key(text),
        };
        segments.push(segment);
    };

    for c in key.chars() {
        match c {
            '[' if depth == 0 => {
                flush(&mut current);
                depth += 1;
                current.push(c);
            }
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' if depth > 0 => {
                depth -= 1;
                current.push(c);
                if depth == 0 {
                    flush(&mut current);
                }
            }
            c if c == delimiter && depth == 0 => flush(&mut current),
            c => current.push(c),
        }
    }
    flush(&mut current);

    segments
}

/// Removes one pair of surrounding double quotes the user already wrote.
fn unwrap_quotes(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        _ => value.to_string(),
    }
}
