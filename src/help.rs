use std::cmp::Ordering;

use unicode_width::UnicodeWidthStr;

use crate::{Catalog, Entry, FieldInfo, Options, synthesize, tokenize::split_path};

type Sorter = Box<dyn Fn(&FieldInfo, &FieldInfo) -> Ordering>;
type Filter = Box<dyn Fn(&FieldInfo) -> bool>;

/// Ordering and filtering applied to the catalog before help is rendered.
///
/// Without a sorter, leaves are ordered by [`path_sorter`].
#[derive(Default)]
pub struct HelpOptions {
    sorter: Option<Sorter>,
    filter: Option<Filter>,
}

impl HelpOptions {
    /// Ordered by flag key, nothing filtered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders leaves with `sorter` instead of [`path_sorter`].
    pub fn with_sorter(
        mut self,
        sorter: impl Fn(&FieldInfo, &FieldInfo) -> Ordering + 'static,
    ) -> Self {
        self.sorter = Some(Box::new(sorter));
        self
    }

    /// Drops every leaf for which `filter` returns `true`.
    pub fn with_filter(mut self, filter: impl Fn(&FieldInfo) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    fn prepare(&self, catalog: &Catalog) -> Catalog {
        let mut catalog = catalog.clone();
        if let Some(filter) = &self.filter {
            catalog.filter(|field| filter(field));
        }
        match &self.sorter {
            Some(sorter) => catalog.sort_by(|a, b| sorter(a, b)),
            None => catalog.sort_by(path_sorter),
        }
        catalog
    }
}

/// Orders leaves by their flag key.
pub fn path_sorter(a: &FieldInfo, b: &FieldInfo) -> Ordering {
    a.path().cmp(&b.path())
}

/// One row per leaf: short alias, long flag, type, registered default and usage.
///
/// The default cell reads `(default: v)` when a registered default differs from the zero
/// value and is empty otherwise.
pub(crate) fn render_flags(catalog: &Catalog, options: &Options, help: &HelpOptions) -> String {
    log::trace!("Entering `render_flags` function");

    let catalog = help.prepare(catalog);
    let rows: Vec<[String; 5]> = catalog
        .fields()
        .iter()
        .map(|field| {
            let short = field
                .short()
                .map(|alias| format!("{}{alias},", options.prefix_short()))
                .unwrap_or_default();
            let long = format!(
                "{}{}",
                options.prefix_long(),
                field.display_key(options.key_delimiter())
            );
            let default_value = field
                .default_value()
                .map(|value| format!("(default: {value})"))
                .unwrap_or_default();
            [
                short,
                long,
                field.field_type().to_string(),
                default_value,
                field.usage(),
            ]
        })
        .collect();

    let mut widths = [0usize; 5];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let mut out = String::new();
    for row in &rows {
        let mut line = String::from("  ");
        for (i, (cell, width)) in row.iter().zip(widths).enumerate() {
            if i > 0 && width > 0 {
                line.push_str("  ");
            }
            line.push_str(cell);
            line.push_str(&" ".repeat(width - cell.width()));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// An example document: every leaf with its type as the value and its usage as a comment.
/// List leaves show one element and map leaves one `k` key. Entries are laid out in key
/// order like any synthesized document, so only the filter applies here.
pub(crate) fn render_document(
    catalog: &Catalog,
    options: &Options,
    help: &HelpOptions,
) -> String {
    log::trace!("Entering `render_document` function");

    let delimiter = options.key_delimiter();
    let entries = help
        .prepare(catalog)
        .fields()
        .iter()
        .map(|field| {
            let key = field.key_with(delimiter, "0", "k", true);
            Entry::new(split_path(&key, delimiter), field.field_type().placeholder())
                .with_comment(field.usage())
        })
        .collect();

    synthesize(entries).into_string()
}
