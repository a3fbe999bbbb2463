#![allow(missing_docs)]

use std::collections::BTreeMap;

use facet::Facet;
use facet_cfg::{Config, HelpOptions, path_sorter};
use indoc::indoc;

#[derive(Facet, Default)]
struct Flags {
    /// Bool usage
    #[facet(rename = "bool")]
    flag: bool,
    /// The name
    #[facet(short = "n")]
    name: String,
}

#[derive(Facet, Default)]
struct Doc {
    #[facet(short = "n")]
    name: String,
    /// Upstreams:
    servers: Vec<Server>,
    /// Labels to attach
    labels: BTreeMap<String, u32>,
}

#[derive(Facet, Default)]
struct Server {
    /// Host to reach
    host: String,
    port: u16,
}

#[derive(Facet, Default)]
struct Unsorted {
    /// Last letter
    zeta: String,
    /// First letter
    alpha: String,
}

// ============================================================================
// Flag table
// ============================================================================

/// Columns are padded to their widest cell and trailing space is trimmed.
#[test]
fn flags_table() {
    let mut value = Flags::default();
    let help = Config::new(&mut value)
        .help_flags(&HelpOptions::new())
        .unwrap();

    assert_eq!(
        help,
        concat!(
            "       --bool  bool    Bool usage\n",
            "  -n,  --name  String  The name\n",
        )
    );
}

#[test]
fn flags_table_filtered() {
    let mut value = Flags::default();
    let help = Config::new(&mut value)
        .help_flags(&HelpOptions::new().with_filter(|field| field.path() != "bool"))
        .unwrap();

    assert_eq!(help, "    --bool  bool  Bool usage\n");
}

/// A default that differs from the zero value fills the column between type and usage.
#[test]
fn flags_table_with_default() {
    let mut value = Flags::default();
    let help = Config::new(&mut value)
        .with_defaults(|f: &mut Flags| f.name = "anon".to_string())
        .help_flags(&HelpOptions::new())
        .unwrap();

    assert_eq!(
        help,
        concat!(
            "       --bool  bool                     Bool usage\n",
            "  -n,  --name  String  (default: anon)  The name\n",
        )
    );
}

#[test]
fn flags_table_sorted_with_nested_usage() {
    let mut value = Doc::default();
    let help = Config::new(&mut value)
        .with_defaults(|s: &mut Server| s.port = 80)
        .help_flags(&HelpOptions::new())
        .unwrap();

    assert_eq!(
        help,
        concat!(
            "       --labels[k]        Map<String, u32>                 Labels to attach\n",
            "  -n,  --name             String\n",
            "       --servers[i].host  String                           Upstreams: Host to reach\n",
            "       --servers[i].port  u16               (default: 80)  Upstreams:\n",
        )
    );
}

/// Leaves are listed by flag key, whatever order the fields are declared in.
#[test]
fn flags_table_ignores_declaration_order() {
    let mut value = Unsorted::default();
    let help = Config::new(&mut value)
        .help_flags(&HelpOptions::new())
        .unwrap();

    assert_eq!(
        help,
        concat!(
            "    --alpha  String  First letter\n",
            "    --zeta   String  Last letter\n",
        )
    );
}

#[test]
fn flags_table_custom_sorter() {
    let mut value = Unsorted::default();
    let help = Config::new(&mut value)
        .help_flags(&HelpOptions::new().with_sorter(|a, b| b.path().cmp(&a.path())))
        .unwrap();

    assert_eq!(
        help,
        concat!(
            "    --zeta   String  Last letter\n",
            "    --alpha  String  First letter\n",
        )
    );
}

#[test]
fn flags_table_custom_syntax() {
    let mut value = Doc::default();
    let help = Config::new(&mut value)
        .with_key_delimiter('/')
        .with_prefix_long("++")
        .help_flags(
            &HelpOptions::new()
                .with_filter(|field| field.short().is_some() || field.path().ends_with("host"))
                .with_sorter(path_sorter),
        )
        .unwrap();

    assert_eq!(
        help,
        concat!(
            "    ++labels[k]        Map<String, u32>  Labels to attach\n",
            "    ++servers[i]/port  u16               Upstreams:\n",
        )
    );
}

// ============================================================================
// Example document
// ============================================================================

#[test]
fn document_help() {
    let mut value = Doc::default();
    let help = Config::new(&mut value)
        .help_document(&HelpOptions::new())
        .unwrap();

    assert_eq!(
        help,
        indoc! {r#"
            "labels":
              "k": u32 # Labels to attach
            "name": String
            "servers":
              -
                "host": String # Upstreams: Host to reach
                "port": u16 # Upstreams:
        "#}
    );
}

/// The example document is laid out in key order, even with a sorter.
#[test]
fn document_help_ignores_declaration_order() {
    let mut value = Unsorted::default();
    let help = Config::new(&mut value)
        .help_document(&HelpOptions::new().with_sorter(|a, b| b.path().cmp(&a.path())))
        .unwrap();

    assert_eq!(
        help,
        indoc! {r#"
            "alpha": String # First letter
            "zeta": String # Last letter
        "#}
    );
}

#[test]
fn document_help_scalar_list() {
    #[derive(Facet, Default)]
    struct Tagged {
        /// Extra tags
        tags: Vec<String>,
        level: Option<u8>,
    }

    let mut value = Tagged::default();
    let help = Config::new(&mut value)
        .help_document(&HelpOptions::new())
        .unwrap();

    assert_eq!(
        help,
        indoc! {r#"
            "level": u8
            "tags":
              - String # Extra tags
        "#}
    );
}

/// The example document is itself a valid document.
#[test]
fn document_help_parses() {
    let mut value = Doc::default();
    let help = Config::new(&mut value)
        .help_document(&HelpOptions::new().with_filter(|field| field.path() == "name"))
        .unwrap();

    let parsed = facet_cfg::parse_document(help.as_bytes()).unwrap();
    assert_eq!(
        parsed.to_string(),
        "{labels: {k: u32}, servers: [{host: String, port: u16}]}"
    );
}
