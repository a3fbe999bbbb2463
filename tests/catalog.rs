#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap};

use facet::Facet;
use facet_cfg::{Catalog, Config, FieldType, FieldUsage, Segment};

fn catalog_of<T: Facet<'static> + Default>() -> Catalog {
    let mut value = T::default();
    Config::new(&mut value).catalog().unwrap()
}

fn paths(catalog: &Catalog) -> Vec<String> {
    catalog.fields().iter().map(|field| field.path()).collect()
}

// ============================================================================
// Leaves and their types
// ============================================================================

#[test]
fn scalar_leaves() {
    #[derive(Facet, Default)]
    struct Scalars {
        /// help
        #[facet(short = "s")]
        string: String,
        #[facet(rename = "f")]
        float: f64,
        #[facet(rename = "i32")]
        int32: i32,
        flag: Option<bool>,
    }

    let catalog = catalog_of::<Scalars>();
    assert_eq!(paths(&catalog), ["string", "f", "i32", "flag"]);

    let string = &catalog.fields()[0];
    assert_eq!(string.short(), Some("s"));
    assert_eq!(string.usage(), "help");
    assert_eq!(string.field_type(), FieldType::Scalar("String"));
    assert_eq!(string.default_value(), None);

    assert_eq!(catalog.fields()[1].field_type(), FieldType::Scalar("f64"));
    assert_eq!(catalog.fields()[3].field_type(), FieldType::Optional("bool"));
    assert!(catalog.fields()[3].field_type().is_bool());
}

#[test]
fn scalar_collection_leaves() {
    #[derive(Facet, Default)]
    struct Collections {
        names: Vec<String>,
        ports: Vec<u16>,
        labels: BTreeMap<String, String>,
        weights: HashMap<u32, f64>,
    }

    let catalog = catalog_of::<Collections>();
    assert_eq!(paths(&catalog), ["names", "ports", "labels[k]", "weights[k]"]);

    let names = &catalog.fields()[0];
    assert!(names.nodes()[0].is_slice());
    assert_eq!(names.field_type(), FieldType::List("String"));
    assert_eq!(names.field_type().to_string(), "Vec<String>");

    let weights = &catalog.fields()[3];
    assert!(weights.nodes()[0].is_map());
    assert_eq!(weights.nodes()[0].map_key(), Some("u32"));
    assert_eq!(weights.field_type().to_string(), "Map<u32, f64>");
}

/// Fixed-size arrays are lists with a length; arrays of records recurse like lists.
#[test]
fn array_leaves() {
    #[derive(Facet, Default)]
    struct Arrays {
        ports: [u16; 2],
        pairs: [Item; 3],
    }

    #[derive(Facet, Default)]
    struct Item {
        key: String,
    }

    let catalog = catalog_of::<Arrays>();
    assert_eq!(paths(&catalog), ["ports", "pairs[i].key"]);

    let ports = &catalog.fields()[0];
    assert!(ports.nodes()[0].is_slice());
    assert!(ports.field_type().is_list());
    assert_eq!(ports.field_type(), FieldType::Array("u16", 2));
    assert_eq!(ports.field_type().to_string(), "[u16; 2]");
    assert_eq!(ports.field_type().placeholder(), "u16");
}

#[test]
fn nested_record_leaves() {
    #[derive(Facet, Default)]
    struct Root {
        /// array help:
        array: Vec<Item>,
        /// map help:
        map: HashMap<String, Item>,
        child: Option<Item>,
    }

    #[derive(Facet, Default)]
    struct Item {
        /// value help
        value: String,
        #[facet(usage = "key help")]
        key: String,
    }

    let catalog = catalog_of::<Root>();
    assert_eq!(
        paths(&catalog),
        [
            "array[i].value",
            "array[i].key",
            "map[k].value",
            "map[k].key",
            "child.value",
            "child.key",
        ]
    );

    let array_value = &catalog.fields()[0];
    assert_eq!(array_value.nodes().len(), 2);
    assert!(array_value.nodes()[0].is_slice());
    assert_eq!(array_value.nodes()[0].usage(), "array help:");
    assert_eq!(array_value.usage(), "array help: value help");

    assert_eq!(catalog.fields()[3].usage(), "map help: key help");
    assert_eq!(catalog.fields()[3].nodes()[0].map_key(), Some("String"));
    assert_eq!(catalog.fields()[5].usage(), "key help");
}

#[test]
fn skipped_fields_are_not_cataloged() {
    #[derive(Facet, Default)]
    struct Root {
        kept: String,
        #[facet(skip)]
        hidden: String,
    }

    assert_eq!(paths(&catalog_of::<Root>()), ["kept"]);
}

// ============================================================================
// Short aliases
// ============================================================================

#[test]
fn short_alias_below_map_is_dropped() {
    #[derive(Facet, Default)]
    struct Root {
        map: HashMap<String, Item>,
    }

    #[derive(Facet, Default)]
    struct Item {
        #[facet(short = "v")]
        value: String,
    }

    let catalog = catalog_of::<Root>();
    assert_eq!(catalog.fields()[0].short(), None);
    assert!(catalog.find_by_short("v").is_none());
}

#[test]
fn short_alias_below_list_is_dropped() {
    #[derive(Facet, Default)]
    struct Root {
        array: Vec<Item>,
    }

    #[derive(Facet, Default)]
    struct Item {
        #[facet(short = "v")]
        value: String,
    }

    assert_eq!(catalog_of::<Root>().fields()[0].short(), None);
}

#[test]
fn short_alias_on_scalar_list_is_kept() {
    #[derive(Facet, Default)]
    struct Root {
        entry: Entry,
    }

    #[derive(Facet, Default)]
    struct Entry {
        #[facet(short = "v")]
        values: Vec<String>,
    }

    let catalog = catalog_of::<Root>();
    let field = catalog.find_by_short("v").unwrap();
    assert_eq!(field.path(), "entry.values");
    assert_eq!(field.field_type(), FieldType::List("String"));
}

// ============================================================================
// Usage sources and defaults
// ============================================================================

#[derive(Facet, Default)]
struct Described {
    /// from the doc comment
    string: String,
    #[facet(usage = "from the attribute")]
    other: String,
}

impl FieldUsage for Described {
    fn field_usage(&self, field: &str) -> Option<String> {
        (field == "string").then(|| format!("Dynamic help for {field}"))
    }
}

#[test]
fn usage_from_field_usage_trait() {
    let mut value = Described::default();
    let catalog = Config::new(&mut value)
        .with_field_usage::<Described>()
        .catalog()
        .unwrap();

    assert_eq!(catalog.fields()[0].usage(), "Dynamic help for string");
    assert_eq!(catalog.fields()[1].usage(), "from the attribute");
}

#[test]
fn usage_provider_wins_over_trait() {
    let mut value = Described::default();
    let catalog = Config::new(&mut value)
        .with_field_usage::<Described>()
        .with_usage(|_: &Described, field| match field {
            "string" => "from the provider".to_string(),
            _ => String::new(),
        })
        .catalog()
        .unwrap();

    assert_eq!(catalog.fields()[0].usage(), "from the provider");
    assert_eq!(catalog.fields()[1].usage(), "from the attribute");
}

#[test]
fn usage_from_doc_comment() {
    assert_eq!(
        catalog_of::<Described>().fields()[0].usage(),
        "from the doc comment"
    );
}

#[test]
fn default_value_is_recorded_when_changed() {
    #[derive(Facet, Default)]
    struct Server {
        host: String,
        port: u16,
        tags: Vec<String>,
    }

    let mut value = Server::default();
    let catalog = Config::new(&mut value)
        .with_defaults(|s: &mut Server| {
            s.host = "Default value via external function".to_string();
            s.tags = vec!["a".to_string(), "b".to_string()];
        })
        .catalog()
        .unwrap();

    assert_eq!(
        catalog.fields()[0].default_value(),
        Some("Default value via external function")
    );
    assert_eq!(catalog.fields()[1].default_value(), None);
    assert_eq!(catalog.fields()[2].default_value(), Some("[a, b]"));
}

// ============================================================================
// Lookups and transforms
// ============================================================================

#[derive(Facet, Default)]
struct Lookup {
    #[facet(short = "n")]
    name: String,
    servers: Vec<Server>,
    labels: BTreeMap<String, String>,
}

#[derive(Facet, Default)]
struct Server {
    host: String,
}

#[test]
fn find_by_path() {
    let catalog = catalog_of::<Lookup>();

    let key = |text: &str| Segment::Key(text.to_string());
    let bracket = |text: &str| Segment::Bracket(text.to_string());

    let host = catalog
        .find_by_path(&[key("servers"), bracket("3"), key("host")])
        .unwrap();
    assert_eq!(host.path(), "servers[i].host");

    let label = catalog.find_by_path(&[key("labels"), key("team")]).unwrap();
    assert_eq!(label.path(), "labels[k]");

    assert!(catalog.find_by_path(&[key("servers"), key("host")]).is_none());
    assert!(catalog.find_by_path(&[key("name"), key("extra")]).is_none());
    assert_eq!(catalog.find_by_short("n").unwrap().path(), "name");
}

#[test]
fn sort_and_filter() {
    let mut catalog = catalog_of::<Lookup>();

    catalog.sort_by(facet_cfg::path_sorter);
    assert_eq!(paths(&catalog), ["labels[k]", "name", "servers[i].host"]);

    catalog.filter(|field| field.path().starts_with("servers"));
    assert_eq!(paths(&catalog), ["labels[k]", "name"]);
}
