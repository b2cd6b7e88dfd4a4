// src/schema/types.rs

use std::{collections::BTreeMap, fmt};

/// How a single cell is shaped before it lands in the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Whitespace stripped, otherwise verbatim.
    Text,
    /// Stripped and parsed as an `i64`; compared numerically when sorting.
    Integer,
    /// A comma-joined list of names, e.g. `"RIAR,AVAL,ADAL"`; its members are
    /// stripped and sorted so the cell is independent of upstream ordering.
    NameList,
}

/// A single canonical column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, ColumnKind::Text)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub fn name_list(name: &str) -> Self {
        Self::new(name, ColumnKind::NameList)
    }
}

/// What to do with the header row of a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Rename through the schema's rename map and reorder into canonical order.
    Mapped,
    /// Keep the header and row order as published; only cells are stripped.
    /// Used for adjacency matrices, whose headers are neuron names.
    Passthrough,
}

/// The kinds of table the series index publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeriesKind {
    EdgeList,
    ContactList,
    SynapseList,
    Adjacency,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 4] = [
        SeriesKind::EdgeList,
        SeriesKind::ContactList,
        SeriesKind::SynapseList,
        SeriesKind::Adjacency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::EdgeList => "edge_list",
            SeriesKind::ContactList => "contact_list",
            SeriesKind::SynapseList => "synapse_list",
            SeriesKind::Adjacency => "adjacency",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "edge_list" => Some(SeriesKind::EdgeList),
            "contact_list" => Some(SeriesKind::ContactList),
            "synapse_list" => Some(SeriesKind::SynapseList),
            "adjacency" => Some(SeriesKind::Adjacency),
            _ => None,
        }
    }

    /// Classify a published file by its title, e.g. `"N2U Edge List"`.
    pub fn from_title(title: &str) -> Option<Self> {
        let title = title.to_lowercase();
        [
            ("edge list", SeriesKind::EdgeList),
            ("contact list", SeriesKind::ContactList),
            ("synapse list", SeriesKind::SynapseList),
            ("adjacency", SeriesKind::Adjacency),
        ]
        .into_iter()
        .find(|(needle, _)| title.contains(needle))
        .map(|(_, kind)| kind)
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalization rules for one series.
#[derive(Debug, Clone)]
pub struct SeriesSchema {
    pub name: String,
    /// Canonical columns, in output order.
    pub columns: Vec<ColumnDef>,
    /// Raw header → canonical column name.
    pub renames: BTreeMap<String, String>,
    /// Canonical columns to sort by; `None` sorts by the full row.
    pub sort_key: Option<Vec<String>>,
    pub dedup: bool,
    pub header: HeaderPolicy,
}

impl SeriesSchema {
    /// A mapped schema whose canonical columns are the given defs, in order.
    pub fn new(name: &str, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            renames: BTreeMap::new(),
            sort_key: None,
            dedup: false,
            header: HeaderPolicy::Mapped,
        }
    }

    /// A mapped schema derived from a bare rename map: every rename target
    /// becomes a text column and the canonical order is alphabetical.
    pub fn from_renames<I, K, V>(name: &str, renames: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let renames: BTreeMap<String, String> = renames
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let mut targets: Vec<&String> = renames.values().collect();
        targets.sort();
        targets.dedup();
        let columns = targets.into_iter().map(|t| ColumnDef::text(t)).collect();
        Self {
            renames,
            ..Self::new(name, columns)
        }
    }

    pub fn passthrough(name: &str) -> Self {
        Self {
            header: HeaderPolicy::Passthrough,
            ..Self::new(name, Vec::new())
        }
    }

    /// Register `aliases` as raw spellings of `canonical`.
    pub fn with_aliases(mut self, canonical: &str, aliases: &[&str]) -> Self {
        for alias in aliases {
            self.renames
                .insert((*alias).to_string(), canonical.to_string());
        }
        self
    }

    pub fn with_sort_key(mut self, key: &[&str]) -> Self {
        self.sort_key = Some(key.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Resolve a raw header to its canonical name, trying the exact spelling
    /// first and then the trimmed one.
    pub fn canonical_name(&self, raw: &str) -> Option<&str> {
        self.renames
            .get(raw)
            .or_else(|| self.renames.get(raw.trim()))
            .map(String::as_str)
    }
}
