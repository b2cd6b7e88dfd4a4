// src/schema/catalog.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, info};

use super::types::{ColumnDef, SeriesKind, SeriesSchema};

/// Alias file layout: series kind → raw header → canonical column.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct AliasFile(pub BTreeMap<String, BTreeMap<String, String>>);

/// The normalization rules for every kind of table we know how to pin.
#[derive(Debug, Clone)]
pub struct Catalog {
    schemas: BTreeMap<SeriesKind, SeriesSchema>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let schemas = SeriesKind::ALL
            .into_iter()
            .map(|kind| (kind, builtin_schema(kind)))
            .collect();
        Self { schemas }
    }

    /// The built-in catalog, extended with the aliases in `path` if given.
    pub fn load(alias_path: Option<&Path>) -> Result<Self> {
        let mut catalog = Self::builtin();
        if let Some(path) = alias_path {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading header aliases {:?}", path))?;
            let aliases: AliasFile = serde_json::from_str(&text)
                .with_context(|| format!("parsing header aliases {:?}", path))?;
            catalog.merge_aliases(aliases)?;
            info!(path = %path.display(), "loaded header aliases");
        }
        Ok(catalog)
    }

    /// Add operator-supplied raw spellings to the rename maps.
    pub fn merge_aliases(&mut self, aliases: AliasFile) -> Result<()> {
        for (kind_name, renames) in aliases.0 {
            let Some(kind) = SeriesKind::from_str(&kind_name) else {
                bail!("unknown series kind `{}` in header aliases", kind_name);
            };
            let schema = self
                .schemas
                .get_mut(&kind)
                .with_context(|| format!("no schema registered for `{}`", kind))?;
            for (raw, canonical) in renames {
                if schema.column_index(&canonical).is_none() {
                    bail!(
                        "alias `{}` targets unknown column `{}` of `{}`",
                        raw,
                        canonical,
                        kind
                    );
                }
                debug!(kind = %kind, raw = %raw, canonical = %canonical, "header alias");
                schema.renames.insert(raw, canonical);
            }
        }
        Ok(())
    }

    pub fn schema(&self, kind: SeriesKind) -> Option<&SeriesSchema> {
        self.schemas.get(&kind)
    }
}

/// Canonical names are the headers the pinned files have always carried:
/// edge lists get a fixed `Source,Target,Weight,Type` header, contact and
/// synapse lists keep the site's own (stripped) header spellings.
fn builtin_schema(kind: SeriesKind) -> SeriesSchema {
    let name = kind.as_str();
    match kind {
        SeriesKind::EdgeList => SeriesSchema::new(
            name,
            vec![
                ColumnDef::text("Source"),
                ColumnDef::text("Target"),
                ColumnDef::integer("Weight"),
                ColumnDef::text("Type"),
            ],
        )
        .with_aliases("Source", &["Source", "source", "Pre", "pre", "Presynaptic"])
        .with_aliases("Target", &["Target", "target", "Post", "post", "Postsynaptic"])
        .with_aliases("Weight", &["Weight", "weight", "Synapses", "synapses"])
        .with_aliases("Type", &["Type", "type", "Synapse type"]),

        SeriesKind::ContactList => SeriesSchema::new(
            name,
            vec![
                ColumnDef::text("pre"),
                ColumnDef::text("post"),
                ColumnDef::integer("preidx"),
                ColumnDef::integer("postidx"),
                ColumnDef::text("em_section"),
                ColumnDef::integer("contact_length_pixels"),
                ColumnDef::integer("pre_obj"),
                ColumnDef::integer("post_obj"),
            ],
        )
        .with_aliases("pre", &["pre", "Pre"])
        .with_aliases("post", &["post", "Post"])
        .with_aliases("preidx", &["preidx", "pre_idx", "pre idx"])
        .with_aliases("postidx", &["postidx", "post_idx", "post idx"])
        .with_aliases("em_section", &["em_section", "EM section", "section"])
        .with_aliases(
            "contact_length_pixels",
            &["contact_length_pixels", "contact length (pixels)", "length"],
        )
        .with_aliases("pre_obj", &["pre_obj", "preobj", "pre obj"])
        .with_aliases("post_obj", &["post_obj", "postobj", "post obj"]),

        SeriesKind::SynapseList => SeriesSchema::new(
            name,
            vec![
                ColumnDef::text("pre"),
                ColumnDef::name_list("post_list"),
                ColumnDef::integer("# sections"),
                ColumnDef::integer("synapse id"),
                ColumnDef::text("series"),
            ],
        )
        .with_aliases("pre", &["pre", "Pre"])
        .with_aliases("post_list", &["post_list", "post list", "post", "Post"])
        .with_aliases(
            "# sections",
            &["# sections", "#sections", "sections", "# of sections"],
        )
        .with_aliases("synapse id", &["synapse id", "Synapse ID", "synapse_id"])
        .with_aliases("series", &["series", "Series"]),

        SeriesKind::Adjacency => SeriesSchema::passthrough(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_aliases_target_known_columns() {
        let catalog = Catalog::builtin();
        for kind in SeriesKind::ALL {
            let schema = catalog.schema(kind).unwrap();
            for (raw, canonical) in &schema.renames {
                assert!(
                    schema.column_index(canonical).is_some(),
                    "{}: `{}` -> `{}`",
                    kind,
                    raw,
                    canonical
                );
            }
        }
    }

    #[test]
    fn test_every_column_reachable_by_its_own_name() {
        let catalog = Catalog::builtin();
        for kind in SeriesKind::ALL {
            let schema = catalog.schema(kind).unwrap();
            for col in &schema.columns {
                assert_eq!(schema.canonical_name(&col.name), Some(col.name.as_str()));
            }
        }
    }

    #[test]
    fn test_canonical_headers_match_pinned_files() {
        let catalog = Catalog::builtin();
        let names = |kind| catalog.schema(kind).unwrap().column_names();
        assert_eq!(
            names(SeriesKind::EdgeList),
            vec!["Source", "Target", "Weight", "Type"]
        );
        assert_eq!(
            names(SeriesKind::ContactList),
            vec![
                "pre",
                "post",
                "preidx",
                "postidx",
                "em_section",
                "contact_length_pixels",
                "pre_obj",
                "post_obj"
            ]
        );
        assert_eq!(
            names(SeriesKind::SynapseList),
            vec!["pre", "post_list", "# sections", "synapse id", "series"]
        );
    }

    #[test]
    fn test_alias_file_extends_rename_map() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"edge list": {{"From": "Source", "To": "Target"}}}}"#).unwrap();

        let catalog = Catalog::load(Some(file.path())).unwrap();
        let schema = catalog.schema(SeriesKind::EdgeList).unwrap();
        assert_eq!(schema.canonical_name("From"), Some("Source"));
        assert_eq!(schema.canonical_name("To"), Some("Target"));
    }

    #[test]
    fn test_alias_to_unknown_column_rejected() {
        let mut catalog = Catalog::builtin();
        let aliases: AliasFile =
            serde_json::from_str(r#"{"synapse_list": {"Weight": "weight"}}"#).unwrap();
        let err = catalog.merge_aliases(aliases).unwrap_err();
        assert!(err.to_string().contains("unknown column `weight`"));
    }

    #[test]
    fn test_alias_for_unknown_kind_rejected() {
        let mut catalog = Catalog::builtin();
        let aliases: AliasFile = serde_json::from_str(r#"{"gap_junctions": {}}"#).unwrap();
        assert!(catalog.merge_aliases(aliases).is_err());
    }
}
