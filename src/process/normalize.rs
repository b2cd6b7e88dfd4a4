// src/process/normalize.rs

use std::cmp::Ordering;

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::process::table::{Delimiter, Table};
use crate::process::utils::{clean_str, parse_int, sort_name_list};
use crate::schema::{ColumnKind, HeaderPolicy, SeriesSchema};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("schema drift in `{series}`: header `{header}` has no canonical name")]
    SchemaDrift { series: String, header: String },

    #[error("`{series}`: headers `{first}` and `{second}` both map to `{column}`")]
    DuplicateColumn {
        series: String,
        column: String,
        first: String,
        second: String,
    },

    #[error("`{series}`: canonical column `{column}` missing from source header")]
    MissingColumn { series: String, column: String },

    #[error("`{series}` line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        series: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("`{series}` line {line}: column `{column}` expects an integer, got `{value}`")]
    MalformedCell {
        series: String,
        line: u64,
        column: String,
        value: String,
    },

    #[error("`{series}`: sort key column `{column}` is not a canonical column")]
    UnknownSortColumn { series: String, column: String },

    #[error("`{series}`: CSV parse error: {source}")]
    Csv {
        series: String,
        #[source]
        source: csv::Error,
    },
}

/// Parse `raw` and bring it into the canonical shape described by `schema`.
///
/// For mapped schemas the output has the schema's columns in canonical
/// order, every cell shaped by its column kind, and rows sorted by the sort
/// key with the full row as tie-breaker. The result depends only on the
/// multiset of input rows, never on their order.
#[instrument(level = "debug", skip(raw, schema), fields(schema = %schema.name, bytes = raw.len()))]
pub fn normalize(
    name: &str,
    raw: &str,
    delimiter: Delimiter,
    schema: &SeriesSchema,
) -> Result<Table, NormalizeError> {
    let records = read_records(name, raw, delimiter)?;
    let table = match schema.header {
        HeaderPolicy::Mapped => normalize_mapped(name, records, schema)?,
        HeaderPolicy::Passthrough => normalize_passthrough(name, records)?,
    };
    debug!(
        columns = table.columns.len(),
        rows = table.rows.len(),
        "normalized"
    );
    Ok(table)
}

/// Every non-blank record, paired with its 1-based source line.
fn read_records(
    name: &str,
    raw: &str,
    delimiter: Delimiter,
) -> Result<Vec<(u64, StringRecord)>, NormalizeError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(raw.as_bytes());

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|source| NormalizeError::Csv {
            series: name.to_string(),
            source,
        })?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        out.push((line, record));
    }
    Ok(out)
}

fn normalize_mapped(
    name: &str,
    records: Vec<(u64, StringRecord)>,
    schema: &SeriesSchema,
) -> Result<Table, NormalizeError> {
    let mut table = Table::new(name, schema.column_names());
    let sort_key = resolve_sort_key(name, schema)?;

    let mut records = records.into_iter();
    let Some((_, header)) = records.next() else {
        return Ok(table);
    };
    let slots = map_header(name, &header, schema)?;

    for (line, record) in records {
        if record.len() != slots.len() {
            return Err(NormalizeError::RaggedRow {
                series: name.to_string(),
                line,
                expected: slots.len(),
                found: record.len(),
            });
        }
        let mut row = vec![String::new(); schema.columns.len()];
        for (raw_cell, &slot) in record.iter().zip(&slots) {
            let col = &schema.columns[slot];
            row[slot] = shape_cell(raw_cell, col.kind).ok_or_else(|| {
                NormalizeError::MalformedCell {
                    series: name.to_string(),
                    line,
                    column: col.name.clone(),
                    value: raw_cell.to_string(),
                }
            })?;
        }
        table.rows.push(row);
    }

    let kinds: Vec<ColumnKind> = schema.columns.iter().map(|c| c.kind).collect();
    table
        .rows
        .sort_by(|a, b| compare_rows(a, b, &sort_key, &kinds));
    if schema.dedup {
        table.rows.dedup();
    }
    Ok(table)
}

fn normalize_passthrough(
    name: &str,
    records: Vec<(u64, StringRecord)>,
) -> Result<Table, NormalizeError> {
    let mut records = records.into_iter();
    let Some((_, header)) = records.next() else {
        return Ok(Table::new(name, Vec::new()));
    };
    let mut table = Table::new(name, header.iter().map(clean_str).collect());

    for (line, record) in records {
        if record.len() != table.columns.len() {
            return Err(NormalizeError::RaggedRow {
                series: name.to_string(),
                line,
                expected: table.columns.len(),
                found: record.len(),
            });
        }
        table.rows.push(record.iter().map(clean_str).collect());
    }
    Ok(table)
}

/// For each raw header position, the index of its canonical column.
fn map_header(
    name: &str,
    header: &StringRecord,
    schema: &SeriesSchema,
) -> Result<Vec<usize>, NormalizeError> {
    let mut seen: Vec<Option<&str>> = vec![None; schema.columns.len()];
    let mut slots = Vec::with_capacity(header.len());

    for raw in header.iter() {
        let slot = schema
            .canonical_name(raw)
            .and_then(|canonical| schema.column_index(canonical))
            .ok_or_else(|| NormalizeError::SchemaDrift {
                series: name.to_string(),
                header: raw.to_string(),
            })?;
        if let Some(first) = seen[slot] {
            return Err(NormalizeError::DuplicateColumn {
                series: name.to_string(),
                column: schema.columns[slot].name.clone(),
                first: first.to_string(),
                second: raw.to_string(),
            });
        }
        seen[slot] = Some(raw);
        slots.push(slot);
    }

    if let Some(missing) = seen.iter().position(Option::is_none) {
        return Err(NormalizeError::MissingColumn {
            series: name.to_string(),
            column: schema.columns[missing].name.clone(),
        });
    }
    Ok(slots)
}

fn resolve_sort_key(name: &str, schema: &SeriesSchema) -> Result<Vec<usize>, NormalizeError> {
    match &schema.sort_key {
        None => Ok((0..schema.columns.len()).collect()),
        Some(key) => key
            .iter()
            .map(|column| {
                schema
                    .column_index(column)
                    .ok_or_else(|| NormalizeError::UnknownSortColumn {
                        series: name.to_string(),
                        column: column.clone(),
                    })
            })
            .collect(),
    }
}

fn shape_cell(raw: &str, kind: ColumnKind) -> Option<String> {
    match kind {
        ColumnKind::Text => Some(clean_str(raw)),
        ColumnKind::Integer => parse_int(raw).map(|n| n.to_string()),
        ColumnKind::NameList => Some(sort_name_list(raw)),
    }
}

fn compare_cells(a: &str, b: &str, kind: ColumnKind) -> Ordering {
    if kind == ColumnKind::Integer {
        if let (Some(x), Some(y)) = (parse_int(a), parse_int(b)) {
            return x.cmp(&y);
        }
    }
    a.cmp(b)
}

fn compare_rows(a: &[String], b: &[String], key: &[usize], kinds: &[ColumnKind]) -> Ordering {
    key.iter()
        .map(|&i| compare_cells(&a[i], &b[i], kinds[i]))
        .chain((0..kinds.len()).map(|i| compare_cells(&a[i], &b[i], kinds[i])))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Catalog, ColumnDef, SeriesKind};

    fn cells_schema() -> SeriesSchema {
        SeriesSchema::from_renames(
            "cells",
            [
                ("Neuron ", "neuron"),
                ("neuron", "neuron"),
                ("Class", "class"),
                ("class", "class"),
            ],
        )
    }

    fn edge_schema() -> SeriesSchema {
        Catalog::builtin()
            .schema(SeriesKind::EdgeList)
            .unwrap()
            .clone()
    }

    const EDGES: &str = "Source,Target,Weight,Type\n\
                         AVAR , AVAL,10,chemical\n\
                         ADAL,AIBR, 2 ,electrical\n\
                         ADAL,AIBR,10,chemical\n\
                         \n\
                         ADAL,AIBL,9,chemical\n";

    #[test]
    fn test_header_variants_normalize_to_same_table() {
        let schema = cells_schema();
        let a = normalize("cells", "Neuron ,Class\nADAR,B\nADAL,A\n", Delimiter::Comma, &schema)
            .unwrap();
        let b = normalize("cells", "class,neuron\nA,ADAL\nB,ADAR\n", Delimiter::Comma, &schema)
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.columns, vec!["class", "neuron"]);
        let records: Vec<_> = a.records().collect();
        assert_eq!(records[0]["neuron"], "ADAL");
        assert_eq!(records[0]["class"], "A");
        assert_eq!(records[1]["neuron"], "ADAR");
        assert_eq!(records[1]["class"], "B");
    }

    #[test]
    fn test_unmapped_header_is_schema_drift() {
        let err = normalize(
            "cells",
            "neuron,class,Lineage\nADAL,A,AB\n",
            Delimiter::Comma,
            &cells_schema(),
        )
        .unwrap_err();
        match err {
            NormalizeError::SchemaDrift { series, header } => {
                assert_eq!(series, "cells");
                assert_eq!(header, "Lineage");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_and_duplicate_columns() {
        let schema = cells_schema();
        assert!(matches!(
            normalize("cells", "neuron\nADAL\n", Delimiter::Comma, &schema),
            Err(NormalizeError::MissingColumn { column, .. }) if column == "class"
        ));
        assert!(matches!(
            normalize("cells", "neuron,Neuron ,class\n", Delimiter::Comma, &schema),
            Err(NormalizeError::DuplicateColumn { column, .. }) if column == "neuron"
        ));
    }

    #[test]
    fn test_empty_input_keeps_canonical_header() {
        for raw in ["", "\n\n", "class,neuron\n"] {
            let table = normalize("cells", raw, Delimiter::Comma, &cells_schema()).unwrap();
            assert!(table.is_empty());
            assert_eq!(table.columns, vec!["class", "neuron"]);
        }
    }

    #[test]
    fn test_edge_list_sorts_numerically_and_strips() {
        let table = normalize("edges", EDGES, Delimiter::Comma, &edge_schema()).unwrap();
        assert_eq!(table.columns, vec!["Source", "Target", "Weight", "Type"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["ADAL", "AIBL", "9", "chemical"],
                vec!["ADAL", "AIBR", "2", "electrical"],
                vec!["ADAL", "AIBR", "10", "chemical"],
                vec!["AVAR", "AVAL", "10", "chemical"],
            ]
        );
    }

    #[test]
    fn test_order_independence_and_idempotence() {
        let schema = edge_schema();
        let mut lines: Vec<&str> = EDGES.lines().collect();
        let header = lines.remove(0);
        let first = normalize("edges", EDGES, Delimiter::Comma, &schema).unwrap();

        lines.reverse();
        let reversed = format!("{}\n{}\n", header, lines.join("\n"));
        let second = normalize("edges", &reversed, Delimiter::Comma, &schema).unwrap();
        assert_eq!(first.to_csv().unwrap(), second.to_csv().unwrap());

        lines.rotate_left(2);
        let rotated = format!("{}\n{}\n", header, lines.join("\n"));
        let third = normalize("edges", &rotated, Delimiter::Comma, &schema).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_whitespace_invariant() {
        let table = normalize("edges", EDGES, Delimiter::Comma, &edge_schema()).unwrap();
        for cell in table.rows.iter().flatten().chain(&table.columns) {
            assert_eq!(cell.trim(), cell);
        }
    }

    #[test]
    fn test_duplicates_kept_unless_dedup() {
        let raw = "neuron,class\nADAL,A\nADAL,A\n";
        let kept = normalize("cells", raw, Delimiter::Comma, &cells_schema()).unwrap();
        assert_eq!(kept.len(), 2);

        let deduped = normalize(
            "cells",
            raw,
            Delimiter::Comma,
            &cells_schema().with_dedup(true),
        )
        .unwrap();
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn test_sort_key_then_full_row() {
        let schema = cells_schema().with_sort_key(&["neuron"]);
        let table = normalize(
            "cells",
            "neuron,class\nADAR,A\nADAL,B\nADAL,A\n",
            Delimiter::Comma,
            &schema,
        )
        .unwrap();
        assert_eq!(
            table.rows,
            vec![vec!["A", "ADAL"], vec!["B", "ADAL"], vec!["A", "ADAR"]]
        );

        let bad = cells_schema().with_sort_key(&["weight"]);
        assert!(matches!(
            normalize("cells", "neuron,class\n", Delimiter::Comma, &bad),
            Err(NormalizeError::UnknownSortColumn { .. })
        ));
    }

    #[test]
    fn test_malformed_integer_and_ragged_row() {
        let schema = edge_schema();
        let err = normalize(
            "edges",
            "Source,Target,Weight,Type\nADAL,AIBR,many,chemical\n",
            Delimiter::Comma,
            &schema,
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedCell { line: 2, .. }));

        let err = normalize(
            "edges",
            "Source,Target,Weight,Type\nADAL,AIBR,3\n",
            Delimiter::Comma,
            &schema,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::RaggedRow { expected: 4, found: 3, .. }
        ));
    }

    #[test]
    fn test_synapse_list_sorts_post_partners() {
        let schema = Catalog::builtin()
            .schema(SeriesKind::SynapseList)
            .unwrap()
            .clone();
        let raw = "pre,post,# sections,synapse id,series\n\
                   ADAL,\"RIAR, AVAL,ADAR\",3,1207,N2U\n";
        let table = normalize("syn", raw, Delimiter::Comma, &schema).unwrap();
        assert_eq!(
            table.columns,
            vec!["pre", "post_list", "# sections", "synapse id", "series"]
        );
        assert_eq!(table.rows[0][1], "ADAR,AVAL,RIAR");
        assert_eq!(table.rows[0][2], "3");
    }

    #[test]
    fn test_contact_list_tab_separated() {
        let schema = Catalog::builtin()
            .schema(SeriesKind::ContactList)
            .unwrap()
            .clone();
        let raw = "pre\tpost\tpreidx\tpostidx\tem_section\tcontact_length_pixels\tpre_obj\tpost_obj\n\
                   AVAL \tAVAR\t12\t3\tN2U_041\t 88\t4001\t4002\n";
        let table = normalize("contacts", raw, Delimiter::Tab, &schema).unwrap();
        assert_eq!(table.columns[5], "contact_length_pixels");
        assert_eq!(
            table.rows[0],
            vec!["AVAL", "AVAR", "12", "3", "N2U_041", "88", "4001", "4002"]
        );
    }

    #[test]
    fn test_passthrough_strips_but_keeps_order() {
        let schema = SeriesSchema::passthrough("adjacency");
        let raw = " ,AVAR ,ADAL\nAVAR, 0,2\nADAL,1 , 0\n";
        let table = normalize("adj", raw, Delimiter::Comma, &schema).unwrap();
        assert_eq!(table.columns, vec!["", "AVAR", "ADAL"]);
        assert_eq!(
            table.rows,
            vec![vec!["AVAR", "0", "2"], vec!["ADAL", "1", "0"]]
        );
    }

    #[test]
    fn test_mapped_integer_column_built_by_hand() {
        let schema = SeriesSchema::new("counts", vec![ColumnDef::integer("n")])
            .with_aliases("n", &["N"]);
        let table = normalize("counts", "N\n10\n9\n 100\n", Delimiter::Comma, &schema).unwrap();
        assert_eq!(table.rows, vec![vec!["9"], vec!["10"], vec!["100"]]);
    }
}
