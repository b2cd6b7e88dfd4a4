// src/fetch/series.rs
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::process::Delimiter;
use crate::schema::SeriesKind;

static SERIES: Lazy<Selector> = Lazy::new(|| selector(".series"));
static SERIES_HEADER: Lazy<Selector> = Lazy::new(|| selector(".series-header"));
static SERIES_SUB: Lazy<Selector> = Lazy::new(|| selector(".series-sub"));
static SERIES_DATA: Lazy<Selector> = Lazy::new(|| selector(".series-data"));
static ITEM: Lazy<Selector> = Lazy::new(|| selector("li"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| selector("a[href]"));

const DESCRIPTION_SUFFIX: &str = " - Description";

/// Extensions we can parse, in order of preference.
const PARSEABLE: &[(&str, Delimiter)] = &[(".csv", Delimiter::Comma), (".tsv", Delimiter::Tab)];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector should parse")
}

#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("series `{series}` has {subs} subheadings but {datas} data lists")]
    MismatchedSubsets {
        series: String,
        subs: usize,
        datas: usize,
    },

    #[error("series `{series}`: cannot resolve link `{href}`: {source}")]
    BadLink {
        series: String,
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// One downloadable table on the series index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Output location relative to the data directory:
    /// `<series>/<subset>/<title>.csv`.
    pub relative_path: PathBuf,
    pub title: String,
    pub url: Url,
    pub kind: SeriesKind,
    pub delimiter: Delimiter,
}

/// Walk the series index page and list every parseable table on it.
///
/// Layout: each `.series` block has one `.series-header` and paired
/// `.series-sub` / `.series-data` elements; each data list holds `li`
/// items titled `"<title> (.csv) (.tsv)"` with one anchor per format.
pub fn parse_series_page(html: &str, root: &Url) -> Result<Vec<SourceEntry>, EnumerateError> {
    let doc = Html::parse_document(html);
    let mut entries = Vec::new();

    let series_list: Vec<ElementRef> = doc.select(&SERIES).collect();
    debug!(count = series_list.len(), "found series");

    for series in series_list {
        let header = series
            .select(&SERIES_HEADER)
            .next()
            .map(|h| element_text(&h))
            .unwrap_or_default();
        let header = header.trim_matches(':').trim().to_string();
        debug!(series = %header, "processing series");

        let subs: Vec<ElementRef> = series.select(&SERIES_SUB).collect();
        let datas: Vec<ElementRef> = series.select(&SERIES_DATA).collect();
        if subs.len() != datas.len() {
            return Err(EnumerateError::MismatchedSubsets {
                series: header,
                subs: subs.len(),
                datas: datas.len(),
            });
        }

        for (sub, data) in subs.iter().zip(&datas) {
            let subset = element_text(sub);
            let subset = subset
                .strip_suffix(DESCRIPTION_SUFFIX)
                .unwrap_or(&subset)
                .to_string();
            let dir = PathBuf::from(path_component(&header)).join(path_component(&subset));

            for item in data.select(&ITEM) {
                let text = element_text(&item);
                let title = text.split('(').next().unwrap_or("").trim().to_string();
                if let Some(entry) = item_entry(&header, &dir, &title, &item, root)? {
                    entries.push(entry);
                }
            }
        }
    }

    Ok(entries)
}

/// The preferred parseable anchor of a list item, if any.
fn item_entry(
    series: &str,
    dir: &Path,
    title: &str,
    item: &ElementRef,
    root: &Url,
) -> Result<Option<SourceEntry>, EnumerateError> {
    let mut anchors: Vec<(usize, &str)> = item
        .select(&ANCHOR)
        .filter_map(|a| {
            let ext = element_text(&a);
            let ext = ext.trim_matches(|c: char| c == ' ' || c == '(' || c == ')');
            let rank = PARSEABLE
                .iter()
                .position(|(p, _)| ext.eq_ignore_ascii_case(p))?;
            Some((rank, a.value().attr("href")?))
        })
        .collect();
    anchors.sort_by_key(|(rank, _)| *rank);

    let Some(&(rank, href)) = anchors.first() else {
        return Ok(None);
    };
    if anchors.len() > 1 {
        debug!(title, "several formats offered, using {}", PARSEABLE[rank].0);
    }

    let Some(kind) = SeriesKind::from_title(title) else {
        warn!(series, title, "unknown table type, skipping");
        return Ok(None);
    };

    let url = resolve_href(root, href).map_err(|source| EnumerateError::BadLink {
        series: series.to_string(),
        href: href.to_string(),
        source,
    })?;

    Ok(Some(SourceEntry {
        relative_path: dir.join(format!("{}.csv", path_component(title))),
        title: title.to_string(),
        url,
        kind,
        delimiter: PARSEABLE[rank].1,
    }))
}

/// Links on the index are relative to the site root, e.g. `./series/N2U.csv`.
fn resolve_href(root: &Url, href: &str) -> Result<Url, url::ParseError> {
    match Url::parse(href) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            root.join(href.trim_start_matches(|c: char| c == '.' || c == '/'))
        }
        Err(e) => Err(e),
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Make a scraped label safe to use as a single path component. Separators
/// become `-`; empty and dot-only labels (`.`, `..`) get a `_` prefix so they
/// can never name the current or parent directory.
fn path_component(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}
