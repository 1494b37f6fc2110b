//! Field-reference resolution for prompt templates.
//!
//! Prompt templates reference bound columns with bracketed tokens
//! (`Explain trends for [Region]`). Resolution replaces each token with the
//! referenced column's cell texts joined by `", "`. Two adjacent tokens
//! joined by a pipe (`[A]|[B]`) request the whole table instead: every row is
//! rendered as a pipe-joined line across all columns, and the first such
//! pattern is replaced with the lines joined by newlines.
//!
//! Unmatched tokens are left verbatim. A renamed or misspelled field
//! reference stays visible in the resolved prompt instead of silently
//! vanishing, which is how prompt authors discover the mistake.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use promptlens_types::{CellValue, ColumnKind, TabularResult};

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("token pattern compiles"));

static TABLE_MODE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]]+\]\|\[[^\[\]]+\]").expect("table-mode pattern compiles"));

/// Expand every field reference in `template` against `data`.
///
/// With no rows or no columns the template is returned unchanged; an empty
/// layout snapshot is a normal state while the user is still binding fields,
/// not an error.
pub fn resolve(template: &str, data: &TabularResult) -> String {
    if data.is_empty() {
        return template.to_string();
    }

    let order = ordered_columns(data);
    let index = FieldIndex::build(data, &order);

    // Table mode first: only the first occurrence is a data dump, anything
    // after it goes through ordinary token substitution.
    let expanded = match TABLE_MODE_PATTERN.find(template) {
        Some(found) => {
            let dump = render_table_dump(data, &order);
            let mut out = String::with_capacity(template.len() + dump.len());
            out.push_str(&template[..found.start()]);
            out.push_str(&dump);
            out.push_str(&template[found.end()..]);
            out
        }
        None => template.to_string(),
    };

    TOKEN_PATTERN
        .replace_all(&expanded, |captures: &Captures| {
            let name = &captures[1];
            match index.lookup(name) {
                Some(value) => value.to_string(),
                None => {
                    debug!(token = name, "no column matches field reference; leaving token verbatim");
                    captures[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Column indices in substitution order: dimensions first, then measures,
/// each group in schema order.
fn ordered_columns(data: &TabularResult) -> Vec<usize> {
    let dimensions = data
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind == ColumnKind::Dimension)
        .map(|(i, _)| i);
    let measures = data
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind == ColumnKind::Measure)
        .map(|(i, _)| i);
    dimensions.chain(measures).collect()
}

/// The text a cell contributes to substitution, if any.
///
/// Measure cells fall back to their numeric representation when the text is
/// blank, so zero-valued or unformatted measures still substitute something.
fn substitution_text(cell: &CellValue) -> Option<String> {
    if !cell.text.trim().is_empty() {
        return Some(cell.text.clone());
    }
    cell.num.filter(|n| n.is_finite()).map(format_measure)
}

/// Integral values render without a trailing `.0`, matching the host's text
/// cells for unformatted integers.
fn format_measure(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn render_table_dump(data: &TabularResult, order: &[usize]) -> String {
    data.rows
        .iter()
        .map(|row| {
            order
                .iter()
                .map(|&i| row.get(i).and_then(substitution_text).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("|")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-resolution lookup from field names to joined column values.
///
/// Both the canonical field name and the display label are indexed when they
/// differ. Collisions across columns resolve first-write-wins in
/// dimensions-then-measures order.
struct FieldIndex {
    entries: IndexMap<String, String>,
}

impl FieldIndex {
    fn build(data: &TabularResult, order: &[usize]) -> Self {
        let mut entries: IndexMap<String, String> = IndexMap::new();
        for &column_index in order {
            let column = &data.columns[column_index];
            let joined = join_column_values(data, column_index);
            entries.entry(column.canonical_name.clone()).or_insert_with(|| joined.clone());
            if column.display_name != column.canonical_name {
                entries.entry(column.display_name.clone()).or_insert(joined);
            }
        }
        Self { entries }
    }

    /// Case-sensitive literal lookup; canonical names were inserted before
    /// display names per column, so they win ties.
    fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }
}

fn join_column_values(data: &TabularResult, column_index: usize) -> String {
    data.rows
        .iter()
        .filter_map(|row| row.get(column_index))
        .filter_map(substitution_text)
        .collect::<Vec<_>>()
        .join(", ")
}
