//! Shared type definitions for the promptlens analysis panel core.
//!
//! These types model the data handed to the panel by the dashboard host on
//! every refresh cycle: the tabular result backing the visualization, the
//! persisted configuration options, and the readiness/validation state that
//! gates the "generate analysis" action. Directory types for the platform's
//! space and data-connection listings live in [`directory`].
//!
//! The crate is deliberately free of behavior beyond small accessors; the
//! resolution and gating policies that consume these types live in
//! `promptlens-engine`.

use serde::{Deserialize, Serialize};

pub mod directory;

pub use directory::{Connection, ConnectionListing, ListingSource, Space, SpaceCatalog, SpaceKind};

/// Default system prompt applied to new panel instances.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful and professional analytical assistant embedded in an \
     analytics dashboard. Use the structured data provided in the user prompt \
     along with any additional context to generate your response. Always \
     respond in exactly three bullets. Do not explain your methodology or how \
     you arrived at your answers. Maintain a friendly and respectful tone.";

/// Default message shown when selection validation blocks the action.
pub const DEFAULT_VALIDATION_MESSAGE: &str = "Please make the required selections to proceed with AI analysis";

/// Role a column plays in the bound dataset.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Categorical column.
    Dimension,
    /// Numeric/aggregated column.
    Measure,
}

/// Describes one column of a [`TabularResult`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Whether the column is a dimension or a measure.
    pub kind: ColumnKind,
    /// Label shown to the user; may be an aggregation label and need not be
    /// unique within a result.
    pub display_name: String,
    /// Underlying field or expression identifier; unique within a result.
    pub canonical_name: String,
}

impl ColumnDescriptor {
    /// Convenience constructor for a dimension column.
    pub fn dimension(canonical_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind: ColumnKind::Dimension,
            display_name: display_name.into(),
            canonical_name: canonical_name.into(),
        }
    }

    /// Convenience constructor for a measure column.
    pub fn measure(canonical_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind: ColumnKind::Measure,
            display_name: display_name.into(),
            canonical_name: canonical_name.into(),
        }
    }
}

/// A single cell of a tabular result.
///
/// `text` is the canonical substitution value. `num` is populated for measure
/// cells and participates only as a fallback when `text` is blank, and in
/// highlighting/classification performed by the (host-owned) rendering layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellValue {
    /// Textual representation of the cell.
    pub text: String,
    /// Numeric representation, when the host supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<f64>,
}

impl CellValue {
    /// Cell with only a textual representation.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            num: None,
        }
    }

    /// Cell carrying both representations, as measure cells usually do.
    pub fn number(text: impl Into<String>, num: f64) -> Self {
        Self {
            text: text.into(),
            num: Some(num),
        }
    }
}

/// An ordered snapshot of rows and columns delivered by the host layout.
///
/// Rows align positionally with `columns`. The host delivers columns in
/// schema order with dimensions preceding measures; consumers that depend on
/// that ordering re-derive it from [`ColumnDescriptor::kind`] rather than
/// trusting the delivery order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    /// Column schema, dimensions then measures.
    pub columns: Vec<ColumnDescriptor>,
    /// Row matrix aligned to `columns`.
    pub rows: Vec<Vec<CellValue>>,
}

impl TabularResult {
    /// Build a result from a schema and row matrix.
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Number of dimension columns.
    pub fn dimension_count(&self) -> usize {
        self.columns.iter().filter(|c| c.kind == ColumnKind::Dimension).count()
    }

    /// Number of measure columns.
    pub fn measure_count(&self) -> usize {
        self.columns.iter().filter(|c| c.kind == ColumnKind::Measure).count()
    }

    /// True when there is nothing to substitute from.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }
}

/// Host-persisted configuration for one panel instance.
///
/// Field defaults mirror the property defaults the host seeds new instances
/// with, so a deserialized partial payload always yields a usable snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelOptions {
    /// Fully-qualified AI connection identifier (`Space:Connection`).
    pub connection_name: String,
    /// Sampling temperature forwarded to the model.
    pub temperature: f64,
    /// Top-K sampling cutoff.
    pub top_k: u32,
    /// Nucleus sampling parameter.
    pub top_p: f64,
    /// Response length cap in tokens.
    pub max_tokens: u32,
    /// Whether the selection-validation gate is active.
    pub enable_selection_validation: bool,
    /// Host expression evaluated to decide whether selections are valid.
    pub validation_expression: String,
    /// Message surfaced while the validation gate blocks the action.
    pub validation_error_message: String,
    /// Set once the user has saved prompts for this instance.
    pub prompts_configured: bool,
    /// System prompt defining the assistant's role.
    pub system_prompt: String,
    /// User prompt template, may contain `[Field]` references.
    pub user_prompt: String,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            connection_name: String::new(),
            temperature: 0.7,
            top_k: 250,
            top_p: 1.0,
            max_tokens: 1000,
            enable_selection_validation: false,
            validation_expression: String::new(),
            validation_error_message: DEFAULT_VALIDATION_MESSAGE.to_string(),
            prompts_configured: false,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: String::new(),
        }
    }
}

/// Validation sub-state derived from configuration and the latest poll.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Selection validation is switched off or has no expression to evaluate.
    #[default]
    NotConfigured,
    /// Validation is active and the required selections have not been made.
    AwaitingSelection,
    /// The validation expression evaluated truthy.
    Satisfied,
}

/// The four prerequisite checks gating the analysis action.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSnapshot {
    /// A connection identifier is configured.
    pub connection_ready: bool,
    /// At least one dimension or measure is bound.
    pub data_ready: bool,
    /// The validation gate is satisfied or inactive.
    pub validation_ready: bool,
    /// Prompts have been configured (or recovered non-empty).
    pub prompts_ready: bool,
}

impl ReadinessSnapshot {
    /// The action may run only when every prerequisite holds.
    pub fn is_ready(&self) -> bool {
        self.connection_ready && self.data_ready && self.validation_ready && self.prompts_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_host_seeds() {
        let options = PanelOptions::default();
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.top_k, 250);
        assert_eq!(options.top_p, 1.0);
        assert_eq!(options.max_tokens, 1000);
        assert!(!options.enable_selection_validation);
        assert!(!options.prompts_configured);
        assert!(options.system_prompt.contains("three bullets"));
    }

    #[test]
    fn partial_options_payload_fills_defaults() {
        let options: PanelOptions = serde_json::from_str(r#"{"connection_name":"Analytics:Claude"}"#).expect("parse partial options");
        assert_eq!(options.connection_name, "Analytics:Claude");
        assert_eq!(options.max_tokens, 1000);
        assert_eq!(options.validation_error_message, DEFAULT_VALIDATION_MESSAGE);
    }

    #[test]
    fn counts_split_by_column_kind() {
        let result = TabularResult::new(
            vec![
                ColumnDescriptor::dimension("Region", "Region"),
                ColumnDescriptor::dimension("Product", "Product"),
                ColumnDescriptor::measure("Sum(Revenue)", "Revenue"),
            ],
            vec![vec![CellValue::text("East"), CellValue::text("Widget"), CellValue::number("100", 100.0)]],
        );
        assert_eq!(result.dimension_count(), 2);
        assert_eq!(result.measure_count(), 1);
        assert!(!result.is_empty());
    }

    #[test]
    fn emptiness_requires_rows_and_columns() {
        assert!(TabularResult::default().is_empty());
        let no_rows = TabularResult::new(vec![ColumnDescriptor::dimension("A", "A")], vec![]);
        assert!(no_rows.is_empty());
    }

    #[test]
    fn readiness_is_conjunction_of_all_four_flags() {
        for mask in 0..16u8 {
            let snapshot = ReadinessSnapshot {
                connection_ready: mask & 1 != 0,
                data_ready: mask & 2 != 0,
                validation_ready: mask & 4 != 0,
                prompts_ready: mask & 8 != 0,
            };
            assert_eq!(snapshot.is_ready(), mask == 0b1111, "mask {mask:04b}");
        }
    }
}
