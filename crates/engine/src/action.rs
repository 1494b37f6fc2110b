//! The analysis action handler.
//!
//! This is the single failure boundary of the invocation pipeline: every
//! failure below it — configuration checks, expression assembly, host
//! evaluation — surfaces here as a typed [`ActionError`] the host converts
//! into its inline error panel before resetting the action control. Nothing
//! panics and nothing escapes untyped.

use anyhow::Result;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use promptlens_types::{PanelOptions, TabularResult};

use crate::invoke::{DEFAULT_INVOKE_FUNCTION, ExpressionInvoker, build_invocation_expression, combine_prompts};
use crate::resolve::resolve;

/// Failure classes of the analysis action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No AI connection identifier is configured.
    #[error("no AI connection is configured")]
    MissingConnection,
    /// Both prompts are empty after resolution and cleaning.
    #[error("prompt is empty; configure prompts before generating an analysis")]
    EmptyPrompt,
    /// The host evaluator rejected or failed the invocation expression.
    #[error("analysis invocation failed: {0}")]
    Evaluation(#[from] anyhow::Error),
}

/// Resolve the prompts against the data and invoke the AI connection.
///
/// Configuration errors are raised synchronously before any evaluation.
/// Readiness gating happens before the host enables the action; this handler
/// still re-checks the synchronous prerequisites so a stale UI cannot fire a
/// half-configured invocation.
pub async fn run_analysis(options: &PanelOptions, data: &TabularResult, invoker: &dyn ExpressionInvoker) -> Result<String, ActionError> {
    if options.connection_name.trim().is_empty() {
        return Err(ActionError::MissingConnection);
    }

    let resolved_user = resolve(&options.user_prompt, data);
    let combined = combine_prompts(&options.system_prompt, &resolved_user);
    if combined.is_empty() {
        return Err(ActionError::EmptyPrompt);
    }

    let expression = build_invocation_expression(DEFAULT_INVOKE_FUNCTION, options, &combined)?;
    debug!(expression_chars = expression.len(), "invoking analysis expression");

    match invoker.evaluate(&expression).await {
        Ok(value) => Ok(scalar_to_text(&value)),
        Err(source) => {
            error!(error = %source, "analysis invocation failed");
            Err(ActionError::Evaluation(source))
        }
    }
}

/// Convert the evaluator's scalar result into display text.
pub fn scalar_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
