//! # Promptlens Engine
//!
//! The engine turns a panel's prompt templates and live tabular data into the
//! host expression that invokes a pre-configured AI connection, and decides
//! when that invocation is allowed to run.
//!
//! ## Key Features
//!
//! - **Field-reference resolution**: `[Field]` tokens in prompt templates are
//!   substituted with the referenced column's data, including a bulk table
//!   mode for adjacent pipe-joined tokens (`[A]|[B]`)
//! - **Readiness gating**: four prerequisite checks (connection, data,
//!   selection validation, prompts) folded into a single "ready to run"
//!   signal
//! - **Invocation assembly**: the exact host string-literal escaping and JSON
//!   configuration payload expected by the platform's expression evaluator
//! - **Validation polling**: a cancellable periodic task that re-checks the
//!   selection-validation expression with a monotonic sequence guard
//!
//! ## Architecture
//!
//! - **`resolve`**: prompt template resolution against tabular data
//! - **`readiness`**: the validation/readiness state machine
//! - **`invoke`**: the [`ExpressionInvoker`] seam, escaping, and expression
//!   assembly
//! - **`action`**: the analysis action handler, the single failure boundary
//! - **`panel`**: shared per-instance state and prompt save/recovery
//! - **`poll`**: the periodic validation re-check task

pub mod action;
pub mod invoke;
pub mod panel;
pub mod poll;
pub mod readiness;
pub mod resolve;

// Re-export commonly used items for convenience
pub use action::{ActionError, run_analysis, scalar_to_text};
pub use invoke::{DEFAULT_INVOKE_FUNCTION, ExpressionInvoker, build_invocation_expression, combine_prompts, escape_host_literal};
pub use panel::{PanelState, SharedPanelState};
pub use poll::ValidationPoller;
pub use readiness::{ReadinessStateMachine, classify_validation_result};
pub use resolve::resolve;
