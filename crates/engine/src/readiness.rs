//! Readiness state machine gating the analysis action.
//!
//! Four prerequisite checks feed a single "ready to run" signal: a connection
//! is configured, data fields are bound, prompts are configured, and — when
//! the feature is switched on — the selection-validation expression is
//! satisfied. The machine owns the validation sub-state across refresh
//! cycles and writes it only when a computed status actually differs from the
//! stored one, so downstream listeners see transitions, not churn.
//!
//! All mutation flows through [`ReadinessStateMachine::evaluate`]; the poller
//! and the prompt-save path both go through it rather than racing writes.

use serde_json::Value;
use tracing::debug;

use promptlens_types::{PanelOptions, ReadinessSnapshot, ValidationStatus};

/// Classify a validation-expression result as valid/invalid selections.
///
/// Host expressions come back in whatever scalar shape the author wrote:
/// booleans, counts, flag strings. Anything not recognizably false is treated
/// as valid so the gate stays permissive across expression styles.
pub fn classify_validation_result(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|v| !v.is_nan() && v != 0.0).unwrap_or(false),
        Value::String(text) => {
            let normalized = text.trim().to_lowercase();
            !matches!(normalized.as_str(), "false" | "0" | "" | "null" | "undefined" | "no")
        }
        // Arrays/objects are not a documented evaluator shape; permissive.
        _ => true,
    }
}

/// Tracks the validation sub-state and the latest readiness snapshot for one
/// panel instance.
#[derive(Debug, Default)]
pub struct ReadinessStateMachine {
    status: ValidationStatus,
    snapshot: ReadinessSnapshot,
}

impl ReadinessStateMachine {
    /// Current validation sub-state.
    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    /// Latest computed snapshot.
    pub fn snapshot(&self) -> ReadinessSnapshot {
        self.snapshot
    }

    /// Run one evaluation cycle.
    ///
    /// `verdict` is the classified result of the validation expression when a
    /// poll completed this cycle; `None` means no fresh result (validation
    /// disabled, first cycle after enabling, or an evaluator error). Errors
    /// never advance the status, and disabling validation forces
    /// `NotConfigured` from any state so a stale `Satisfied` cannot survive
    /// the feature being switched off.
    pub fn evaluate(&mut self, options: &PanelOptions, dimension_count: usize, measure_count: usize, verdict: Option<bool>) -> ReadinessSnapshot {
        let validation_active = options.enable_selection_validation && !options.validation_expression.trim().is_empty();

        let next_status = if !validation_active {
            ValidationStatus::NotConfigured
        } else {
            match verdict {
                Some(true) => ValidationStatus::Satisfied,
                Some(false) => ValidationStatus::AwaitingSelection,
                None if self.status == ValidationStatus::NotConfigured => ValidationStatus::AwaitingSelection,
                None => self.status,
            }
        };

        if next_status != self.status {
            debug!(from = ?self.status, to = ?next_status, "validation status changed");
            self.status = next_status;
        }

        let snapshot = ReadinessSnapshot {
            connection_ready: !options.connection_name.trim().is_empty(),
            data_ready: dimension_count > 0 || measure_count > 0,
            // Within the enabled regime readiness is exactly "satisfied";
            // an inactive gate never blocks the action.
            validation_ready: !validation_active || self.status == ValidationStatus::Satisfied,
            prompts_ready: options.prompts_configured
                || (!options.system_prompt.trim().is_empty() && !options.user_prompt.trim().is_empty()),
        };

        if snapshot != self.snapshot {
            self.snapshot = snapshot;
        }
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn configured_options() -> PanelOptions {
        PanelOptions {
            connection_name: "Analytics:Claude".into(),
            prompts_configured: true,
            ..PanelOptions::default()
        }
    }

    fn validating_options() -> PanelOptions {
        PanelOptions {
            enable_selection_validation: true,
            validation_expression: "GetSelectedCount([Customer])=1".into(),
            ..configured_options()
        }
    }

    #[test]
    fn classifies_evaluator_scalars() {
        assert!(!classify_validation_result(&Value::Null));
        assert!(classify_validation_result(&json!(true)));
        assert!(!classify_validation_result(&json!(false)));
        assert!(!classify_validation_result(&json!(0)));
        assert!(classify_validation_result(&json!(2)));
        assert!(!classify_validation_result(&json!("0")));
        assert!(!classify_validation_result(&json!("  FALSE ")));
        assert!(!classify_validation_result(&json!("no")));
        assert!(!classify_validation_result(&json!("")));
        assert!(classify_validation_result(&json!("yes")));
        assert!(classify_validation_result(&json!("anything else")));
    }

    #[test]
    fn satisfied_verdict_makes_gate_ready() {
        let mut machine = ReadinessStateMachine::default();
        let options = validating_options();

        let snapshot = machine.evaluate(&options, 1, 1, None);
        assert_eq!(machine.status(), ValidationStatus::AwaitingSelection);
        assert!(!snapshot.validation_ready);
        assert!(!snapshot.is_ready());

        let snapshot = machine.evaluate(&options, 1, 1, Some(true));
        assert_eq!(machine.status(), ValidationStatus::Satisfied);
        assert!(snapshot.validation_ready);
        assert!(snapshot.is_ready());
    }

    #[test]
    fn clearing_selections_returns_to_awaiting() {
        let mut machine = ReadinessStateMachine::default();
        let options = validating_options();
        machine.evaluate(&options, 1, 0, Some(true));
        assert_eq!(machine.status(), ValidationStatus::Satisfied);

        machine.evaluate(&options, 1, 0, Some(false));
        assert_eq!(machine.status(), ValidationStatus::AwaitingSelection);
    }

    #[test]
    fn disabling_validation_resets_status_in_one_cycle() {
        let mut machine = ReadinessStateMachine::default();
        machine.evaluate(&validating_options(), 1, 0, Some(true));
        assert_eq!(machine.status(), ValidationStatus::Satisfied);

        let disabled = configured_options();
        let snapshot = machine.evaluate(&disabled, 1, 0, None);
        assert_eq!(machine.status(), ValidationStatus::NotConfigured);
        assert!(snapshot.validation_ready);
    }

    #[test]
    fn blank_expression_counts_as_not_configured() {
        let mut machine = ReadinessStateMachine::default();
        let options = PanelOptions {
            enable_selection_validation: true,
            validation_expression: "   ".into(),
            ..configured_options()
        };
        let snapshot = machine.evaluate(&options, 1, 0, None);
        assert_eq!(machine.status(), ValidationStatus::NotConfigured);
        assert!(snapshot.validation_ready);
    }

    #[test]
    fn missing_verdict_holds_previous_status() {
        let mut machine = ReadinessStateMachine::default();
        let options = validating_options();
        machine.evaluate(&options, 1, 0, Some(true));

        // Evaluator error this cycle: no fresh verdict, status holds.
        let snapshot = machine.evaluate(&options, 1, 0, None);
        assert_eq!(machine.status(), ValidationStatus::Satisfied);
        assert!(snapshot.validation_ready);
    }

    #[test]
    fn connection_and_data_checks_trim_and_count() {
        let mut machine = ReadinessStateMachine::default();
        let options = PanelOptions {
            connection_name: "   ".into(),
            prompts_configured: true,
            ..PanelOptions::default()
        };
        let snapshot = machine.evaluate(&options, 0, 0, None);
        assert!(!snapshot.connection_ready);
        assert!(!snapshot.data_ready);

        let snapshot = machine.evaluate(&configured_options(), 0, 2, None);
        assert!(snapshot.connection_ready);
        assert!(snapshot.data_ready);
    }

    #[test]
    fn prompts_ready_falls_back_to_nonempty_prompt_text() {
        let mut machine = ReadinessStateMachine::default();
        let mut options = configured_options();
        options.prompts_configured = false;
        options.user_prompt = String::new();
        assert!(!machine.evaluate(&options, 1, 0, None).prompts_ready);

        // Recovered from the secondary store: flag lost, text present.
        options.user_prompt = "Summarize [Region]".into();
        assert!(machine.evaluate(&options, 1, 0, None).prompts_ready);
    }
}
