//! Periodic validation re-check task.
//!
//! The host pushes no selection-change notifications to this layer, so the
//! validation expression is re-evaluated on a fixed interval. Each issued
//! poll carries a monotonic sequence number and completions are applied
//! last-issued-wins: when polls overlap on a slow evaluator, a stale
//! completion arriving after a newer one is discarded instead of rolling the
//! status back. Evaluator failures log and leave the status untouched.
//!
//! The task must be shut down when the host tears the panel instance down;
//! instances are recreated without a process restart and an orphaned ticker
//! would keep polling the old expression forever.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::invoke::ExpressionInvoker;
use crate::panel::SharedPanelState;
use crate::readiness::classify_validation_result;

struct PollOutcome {
    sequence: u64,
    result: Result<Value>,
}

/// Handle to the spawned validation poll loop.
#[derive(Debug)]
pub struct ValidationPoller {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ValidationPoller {
    /// Spawn the poll loop on the current runtime.
    pub fn spawn(period: Duration, state: SharedPanelState, invoker: Arc<dyn ExpressionInvoker>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(period, state, invoker, shutdown_rx));
        Self {
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    /// Stop the loop and wait for the task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ValidationPoller {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

async fn poll_loop(period: Duration, state: SharedPanelState, invoker: Arc<dyn ExpressionInvoker>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<PollOutcome>();
    let mut issued: u64 = 0;
    let mut applied: u64 = 0;

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("validation poller shutting down");
                    break;
                }
            }
            Some(outcome) = result_rx.recv() => {
                if outcome.sequence <= applied {
                    debug!(sequence = outcome.sequence, newest = applied, "discarding stale validation poll result");
                    continue;
                }
                applied = outcome.sequence;
                match outcome.result {
                    Ok(value) => {
                        let verdict = classify_validation_result(&value);
                        state.lock().await.apply_validation_verdict(Some(verdict));
                    }
                    Err(error) => {
                        warn!(%error, "validation expression evaluation failed; keeping previous status");
                    }
                }
            }
            _ = ticker.tick() => {
                let expression = {
                    let mut panel = state.lock().await;
                    let active = panel.options.enable_selection_validation
                        && !panel.options.validation_expression.trim().is_empty();
                    if active {
                        Some(panel.options.validation_expression.clone())
                    } else {
                        // Still drive a cycle so disabling the feature resets
                        // the status within one poll period.
                        panel.apply_validation_verdict(None);
                        None
                    }
                };
                if let Some(expression) = expression {
                    issued += 1;
                    let sequence = issued;
                    let invoker = Arc::clone(&invoker);
                    let result_tx = result_tx.clone();
                    tokio::spawn(async move {
                        let result = invoker.evaluate(&expression).await;
                        let _ = result_tx.send(PollOutcome { sequence, result });
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelState;
    use async_trait::async_trait;
    use promptlens_types::{PanelOptions, ValidationStatus};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Invoker replaying a script of (delay, result) pairs; once the script
    /// is exhausted further calls never resolve.
    struct ScriptedInvoker {
        script: Mutex<VecDeque<(Duration, Result<Value, String>)>>,
    }

    impl ScriptedInvoker {
        fn new(script: Vec<(Duration, Result<Value, String>)>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl ExpressionInvoker for ScriptedInvoker {
        async fn evaluate(&self, _expression: &str) -> Result<Value> {
            let step = self.script.lock().expect("script lock").pop_front();
            match step {
                Some((delay, result)) => {
                    tokio::time::sleep(delay).await;
                    result.map_err(|message| anyhow::anyhow!("{message}"))
                }
                None => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn validating_state() -> SharedPanelState {
        PanelState::new(PanelOptions {
            connection_name: "Analytics:Claude".into(),
            prompts_configured: true,
            enable_selection_validation: true,
            validation_expression: "GetSelectedCount([Customer])=1".into(),
            ..PanelOptions::default()
        })
        .shared()
    }

    #[tokio::test(start_paused = true)]
    async fn poll_verdict_reaches_the_state_machine() {
        let state = validating_state();
        let invoker = ScriptedInvoker::new(vec![(Duration::from_millis(10), Ok(json!("1")))]);
        let poller = ValidationPoller::spawn(Duration::from_millis(100), Arc::clone(&state), invoker);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.lock().await.validation_status(), ValidationStatus::Satisfied);
        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stale_overlapping_poll_is_discarded() {
        let state = validating_state();
        // First poll is slow and comes back invalid after the second, faster
        // poll already reported valid selections.
        let invoker = ScriptedInvoker::new(vec![
            (Duration::from_millis(500), Ok(json!(false))),
            (Duration::from_millis(50), Ok(json!("yes"))),
        ]);
        let poller = ValidationPoller::spawn(Duration::from_millis(100), Arc::clone(&state), invoker);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(state.lock().await.validation_status(), ValidationStatus::Satisfied);
        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn evaluator_error_keeps_previous_status() {
        let state = validating_state();
        let invoker = ScriptedInvoker::new(vec![
            (Duration::from_millis(10), Ok(json!("yes"))),
            (Duration::from_millis(10), Err("engine unavailable".into())),
        ]);
        let poller = ValidationPoller::spawn(Duration::from_millis(100), Arc::clone(&state), invoker);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(state.lock().await.validation_status(), ValidationStatus::Satisfied);
        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_validation_resets_within_one_period() {
        let state = validating_state();
        let invoker = ScriptedInvoker::new(vec![(Duration::from_millis(10), Ok(json!("yes")))]);
        let poller = ValidationPoller::spawn(Duration::from_millis(100), Arc::clone(&state), invoker);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.lock().await.validation_status(), ValidationStatus::Satisfied);

        state.lock().await.options.enable_selection_validation = false;
        tokio::time::sleep(Duration::from_millis(150)).await;
        let panel = state.lock().await;
        assert_eq!(panel.validation_status(), ValidationStatus::NotConfigured);
        assert!(panel.readiness().validation_ready);
        drop(panel);
        poller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_task() {
        let state = validating_state();
        let invoker = ScriptedInvoker::new(vec![]);
        let poller = ValidationPoller::spawn(Duration::from_millis(100), state, invoker);
        poller.shutdown().await;
    }
}
