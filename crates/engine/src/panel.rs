//! Shared per-instance panel state.
//!
//! One [`PanelState`] exists per panel instance, owned behind an async mutex
//! and shared between the host refresh cycle, the prompt editor, and the
//! validation poller. Every readiness mutation goes through the state
//! machine's single evaluation path, so a poller tick can never clobber a
//! status the prompt-save path set in the same cycle.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use promptlens_types::{PanelOptions, ReadinessSnapshot, TabularResult, ValidationStatus};
use promptlens_util::prompt_cache::{CacheError, PromptCache, PromptSnapshot};

use crate::readiness::ReadinessStateMachine;

/// Panel state shared between the refresh cycle, the poller, and the editor.
pub type SharedPanelState = Arc<Mutex<PanelState>>;

/// Live state for one panel instance.
#[derive(Debug, Default)]
pub struct PanelState {
    /// Current configuration options as delivered by the host.
    pub options: PanelOptions,
    /// Dimension count from the latest layout snapshot.
    pub dimension_count: usize,
    /// Measure count from the latest layout snapshot.
    pub measure_count: usize,
    machine: ReadinessStateMachine,
}

impl PanelState {
    /// State seeded from an initial options payload.
    pub fn new(options: PanelOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Wrap a state for sharing with the poller.
    pub fn shared(self) -> SharedPanelState {
        Arc::new(Mutex::new(self))
    }

    /// Absorb a host refresh cycle: new options and a fresh data snapshot.
    ///
    /// The validation sub-state survives refreshes; only a poll verdict or a
    /// configuration change moves it.
    pub fn update_layout(&mut self, options: PanelOptions, data: &TabularResult) -> ReadinessSnapshot {
        self.options = options;
        self.dimension_count = data.dimension_count();
        self.measure_count = data.measure_count();
        self.machine.evaluate(&self.options, self.dimension_count, self.measure_count, None)
    }

    /// Apply a validation poll outcome (or a no-result cycle).
    pub fn apply_validation_verdict(&mut self, verdict: Option<bool>) -> ReadinessSnapshot {
        self.machine.evaluate(&self.options, self.dimension_count, self.measure_count, verdict)
    }

    /// Latest readiness snapshot.
    pub fn readiness(&self) -> ReadinessSnapshot {
        self.machine.snapshot()
    }

    /// Current validation sub-state.
    pub fn validation_status(&self) -> ValidationStatus {
        self.machine.status()
    }

    /// Persist edited prompts and mark the instance configured.
    ///
    /// The cache write happens first; options only change once the snapshot
    /// is durable, so a failed save leaves state untouched.
    pub fn save_prompts(
        &mut self,
        cache: &PromptCache,
        instance_id: &str,
        system_prompt: String,
        user_prompt: String,
    ) -> Result<ReadinessSnapshot, CacheError> {
        cache.store(
            instance_id,
            PromptSnapshot {
                system_prompt: system_prompt.clone(),
                user_prompt: user_prompt.clone(),
                prompts_configured: true,
                saved_at: Some(Utc::now()),
            },
        )?;
        self.options.system_prompt = system_prompt;
        self.options.user_prompt = user_prompt;
        self.options.prompts_configured = true;
        Ok(self.apply_validation_verdict(None))
    }

    /// Recover prompts from the cache when the host-persisted options lost
    /// them (instance recreated before the property panel was confirmed).
    pub fn recover_prompts(&mut self, cache: &PromptCache, instance_id: &str) -> ReadinessSnapshot {
        if !self.options.prompts_configured
            && let Some(snapshot) = cache.load(instance_id)
        {
            self.options.system_prompt = snapshot.system_prompt;
            self.options.user_prompt = snapshot.user_prompt;
            self.options.prompts_configured = snapshot.prompts_configured;
        }
        self.apply_validation_verdict(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlens_types::{CellValue, ColumnDescriptor};

    fn sample_data() -> TabularResult {
        TabularResult::new(
            vec![ColumnDescriptor::dimension("Region", "Region")],
            vec![vec![CellValue::text("East")]],
        )
    }

    fn configured_options() -> PanelOptions {
        PanelOptions {
            connection_name: "Analytics:Claude".into(),
            prompts_configured: true,
            ..PanelOptions::default()
        }
    }

    #[test]
    fn layout_update_recomputes_counts_and_readiness() {
        let mut state = PanelState::new(PanelOptions::default());
        let snapshot = state.update_layout(configured_options(), &sample_data());
        assert_eq!(state.dimension_count, 1);
        assert_eq!(state.measure_count, 0);
        assert!(snapshot.is_ready());
    }

    #[test]
    fn save_prompts_persists_then_mutates() {
        let cache = PromptCache::ephemeral();
        let mut state = PanelState::new(PanelOptions {
            prompts_configured: false,
            ..configured_options()
        });
        state.update_layout(state.options.clone(), &sample_data());

        let snapshot = state
            .save_prompts(&cache, "panel-1", "You are an analyst.".into(), "Explain [Region]".into())
            .expect("save prompts");
        assert!(snapshot.prompts_ready);
        assert!(state.options.prompts_configured);

        let cached = cache.load("panel-1").expect("cached snapshot");
        assert!(cached.prompts_configured);
        assert!(cached.saved_at.is_some());
        assert_eq!(cached.user_prompt, "Explain [Region]");
    }

    #[test]
    fn recover_prompts_restores_lost_configuration() {
        let cache = PromptCache::ephemeral();
        let mut seeded = PanelState::new(configured_options());
        seeded
            .save_prompts(&cache, "panel-1", "System".into(), "User [Region]".into())
            .expect("seed cache");

        // Host recreated the instance; options came back unconfigured.
        let mut state = PanelState::new(PanelOptions {
            prompts_configured: false,
            system_prompt: String::new(),
            user_prompt: String::new(),
            ..configured_options()
        });
        state.update_layout(state.options.clone(), &sample_data());
        let snapshot = state.recover_prompts(&cache, "panel-1");
        assert!(snapshot.prompts_ready);
        assert_eq!(state.options.user_prompt, "User [Region]");
    }

    #[test]
    fn recover_prompts_leaves_configured_instances_alone() {
        let cache = PromptCache::ephemeral();
        cache
            .store(
                "panel-1",
                PromptSnapshot {
                    system_prompt: "stale".into(),
                    user_prompt: "stale".into(),
                    prompts_configured: true,
                    saved_at: None,
                },
            )
            .expect("seed cache");

        let mut state = PanelState::new(PanelOptions {
            system_prompt: "fresh".into(),
            user_prompt: "fresh".into(),
            ..configured_options()
        });
        state.recover_prompts(&cache, "panel-1");
        assert_eq!(state.options.user_prompt, "fresh");
    }
}
