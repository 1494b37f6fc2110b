//! Prompt configuration cache for panel instances.
//!
//! The host persists panel options itself, but that store is only written
//! when the user confirms the property panel; the prompt editor also saves
//! through this secondary cache so a configuration survives the host
//! recreating the panel instance mid-session. One JSON file holds the
//! snapshots for every instance, keyed by the host's object identifier, and
//! is safe to share across threads thanks to the internal `Mutex`.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::expand_tilde;

/// Environment variable allowing callers to override the cache file path.
pub const CACHE_PATH_ENV: &str = "PROMPTLENS_CACHE_PATH";

/// Default filename for the JSON payload.
pub const CACHE_FILE_NAME: &str = "prompts.json";

/// Error surfaced when reading or writing the cache fails.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O failure (for example, permissions or missing directory).
    #[error("prompt cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure.
    #[error("prompt cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Prompt configuration saved for one panel instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptSnapshot {
    /// System prompt text as last saved.
    pub system_prompt: String,
    /// User prompt template as last saved.
    pub user_prompt: String,
    /// Whether the user completed prompt configuration.
    pub prompts_configured: bool,
    /// When the snapshot was saved.
    pub saved_at: Option<DateTime<Utc>>,
}

/// Thread-safe prompt cache backed by a JSON file.
#[derive(Debug, Default)]
pub struct PromptCache {
    path: PathBuf,
    payload: Mutex<HashMap<String, PromptSnapshot>>,
    persist_to_disk: bool,
}

impl PromptCache {
    /// Create a store at the default (or env-overridden) path, loading any
    /// existing payload.
    pub fn new() -> Result<Self, CacheError> {
        let resolved_path = default_cache_path();
        let payload = load_payload(&resolved_path)?;
        Ok(Self {
            path: resolved_path,
            payload: Mutex::new(payload),
            persist_to_disk: true,
        })
    }

    /// Build an in-memory store for hosts without a config directory and for
    /// tests.
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::new(),
            payload: Mutex::new(HashMap::new()),
            persist_to_disk: false,
        }
    }

    /// Path to the underlying JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the snapshot saved for an instance, if any.
    pub fn load(&self, instance_id: &str) -> Option<PromptSnapshot> {
        self.payload.lock().expect("prompt cache lock poisoned").get(instance_id).cloned()
    }

    /// Persist a snapshot for an instance.
    pub fn store(&self, instance_id: &str, snapshot: PromptSnapshot) -> Result<(), CacheError> {
        let mut payload = self.payload.lock().expect("prompt cache lock poisoned");
        payload.insert(instance_id.to_string(), snapshot);
        if self.persist_to_disk {
            self.save_locked(&payload)?;
        }
        Ok(())
    }

    /// Drop the snapshot for an instance, if present.
    pub fn forget(&self, instance_id: &str) -> Result<(), CacheError> {
        let mut payload = self.payload.lock().expect("prompt cache lock poisoned");
        if payload.remove(instance_id).is_some() && self.persist_to_disk {
            self.save_locked(&payload)?;
        }
        Ok(())
    }

    fn save_locked(&self, payload: &HashMap<String, PromptSnapshot>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(payload)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

fn default_cache_path() -> PathBuf {
    if let Ok(path) = env::var(CACHE_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptlens")
        .join(CACHE_FILE_NAME)
}

fn load_payload(path: &Path) -> Result<HashMap<String, PromptSnapshot>, CacheError> {
    match fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(payload) => Ok(payload),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Failed to parse prompt cache; starting empty"
                );
                Ok(HashMap::new())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(error) => Err(CacheError::Io(error)),
    }
}
