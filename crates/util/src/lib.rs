//! Utility helpers shared across the promptlens workspace.

use std::path::PathBuf;

use dirs_next::home_dir;

pub mod prompt_cache;

pub use prompt_cache::{CacheError, PromptCache, PromptSnapshot};

/// Expands a leading `~` or `~/` in a user-supplied path.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    if let Some(rest) = p.strip_prefix("~\\") {
        // Windows-style
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

#[cfg(test)]
mod tests {
    use super::expand_tilde;

    #[test]
    fn passes_plain_paths_through() {
        assert_eq!(expand_tilde("/tmp/cache.json"), std::path::PathBuf::from("/tmp/cache.json"));
    }

    #[test]
    fn expands_home_prefix() {
        let expanded = expand_tilde("~/prompts.json");
        assert!(expanded.ends_with("prompts.json"));
        assert!(!expanded.to_string_lossy().starts_with('~') || dirs_next::home_dir().is_none());
    }
}
