// Runtime configuration read from the environment (after `.env` is loaded).

use crate::core::accounts::password::DEFAULT_ITERATIONS;
use crate::core::moderation::ModerationPolicy;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "data/app.db";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: String,
    pub moderation: ModerationPolicy,
    /// Extra banned terms, one per line.
    pub banned_terms_file: Option<PathBuf>,
    pub hash_iterations: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            moderation: ModerationPolicy::default(),
            banned_terms_file: None,
            hash_iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let moderation = match value("LOL_PAGE_MODERATION") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(value = %raw, "Invalid LOL_PAGE_MODERATION: {}", e);
                defaults.moderation
            }),
            None => defaults.moderation,
        };

        let hash_iterations = match value("LOL_PAGE_HASH_ITERATIONS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(value = %raw, "Invalid LOL_PAGE_HASH_ITERATIONS, using default");
                    defaults.hash_iterations
                }
            },
            None => defaults.hash_iterations,
        };

        Self {
            db_path: value("DB_PATH").unwrap_or(defaults.db_path),
            moderation,
            banned_terms_file: value("LOL_PAGE_BANNED_TERMS_FILE").map(PathBuf::from),
            hash_iterations,
        }
    }
}
