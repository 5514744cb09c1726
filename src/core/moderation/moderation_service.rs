// Content moderator - core business logic for the profanity filter.
//
// This service handles:
// - Case-insensitive banned-term detection (unanchored substring match)
// - Swapping blocked submissions for the placeholder
// - Deciding what to persist under the configured policy
//
// The banned-term set is fixed at construction and never mutated, so one
// moderator can be shared behind an Arc by every task without locking.

use super::moderation_models::{Moderated, ModerationPolicy, DEFAULT_BANNED_TERMS, PLACEHOLDER};
use aho_corasick::AhoCorasick;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Could not build banned-term matcher: {0}")]
    InvalidTermSet(String),

    #[error("Could not read banned-term file {path}: {source}")]
    TermFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Decides whether a submission can be shown verbatim.
///
/// Matching is a plain substring search over the lowercased submission, so a
/// term also matches inside longer words ("ups" blocks "groups").
#[derive(Debug)]
pub struct ContentModerator {
    terms: BTreeSet<String>,
    /// `None` when the term set is empty; nothing can match then.
    automaton: Option<AhoCorasick>,
}

impl ContentModerator {
    /// Build a moderator from an arbitrary term list.
    ///
    /// Terms are lowercased and deduplicated. Empty terms are dropped because
    /// they would match every submission.
    pub fn new<I, T>(terms: I) -> Result<Self, ModerationError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let terms: BTreeSet<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let automaton = if terms.is_empty() {
            None
        } else {
            let patterns: Vec<&str> = terms.iter().map(String::as_str).collect();
            Some(
                AhoCorasick::new(&patterns)
                    .map_err(|e| ModerationError::InvalidTermSet(e.to_string()))?,
            )
        };

        tracing::debug!(term_count = terms.len(), "Content moderator initialized");
        Ok(Self { terms, automaton })
    }

    /// Moderator with the built-in term list.
    pub fn with_default_terms() -> Result<Self, ModerationError> {
        Self::new(DEFAULT_BANNED_TERMS.iter().copied())
    }

    /// Built-in terms plus whatever the file at `path` adds.
    pub fn with_terms_file(path: impl AsRef<Path>) -> Result<Self, ModerationError> {
        let extra = load_terms_file(path)?;
        Self::new(DEFAULT_BANNED_TERMS.iter().map(|t| t.to_string()).chain(extra))
    }

    /// The normalized banned terms, sorted.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// Check a submission. Absent input counts as the empty string.
    pub fn moderate<'a>(&self, text: impl Into<Option<&'a str>>) -> Moderated {
        let text = text.into().unwrap_or_default();
        if self.is_blocked(text) {
            tracing::debug!(len = text.len(), "Submission blocked by content filter");
            Moderated::blocked()
        } else {
            Moderated::pass(text)
        }
    }

    /// True if any banned term occurs anywhere in `text`, ignoring case.
    pub fn is_blocked(&self, text: &str) -> bool {
        match &self.automaton {
            Some(ac) if !text.is_empty() => ac.is_match(&text.to_lowercase()),
            _ => false,
        }
    }

    /// What to write to storage for `text` under `policy`.
    pub fn for_storage(&self, text: &str, policy: ModerationPolicy) -> String {
        match policy {
            ModerationPolicy::PersistBlocked if self.is_blocked(text) => PLACEHOLDER.to_string(),
            _ => text.to_string(),
        }
    }
}

/// Read one term per line. Blank lines and `#` comments are skipped.
pub fn load_terms_file(path: impl AsRef<Path>) -> Result<Vec<String>, ModerationError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ModerationError::TermFile {
        path: path.display().to_string(),
        source,
    })?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================
