// Moderation domain models - data structures for the profanity filter.
//
// These are pure domain types with no storage or terminal dependencies.
// Callers decide what to persist and how to render.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shown instead of any submission that contains a banned term.
pub const PLACEHOLDER: &str = "Treść nie jest ładna 🚫";

/// Terms every moderator starts with. Extra terms can be layered on top
/// through configuration.
pub const DEFAULT_BANNED_TERMS: &[&str] = &[
    "kurwa", "chuj", "pierdole", "jebany", "debil", "suka", "idiota",
];

/// Outcome of moderating one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moderated {
    /// Text safe to show: either the submission verbatim or the placeholder.
    pub display_text: String,
    /// Whether a banned term was found.
    pub blocked: bool,
}

impl Moderated {
    /// Submission passed the filter unchanged.
    pub fn pass(text: impl Into<String>) -> Self {
        Self {
            display_text: text.into(),
            blocked: false,
        }
    }

    /// Submission was replaced by the placeholder.
    pub fn blocked() -> Self {
        Self {
            display_text: PLACEHOLDER.to_string(),
            blocked: true,
        }
    }

    /// Render for an HTML surface: escaped, with newlines as `<br>`.
    pub fn to_html(&self) -> String {
        super::rendering::render_multiline(&self.display_text)
    }

    pub fn into_parts(self) -> (String, bool) {
        (self.display_text, self.blocked)
    }
}

impl fmt::Display for Moderated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text)
    }
}

/// Where the placeholder is applied.
///
/// Both policies produce the same views: every read path moderates again.
/// They only differ in what ends up in storage (and therefore in exports).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationPolicy {
    /// Store the original text, block at render time.
    #[default]
    RenderBlocked,
    /// Store the placeholder instead of blocked text.
    PersistBlocked,
}

impl FromStr for ModerationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "render" | "render_blocked" => Ok(ModerationPolicy::RenderBlocked),
            "persist" | "persist_blocked" => Ok(ModerationPolicy::PersistBlocked),
            other => Err(format!("unknown moderation policy '{}'", other)),
        }
    }
}

impl fmt::Display for ModerationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationPolicy::RenderBlocked => write!(f, "render"),
            ModerationPolicy::PersistBlocked => write!(f, "persist"),
        }
    }
}
