use serde::{Deserialize, Serialize};

/// Maximum visible characters in a node summary before truncation.
pub const SUMMARY_MAX_CHARS: usize = 20;

/// Label used when the user turn carries no text.
pub const EMPTY_SUMMARY: &str = "(empty message)";

/// One (user, assistant) exchange as currently observed on the page.
///
/// Markup fields are transient: they live in memory for the lifetime of the
/// node and are zeroed before persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnPair {
    pub user_text: String,
    pub user_html: String,
    pub assistant_text: String,
    pub assistant_html: String,
}

impl TurnPair {
    /// Convenience constructor for text-only pairs (mostly tests).
    pub fn from_text(user_text: &str, assistant_text: &str) -> Self {
        Self {
            user_text: user_text.to_string(),
            assistant_text: assistant_text.to_string(),
            ..Self::default()
        }
    }
}

/// Derive a node label from the user turn's text: whitespace collapsed, at
/// most `SUMMARY_MAX_CHARS` characters, `…`-suffixed when cut.
pub fn summarize(user_text: &str) -> String {
    let flat = user_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }
    // char boundaries, not bytes: the cut must not split a multibyte char
    match flat.char_indices().nth(SUMMARY_MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}
