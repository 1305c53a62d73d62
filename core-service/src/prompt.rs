//! Confirmation step between selecting a clip and playing it.

use core_sync::AudioEntry;
use serde::{Deserialize, Serialize};

/// Title shown on every confirmation prompt.
pub const PROMPT_TITLE: &str = "Audio URL";

/// Two-button confirmation surfaced after a selection.
///
/// The message is the entry's locator, or empty when the entry has none.
/// Confirming a prompt without a locator reports a playback failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub message: String,
    entry: String,
    url: Option<String>,
}

impl ConfirmationPrompt {
    pub fn for_entry(entry: &AudioEntry) -> Self {
        Self {
            title: PROMPT_TITLE.to_string(),
            message: entry.url().unwrap_or_default().to_string(),
            entry: entry.name().to_string(),
            url: entry.url().map(str::to_string),
        }
    }

    /// Name of the selected entry.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Locator that confirming will play.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// The user's answer to a [`ConfirmationPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Play the prompted clip.
    Confirm,
    /// Dismiss the prompt. No side effect.
    Cancel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_shows_url() {
        let entry = AudioEntry::new("clip1", Some("https://x/a.mp3".to_string()));
        let prompt = ConfirmationPrompt::for_entry(&entry);

        assert_eq!(prompt.title, "Audio URL");
        assert_eq!(prompt.message, "https://x/a.mp3");
        assert_eq!(prompt.entry(), "clip1");
        assert_eq!(prompt.url(), Some("https://x/a.mp3"));
    }

    #[test]
    fn test_prompt_without_url_has_empty_message() {
        let prompt = ConfirmationPrompt::for_entry(&AudioEntry::new("orphan", None));

        assert_eq!(prompt.message, "");
        assert_eq!(prompt.url(), None);
    }
}
