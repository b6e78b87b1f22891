//! Cache keys derived from asset requests.

use std::collections::BTreeSet;
use std::fmt;

use sclip_models::SoundtrackPrompt;

/// Deterministic key identifying an asset request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Footage key: keywords trimmed, lower-cased, sorted and deduplicated.
    ///
    /// Keyword order and case never change the key.
    pub fn keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        let normalized: BTreeSet<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self(normalized.into_iter().collect::<Vec<_>>().join(","))
    }

    /// Narration key: the exact text.
    pub fn text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Music key: mood, tempo and genre.
    pub fn soundtrack(prompt: &SoundtrackPrompt) -> Self {
        Self(format!("{}|{}|{}", prompt.mood, prompt.tempo, prompt.genre))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_order_and_case_do_not_matter() {
        let a = Fingerprint::keywords(&["Ocean", "sunset ", "surf"]);
        let b = Fingerprint::keywords(&["surf", "ocean", " SUNSET", "Ocean"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ocean,sunset,surf");
    }

    #[test]
    fn test_blank_keywords_are_dropped() {
        let fp = Fingerprint::keywords(&["  ", "city"]);
        assert_eq!(fp.as_str(), "city");
    }

    #[test]
    fn test_text_is_exact() {
        assert_ne!(Fingerprint::text("Hello world"), Fingerprint::text("hello world"));
    }

    #[test]
    fn test_soundtrack_key() {
        let prompt = SoundtrackPrompt::new("calm", "slow", "ambient");
        assert_eq!(Fingerprint::soundtrack(&prompt).to_string(), "calm|slow|ambient");
    }
}
