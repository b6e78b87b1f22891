//! Narration scripts.
//!
//! Scripts are produced by the external script generator and read from JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A narrated video script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(alias = "Title")]
    pub title: String,

    #[serde(default, alias = "Scenes")]
    pub scenes: Vec<Scene>,

    /// Mood / tempo / genre of the background music
    #[serde(default, alias = "Soundtrack_Prompt")]
    pub soundtrack_prompt: Option<SoundtrackPrompt>,
}

impl Script {
    /// Add a keyword to every scene that already has keywords.
    ///
    /// Keywords are lower-cased and deduplicated afterwards.
    pub fn add_general_keyword(&mut self, word: &str) {
        for scene in &mut self.scenes {
            if let Some(keywords) = scene.keywords.as_mut() {
                keywords.push(word.to_string());
                let unique: BTreeSet<String> =
                    keywords.iter().map(|k| k.to_lowercase()).collect();
                *keywords = unique.into_iter().collect();
            }
        }
    }
}

/// One scene: a narration line and the keywords used to find footage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,

    #[serde(default, alias = "Keywords")]
    pub keywords: Option<Vec<String>>,
}

impl Scene {
    pub fn new(message: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            message: Some(message.into()),
            keywords: Some(keywords.iter().map(|k| k.to_string()).collect()),
        }
    }

    /// Scenes without narration or keywords cannot be rendered.
    pub fn is_renderable(&self) -> bool {
        let has_message = self.message.as_deref().is_some_and(|m| !m.trim().is_empty());
        let has_keywords = self.keywords.as_ref().is_some_and(|k| !k.is_empty());
        has_message && has_keywords
    }
}

/// Background music request, serialized as `[mood, tempo, genre]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SoundtrackPrompt {
    pub mood: String,
    pub tempo: String,
    pub genre: String,
}

impl SoundtrackPrompt {
    pub fn new(mood: impl Into<String>, tempo: impl Into<String>, genre: impl Into<String>) -> Self {
        Self {
            mood: mood.into(),
            tempo: tempo.into(),
            genre: genre.into(),
        }
    }
}

/// Error for soundtrack prompts that are not exactly three entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundtrackPromptError(pub usize);

impl fmt::Display for SoundtrackPromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "soundtrack prompt needs [mood, tempo, genre], got {} entries",
            self.0
        )
    }
}

impl std::error::Error for SoundtrackPromptError {}

impl TryFrom<Vec<String>> for SoundtrackPrompt {
    type Error = SoundtrackPromptError;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        match <[String; 3]>::try_from(parts) {
            Ok([mood, tempo, genre]) => Ok(Self { mood, tempo, genre }),
            Err(parts) => Err(SoundtrackPromptError(parts.len())),
        }
    }
}

impl From<SoundtrackPrompt> for Vec<String> {
    fn from(prompt: SoundtrackPrompt) -> Self {
        vec![prompt.mood, prompt.tempo, prompt.genre]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generator_output() {
        let json = r#"{
            "Title": "Lions at Dawn",
            "Soundtrack_Prompt": ["epic", "medium", "cinematic"],
            "Scenes": [
                {"Message": "The pride wakes.", "Keywords": ["lion", "Savanna"]},
                {"Message": null, "Keywords": null}
            ]
        }"#;
        let script: Script = serde_json::from_str(json).unwrap();
        assert_eq!(script.title, "Lions at Dawn");
        assert_eq!(
            script.soundtrack_prompt,
            Some(SoundtrackPrompt::new("epic", "medium", "cinematic"))
        );
        assert_eq!(script.scenes.len(), 2);
        assert!(script.scenes[0].is_renderable());
        assert!(!script.scenes[1].is_renderable());
    }

    #[test]
    fn test_soundtrack_prompt_requires_three_entries() {
        let result: Result<SoundtrackPrompt, _> = serde_json::from_str(r#"["epic", "slow"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_add_general_keyword() {
        let mut script = Script {
            title: "t".into(),
            scenes: vec![Scene::new("m", &["Lion", "grass"]), Scene::default()],
            soundtrack_prompt: None,
        };
        script.add_general_keyword("lion");
        assert_eq!(
            script.scenes[0].keywords.as_deref(),
            Some(&["grass".to_string(), "lion".to_string()][..])
        );
        assert!(script.scenes[1].keywords.is_none());
    }
}
