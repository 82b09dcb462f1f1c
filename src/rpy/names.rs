//! Character name table: maps bare speaker identifiers to display names.

use std::collections::HashMap;

/// Shorthand some scripts use for the narrator speaker.
const NARRATOR_SHORTHAND: &str = "@";

#[derive(Clone, Debug)]
pub struct CharacterNames {
    names: HashMap<String, String>,
    narrator: String,
    speak_format: String,
}

impl CharacterNames {
    pub fn new(names: HashMap<String, String>, narrator: String, speak_format: String) -> Self {
        Self {
            names,
            narrator,
            speak_format,
        }
    }

    pub fn with_defaults(names: HashMap<String, String>) -> Self {
        Self::new(names, "Narrator".to_string(), "%s speaking".to_string())
    }

    pub fn contains(&self, who: &str) -> bool {
        self.names.contains_key(who)
    }

    /// Resolve a speaker identifier to a display name. `None` or the `@`
    /// shorthand resolves to the narrator label.
    pub fn get(&self, who: Option<&str>) -> Option<&str> {
        match who {
            None => Some(&self.narrator),
            Some(NARRATOR_SHORTHAND) => Some(&self.narrator),
            Some(who) => self.names.get(who).map(String::as_str),
        }
    }

    /// Format a display name into a translator comment ("Eileen speaking").
    pub fn format_speaker(&self, speaker: &str) -> String {
        self.speak_format.replace("%s", speaker)
    }
}

impl Default for CharacterNames {
    fn default() -> Self {
        Self::with_defaults(HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CharacterNames {
        let mut names = HashMap::new();
        names.insert("mc".to_string(), "Main Character".to_string());
        CharacterNames::with_defaults(names)
    }

    #[test]
    fn resolves_known_ids() {
        let names = sample();
        assert!(names.contains("mc"));
        assert_eq!(names.get(Some("mc")), Some("Main Character"));
        assert_eq!(names.get(Some("unknown")), None);
    }

    #[test]
    fn narrator_shorthand() {
        let names = sample();
        assert_eq!(names.get(None), Some("Narrator"));
        assert_eq!(names.get(Some("@")), Some("Narrator"));
    }

    #[test]
    fn speaker_comment_format() {
        assert_eq!(sample().format_speaker("Main Character"), "Main Character speaking");
    }
}
