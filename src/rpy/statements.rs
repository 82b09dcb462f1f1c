//! Statement template registry.
//!
//! Learned templates are the state that survives between a forward pass and
//! the matching reverse pass. Dialogue statements are keyed by id with just
//! their template string; free-form statements (bodies the classifier could
//! not extract dialogue from) additionally keep their source location for
//! auditing. The persisted form is an inverted index grouped by template
//! string, which keeps the JSON reviewable when hundreds of ids share one
//! template.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::gettext::catalog::Message;
use crate::rpy::file::TranslationEntry;
use crate::textutil::escape_renpy;

/// A free-form statement: the learned template plus where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub id: String,
    pub template: String,
    pub file: String,
    pub line: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statements {
    plain: HashMap<String, Statement>,
    dialogue: HashMap<String, String>,
}

impl Statements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_dialogue(&mut self, id: impl Into<String>, template: impl Into<String>) {
        self.dialogue.insert(id.into(), template.into());
    }

    pub fn insert_plain(&mut self, stmt: Statement) {
        self.plain.insert(stmt.id.clone(), stmt);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dialogue.contains_key(id)
    }

    pub fn dialogue_template(&self, id: &str) -> Option<&str> {
        self.dialogue.get(id).map(String::as_str)
    }

    pub fn plain_statement(&self, id: &str) -> Option<&Statement> {
        self.plain.get(id)
    }

    /// Whether the stored template for `id` is textually identical to
    /// `template`. An id with no stored template does not match.
    pub fn matches(&self, id: &str, template: &str) -> bool {
        self.dialogue.get(id).is_some_and(|stored| stored.as_str() == template)
    }

    pub fn dialogue_len(&self) -> usize {
        self.dialogue.len()
    }

    pub fn plain_len(&self) -> usize {
        self.plain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogue.is_empty() && self.plain.is_empty()
    }

    /// Reconstruct the structural translation entry for one catalog message.
    ///
    /// A message without context is a plain strings entry. A message with a
    /// context requires a registered dialogue template; a context this
    /// registry has never seen cannot be reconstructed and is an error.
    pub fn format_message(&self, msg: &Message, language: &str) -> anyhow::Result<TranslationEntry> {
        let reference = msg
            .first_reference()?
            .ok_or_else(|| anyhow!("message has no source reference: {}", msg.key()))?;
        let Some(context) = &msg.context else {
            return Ok(TranslationEntry {
                id: None,
                language: language.to_string(),
                original_text: msg.id.clone(),
                translated_text: msg.translated.clone(),
                file: reference.file,
                line: reference.line,
            });
        };
        let template = self
            .dialogue
            .get(context)
            .ok_or_else(|| anyhow!("msgctxt does not correlate to any statement: {context}"))?;
        Ok(TranslationEntry {
            id: Some(context.clone()),
            language: language.to_string(),
            original_text: apply_template(template, &msg.id),
            translated_text: apply_template(template, &msg.translated),
            file: reference.file,
            line: reference.line,
        })
    }

    pub fn to_persisted(&self) -> PersistedStatements {
        let mut dialogue: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (id, template) in &self.dialogue {
            dialogue.entry(template).or_default().push(id);
        }
        let mut plain: BTreeMap<&str, Vec<&Statement>> = BTreeMap::new();
        for stmt in self.plain.values() {
            plain.entry(&stmt.template).or_default().push(stmt);
        }
        PersistedStatements {
            dialogue: dialogue
                .into_iter()
                .map(|(template, mut ids)| {
                    ids.sort_unstable();
                    PersistedDialogueGroup {
                        statement: template.to_string(),
                        ids: ids.into_iter().map(str::to_string).collect(),
                    }
                })
                .collect(),
            plain: plain
                .into_iter()
                .map(|(template, mut stmts)| {
                    stmts.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
                    PersistedPlainGroup {
                        statement: template.to_string(),
                        entries: stmts
                            .into_iter()
                            .map(|s| PersistedPlainEntry {
                                location: format!("{}:{}", s.file, s.line),
                                id: s.id.clone(),
                            })
                            .collect(),
                    }
                })
                .collect(),
        }
    }

    pub fn from_persisted(persisted: PersistedStatements) -> anyhow::Result<Self> {
        let mut out = Self::new();
        for group in persisted.dialogue {
            for id in group.ids {
                out.dialogue.insert(id, group.statement.clone());
            }
        }
        for group in persisted.plain {
            for entry in group.entries {
                let reference = crate::gettext::catalog::SourceReference::parse(&entry.location)?;
                out.plain.insert(
                    entry.id.clone(),
                    Statement {
                        id: entry.id,
                        template: group.statement.clone(),
                        file: reference.file,
                        line: reference.line,
                    },
                );
            }
        }
        Ok(out)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.to_persisted()).context("serialize statements")?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let persisted: PersistedStatements =
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
        Self::from_persisted(persisted)
    }
}

/// Substitute catalog text back into a statement template. A `who :: what`
/// composite fills both placeholders; anything else fills `[what]` alone.
/// Quotes and backslashes are escaped on the way in, since catalog text is
/// unescaped while templates expect string-literal content.
fn apply_template(template: &str, msg: &str) -> String {
    if let Some(index) = msg.find("::") {
        if index > 0 {
            let who = escape_renpy(msg[..index].trim());
            let what = escape_renpy(msg[index + 2..].trim());
            return template.replace("[who]", &who).replace("[what]", &what);
        }
    }
    template.replace("[what]", &escape_renpy(msg))
}

/// On-disk shape: template string -> ids (dialogue) or located entries
/// (plain).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedStatements {
    #[serde(default)]
    pub dialogue: Vec<PersistedDialogueGroup>,
    #[serde(default)]
    pub plain: Vec<PersistedPlainGroup>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedDialogueGroup {
    pub statement: String,
    pub ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedPlainGroup {
    pub statement: String,
    pub entries: Vec<PersistedPlainEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedPlainEntry {
    pub location: String,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(ctx: Option<&str>, id: &str, translated: &str, reference: &str) -> Message {
        Message {
            context: ctx.map(str::to_string),
            id: id.to_string(),
            translated: translated.to_string(),
            source_refs: vec![reference.to_string()],
            comments: vec![],
            obsolete: false,
        }
    }

    #[test]
    fn matches_requires_identical_template() {
        let mut s = Statements::new();
        s.insert_dialogue("s1", r#"mc "[what]""#);
        assert!(s.matches("s1", r#"mc "[what]""#));
        assert!(!s.matches("s1", r#"mc "[what]" nointeract"#));
        assert!(!s.matches("unknown", r#"mc "[what]""#));
    }

    #[test]
    fn format_plain_message() {
        let s = Statements::new();
        let entry = s
            .format_message(&message(None, "Yes", "Oui", "game/a.rpy:3"), "french")
            .expect("format");
        assert_eq!(entry.id, None);
        assert_eq!(entry.original_text, "Yes");
        assert_eq!(entry.translated_text, "Oui");
        assert_eq!(entry.file, "game/a.rpy");
        assert_eq!(entry.line, 3);
    }

    #[test]
    fn format_character_dialogue() {
        let mut s = Statements::new();
        s.insert_dialogue("s1", r#"mc "[what]" nointeract"#);
        let entry = s
            .format_message(
                &message(Some("s1"), "Hello there.", "Bonjour.", "game/a.rpy:10"),
                "french",
            )
            .expect("format");
        assert_eq!(entry.id.as_deref(), Some("s1"));
        assert_eq!(entry.original_text, r#"mc "Hello there." nointeract"#);
        assert_eq!(entry.translated_text, r#"mc "Bonjour." nointeract"#);
    }

    #[test]
    fn format_name_only_dialogue_splits_on_separator() {
        let mut s = Statements::new();
        s.insert_dialogue("s2", r#""[who]" "[what]""#);
        let entry = s
            .format_message(
                &message(Some("s2"), "Eileen :: Hello.", "Eileen :: Bonjour.", "game/a.rpy:12"),
                "french",
            )
            .expect("format");
        assert_eq!(entry.original_text, r#""Eileen" "Hello.""#);
        assert_eq!(entry.translated_text, r#""Eileen" "Bonjour.""#);
    }

    #[test]
    fn format_escapes_structural_characters() {
        let mut s = Statements::new();
        s.insert_dialogue("s3", r#"mc "[what]""#);
        let entry = s
            .format_message(
                &message(Some("s3"), "He said \"hi\".", "Il a dit \"salut\".", "game/a.rpy:14"),
                "french",
            )
            .expect("format");
        assert_eq!(entry.original_text, r#"mc "He said \"hi\".""#);
        assert_eq!(entry.translated_text, r#"mc "Il a dit \"salut\".""#);
    }

    #[test]
    fn format_unknown_context_is_error() {
        let s = Statements::new();
        let err = s
            .format_message(&message(Some("ghost"), "Hi", "Salut", "game/a.rpy:1"), "french")
            .expect_err("must fail");
        assert!(format!("{err}").contains("ghost"));
    }

    #[test]
    fn format_without_reference_is_error() {
        let s = Statements::new();
        let mut msg = message(None, "Hi", "Salut", "unused");
        msg.source_refs.clear();
        assert!(s.format_message(&msg, "french").is_err());
    }

    #[test]
    fn format_malformed_reference_is_error() {
        let s = Statements::new();
        let msg = message(None, "Hi", "Salut", "no-separator");
        assert!(s.format_message(&msg, "french").is_err());
    }

    #[test]
    fn persisted_form_inverts_cleanly() {
        let mut s = Statements::new();
        s.insert_dialogue("s1", r#"mc "[what]""#);
        s.insert_dialogue("s2", r#"mc "[what]""#);
        s.insert_dialogue("s3", r#""[who]" "[what]""#);
        s.insert_plain(Statement {
            id: "p1".to_string(),
            template: "nvl clear".to_string(),
            file: "game/a.rpy".to_string(),
            line: 5,
        });
        let persisted = s.to_persisted();
        // grouped by template, ids sorted
        let mc_group = persisted
            .dialogue
            .iter()
            .find(|g| g.statement == r#"mc "[what]""#)
            .expect("group");
        assert_eq!(mc_group.ids, ["s1", "s2"]);
        let round = Statements::from_persisted(persisted).expect("invert");
        assert_eq!(round, s);
    }

    #[test]
    fn persisted_json_round_trip() {
        let mut s = Statements::new();
        s.insert_dialogue("s1", r#"e "[what]" with vpunch"#);
        s.insert_plain(Statement {
            id: "p1".to_string(),
            template: "nvl clear".to_string(),
            file: "game/b.rpy".to_string(),
            line: 9,
        });
        let json = serde_json::to_string(&s.to_persisted()).expect("json");
        let parsed: PersistedStatements = serde_json::from_str(&json).expect("parse");
        assert_eq!(Statements::from_persisted(parsed).expect("invert"), s);
    }
}
