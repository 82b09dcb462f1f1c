//! Forward conversion: Ren'Py translation files into a message catalog.
//!
//! Statement entries become context-carrying messages whose id is the spoken
//! text (or `who :: what` for name-only dialogue); strings entries become
//! context-free messages keyed by their exact original text. While converting,
//! the pass either learns statement templates into a fresh registry or
//! validates each entry against an existing one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use crate::gettext::catalog::{Catalog, Message};
use crate::progress::ConsoleProgress;
use crate::rpy::dialogue::Dialogue;
use crate::rpy::file::TranslationFile;
use crate::rpy::names::CharacterNames;
use crate::rpy::statements::{Statement, Statements};
use crate::textutil::unescape_renpy;

/// Whether a conversion pass learns templates or checks them against a
/// previously learned registry.
pub enum FormatCheck<'a> {
    Learn,
    Validate(&'a Statements),
}

/// What to emit as `#.` translator comments for dialogue messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentPolicy {
    None,
    /// One "<display name> speaking" comment per dialogue message.
    Speaking,
}

#[derive(Debug)]
pub struct ConvertResult {
    pub catalog: Catalog,
    /// Templates learned during this pass. Empty in validate mode, which
    /// never touches the registry it checks against.
    pub statements: Statements,
    /// Ids whose on-disk template no longer agrees with the registry
    /// (validate mode only).
    pub mismatched_ids: Vec<String>,
    /// Speaker identifiers with no entry in the name table, in order of
    /// first appearance.
    pub missing_names: Vec<String>,
}

pub struct RpyToPoConverter<'a> {
    language: String,
    names: &'a CharacterNames,
    comment_policy: CommentPolicy,
    progress: ConsoleProgress,
}

impl<'a> RpyToPoConverter<'a> {
    pub fn new(
        language: impl Into<String>,
        names: &'a CharacterNames,
        comment_policy: CommentPolicy,
        progress: ConsoleProgress,
    ) -> Self {
        Self {
            language: language.into(),
            names,
            comment_policy,
            progress,
        }
    }

    /// Convert a set of translation files into one catalog. Later files (and
    /// later entries within a file) win on key collisions. A file in the
    /// wrong language, or mixing languages, is fatal.
    pub fn convert(&self, inputs: &[PathBuf], check: FormatCheck) -> anyhow::Result<ConvertResult> {
        let mut result = ConvertResult {
            catalog: Catalog::new(),
            statements: Statements::new(),
            mismatched_ids: Vec::new(),
            missing_names: Vec::new(),
        };
        let mut seen_missing: HashSet<String> = HashSet::new();

        for (i, path) in inputs.iter().enumerate() {
            self.progress.progress("converting", i + 1, inputs.len());
            let file = TranslationFile::read_path(path)?;
            self.check_language(&file, path)?;
            for entry in &file {
                if entry.is_statement() {
                    let id = entry.id.clone().unwrap_or_default();
                    let orig = entry.parse_original();
                    let translated = entry.parse_translated();
                    match &check {
                        FormatCheck::Learn => {
                            result.statements.insert_dialogue(id.clone(), orig.format.clone());
                            if orig.what.is_none() {
                                result.statements.insert_plain(Statement {
                                    id: id.clone(),
                                    template: orig.format.clone(),
                                    file: entry.file.clone(),
                                    line: entry.line,
                                });
                            }
                        }
                        FormatCheck::Validate(registry) => {
                            // reported, never learned over; the registry's
                            // template stays authoritative for reconstruction
                            if !registry.matches(&id, &orig.format)
                                || !registry.matches(&id, &translated.format)
                            {
                                result.mismatched_ids.push(id.clone());
                            }
                        }
                    }
                    let (Some(_), Some(_)) = (&orig.what, &translated.what) else {
                        // no extractable text on either side; the template is
                        // all there is
                        continue;
                    };
                    let mut comments = Vec::new();
                    match self.display_name(&orig) {
                        Some(display) => {
                            if self.comment_policy == CommentPolicy::Speaking {
                                comments.push(self.names.format_speaker(display));
                            }
                        }
                        None => {
                            if let Some(who) = &orig.who {
                                if seen_missing.insert(who.clone()) {
                                    result.missing_names.push(who.clone());
                                }
                            }
                        }
                    }
                    result.catalog.add(Message {
                        context: Some(id),
                        id: compose_text(&orig),
                        translated: compose_text(&translated),
                        source_refs: vec![format!("{}:{}", entry.file, entry.line)],
                        comments,
                        obsolete: false,
                    });
                } else {
                    result.catalog.add(Message {
                        context: None,
                        id: entry.original_text.clone(),
                        translated: entry.translated_text.clone(),
                        source_refs: vec![format!("{}:{}", entry.file, entry.line)],
                        comments: Vec::new(),
                        obsolete: false,
                    });
                }
            }
        }
        if !result.mismatched_ids.is_empty() {
            self.progress.warn(format!(
                "{} statements no longer match their recorded format",
                result.mismatched_ids.len()
            ));
        }
        Ok(result)
    }

    fn check_language(&self, file: &TranslationFile, path: &Path) -> anyhow::Result<()> {
        let lang = file
            .language(true)
            .with_context(|| format!("in {}", path.display()))?;
        if let Some(lang) = lang {
            if lang != self.language {
                bail!(
                    "{}: expected language {}, found {}",
                    path.display(),
                    self.language,
                    lang
                );
            }
        }
        Ok(())
    }

    /// Display name for a dialogue line. Name-only dialogue carries its
    /// display name inline; everything else goes through the name table.
    fn display_name<'d>(&'d self, dialogue: &'d Dialogue) -> Option<&'d str> {
        if dialogue.name_only {
            dialogue.who.as_deref()
        } else {
            self.names.get(dialogue.who.as_deref())
        }
    }
}

/// Catalog text for one side of a dialogue entry: the spoken text, prefixed
/// with `who :: ` for name-only dialogue. String-literal escapes are undone
/// here; the reverse pass reapplies them.
fn compose_text(dialogue: &Dialogue) -> String {
    let what = dialogue.what.as_deref().unwrap_or_default();
    if dialogue.name_only {
        let who = dialogue.who.as_deref().unwrap_or_default();
        format!("{} :: {}", unescape_renpy(who), unescape_renpy(what))
    } else {
        unescape_renpy(what)
    }
}
