//! Reader/writer for Ren'Py translation files.
//!
//! A file is a sequence of blocks separated by blank lines: statement blocks
//! (`translate <lang> <id>:` followed by commented original lines and plain
//! translated lines), strings blocks (`translate <lang> strings:` followed by
//! `old`/`new` pairs), and occurrence comments (`# <file>:<line>`) that
//! attribute the next entry to a source location. Unlike the dialogue
//! classifier, this grammar is strict: an unrecognized non-comment line aborts
//! the whole file.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::rpy::dialogue::Dialogue;

/// One localizable entry read from (or written to) a translation file.
///
/// `id` present means a templated statement entry; `id` absent means a plain
/// strings entry keyed only by its exact original text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationEntry {
    pub id: Option<String>,
    pub language: String,
    pub original_text: String,
    pub translated_text: String,
    pub file: String,
    pub line: u32,
}

impl TranslationEntry {
    pub fn is_statement(&self) -> bool {
        self.id.is_some()
    }

    pub fn parse_original(&self) -> Dialogue {
        Dialogue::parse(&self.original_text)
    }

    pub fn parse_translated(&self) -> Dialogue {
        Dialogue::parse(&self.translated_text)
    }
}

static OCCURRENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ *# (.+\.rpy):(\d+)$").expect("occurrence"));
static STRINGS_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^translate (.+) strings:$").expect("strings header"));
static STRINGS_OLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^ {4}old "(.*)"$"#).expect("strings old"));
static STRINGS_NEW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^ {4}new "(.*)"$"#).expect("strings new"));
static STATEMENT_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^translate (.+) (.+):$").expect("statement header"));
static STATEMENT_ORIGINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {4}# (.*)$").expect("statement original"));
static STATEMENT_TRANSLATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {4}(.*)$").expect("statement translated"));

/// Ordered list of Translation Entries, as stored in one `.rpy` file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslationFile {
    entries: Vec<TranslationEntry>,
}

impl TranslationFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: TranslationEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslationEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reorder entries by source location (file, then line).
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    }

    /// The language this file translates into, or `None` if the file is empty.
    /// With `exhaustive` set, every entry is checked and a mix of languages is
    /// an error.
    pub fn language(&self, exhaustive: bool) -> anyhow::Result<Option<&str>> {
        let Some(first) = self.entries.first() else {
            return Ok(None);
        };
        if exhaustive {
            if let Some(odd) = self.entries.iter().find(|e| e.language != first.language) {
                bail!(
                    "multiple languages in one file: {} and {}",
                    first.language,
                    odd.language
                );
            }
        }
        Ok(Some(&first.language))
    }

    pub fn read_path(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        Self::read(BufReader::new(file)).with_context(|| format!("read {}", path.display()))
    }

    /// Parse a translation file. Any non-blank line that matches no block
    /// pattern and is not a comment is a fatal error.
    pub fn read(reader: impl Read) -> anyhow::Result<Self> {
        let mut entries: Vec<TranslationEntry> = Vec::new();
        let mut lang: Option<String> = None;
        let mut id: Option<String> = None;
        let mut orig: Option<String> = None;
        let mut translated: Option<String> = None;
        let mut file: Option<String> = None;
        let mut src_line: u32 = 0;

        fn flush(
            entries: &mut Vec<TranslationEntry>,
            line_num: usize,
            id: &Option<String>,
            lang: &Option<String>,
            orig: &mut Option<String>,
            translated: &mut Option<String>,
            file: &Option<String>,
            src_line: u32,
        ) -> anyhow::Result<()> {
            let language = lang
                .clone()
                .ok_or_else(|| anyhow!("line {line_num}: entry has no translate header"))?;
            let source = file
                .clone()
                .ok_or_else(|| anyhow!("line {line_num}: entry has no occurrence comment"))?;
            let original_text = orig
                .take()
                .ok_or_else(|| anyhow!("line {line_num}: entry has no original text"))?;
            let translated_text = translated
                .take()
                .ok_or_else(|| anyhow!("line {line_num}: entry has no translated text"))?;
            entries.push(TranslationEntry {
                id: id.clone(),
                language,
                original_text,
                translated_text,
                file: source,
                line: src_line,
            });
            Ok(())
        }

        let mut line_num = 0usize;
        for line in BufReader::new(reader).lines() {
            let mut line = line.context("read line")?;
            line_num += 1;
            if line.is_empty() {
                continue;
            }
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                line = stripped.to_string();
            }
            if let Some(caps) = OCCURRENCE_RE.captures(&line) {
                if file.is_some() && orig.is_some() {
                    flush(
                        &mut entries,
                        line_num,
                        &id,
                        &lang,
                        &mut orig,
                        &mut translated,
                        &file,
                        src_line,
                    )?;
                }
                file = Some(caps[1].to_string());
                src_line = caps[2]
                    .parse()
                    .with_context(|| format!("line {line_num}: source line is not a valid int"))?;
            } else if let Some(caps) = STRINGS_HEADER_RE.captures(&line) {
                if file.is_some() {
                    flush(
                        &mut entries,
                        line_num,
                        &id,
                        &lang,
                        &mut orig,
                        &mut translated,
                        &file,
                        src_line,
                    )?;
                    file = None;
                }
                lang = Some(caps[1].to_string());
                id = None;
            } else if let Some(caps) = STRINGS_OLD_RE.captures(&line) {
                orig = Some(caps[1].to_string());
            } else if let Some(caps) = STRINGS_NEW_RE.captures(&line) {
                translated = Some(caps[1].to_string());
            } else if let Some(caps) = STATEMENT_HEADER_RE.captures(&line) {
                lang = Some(caps[1].to_string());
                id = Some(caps[2].to_string());
            } else if let Some(caps) = STATEMENT_ORIGINAL_RE.captures(&line) {
                match orig.as_mut() {
                    None => orig = Some(caps[1].to_string()),
                    Some(text) => {
                        text.push('\n');
                        text.push_str(&caps[1]);
                    }
                }
            } else if let Some(caps) = STATEMENT_TRANSLATED_RE.captures(&line) {
                match translated.as_mut() {
                    None => translated = Some(caps[1].to_string()),
                    Some(text) => {
                        text.push('\n');
                        text.push_str(&caps[1]);
                    }
                }
            } else if !line.starts_with('#') {
                bail!("line {line_num}: invalid syntax -- {line}");
            }
        }
        if translated.is_some() {
            flush(
                &mut entries,
                line_num,
                &id,
                &lang,
                &mut orig,
                &mut translated,
                &file,
                src_line,
            )?;
        }
        Ok(Self { entries })
    }

    /// Serialize the entries back into the translation-file grammar.
    ///
    /// Statement entries get their own header; consecutive plain entries of
    /// the same language are grouped under a single strings header. The
    /// entries' texts are written verbatim; no template re-derivation happens
    /// here.
    pub fn write(&self, out: &mut impl Write, include_timestamp: bool) -> anyhow::Result<()> {
        let mut buf = String::new();
        if include_timestamp {
            let _ = writeln!(
                buf,
                "# Translation saved {}\n",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        }
        let mut strings_lang: Option<&str> = None;
        for entry in &self.entries {
            if let Some(id) = &entry.id {
                strings_lang = None;
                let _ = writeln!(buf, "# {}:{}", entry.file, entry.line);
                let _ = writeln!(buf, "translate {} {}:", entry.language, id);
                buf.push('\n');
                for line in entry.original_text.split('\n') {
                    let _ = writeln!(buf, "    # {}", line.trim());
                }
                for line in entry.translated_text.split('\n') {
                    let _ = writeln!(buf, "    {}", line.trim());
                }
            } else {
                if strings_lang != Some(entry.language.as_str()) {
                    strings_lang = Some(&entry.language);
                    let _ = writeln!(buf, "translate {} strings:", entry.language);
                    buf.push('\n');
                }
                let _ = writeln!(buf, "    # {}:{}", entry.file, entry.line);
                let _ = writeln!(buf, "    old \"{}\"", entry.original_text);
                let _ = writeln!(buf, "    new \"{}\"", entry.translated_text);
            }
            buf.push('\n');
        }
        out.write_all(buf.as_bytes()).context("write translation file")?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TranslationFile {
    type Item = &'a TranslationEntry;
    type IntoIter = std::slice::Iter<'a, TranslationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
