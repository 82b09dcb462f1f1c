//! Reverse conversion: a message catalog back into Ren'Py translation files.
//!
//! Each live catalog message is rebuilt into a translation entry through the
//! template registry, grouped by the source file its first reference names,
//! and written under the target translation directory. Failures are collected
//! per message (and per file on write) rather than aborting the whole run, so
//! one unknown context does not cost an entire export.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::gettext::catalog::{Catalog, MessageKey};
use crate::progress::ConsoleProgress;
use crate::rpy::file::TranslationFile;
use crate::rpy::statements::Statements;

pub struct PoToRpyConverter<'a> {
    language: String,
    statements: &'a Statements,
    progress: ConsoleProgress,
}

impl<'a> PoToRpyConverter<'a> {
    pub fn new(
        language: impl Into<String>,
        statements: &'a Statements,
        progress: ConsoleProgress,
    ) -> Self {
        Self {
            language: language.into(),
            statements,
            progress,
        }
    }

    /// Rebuild translation files from a catalog, keyed by source file path.
    /// Obsolete messages are skipped. Messages that cannot be reconstructed
    /// (no reference, unknown context) are returned alongside, not fatal.
    pub fn convert(
        &self,
        catalog: &Catalog,
    ) -> (HashMap<String, TranslationFile>, Vec<(MessageKey, anyhow::Error)>) {
        let mut files: HashMap<String, TranslationFile> = HashMap::new();
        let mut failures: Vec<(MessageKey, anyhow::Error)> = Vec::new();
        for (i, msg) in catalog.iter().enumerate() {
            self.progress.progress("rebuilding", i + 1, catalog.len());
            if msg.obsolete {
                continue;
            }
            match self.statements.format_message(msg, &self.language) {
                Ok(entry) => files.entry(entry.file.clone()).or_default().add(entry),
                Err(err) => failures.push((msg.key(), err)),
            }
        }
        if !failures.is_empty() {
            self.progress.warn(format!(
                "{} messages could not be rebuilt into statements",
                failures.len()
            ));
        }
        (files, failures)
    }

    /// Write rebuilt files under `output_dir`, one `.rpy` per source file.
    /// A leading `game/` component in the source path is stripped, mirroring
    /// how the engine lays out `game/tl/<language>/` against `game/`. Write
    /// errors are collected per file; files that do write are sorted by
    /// source location and stamped with a save banner.
    pub fn write(
        &self,
        files: &HashMap<String, TranslationFile>,
        output_dir: &Path,
    ) -> HashMap<String, anyhow::Error> {
        let mut errors: HashMap<String, anyhow::Error> = HashMap::new();
        let mut written = 0usize;
        let mut names: Vec<&String> = files.keys().collect();
        names.sort();
        for name in names {
            let mut file = files[name].clone();
            file.sort();
            let relative = name.strip_prefix("game/").unwrap_or(name);
            let target = output_dir.join(relative);
            match write_one(&file, &target) {
                Ok(()) => written += 1,
                Err(err) => {
                    errors.insert(name.clone(), err);
                }
            }
        }
        self.progress.info(format!(
            "wrote {written} translation files, {} failed",
            errors.len()
        ));
        errors
    }
}

fn write_one(file: &TranslationFile, target: &Path) -> anyhow::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let mut out =
        fs::File::create(target).with_context(|| format!("create {}", target.display()))?;
    file.write(&mut out, true)
        .with_context(|| format!("write {}", target.display()))
}
