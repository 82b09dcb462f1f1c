//! Catalog update resolver.
//!
//! Reconciles a freshly generated template catalog against a previously
//! translated one. Exact key matches copy straight across; everything else
//! becomes either an automatic resolution or a problem carrying scored
//! candidates for an operator (or a later bulk sweep) to dispose of. The two
//! input catalogs are never mutated; all merge output goes into a fresh
//! result catalog.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::gettext::catalog::{Catalog, Message, MessageKey};
use crate::progress::ConsoleProgress;
use crate::textutil::similarity;

/// Dissimilarity cutoff for automatic fuzzy matching during `update`.
pub const DEFAULT_MAX_DISSIMILARITY: f32 = 0.5;

/// Similarity cutoff for the bulk auto-resolve sweep. Deliberately distinct
/// from the update cutoff: auto-merge is conservative, the manual-search
/// sweep is more permissive.
pub const DEFAULT_AUTO_RESOLVE_SIMILARITY: f32 = 0.7;

#[derive(Clone, Copy, Debug)]
pub struct ResolverConfig {
    pub max_dissimilarity: f32,
    pub auto_resolve_similarity: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_dissimilarity: DEFAULT_MAX_DISSIMILARITY,
            auto_resolve_similarity: DEFAULT_AUTO_RESOLVE_SIMILARITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemKind {
    /// Template message with no exact-id counterpart in the old catalog.
    NoMatch,
    /// Template message whose id text matches more than one old message.
    Conflict,
    /// Old message with no counterpart in the template.
    OrphanedInOldCatalog,
}

#[derive(Clone, Debug)]
pub struct Problem {
    pub key: MessageKey,
    pub candidates: Vec<(MessageKey, f32)>,
    pub kind: ProblemKind,
}

/// An operator- or auto-supplied decision for one unmatched entry. Exactly
/// one of `new_translated`, `mark_obsolete`, `mark_new` is the active
/// disposition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub template_key: MessageKey,
    pub source_key: Option<MessageKey>,
    pub new_translated: Option<String>,
    pub mark_obsolete: bool,
    pub mark_new: bool,
}

impl Resolution {
    pub fn reuse(template_key: MessageKey, source_key: MessageKey, translated: String) -> Self {
        Self {
            template_key,
            source_key: Some(source_key),
            new_translated: Some(translated),
            mark_obsolete: false,
            mark_new: false,
        }
    }

    pub fn mark_new(template_key: MessageKey) -> Self {
        Self {
            template_key,
            source_key: None,
            new_translated: None,
            mark_obsolete: false,
            mark_new: true,
        }
    }

    pub fn mark_obsolete(template_key: MessageKey) -> Self {
        Self {
            template_key,
            source_key: None,
            new_translated: None,
            mark_obsolete: true,
            mark_new: false,
        }
    }
}

/// Cooperative cancellation flag for bulk similarity scans. Cancelling stops
/// further comparisons; resolutions already produced stay in place.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Problem and (eventual) resolution for one key live in the same slot, so
/// the two can never drift apart.
#[derive(Clone, Debug, Default)]
struct Slot {
    problem: Option<Problem>,
    resolution: Option<Resolution>,
}

pub struct UpdateResolver<'a> {
    template: &'a Catalog,
    other: &'a Catalog,
    result: Catalog,
    slots: HashMap<MessageKey, Slot>,
    order: Vec<MessageKey>,
    config: ResolverConfig,
    progress: ConsoleProgress,
}

impl<'a> UpdateResolver<'a> {
    pub fn new(
        template: &'a Catalog,
        other: &'a Catalog,
        carried: Vec<Resolution>,
        progress: ConsoleProgress,
    ) -> Self {
        Self::with_config(template, other, carried, ResolverConfig::default(), progress)
    }

    pub fn with_config(
        template: &'a Catalog,
        other: &'a Catalog,
        carried: Vec<Resolution>,
        config: ResolverConfig,
        progress: ConsoleProgress,
    ) -> Self {
        let mut resolver = Self {
            template,
            other,
            result: Catalog::new(),
            slots: HashMap::new(),
            order: Vec::new(),
            config,
            progress,
        };
        for resolution in carried {
            resolver.add_resolution(resolution);
        }
        resolver
    }

    pub fn result(&self) -> &Catalog {
        &self.result
    }

    pub fn problems(&self) -> Vec<&Problem> {
        self.order
            .iter()
            .filter_map(|k| self.slots.get(k)?.problem.as_ref())
            .collect()
    }

    pub fn resolutions(&self) -> Vec<Resolution> {
        self.order
            .iter()
            .filter_map(|k| self.slots.get(k)?.resolution.clone())
            .collect()
    }

    pub fn resolution(&self, key: &MessageKey) -> Option<&Resolution> {
        self.slots.get(key)?.resolution.as_ref()
    }

    pub fn add_resolution(&mut self, resolution: Resolution) {
        let key = resolution.template_key.clone();
        self.slot_mut(&key).resolution = Some(resolution);
    }

    fn add_problem(&mut self, problem: Problem) {
        let key = problem.key.clone();
        self.slot_mut(&key).problem = Some(problem);
    }

    fn slot_mut(&mut self, key: &MessageKey) -> &mut Slot {
        if !self.slots.contains_key(key) {
            self.slots.insert(key.clone(), Slot::default());
            self.order.push(key.clone());
        }
        self.slots.get_mut(key).expect("slot just ensured")
    }

    /// Remove the problem for a key, leaving any resolution in place.
    fn take_problem(&mut self, key: &MessageKey) -> Option<Problem> {
        self.slots.get_mut(key)?.problem.take()
    }

    /// Merge `template` against `other`, producing the result catalog,
    /// problems for anything that could not be decided, and automatic
    /// resolutions for anything that could.
    pub fn update(&mut self, cancel: &CancelToken) -> anyhow::Result<()> {
        let progress = self.progress;
        let template = self.template;
        let other = self.other;
        self.result = Catalog::new();

        let mut new_messages: Vec<Message> = Vec::new();
        let mut no_matches: Vec<&Message> = Vec::new();
        let mut orphans: Vec<&Message> = Vec::new();
        let mut claimed: HashSet<MessageKey> = HashSet::new();

        progress.info("scanning template catalog");
        for msg in template {
            let key = msg.key();
            let mut new_msg = Message {
                context: msg.context.clone(),
                id: msg.id.clone(),
                translated: String::new(),
                source_refs: msg.source_refs.clone(),
                comments: msg.comments.clone(),
                obsolete: false,
            };
            if let Some(old) = other.get(&key) {
                new_msg.translated = old.translated.clone();
            } else if let Some(res) = self.resolution(&key) {
                if let Some(translated) = &res.new_translated {
                    new_msg.translated = translated.clone();
                }
            } else {
                // an id that kept its text but moved or changed template
                // shows up here as an exact-id match under a different key
                let matches: Vec<&Message> = other
                    .iter()
                    .filter(|o| o.context.is_none() == msg.context.is_none() && o.id == msg.id)
                    .collect();
                match matches.as_slice() {
                    [single] => {
                        claimed.insert(single.key());
                        new_msg.translated = single.translated.clone();
                        self.add_resolution(Resolution::reuse(
                            key.clone(),
                            single.key(),
                            single.translated.clone(),
                        ));
                    }
                    [] => {
                        no_matches.push(msg);
                        self.add_problem(Problem {
                            key: key.clone(),
                            candidates: Vec::new(),
                            kind: ProblemKind::NoMatch,
                        });
                    }
                    many => {
                        for m in many {
                            claimed.insert(m.key());
                        }
                        self.add_problem(Problem {
                            key: key.clone(),
                            candidates: many.iter().map(|m| (m.key(), 1.0)).collect(),
                            kind: ProblemKind::Conflict,
                        });
                    }
                }
            }
            new_messages.push(new_msg);
        }

        progress.info("scanning previous catalog for orphans");
        for msg in other {
            let key = msg.key();
            if template.contains(&key) || claimed.contains(&key) {
                continue;
            }
            let mut orphan_msg = Message {
                context: msg.context.clone(),
                id: msg.id.clone(),
                translated: msg.translated.clone(),
                source_refs: msg.source_refs.clone(),
                comments: msg.comments.clone(),
                obsolete: false,
            };
            match self.resolution(&key) {
                None => {
                    self.add_problem(Problem {
                        key: key.clone(),
                        candidates: Vec::new(),
                        kind: ProblemKind::OrphanedInOldCatalog,
                    });
                    orphans.push(msg);
                    new_messages.push(orphan_msg);
                }
                Some(res) if res.mark_obsolete => {
                    orphan_msg.obsolete = true;
                    new_messages.push(orphan_msg);
                }
                // previously dispositioned some other way: drops out of the
                // merged catalog
                Some(_) => {}
            }
        }

        if !no_matches.is_empty() {
            progress.info(format!(
                "fuzzy-scanning {} unmatched strings against {} orphans",
                no_matches.len(),
                orphans.len()
            ));
        }
        'fuzzy: for msg in &no_matches {
            let mut candidates: Vec<(MessageKey, f32)> = Vec::new();
            for orphan in &orphans {
                if cancel.is_cancelled() {
                    progress.warn("similarity scan cancelled; keeping partial resolutions");
                    break 'fuzzy;
                }
                let sim = similarity(&msg.id, &orphan.id);
                if 1.0 - sim < self.config.max_dissimilarity {
                    candidates.push((orphan.key(), sim));
                }
            }
            let key = msg.key();
            if candidates.is_empty() {
                // nothing close enough anywhere: this is a new string
                if self.take_problem(&key).is_none() {
                    progress.warn(format!("no problem recorded for unmatched key: {key}"));
                } else {
                    self.add_resolution(Resolution::mark_new(key));
                }
            } else {
                match self.slots.get_mut(&key).and_then(|s| s.problem.as_mut()) {
                    Some(problem) => problem.candidates = candidates,
                    None => progress.warn(format!("no problem recorded for unmatched key: {key}")),
                }
            }
        }

        // deterministic output order: first source reference, file then line;
        // a malformed reference is fatal here
        let mut keyed: Vec<(Option<crate::gettext::catalog::SourceReference>, Message)> =
            Vec::with_capacity(new_messages.len());
        for msg in new_messages {
            let reference = msg.first_reference()?;
            keyed.push((reference, msg));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, msg) in keyed {
            self.result.add(msg);
        }
        Ok(())
    }

    /// Bulk sweep over unresolved no-match problems: exactly one orphan at or
    /// above the auto-resolve similarity means reuse its translation, zero
    /// means mark the string new, several are left for manual disposition.
    /// Returns the number of problems resolved.
    pub fn auto_resolve(&mut self, cancel: &CancelToken) -> usize {
        let progress = self.progress;
        let other = self.other;
        let mut claimed: HashSet<MessageKey> = self
            .order
            .iter()
            .filter_map(|k| self.slots.get(k)?.resolution.as_ref()?.source_key.clone())
            .collect();
        let orphan_keys: Vec<MessageKey> = self
            .order
            .iter()
            .filter(|k| {
                self.slots.get(*k).is_some_and(|s| {
                    s.resolution.is_none()
                        && s.problem
                            .as_ref()
                            .is_some_and(|p| p.kind == ProblemKind::OrphanedInOldCatalog)
                })
            })
            .cloned()
            .collect();
        let targets: Vec<MessageKey> = self
            .order
            .iter()
            .filter(|k| {
                self.slots.get(*k).is_some_and(|s| {
                    s.resolution.is_none()
                        && s.problem.as_ref().is_some_and(|p| p.kind == ProblemKind::NoMatch)
                })
            })
            .cloned()
            .collect();

        let mut resolved = 0usize;
        'sweep: for (i, key) in targets.iter().enumerate() {
            progress.progress("auto-resolve", i + 1, targets.len());
            let mut similar: Vec<(MessageKey, f32)> = Vec::new();
            for orphan_key in &orphan_keys {
                if cancel.is_cancelled() {
                    progress.warn("auto-resolve cancelled; keeping partial resolutions");
                    break 'sweep;
                }
                if claimed.contains(orphan_key) {
                    continue;
                }
                let sim = similarity(&key.id, &orphan_key.id);
                if sim >= self.config.auto_resolve_similarity {
                    similar.push((orphan_key.clone(), sim));
                }
            }
            match similar.as_slice() {
                [(orphan_key, _)] => {
                    let translated = other
                        .get(orphan_key)
                        .map(|m| m.translated.clone())
                        .unwrap_or_default();
                    claimed.insert(orphan_key.clone());
                    self.add_resolution(Resolution::reuse(key.clone(), orphan_key.clone(), translated));
                    resolved += 1;
                }
                [] => {
                    self.add_resolution(Resolution::mark_new(key.clone()));
                    resolved += 1;
                }
                // several plausible reuses: never guess, leave for a human
                _ => {}
            }
        }
        resolved
    }

    /// Apply every resolution to the result catalog and clear the problems
    /// they answer. A resolution referencing a key absent from the result is
    /// logged and skipped, never fatal.
    pub fn solve_problems(&mut self) {
        let progress = self.progress;
        let keys: Vec<MessageKey> = self.order.clone();
        for key in keys {
            let Some(res) = self.slots.get(&key).and_then(|s| s.resolution.clone()) else {
                continue;
            };
            let Some(msg) = self.result.get_mut(&res.template_key) else {
                progress.warn(format!(
                    "resolution references a nonexistent key: {}",
                    res.template_key
                ));
                continue;
            };
            let applied = if let Some(translated) = &res.new_translated {
                msg.translated = translated.clone();
                true
            } else if res.mark_obsolete {
                msg.obsolete = true;
                true
            } else {
                res.mark_new
            };
            if applied {
                self.take_problem(&res.template_key);
            } else {
                progress.warn(format!("resolution with no disposition: {}", res.template_key));
            }
        }
    }
}

/// Load carried-over resolutions from a JSON file.
pub fn load_resolutions(path: &std::path::Path) -> anyhow::Result<Vec<Resolution>> {
    use anyhow::Context;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

/// Save a session's resolutions so a later session can carry them forward.
pub fn save_resolutions(resolutions: &[Resolution], path: &std::path::Path) -> anyhow::Result<()> {
    use anyhow::Context;
    let json = serde_json::to_string_pretty(resolutions).context("serialize resolutions")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))
}
