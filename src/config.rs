use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::gettext::resolver::{
    ResolverConfig, DEFAULT_AUTO_RESOLVE_SIMILARITY, DEFAULT_MAX_DISSIMILARITY,
};
use crate::rpy::names::CharacterNames;

pub const CONFIG_FILENAME: &str = "rpy-po.toml";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub names: NamesSection,
    #[serde(default)]
    pub resolver: ResolverSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ProjectSection {
    /// Ren'Py project root (the directory holding `game/`).
    #[serde(default)]
    pub project_dir: Option<PathBuf>,

    /// Target language, as named under `game/tl/`.
    #[serde(default)]
    pub language: Option<String>,

    /// Also convert the engine-generated `common.rpy`.
    #[serde(default)]
    pub include_common: Option<bool>,

    /// Files to skip when scanning, by name or trailing path.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct NamesSection {
    /// Speaker identifier -> display name.
    #[serde(default)]
    pub table: HashMap<String, String>,

    /// Display name for narration lines.
    #[serde(default)]
    pub narrator: Option<String>,

    /// Speaker-comment template; `%s` is replaced with the display name.
    #[serde(default)]
    pub speak_format: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ResolverSection {
    /// Edit-distance fraction above which two strings stop being fuzzy-match
    /// candidates during an update.
    #[serde(default)]
    pub max_dissimilarity: Option<f32>,

    /// Minimum similarity for the bulk auto-resolve sweep to reuse an
    /// orphan's translation.
    #[serde(default)]
    pub auto_resolve_similarity: Option<f32>,
}

impl AppConfig {
    pub fn character_names(&self) -> CharacterNames {
        CharacterNames::new(
            self.names.table.clone(),
            self.names
                .narrator
                .clone()
                .unwrap_or_else(|| "Narrator".to_string()),
            self.names
                .speak_format
                .clone()
                .unwrap_or_else(|| "%s speaking".to_string()),
        )
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_dissimilarity: self
                .resolver
                .max_dissimilarity
                .unwrap_or(DEFAULT_MAX_DISSIMILARITY),
            auto_resolve_similarity: self
                .resolver
                .auto_resolve_similarity
                .unwrap_or(DEFAULT_AUTO_RESOLVE_SIMILARITY),
        }
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG: &str = r#"# rpy-po configuration

[project]
# Ren'Py project root (the directory holding game/).
#project_dir = "."

# Target language, as named under game/tl/.
#language = "french"

# Also convert the engine-generated common.rpy.
#include_common = false

# Files to skip when scanning, by name or trailing path.
#exclude = ["screens.rpy"]

[names]
# Display name for narration lines.
#narrator = "Narrator"

# Speaker-comment template; %s is replaced with the display name.
#speak_format = "%s speaking"

# Speaker identifier -> display name.
[names.table]
#mc = "Main Character"

[resolver]
# Edit-distance fraction above which two strings stop being fuzzy-match
# candidates during an update.
#max_dissimilarity = 0.5

# Minimum similarity for the bulk auto-resolve sweep to reuse an orphan's
# translation.
#auto_resolve_similarity = 0.7
"#;
