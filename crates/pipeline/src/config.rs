//! Pipeline settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File looked up in the project root when no `--config` is given.
pub const CONFIG_FILE: &str = "design-pipeline.json";

/// Extension of generated mesh artifacts.
pub const ARTIFACT_EXTENSION: &str = "stl";

/// Locations and names the pipeline works with.
///
/// Every field has a default, so a config file only lists what it changes.
/// Relative paths are resolved against the project root by [`PipelineConfig::anchored`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory walked for design modules
    pub design_root: PathBuf,
    /// File name that marks a module directory
    pub entry_point: String,
    /// Directory names never descended into
    pub excluded_dirs: Vec<String>,
    /// Build-output location for artifacts
    pub dist_dir: PathBuf,
    /// Viewer asset location artifacts are mirrored to
    pub viewer_models_dir: PathBuf,
    /// Aggregate catalog read by the viewer
    pub catalog_path: PathBuf,
    /// URL prefix the viewer serves `viewer_models_dir` under
    pub models_url_prefix: String,
    /// Per-module document written next to each entry point
    pub document_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            design_root: PathBuf::from("design"),
            entry_point: "design.jsonc".to_string(),
            excluded_dirs: ["node_modules", "target", ".git", "utils", "examples"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dist_dir: PathBuf::from("dist"),
            viewer_models_dir: PathBuf::from("web/public/models"),
            catalog_path: PathBuf::from("web/public/catalog.json"),
            models_url_prefix: "/models".to_string(),
            document_name: "README.md".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Read a config file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `design-pipeline.json` from `project_root` if present, else defaults.
    pub fn for_project(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        let config = if path.is_file() {
            tracing::debug!("Loading config from {}", path.display());
            Self::load(&path)?
        } else {
            Self::default()
        };
        Ok(config.anchored(project_root))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_point.trim().is_empty() {
            return Err(ConfigError::Empty("entry_point"));
        }
        if self.document_name.trim().is_empty() {
            return Err(ConfigError::Empty("document_name"));
        }
        Ok(())
    }

    /// Resolve relative paths against `root`.
    pub fn anchored(mut self, root: &Path) -> Self {
        self.design_root = root.join(&self.design_root);
        self.dist_dir = root.join(&self.dist_dir);
        self.viewer_models_dir = root.join(&self.viewer_models_dir);
        self.catalog_path = root.join(&self.catalog_path);
        self
    }

    pub fn artifact_file_name(&self, id: &str) -> String {
        format!("{}.{}", id, ARTIFACT_EXTENSION)
    }

    /// Build-output artifact path for `id`.
    pub fn artifact_path(&self, id: &str) -> PathBuf {
        self.dist_dir.join(self.artifact_file_name(id))
    }

    /// Runtime-visible location of the artifact for `id`. Stable across builds.
    pub fn stl_url(&self, id: &str) -> String {
        format!(
            "{}/{}",
            self.models_url_prefix.trim_end_matches('/'),
            self.artifact_file_name(id)
        )
    }
}
