#![allow(dead_code)]

use anyhow::{bail, Context, Result};
use design_pipeline::{Pipeline, PipelineConfig};
use shared::Catalog;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Throwaway project tree with the default layout.
pub struct Project {
    pub dir: TempDir,
    pub config: PipelineConfig,
}

impl Project {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create temp project")?;
        let config = PipelineConfig::default().anchored(dir.path());
        fs::create_dir_all(&config.design_root)?;
        Ok(Self { dir, config })
    }

    /// Write `body` as the entry point of `<design root>/<rel>`.
    pub fn add_module(&self, rel: &str, body: &str) -> Result<PathBuf> {
        let dir = self.config.design_root.join(rel);
        fs::create_dir_all(&dir)?;
        let entry = dir.join(&self.config.entry_point);
        fs::write(&entry, body)?;
        Ok(dir)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.clone())
    }

    pub fn read_catalog(&self) -> Result<Catalog> {
        let text = fs::read_to_string(&self.config.catalog_path)
            .with_context(|| format!("failed to read {}", self.config.catalog_path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn catalog_ids(&self) -> Result<Vec<String>> {
        Ok(self.read_catalog()?.into_iter().map(|e| e.id).collect())
    }
}

/// A cube whose edge is the `size` parameter.
pub fn cube_module(initial: f64) -> String {
    format!(
        r#"// Cube with edge {initial}
{{
  "parameters": [ {{ "name": "size", "type": "number", "initial": {initial}, "caption": "Cube Size (mm)" }} ],
  "operations": [
    {{ "type": "create_primitive", "id": "cube", "primitive": {{ "type": "cuboid", "size": ["size", "size", "size"] }} }}
  ]
}}"#
    )
}

/// Loads fine, fails in generate every time.
pub const FAILING_MODULE: &str = r#"{
  "parameters": [ { "name": "size", "type": "number", "initial": 5 } ],
  "operations": [
    { "type": "create_primitive", "id": "bad", "primitive": { "type": "cuboid", "size": ["size - 10", 1, 1] } }
  ]
}"#;

/// Axis-aligned bounds of a binary STL file as `(min, max)`.
pub fn stl_bounds(path: &Path) -> Result<([f32; 3], [f32; 3])> {
    let bytes = fs::read(path)?;
    if bytes.len() < 84 {
        bail!("{} is too short for binary STL", path.display());
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    if bytes.len() != 84 + count * 50 {
        bail!("{} has wrong length for {} triangles", path.display(), count);
    }

    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for t in 0..count {
        let base = 84 + t * 50 + 12;
        for v in 0..3 {
            for axis in 0..3 {
                let at = base + v * 12 + axis * 4;
                let value = f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
        }
    }
    Ok((min, max))
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}
