//! Recursive discovery of design modules.
//!
//! A directory is a module directory when it directly contains the entry-point
//! file. The walk is depth-first with entries sorted by name, so repeated runs
//! over the same tree yield the same order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Fallback id when the entry point sits in a directory without a usable name.
const FALLBACK_ID: &str = "model";

/// One entry point found by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModule {
    /// Containing directory name
    pub id: String,
    pub entry_point: PathBuf,
    pub dir: PathBuf,
}

/// Walk `root` for directories holding `entry_point`.
///
/// Directories named in `excluded` are skipped at any depth below `root`.
/// An empty result is not an error.
pub fn discover(
    root: &Path,
    entry_point: &str,
    excluded: &[String],
) -> Result<Vec<DiscoveredModule>, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::MissingRoot(root.to_path_buf()));
    }
    let mut found = Vec::new();
    walk(root, entry_point, excluded, &mut found)?;
    Ok(found)
}

fn walk(
    dir: &Path,
    entry_point: &str,
    excluded: &[String],
    acc: &mut Vec<DiscoveredModule>,
) -> Result<(), PipelineError> {
    let read_error = |source| PipelineError::Discovery {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir)
        .map_err(read_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;
    entries.sort_by_key(|entry| entry.file_name());

    let candidate = dir.join(entry_point);
    if candidate.is_file() {
        acc.push(DiscoveredModule {
            id: module_id(dir),
            entry_point: candidate,
            dir: dir.to_path_buf(),
        });
    }

    for entry in entries {
        let path = entry.path();
        // file_type() does not follow symlinks, so linked directories are not walked
        let is_dir = entry.file_type().map_err(read_error)?.is_dir();
        if !is_dir {
            continue;
        }
        let name = entry.file_name();
        if excluded.iter().any(|ex| name.to_str() == Some(ex.as_str())) {
            tracing::debug!("Skipping excluded directory {}", path.display());
            continue;
        }
        walk(&path, entry_point, excluded, acc)?;
    }

    Ok(())
}

fn module_id(dir: &Path) -> String {
    dir.file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_ID)
        .to_string()
}
