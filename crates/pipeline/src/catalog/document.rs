//! Per-module Markdown document.

use std::path::{Component, Path, PathBuf};

use shared::ParameterSpec;

/// A rendered document and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDocument {
    pub id: String,
    pub path: PathBuf,
    pub content: String,
}

/// Render the document for one module.
///
/// `artifact` is the link target relative to the module directory, present
/// only when the build output exists on disk.
pub fn render_document(
    title: &str,
    description: &str,
    parameters: &[ParameterSpec],
    artifact: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", title));
    out.push_str(&format!("{}\n\n", description));

    out.push_str("## Parameters\n\n");
    out.push_str("| Parameter | Type | Default | Description |\n");
    out.push_str("|-----------|------|---------|-------------|\n");
    if parameters.is_empty() {
        out.push_str("| - | - | - | No configurable parameters |\n");
    }
    for param in parameters {
        let caption = if param.caption.trim().is_empty() {
            "-".to_string()
        } else {
            table_cell(&param.caption)
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            table_cell(&param.name),
            param.kind.as_str(),
            table_cell(&param.initial.to_string()),
            caption
        ));
    }
    out.push('\n');

    match artifact {
        Some(link) => out.push_str(&format!("[Download STL]({})\n", link)),
        None => out.push_str("_STL not yet generated. Run `design-pipeline build` first._\n"),
    }
    out
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Path from directory `from` to `to` as a `/`-separated link.
///
/// Both paths are expected to be absolute or both relative to the same base.
pub fn relative_link(from: &Path, to: &Path) -> String {
    let from: Vec<Component> = from.components().filter(|c| *c != Component::CurDir).collect();
    let to: Vec<Component> = to.components().filter(|c| *c != Component::CurDir).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = Vec::new();
    parts.extend(from[common..].iter().map(|_| "..".to_string()));
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}
