//! Catalog pass.
//!
//! Compiling is pure over the loaded set; writing happens afterwards, one
//! document per module and then the aggregate catalog in a single atomic
//! replace.

mod document;

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use shared::{Catalog, CatalogEntry};
use tempfile::NamedTempFile;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::loader::{LoadedModule, LoadedSet};
use crate::report::{ModuleFailure, Pass, Phase, RunReport};
use crate::source::extract_description;

pub use document::{relative_link, render_document, ModuleDocument};

/// `demo-box` → `Demo Box`.
pub fn title_from_id(id: &str) -> String {
    id.split(['-', '_', ' ', '.'])
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// RFC 3339 UTC stamp for a modification time.
pub fn timestamp(modified: SystemTime) -> String {
    DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Catalog entry and document for one module.
pub fn compile_entry(module: &LoadedModule, config: &PipelineConfig) -> (CatalogEntry, ModuleDocument) {
    let title = title_from_id(&module.id);
    let description = extract_description(&module.source_text, &title);

    let artifact = config.artifact_path(&module.id);
    let link = artifact
        .is_file()
        .then(|| relative_link(&module.dir, &artifact));
    let content = render_document(&title, &description, &module.parameters, link.as_deref());

    let entry = CatalogEntry {
        id: module.id.clone(),
        title,
        description,
        stl_url: config.stl_url(&module.id),
        parameters: module.parameters.clone(),
        last_update: timestamp(module.modified),
        readme_content: content.clone(),
    };
    let document = ModuleDocument {
        id: module.id.clone(),
        path: module.dir.join(&config.document_name),
        content,
    };
    (entry, document)
}

/// Entries and documents for every loaded module, in discovery order.
pub fn compile_catalog(set: &LoadedSet, config: &PipelineConfig) -> (Catalog, Vec<ModuleDocument>) {
    set.modules
        .iter()
        .map(|module| compile_entry(module, config))
        .unzip()
}

/// Write every document; a failed write is reported for that module only.
pub fn write_documents(documents: &[ModuleDocument]) -> Vec<ModuleFailure> {
    let mut failures = Vec::new();
    for doc in documents {
        match fs::write(&doc.path, &doc.content) {
            Ok(()) => tracing::info!(module = %doc.id, "Wrote {}", doc.path.display()),
            Err(e) => failures.push(ModuleFailure::error(
                &doc.id,
                Phase::Document,
                format!("failed to write {}: {}", doc.path.display(), e),
            )),
        }
    }
    failures
}

/// Replace the catalog at `path` in one rename. The old file survives any failure.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<(), PipelineError> {
    let write_error = |source| PipelineError::CatalogWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut json = serde_json::to_string_pretty(catalog)?;
    json.push('\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_error)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(json.as_bytes()).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Compile and write everything; only the aggregate catalog write is fatal.
pub fn run_catalog(set: &LoadedSet, config: &PipelineConfig) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::new(Pass::Catalog, set.discovered);
    report
        .failures
        .extend(set.rejections.iter().map(ModuleFailure::from));

    let (catalog, documents) = compile_catalog(set, config);
    let doc_failures = write_documents(&documents);
    report.succeeded.extend(
        catalog
            .iter()
            .filter(|entry| !doc_failures.iter().any(|f| f.id == entry.id))
            .map(|entry| entry.id.clone()),
    );
    report.failures.extend(doc_failures);

    write_catalog(&config.catalog_path, &catalog)?;
    tracing::info!(
        "Wrote {} ({} entries)",
        config.catalog_path.display(),
        catalog.len()
    );
    Ok(report)
}
