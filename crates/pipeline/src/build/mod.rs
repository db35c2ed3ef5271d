//! Geometry build pass.
//!
//! Every loaded module is generated with its default parameters, exported to
//! STL and published to all sinks. A failing module is logged and recorded;
//! the rest of the batch carries on.

use std::panic::{self, AssertUnwindSafe};

use shared::default_parameter_set;

use crate::config::PipelineConfig;
use crate::loader::{LoadedModule, LoadedSet};
use crate::publish::{Published, Publisher};
use crate::report::{ModuleFailure, Pass, Phase, RunReport};
use crate::solid::Solid;

/// A module whose artifact was produced and published.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltArtifact {
    pub id: String,
    pub triangles: usize,
    pub published: Vec<Published>,
}

/// Run `generate` with the module's defaults, turning a panic into an error.
pub fn generate_default(module: &LoadedModule) -> Result<Solid, ModuleFailure> {
    let params = default_parameter_set(&module.parameters);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| module.module.generate(&params)));
    match outcome {
        Ok(Ok(solid)) => Ok(solid),
        Ok(Err(e)) => Err(ModuleFailure::error(&module.id, Phase::Generate, e.to_string())),
        Err(payload) => Err(ModuleFailure::error(
            &module.id,
            Phase::Generate,
            format!("generate panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Generate, export and publish one module.
pub fn build_module(
    module: &LoadedModule,
    config: &PipelineConfig,
    publisher: &Publisher,
) -> Result<BuiltArtifact, ModuleFailure> {
    tracing::info!(module = %module.id, "Building {}", module.entry_point.display());

    let solid = generate_default(module)?;

    let mesh = solid
        .mesh()
        .map_err(|e| ModuleFailure::error(&module.id, Phase::Export, e.to_string()))?;
    let bytes = mesh
        .to_stl(&module.id)
        .map_err(|e| ModuleFailure::error(&module.id, Phase::Export, e.to_string()))?;

    let published = publisher
        .publish(&config.artifact_file_name(&module.id), &bytes)
        .map_err(|e| ModuleFailure::error(&module.id, Phase::Publish, e.to_string()))?;

    for target in &published {
        tracing::info!(
            module = %module.id,
            "Wrote {} ({} sink, {} triangles)",
            target.path.display(),
            target.sink,
            mesh.triangle_count()
        );
    }

    Ok(BuiltArtifact {
        id: module.id.clone(),
        triangles: mesh.triangle_count(),
        published,
    })
}

/// Build every loaded module; load rejections are carried into the report.
pub fn build_all(set: &LoadedSet, config: &PipelineConfig, publisher: &Publisher) -> RunReport {
    let mut report = RunReport::new(Pass::Build, set.discovered);
    report
        .failures
        .extend(set.rejections.iter().map(ModuleFailure::from));

    for module in &set.modules {
        match build_module(module, config, publisher) {
            Ok(built) => report.succeeded.push(built.id),
            Err(failure) => report.failures.push(failure),
        }
    }

    report
}
