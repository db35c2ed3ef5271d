//! Pass entry points over a configured project.

use serde::Serialize;
use shared::ParameterSpec;

use crate::build::{build_all, generate_default};
use crate::catalog::run_catalog;
use crate::config::PipelineConfig;
use crate::discovery::{discover, DiscoveredModule};
use crate::error::PipelineError;
use crate::loader::{load_all, load_module, LoadOutcome, LoadedSet};
use crate::publish::Publisher;
use crate::report::{ModuleFailure, Pass, RunReport};

/// Geometry summary of one module built with its defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: String,
    pub parameters: Vec<ParameterSpec>,
    pub bounding_box: BoundingBox,
    pub size: [f32; 3],
    pub triangles: usize,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn discover(&self) -> Result<Vec<DiscoveredModule>, PipelineError> {
        let found = discover(
            &self.config.design_root,
            &self.config.entry_point,
            &self.config.excluded_dirs,
        )?;
        tracing::info!(
            "Found {} design module(s) under {}",
            found.len(),
            self.config.design_root.display()
        );
        Ok(found)
    }

    pub fn load(&self) -> Result<LoadedSet, PipelineError> {
        Ok(load_all(&self.discover()?))
    }

    /// Generate and publish every module's artifact.
    pub fn build(&self) -> Result<RunReport, PipelineError> {
        let set = self.load()?;
        let publisher = Publisher::from_config(&self.config);
        let report = build_all(&set, &self.config, &publisher);
        report.log_summary();
        Ok(report)
    }

    /// Write per-module documents and the aggregate catalog.
    pub fn catalog(&self) -> Result<RunReport, PipelineError> {
        let set = self.load()?;
        let report = run_catalog(&set, &self.config)?;
        report.log_summary();
        Ok(report)
    }

    /// Discover and validate without writing anything.
    pub fn check(&self) -> Result<RunReport, PipelineError> {
        let set = self.load()?;
        let mut report = RunReport::new(Pass::Check, set.discovered);
        report.succeeded = set.modules.iter().map(|m| m.id.clone()).collect();
        report.failures = set.rejections.iter().map(ModuleFailure::from).collect();
        report.log_summary();
        Ok(report)
    }

    /// Build one module in memory and describe the result.
    pub fn inspect(&self, id: &str) -> Result<Inspection, PipelineError> {
        let discovered = self
            .discover()?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| PipelineError::UnknownModule(id.to_string()))?;

        let module = match load_module(&discovered) {
            LoadOutcome::Loaded(module) => module,
            LoadOutcome::Rejected(rejection) => {
                return Err(PipelineError::Module {
                    id: rejection.id,
                    phase: "load",
                    message: rejection.reason.to_string(),
                })
            }
        };

        let into_error = |failure: ModuleFailure| PipelineError::Module {
            id: failure.id,
            phase: failure.phase.as_str(),
            message: failure.message,
        };
        let solid = generate_default(&module).map_err(into_error)?;
        let mesh = solid.mesh().map_err(|e| PipelineError::Module {
            id: module.id.clone(),
            phase: "export",
            message: e.to_string(),
        })?;

        let (min, max) = mesh.bounds().unwrap_or_default();
        Ok(Inspection {
            id: module.id,
            parameters: module.parameters,
            bounding_box: BoundingBox {
                min: min.to_array(),
                max: max.to_array(),
            },
            size: mesh.size().to_array(),
            triangles: mesh.triangle_count(),
            volume: mesh.volume(),
        })
    }
}
