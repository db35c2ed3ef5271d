//! Design pipeline: discovers parametric design modules, builds their STL
//! artifacts and compiles the catalog the viewer reads.

pub mod build;
pub mod catalog;
pub mod config;
pub mod contract;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod script;
pub mod solid;
pub mod source;

pub use config::PipelineConfig;
pub use contract::DesignModule;
pub use error::{GenerateError, PipelineError};
pub use pipeline::{Inspection, Pipeline};
pub use report::{RunReport, RunStatus};
pub use solid::Solid;
