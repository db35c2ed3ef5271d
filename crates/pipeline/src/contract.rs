//! The design-module contract.

use shared::{ParameterError, ParameterSet, ParameterSpec};

use crate::error::GenerateError;
use crate::solid::Solid;

/// What every design module provides to the pipeline.
///
/// Both operations are pure: no I/O, same output for the same input.
pub trait DesignModule {
    /// Ordered parameter schema. May be empty.
    fn parameter_definitions(&self) -> Result<Vec<ParameterSpec>, ParameterError>;

    /// Build the solid for a fully populated parameter set.
    fn generate(&self, params: &ParameterSet) -> Result<Solid, GenerateError>;
}

