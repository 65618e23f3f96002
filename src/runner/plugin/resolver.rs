//! Program units and the catalogue the runtime loads them from.
//!
//! A program unit plays the part of a precompiled script: loading it runs its
//! initializer once, which registers the objects it exports. The runtime then
//! looks entry points up by name on the exported object.

use super::registry::{ExportRegistry, UnitError};
use super::types::UnitInfo;

/// A loadable bundle of entry points.
pub trait ProgramUnit {
    /// Metadata recorded in the registry once the unit is loaded.
    fn info(&self) -> UnitInfo;

    /// Name of the object whose methods are the unit's entry points.
    fn export_name(&self) -> &str;

    /// Register every exported object.
    ///
    /// Called exactly once per runtime instance. An error here is fatal for
    /// the instance.
    fn initialize(&self, registry: &mut ExportRegistry) -> Result<(), UnitError>;
}

/// Instantiates a unit by the name it is configured under.
pub fn resolve_unit(name: &str) -> Result<Box<dyn ProgramUnit>, UnitError> {
    match name {
        crate::sfc::UNIT_NAME => Ok(Box::new(crate::sfc::SfcCompilerUnit)),
        _ => Err(UnitError::NotFound(name.to_string())),
    }
}
