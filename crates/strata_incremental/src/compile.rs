//! The backend seam: turning one unit into output text.

use strata_analyzer::Unit;
use strata_cache::BackendError;

/// Compiles a single unit. Implemented by the native backend; closures
/// taking a `&Unit` implement it too.
pub trait UnitCompiler {
    /// Produces the output for `unit`.
    fn compile(&self, unit: &Unit) -> Result<String, BackendError>;
}

impl<F> UnitCompiler for F
where
    F: Fn(&Unit) -> Result<String, BackendError>,
{
    fn compile(&self, unit: &Unit) -> Result<String, BackendError> {
        self(unit)
    }
}

/// Returns each unit's source text unchanged. Used when no backend is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoCompiler;

impl UnitCompiler for EchoCompiler {
    fn compile(&self, unit: &Unit) -> Result<String, BackendError> {
        Ok(unit.content.clone())
    }
}
