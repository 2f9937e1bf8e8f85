use crate::{Assumptions, CanonicalModel};

/// A category calculator: a pure function from the canonical model to one
/// metric group. Implementations must not keep state between calls.
pub trait MetricCalculator: Send + Sync {
    type Output: Send;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> Self::Output;
}
