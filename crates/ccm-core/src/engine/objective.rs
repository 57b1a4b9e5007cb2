use crate::core::io::raw::RawParams;
use crate::engine::error::EngineError;

/// Value reported to an optimizer driver when no objective value exists.
pub const GRADIENT_ONLY_SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectiveValue {
    /// The unregularized objective at the evaluated point.
    Exact(f64),
    /// Only a gradient is available. Drivers must not use the value for line
    /// searches or decrease-based convergence checks.
    GradientOnly,
}

impl ObjectiveValue {
    pub fn exact(self) -> Option<f64> {
        match self {
            ObjectiveValue::Exact(value) => Some(value),
            ObjectiveValue::GradientOnly => None,
        }
    }

    /// Plain scalar for drivers that expect one; [`GRADIENT_ONLY_SENTINEL`]
    /// stands in for a missing value.
    pub fn as_f64(self) -> f64 {
        self.exact().unwrap_or(GRADIENT_ONLY_SENTINEL)
    }

    /// The regularized objective, when an objective value exists.
    pub fn total(self, regularization: f64) -> Option<f64> {
        self.exact().map(|value| value + regularization)
    }
}

/// Result of one objective evaluation.
///
/// Both gradient slices borrow buffers owned by the objective. They are fully
/// rewritten on every call, and the borrow ends before the next `evaluate`.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub value: ObjectiveValue,
    /// Value of the regularization penalty at the evaluated point.
    pub regularization: f64,
    /// Gradient of the unregularized objective, in the objective's packed layout.
    pub gradient: &'a [f64],
    /// Gradient of the regularization penalty, in the same layout.
    pub regularization_gradient: &'a [f64],
}

impl Evaluation<'_> {
    /// Sum of the data and regularization gradients.
    pub fn combined_gradient(&self) -> Vec<f64> {
        self.gradient
            .iter()
            .zip(self.regularization_gradient)
            .map(|(g, r)| g + r)
            .collect()
    }
}

/// Contract consumed by an external optimizer driver.
pub trait Objective {
    fn ncol(&self) -> usize;

    /// Length of the packed parameter vector.
    fn nvar(&self) -> usize;

    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation<'_>, EngineError>;

    /// Converts a packed vector into final parameters for downstream scoring.
    fn finalize(&self, x: &[f64]) -> Result<RawParams, EngineError>;
}

/// Owned gradient buffers reused across evaluations.
#[derive(Debug, Clone)]
pub(crate) struct GradientBuffers {
    pub gradient: Vec<f64>,
    pub regularization: Vec<f64>,
}

impl GradientBuffers {
    pub fn new(nvar: usize) -> Self {
        Self {
            gradient: vec![0.0; nvar],
            regularization: vec![0.0; nvar],
        }
    }
}
