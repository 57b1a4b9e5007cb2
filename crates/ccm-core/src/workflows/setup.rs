use crate::core::io::raw::RawParams;
use crate::core::models::alignment::{Alignment, SequenceWeights};
use crate::engine::config::{EstimationConfig, ObjectiveKind};
use crate::engine::contrastive_divergence::ContrastiveDivergence;
use crate::engine::error::EngineError;
use crate::engine::objective::Objective;
use crate::engine::pseudo_likelihood::PseudoLikelihood;
use std::path::Path;
use tracing::{info, instrument};

/// A configured objective together with its starting point.
pub struct EstimationSetup<'a> {
    pub x0: Vec<f64>,
    pub objective: Box<dyn Objective + 'a>,
}

impl std::fmt::Debug for EstimationSetup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimationSetup")
            .field("ncol", &self.objective.ncol())
            .field("nvar", &self.objective.nvar())
            .finish()
    }
}

/// Builds the objective selected by `config`.
///
/// With `raw`, the starting point and the field regularization center come
/// from those parameters; otherwise fields start at the alignment's centering
/// vector and couplings at zero.
#[instrument(skip_all, name = "estimation_setup")]
pub fn initialize<'a>(
    alignment: &'a Alignment,
    weights: &'a SequenceWeights,
    config: &EstimationConfig,
    raw: Option<&RawParams>,
) -> Result<EstimationSetup<'a>, EngineError> {
    info!(
        objective = ?config.objective,
        nrow = alignment.nrow(),
        ncol = alignment.ncol(),
        neff = weights.neff(),
        from_raw = raw.is_some(),
        "Setting up estimation."
    );

    match config.objective {
        ObjectiveKind::PseudoLikelihood => {
            let regularization = &config.regularization;
            let (x0, objective) = match raw {
                Some(raw) => {
                    PseudoLikelihood::init_from_raw(alignment, weights, regularization, raw)?
                }
                None => PseudoLikelihood::init_from_default(alignment, weights, regularization)?,
            };
            Ok(EstimationSetup {
                x0,
                objective: Box::new(objective),
            })
        }
        ObjectiveKind::ContrastiveDivergence => {
            let (x0, objective) = match raw {
                Some(raw) => ContrastiveDivergence::init_from_raw(alignment, weights, config, raw)?,
                None => ContrastiveDivergence::init_from_default(alignment, weights, config)?,
            };
            Ok(EstimationSetup {
                x0,
                objective: Box::new(objective),
            })
        }
    }
}

/// Like [`initialize`], reading the starting parameters from a raw file.
pub fn initialize_from_file<'a>(
    alignment: &'a Alignment,
    weights: &'a SequenceWeights,
    config: &EstimationConfig,
    raw_path: &Path,
) -> Result<EstimationSetup<'a>, EngineError> {
    let raw = RawParams::load(raw_path)?;
    initialize(alignment, weights, config, Some(&raw))
}
