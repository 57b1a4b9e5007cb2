use rand::{distributions::WeightedIndex, prelude::*};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Potential list is empty, cannot perform sampling")]
    EmptyPotentials,
    #[error("Potential {index} is not finite ({value})")]
    NonFinitePotential { index: usize, value: f64 },
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// Draws an index with probability proportional to `exp(potentials[k])`.
///
/// Potentials are shifted by their maximum before exponentiation, so the most
/// probable state always has weight 1 and the total weight cannot underflow.
pub fn sample_from_potentials(
    potentials: &[f64],
    rng: &mut impl Rng,
) -> Result<usize, SamplingError> {
    if potentials.is_empty() {
        return Err(SamplingError::EmptyPotentials);
    }
    if let Some((index, &value)) = potentials
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite())
    {
        return Err(SamplingError::NonFinitePotential { index, value });
    }

    let max_potential = potentials
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let weights = potentials.iter().map(|&p| (p - max_potential).exp());
    let dist = WeightedIndex::new(weights)?;
    Ok(dist.sample(rng))
}
