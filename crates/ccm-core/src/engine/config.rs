use crate::core::statistics::pseudocounts::{PseudocountConfig, PseudocountKind};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectiveKind {
    #[default]
    PseudoLikelihood,
    ContrastiveDivergence,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularizationConfig {
    pub lambda_single: f64,
    /// `λ_pair = lambda_pair_factor · (L − 1)`.
    pub lambda_pair_factor: f64,
}

impl Default for RegularizationConfig {
    fn default() -> Self {
        Self {
            lambda_single: 10.0,
            lambda_pair_factor: 0.2,
        }
    }
}

impl RegularizationConfig {
    pub fn lambda_pair(&self, ncol: usize) -> f64 {
        self.lambda_pair_factor * ncol.saturating_sub(1) as f64
    }
}

/// Number of sequences drawn for each contrastive-divergence evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleSize {
    /// Every sequence of the alignment.
    #[default]
    All,
    Absolute(usize),
    /// A multiple of the number of columns `L`.
    PerColumn(f64),
    /// A multiple of `Neff`, never fewer than 10 sequences.
    PerNeff(f64),
}

const MIN_NEFF_SAMPLE: usize = 10;

impl SampleSize {
    /// Resolves the request to a row count in `1..=nrow`.
    pub fn resolve(&self, nrow: usize, ncol: usize, neff: f64) -> usize {
        let requested = match *self {
            SampleSize::All => nrow,
            SampleSize::Absolute(n) => n,
            SampleSize::PerColumn(factor) => (factor * ncol as f64) as usize,
            SampleSize::PerNeff(factor) => MIN_NEFF_SAMPLE.max((factor * neff) as usize),
        };
        requested.clamp(1, nrow.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastiveDivergenceConfig {
    /// Full Gibbs sweeps per evaluation; 0 is treated as 1.
    pub gibbs_steps: usize,
    pub sample_size: SampleSize,
    /// Seed for subsampling and Gibbs sampling. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ContrastiveDivergenceConfig {
    fn default() -> Self {
        Self {
            gibbs_steps: 1,
            sample_size: SampleSize::All,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimationConfig {
    pub objective: ObjectiveKind,
    pub regularization: RegularizationConfig,
    pub pseudocounts: PseudocountConfig,
    pub contrastive_divergence: ContrastiveDivergenceConfig,
}

impl EstimationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        file.into_builder().build()
    }
}

#[derive(Default)]
pub struct EstimationConfigBuilder {
    objective: Option<ObjectiveKind>,
    lambda_single: Option<f64>,
    lambda_pair_factor: Option<f64>,
    pseudocount_kind: Option<PseudocountKind>,
    pseudocount_single: Option<f64>,
    pseudocount_pair: Option<f64>,
    gibbs_steps: Option<usize>,
    sample_size: Option<SampleSize>,
    seed: Option<u64>,
}

impl EstimationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objective(mut self, kind: ObjectiveKind) -> Self {
        self.objective = Some(kind);
        self
    }
    pub fn lambda_single(mut self, lambda: f64) -> Self {
        self.lambda_single = Some(lambda);
        self
    }
    pub fn lambda_pair_factor(mut self, factor: f64) -> Self {
        self.lambda_pair_factor = Some(factor);
        self
    }
    pub fn pseudocount_kind(mut self, kind: PseudocountKind) -> Self {
        self.pseudocount_kind = Some(kind);
        self
    }
    pub fn pseudocount_single(mut self, n: f64) -> Self {
        self.pseudocount_single = Some(n);
        self
    }
    pub fn pseudocount_pair(mut self, n: f64) -> Self {
        self.pseudocount_pair = Some(n);
        self
    }
    pub fn gibbs_steps(mut self, steps: usize) -> Self {
        self.gibbs_steps = Some(steps);
        self
    }
    pub fn sample_size(mut self, size: SampleSize) -> Self {
        self.sample_size = Some(size);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<EstimationConfig, ConfigError> {
        let regularization_defaults = RegularizationConfig::default();
        let regularization = RegularizationConfig {
            lambda_single: non_negative(
                "lambda_single",
                self.lambda_single
                    .unwrap_or(regularization_defaults.lambda_single),
            )?,
            lambda_pair_factor: non_negative(
                "lambda_pair_factor",
                self.lambda_pair_factor
                    .unwrap_or(regularization_defaults.lambda_pair_factor),
            )?,
        };

        let pseudocount_defaults = PseudocountConfig::default();
        let pseudocounts = PseudocountConfig {
            kind: self.pseudocount_kind.unwrap_or(pseudocount_defaults.kind),
            n_single: non_negative(
                "pseudocount_single",
                self.pseudocount_single
                    .unwrap_or(pseudocount_defaults.n_single),
            )?,
            n_pair: self
                .pseudocount_pair
                .map(|n| non_negative("pseudocount_pair", n))
                .transpose()?,
        };

        let sample_size = self.sample_size.unwrap_or_default();
        match sample_size {
            SampleSize::Absolute(0) => {
                return Err(ConfigError::InvalidValue {
                    field: "sample_size",
                    reason: "absolute sample size must be at least 1".into(),
                });
            }
            SampleSize::PerColumn(f) | SampleSize::PerNeff(f) if !(f.is_finite() && f > 0.0) => {
                return Err(ConfigError::InvalidValue {
                    field: "sample_size",
                    reason: format!("sample size factor must be positive, got {f}"),
                });
            }
            _ => {}
        }

        let contrastive_divergence = ContrastiveDivergenceConfig {
            gibbs_steps: self.gibbs_steps.unwrap_or(1),
            sample_size,
            seed: self.seed,
        };

        Ok(EstimationConfig {
            objective: self
                .objective
                .ok_or(ConfigError::MissingParameter("objective"))?,
            regularization,
            pseudocounts,
            contrastive_divergence,
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be a finite, non-negative number, got {value}"),
        })
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FileConfig {
    objective: Option<ObjectiveKind>,
    #[serde(default)]
    regularization: FileRegularization,
    #[serde(default)]
    pseudocounts: FilePseudocounts,
    #[serde(default)]
    contrastive_divergence: FileContrastiveDivergence,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FileRegularization {
    lambda_single: Option<f64>,
    lambda_pair_factor: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FilePseudocounts {
    kind: Option<PseudocountKind>,
    single: Option<f64>,
    pair: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FileContrastiveDivergence {
    gibbs_steps: Option<usize>,
    sample_size: Option<SampleSize>,
    seed: Option<u64>,
}

impl FileConfig {
    fn into_builder(self) -> EstimationConfigBuilder {
        EstimationConfigBuilder {
            objective: self.objective,
            lambda_single: self.regularization.lambda_single,
            lambda_pair_factor: self.regularization.lambda_pair_factor,
            pseudocount_kind: self.pseudocounts.kind,
            pseudocount_single: self.pseudocounts.single,
            pseudocount_pair: self.pseudocounts.pair,
            gibbs_steps: self.contrastive_divergence.gibbs_steps,
            sample_size: self.contrastive_divergence.sample_size,
            seed: self.contrastive_divergence.seed,
        }
    }
}
