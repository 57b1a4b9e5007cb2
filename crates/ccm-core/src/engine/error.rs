use super::config::ConfigError;
use super::utils::sampling::SamplingError;
use crate::core::codec::CodecError;
use crate::core::io::raw::RawError;
use crate::core::models::alignment::AlignmentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Mismatching number of columns: alignment {alignment}, parameters {parameters}")]
    ColumnMismatch { alignment: usize, parameters: usize },

    #[error("Invalid input data: {source}")]
    Input {
        #[from]
        source: AlignmentError,
    },

    #[error("Parameter vector error: {source}")]
    Codec {
        #[from]
        source: CodecError,
    },

    #[error("Gibbs sampling failed: {source}")]
    Sampling {
        #[from]
        source: SamplingError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Raw parameter file error: {source}")]
    Raw {
        #[from]
        source: RawError,
    },
}
