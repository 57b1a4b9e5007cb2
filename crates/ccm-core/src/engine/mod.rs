//! # Engine Module
//!
//! Stateful objectives over packed parameter vectors and the machinery they
//! share.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Regularization strengths, pseudocounts and sampling settings
//! - **Objective Contract** ([`objective`]) - The interface consumed by optimizer drivers
//! - **Regularization** ([`regularization`]) - Centered L2 penalty on fields and couplings
//! - **Centering** ([`centering`]) - Per-column field centers derived from the alignment
//! - **Pseudo-likelihood** ([`pseudo_likelihood`]) - Exact objective with analytic gradient
//! - **Gibbs Sampling** ([`gibbs`]) - Sweeps of the Potts model used by contrastive divergence
//! - **Contrastive Divergence** ([`contrastive_divergence`]) - Sampling-based gradient estimator
//! - **Error Handling** ([`error`]) - Engine-level errors wrapping the lower layers
//!
//! Objectives own their gradient buffers and lend them out per evaluation.
//! Column-wise and sequence-wise work is spread over threads when the
//! `parallel` feature is enabled; results do not depend on the thread count.

pub mod centering;
pub(crate) mod conditional;
pub mod config;
pub mod contrastive_divergence;
pub mod error;
pub mod gibbs;
pub mod objective;
pub mod pseudo_likelihood;
pub mod regularization;
pub mod utils;
