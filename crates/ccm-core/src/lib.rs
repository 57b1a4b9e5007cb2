//! # CCM++ Core Library
//!
//! Estimation of Potts-model parameters (single-site fields and pairwise
//! couplings) from weighted protein multiple-sequence alignments, for
//! residue-residue contact prediction.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Alignment`,
//!   `SingleParams`, `PairParams`), parameter codecs, alignment statistics
//!   and raw parameter file I/O.
//!
//! - **[`engine`]: The Logic Core.** The pseudo-likelihood and
//!   contrastive-divergence objectives, regularization, centering and the
//!   Gibbs sampler.
//!
//! - **[`workflows`]: The Public API.** Builds the configured objective and
//!   its starting point, ready to hand to an optimizer driver.

pub mod core;
pub mod engine;
pub mod workflows;
