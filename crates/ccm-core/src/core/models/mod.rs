//! # Core Models Module
//!
//! Data structures shared by every stage of the estimation engine.
//!
//! - [`alignment`] - The symbol-encoded alignment and its sequence weights
//! - [`params`] - Typed single-site fields (`L × 20`) and pair couplings (`L × L × 21 × 21`)
//!
//! Both the alignment and the weights are validated on construction; objectives
//! borrow them for their whole lifetime and never copy them.

pub mod alignment;
pub mod params;
