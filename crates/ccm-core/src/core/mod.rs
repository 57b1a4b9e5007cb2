//! # Core Module
//!
//! Stateless building blocks of the Potts-model estimation engine.
//!
//! - **Alphabet** ([`alphabet`]) - The 21-state amino-acid + gap alphabet
//! - **Data Models** ([`models`]) - Alignments, sequence weights and typed parameter tensors
//! - **Parameter Codecs** ([`codec`]) - Packing typed parameters into optimizer vectors and back
//! - **Statistics** ([`statistics`]) - Weighted counts and pseudocount-corrected frequencies
//! - **File I/O** ([`io`]) - Reading and writing raw parameter files
//!
//! Nothing in this layer holds mutable state across calls; the stateful
//! objectives live in [`crate::engine`].

pub mod alphabet;
pub mod codec;
pub mod io;
pub mod models;
pub mod statistics;
