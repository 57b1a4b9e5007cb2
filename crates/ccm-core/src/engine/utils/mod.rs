//! Helpers shared by the samplers of the engine.

pub mod sampling;
