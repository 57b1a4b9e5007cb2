//! # I/O Module
//!
//! Persistence of estimated parameters. [`raw`] reads and writes the
//! plain-text raw parameter format used to resume an estimation run or to hand
//! final couplings to a downstream scoring stage.

pub mod raw;
