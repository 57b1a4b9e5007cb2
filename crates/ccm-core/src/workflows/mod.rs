//! # Workflows Module
//!
//! Entry points that turn an alignment and a configuration into a ready
//! objective and starting point for an external optimizer.
//!
//! - **Setup** ([`setup`]) - Objective selection and initialization from
//!   defaults or from a raw parameter file

pub mod setup;
