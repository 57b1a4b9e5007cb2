//! # Statistics Module
//!
//! Weighted sufficient statistics of an alignment: single and pair counts
//! ([`counts`]) and pseudocount-corrected frequencies with optional gap
//! removal ([`pseudocounts`]). Column-pair tables always carry all 21 states;
//! gap mass is removed explicitly by the degapping helpers.

pub mod counts;
pub mod pseudocounts;
