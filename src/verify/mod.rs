//! Verification that the stepping algorithms agree

pub mod equivalence;

pub use equivalence::{Divergence, EquivalenceChecker, EquivalenceReport};
