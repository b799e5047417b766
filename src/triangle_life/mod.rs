//! Triangular Life engine

pub mod animation;
pub mod bit_grid;
pub mod error;
pub mod field;
pub mod rules;
pub mod stepping;

pub use animation::{AnimationMatcher, TransitionDescriptor};
pub use bit_grid::{BitBuffer, BitGrid, Buffer, WORD_BITS};
pub use error::FieldError;
pub use field::Field;
pub use rules::{Orientation, RuleTable};
pub use stepping::StepAlgorithm;
