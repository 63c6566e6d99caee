//! Language-scoped allophone rewriting.

pub mod builtin;
pub mod engine;
pub mod rule;

pub use engine::{RuleEngine, RuleLoadError, UNIVERSAL};
pub use rule::{AllophoneRule, FeatureClass, Pattern, Replacement};
