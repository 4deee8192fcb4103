pub mod engine;
pub mod rules;

pub use engine::BlockingEngine;
pub use rules::{BlockingRule, Field, Predicate, RuleSet, Truth};
