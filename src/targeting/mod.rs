pub mod evaluator;
pub mod group;
pub mod predicate;
