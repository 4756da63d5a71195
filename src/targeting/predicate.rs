// src/targeting/predicate.rs

use anyhow::Result;
use async_trait::async_trait;

use crate::model::context::RequestContext;

/// Verdict of a single predicate (or of a whole targeting group).
/// There is deliberately no error/unknown variant: evaluation failures
/// are mapped to `False` before they reach any caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingPredicateResult {
    True,
    False,
}

impl TargetingPredicateResult {
    pub fn is_true(self) -> bool {
        matches!(self, TargetingPredicateResult::True)
    }
}

impl From<bool> for TargetingPredicateResult {
    fn from(value: bool) -> Self {
        if value {
            TargetingPredicateResult::True
        } else {
            TargetingPredicateResult::False
        }
    }
}

/// One eligibility rule evaluated against the request context.
///
/// Implementations are arbitrary business rules, may await IO, and are
/// invoked concurrently from multiple tasks, so they must be `Send +
/// Sync` and must not mutate the context. An `Err` here is the
/// "predicate evaluation failure" channel: the evaluator logs it and
/// scores the predicate as `False`.
#[async_trait]
pub trait TargetingPredicate: Send + Sync {
    /// Stable name used in evaluation logs.
    fn name(&self) -> &str;

    async fn evaluate(&self, context: &RequestContext) -> Result<TargetingPredicateResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_compares_by_value() {
        assert_eq!(TargetingPredicateResult::from(true), TargetingPredicateResult::True);
        assert_eq!(TargetingPredicateResult::from(false), TargetingPredicateResult::False);
        assert!(TargetingPredicateResult::True.is_true());
        assert!(!TargetingPredicateResult::False.is_true());
    }
}
