// src/targeting/evaluator.rs

use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use futures::stream::{FuturesUnordered, StreamExt};
use once_cell::sync::Lazy;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};
use tracing::warn;

use crate::model::context::RequestContext;
use crate::targeting::group::TargetingGroup;
use crate::targeting::predicate::TargetingPredicateResult;

/// Default per-predicate deadline, in line with the usual bid timeout.
pub const DEFAULT_PREDICATE_TIMEOUT_MS: u64 = 250;

/// Upper bound on predicate tasks in flight across the whole process.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

static SHARED_PERMITS: Lazy<Arc<Semaphore>> =
    Lazy::new(|| Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)));

/// Process-wide permit pool used when no dedicated one is injected.
pub fn shared_permits() -> Arc<Semaphore> {
    Arc::clone(&SHARED_PERMITS)
}

/// Evaluates one targeting group's predicates concurrently against a
/// fixed request context and reduces them to a single verdict: `True`
/// iff every predicate is `True`.
///
/// Failure policy is fail-closed: a predicate error, a timeout, a
/// panicked task or an exhausted permit pool all score as `False` for
/// that predicate; `evaluate` itself never returns an error.
pub struct TargetingEvaluator {
    context: Arc<RequestContext>,
    predicate_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl TargetingEvaluator {
    pub fn new(context: Arc<RequestContext>) -> Self {
        Self::with_settings(
            context,
            Duration::from_millis(DEFAULT_PREDICATE_TIMEOUT_MS),
            shared_permits(),
        )
    }

    pub fn with_settings(
        context: Arc<RequestContext>,
        predicate_timeout: Duration,
        permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            context,
            predicate_timeout,
            permits,
        }
    }

    /// Concurrently evaluate every predicate of `group` and AND the
    /// results. An empty predicate list is vacuously `True`.
    ///
    /// Results are drained in completion order; the first `False` (or
    /// failure) settles the verdict and stops consumption, after which
    /// still-running tasks are aborted rather than awaited.
    pub async fn evaluate(&self, group: &TargetingGroup) -> TargetingPredicateResult {
        let predicates = group.predicates();
        if predicates.is_empty() {
            return TargetingPredicateResult::True;
        }

        let mut tasks: FuturesUnordered<_> = predicates
            .iter()
            .map(|predicate| {
                let predicate = Arc::clone(predicate);
                let context = Arc::clone(&self.context);
                let permits = Arc::clone(&self.permits);
                let deadline = self.predicate_timeout;
                tokio::spawn(async move {
                    let _permit = Arc::clone(&permits)
                        .acquire_owned()
                        .await
                        .context("predicate worker pool closed")?;
                    match timeout(deadline, predicate.evaluate(&context)).await {
                        Ok(result) => result,
                        Err(_) => Err(anyhow!(
                            "predicate {} timed out after {:?}",
                            predicate.name(),
                            deadline
                        )),
                    }
                })
            })
            .collect();

        let mut verdict = TargetingPredicateResult::True;
        while let Some(joined) = tasks.next().await {
            let predicate_false = match joined {
                Ok(Ok(result)) => !result.is_true(),
                Ok(Err(err)) => {
                    warn!(group_id = group.id(), error = %err, "predicate evaluation failed, scoring FALSE");
                    true
                }
                Err(err) => {
                    warn!(group_id = group.id(), error = %err, "predicate task did not complete, scoring FALSE");
                    true
                }
            };
            if predicate_false {
                verdict = TargetingPredicateResult::False;
                break;
            }
        }

        // Stragglers cannot change a FALSE verdict; abort them instead
        // of waiting so repeated calls do not pile up work.
        for task in tasks.iter() {
            task.abort();
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_catalog::{AlwaysFalsePredicate, AlwaysTruePredicate, FailingPredicate, SlowPredicate};
    use crate::targeting::predicate::TargetingPredicate;
    use std::time::Instant;

    fn context() -> Arc<RequestContext> {
        Arc::new(RequestContext::new(Some("A123B456"), "1"))
    }

    fn group(predicates: Vec<Arc<dyn TargetingPredicate>>) -> TargetingGroup {
        TargetingGroup::new("tg1", "c1", 0.2, predicates).unwrap()
    }

    #[tokio::test]
    async fn empty_predicate_list_is_vacuously_true() {
        let evaluator = TargetingEvaluator::new(context());
        let verdict = evaluator.evaluate(&group(Vec::new())).await;
        assert_eq!(verdict, TargetingPredicateResult::True);
    }

    #[tokio::test]
    async fn all_true_predicates_yield_true() {
        let evaluator = TargetingEvaluator::new(context());
        let predicates: Vec<Arc<dyn TargetingPredicate>> = vec![
            Arc::new(AlwaysTruePredicate),
            Arc::new(AlwaysTruePredicate),
            Arc::new(AlwaysTruePredicate),
        ];
        let verdict = evaluator.evaluate(&group(predicates)).await;
        assert_eq!(verdict, TargetingPredicateResult::True);
    }

    #[tokio::test]
    async fn single_false_predicate_yields_false() {
        let evaluator = TargetingEvaluator::new(context());
        let predicates: Vec<Arc<dyn TargetingPredicate>> = vec![
            Arc::new(AlwaysTruePredicate),
            Arc::new(AlwaysFalsePredicate),
            Arc::new(AlwaysTruePredicate),
        ];
        let verdict = evaluator.evaluate(&group(predicates)).await;
        assert_eq!(verdict, TargetingPredicateResult::False);
    }

    #[tokio::test]
    async fn failing_predicate_scores_false_without_erroring() {
        let evaluator = TargetingEvaluator::new(context());
        let predicates: Vec<Arc<dyn TargetingPredicate>> =
            vec![Arc::new(AlwaysTruePredicate), Arc::new(FailingPredicate)];
        let verdict = evaluator.evaluate(&group(predicates)).await;
        assert_eq!(verdict, TargetingPredicateResult::False);
    }

    #[tokio::test]
    async fn predicate_exceeding_deadline_scores_false() {
        let evaluator = TargetingEvaluator::with_settings(
            context(),
            Duration::from_millis(20),
            shared_permits(),
        );
        let predicates: Vec<Arc<dyn TargetingPredicate>> =
            vec![Arc::new(SlowPredicate::passing(200))];
        let verdict = evaluator.evaluate(&group(predicates)).await;
        assert_eq!(verdict, TargetingPredicateResult::False);
    }

    #[tokio::test]
    async fn slow_predicates_run_concurrently_not_sequentially() {
        let evaluator = TargetingEvaluator::with_settings(
            context(),
            Duration::from_millis(1_000),
            Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)),
        );
        let predicates: Vec<Arc<dyn TargetingPredicate>> = (0..5)
            .map(|_| Arc::new(SlowPredicate::passing(100)) as Arc<dyn TargetingPredicate>)
            .collect();
        let start = Instant::now();
        let verdict = evaluator.evaluate(&group(predicates)).await;
        assert_eq!(verdict, TargetingPredicateResult::True);
        // Five sequential 100ms predicates would take 500ms.
        assert!(start.elapsed() < Duration::from_millis(450));
    }

    #[tokio::test]
    async fn false_verdict_does_not_wait_for_stragglers() {
        let evaluator = TargetingEvaluator::with_settings(
            context(),
            Duration::from_millis(5_000),
            shared_permits(),
        );
        let predicates: Vec<Arc<dyn TargetingPredicate>> = vec![
            Arc::new(AlwaysFalsePredicate),
            Arc::new(SlowPredicate::passing(2_000)),
        ];
        let start = Instant::now();
        let verdict = evaluator.evaluate(&group(predicates)).await;
        assert_eq!(verdict, TargetingPredicateResult::False);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn closed_permit_pool_fails_closed() {
        let permits = Arc::new(Semaphore::new(1));
        permits.close();
        let evaluator =
            TargetingEvaluator::with_settings(context(), Duration::from_millis(250), permits);
        let predicates: Vec<Arc<dyn TargetingPredicate>> = vec![Arc::new(AlwaysTruePredicate)];
        let verdict = evaluator.evaluate(&group(predicates)).await;
        assert_eq!(verdict, TargetingPredicateResult::False);
    }
}
