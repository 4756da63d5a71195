// src/selection/logic.rs

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio::time::Duration;
use tracing::info;

use crate::dao::ReadableDao;
use crate::logging::selection_log::SelectionLog;
use crate::model::advertisement::{AdvertisementContent, GeneratedAdvertisement};
use crate::model::context::RequestContext;
use crate::selection::tie_break::{StdTieBreaker, TieBreaker};
use crate::targeting::evaluator::{
    self, TargetingEvaluator, DEFAULT_PREDICATE_TIMEOUT_MS,
};
use crate::targeting::group::TargetingGroup;

/// A candidate that had at least one passing targeting group.
/// `position` is the content's index in DAO order, kept so that the
/// tie-break index means the same thing on every run.
struct QualifiedContent {
    position: usize,
    content: AdvertisementContent,
    ctr: f64,
}

/// Per-group outcome carried back from the evaluation fan-out, for the
/// audit log.
struct GroupOutcome {
    group_id: String,
    content_id: String,
    ctr: f64,
    passed: bool,
}

/// Picks the single best advertisement for a (customer, marketplace)
/// pair: the qualifying content with the highest CTR, ties broken by
/// the injected `TieBreaker`.
///
/// Never returns an error; every no-data and failure condition degrades
/// to `GeneratedAdvertisement::Empty`.
pub struct AdvertisementSelectionLogic {
    content_dao: Arc<dyn ReadableDao<AdvertisementContent>>,
    targeting_group_dao: Arc<dyn ReadableDao<TargetingGroup>>,
    tie_breaker: Arc<dyn TieBreaker>,
    predicate_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl AdvertisementSelectionLogic {
    pub fn new(
        content_dao: Arc<dyn ReadableDao<AdvertisementContent>>,
        targeting_group_dao: Arc<dyn ReadableDao<TargetingGroup>>,
    ) -> Self {
        Self {
            content_dao,
            targeting_group_dao,
            tie_breaker: Arc::new(StdTieBreaker),
            predicate_timeout: Duration::from_millis(DEFAULT_PREDICATE_TIMEOUT_MS),
            permits: evaluator::shared_permits(),
        }
    }

    pub fn with_tie_breaker(mut self, tie_breaker: Arc<dyn TieBreaker>) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    pub fn with_predicate_timeout(mut self, predicate_timeout: Duration) -> Self {
        self.predicate_timeout = predicate_timeout;
        self
    }

    pub fn with_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.permits = permits;
        self
    }

    /// Select the advertisement to render for this request.
    ///
    /// A content item qualifies when at least one of its targeting
    /// groups evaluates TRUE; its score is the highest CTR among its
    /// passing groups. A content item with no targeting groups at all
    /// never qualifies.
    pub async fn select_advertisement(
        &self,
        customer_id: Option<&str>,
        marketplace_id: &str,
    ) -> GeneratedAdvertisement {
        let mut audit = SelectionLog::new(customer_id, marketplace_id);

        if marketplace_id.is_empty() {
            info!("no marketplace id on request, returning empty advertisement");
            return GeneratedAdvertisement::Empty;
        }

        let contents = self.content_dao.get(marketplace_id);
        audit.candidate_contents = contents.len();
        if contents.is_empty() {
            Self::emit(&audit);
            return GeneratedAdvertisement::Empty;
        }

        let context = Arc::new(RequestContext::new(customer_id, marketplace_id));
        let evaluator = Arc::new(TargetingEvaluator::with_settings(
            context,
            self.predicate_timeout,
            Arc::clone(&self.permits),
        ));

        // Fan out across content items; each item's groups are walked in
        // turn while the predicates inside a group run concurrently.
        let mut tasks: FuturesUnordered<_> = contents
            .into_iter()
            .enumerate()
            .map(|(position, content)| {
                let groups = self.targeting_group_dao.get(&content.content_id);
                let evaluator = Arc::clone(&evaluator);
                async move {
                    let mut best_ctr: Option<f64> = None;
                    let mut outcomes = Vec::with_capacity(groups.len());
                    for group in &groups {
                        let verdict = evaluator.evaluate(group).await;
                        if verdict.is_true() {
                            let ctr = group.click_through_rate();
                            best_ctr = Some(best_ctr.map_or(ctr, |b| b.max(ctr)));
                        }
                        outcomes.push(GroupOutcome {
                            group_id: group.id().to_string(),
                            content_id: group.content_id().to_string(),
                            ctr: group.click_through_rate(),
                            passed: verdict.is_true(),
                        });
                    }
                    (position, content, best_ctr, outcomes)
                }
            })
            .collect();

        let mut qualified: Vec<QualifiedContent> = Vec::new();
        while let Some((position, content, best_ctr, outcomes)) = tasks.next().await {
            for outcome in &outcomes {
                audit.add_group_evaluation(
                    &outcome.group_id,
                    &outcome.content_id,
                    outcome.ctr,
                    outcome.passed,
                );
            }
            if let Some(ctr) = best_ctr {
                qualified.push(QualifiedContent {
                    position,
                    content,
                    ctr,
                });
            }
        }

        if qualified.is_empty() {
            Self::emit(&audit);
            return GeneratedAdvertisement::Empty;
        }

        // Restore DAO order: completion order above is arbitrary, and the
        // tie-break index must refer to a stable candidate ordering.
        qualified.sort_by_key(|candidate| candidate.position);

        let best_ctr = qualified
            .iter()
            .map(|candidate| candidate.ctr)
            .fold(f64::MIN, f64::max);
        let mut tied: Vec<QualifiedContent> = qualified
            .into_iter()
            .filter(|candidate| (candidate.ctr - best_ctr).abs() <= f64::EPSILON)
            .collect();

        let index = if tied.len() > 1 {
            self.tie_breaker.pick(tied.len()).min(tied.len() - 1)
        } else {
            0
        };
        let winner = tied.swap_remove(index);

        audit.set_winner(&winner.content.content_id, winner.ctr);
        Self::emit(&audit);
        GeneratedAdvertisement::of(winner.content)
    }

    fn emit(audit: &SelectionLog) {
        let line = serde_json::to_string(audit).unwrap_or_default();
        info!(target: "selection_audit", "{}", line);
    }
}
