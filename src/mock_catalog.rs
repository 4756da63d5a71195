// src/mock_catalog.rs
//
// Demo predicate set and a randomly generated ad catalog, used when no
// static catalog files are present so the server always has something
// to serve. The selection core itself only depends on the
// `TargetingPredicate` capability, never on these concrete types.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::TestRunner;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::dao::adapters::{
    contents_by_marketplace, groups_by_content, ContentRow, PredicateSpec, StoreAdapter,
    TargetingGroupRow,
};
use crate::model::advertisement::AdvertisementContent;
use crate::model::context::RequestContext;
use crate::targeting::group::TargetingGroup;
use crate::targeting::predicate::{TargetingPredicate, TargetingPredicateResult};

pub struct AlwaysTruePredicate;

#[async_trait]
impl TargetingPredicate for AlwaysTruePredicate {
    fn name(&self) -> &str {
        "always_true"
    }

    async fn evaluate(&self, _context: &RequestContext) -> Result<TargetingPredicateResult> {
        Ok(TargetingPredicateResult::True)
    }
}

pub struct AlwaysFalsePredicate;

#[async_trait]
impl TargetingPredicate for AlwaysFalsePredicate {
    fn name(&self) -> &str {
        "always_false"
    }

    async fn evaluate(&self, _context: &RequestContext) -> Result<TargetingPredicateResult> {
        Ok(TargetingPredicateResult::False)
    }
}

/// Always errors; exercises the fail-closed path.
pub struct FailingPredicate;

#[async_trait]
impl TargetingPredicate for FailingPredicate {
    fn name(&self) -> &str {
        "failing"
    }

    async fn evaluate(&self, _context: &RequestContext) -> Result<TargetingPredicateResult> {
        Err(anyhow!("predicate backend unavailable"))
    }
}

/// Matches requests from one specific marketplace.
pub struct MarketplacePredicate {
    marketplace_id: String,
}

impl MarketplacePredicate {
    pub fn new(marketplace_id: &str) -> Self {
        Self {
            marketplace_id: marketplace_id.to_string(),
        }
    }
}

#[async_trait]
impl TargetingPredicate for MarketplacePredicate {
    fn name(&self) -> &str {
        "marketplace_is"
    }

    async fn evaluate(&self, context: &RequestContext) -> Result<TargetingPredicateResult> {
        Ok((context.marketplace_id == self.marketplace_id).into())
    }
}

/// Matches requests that carry a customer id.
pub struct RecognizedCustomerPredicate;

#[async_trait]
impl TargetingPredicate for RecognizedCustomerPredicate {
    fn name(&self) -> &str {
        "recognized_customer"
    }

    async fn evaluate(&self, context: &RequestContext) -> Result<TargetingPredicateResult> {
        Ok(context.is_recognized().into())
    }
}

/// Sleeps before answering, simulating a predicate that does IO.
pub struct SlowPredicate {
    delay_ms: u64,
    result: TargetingPredicateResult,
}

impl SlowPredicate {
    pub fn new(delay_ms: u64, result: TargetingPredicateResult) -> Self {
        Self { delay_ms, result }
    }

    pub fn passing(delay_ms: u64) -> Self {
        Self::new(delay_ms, TargetingPredicateResult::True)
    }
}

#[async_trait]
impl TargetingPredicate for SlowPredicate {
    fn name(&self) -> &str {
        "slow"
    }

    async fn evaluate(&self, _context: &RequestContext) -> Result<TargetingPredicateResult> {
        sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(self.result)
    }
}

/// Construct the shipped predicate for a serialized descriptor.
pub fn build_predicate(spec: &PredicateSpec) -> Arc<dyn TargetingPredicate> {
    match spec {
        PredicateSpec::AlwaysTrue => Arc::new(AlwaysTruePredicate),
        PredicateSpec::AlwaysFalse => Arc::new(AlwaysFalsePredicate),
        PredicateSpec::MarketplaceIs { marketplace_id } => {
            Arc::new(MarketplacePredicate::new(marketplace_id))
        }
        PredicateSpec::RecognizedCustomer => Arc::new(RecognizedCustomerPredicate),
        PredicateSpec::SlowTrue { delay_ms } => Arc::new(SlowPredicate::passing(*delay_ms)),
    }
}

/// 使用 proptest 生成随机的广告内容行
fn generate_content_rows() -> impl Strategy<Value = Vec<ContentRow>> {
    let row = ("[a-z0-9]{12}", prop::sample::select(vec!["1", "2", "3"])).prop_map(
        |(content_id, marketplace_id)| ContentRow {
            renderable_content: format!("<div>mock ad {}</div>", content_id),
            content_id,
            marketplace_id: marketplace_id.to_string(),
        },
    );
    proptest::collection::vec(row, 4..9)
}

/// 使用 proptest 生成某条内容的定向组行
fn generate_group_rows(
    content_id: String,
    marketplace_id: String,
) -> impl Strategy<Value = Vec<TargetingGroupRow>> {
    let spec = prop_oneof![
        Just(PredicateSpec::AlwaysTrue),
        Just(PredicateSpec::RecognizedCustomer),
        Just(PredicateSpec::MarketplaceIs {
            marketplace_id: marketplace_id.clone()
        }),
        (20u64..120u64).prop_map(|delay_ms| PredicateSpec::SlowTrue { delay_ms }),
    ];
    let row = (
        "[a-z0-9]{6}",
        0.01f64..0.6,
        proptest::collection::vec(spec, 0..3),
    )
        .prop_map(move |(suffix, click_through_rate, predicates)| TargetingGroupRow {
            id: format!("tg_{}", suffix),
            content_id: content_id.clone(),
            click_through_rate,
            predicates,
        });
    proptest::collection::vec(row, 1..3)
}

/// Catalog source that fabricates its rows at construction, the mock
/// counterpart of `FileStoreAdapter`.
pub struct MockStoreAdapter {
    contents: Vec<ContentRow>,
    groups: Vec<TargetingGroupRow>,
}

impl MockStoreAdapter {
    pub fn generate() -> Self {
        let mut runner = TestRunner::default();
        let contents = generate_content_rows()
            .new_tree(&mut runner)
            .unwrap()
            .current();

        let mut groups = Vec::new();
        for content in &contents {
            let rows = generate_group_rows(
                content.content_id.clone(),
                content.marketplace_id.clone(),
            )
            .new_tree(&mut runner)
            .unwrap()
            .current();
            groups.extend(rows);
        }

        info!(
            "generated mock catalog: {} contents, {} targeting groups",
            contents.len(),
            groups.len()
        );
        for content in &contents {
            info!(
                "mock content {} in marketplace {}",
                content.content_id, content.marketplace_id
            );
        }

        Self { contents, groups }
    }
}

impl StoreAdapter for MockStoreAdapter {
    fn ad_contents(&self) -> HashMap<String, Vec<AdvertisementContent>> {
        contents_by_marketplace(self.contents.clone())
    }

    fn targeting_groups(&self) -> HashMap<String, Vec<TargetingGroup>> {
        groups_by_content(self.groups.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn marketplace_predicate_matches_its_marketplace_only() {
        let predicate = MarketplacePredicate::new("1");
        let matching = RequestContext::new(None, "1");
        let other = RequestContext::new(None, "2");
        assert!(predicate.evaluate(&matching).await.unwrap().is_true());
        assert!(!predicate.evaluate(&other).await.unwrap().is_true());
    }

    #[tokio::test]
    async fn recognized_customer_predicate_requires_a_customer_id() {
        let predicate = RecognizedCustomerPredicate;
        let known = RequestContext::new(Some("A123B456"), "1");
        let anonymous = RequestContext::new(None, "1");
        assert!(predicate.evaluate(&known).await.unwrap().is_true());
        assert!(!predicate.evaluate(&anonymous).await.unwrap().is_true());
    }

    #[test]
    fn generated_catalog_groups_reference_generated_contents() {
        let adapter = MockStoreAdapter::generate();
        let contents = adapter.ad_contents();
        let groups = adapter.targeting_groups();
        let known: Vec<&str> = contents
            .values()
            .flatten()
            .map(|c| c.content_id.as_str())
            .collect();
        for content_id in groups.keys() {
            assert!(known.contains(&content_id.as_str()));
        }
    }
}
