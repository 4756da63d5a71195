// src/config/config_manager.rs

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::Duration;

use crate::dao::adapters::StoreAdapter;
use crate::dao::{InMemoryDao, ReadableDao};
use crate::model::advertisement::AdvertisementContent;
use crate::selection::logic::AdvertisementSelectionLogic;
use crate::targeting::group::TargetingGroup;

/// Holds the loaded ad catalog handles and the evaluator settings, and
/// wires them into a selection logic instance.
#[derive(Clone)]
pub struct ConfigManager {
    content_dao: Arc<dyn ReadableDao<AdvertisementContent>>,
    targeting_group_dao: Arc<dyn ReadableDao<TargetingGroup>>,
    predicate_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ConfigManager {
    pub fn from_adapter(
        adapter: &dyn StoreAdapter,
        predicate_timeout_ms: u64,
        max_concurrency: usize,
    ) -> Self {
        Self {
            content_dao: Arc::new(InMemoryDao::new(adapter.ad_contents())),
            targeting_group_dao: Arc::new(InMemoryDao::new(adapter.targeting_groups())),
            predicate_timeout: Duration::from_millis(predicate_timeout_ms),
            permits: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    pub fn selection_logic(&self) -> AdvertisementSelectionLogic {
        AdvertisementSelectionLogic::new(
            Arc::clone(&self.content_dao),
            Arc::clone(&self.targeting_group_dao),
        )
        .with_predicate_timeout(self.predicate_timeout)
        .with_permits(Arc::clone(&self.permits))
    }
}
