// src/dao/adapters.rs

use std::collections::HashMap;
use std::fs;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mock_catalog::build_predicate;
use crate::model::advertisement::AdvertisementContent;
use crate::targeting::group::TargetingGroup;

/// Serialized form of a predicate in the static targeting files. The
/// selection core only ever sees the built `TargetingPredicate`; this
/// descriptor exists so the file adapter can construct the shipped
/// predicate set.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PredicateSpec {
    AlwaysTrue,
    AlwaysFalse,
    MarketplaceIs { marketplace_id: String },
    RecognizedCustomer,
    SlowTrue { delay_ms: u64 },
}

/// 广告内容行（static/ad_contents.json）
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ContentRow {
    pub content_id: String,
    pub marketplace_id: String,
    pub renderable_content: String,
}

/// 定向组行（static/targeting_groups.json）
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TargetingGroupRow {
    pub id: String,
    pub content_id: String,
    pub click_through_rate: f64,
    pub predicates: Vec<PredicateSpec>,
}

/// Source of the ad catalog: contents keyed by marketplace id,
/// targeting groups keyed by content id.
pub trait StoreAdapter: Send + Sync {
    fn ad_contents(&self) -> HashMap<String, Vec<AdvertisementContent>>;
    fn targeting_groups(&self) -> HashMap<String, Vec<TargetingGroup>>;
}

pub struct FileStoreAdapter {
    pub content_file: String,
    pub group_file: String,
}

impl FileStoreAdapter {
    pub fn new(content_file: &str, group_file: &str) -> Self {
        Self {
            content_file: content_file.to_string(),
            group_file: group_file.to_string(),
        }
    }

    pub fn files_exist(&self) -> bool {
        fs::metadata(&self.content_file).is_ok() && fs::metadata(&self.group_file).is_ok()
    }
}

impl StoreAdapter for FileStoreAdapter {
    fn ad_contents(&self) -> HashMap<String, Vec<AdvertisementContent>> {
        let content = fs::read_to_string(&self.content_file).unwrap_or_else(|_| "[]".to_string());
        let rows: Vec<ContentRow> = serde_json::from_str(&content).unwrap_or_default();
        contents_by_marketplace(rows)
    }

    fn targeting_groups(&self) -> HashMap<String, Vec<TargetingGroup>> {
        let content = fs::read_to_string(&self.group_file).unwrap_or_else(|_| "[]".to_string());
        let rows: Vec<TargetingGroupRow> = serde_json::from_str(&content).unwrap_or_default();
        groups_by_content(rows)
    }
}

pub fn contents_by_marketplace(
    rows: Vec<ContentRow>,
) -> HashMap<String, Vec<AdvertisementContent>> {
    let mut map: HashMap<String, Vec<AdvertisementContent>> = HashMap::new();
    for row in rows {
        map.entry(row.marketplace_id)
            .or_default()
            .push(AdvertisementContent {
                content_id: row.content_id,
                renderable_content: row.renderable_content,
            });
    }
    map
}

/// Rows with an invalid CTR are dropped here, with a warning, so a bad
/// catalog entry can never reach the ranking step.
pub fn groups_by_content(rows: Vec<TargetingGroupRow>) -> HashMap<String, Vec<TargetingGroup>> {
    let mut map: HashMap<String, Vec<TargetingGroup>> = HashMap::new();
    for row in rows {
        let predicates = row.predicates.iter().map(build_predicate).collect();
        match TargetingGroup::new(&row.id, &row.content_id, row.click_through_rate, predicates) {
            Ok(group) => map.entry(row.content_id).or_default().push(group),
            Err(err) => {
                warn!(group_id = %row.id, error = %err, "skipping targeting group with bad data");
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_are_keyed_by_marketplace() {
        let rows = vec![
            ContentRow {
                content_id: "c1".into(),
                marketplace_id: "mp1".into(),
                renderable_content: "<div>1</div>".into(),
            },
            ContentRow {
                content_id: "c2".into(),
                marketplace_id: "mp1".into(),
                renderable_content: "<div>2</div>".into(),
            },
            ContentRow {
                content_id: "c3".into(),
                marketplace_id: "mp2".into(),
                renderable_content: "<div>3</div>".into(),
            },
        ];
        let map = contents_by_marketplace(rows);
        assert_eq!(map.get("mp1").map(Vec::len), Some(2));
        assert_eq!(map.get("mp2").map(Vec::len), Some(1));
    }

    #[test]
    fn invalid_ctr_rows_are_skipped() {
        let rows = vec![
            TargetingGroupRow {
                id: "tg1".into(),
                content_id: "c1".into(),
                click_through_rate: 0.3,
                predicates: vec![PredicateSpec::AlwaysTrue],
            },
            TargetingGroupRow {
                id: "tg2".into(),
                content_id: "c1".into(),
                click_through_rate: 1.7,
                predicates: Vec::new(),
            },
        ];
        let map = groups_by_content(rows);
        let groups = map.get("c1").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id(), "tg1");
    }

    #[test]
    fn predicate_specs_round_trip_through_json() {
        let json = r#"[{"type":"marketplace_is","marketplace_id":"mp1"},{"type":"always_true"}]"#;
        let specs: Vec<PredicateSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(specs.len(), 2);
        assert!(matches!(&specs[0], PredicateSpec::MarketplaceIs { marketplace_id } if marketplace_id == "mp1"));
    }
}
