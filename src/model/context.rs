// src/model/context.rs

use serde::{Deserialize, Serialize};

/// Read-only bundle of request attributes handed to every targeting
/// predicate. One instance is built per selection call and shared via
/// `Arc` across all concurrently running predicate tasks; nothing
/// mutates it after construction.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RequestContext {
    /// 当前请求的客户标识（匿名请求时为 None）
    pub customer_id: Option<String>,
    /// 当前请求所属的 marketplace
    pub marketplace_id: String,
}

impl RequestContext {
    pub fn new(customer_id: Option<&str>, marketplace_id: &str) -> Self {
        Self {
            customer_id: customer_id.map(str::to_string),
            marketplace_id: marketplace_id.to_string(),
        }
    }

    /// A request is "recognized" when it carries a non-empty customer id.
    pub fn is_recognized(&self) -> bool {
        self.customer_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
