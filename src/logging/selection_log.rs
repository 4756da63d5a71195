// src/logging/selection_log.rs

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// **单次广告选择的审计日志**
///
/// One record per `select_advertisement` call: every evaluated
/// targeting group with its verdict, plus the winner (or the reason
/// nothing was filled).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SelectionLog {
    pub timestamp: String,
    pub log_type: String,
    pub marketplace_id: String,
    pub customer_id: Option<String>,
    pub candidate_contents: usize,
    pub status: String, // "filled" or "no_fill"
    pub winning_content_id: Option<String>,
    pub winning_ctr: f64,
    pub group_evaluations: Vec<GroupEvaluationLog>,
}

/// **单个定向组的评估日志**
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GroupEvaluationLog {
    pub group_id: String,
    pub content_id: String,
    pub click_through_rate: f64,
    pub verdict: String, // "true" or "false"
}

impl SelectionLog {
    pub fn new(customer_id: Option<&str>, marketplace_id: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            log_type: "ad_selection".to_string(),
            marketplace_id: marketplace_id.to_string(),
            customer_id: customer_id.map(str::to_string),
            candidate_contents: 0,
            status: "no_fill".to_string(),
            winning_content_id: None,
            winning_ctr: 0.0,
            group_evaluations: Vec::new(),
        }
    }

    pub fn add_group_evaluation(
        &mut self,
        group_id: &str,
        content_id: &str,
        click_through_rate: f64,
        passed: bool,
    ) {
        self.group_evaluations.push(GroupEvaluationLog {
            group_id: group_id.to_string(),
            content_id: content_id.to_string(),
            click_through_rate,
            verdict: if passed { "true" } else { "false" }.to_string(),
        });
    }

    pub fn set_winner(&mut self, content_id: &str, ctr: f64) {
        self.status = "filled".to_string();
        self.winning_content_id = Some(content_id.to_string());
        self.winning_ctr = ctr;
    }
}
