// src/model/advertisement.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Renderable advertisement content, owned by the external content store
/// and referenced unchanged by the selection result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementContent {
    pub content_id: String,
    /// 广告创意（HTML 片段或模板标识），选择逻辑不解析它
    pub renderable_content: String,
}

impl AdvertisementContent {
    pub fn new(content_id: &str, renderable_content: &str) -> Self {
        Self {
            content_id: content_id.to_string(),
            renderable_content: renderable_content.to_string(),
        }
    }
}

/// The externally visible selection result. `Empty` is the "no ad to
/// show" sentinel; callers discriminate by matching (or `is_empty`),
/// never through a null reference or an error.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratedAdvertisement {
    Empty,
    Ad {
        /// Fresh render id for this impression.
        id: Uuid,
        content: AdvertisementContent,
    },
}

impl GeneratedAdvertisement {
    pub fn of(content: AdvertisementContent) -> Self {
        GeneratedAdvertisement::Ad {
            id: Uuid::new_v4(),
            content,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, GeneratedAdvertisement::Empty)
    }

    pub fn content(&self) -> Option<&AdvertisementContent> {
        match self {
            GeneratedAdvertisement::Empty => None,
            GeneratedAdvertisement::Ad { content, .. } => Some(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_advertisement_has_no_content() {
        let ad = GeneratedAdvertisement::Empty;
        assert!(ad.is_empty());
        assert!(ad.content().is_none());
    }

    #[test]
    fn generated_advertisement_exposes_its_content() {
        let content = AdvertisementContent::new("c1", "<div>ad</div>");
        let ad = GeneratedAdvertisement::of(content.clone());
        assert!(!ad.is_empty());
        assert_eq!(ad.content(), Some(&content));
    }
}
