// src/api/handlers.rs

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::model::advertisement::GeneratedAdvertisement;
use crate::AppState;

#[derive(Deserialize, Debug)]
pub struct AdRequest {
    pub customer_id: Option<String>,
    pub marketplace_id: String,
}

#[derive(Serialize, Debug)]
pub struct AdResponse {
    pub request_id: Uuid,
    pub advertisement: GeneratedAdvertisement,
}

/// **处理广告请求**
///
/// Returns 200 with the rendered advertisement, or 204 with the empty
/// discriminant when nothing qualified for the request.
pub async fn handle_ad_request(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdRequest>,
) -> (StatusCode, Json<AdResponse>) {
    let request_id = Uuid::new_v4();
    let advertisement = state
        .selection
        .select_advertisement(request.customer_id.as_deref(), &request.marketplace_id)
        .await;

    match &advertisement {
        GeneratedAdvertisement::Ad { content, .. } => {
            state
                .runtime_logger
                .log(
                    "INFO",
                    &format!(
                        r#"{{ "request_id": "{}", "marketplace_id": "{}", "result": "filled", "content_id": "{}" }}"#,
                        request_id, request.marketplace_id, content.content_id
                    ),
                )
                .await;
            (
                StatusCode::OK,
                Json(AdResponse {
                    request_id,
                    advertisement,
                }),
            )
        }
        GeneratedAdvertisement::Empty => {
            state
                .runtime_logger
                .log(
                    "WARN",
                    &format!(
                        r#"{{ "request_id": "{}", "marketplace_id": "{}", "result": "no_fill" }}"#,
                        request_id, request.marketplace_id
                    ),
                )
                .await;
            (
                StatusCode::NO_CONTENT,
                Json(AdResponse {
                    request_id,
                    advertisement,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ad_request_accepts_anonymous_customers() {
        let request: AdRequest =
            serde_json::from_str(r#"{ "marketplace_id": "1" }"#).unwrap();
        assert_eq!(request.marketplace_id, "1");
        assert!(request.customer_id.is_none());
    }

    #[test]
    fn ad_response_tags_the_empty_variant() {
        let response = AdResponse {
            request_id: Uuid::new_v4(),
            advertisement: GeneratedAdvertisement::Empty,
        };
        let body = serde_json::to_string(&response).unwrap();
        assert!(body.contains(r#""kind":"empty""#));
    }
}
