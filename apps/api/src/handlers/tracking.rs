use crate::{
    error::ApiError,
    handlers::parse_user_id,
    models::{TrackInteractionRequest, ViewportBatchRequest},
    services::TrackingService,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};

pub fn tracking_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/track-interaction").route(web::post().to(track_interaction)))
        .service(web::resource("/track-viewport-batch").route(web::post().to(track_viewport_batch)));
}

pub async fn track_interaction(
    request: Json<TrackInteractionRequest>,
    tracking_service: web::Data<TrackingService>,
) -> Result<HttpResponse, ApiError> {
    parse_user_id(&request.user_id)?;

    let interaction = tracking_service.track_interaction(request.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "interactionType": interaction.interaction_type,
        "signalStrength": interaction.signal_strength,
    })))
}

pub async fn track_viewport_batch(
    request: Json<ViewportBatchRequest>,
    tracking_service: web::Data<TrackingService>,
) -> Result<HttpResponse, ApiError> {
    parse_user_id(&request.user_id)?;

    let report = tracking_service
        .track_viewport_batch(request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": report.is_complete(),
        "processedCount": report.processed_count,
        "failedCount": report.failed_count,
        "totalCount": report.total_count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;
    use crate::services::testing::InMemoryStore;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;
    use std::sync::Arc;

    const USER: &str = "6a2f41a3-c54c-4fe6-a6f8-6e8bd2a1b7c1";

    fn store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new().with_profile(UserProfile {
            id: USER.to_string(),
            smart_mode_enabled: Some(true),
            preferred_discovery_mode: None,
        }))
    }

    async fn post(
        store: Arc<InMemoryStore>,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let tracking = web::Data::new(TrackingService::new(store.clone(), store));
        let app = test::init_service(App::new().app_data(tracking).configure(tracking_config)).await;
        let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body = test::read_body(resp).await;
        (
            status,
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
        )
    }

    fn book(isbn: &str) -> serde_json::Value {
        json!({ "isbn_13": isbn, "title": "Hearth", "genre": "Fantasy" })
    }

    #[actix_web::test]
    async fn test_track_interaction_reports_stored_signal() {
        let store = store();
        let (status, body) = post(
            store.clone(),
            "/track-interaction",
            json!({
                "userId": USER,
                "bookId": "9780000000001",
                "interactionType": "show_more_like",
                "bookData": book("9780000000001")
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["interactionType"], "liked");
        assert_eq!(body["signalStrength"], 0.8);
        assert_eq!(store.logged().len(), 1);
    }

    #[actix_web::test]
    async fn test_unknown_action_is_rejected() {
        let (status, _) = post(
            store(),
            "/track-interaction",
            json!({
                "userId": USER,
                "bookId": "9780000000001",
                "interactionType": "teleported",
                "bookData": book("9780000000001")
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_viewport_batch_statuses() {
        let event = json!({ "bookId": "1", "bookData": book("1"), "duration_ms": 1200 });

        let (status, body) = post(
            store(),
            "/track-viewport-batch",
            json!({ "userId": USER, "sessionId": "s", "currentMode": "smart", "events": [event.clone(), event.clone()] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processedCount"], 2);
        assert_eq!(body["totalCount"], 2);

        let (status, _) = post(
            store(),
            "/track-viewport-batch",
            json!({ "userId": USER, "sessionId": "s", "currentMode": "smart", "events": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post(
            store(),
            "/track-viewport-batch",
            json!({ "userId": USER, "sessionId": "s", "currentMode": "fresh", "events": [event.clone()] }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = post(
            Arc::new(InMemoryStore::new()),
            "/track-viewport-batch",
            json!({ "userId": USER, "sessionId": "s", "currentMode": "smart", "events": [event] }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
