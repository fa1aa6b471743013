use crate::{
    error::ApiError,
    handlers::parse_user_id,
    models::{RecommendationQuery, RecommendationRequest},
    services::RecommendationService,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};
use tracing::info;

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/recommend").route(web::post().to(recommend)));
}

/// Ranked books for a free-text prompt.
///
/// Only malformed requests fail. Provider problems show up as fewer (or no)
/// books in a 200 response.
pub async fn recommend(
    request: Json<RecommendationRequest>,
    recommendation_service: web::Data<RecommendationService>,
) -> Result<HttpResponse, ApiError> {
    let query = RecommendationQuery::try_from(request.into_inner()).map_err(ApiError::InvalidInput)?;
    if let Some(user_id) = query.user_id.as_deref() {
        parse_user_id(user_id)?;
    }

    let response = recommendation_service.recommend(&query).await;
    info!(
        "Returning {} {} recommendations",
        response.books.len(),
        query.mode
    );

    Ok(HttpResponse::Ok().json(response))
}
