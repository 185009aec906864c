mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::upload_handler,
        api::search_handler,
        api::features_handler,
        api::feedback_handler,
    ),
    components(schemas(
        types::UploadForm,
        types::SearchForm,
        types::FeaturesForm,
        types::FeedbackRequest,
        types::UploadResponse,
        types::SearchResponse,
        types::SimilarityEntry,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upload", axum::routing::post(api::upload_handler))
        .route("/search", axum::routing::post(api::search_handler))
        .route("/features", axum::routing::post(api::features_handler))
        .route("/feedback", axum::routing::post(api::feedback_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：10M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        .with_state(state)
}
