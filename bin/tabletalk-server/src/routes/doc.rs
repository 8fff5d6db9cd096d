use axum::Json;
use utoipa::OpenApi;

use crate::routes::{chat, health, results};

#[derive(OpenApi)]
#[openapi(info(
    title = "tabletalk-server",
    description = "Query and chat relays over one warehouse table",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(results::ResultsApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root
}

/// `GET /api-docs/openapi.json`
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(get_docs())
}
