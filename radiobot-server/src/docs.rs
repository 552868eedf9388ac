use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;
use utoipauto::utoipauto;

#[utoipauto(paths = "./radiobot-server/src")]
#[derive(OpenApi)]
#[openapi(info(
    description = "radiobot-server exposes endpoints to manage the radios of this radiobot instance"
))]
pub struct ApiDoc;

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
