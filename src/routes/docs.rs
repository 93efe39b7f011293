use crate::app::ApiContext;
use crate::routes::otp::OtpApi;
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

pub const OTP_TAG: &str = "otp";

pub fn router() -> Router<ApiContext> {
    Router::new().route("/api-docs/openapi.json", get(openapi))
}

#[derive(OpenApi)]
#[openapi(
    nest(
        (
            path = "/api", api = OtpApi
        )
    ),
    tags(
        (name = OTP_TAG, description = "Password reset codes delivered by email")
    )
)]
struct Api;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(Api::openapi())
}
