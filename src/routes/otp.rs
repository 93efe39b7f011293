use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};
use validator::Validate;

use crate::{
    app::{
        error::{AppError, OtpResponse},
        extrator::ValidatedJson,
        otp::VerifyOutcome,
        ApiContext,
    },
    routes::docs::OTP_TAG,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendOtpInput {
    #[validate(email)]
    email: String,
}

/// Neither field is format-checked: an unknown address is simply not found,
/// and a malformed code counts as a wrong guess.
#[derive(Deserialize, Validate, ToSchema)]
pub struct VerifyOtpInput {
    email: String,
    otp: String,
}

pub fn router() -> Router<ApiContext> {
    Router::new()
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
}

#[derive(OpenApi)]
#[openapi(paths(send_otp, verify_otp), components(schemas(OtpResponse)))]
pub struct OtpApi;

#[utoipa::path(
    post,
    path = "/send-otp",
    tag = OTP_TAG,
    request_body = SendOtpInput,
    responses(
        (status = 200, description = "Code sent", body = OtpResponse),
        (status = 400, description = "Bad request"),
        (status = 422, description = "Invalid input"),
        (status = 500, description = "Email could not be delivered", body = OtpResponse)
    )
)]
#[tracing::instrument(name = "Send OTP", skip_all, fields(email = %req.email))]
pub async fn send_otp(
    ctx: State<ApiContext>,
    ValidatedJson(req): ValidatedJson<SendOtpInput>,
) -> Result<Json<OtpResponse>, AppError> {
    ctx.otp_manager.issue(&req.email).await?;

    Ok(Json(OtpResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/verify-otp",
    tag = OTP_TAG,
    request_body = VerifyOtpInput,
    responses(
        (status = 200, description = "Code accepted", body = OtpResponse),
        (status = 400, description = "Code not found, expired, locked out or wrong", body = OtpResponse),
        (status = 500, description = "Code store unavailable", body = OtpResponse)
    )
)]
#[tracing::instrument(name = "Verify OTP", skip_all, fields(email = %req.email))]
pub async fn verify_otp(
    ctx: State<ApiContext>,
    ValidatedJson(req): ValidatedJson<VerifyOtpInput>,
) -> Result<Json<OtpResponse>, AppError> {
    let outcome = ctx
        .otp_manager
        .verify(&req.email, &req.otp)
        .await
        .map_err(AppError::OtpVerification)?;

    match outcome {
        VerifyOutcome::Verified => Ok(Json(OtpResponse::ok())),
        rejected => {
            tracing::info!(outcome = ?rejected, "OTP rejected");
            Err(AppError::OtpRejected(rejected))
        }
    }
}
