use std::{borrow::Cow, collections::HashMap};

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::otp::{OtpError, VerifyOutcome};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("malformed input in the request body")]
    AxumJsonRejection(#[from] JsonRejection),

    #[error("request body does not meet requirments")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Failed to send OTP")]
    OtpDelivery(#[from] OtpError),

    #[error("{}", .0.message())]
    OtpRejected(VerifyOutcome),

    #[error("Failed to verify OTP")]
    OtpVerification(#[source] OtpError),

    #[error("an internal server error occurred")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct InputErrorResponse {
    errors: HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>,
}

/// Envelope returned by the OTP endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct OtpResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OtpResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::ValidationError(e) => {
                let mut error_map: HashMap<Cow<'static, str>, Vec<Cow<'static, str>>> =
                    HashMap::new();

                for (field, error) in e.field_errors() {
                    if let Some(validation_error) = error.first() {
                        error_map
                            .entry(field.into())
                            .or_insert_with(Vec::new)
                            .push(validation_error.code.clone());
                    }
                }

                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(InputErrorResponse { errors: error_map }),
                )
                    .into_response();
            }

            Self::OtpDelivery(ref e) => {
                tracing::error!("OTP delivery failed: {:?}", e);

                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(OtpResponse::failed(self.to_string())),
                )
                    .into_response();
            }

            Self::OtpVerification(ref e) => {
                tracing::error!("OTP verification failed: {:?}", e);

                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(OtpResponse::failed(self.to_string())),
                )
                    .into_response();
            }

            Self::OtpRejected(outcome) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(OtpResponse::failed(outcome.message())),
                )
                    .into_response();
            }

            Self::Anyhow(ref e) => {
                tracing::error!("Internal server error: {:?}", e)
            }

            _ => (),
        }

        (self.status_code(), self.to_string()).into_response()
    }
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AxumJsonRejection(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OtpDelivery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::OtpRejected(_) => StatusCode::BAD_REQUEST,
            Self::OtpVerification(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
