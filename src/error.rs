//! Error taxonomy matching the fixed code/message/status table. Every
//! fallible handler returns `AppResult<T>` and lets `?` produce the right
//! JSON body without a reply helper at each call site.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Generic Error")]
    Generic,
    #[error("DB Error")]
    Db,
    #[error("Not Found")]
    NotFound,
    #[error("Passed input is not correct or malformed")]
    InputNotValid,
    #[error("Could not contact OpenFaaS backend")]
    BackendUnreachable,
    #[error("Passed service is not valid")]
    ServiceNotValid,
    #[error("Error while deploying the service")]
    DeployError,
    #[error("OpenFaas generic error, see logs")]
    BackendGenericError,
    #[error("Job cannot be scheduled: {0}")]
    JobCannotBeScheduled(String),
    #[error("A key is duplicated")]
    DuplicateKey,
}

impl AppError {
    pub fn code(&self) -> i32 {
        match self {
            AppError::Generic => 1,
            AppError::Db => 2,
            AppError::NotFound => 3,
            AppError::InputNotValid => 4,
            AppError::BackendUnreachable => 5,
            AppError::ServiceNotValid => 100,
            AppError::DeployError => 200,
            AppError::BackendGenericError => 300,
            AppError::JobCannotBeScheduled(_) => 400,
            AppError::DuplicateKey => 11000,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Generic => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Db => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InputNotValid => StatusCode::BAD_REQUEST,
            AppError::BackendUnreachable => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceNotValid => StatusCode::BAD_REQUEST,
            AppError::DeployError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BackendGenericError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::JobCannotBeScheduled(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DuplicateKey => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplyError {
    pub code: i32,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(code = self.code(), error = %self, "request failed");
        let body = ReplyError {
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
