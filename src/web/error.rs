//! JSON rendering of workflow errors.
//!
//! Every failure leaves as `{"error": "..."}` with a status code matching the
//! error kind. Database errors are logged and replaced with a generic message.

use crate::error::Error;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::InvalidState(_)
            | Error::AlreadyResolved
            | Error::DuplicatePending
            | Error::SelfAction => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Error::Database(e) => {
                log::error!("Database error while handling request: {}", e);
                "Internal server error".to_string()
            }
            other => {
                log::debug!("Request refused ({}): {}", other.kind(), other);
                other.to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(ErrorBody { error: message })
    }
}

/// Turns extractor failures (malformed JSON, bad path segments) into the same shape.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    Error::Validation(err.to_string()).into()
}

pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    Error::Validation(err.to_string()).into()
}
