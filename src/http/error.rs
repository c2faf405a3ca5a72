use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app::auth::AccountError;
use crate::app::follows::FollowError;
use crate::app::jobs::JobError;
use crate::app::posts::PostError;

const SERVER_ERROR: &str = "server error";

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    msg: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Logs a store failure inside the request span and hides it from the client.
    fn store(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "store operation failed");
        Self::internal(SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse { msg: self.message });
        (self.status, body).into_response()
    }
}

impl From<FollowError> for AppError {
    fn from(err: FollowError) -> Self {
        match err {
            FollowError::SelfFollow | FollowError::AlreadyRequested => {
                Self::bad_request(err.to_string())
            }
            FollowError::RequestNotFound | FollowError::UserNotFound => {
                Self::not_found(err.to_string())
            }
            FollowError::Store(err) => Self::store(err),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound => Self::not_found(err.to_string()),
            AccountError::Store(err) => Self::store(err),
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::EmptyContent | PostError::NotLiked => Self::bad_request(err.to_string()),
            PostError::NotFound | PostError::UserNotFound => Self::not_found(err.to_string()),
            PostError::NotAuthor => Self::forbidden(err.to_string()),
            PostError::Store(err) => Self::store(err),
        }
    }
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::MissingField(_) | JobError::AlreadyApplied => {
                Self::bad_request(err.to_string())
            }
            JobError::NotHiring | JobError::NotJobSeeker | JobError::NotPoster => {
                Self::forbidden(err.to_string())
            }
            JobError::NotFound => Self::not_found(err.to_string()),
            JobError::Store(err) => Self::store(err),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(_) => Self::bad_request("invalid id"),
            other => Self {
                status: other.status(),
                message: other.body_text(),
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_)
            | JsonRejection::JsonSyntaxError(_)
            | JsonRejection::MissingJsonContentType(_) => Self::bad_request("invalid request body"),
            // Oversized bodies keep their 413.
            other => Self {
                status: other.status(),
                message: other.body_text(),
            },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(
            AppError::from(FollowError::SelfFollow).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(FollowError::RequestNotFound).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(JobError::NotPoster).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(AccountError::EmailTaken).status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn store_failures_do_not_leak_details() {
        let err = AppError::from(PostError::Store(anyhow::anyhow!("connection refused")));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, SERVER_ERROR);
    }
}
