use axum::extract::{FromRequest, FromRequestParts};

use crate::http::AppError;

/// `axum::extract::Path` that rejects with a `{"msg"}` body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// `axum::Json` request body that rejects with a `{"msg"}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
