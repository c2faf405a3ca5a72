use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::http::AppError;
use crate::AppState;

/// Caller identified by a valid bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("no token, access denied"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("no token, access denied"))?;

        let service = AuthService::new(
            &state.repos,
            state.paseto_access_key,
            state.access_ttl_minutes,
        );
        let user_id = service
            .authenticate_access_token(token)
            .map_err(|err| {
                tracing::warn!(error = ?err, "malformed access token claims");
                AppError::unauthorized("token is not valid")
            })?
            .ok_or_else(|| AppError::unauthorized("token is not valid"))?;

        tracing::Span::current().record("user_id", tracing::field::display(user_id));
        Ok(AuthUser { user_id })
    }
}
