use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use pushgate_services::auth::Claims;
use pushgate_services::store::SubjectRef;

use crate::{error::ApiError, state::AppState};

/// Authenticated caller, from a host-minted JWT (Authorization header or
/// `access_token` cookie).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: SubjectRef,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // Try Authorization header first
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|s| s.to_string())
            // Then try cookie
            .or_else(|| {
                parts
                    .headers
                    .get(header::COOKIE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|cookies| {
                        cookies.split(';').find_map(|cookie| {
                            let cookie = cookie.trim();
                            cookie
                                .strip_prefix("access_token=")
                                .map(|s| s.to_string())
                        })
                    })
            })
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let claims = app_state.auth.verify_token(&token)?;

        Ok(AuthUser {
            subject: claims.subject(),
            claims,
        })
    }
}
