//! Auth Middleware
//!
//! Bearer access-token check for protected routes.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::repository::AuthStore;
use crate::domain::value_object::{RoleId, UserId};
use crate::error::AuthError;
use crate::presentation::handlers::AuthAppState;

/// Identity taken from a valid access token, inserted as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Option<String>,
    pub role_id: Option<RoleId>,
}

/// Middleware that requires a valid access token
pub async fn require_access_token<R>(
    State(state): State<AuthAppState<R>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
{
    let token = bearer_token(req.headers()).ok_or(AuthError::Unauthorized)?;
    let claims = state.codec.validate_access_token(token)?;
    let user_id = claims.user_id().ok_or(AuthError::Unauthorized)?;

    req.extensions_mut().insert(AuthenticatedUser {
        user_id,
        email: claims.email,
        role_id: claims.role_id.map(RoleId::new),
    });

    Ok(next.run(req).await)
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
