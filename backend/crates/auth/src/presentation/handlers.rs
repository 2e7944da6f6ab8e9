//! HTTP Handlers

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::net::SocketAddr;
use std::sync::Arc;

use platform::client::ClientContext;

use crate::application::{
    AuthConfig, LoginInput, LoginUseCase, RefreshTokenUseCase, RevokeTokenUseCase, TokenCodec,
};
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AuthResponse, LoginRequest, RefreshRequest, RevokeAllResponse, SessionResponse,
    SessionsResponse,
};
use crate::presentation::middleware::AuthenticatedUser;

/// Shared state for auth handlers
pub struct AuthAppState<R>
where
    R: AuthStore,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub codec: Arc<TokenCodec>,
}

impl<R> AuthAppState<R>
where
    R: AuthStore,
{
    pub fn new(repo: R, config: AuthConfig) -> Self {
        let codec = TokenCodec::from_config(&config);
        Self {
            repo: Arc::new(repo),
            config: Arc::new(config),
            codec: Arc::new(codec),
        }
    }
}

// Manual impl: `R` itself need not be `Clone`
impl<R> Clone for AuthAppState<R>
where
    R: AuthStore,
{
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            config: Arc::clone(&self.config),
            codec: Arc::clone(&self.codec),
        }
    }
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/v1/auth/login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<AuthResponse>>
where
    R: AuthStore,
{
    if req.email.trim().is_empty() {
        return Err(AuthError::MissingField("email".to_string()));
    }
    if req.password.is_empty() {
        return Err(AuthError::MissingField("password".to_string()));
    }

    let client = ClientContext::from_headers(&headers, Some(addr.ip()));

    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.codec.clone(),
        state.config.clone(),
    );

    let input = LoginInput {
        email: req.email,
        password: req.password,
    };

    let tokens = use_case.execute(input, &client).await?;

    Ok(Json(AuthResponse::from(tokens)))
}

// ============================================================================
// Refresh
// ============================================================================

/// POST /api/v1/auth/refresh
pub async fn refresh<R>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<RefreshRequest>,
) -> AuthResult<Json<AuthResponse>>
where
    R: AuthStore,
{
    let token = required_token(&req)?;
    let client = ClientContext::from_headers(&headers, Some(addr.ip()));

    let use_case =
        RefreshTokenUseCase::new(state.repo.clone(), state.repo.clone(), state.codec.clone());

    let tokens = use_case.execute(token, &client).await?;

    Ok(Json(AuthResponse::from(tokens)))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /api/v1/auth/logout
pub async fn logout<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<RefreshRequest>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
{
    let token = required_token(&req)?;

    RevokeTokenUseCase::new(state.repo.clone())
        .revoke(token)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
pub async fn logout_all<R>(
    State(state): State<AuthAppState<R>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AuthResult<Json<RevokeAllResponse>>
where
    R: AuthStore,
{
    let revoked = RevokeTokenUseCase::new(state.repo.clone())
        .revoke_all(&user.user_id)
        .await?;

    Ok(Json(RevokeAllResponse { revoked }))
}

// ============================================================================
// Sessions
// ============================================================================

/// GET /api/v1/auth/sessions
pub async fn sessions<R>(
    State(state): State<AuthAppState<R>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AuthResult<Json<SessionsResponse>>
where
    R: AuthStore,
{
    let use_case = RevokeTokenUseCase::new(state.repo.clone());

    let active_sessions = use_case.count_active(&user.user_id).await?;
    let sessions = use_case
        .list_active(&user.user_id)
        .await?
        .into_iter()
        .map(SessionResponse::from)
        .collect();

    Ok(Json(SessionsResponse {
        active_sessions,
        sessions,
    }))
}

fn required_token(req: &RefreshRequest) -> AuthResult<&str> {
    let token = req.refresh_token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingField("refreshToken".to_string()));
    }
    Ok(token)
}
