use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::clients::session::Audience;
use crate::models::account::Account;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// Caller holding a customer app session.
#[derive(Debug, Clone)]
pub struct CustomerSession(pub Account);

/// Caller holding an admin app session.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Account);

fn bearer_token(parts: &Parts) -> AppResult<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::AuthError("missing bearer token".to_string()))
}

async fn resolve(parts: &Parts, state: &AppState, audience: Audience) -> AppResult<Account> {
    let token = bearer_token(parts)?;
    state
        .sessions
        .find_account(audience, &token)
        .await?
        .ok_or_else(|| AppError::AuthError("invalid session".to_string()))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CustomerSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        resolve(parts, state, Audience::Customer).await.map(Self)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        resolve(parts, state, Audience::Admin).await.map(Self)
    }
}
