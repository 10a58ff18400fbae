use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::models::account::Account;
use crate::utils::error::{AppError, AppResult};

/// Which login a bearer token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Customer,
    Admin,
}

impl Audience {
    pub fn session_key(&self, token: &str) -> String {
        match self {
            Audience::Customer => format!("session:customer:{}", token),
            Audience::Admin => format!("session:admin:{}", token),
        }
    }
}

/// Sessions are issued elsewhere; this side only resolves them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_account(&self, audience: Audience, token: &str) -> AppResult<Option<Account>>;
}

#[derive(Clone)]
pub struct RedisSessionStore {
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn find_account(&self, audience: Audience, token: &str) -> AppResult<Option<Account>> {
        let mut conn = self.conn_manager.clone();
        let raw: Option<String> = conn.get(audience.session_key(token)).await?;

        raw.map(|value| {
            serde_json::from_str::<Account>(&value).map_err(|e| {
                AppError::InternalServerError(format!("malformed session payload: {}", e))
            })
        })
        .transpose()
    }
}
