use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::utils::error::{AppError, AppResult};

pub const TOPIC_ORDER_PAID: &str = "order-paid";

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// At-least-once; ordering is only kept per key.
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        headers: &[(String, String)],
        payload: &[u8],
    ) -> AppResult<()>;
}

/// Appends each message to the Redis stream named after its topic.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    conn_manager: ConnectionManager,
}

impl RedisStreamPublisher {
    pub fn new(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }
}

/// `XADD <topic> * key <key> payload <payload> [header:<name> <value>]...`
fn stream_entry(
    topic: &str,
    key: &str,
    headers: &[(String, String)],
    payload: &[u8],
) -> redis::Cmd {
    let mut cmd = redis::cmd("XADD");
    cmd.arg(topic)
        .arg("*")
        .arg("key")
        .arg(key)
        .arg("payload")
        .arg(payload);
    for (name, value) in headers {
        cmd.arg(format!("header:{}", name)).arg(value);
    }
    cmd
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        headers: &[(String, String)],
        payload: &[u8],
    ) -> AppResult<()> {
        let mut conn = self.conn_manager.clone();
        let entry_id: String = stream_entry(topic, key, headers, payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("failed to publish to '{}': {}", topic, e))
            })?;

        tracing::info!(topic = %topic, key = %key, entry_id = %entry_id, "Event published");
        Ok(())
    }
}
