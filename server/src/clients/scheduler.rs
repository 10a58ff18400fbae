use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::utils::error::{AppError, AppResult};

/// Sorted set holding every pending task, scored by due time in epoch millis.
pub const SCHEDULED_TASKS_KEY: &str = "scheduled-tasks";

const DELIVERY_BATCH: usize = 100;
const MAX_ATTEMPTS: u32 = 5;
const RETRY_DELAY_SECS: i64 = 30;

/// An HTTP request to be issued later.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpTask {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Fire-and-forget: delivery happens out of band at `when`.
    async fn schedule_at(&self, queue: &str, task: HttpTask, when: DateTime<Utc>)
        -> AppResult<()>;
}

/// A task as it is persisted until delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: String,
    pub queue: String,
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    #[serde(default)]
    pub attempts: u32,
}

impl ScheduledTask {
    fn new(queue: &str, task: HttpTask) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            queue: queue.to_string(),
            url: task.url,
            method: task.method.as_str().to_string(),
            headers: task.headers,
            body: task.body,
            attempts: 0,
        }
    }
}

/// Durable home of pending tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn push(&self, task: &ScheduledTask, when: DateTime<Utc>) -> AppResult<()>;
    /// Up to `limit` tasks due at or before `now`, oldest first.
    async fn due(&self, now: DateTime<Utc>, limit: usize) -> AppResult<Vec<ScheduledTask>>;
    /// Removes the task. Returns `false` when another worker already took it.
    async fn claim(&self, task: &ScheduledTask) -> AppResult<bool>;
}

/// Keeps tasks in the [`SCHEDULED_TASKS_KEY`] sorted set.
#[derive(Clone)]
pub struct RedisTaskStore {
    conn_manager: ConnectionManager,
}

impl RedisTaskStore {
    pub fn new(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }
}

fn encode(task: &ScheduledTask) -> AppResult<String> {
    serde_json::to_string(task).map_err(|e| {
        AppError::InternalServerError(format!("failed to encode task '{}': {}", task.id, e))
    })
}

/// `ZADD scheduled-tasks <when millis> <task json>`
fn push_command(member: &str, when: DateTime<Utc>) -> redis::Cmd {
    let mut cmd = redis::cmd("ZADD");
    cmd.arg(SCHEDULED_TASKS_KEY)
        .arg(when.timestamp_millis())
        .arg(member);
    cmd
}

/// `ZRANGEBYSCORE scheduled-tasks -inf <now millis> LIMIT 0 <limit>`
fn due_command(now: DateTime<Utc>, limit: usize) -> redis::Cmd {
    let mut cmd = redis::cmd("ZRANGEBYSCORE");
    cmd.arg(SCHEDULED_TASKS_KEY)
        .arg("-inf")
        .arg(now.timestamp_millis())
        .arg("LIMIT")
        .arg(0)
        .arg(limit);
    cmd
}

fn claim_command(member: &str) -> redis::Cmd {
    let mut cmd = redis::cmd("ZREM");
    cmd.arg(SCHEDULED_TASKS_KEY).arg(member);
    cmd
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn push(&self, task: &ScheduledTask, when: DateTime<Utc>) -> AppResult<()> {
        let mut conn = self.conn_manager.clone();
        let _: i64 = push_command(&encode(task)?, when)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("failed to persist task '{}': {}", task.id, e))
            })?;
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: usize) -> AppResult<Vec<ScheduledTask>> {
        let mut conn = self.conn_manager.clone();
        let members: Vec<String> = due_command(now, limit).query_async(&mut conn).await?;

        let mut tasks = Vec::with_capacity(members.len());
        for member in members {
            match serde_json::from_str(&member) {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    tracing::error!(error = %e, "Dropping undecodable scheduled task");
                    let _: i64 = claim_command(&member).query_async(&mut conn).await?;
                }
            }
        }
        Ok(tasks)
    }

    async fn claim(&self, task: &ScheduledTask) -> AppResult<bool> {
        let mut conn = self.conn_manager.clone();
        let removed: i64 = claim_command(&encode(task)?).query_async(&mut conn).await?;
        Ok(removed > 0)
    }
}

/// Persists each task in a [`TaskStore`] and calls it back with reqwest once
/// due. Tasks outlive the process; a task is removed from the store before
/// its callback is sent, and failed callbacks are put back with a delay.
#[derive(Clone)]
pub struct DurableHttpScheduler {
    store: Arc<dyn TaskStore>,
    http_client: Client,
}

impl DurableHttpScheduler {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            http_client: Client::new(),
        }
    }

    /// Polls the store every `poll_interval` until the handle is aborted.
    pub fn spawn_worker(self, poll_interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.deliver_due(Utc::now()).await {
                    tracing::error!(error = %e, "Deferred task poll failed");
                }
            }
        })
    }

    /// Sends every task due at `now` that this worker manages to claim.
    /// Returns how many were delivered.
    pub async fn deliver_due(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let mut delivered = 0;
        for task in self.store.due(now, DELIVERY_BATCH).await? {
            if !self.store.claim(&task).await? {
                continue;
            }

            if self.deliver(&task).await {
                delivered += 1;
            } else {
                self.retry(task, now).await?;
            }
        }
        Ok(delivered)
    }

    async fn retry(&self, mut task: ScheduledTask, now: DateTime<Utc>) -> AppResult<()> {
        task.attempts += 1;
        if task.attempts >= MAX_ATTEMPTS {
            tracing::error!(
                queue = %task.queue,
                url = %task.url,
                attempts = task.attempts,
                "Deferred task abandoned"
            );
            return Ok(());
        }

        let when = now + chrono::Duration::seconds(RETRY_DELAY_SECS * i64::from(task.attempts));
        self.store.push(&task, when).await
    }

    async fn deliver(&self, task: &ScheduledTask) -> bool {
        let method = match Method::from_bytes(task.method.as_bytes()) {
            Ok(method) => method,
            Err(e) => {
                tracing::error!(queue = %task.queue, method = %task.method, error = %e, "Invalid task method");
                return false;
            }
        };

        let mut request = self.http_client.request(method, &task.url);
        for (name, value) in &task.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        match request.body(task.body.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(queue = %task.queue, url = %task.url, "Deferred task delivered");
                true
            }
            Ok(response) => {
                tracing::warn!(
                    queue = %task.queue,
                    url = %task.url,
                    status = %response.status(),
                    "Deferred task rejected by target"
                );
                false
            }
            Err(e) => {
                tracing::warn!(queue = %task.queue, url = %task.url, error = %e, "Deferred task failed");
                false
            }
        }
    }
}

#[async_trait]
impl TaskScheduler for DurableHttpScheduler {
    async fn schedule_at(
        &self,
        queue: &str,
        task: HttpTask,
        when: DateTime<Utc>,
    ) -> AppResult<()> {
        let task = ScheduledTask::new(queue, task);
        self.store.push(&task, when).await?;

        tracing::debug!(queue = %queue, url = %task.url, when = %when, "Deferred task scheduled");
        Ok(())
    }
}
