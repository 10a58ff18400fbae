use std::future::Future;
use std::time::Duration;

use crate::utils::error::{AppError, AppResult};

pub mod event;
pub mod order;
pub mod sales_rule;

pub use event::EventService;
pub use order::{OrderService, OrderSettings};
pub use sales_rule::SalesRules;

/// Bounds a workflow by `budget`. Dropping the workflow future on expiry drops
/// its unit of work, which rolls the transaction back.
pub(crate) async fn with_timeout<T, F>(budget: Duration, workflow: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(budget, workflow).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout),
    }
}
