use serde::Deserialize;

use crate::dto::{invalid_field, validation_result};
use crate::utils::error::{AppError, AppResult};

/// Raw `?page=&size=` query. Kept as strings so bad input is reported with
/// the value the caller sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

fn positive(value: &Option<String>) -> Option<i64> {
    value
        .as_deref()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
}

impl TryFrom<PageParams> for PageRequest {
    type Error = AppError;

    fn try_from(params: PageParams) -> AppResult<Self> {
        let page = positive(&params.page);
        let size = positive(&params.size);

        let mut messages = Vec::new();
        if page.is_none() {
            messages.push(invalid_field("page", params.page.as_deref().unwrap_or_default()));
        }
        if size.is_none() {
            messages.push(invalid_field("size", params.size.as_deref().unwrap_or_default()));
        }
        validation_result(messages)?;

        let page = page.unwrap_or(1);
        let size = size.unwrap_or(1);
        // The row offset has to fit an i64 for the OFFSET clause.
        if (page - 1).checked_mul(size).is_none() {
            return Err(AppError::ValidationError(invalid_field("page", page)));
        }

        Ok(Self { page, size })
    }
}
