use chrono::{DateTime, Datelike, FixedOffset, Utc};

use crate::store::{EntitlementStore, SalesRuleStore};
use crate::utils::error::{AppError, AppResult};

/// Per-event purchase gate: sale window first, then sale days.
#[derive(Debug, Clone, Copy)]
pub struct SalesRules {
    /// Business timezone the sale days are expressed in.
    utc_offset: FixedOffset,
}

impl SalesRules {
    pub fn new(utc_offset: FixedOffset) -> Self {
        Self { utc_offset }
    }

    pub async fn check<S>(&self, store: &mut S, event_id: &str, now: DateTime<Utc>) -> AppResult<()>
    where
        S: SalesRuleStore + ?Sized,
    {
        self.check_range_date(store, event_id, now).await?;
        self.check_day(store, event_id, now).await
    }

    pub async fn check_range_date<S>(
        &self,
        store: &mut S,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()>
    where
        S: SalesRuleStore + ?Sized,
    {
        let rule = store.find_rule_range_date(event_id).await?;

        if now < rule.start_date {
            return Err(AppError::Forbidden(
                "ticket sales are not yet open".to_string(),
            ));
        }
        if now > rule.end_date {
            return Err(AppError::Forbidden(
                "ticket sales are already closed".to_string(),
            ));
        }

        Ok(())
    }

    /// An event with no configured days never matches.
    pub async fn check_day<S>(&self, store: &mut S, event_id: &str, now: DateTime<Utc>) -> AppResult<()>
    where
        S: SalesRuleStore + ?Sized,
    {
        let days = store.find_rule_days(event_id).await?;
        let today = now.with_timezone(&self.utc_offset).weekday().number_from_monday() as i32;

        if !days.iter().any(|rule| rule.day == today) {
            return Err(AppError::Forbidden(
                "ticket sales are temporary closed for today".to_string(),
            ));
        }

        Ok(())
    }
}

/// One ticket per customer per event. Advisory only: the count is not locked.
pub async fn check_entitlement<S>(store: &mut S, event_id: &str, customer_id: i64) -> AppResult<()>
where
    S: EntitlementStore + ?Sized,
{
    let acquired = store.count_acquired_tickets(event_id, customer_id).await?;
    if acquired >= 1 {
        return Err(AppError::Forbidden(
            "you are already acquired a ticket for this event".to_string(),
        ));
    }

    Ok(())
}
