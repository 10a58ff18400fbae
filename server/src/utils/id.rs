use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Builds a prefixed, timestamp-derived identifier such as
/// `TO20240101093000123A1B2C3D4`.
///
/// The trailing eight characters come from a v4 uuid so ids minted within the
/// same millisecond by concurrent requests stay distinct.
pub fn timestamp_with_prefix(prefix: &str, now: DateTime<Utc>) -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}{}",
        prefix,
        now.format("%Y%m%d%H%M%S%3f"),
        entropy[..8].to_uppercase()
    )
}
