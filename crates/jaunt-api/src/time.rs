use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const SQLITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite's `datetime('now')` writes "YYYY-MM-DD HH:MM:SS" without a
/// timezone; values that went through chrono may be RFC 3339. Accept both,
/// always as UTC.
pub(crate) fn parse_db_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Ok(ts);
    }
    let naive = NaiveDateTime::parse_from_str(raw, SQLITE_FORMAT)?;
    Ok(naive.and_utc())
}

/// Normalize to the storage form so lexical order stays chronological next
/// to `datetime('now')` defaults.
pub(crate) fn to_db_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(SQLITE_FORMAT).to_string()
}

pub(crate) fn parse_db_date(raw: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
}
