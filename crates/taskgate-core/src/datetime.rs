use anyhow::{Context, anyhow};
use chrono::{DateTime, Days, Local, NaiveDate, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a schedule date typed by the user.
///
/// Accepts `YYYY-MM-DD` and the relative words `today`, `tomorrow` and
/// `yesterday`, resolved against the local calendar day of `now`.
pub fn parse_date_expr(input: &str, now: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    let today = now.with_timezone(&Local).date_naive();

    match token.to_ascii_lowercase().as_str() {
        "today" => return Ok(today),
        "tomorrow" => {
            return today
                .checked_add_days(Days::new(1))
                .ok_or_else(|| anyhow!("date out of range: {token}"));
        }
        "yesterday" => {
            return today
                .checked_sub_days(Days::new(1))
                .ok_or_else(|| anyhow!("date out of range: {token}"));
        }
        _ => {}
    }

    NaiveDate::parse_from_str(token, DATE_FORMAT)
        .with_context(|| format!("invalid date '{token}', expected YYYY-MM-DD"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Serde adapter for instants stored as `2024-01-01T09:30:00.000Z`.
///
/// Writes millisecond precision with a `Z` suffix; reads any RFC 3339 instant.
pub mod iso_instant {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
