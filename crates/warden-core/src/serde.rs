// Module name shadows the `serde` crate, so the external crate is `::serde` here.
use ::serde::Serializer;
use chrono::{DateTime, SecondsFormat, Utc};

/// Serialize `DateTime<Utc>` as RFC 3339 with millisecond precision and a `Z` suffix.
pub fn to_rfc3339_ms<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&format_rfc3339_ms(dt))
}

/// Optional variant of [`to_rfc3339_ms`]; `None` serializes as `null`.
pub fn to_rfc3339_ms_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&format_rfc3339_ms(dt)),
        None => s.serialize_none(),
    }
}

fn format_rfc3339_ms(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
