use chrono::{DateTime, SecondsFormat, Utc};

/// Canonical timestamp encoding: RFC3339, millisecond precision, `Z`
/// suffix. Fixed width keeps SQL string comparison chronological.
pub(super) fn ts_to_str(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(super) fn str_to_ts(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| decode_error(format!("bad timestamp {raw:?}: {e}")))
}

pub(super) fn opt_str_to_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    raw.as_deref().map(str_to_ts).transpose()
}

/// Current time, already truncated to the stored precision so values
/// round-trip exactly through the database.
pub fn now_utc() -> DateTime<Utc> {
    let now = ts_to_str(Utc::now());
    DateTime::parse_from_rfc3339(&now)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(super) fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

/// JSON-array codec for the feedback list columns.
pub(super) fn list_to_json(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".into())
}

pub(super) fn json_to_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(str_to_ts(&ts_to_str(ts)).unwrap(), ts);
    }

    #[test]
    fn encoded_timestamps_sort_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(ts_to_str(earlier) < ts_to_str(later));
    }

    #[test]
    fn bad_timestamp_is_a_decode_error() {
        assert!(str_to_ts("yesterday").is_err());
    }

    #[test]
    fn list_codec_round_trips() {
        let list = vec!["a".to_string(), "b".to_string()];
        assert_eq!(json_to_list(&list_to_json(&list)), list);
        assert!(json_to_list("garbage").is_empty());
    }
}
