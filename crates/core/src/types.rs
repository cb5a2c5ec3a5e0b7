/// Document ids are opaque strings generated by the store.
pub type DocId = String;

/// User ids come from the identity provider (`sub` claim).
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Fixed-width RFC 3339 serialization for [`Timestamp`].
///
/// Documents are ordered by comparing their JSON values, so every stored
/// timestamp uses exactly six fractional digits and a `Z` suffix. That keeps
/// lexical order identical to chronological order.
pub mod timestamp_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

    /// Render a timestamp in the stored representation.
    pub fn format(ts: &Timestamp) -> String {
        ts.format(FORMAT).to_string()
    }

    /// Parse any RFC 3339 string back into UTC.
    pub fn parse(value: &str) -> Option<Timestamp> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    /// Same format for `Option<Timestamp>` fields (`null` when absent).
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::super::Timestamp;

        pub fn serialize<S: Serializer>(
            ts: &Option<Timestamp>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_str(&super::format(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Timestamp>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn format_is_fixed_width() {
        let whole = chrono::Utc.with_ymd_and_hms(2026, 2, 13, 10, 0, 0).unwrap();
        assert_eq!(timestamp_format::format(&whole), "2026-02-13T10:00:00.000000Z");
    }

    #[test]
    fn lexical_order_matches_time_order() {
        let a = chrono::Utc.with_ymd_and_hms(2026, 2, 13, 10, 0, 0).unwrap();
        let b = a + chrono::Duration::microseconds(1500);
        assert!(timestamp_format::format(&a) < timestamp_format::format(&b));
    }

    #[test]
    fn parse_accepts_offsets() {
        let parsed = timestamp_format::parse("2026-02-13T12:00:00+02:00").unwrap();
        assert_eq!(parsed, chrono::Utc.with_ymd_and_hms(2026, 2, 13, 10, 0, 0).unwrap());
    }
}
