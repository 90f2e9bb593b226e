use std::cmp::Ordering;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Server-assigned point in time attached to reservation documents.
///
/// Wire form is the `{ "seconds": .., "nanos": .. }` pair the store
/// returns when a server-timestamp sentinel is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let mut timestamp = Self { seconds, nanos };
        timestamp.normalize();
        timestamp
    }

    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos() as i32,
        }
    }

    /// Decodes a timestamp from a document field value, if it carries one.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn normalize(&mut self) {
        let extra_seconds = self.nanos.div_euclid(1_000_000_000);
        self.seconds += extra_seconds as i64;
        self.nanos = self.nanos.rem_euclid(1_000_000_000);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.seconds.cmp(&other.seconds) {
            Ordering::Equal => self.nanos.cmp(&other.nanos),
            ordering => ordering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_nanoseconds() {
        let timestamp = Timestamp::new(1, 1_500_000_000);
        assert_eq!(timestamp.seconds, 2);
        assert_eq!(timestamp.nanos, 500_000_000);
    }

    #[test]
    fn ordering() {
        let earlier = Timestamp::new(1, 0);
        let later = Timestamp::new(2, 0);
        assert!(earlier < later);
    }

    #[test]
    fn wire_round_trip() {
        let stamp = Timestamp::new(1_700_000_000, 42);
        let value = stamp.to_value();
        assert_eq!(value, json!({ "seconds": 1_700_000_000i64, "nanos": 42 }));
        assert_eq!(Timestamp::from_value(&value), Some(stamp));
    }

    #[test]
    fn non_timestamp_value_decodes_to_none() {
        assert_eq!(Timestamp::from_value(&json!("12/01/2025")), None);
        assert_eq!(Timestamp::from_value(&json!(null)), None);
    }
}
