//! Append-only ledger of finished speaking intervals.
//!
//! Entries are kept newest-first, in insertion order. The ledger is only
//! written by [`TimerEngine`](super::TimerEngine) when an interval closes and
//! is only erased by a full session reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::participant::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Creation token: epoch milliseconds of the closing instant, kept unique.
    pub id: i64,
    pub participant_id: ParticipantId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: u64,
}

impl LogEntry {
    fn check(&self) -> Result<(), ValidationError> {
        if self.end_time < self.start_time {
            return Err(ValidationError::InvalidLogEntry {
                id: self.id,
                message: "endTime precedes startTime".into(),
            });
        }
        let expected = whole_seconds(self.start_time, self.end_time);
        if self.duration_seconds != expected {
            return Err(ValidationError::InvalidLogEntry {
                id: self.id,
                message: format!(
                    "durationSeconds is {} but the interval spans {expected}s",
                    self.duration_seconds
                ),
            });
        }
        Ok(())
    }
}

/// Whole seconds between two instants, floored; zero if `end < start`.
pub(crate) fn whole_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_seconds().max(0) as u64
}

/// Largest id a restored entry may carry; leaves room for later appends.
pub const MAX_RESTORED_ID: i64 = i64::MAX / 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LogLedger {
    entries: Vec<LogEntry>,
}

impl LogLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from restored entries (newest first).
    ///
    /// Each entry must be internally consistent, ids must lie in
    /// `0..=MAX_RESTORED_ID`, and ids must strictly decrease down the ledger.
    pub fn from_entries(entries: Vec<LogEntry>) -> Result<Self, ValidationError> {
        for entry in &entries {
            entry.check()?;
            if !(0..=MAX_RESTORED_ID).contains(&entry.id) {
                return Err(ValidationError::InvalidLogEntry {
                    id: entry.id,
                    message: "id out of range".into(),
                });
            }
        }
        if let Some(pair) = entries.windows(2).find(|w| w[0].id <= w[1].id) {
            return Err(ValidationError::InvalidLogEntry {
                id: pair[1].id,
                message: format!("id not below newer entry {}", pair[0].id),
            });
        }
        Ok(Self { entries })
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// All entries, newest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entries_for(&self, participant_id: ParticipantId) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(move |e| e.participant_id == participant_id)
    }

    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Close an interval into a new entry at the front of the ledger.
    ///
    /// The caller guarantees `end >= start`.
    pub(crate) fn append(
        &mut self,
        participant_id: ParticipantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> &LogEntry {
        debug_assert!(end >= start);
        let id = match self.newest() {
            Some(prev) if prev.id >= end.timestamp_millis() => prev.id.saturating_add(1),
            _ => end.timestamp_millis(),
        };
        self.entries.insert(
            0,
            LogEntry {
                id,
                participant_id,
                start_time: start,
                end_time: end,
                duration_seconds: whole_seconds(start, end),
            },
        );
        &self.entries[0]
    }
}

impl<'de> Deserialize<'de> for LogLedger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = Vec::<LogEntry>::deserialize(deserializer)?;
        Self::from_entries(entries).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn append_prepends_newest_first() {
        let mut ledger = LogLedger::new();
        ledger.append(1, t0(), t0() + Duration::seconds(5));
        ledger.append(2, t0() + Duration::seconds(5), t0() + Duration::seconds(9));
        let ids: Vec<_> = ledger.entries().iter().map(|e| e.participant_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(ledger.newest().unwrap().duration_seconds, 4);
    }

    #[test]
    fn duration_is_floored() {
        let mut ledger = LogLedger::new();
        let entry = ledger.append(1, t0(), t0() + Duration::milliseconds(2_999));
        assert_eq!(entry.duration_seconds, 2);
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let mut ledger = LogLedger::new();
        let a = ledger.append(1, t0(), t0()).id;
        let b = ledger.append(2, t0(), t0()).id;
        let c = ledger.append(3, t0(), t0()).id;
        assert_eq!(a, t0().timestamp_millis());
        assert_eq!(b, a + 1);
        assert_eq!(c, a + 2);
    }

    #[test]
    fn from_entries_rejects_bad_duration() {
        let entry = LogEntry {
            id: 1,
            participant_id: 1,
            start_time: t0(),
            end_time: t0() + Duration::seconds(10),
            duration_seconds: 3,
        };
        assert!(LogLedger::from_entries(vec![entry]).is_err());
    }

    #[test]
    fn from_entries_rejects_reversed_interval() {
        let entry = LogEntry {
            id: 1,
            participant_id: 1,
            start_time: t0() + Duration::seconds(10),
            end_time: t0(),
            duration_seconds: 0,
        };
        assert!(LogLedger::from_entries(vec![entry]).is_err());
    }

    #[test]
    fn from_entries_rejects_duplicate_ids() {
        let entry = LogEntry {
            id: 5,
            participant_id: 1,
            start_time: t0(),
            end_time: t0(),
            duration_seconds: 0,
        };
        assert!(LogLedger::from_entries(vec![entry.clone(), entry]).is_err());
    }

    fn entry(id: i64) -> LogEntry {
        LogEntry {
            id,
            participant_id: 1,
            start_time: t0(),
            end_time: t0(),
            duration_seconds: 0,
        }
    }

    #[test]
    fn from_entries_rejects_non_decreasing_ids() {
        assert!(LogLedger::from_entries(vec![entry(5), entry(9)]).is_err());
        assert!(LogLedger::from_entries(vec![entry(9), entry(5)]).is_ok());
    }

    #[test]
    fn from_entries_rejects_out_of_range_ids() {
        assert!(LogLedger::from_entries(vec![entry(i64::MAX)]).is_err());
        assert!(LogLedger::from_entries(vec![entry(-1)]).is_err());
        assert!(LogLedger::from_entries(vec![entry(MAX_RESTORED_ID)]).is_ok());
    }

    #[test]
    fn append_after_largest_restored_id_stays_monotonic() {
        let mut ledger = LogLedger::from_entries(vec![entry(MAX_RESTORED_ID)]).unwrap();
        let id = ledger.append(1, t0(), t0() + Duration::seconds(1)).id;
        assert_eq!(id, MAX_RESTORED_ID + 1);
        assert!(LogLedger::from_entries(ledger.entries().to_vec()).is_ok());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut ledger = LogLedger::new();
        ledger.append(3, t0(), t0() + Duration::seconds(1));
        let json = serde_json::to_value(&ledger).unwrap();
        let entry = &json[0];
        assert_eq!(entry["participantId"], 3);
        assert_eq!(entry["durationSeconds"], 1);
        assert!(entry.get("startTime").is_some());
        assert!(entry.get("endTime").is_some());
    }
}
