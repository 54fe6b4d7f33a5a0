//! Session snapshot persistence.
//!
//! The whole session is written as one batch of JSON values, one key per
//! field, after every state change. Loading decodes each field on its own
//! and validates it; anything missing or malformed falls back to the
//! default for that field, so startup always succeeds.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::DatabaseError;
use crate::participant::{ParticipantDirectory, ParticipantId};
use crate::session::{SessionMeta, SessionState};
use crate::timer::{ActiveSpeaker, LogLedger, TimerEngine};

/// Version written alongside every snapshot. A stored snapshot with any
/// other version is ignored wholesale.
pub const SCHEMA_VERSION: u32 = 1;

/// Storage keys, one per persisted field.
pub mod keys {
    pub const SCHEMA_VERSION: &str = "schemaVersion";
    pub const SETUP_DONE: &str = "setupDone";
    pub const PARTICIPANTS: &str = "participants";
    pub const SURROUNDINGS: &str = "surroundings";
    pub const DARK_MODE: &str = "darkMode";
    pub const ACTIVE_PARTICIPANT_ID: &str = "activeParticipantId";
    pub const ACTIVE_SINCE: &str = "activeSince";
    pub const LOGS: &str = "logs";
}

/// Typed adapter between [`SessionState`] and a [`KeyValueStore`].
#[derive(Debug)]
pub struct PersistedStore<K> {
    kv: K,
}

impl<K: KeyValueStore> PersistedStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn inner(&self) -> &K {
        &self.kv
    }

    pub fn inner_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    pub fn into_inner(self) -> K {
        self.kv
    }

    /// Restore the session, using `defaults` for every field that is absent
    /// or fails to decode.
    pub fn load(&self, defaults: &SessionState) -> SessionState {
        if let Some(version) = self.read::<u32>(keys::SCHEMA_VERSION) {
            if version != SCHEMA_VERSION {
                warn!(
                    found = version,
                    expected = SCHEMA_VERSION,
                    "unsupported snapshot schema; starting from defaults"
                );
                return defaults.clone();
            }
        }

        let meta = SessionMeta {
            setup_done: self
                .read(keys::SETUP_DONE)
                .unwrap_or(defaults.meta.setup_done),
            surroundings: self
                .read(keys::SURROUNDINGS)
                .unwrap_or_else(|| defaults.meta.surroundings.clone()),
            dark_mode: self
                .read(keys::DARK_MODE)
                .unwrap_or(defaults.meta.dark_mode),
        };

        let directory: ParticipantDirectory = self
            .read(keys::PARTICIPANTS)
            .unwrap_or_else(|| defaults.directory.clone());

        let active_participant_id: Option<ParticipantId> = self
            .read::<Option<ParticipantId>>(keys::ACTIVE_PARTICIPANT_ID)
            .flatten();
        let mut active_since = self
            .read::<Option<chrono::DateTime<chrono::Utc>>>(keys::ACTIVE_SINCE)
            .flatten();
        if active_participant_id.is_none() && active_since.is_some() {
            debug!("dropping start marker without an active participant");
            active_since = None;
        }

        let ledger: LogLedger = self.read(keys::LOGS).unwrap_or_default();

        SessionState {
            meta,
            directory,
            engine: TimerEngine::restore(
                ActiveSpeaker {
                    active_participant_id,
                    active_since,
                },
                ledger,
            ),
        }
    }

    /// Write the full snapshot in one batch.
    ///
    /// # Errors
    /// Returns an error if encoding or the underlying write fails; nothing
    /// is written in that case.
    pub fn save(&mut self, state: &SessionState) -> Result<(), DatabaseError> {
        let active = state.engine.active();
        let entries = vec![
            (keys::SCHEMA_VERSION, encode(keys::SCHEMA_VERSION, &SCHEMA_VERSION)?),
            (keys::SETUP_DONE, encode(keys::SETUP_DONE, &state.meta.setup_done)?),
            (keys::PARTICIPANTS, encode(keys::PARTICIPANTS, &state.directory)?),
            (keys::SURROUNDINGS, encode(keys::SURROUNDINGS, &state.meta.surroundings)?),
            (keys::DARK_MODE, encode(keys::DARK_MODE, &state.meta.dark_mode)?),
            (
                keys::ACTIVE_PARTICIPANT_ID,
                encode(keys::ACTIVE_PARTICIPANT_ID, &active.active_participant_id)?,
            ),
            (keys::ACTIVE_SINCE, encode(keys::ACTIVE_SINCE, &active.active_since)?),
            (keys::LOGS, encode(keys::LOGS, state.engine.ledger())?),
        ];
        self.kv.set_many(&entries)
    }

    /// Erase every persisted field.
    pub fn clear(&mut self) -> Result<(), DatabaseError> {
        self.kv.clear()
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted value; using default");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "malformed persisted value; using default");
                None
            }
        }
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::EncodeFailed {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    fn store_with(pairs: &[(&str, &str)]) -> PersistedStore<MemoryStore> {
        let mut kv = MemoryStore::new();
        for (k, v) in pairs {
            kv.set(k, v).unwrap();
        }
        PersistedStore::new(kv)
    }

    #[test]
    fn empty_store_yields_defaults() {
        let store = PersistedStore::new(MemoryStore::new());
        let state = store.load(&SessionState::default());
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn save_writes_every_key() {
        let mut store = PersistedStore::new(MemoryStore::new());
        store.save(&SessionState::default()).unwrap();
        assert_eq!(store.inner().len(), 8);
        assert_eq!(
            store.inner().get(keys::ACTIVE_PARTICIPANT_ID).unwrap().as_deref(),
            Some("null")
        );
        assert_eq!(store.inner().get(keys::LOGS).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn corrupt_logs_fall_back_to_empty() {
        let store = store_with(&[
            (keys::SETUP_DONE, "true"),
            (keys::LOGS, "{not json"),
        ]);
        let state = store.load(&SessionState::default());
        assert!(state.engine.ledger().is_empty());
        assert!(state.meta.setup_done);
    }

    #[test]
    fn logs_with_wrong_duration_are_rejected() {
        let store = store_with(&[(
            keys::LOGS,
            r#"[{"id":1,"participantId":1,"startTime":"2024-01-01T10:00:00Z","endTime":"2024-01-01T10:00:10Z","durationSeconds":99}]"#,
        )]);
        let state = store.load(&SessionState::default());
        assert!(state.engine.ledger().is_empty());
    }

    #[test]
    fn logs_with_ascending_ids_are_rejected() {
        let store = store_with(&[(
            keys::LOGS,
            r#"[{"id":5,"participantId":1,"startTime":"2024-01-01T10:00:00Z","endTime":"2024-01-01T10:00:01Z","durationSeconds":1},{"id":1704103220000,"participantId":2,"startTime":"2024-01-01T10:00:10Z","endTime":"2024-01-01T10:00:20Z","durationSeconds":10}]"#,
        )]);
        let state = store.load(&SessionState::default());
        assert!(state.engine.ledger().is_empty());
    }

    #[test]
    fn logs_with_unbounded_id_are_rejected() {
        let logs = format!(
            r#"[{{"id":{},"participantId":1,"startTime":"2024-01-01T10:00:00Z","endTime":"2024-01-01T10:00:01Z","durationSeconds":1}}]"#,
            i64::MAX
        );
        let store = store_with(&[(keys::LOGS, logs.as_str())]);
        let state = store.load(&SessionState::default());
        assert!(state.engine.ledger().is_empty());
    }

    #[test]
    fn restored_ledger_survives_further_toggles() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let store = store_with(&[(
            keys::LOGS,
            r#"[{"id":1704103220000,"participantId":2,"startTime":"2024-01-01T10:00:10Z","endTime":"2024-01-01T10:00:20Z","durationSeconds":10},{"id":5,"participantId":1,"startTime":"2024-01-01T10:00:00Z","endTime":"2024-01-01T10:00:01Z","durationSeconds":1}]"#,
        )]);
        let mut state = store.load(&SessionState::default());
        assert_eq!(state.engine.ledger().len(), 2);

        state.engine.toggle(1, t0);
        state.engine.toggle(1, t0 + Duration::seconds(20));

        let mut store = store;
        store.save(&state).unwrap();
        let reopened = store.load(&SessionState::default());
        assert_eq!(reopened.engine.ledger().len(), 3);
        assert_eq!(reopened.engine.ledger(), state.engine.ledger());
    }

    #[test]
    fn corrupt_setup_flag_uses_default() {
        let store = store_with(&[(keys::SETUP_DONE, "\"yes\"")]);
        let state = store.load(&SessionState::default());
        assert!(!state.meta.setup_done);
    }

    #[test]
    fn duplicate_participants_fall_back_to_default_roster() {
        let store = store_with(&[(
            keys::PARTICIPANTS,
            r#"[{"id":1,"name":"A","role":""},{"id":1,"name":"B","role":""}]"#,
        )]);
        let state = store.load(&SessionState::default());
        assert_eq!(state.directory, ParticipantDirectory::default());
    }

    #[test]
    fn unknown_schema_version_discards_everything() {
        let store = store_with(&[(keys::SCHEMA_VERSION, "2"), (keys::SETUP_DONE, "true")]);
        let state = store.load(&SessionState::default());
        assert!(!state.meta.setup_done);
    }

    #[test]
    fn start_marker_without_speaker_is_dropped() {
        let store = store_with(&[
            (keys::ACTIVE_PARTICIPANT_ID, "null"),
            (keys::ACTIVE_SINCE, "\"2024-01-01T10:00:00Z\""),
        ]);
        let state = store.load(&SessionState::default());
        assert_eq!(state.engine.active(), &ActiveSpeaker::idle());
    }

    #[test]
    fn speaker_without_start_marker_is_kept_for_the_guard() {
        let store = store_with(&[(keys::ACTIVE_PARTICIPANT_ID, "2")]);
        let state = store.load(&SessionState::default());
        assert_eq!(state.engine.active_participant_id(), Some(2));
        assert_eq!(state.engine.active().active_since, None);
    }

    #[test]
    fn timestamps_round_trip_exactly() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
            + Duration::nanoseconds(123_456_789);
        let mut state = SessionState::default();
        state.engine.toggle(1, start);
        state.engine.toggle(2, start + Duration::milliseconds(5_250));

        let mut store = PersistedStore::new(MemoryStore::new());
        store.save(&state).unwrap();
        let restored = store.load(&SessionState::default());

        assert_eq!(restored.engine.ledger(), state.engine.ledger());
        assert_eq!(restored.engine.active(), state.engine.active());
        assert_eq!(
            restored.engine.active().active_since,
            Some(start + Duration::milliseconds(5_250))
        );
    }
}
