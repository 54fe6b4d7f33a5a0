//! Session facade.
//!
//! A [`Session`] owns the whole session state as one value and is the only
//! thing that mutates it. Each state-changing call builds the next state,
//! persists it, and only then adopts it; a failed write leaves both memory
//! and storage at the previous state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::export::{build_export, ExportDocument};
use crate::keymap::KeyMap;
use crate::participant::{Participant, ParticipantDirectory, ParticipantId};
use crate::storage::{KeyValueStore, PersistedStore};
use crate::timer::{live_seconds, TimerEngine, Totals};

/// Session-level data the timing core does not interpret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub setup_done: bool,
    /// Free-text environment notes, one item per line.
    pub surroundings: String,
    /// UI preference, persisted with the session.
    pub dark_mode: bool,
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub meta: SessionMeta,
    pub directory: ParticipantDirectory,
    pub engine: TimerEngine,
}

pub struct Session<K: KeyValueStore, C: Clock = SystemClock> {
    state: SessionState,
    defaults: SessionState,
    store: PersistedStore<K>,
    clock: C,
}

impl<K: KeyValueStore, C: Clock> Session<K, C> {
    /// Restore from `store`, falling back to `defaults` field by field.
    pub fn open(store: PersistedStore<K>, clock: C, defaults: SessionState) -> Self {
        let state = store.load(&defaults);
        debug!(
            setup_done = state.meta.setup_done,
            participants = state.directory.len(),
            log_entries = state.engine.ledger().len(),
            active = ?state.engine.active_participant_id(),
            "session restored"
        );
        Self {
            state,
            defaults,
            store,
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn directory(&self) -> &ParticipantDirectory {
        &self.state.directory
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.state.engine
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.state.meta
    }

    pub fn is_speaking(&self) -> bool {
        self.state.engine.active_participant_id().is_some()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Totals as of this instant.
    pub fn totals(&self) -> Totals {
        Totals::observe(&self.state.engine, &self.state.directory, self.clock.now())
    }

    pub fn snapshot(&self) -> Event {
        let now = self.clock.now();
        let engine = &self.state.engine;
        let totals = Totals::observe(engine, &self.state.directory, now);
        Event::StateSnapshot {
            state: engine.state(),
            active_participant_id: engine.active_participant_id(),
            active_since: engine.active().active_since,
            live_seconds: live_seconds(engine.active(), now),
            totals: totals.participants,
            combined_seconds: totals.combined_seconds,
            log_entries: engine.ledger().len(),
            at: now,
        }
    }

    pub fn export(&self) -> ExportDocument {
        build_export(
            &self.state.directory,
            self.state.engine.ledger(),
            &self.state.meta.surroundings,
        )
    }

    /// Transitions that hit an active speaker without a start marker.
    pub fn inconsistent_transitions(&self) -> u64 {
        self.state.engine.inconsistent_transitions()
    }

    pub fn store(&self) -> &PersistedStore<K> {
        &self.store
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Toggle a participant. Unknown ids are rejected without touching state.
    pub fn toggle(&mut self, participant_id: ParticipantId) -> Result<Event> {
        if !self.state.directory.contains(participant_id) {
            return Err(ValidationError::UnknownParticipant(participant_id).into());
        }
        let mut next = self.state.clone();
        let event = next.engine.toggle(participant_id, self.clock.now());
        self.commit(next)?;
        Ok(event)
    }

    /// Toggle whoever `key` is bound to. `Ok(None)` for an unbound key.
    pub fn toggle_key(&mut self, keymap: &KeyMap, key: char) -> Result<Option<Event>> {
        match keymap.resolve(key) {
            Some(id) => self.toggle(id).map(Some),
            None => {
                debug!(%key, "unbound key ignored");
                Ok(None)
            }
        }
    }

    pub fn rename(&mut self, participant_id: ParticipantId, name: &str) -> Result<Event> {
        let mut next = self.state.clone();
        next.directory.rename(participant_id, name)?;
        self.commit(next)?;
        Ok(Event::ParticipantRenamed {
            participant_id,
            name: self.state.directory.name_of(participant_id).to_string(),
            at: self.clock.now(),
        })
    }

    /// Replace the roster and environment notes and mark setup complete.
    pub fn complete_setup(
        &mut self,
        participants: Vec<Participant>,
        surroundings: &str,
    ) -> Result<Event> {
        let mut next = self.state.clone();
        next.directory = ParticipantDirectory::new(participants)?;
        next.meta.surroundings = surroundings.to_string();
        next.meta.setup_done = true;
        self.commit(next)?;
        info!(participants = self.state.directory.len(), "setup completed");
        Ok(Event::SetupCompleted {
            participants: self.state.directory.len(),
            at: self.clock.now(),
        })
    }

    pub fn set_surroundings(&mut self, text: &str) -> Result<()> {
        let mut next = self.state.clone();
        next.meta.surroundings = text.to_string();
        self.commit(next)
    }

    pub fn set_dark_mode(&mut self, on: bool) -> Result<()> {
        let mut next = self.state.clone();
        next.meta.dark_mode = on;
        self.commit(next)
    }

    /// Wipe the session. A live interval is discarded, not logged.
    pub fn reset(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.store.clear()?;
        let discarded_seconds = self.state.engine.discard_active(now);
        self.state = self.defaults.clone();
        info!(?discarded_seconds, "session reset");
        Ok(Event::SessionReset {
            discarded_seconds,
            at: now,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn commit(&mut self, next: SessionState) -> Result<()> {
        self.store.save(&next)?;
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{CoreError, DatabaseError};
    use crate::storage::{keys, MemoryStore};
    use crate::timer::TimerState;
    use chrono::TimeZone;

    fn session(clock: &ManualClock) -> Session<MemoryStore, &ManualClock> {
        Session::open(
            PersistedStore::new(MemoryStore::new()),
            clock,
            SessionState::default(),
        )
    }

    /// Store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> std::result::Result<Option<String>, DatabaseError> {
            self.inner.get(key)
        }

        fn set_many(
            &mut self,
            entries: &[(&str, String)],
        ) -> std::result::Result<(), DatabaseError> {
            if self.fail_writes {
                return Err(DatabaseError::Locked);
            }
            self.inner.set_many(entries)
        }

        fn clear(&mut self) -> std::result::Result<(), DatabaseError> {
            self.inner.clear()
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn toggle_persists_snapshot() {
        let clock = clock();
        let mut s = session(&clock);
        s.toggle(1).unwrap();
        assert_eq!(
            s.store().inner().get(keys::ACTIVE_PARTICIPANT_ID).unwrap().as_deref(),
            Some("1")
        );
        assert!(s.store().inner().get(keys::ACTIVE_SINCE).unwrap().is_some());
    }

    #[test]
    fn failed_write_leaves_state_unchanged() {
        let clock = clock();
        let mut s = Session::open(
            PersistedStore::new(FlakyStore::default()),
            &clock,
            SessionState::default(),
        );
        s.toggle(1).unwrap();
        clock.advance_secs(4);
        let before = s.state().clone();

        s.store.inner_mut().fail_writes = true;
        assert!(matches!(
            s.toggle(2),
            Err(CoreError::Database(DatabaseError::Locked))
        ));
        assert!(s.rename(1, "Alice").is_err());
        assert!(s
            .complete_setup(vec![Participant::new(9, "Solo", "")], "Desk")
            .is_err());
        assert!(s.set_surroundings("Mic").is_err());
        assert!(s.set_dark_mode(true).is_err());
        assert_eq!(s.state(), &before);

        s.store.inner_mut().fail_writes = false;
        let restored = s.store().load(&SessionState::default());
        assert_eq!(restored, before);
    }

    #[test]
    fn unknown_participant_is_rejected() {
        let clock = clock();
        let mut s = session(&clock);
        let err = s.toggle(42).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UnknownParticipant(42))
        ));
        assert_eq!(s.engine().state(), TimerState::Idle);
        assert!(s.store().inner().is_empty());
    }

    #[test]
    fn toggle_key_uses_keymap() {
        let clock = clock();
        let mut s = session(&clock);
        let keys = KeyMap::from_directory(s.directory());
        assert!(s.toggle_key(&keys, '2').unwrap().is_some());
        assert_eq!(s.engine().active_participant_id(), Some(2));
        assert!(s.toggle_key(&keys, 'x').unwrap().is_none());
    }

    #[test]
    fn reset_discards_live_interval() {
        let clock = clock();
        let mut s = session(&clock);
        s.toggle(1).unwrap();
        clock.advance_secs(5);
        s.toggle(2).unwrap();
        clock.advance_secs(7);

        let event = s.reset().unwrap();
        assert_eq!(
            event,
            Event::SessionReset {
                discarded_seconds: Some(7),
                at: clock.now(),
            }
        );
        assert!(s.engine().ledger().is_empty());
        assert_eq!(s.engine().state(), TimerState::Idle);
        assert!(s.store().inner().is_empty());
    }

    #[test]
    fn setup_replaces_roster() {
        let clock = clock();
        let mut s = session(&clock);
        s.complete_setup(
            vec![Participant::new(5, "Ada", "Lead"), Participant::new(6, "Bo", "Guest")],
            "Table\nMic",
        )
        .unwrap();
        assert!(s.meta().setup_done);
        assert_eq!(s.directory().name_of(6), "Bo");
        assert!(s.toggle(1).is_err());
        assert!(s.complete_setup(vec![], "").is_err());
    }

    #[test]
    fn rename_reflects_in_totals_and_export() {
        let clock = clock();
        let mut s = session(&clock);
        s.toggle(1).unwrap();
        clock.advance_secs(3);
        s.toggle(1).unwrap();
        s.rename(1, "Alice").unwrap();

        assert_eq!(s.totals().get(1).unwrap().name, "Alice");
        assert_eq!(s.export().participant_logs["Alice"].len(), 1);
    }

    #[test]
    fn snapshot_reports_live_seconds() {
        let clock = clock();
        let mut s = session(&clock);
        s.toggle(3).unwrap();
        clock.advance_secs(12);
        match s.snapshot() {
            Event::StateSnapshot {
                state,
                active_participant_id,
                live_seconds,
                combined_seconds,
                ..
            } => {
                assert_eq!(state, TimerState::Speaking);
                assert_eq!(active_participant_id, Some(3));
                assert_eq!(live_seconds, 12);
                assert_eq!(combined_seconds, 12);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
