//! Speaker timer engine.
//!
//! The engine is a wall-clock-based state machine with a single command,
//! [`TimerEngine::toggle`]. It does not read the clock itself: the caller
//! passes `now`, which keeps every transition deterministic under test.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --toggle(a)--> Speaking(a) --toggle(b)--> Speaking(b)
//!                         |                          |
//!                      toggle(a)                  toggle(b)
//!                         v                          v
//!                        Idle                       Idle
//! ```
//!
//! Leaving `Speaking` always closes the interval into the ledger, and the
//! closing instant doubles as the next speaker's start, so consecutive
//! intervals neither overlap nor leave a gap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ledger::{LogEntry, LogLedger};
use crate::events::Event;
use crate::participant::ParticipantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Speaking,
}

/// Who holds the floor and since when.
///
/// Mirrors the persisted shape, so a restored snapshot can carry an id
/// without a start marker. The engine tolerates that instead of trusting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSpeaker {
    pub active_participant_id: Option<ParticipantId>,
    pub active_since: Option<DateTime<Utc>>,
}

impl ActiveSpeaker {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn speaking(participant_id: ParticipantId, since: DateTime<Utc>) -> Self {
        Self {
            active_participant_id: Some(participant_id),
            active_since: Some(since),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.active_participant_id.is_some()
    }
}

/// Core timer engine.
///
/// Owns the active-speaker fact and the ledger it feeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerEngine {
    active: ActiveSpeaker,
    ledger: LogLedger,
    /// Transitions that found a speaker without a start marker.
    inconsistent_transitions: u64,
}

impl TimerEngine {
    /// Create an idle engine with an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an engine from restored state.
    pub fn restore(active: ActiveSpeaker, ledger: LogLedger) -> Self {
        Self {
            active,
            ledger,
            inconsistent_transitions: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        if self.active.is_speaking() {
            TimerState::Speaking
        } else {
            TimerState::Idle
        }
    }

    pub fn active(&self) -> &ActiveSpeaker {
        &self.active
    }

    pub fn active_participant_id(&self) -> Option<ParticipantId> {
        self.active.active_participant_id
    }

    pub fn ledger(&self) -> &LogLedger {
        &self.ledger
    }

    pub fn inconsistent_transitions(&self) -> u64 {
        self.inconsistent_transitions
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Toggle `participant_id` at instant `now`.
    ///
    /// - idle: `participant_id` starts speaking.
    /// - same participant active: their interval closes, engine goes idle.
    /// - someone else active: their interval closes and `participant_id`
    ///   starts at the same instant.
    pub fn toggle(&mut self, participant_id: ParticipantId, now: DateTime<Utc>) -> Event {
        let Some(prev_id) = self.active.active_participant_id else {
            self.active = ActiveSpeaker::speaking(participant_id, now);
            debug!(participant_id, "speaker started");
            return Event::SpeakerStarted {
                participant_id,
                at: now,
            };
        };

        let (entry, at) = self.close_interval(prev_id, now);

        if prev_id == participant_id {
            self.active = ActiveSpeaker::idle();
            debug!(participant_id, "speaker stopped");
            Event::SpeakerStopped {
                participant_id,
                entry,
                at,
            }
        } else {
            self.active = ActiveSpeaker::speaking(participant_id, at);
            debug!(from = prev_id, to = participant_id, "speaker switched");
            Event::SpeakerSwitched {
                from: prev_id,
                to: participant_id,
                entry,
                at,
            }
        }
    }

    /// Drop the in-progress interval without logging it, returning the
    /// live seconds that were discarded. Used by session reset.
    pub fn discard_active(&mut self, now: DateTime<Utc>) -> Option<u64> {
        let discarded = self
            .active
            .is_speaking()
            .then(|| super::accumulator::live_seconds(&self.active, now));
        self.active = ActiveSpeaker::idle();
        discarded
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Finalize the interval for `prev_id`. Returns the logged entry (if the
    /// start marker existed) and the effective closing instant.
    fn close_interval(
        &mut self,
        prev_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> (Option<LogEntry>, DateTime<Utc>) {
        match self.active.active_since {
            Some(since) => {
                // A clock that stepped backwards must not produce a negative interval.
                let end = now.max(since);
                let entry = self.ledger.append(prev_id, since, end).clone();
                debug!(
                    participant_id = prev_id,
                    duration_seconds = entry.duration_seconds,
                    "interval logged"
                );
                (Some(entry), end)
            }
            None => {
                self.inconsistent_transitions += 1;
                warn!(
                    participant_id = prev_id,
                    count = self.inconsistent_transitions,
                    "active speaker has no start marker; interval not logged"
                );
                (None, now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn toggle_from_idle_starts_speaker() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.state(), TimerState::Idle);

        let event = engine.toggle(1, t(0));
        assert!(matches!(event, Event::SpeakerStarted { participant_id: 1, .. }));
        assert_eq!(engine.state(), TimerState::Speaking);
        assert_eq!(engine.active(), &ActiveSpeaker::speaking(1, t(0)));
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn switching_logs_previous_speaker() {
        let mut engine = TimerEngine::new();
        engine.toggle(1, t(0));
        let event = engine.toggle(2, t(5));

        let entry = event.logged_entry().unwrap();
        assert_eq!(entry.participant_id, 1);
        assert_eq!(entry.duration_seconds, 5);
        assert_eq!(engine.active(), &ActiveSpeaker::speaking(2, t(5)));
        assert_eq!(engine.ledger().len(), 1);
    }

    #[test]
    fn same_participant_twice_returns_to_idle() {
        let mut engine = TimerEngine::new();
        engine.toggle(1, t(0));
        let event = engine.toggle(1, t(0));

        assert!(matches!(event, Event::SpeakerStopped { participant_id: 1, .. }));
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.active(), &ActiveSpeaker::idle());
        assert_eq!(engine.ledger().len(), 1);
        assert_eq!(engine.ledger().newest().unwrap().duration_seconds, 0);
    }

    #[test]
    fn missing_start_marker_is_flagged_not_logged() {
        let broken = ActiveSpeaker {
            active_participant_id: Some(1),
            active_since: None,
        };
        let mut engine = TimerEngine::restore(broken, LogLedger::new());

        let event = engine.toggle(2, t(10));
        assert_eq!(event.logged_entry(), None);
        assert_eq!(engine.inconsistent_transitions(), 1);
        assert!(engine.ledger().is_empty());
        // The new speaker still gets a proper start marker.
        assert_eq!(engine.active(), &ActiveSpeaker::speaking(2, t(10)));
    }

    #[test]
    fn backwards_clock_clamps_to_zero_duration() {
        let mut engine = TimerEngine::new();
        engine.toggle(1, t(10));
        let event = engine.toggle(2, t(4));

        let entry = event.logged_entry().unwrap();
        assert_eq!(entry.start_time, t(10));
        assert_eq!(entry.end_time, t(10));
        assert_eq!(entry.duration_seconds, 0);
        assert_eq!(engine.active().active_since, Some(t(10)));
    }

    #[test]
    fn discard_active_drops_live_interval() {
        let mut engine = TimerEngine::new();
        engine.toggle(3, t(0));
        assert_eq!(engine.discard_active(t(42)), Some(42));
        assert_eq!(engine.state(), TimerState::Idle);
        assert!(engine.ledger().is_empty());
        assert_eq!(engine.discard_active(t(50)), None);
    }
}
