//! Speaking-time totals.
//!
//! Everything here is a pure function of the engine at one instant. Totals
//! are never stored: each observation (a redraw, a `status` call, a tick)
//! recomputes them from the ledger plus the live interval, so what is shown
//! can never drift from what is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::{ActiveSpeaker, TimerEngine};
use super::ledger::whole_seconds;
use crate::participant::{ParticipantDirectory, ParticipantId};

/// Seconds accrued by the active speaker that are not yet in the ledger.
/// Zero when idle or when the start marker is missing.
pub fn live_seconds(active: &ActiveSpeaker, now: DateTime<Utc>) -> u64 {
    match (active.active_participant_id, active.active_since) {
        (Some(_), Some(since)) => whole_seconds(since, now),
        _ => 0,
    }
}

/// Logged seconds for `participant_id`, plus live accrual if they hold the floor.
pub fn total_for(engine: &TimerEngine, participant_id: ParticipantId, now: DateTime<Utc>) -> u64 {
    let logged: u64 = engine
        .ledger()
        .entries_for(participant_id)
        .map(|e| e.duration_seconds)
        .sum();
    let live = if engine.active_participant_id() == Some(participant_id) {
        live_seconds(engine.active(), now)
    } else {
        0
    };
    logged + live
}

/// Logged seconds across every entry, plus live accrual if anyone is speaking.
pub fn combined_total(engine: &TimerEngine, now: DateTime<Utc>) -> u64 {
    let logged: u64 = engine
        .ledger()
        .entries()
        .iter()
        .map(|e| e.duration_seconds)
        .sum();
    logged + live_seconds(engine.active(), now)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantTotal {
    pub participant_id: ParticipantId,
    pub name: String,
    pub seconds: u64,
    pub active: bool,
}

/// One observation of every participant's total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Directory order.
    pub participants: Vec<ParticipantTotal>,
    /// Includes entries whose participant is no longer in the directory.
    pub combined_seconds: u64,
    pub at: DateTime<Utc>,
}

impl Totals {
    pub fn observe(
        engine: &TimerEngine,
        directory: &ParticipantDirectory,
        now: DateTime<Utc>,
    ) -> Self {
        let active = engine.active_participant_id();
        let participants = directory
            .iter()
            .map(|p| ParticipantTotal {
                participant_id: p.id,
                name: p.name.clone(),
                seconds: total_for(engine, p.id, now),
                active: active == Some(p.id),
            })
            .collect();
        Self {
            participants,
            combined_seconds: combined_total(engine, now),
            at: now,
        }
    }

    pub fn get(&self, participant_id: ParticipantId) -> Option<&ParticipantTotal> {
        self.participants
            .iter()
            .find(|t| t.participant_id == participant_id)
    }
}

/// Render seconds as `HH:MM:SS`. Hours are not capped at 24.
pub fn format_clock(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
