use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::participant::ParticipantId;
use crate::timer::{LogEntry, ParticipantTotal, TimerState};

/// Every state change in the session produces an Event.
/// Renderers print them; the CLI emits them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Event {
    /// Someone started speaking from idle.
    SpeakerStarted {
        participant_id: ParticipantId,
        at: DateTime<Utc>,
    },
    /// The floor passed directly from one participant to another.
    /// `entry` is the interval closed for `from`; `None` means the start
    /// marker was missing and nothing could be logged.
    SpeakerSwitched {
        from: ParticipantId,
        to: ParticipantId,
        entry: Option<LogEntry>,
        at: DateTime<Utc>,
    },
    /// The active participant was toggled off; the session is idle again.
    SpeakerStopped {
        participant_id: ParticipantId,
        entry: Option<LogEntry>,
        at: DateTime<Utc>,
    },
    ParticipantRenamed {
        participant_id: ParticipantId,
        name: String,
        at: DateTime<Utc>,
    },
    SetupCompleted {
        participants: usize,
        at: DateTime<Utc>,
    },
    /// All session state was cleared. `discarded_seconds` is the live
    /// interval thrown away, if someone was speaking.
    SessionReset {
        discarded_seconds: Option<u64>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        active_participant_id: Option<ParticipantId>,
        active_since: Option<DateTime<Utc>>,
        live_seconds: u64,
        totals: Vec<ParticipantTotal>,
        combined_seconds: u64,
        log_entries: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The log entry this event closed, if any.
    pub fn logged_entry(&self) -> Option<&LogEntry> {
        match self {
            Event::SpeakerSwitched { entry, .. } | Event::SpeakerStopped { entry, .. } => {
                entry.as_ref()
            }
            _ => None,
        }
    }
}
