//! Participant directory.
//!
//! The fixed, ordered roster of people whose speaking time is tracked.
//! Participants are created at setup and can only be renamed afterwards;
//! the directory never shrinks within a session.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable participant identifier assigned at setup.
pub type ParticipantId = u32;

/// Display name used when a log entry references an id the directory
/// no longer knows.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Display-only.
    #[serde(default)]
    pub role: String,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: role.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParticipantDirectory {
    participants: Vec<Participant>,
}

impl ParticipantDirectory {
    /// Build a directory, rejecting an empty roster or duplicate ids.
    pub fn new(participants: Vec<Participant>) -> Result<Self, ValidationError> {
        if participants.is_empty() {
            return Err(ValidationError::EmptyCollection("participants".into()));
        }
        for (i, p) in participants.iter().enumerate() {
            if participants[..i].iter().any(|other| other.id == p.id) {
                return Err(ValidationError::DuplicateParticipant(p.id));
            }
        }
        Ok(Self { participants })
    }

    /// The three-seat roster used before setup has been completed.
    pub fn default_roster() -> Self {
        Self {
            participants: vec![
                Participant::new(1, "Participant A", "Speaker"),
                Participant::new(2, "Participant B", "Speaker"),
                Participant::new(3, "Participant C", "Speaker"),
            ],
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.get(id).is_some()
    }

    /// Display name for `id`, or [`UNKNOWN_PARTICIPANT`] for a dangling reference.
    pub fn name_of(&self, id: ParticipantId) -> &str {
        self.get(id)
            .map(|p| p.name.as_str())
            .unwrap_or(UNKNOWN_PARTICIPANT)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Rename a participant. Surrounding whitespace is trimmed; a blank
    /// name is rejected.
    pub fn rename(&mut self, id: ParticipantId, name: &str) -> Result<(), ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "participant name cannot be blank".into(),
            });
        }
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ValidationError::UnknownParticipant(id))?;
        participant.name = name.to_string();
        Ok(())
    }
}

impl Default for ParticipantDirectory {
    fn default() -> Self {
        Self::default_roster()
    }
}

impl<'de> Deserialize<'de> for ParticipantDirectory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let participants = Vec::<Participant>::deserialize(deserializer)?;
        Self::new(participants).map_err(serde::de::Error::custom)
    }
}
