//! Keyboard-to-participant mapping for the toggle keyboard.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::warn;

use crate::participant::{ParticipantDirectory, ParticipantId};

/// Maps single keys to participant ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    bindings: IndexMap<char, ParticipantId>,
}

impl KeyMap {
    /// Bind `1`..`9` to the first nine participants in directory order.
    pub fn from_directory(directory: &ParticipantDirectory) -> Self {
        let bindings = directory
            .iter()
            .zip('1'..='9')
            .map(|(p, key)| (key, p.id))
            .collect();
        Self { bindings }
    }

    /// Apply explicit bindings. Multi-character keys and ids missing from the
    /// directory are skipped; if nothing usable remains, falls back to
    /// [`KeyMap::from_directory`].
    pub fn from_bindings(
        bindings: &HashMap<String, ParticipantId>,
        directory: &ParticipantDirectory,
    ) -> Self {
        let mut sorted: Vec<_> = bindings.iter().collect();
        sorted.sort();

        let mut map = IndexMap::new();
        for (key, &id) in sorted {
            let mut chars = key.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                warn!(key = %key, "key binding must be a single character; skipped");
                continue;
            };
            if !directory.contains(id) {
                warn!(key = %key, participant_id = id, "key bound to unknown participant; skipped");
                continue;
            }
            map.insert(c, id);
        }

        if map.is_empty() {
            return Self::from_directory(directory);
        }
        Self { bindings: map }
    }

    pub fn resolve(&self, key: char) -> Option<ParticipantId> {
        self.bindings.get(&key).copied()
    }

    /// Key bound to `participant_id`, for on-screen hints.
    pub fn key_for(&self, participant_id: ParticipantId) -> Option<char> {
        self.bindings
            .iter()
            .find(|(_, &id)| id == participant_id)
            .map(|(&k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, ParticipantId)> + '_ {
        self.bindings.iter().map(|(&k, &id)| (k, id))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Participant;

    #[test]
    fn directory_mapping_follows_order() {
        let dir = ParticipantDirectory::new(vec![
            Participant::new(7, "A", ""),
            Participant::new(3, "B", ""),
        ])
        .unwrap();
        let keys = KeyMap::from_directory(&dir);
        assert_eq!(keys.resolve('1'), Some(7));
        assert_eq!(keys.resolve('2'), Some(3));
        assert_eq!(keys.resolve('3'), None);
        assert_eq!(keys.key_for(3), Some('2'));
    }

    #[test]
    fn directory_mapping_stops_at_nine() {
        let people = (1..=12).map(|i| Participant::new(i, format!("P{i}"), "")).collect();
        let keys = KeyMap::from_directory(&ParticipantDirectory::new(people).unwrap());
        assert_eq!(keys.len(), 9);
        assert_eq!(keys.resolve('9'), Some(9));
    }

    #[test]
    fn explicit_bindings_skip_invalid_entries() {
        let dir = ParticipantDirectory::default();
        let mut bindings = HashMap::new();
        bindings.insert("a".to_string(), 1);
        bindings.insert("bb".to_string(), 2);
        bindings.insert("c".to_string(), 42);
        let keys = KeyMap::from_bindings(&bindings, &dir);
        assert_eq!(keys.resolve('a'), Some(1));
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn unusable_bindings_fall_back_to_directory() {
        let dir = ParticipantDirectory::default();
        let mut bindings = HashMap::new();
        bindings.insert("zz".to_string(), 1);
        assert_eq!(
            KeyMap::from_bindings(&bindings, &dir),
            KeyMap::from_directory(&dir)
        );
    }
}
