use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commit sequence at which a value was last written.
pub type Version = i64;

/// A key inside one contract's namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub namespace: String,
    pub key: String,
}

impl StateKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Everything a simulated transaction read and wants to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RwSet {
    /// Committed version seen by the first read of each key (`None` = absent)
    reads: BTreeMap<StateKey, Option<Version>>,
    writes: BTreeMap<StateKey, Vec<u8>>,
}

impl RwSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the first observed version; later reads of the same key add nothing.
    pub fn record_read(&mut self, key: StateKey, version: Option<Version>) {
        self.reads.entry(key).or_insert(version);
    }

    pub fn record_write(&mut self, key: StateKey, value: Vec<u8>) {
        self.writes.insert(key, value);
    }

    /// Value this transaction already wrote for `key`, if any.
    pub fn pending_write(&self, key: &StateKey) -> Option<&Vec<u8>> {
        self.writes.get(key)
    }

    pub fn reads(&self) -> &BTreeMap<StateKey, Option<Version>> {
        &self.reads
    }

    pub fn writes(&self) -> &BTreeMap<StateKey, Vec<u8>> {
        &self.writes
    }

    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    pub(crate) fn snapshot_writes(&self) -> BTreeMap<StateKey, Vec<u8>> {
        self.writes.clone()
    }

    pub(crate) fn restore_writes(&mut self, writes: BTreeMap<StateKey, Vec<u8>>) {
        self.writes = writes;
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("MVCC read conflict on {key}: read version {read:?}, committed version {current:?}")]
    MvccConflict {
        key: StateKey,
        read: Option<Version>,
        current: Option<Version>,
    },
}

/// Committed key/value state with per-key versions.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    entries: BTreeMap<StateKey, VersionedValue>,
    height: Version,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from stored entries. `height` is the last assigned commit sequence.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (StateKey, VersionedValue)>,
        height: Version,
    ) -> Self {
        let entries: BTreeMap<_, _> = entries.into_iter().collect();
        let newest = entries.values().map(|v| v.version).max().unwrap_or(0);
        Self {
            entries,
            height: height.max(newest),
        }
    }

    pub fn get(&self, key: &StateKey) -> Option<&VersionedValue> {
        self.entries.get(key)
    }

    pub fn height(&self) -> Version {
        self.height
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one namespace, ordered by key.
    pub fn namespace<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a VersionedValue)> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.namespace == namespace)
            .map(|(k, v)| (k.key.as_str(), v))
    }

    /// Check that nothing the transaction read has changed since.
    pub fn validate(&self, rw_set: &RwSet) -> Result<(), CommitError> {
        for (key, read) in rw_set.reads() {
            let current = self.entries.get(key).map(|v| v.version);
            if current != *read {
                return Err(CommitError::MvccConflict {
                    key: key.clone(),
                    read: *read,
                    current,
                });
            }
        }
        Ok(())
    }

    /// Validate and apply a read/write set. All writes land at the new height.
    pub fn commit(&mut self, rw_set: &RwSet) -> Result<Version, CommitError> {
        self.validate(rw_set)?;

        let version = self.height + 1;
        for (key, value) in rw_set.writes() {
            self.entries.insert(
                key.clone(),
                VersionedValue {
                    value: value.clone(),
                    version,
                },
            );
        }
        self.height = version;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> StateKey {
        StateKey::new("ledger", k)
    }

    fn write_set(k: &str, value: &str) -> RwSet {
        let mut rw = RwSet::new();
        rw.record_write(key(k), value.as_bytes().to_vec());
        rw
    }

    #[test]
    fn test_commit_assigns_versions() {
        let mut state = WorldState::new();

        assert_eq!(state.commit(&write_set("a", "1")), Ok(1));
        assert_eq!(state.commit(&write_set("b", "2")), Ok(2));

        assert_eq!(state.get(&key("a")).unwrap().version, 1);
        assert_eq!(state.get(&key("b")).unwrap().version, 2);
        assert_eq!(state.height(), 2);
    }

    #[test]
    fn test_stale_read_conflicts() {
        let mut state = WorldState::new();
        state.commit(&write_set("a", "1")).unwrap();

        let mut stale = write_set("a", "5");
        stale.record_read(key("a"), Some(1));

        state.commit(&write_set("a", "2")).unwrap();

        assert_eq!(
            state.commit(&stale),
            Err(CommitError::MvccConflict {
                key: key("a"),
                read: Some(1),
                current: Some(2),
            })
        );
        assert_eq!(state.get(&key("a")).unwrap().value, b"2".to_vec());
    }

    #[test]
    fn test_read_of_absent_key_conflicts_once_created() {
        let mut state = WorldState::new();

        let mut rw = write_set("a", "1");
        rw.record_read(key("a"), None);

        state.commit(&write_set("a", "9")).unwrap();
        assert!(matches!(
            state.commit(&rw),
            Err(CommitError::MvccConflict { current: Some(1), .. })
        ));
    }

    #[test]
    fn test_first_read_version_is_kept() {
        let mut rw = RwSet::new();
        rw.record_read(key("a"), Some(1));
        rw.record_read(key("a"), Some(7));
        assert_eq!(rw.reads().get(&key("a")), Some(&Some(1)));
    }

    #[test]
    fn test_namespace_iteration() {
        let mut state = WorldState::new();
        let mut rw = RwSet::new();
        rw.record_write(StateKey::new("ledger", "b"), b"2".to_vec());
        rw.record_write(StateKey::new("ledger", "a"), b"1".to_vec());
        rw.record_write(StateKey::new("other", "c"), b"3".to_vec());
        state.commit(&rw).unwrap();

        let keys: Vec<&str> = state.namespace("ledger").map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_from_entries_tracks_height() {
        let state = WorldState::from_entries(
            vec![(
                key("a"),
                VersionedValue {
                    value: b"1".to_vec(),
                    version: 4,
                },
            )],
            9,
        );
        assert_eq!(state.height(), 9);
        assert_eq!(state.len(), 1);
    }
}
