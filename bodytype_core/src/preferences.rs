//! Per-user opt-in flags and the remembered pre-override value.
//!
//! Flags are persisted as `{"players":{"<uuid>":true|false}}`. Every change
//! rewrites the whole file through a temporary sibling and an atomic rename,
//! so the canonical file is never observed half-written. The remembered
//! original value is session state and never reaches disk.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of a user.
pub type UserId = Uuid;

/// Preference state held for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceEntry {
    pub enabled: bool,
    pub saved_original: Option<String>,
}

/// On-disk layout of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub players: BTreeMap<Uuid, bool>,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read player state from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse player state from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize player state: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write player state to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move {from:?} into place at {to:?}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Concurrent per-user preference map with best-effort durability.
///
/// Updates for one user are serialized by the map's per-key locking; updates
/// for different users never wait on each other. Writes to disk are
/// serialized among themselves so the last completed write always carries
/// the newest map state.
#[derive(Debug)]
pub struct PreferenceStore {
    entries: DashMap<UserId, PreferenceEntry>,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
    failed_writes: AtomicU64,
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl PreferenceStore {
    /// Store without a backing file; nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            path: None,
            write_lock: Mutex::new(()),
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Open the store persisted at `path`, creating its directory if needed.
    ///
    /// A missing file starts an empty store. An unreadable or malformed file
    /// also starts an empty store; the problem is logged, not returned.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = fs::create_dir_all(parent) {
                tracing::warn!(
                    target: "bodytypes::store",
                    path = %parent.display(),
                    error = %err,
                    "state.dir_create_failed"
                );
            }
        }

        let store = Self {
            path: Some(path.clone()),
            ..Self::in_memory()
        };

        match load_state(&path) {
            Ok(Some(state)) => {
                let count = state.players.len();
                for (user, enabled) in state.players {
                    store.entries.insert(
                        user,
                        PreferenceEntry {
                            enabled,
                            saved_original: None,
                        },
                    );
                }
                tracing::info!(
                    target: "bodytypes::store",
                    path = %path.display(),
                    players = count,
                    "state.loaded=file"
                );
            }
            Ok(None) => {
                tracing::info!(
                    target: "bodytypes::store",
                    path = %path.display(),
                    "state.loaded=empty"
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: "bodytypes::store",
                    error = %err,
                    "state.load_failed"
                );
            }
        }

        store
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self, user: UserId) -> bool {
        self.entries
            .get(&user)
            .map(|entry| entry.enabled)
            .unwrap_or(false)
    }

    pub fn set_enabled(&self, user: UserId, enabled: bool) {
        self.entries.entry(user).or_default().enabled = enabled;
        self.persist();
    }

    /// Flip the flag and return the new value.
    pub fn toggle(&self, user: UserId) -> bool {
        let enabled = {
            let mut entry = self.entries.entry(user).or_default();
            entry.enabled = !entry.enabled;
            entry.enabled
        };
        self.persist();
        enabled
    }

    /// Remember the value seen before the override was first applied.
    /// Later calls keep the first value.
    pub fn remember_original(&self, user: UserId, value: &str) -> bool {
        let mut entry = self.entries.entry(user).or_default();
        if entry.saved_original.is_some() {
            return false;
        }
        entry.saved_original = Some(value.to_string());
        true
    }

    /// Remembered original value, or `default` if none was captured. The
    /// remembered value is kept for later cycles.
    pub fn take_original_or_default(&self, user: UserId, default: &str) -> String {
        self.entries
            .get(&user)
            .and_then(|entry| entry.saved_original.clone())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn entry(&self, user: UserId) -> Option<PreferenceEntry> {
        self.entries.get(&user).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of durable writes that failed since the store was opened.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// Copy of the flags as they would be written to disk.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            players: self
                .entries
                .iter()
                .map(|entry| (*entry.key(), entry.enabled))
                .collect(),
        }
    }

    /// Write the current flags to disk. A store without a path is a no-op.
    pub fn save(&self) -> Result<(), PersistenceError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let _guard = self.write_lock.lock();
        let state = self.persisted_state();
        write_state(path, &state)
    }

    fn persist(&self) {
        if let Err(err) = self.save() {
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                target: "bodytypes::store",
                error = %err,
                "state.save_failed"
            );
        }
    }
}

/// Read the state file. `Ok(None)` means there was nothing to load.
pub fn load_state(path: &Path) -> Result<Option<PersistedState>, PersistenceError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| PersistenceError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Sibling path the state is staged in before the rename.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `state` to a temporary sibling and rename it over `path`.
pub fn write_state(path: &Path, state: &PersistedState) -> Result<(), PersistenceError> {
    let bytes = serde_json::to_vec(state).map_err(PersistenceError::Serialize)?;
    let tmp = staging_path(path);

    {
        let mut file = File::create(&tmp).map_err(|source| PersistenceError::Write {
            path: tmp.clone(),
            source,
        })?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|source| PersistenceError::Write {
                path: tmp.clone(),
                source,
            })?;
    }

    fs::rename(&tmp, path).map_err(|source| PersistenceError::Rename {
        from: tmp.clone(),
        to: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn user(n: u128) -> UserId {
        Uuid::from_u128(n)
    }

    #[test]
    fn unknown_users_default_to_disabled() {
        let store = PreferenceStore::in_memory();
        assert!(!store.is_enabled(user(1)));
        assert!(store.entry(user(1)).is_none());
    }

    #[test]
    fn set_enabled_round_trips() {
        let store = PreferenceStore::in_memory();
        store.set_enabled(user(1), true);
        assert!(store.is_enabled(user(1)));
        store.set_enabled(user(1), false);
        assert!(!store.is_enabled(user(1)));
    }

    #[test]
    fn toggle_twice_restores_the_flag() {
        let store = PreferenceStore::in_memory();
        assert!(store.toggle(user(7)));
        assert!(!store.toggle(user(7)));
        assert!(!store.is_enabled(user(7)));
    }

    #[test]
    fn remembered_original_is_first_write_wins() {
        let store = PreferenceStore::in_memory();
        assert!(store.remember_original(user(2), "Default"));
        assert!(!store.remember_original(user(2), "Athletic"));
        assert_eq!(store.take_original_or_default(user(2), "Fallback"), "Default");
        // Still available on the next cycle.
        assert_eq!(store.take_original_or_default(user(2), "Fallback"), "Default");
        assert_eq!(store.take_original_or_default(user(3), "Fallback"), "Fallback");
    }

    #[test]
    fn concurrent_toggles_on_one_user_are_not_lost() {
        let store = Arc::new(PreferenceStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store.toggle(user(9));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // 200 flips leave the flag where it started.
        assert!(!store.is_enabled(user(9)));
    }

    #[test]
    fn staging_path_is_a_sibling() {
        let path = Path::new("plugins/BodyTypes/player_state.json");
        assert_eq!(
            staging_path(path),
            PathBuf::from("plugins/BodyTypes/player_state.json.tmp")
        );
    }

    #[test]
    fn empty_store_serializes_to_empty_players() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player_state.json");
        let store = PreferenceStore::open(&path);
        store.save().unwrap();
        insta::assert_snapshot!(fs::read_to_string(&path).unwrap(), @r###"{"players":{}}"###);
    }

    #[test]
    fn writes_go_through_disk_on_every_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player_state.json");
        let store = PreferenceStore::open(&path);
        store.set_enabled(user(1), true);
        store.toggle(user(2));
        store.set_enabled(user(3), false);

        let written = fs::read_to_string(&path).unwrap();
        insta::assert_snapshot!(written, @r###"{"players":{"00000000-0000-0000-0000-000000000001":true,"00000000-0000-0000-0000-000000000002":true,"00000000-0000-0000-0000-000000000003":false}}"###);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player_state.json");
        fs::write(&path, "{\"players\":{\"not-a-uuid\":tru").unwrap();
        let store = PreferenceStore::open(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn remembered_original_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player_state.json");
        let store = PreferenceStore::open(&path);
        store.set_enabled(user(4), true);
        store.remember_original(user(4), "Default");
        store.save().unwrap();

        let reopened = PreferenceStore::open(&path);
        assert_eq!(
            reopened.entry(user(4)),
            Some(PreferenceEntry {
                enabled: true,
                saved_original: None,
            })
        );
    }

    #[test]
    fn failed_writes_keep_memory_authoritative() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("player_state.json");
        fs::create_dir_all(path.join("occupied")).unwrap();
        let store = PreferenceStore::open(&path);

        store.set_enabled(user(5), true);
        assert!(store.is_enabled(user(5)));
        assert_eq!(store.failed_writes(), 1);
        assert!(store.save().is_err());
    }
}
