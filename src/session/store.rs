//! Session storage
//!
//! Storage is an opaque key-value capability: sessions go in, an id comes
//! back, and the id is the only handle for loading or deleting later.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::SESSION_FILE_EXTENSION;
use crate::error::{RideVisError, Result, ResultExt};

use super::types::{Session, SessionSummary};

/// Save/list/load/delete sessions by id
pub trait SessionStore: Send {
    /// Persist a session and return its new id
    fn save(&mut self, session: &Session) -> Result<String>;

    /// Summaries of every stored session, newest first
    fn list(&self) -> Result<Vec<SessionSummary>>;

    fn load(&self, id: &str) -> Result<Session>;

    fn delete(&mut self, id: &str) -> Result<()>;
}

fn newest_first(summaries: &mut [SessionSummary]) {
    summaries.sort_by(|a, b| {
        b.meta
            .created_at
            .cmp(&a.meta.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

// ==================== Directory Store ====================

/// One pretty-printed JSON file per session in a directory
#[derive(Debug, Clone)]
pub struct LocalSessionStore {
    dir: PathBuf,
}

impl LocalSessionStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session directory {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RideVisError::Store(format!("invalid session id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.{}", id, SESSION_FILE_EXTENSION)))
    }

    /// Id derived from the creation time, suffixed on collision
    fn fresh_id(&self, session: &Session) -> Result<String> {
        let base = session
            .meta
            .created_at
            .format("%Y%m%d-%H%M%S-%3f")
            .to_string();
        let mut id = base.clone();
        let mut n = 2;
        while self.path_for(&id)?.exists() {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        Ok(id)
    }
}

impl SessionStore for LocalSessionStore {
    fn save(&mut self, session: &Session) -> Result<String> {
        let id = self.fresh_id(session)?;
        let path = self.path_for(&id)?;
        session.save_to_file(&path)?;
        tracing::info!("Saved session '{}' as {}", session.meta.name, id);
        Ok(id)
    }

    fn list(&self) -> Result<Vec<SessionSummary>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list sessions in {:?}", self.dir))?;

        let mut summaries = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != SESSION_FILE_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Session::load_from_file(&path) {
                Ok(session) => summaries.push(SessionSummary {
                    id: id.to_string(),
                    meta: session.meta,
                }),
                Err(e) => tracing::warn!("Skipping unreadable session {:?}: {}", path, e),
            }
        }
        newest_first(&mut summaries);
        Ok(summaries)
    }

    fn load(&self, id: &str) -> Result<Session> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(RideVisError::Store(format!("no session with id '{}'", id)));
        }
        Session::load_from_file(&path)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(RideVisError::Store(format!("no session with id '{}'", id)));
        }
        std::fs::remove_file(&path).with_context(|| format!("Failed to delete {:?}", path))?;
        tracing::info!("Deleted session {}", id);
        Ok(())
    }
}

// ==================== Memory Store ====================

/// Volatile store, handy for tests and offline use
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: BTreeMap<String, Session>,
    next_id: u64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&mut self, session: &Session) -> Result<String> {
        self.next_id += 1;
        let id = format!("mem-{}", self.next_id);
        self.sessions.insert(id.clone(), session.clone());
        Ok(id)
    }

    fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries: Vec<_> = self
            .sessions
            .iter()
            .map(|(id, s)| SessionSummary {
                id: id.clone(),
                meta: s.meta.clone(),
            })
            .collect();
        newest_first(&mut summaries);
        Ok(summaries)
    }

    fn load(&self, id: &str) -> Result<Session> {
        self.sessions
            .get(id)
            .cloned()
            .ok_or_else(|| RideVisError::Store(format!("no session with id '{}'", id)))
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.sessions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RideVisError::Store(format!("no session with id '{}'", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiderConfig;
    use crate::session::types::Frame;
    use crate::types::TelemetrySample;
    use chrono::{TimeZone, Utc};

    fn session(name: &str, minute: u32) -> Session {
        Session::new(
            name,
            Utc.with_ymd_and_hms(2025, 3, 1, 10, minute, 0).unwrap(),
            RiderConfig::default().into(),
            vec![
                Frame::new(0.0, TelemetrySample::default()),
                Frame::new(40.0, TelemetrySample::new(10.0, 5.0, 0.0, 0.0, 0.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_local_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalSessionStore::open(dir.path().join("sessions")).unwrap();

        let a = store.save(&session("first", 0)).unwrap();
        let b = store.save(&session("second", 5)).unwrap();
        assert_eq!(a, "20250301-100000-000");

        let list = store.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, b);
        assert_eq!(list[1].meta.name, "first");

        assert_eq!(store.load(&a).unwrap(), session("first", 0));

        store.delete(&a).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(matches!(store.delete(&a), Err(RideVisError::Store(_))));
    }

    #[test]
    fn test_local_store_id_collision() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalSessionStore::open(dir.path()).unwrap();
        let a = store.save(&session("a", 0)).unwrap();
        let b = store.save(&session("b", 0)).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, format!("{}_2", a));
    }

    #[test]
    fn test_local_store_rejects_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSessionStore::open(dir.path()).unwrap();
        assert!(matches!(store.load("../etc/passwd"), Err(RideVisError::Store(_))));
    }

    #[test]
    fn test_local_store_skips_garbage_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalSessionStore::open(dir.path()).unwrap();
        store.save(&session("ok", 0)).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemorySessionStore::new();
        let id = store.save(&session("m", 1)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load(&id).unwrap().meta.name, "m");
        store.delete(&id).unwrap();
        assert!(store.is_empty());
        assert!(store.load(&id).is_err());
    }
}
