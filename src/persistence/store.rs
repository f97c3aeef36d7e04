use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::session::{LectureSession, SessionMetadata};

/// Durable keyed storage for lecture sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session. Fails if the id already exists.
    async fn create(&self, session: &LectureSession) -> Result<()>;

    /// Insert or replace
    async fn update(&self, session: &LectureSession) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<LectureSession>>;

    /// All sessions, newest first
    async fn list(&self) -> Result<Vec<LectureSession>>;

    /// Session browser entries without slide media or transcript, newest first
    async fn list_metadata(&self) -> Result<Vec<SessionMetadata>> {
        Ok(self.list().await?.iter().map(LectureSession::metadata).collect())
    }

    /// Returns whether a session was removed
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn clear(&self) -> Result<()>;

    /// Get store name for logging
    fn name(&self) -> &str;
}

fn newest_first(sessions: &mut [LectureSession]) {
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// One `<id>.json` file per session
///
/// Directory structure:
/// ```text
/// sessions_dir/
/// ├── thermo.pdf-1700000000000.json
/// └── week-3.pdf-1700000123456.json
/// ```
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create sessions directory: {:?}", dir))?;

        info!("Session store at {:?}", dir);

        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty()
            || id.starts_with('.')
            || id.contains(['/', '\\'])
            || id.contains("..")
        {
            bail!("Invalid session id: {:?}", id);
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    async fn write(&self, session: &LectureSession) -> Result<()> {
        let path = self.path_for(&session.id)?;
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec(session).context("Failed to serialize session")?;
        fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move session into place: {:?}", path))?;

        debug!("Wrote session {} ({} bytes)", session.id, bytes.len());
        Ok(())
    }

    async fn read(path: &Path) -> Result<LectureSession> {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {:?}", path))
    }

    async fn session_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {:?}", self.dir))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self, session: &LectureSession) -> Result<()> {
        let path = self.path_for(&session.id)?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            bail!("Session already exists: {}", session.id);
        }
        self.write(session).await
    }

    async fn update(&self, session: &LectureSession) -> Result<()> {
        self.write(session).await
    }

    async fn get(&self, id: &str) -> Result<Option<LectureSession>> {
        let path = self.path_for(id)?;
        match fs::try_exists(&path).await {
            Ok(true) => Ok(Some(Self::read(&path).await?)),
            Ok(false) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {:?}", path)),
        }
    }

    async fn list(&self) -> Result<Vec<LectureSession>> {
        let mut sessions = Vec::new();
        for path in self.session_files().await? {
            match Self::read(&path).await {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("Skipping unreadable session file: {:#}", e),
            }
        }
        newest_first(&mut sessions);
        Ok(sessions)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted session {}", id);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {:?}", path)),
        }
    }

    async fn clear(&self) -> Result<()> {
        let files = self.session_files().await?;
        let count = files.len();
        for path in files {
            fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to delete {:?}", path))?;
        }
        info!("Cleared {} sessions", count);
        Ok(())
    }

    fn name(&self) -> &str {
        "json-dir"
    }
}

/// Process-local store for tests and ephemeral runs
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, LectureSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &LectureSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            bail!("Session already exists: {}", session.id);
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &LectureSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<LectureSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<LectureSession>> {
        let mut sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        newest_first(&mut sessions);
        Ok(sessions)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.sessions.write().await.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
