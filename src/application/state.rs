//! # Topic State
//!
//! Defines the persistent topic registry (`TopicState`) and the store that reads and writes it.
//! Each tracked forum thread is keyed by `"<chat_id>:<thread_id>"` and carries its project/branch
//! binding, the title we gave it, and the sessions the bot recorded for it.
//! It handles serialization to/from `telegram_topics_state.json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::types::{RunContext, TopicThreadSnapshot};

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to read topic state {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed topic state {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write topic state {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk layout of the topic registry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TopicState {
    #[serde(default = "state_version")]
    pub version: u32,
    #[serde(default)]
    pub threads: BTreeMap<String, TopicThreadSnapshot>,
}

fn state_version() -> u32 {
    STATE_VERSION
}

impl Default for TopicState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            threads: BTreeMap::new(),
        }
    }
}

pub fn thread_key(chat_id: i64, thread_id: i64) -> String {
    format!("{}:{}", chat_id, thread_id)
}

/// File-backed topic registry. Mutations are serialized through an in-process lock and
/// written atomically (temp file + rename).
#[derive(Debug)]
pub struct TopicStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TopicStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// Loads the state; a missing file is an empty registry.
    async fn load(&self) -> Result<TopicState, StateError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TopicState::default()),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.display(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(TopicState::default());
        }
        serde_json::from_str(&content).map_err(|source| StateError::Parse {
            path: self.display(),
            source,
        })
    }

    async fn save(&self, state: &TopicState) -> Result<(), StateError> {
        let write_err = |source| StateError::Write {
            path: self.display(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(state).map_err(|e| StateError::Write {
            path: self.display(),
            source: std::io::Error::new(ErrorKind::InvalidData, e),
        })?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "topics_state.json".to_string());
        let tmp = self.path.with_file_name(format!(".{}.tmp", file_name));
        fs::write(&tmp, content).await.map_err(write_err)?;
        fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        Ok(())
    }

    /// All tracked threads, optionally for a single chat, ordered by chat then thread.
    pub async fn list_threads(
        &self,
        chat_id: Option<i64>,
    ) -> Result<Vec<TopicThreadSnapshot>, StateError> {
        let _guard = self.lock.lock().await;
        let state = self.load().await?;
        let mut threads: Vec<_> = state
            .threads
            .into_values()
            .filter(|t| chat_id.is_none_or(|c| t.chat_id == c))
            .collect();
        threads.sort_by_key(|t| (t.chat_id, t.thread_id));
        Ok(threads)
    }

    pub async fn get_thread(
        &self,
        chat_id: i64,
        thread_id: i64,
    ) -> Result<Option<TopicThreadSnapshot>, StateError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        Ok(state.threads.remove(&thread_key(chat_id, thread_id)))
    }

    /// The thread in `chat_id` bound to exactly `context`, if any (lowest id wins).
    pub async fn find_thread_for_context(
        &self,
        chat_id: i64,
        context: &RunContext,
    ) -> Result<Option<i64>, StateError> {
        let _guard = self.lock.lock().await;
        let state = self.load().await?;
        Ok(state
            .threads
            .values()
            .filter(|t| t.chat_id == chat_id && t.context.as_ref() == Some(context))
            .map(|t| t.thread_id)
            .min())
    }

    /// Binds a thread to `context`, keeping any sessions and default engine already recorded.
    pub async fn set_context(
        &self,
        chat_id: i64,
        thread_id: i64,
        context: RunContext,
        topic_title: Option<&str>,
    ) -> Result<(), StateError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let entry = state
            .threads
            .entry(thread_key(chat_id, thread_id))
            .or_insert_with(|| TopicThreadSnapshot::new(chat_id, thread_id));
        entry.context = Some(context);
        if let Some(title) = topic_title {
            entry.topic_title = Some(title.to_string());
        }
        self.save(&state).await?;
        tracing::debug!(
            "Bound topic {}:{} in {}",
            chat_id,
            thread_id,
            self.path.display()
        );
        Ok(())
    }

    /// Forgets a thread. Returns whether it was tracked.
    pub async fn delete_thread(&self, chat_id: i64, thread_id: i64) -> Result<bool, StateError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let removed = state
            .threads
            .remove(&thread_key(chat_id, thread_id))
            .is_some();
        if removed {
            self.save(&state).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(project: &str, branch: Option<&str>) -> RunContext {
        RunContext::new(project, branch.map(str::to_string))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TopicStateStore::new(dir.path().join("state.json"));
        assert!(store.list_threads(None).await.unwrap().is_empty());
        assert!(store.get_thread(1, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_context_then_find() {
        let dir = tempfile::tempdir().unwrap();
        let store = TopicStateStore::new(dir.path().join("nested/state.json"));
        store
            .set_context(-100, 19, ctx("z80", Some("feat")), Some("z80 @feat"))
            .await
            .unwrap();
        store
            .set_context(-100, 7, ctx("z80", None), Some("z80"))
            .await
            .unwrap();

        assert_eq!(
            store
                .find_thread_for_context(-100, &ctx("z80", Some("feat")))
                .await
                .unwrap(),
            Some(19)
        );
        assert_eq!(
            store
                .find_thread_for_context(-200, &ctx("z80", Some("feat")))
                .await
                .unwrap(),
            None
        );
        let snapshot = store.get_thread(-100, 19).await.unwrap().unwrap();
        assert_eq!(snapshot.topic_title.as_deref(), Some("z80 @feat"));
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let store = TopicStateStore::new(dir.path().join("state.json"));
        store.set_context(2, 5, ctx("a", None), None).await.unwrap();
        store.set_context(1, 30, ctx("b", None), None).await.unwrap();
        store.set_context(1, 4, ctx("c", None), None).await.unwrap();

        let all: Vec<_> = store
            .list_threads(None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.chat_id, t.thread_id))
            .collect();
        assert_eq!(all, vec![(1, 4), (1, 30), (2, 5)]);
        assert_eq!(store.list_threads(Some(2)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_context_preserves_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let raw = r#"{"version":1,"threads":{"1:2":{"chat_id":1,"thread_id":2,"sessions":{"codex":{"resume":"abc"}},"default_engine":"codex"}}}"#;
        std::fs::write(&path, raw).unwrap();

        let store = TopicStateStore::new(&path);
        store
            .set_context(1, 2, ctx("z80", None), Some("z80"))
            .await
            .unwrap();
        let snapshot = store.get_thread(1, 2).await.unwrap().unwrap();
        assert!(snapshot.sessions.contains_key("codex"));
        assert_eq!(snapshot.default_engine.as_deref(), Some("codex"));
        assert_eq!(snapshot.context, Some(ctx("z80", None)));
    }

    #[tokio::test]
    async fn test_delete_thread() {
        let dir = tempfile::tempdir().unwrap();
        let store = TopicStateStore::new(dir.path().join("state.json"));
        store.set_context(1, 2, ctx("z80", None), None).await.unwrap();
        assert!(store.delete_thread(1, 2).await.unwrap());
        assert!(!store.delete_thread(1, 2).await.unwrap());
        assert!(store.get_thread(1, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = TopicStateStore::new(&path);
        assert!(matches!(
            store.list_threads(None).await,
            Err(StateError::Parse { .. })
        ));
    }
}
