//! # Topic Service
//!
//! Orchestrates forum topics for the swarm: listing what is tracked, idempotently ensuring
//! a topic per project/branch, and posting control-plane notes as the bot.

use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;

use crate::application::state::TopicStateStore;
use crate::domain::traits::ForumTransport;
use crate::domain::types::{RunContext, TopicStatus, TopicThreadSnapshot};

/// Trims a branch name; blank means "no branch".
pub fn normalize_branch(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

pub fn build_topic_title(project_alias: &str, branch: Option<&str>) -> String {
    match branch {
        Some(branch) if !branch.is_empty() => format!("{} @{}", project_alias, branch),
        _ => project_alias.to_string(),
    }
}

/// Turns a stored snapshot into the user-facing status, replacing project keys with aliases.
pub fn snapshot_to_status(
    snapshot: &TopicThreadSnapshot,
    project_aliases: &BTreeMap<String, String>,
) -> TopicStatus {
    let context = snapshot.context.as_ref();
    let project = context.and_then(|c| c.project.as_ref()).map(|key| {
        project_aliases
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.clone())
    });
    TopicStatus {
        chat_id: snapshot.chat_id,
        thread_id: snapshot.thread_id,
        project,
        branch: context.and_then(|c| c.branch.clone()),
        topic_title: snapshot.topic_title.clone(),
        default_engine: snapshot.default_engine.clone(),
        // BTreeMap keys are already sorted.
        sessions: snapshot.sessions.keys().cloned().collect(),
    }
}

pub async fn list_topic_statuses(
    store: &TopicStateStore,
    project_aliases: &BTreeMap<String, String>,
    chat_id: Option<i64>,
) -> Result<Vec<TopicStatus>> {
    let snapshots = store.list_threads(chat_id).await?;
    Ok(snapshots
        .iter()
        .map(|snapshot| snapshot_to_status(snapshot, project_aliases))
        .collect())
}

/// Parameters for `ensure_topic_thread`.
#[derive(Debug, Clone)]
pub struct EnsureRequest<'a> {
    pub chat_id: i64,
    pub project_key: &'a str,
    pub project_alias: &'a str,
    pub branch: Option<&'a str>,
    pub bind_state: bool,
}

async fn status_after_bind(
    store: &TopicStateStore,
    request: &EnsureRequest<'_>,
    thread_id: i64,
    context: &RunContext,
    title: &str,
) -> Result<TopicStatus> {
    let snapshot = store
        .get_thread(request.chat_id, thread_id)
        .await?
        .unwrap_or_else(|| TopicThreadSnapshot {
            context: request.bind_state.then(|| context.clone()),
            topic_title: Some(title.to_string()),
            ..TopicThreadSnapshot::new(request.chat_id, thread_id)
        });
    let aliases = BTreeMap::from([(
        request.project_key.to_string(),
        request.project_alias.to_string(),
    )]);
    Ok(snapshot_to_status(&snapshot, &aliases))
}

/// Makes sure a forum topic exists for the project/branch pair.
///
/// A topic already bound to the pair is renamed to the canonical title and reused. If the
/// rename fails the topic is assumed gone: its binding is dropped and a new topic is created.
/// Returns the topic status and whether a new topic was created.
pub async fn ensure_topic_thread(
    transport: &dyn ForumTransport,
    store: &TopicStateStore,
    request: EnsureRequest<'_>,
) -> Result<(TopicStatus, bool)> {
    let context = RunContext::new(request.project_key, request.branch.map(str::to_string));
    let title = build_topic_title(request.project_alias, request.branch);

    if let Some(existing) = store
        .find_thread_for_context(request.chat_id, &context)
        .await?
    {
        match transport
            .edit_forum_topic(request.chat_id, existing, &title)
            .await
        {
            Ok(()) => {
                if request.bind_state {
                    store
                        .set_context(request.chat_id, existing, context.clone(), Some(&title))
                        .await?;
                }
                tracing::info!("Reusing topic {}:{} ({})", request.chat_id, existing, title);
                let status = status_after_bind(store, &request, existing, &context, &title).await?;
                return Ok((status, false));
            }
            Err(e) => {
                tracing::warn!(
                    "Topic {}:{} is no longer usable ({}); creating a new one",
                    request.chat_id,
                    existing,
                    e
                );
                store.delete_thread(request.chat_id, existing).await?;
            }
        }
    }

    let created = transport
        .create_forum_topic(request.chat_id, &title)
        .await
        .map_err(|e| anyhow!("failed to create telegram forum topic: {}", e))?;
    let thread_id = created.message_thread_id;
    if request.bind_state {
        store
            .set_context(request.chat_id, thread_id, context.clone(), Some(&title))
            .await
            .context("failed to record the new topic")?;
    }
    tracing::info!("Created topic {}:{} ({})", request.chat_id, thread_id, title);
    let status = status_after_bind(store, &request, thread_id, &context, &title).await?;
    Ok((status, true))
}

/// Posts a visible, non-executing note. Returns the message id, or `None` when sending failed.
pub async fn send_control_message(
    transport: &dyn ForumTransport,
    chat_id: i64,
    thread_id: Option<i64>,
    text: &str,
    notify: bool,
) -> Option<i64> {
    match transport
        .send_message(chat_id, thread_id, text, !notify)
        .await
    {
        Ok(message_id) => Some(message_id),
        Err(e) => {
            tracing::error!("Failed to send control message to chat {}: {}", chat_id, e);
            None
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory `ForumTransport` for unit tests.

    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use crate::domain::traits::ForumTransport;
    use crate::domain::types::ForumTopic;

    #[derive(Debug, Clone, PartialEq)]
    pub struct SentMessage {
        pub chat_id: i64,
        pub thread_id: Option<i64>,
        pub text: String,
        pub disable_notification: bool,
    }

    #[derive(Default)]
    pub struct FakeForum {
        next_thread_id: Mutex<i64>,
        pub live_topics: Mutex<HashSet<(i64, i64)>>,
        pub renames: Mutex<Vec<(i64, i64, String)>>,
        pub created: Mutex<Vec<(i64, String)>>,
        pub sent: Mutex<Vec<SentMessage>>,
        pub fail_create: bool,
        pub fail_send: bool,
    }

    impl FakeForum {
        pub fn new() -> Self {
            Self {
                next_thread_id: Mutex::new(100),
                ..Self::default()
            }
        }

        pub fn failing_create() -> Self {
            Self {
                fail_create: true,
                ..Self::new()
            }
        }

        pub fn failing_send() -> Self {
            Self {
                fail_send: true,
                ..Self::new()
            }
        }

        /// Simulates a topic deleted from the chat behind our back.
        pub fn forget_topic(&self, chat_id: i64, thread_id: i64) {
            self.live_topics.lock().unwrap().remove(&(chat_id, thread_id));
        }
    }

    #[async_trait]
    impl ForumTransport for FakeForum {
        async fn create_forum_topic(&self, chat_id: i64, name: &str) -> Result<ForumTopic, String> {
            if self.fail_create {
                return Err("Bad Request: not enough rights to create a topic".to_string());
            }
            let mut next = self.next_thread_id.lock().unwrap();
            *next += 1;
            let thread_id = *next;
            self.live_topics.lock().unwrap().insert((chat_id, thread_id));
            self.created.lock().unwrap().push((chat_id, name.to_string()));
            Ok(ForumTopic {
                message_thread_id: thread_id,
                name: name.to_string(),
            })
        }

        async fn edit_forum_topic(
            &self,
            chat_id: i64,
            thread_id: i64,
            name: &str,
        ) -> Result<(), String> {
            if !self.live_topics.lock().unwrap().contains(&(chat_id, thread_id)) {
                return Err("Bad Request: message thread not found".to_string());
            }
            self.renames
                .lock()
                .unwrap()
                .push((chat_id, thread_id, name.to_string()));
            Ok(())
        }

        async fn send_message(
            &self,
            chat_id: i64,
            thread_id: Option<i64>,
            text: &str,
            disable_notification: bool,
        ) -> Result<i64, String> {
            if self.fail_send {
                return Err("Forbidden: bot was kicked".to_string());
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                chat_id,
                thread_id,
                text: text.to_string(),
                disable_notification,
            });
            Ok(sent.len() as i64)
        }
    }
}
