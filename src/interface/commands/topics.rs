//! # Topic Commands
//!
//! Handles `swarm topics list|status|ensure`.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::application::service::{
    EnsureRequest, ensure_topic_thread, list_topic_statuses, normalize_branch, snapshot_to_status,
};
use crate::domain::traits::ForumTransport;
use crate::domain::types::TopicStatus;
use crate::interface::cli::{TopicsEnsureArgs, TopicsListArgs, TopicsStatusArgs};
use crate::interface::commands::{ExitError, SwarmContext};
use crate::interface::output::{write_json, write_line};
use crate::strings::messages;

#[derive(Debug, Serialize)]
struct EnsureOutput {
    created: bool,
    state_path: String,
    status: TopicStatus,
}

pub async fn handle_list(
    ctx: &SwarmContext,
    args: &TopicsListArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let projects = ctx.projects()?;
    let store = ctx.state_store();
    let statuses = list_topic_statuses(&store, &projects.aliases(), args.chat_id).await?;

    if args.json {
        return write_json(out, &statuses);
    }
    if statuses.is_empty() {
        return write_line(out, messages::NO_TRACKED_TOPICS);
    }
    for status in &statuses {
        write_line(out, &messages::topic_status_line(status))?;
    }
    Ok(())
}

pub async fn handle_status(
    ctx: &SwarmContext,
    args: &TopicsStatusArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let projects = ctx.projects()?;
    let store = ctx.state_store();
    let Some(snapshot) = store.get_thread(args.chat_id, args.thread_id).await? else {
        return Err(ExitError::new(1, messages::TOPIC_NOT_FOUND).into());
    };
    let status = snapshot_to_status(&snapshot, &projects.aliases());

    if args.json {
        write_json(out, &status)
    } else {
        write_line(out, &messages::topic_status_line(&status))
    }
}

pub async fn handle_ensure(
    ctx: &SwarmContext,
    transport: &dyn ForumTransport,
    args: &TopicsEnsureArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let projects = ctx.projects()?;
    let (project_key, project_alias) = projects.resolve(&args.project)?;
    let project_chat_id = projects
        .projects
        .get(&project_key)
        .and_then(|p| p.chat_id);
    let chat_id = ctx.target_chat_id(args.chat_id, project_chat_id)?;
    let branch = normalize_branch(args.branch.as_deref());
    let store = ctx.state_store();

    let request = EnsureRequest {
        chat_id,
        project_key: &project_key,
        project_alias: &project_alias,
        branch: branch.as_deref(),
        bind_state: args.bind_state(),
    };
    let (status, created) = ensure_topic_thread(transport, &store, request)
        .await
        .map_err(|e| ExitError::new(2, format!("error: {:#}", e)))?;

    if args.json {
        return write_json(
            out,
            &EnsureOutput {
                created,
                state_path: store.path().display().to_string(),
                status,
            },
        );
    }
    write_line(out, &messages::topic_ensured(created, &status, &project_alias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::service::testing::FakeForum;
    use crate::domain::types::RunContext;
    use crate::interface::commands::testing::{BASE_YAML, context_with, output};

    fn ensure_args(project: &str, branch: Option<&str>, json: bool) -> TopicsEnsureArgs {
        TopicsEnsureArgs {
            project: project.to_string(),
            branch: branch.map(str::to_string),
            chat_id: None,
            bind_state: false,
            no_bind_state: false,
            json,
        }
    }

    #[tokio::test]
    async fn test_list_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(dir.path(), BASE_YAML);

        let mut out = Vec::new();
        let args = TopicsListArgs {
            chat_id: None,
            json: false,
        };
        handle_list(&ctx, &args, &mut out).await.unwrap();
        assert_eq!(output(out), "no tracked topics\n");

        let mut out = Vec::new();
        let args = TopicsListArgs {
            chat_id: None,
            json: true,
        };
        handle_list(&ctx, &args, &mut out).await.unwrap();
        assert_eq!(output(out), "[]\n");
    }

    #[tokio::test]
    async fn test_list_uses_project_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(dir.path(), BASE_YAML);
        ctx.state_store()
            .set_context(-2002, 7, RunContext::new("z80", Some("feat".into())), Some("Z80 @feat"))
            .await
            .unwrap();

        let mut out = Vec::new();
        let args = TopicsListArgs {
            chat_id: None,
            json: false,
        };
        handle_list(&ctx, &args, &mut out).await.unwrap();
        assert_eq!(
            output(out),
            "-2002:7  ctx=Z80@feat  title='Z80 @feat'  default_engine=-  sessions=none\n"
        );
    }

    #[tokio::test]
    async fn test_status_not_found_exits_1() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(dir.path(), BASE_YAML);
        let args = TopicsStatusArgs {
            chat_id: 1,
            thread_id: 2,
            json: true,
        };
        let mut out = Vec::new();
        let err = handle_status(&ctx, &args, &mut out).await.unwrap_err();
        let exit = err.downcast_ref::<ExitError>().unwrap();
        assert_eq!(exit.code, 1);
        assert_eq!(exit.message, "topic not found");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_status_json_reports_tracked_topic() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(dir.path(), BASE_YAML);
        ctx.state_store()
            .set_context(-2002, 7, RunContext::new("z80", Some("feat".into())), Some("Z80 @feat"))
            .await
            .unwrap();

        let args = TopicsStatusArgs {
            chat_id: -2002,
            thread_id: 7,
            json: true,
        };
        let mut out = Vec::new();
        handle_status(&ctx, &args, &mut out).await.unwrap();
        let text = output(out);
        assert_eq!(text.lines().count(), 1);
        let status: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(
            status,
            serde_json::json!({
                "branch": "feat",
                "chat_id": -2002,
                "default_engine": null,
                "project": "Z80",
                "sessions": [],
                "thread_id": 7,
                "topic_title": "Z80 @feat",
            })
        );
    }

    #[tokio::test]
    async fn test_ensure_twice_reuses_topic() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(dir.path(), BASE_YAML);
        let forum = FakeForum::new();

        let mut out = Vec::new();
        handle_ensure(&ctx, &forum, &ensure_args("z80", Some(" feat "), true), &mut out)
            .await
            .unwrap();
        let first: serde_json::Value = serde_json::from_str(output(out).trim()).unwrap();
        assert_eq!(first["created"], true);
        assert_eq!(first["status"]["chat_id"], -2002);
        assert_eq!(first["status"]["branch"], "feat");
        assert_eq!(first["status"]["project"], "Z80");
        assert_eq!(
            first["state_path"],
            dir.path().join("telegram_topics_state.json").display().to_string()
        );

        let mut out = Vec::new();
        handle_ensure(&ctx, &forum, &ensure_args("Z80", Some("feat"), false), &mut out)
            .await
            .unwrap();
        let thread_id = first["status"]["thread_id"].as_i64().unwrap();
        assert_eq!(
            output(out),
            format!("reused topic -2002:{} for Z80 @feat\n", thread_id)
        );
        assert_eq!(forum.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_unknown_project_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(dir.path(), BASE_YAML);
        let forum = FakeForum::new();
        let mut out = Vec::new();
        let err = handle_ensure(&ctx, &forum, &ensure_args("nope", None, false), &mut out)
            .await
            .unwrap_err();
        let config_err = err
            .downcast_ref::<crate::domain::config::ConfigError>()
            .unwrap();
        assert!(config_err.to_string().contains("Available project ids: web, z80"));
    }

    #[tokio::test]
    async fn test_ensure_create_failure_exits_2() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(dir.path(), BASE_YAML);
        let forum = FakeForum::failing_create();
        let mut out = Vec::new();
        let err = handle_ensure(&ctx, &forum, &ensure_args("web", None, false), &mut out)
            .await
            .unwrap_err();
        let exit = err.downcast_ref::<ExitError>().unwrap();
        assert_eq!(exit.code, 2);
        assert!(exit.message.starts_with("error: failed to create telegram forum topic"));
    }
}
