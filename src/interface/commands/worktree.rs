//! # Worktree Commands
//!
//! Handles `swarm worktree resolve`: prints the directory an agent run for a
//! project/branch would use, creating the worktree when it does not exist yet.

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::io::Write;

use crate::application::service::normalize_branch;
use crate::application::worktrees::resolve_run_cwd;
use crate::domain::traits::GitRunner;
use crate::domain::types::RunContext;
use crate::interface::cli::WorktreeResolveArgs;
use crate::interface::commands::SwarmContext;
use crate::interface::output::{write_json, write_line};

#[derive(Debug, Serialize)]
struct ResolveOutput {
    project: String,
    branch: Option<String>,
    path: String,
}

pub async fn handle_resolve(
    ctx: &SwarmContext,
    git: &dyn GitRunner,
    args: &WorktreeResolveArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let projects = ctx.projects()?;
    let (project_key, project_alias) = projects.resolve(&args.project)?;
    let branch = normalize_branch(args.branch.as_deref());
    let context = RunContext::new(project_key.as_str(), branch.clone());

    let path = resolve_run_cwd(Some(&context), &projects, git)
        .await?
        .ok_or_else(|| anyhow!("no run directory for project {}", project_alias))?;

    if args.json {
        return write_json(
            out,
            &ResolveOutput {
                project: project_alias,
                branch,
                path: path.display().to_string(),
            },
        );
    }
    write_line(out, &path.display().to_string())
}
