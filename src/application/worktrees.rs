//! # Worktrees
//!
//! Maps a topic's project/branch context to the directory an agent should run in.
//! Mainline branches run in the project root; every other branch gets its own git worktree
//! under the project's worktrees directory, created on first use.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::domain::config::{ProjectConfig, ProjectsConfig};
use crate::domain::paths;
use crate::domain::traits::GitRunner;
use crate::domain::types::RunContext;
use crate::infrastructure::git::{git_is_worktree, git_ok, git_stdout, resolve_default_base};

pub const MAINLINE_ROOT_BRANCHES: [&str; 2] = ["main", "master"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct WorktreeError(pub String);

impl WorktreeError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

fn sanitize_branch(branch: &str) -> Result<String, WorktreeError> {
    let cleaned = branch.trim();
    if cleaned.is_empty() {
        return Err(WorktreeError::new("branch name cannot be empty"));
    }
    if cleaned.starts_with('/') {
        return Err(WorktreeError::new("branch name cannot start with '/'"));
    }
    if Path::new(cleaned)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(WorktreeError::new("branch name cannot contain '..'"));
    }
    Ok(cleaned.to_string())
}

fn is_mainline_branch(branch: &str) -> bool {
    MAINLINE_ROOT_BRANCHES.contains(&branch)
}

async fn project_base_branch(
    project: &ProjectConfig,
    git: &dyn GitRunner,
) -> Result<Option<String>, WorktreeError> {
    let raw = match &project.worktree_base {
        Some(base) => Some(base.clone()),
        None => resolve_default_base(git, &project.path).await,
    };
    raw.map(|b| sanitize_branch(&b)).transpose()
}

fn root_reserved_branches(base_branch: Option<&str>) -> BTreeSet<String> {
    let mut branches: BTreeSet<String> =
        MAINLINE_ROOT_BRANCHES.iter().map(|b| b.to_string()).collect();
    if let Some(base) = base_branch {
        branches.insert(base.to_string());
    }
    branches
}

fn ensure_within_root(root: &Path, path: &Path) -> Result<(), WorktreeError> {
    let root = paths::normalize_lexically(root);
    let path = paths::normalize_lexically(path);
    if !path.starts_with(&root) {
        return Err(WorktreeError::new(
            "branch path escapes the worktrees directory",
        ));
    }
    Ok(())
}

/// Working directory for a run bound to `context`, or `None` when no project is bound.
pub async fn resolve_run_cwd(
    context: Option<&RunContext>,
    projects: &ProjectsConfig,
    git: &dyn GitRunner,
) -> Result<Option<PathBuf>, WorktreeError> {
    let Some(project_key) = context.and_then(|c| c.project.as_deref()) else {
        return Ok(None);
    };
    let project = projects
        .projects
        .get(project_key)
        .ok_or_else(|| WorktreeError::new(format!("unknown project {:?}", project_key)))?;
    let Some(raw_branch) = context.and_then(|c| c.branch.as_deref()) else {
        return Ok(Some(project.path.clone()));
    };

    let branch = sanitize_branch(raw_branch)?;
    let base_branch = project_base_branch(project, git).await?;
    if !root_reserved_branches(base_branch.as_deref()).contains(&branch) {
        return ensure_worktree(project, &branch, git).await.map(Some);
    }

    let current = git_stdout(git, &["branch", "--show-current"], &project.path)
        .await
        .ok_or_else(|| {
            WorktreeError::new(format!(
                "cannot determine current branch for project root {}",
                project.path.display()
            ))
        })?;
    let interchangeable = is_mainline_branch(&branch) && is_mainline_branch(&current);
    if current != branch && !interchangeable {
        let reserved = match &base_branch {
            None => "mainline branches ('main'/'master')".to_string(),
            Some(base) => format!("{:?} and mainline branches ('main'/'master')", base),
        };
        return Err(WorktreeError::new(format!(
            "project root {} is on {:?}; checkout {:?} in the project root \
             (takopi reserves {} for the root repo).",
            project.path.display(),
            current,
            branch,
            reserved
        )));
    }
    Ok(Some(project.path.clone()))
}

async fn git_worktree_add(
    git: &dyn GitRunner,
    root: &Path,
    worktree_path: &Path,
    branch: &str,
    base_ref: Option<&str>,
) -> Result<(), WorktreeError> {
    let path = worktree_path.to_string_lossy().to_string();
    let args: Vec<String> = match base_ref {
        Some(base) => ["worktree", "add", "-b", branch, path.as_str(), base]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => ["worktree", "add", path.as_str(), branch]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };
    let result = git
        .run(&args, root)
        .await
        .ok_or_else(|| WorktreeError::new("git not available on PATH"))?;
    if !result.success {
        let message = if result.stderr.trim().is_empty() {
            result.stdout.trim()
        } else {
            result.stderr.trim()
        };
        return Err(WorktreeError::new(if message.is_empty() {
            "git worktree add failed".to_string()
        } else {
            message.to_string()
        }));
    }
    tracing::info!("Created worktree {} for branch {}", worktree_path.display(), branch);
    Ok(())
}

/// Returns the worktree for `branch`, creating it from the local branch, the remote
/// branch, or the project's base branch (in that order of preference).
pub async fn ensure_worktree(
    project: &ProjectConfig,
    branch: &str,
    git: &dyn GitRunner,
) -> Result<PathBuf, WorktreeError> {
    let root = &project.path;
    if !root.exists() {
        return Err(WorktreeError::new(format!(
            "project path not found: {}",
            root.display()
        )));
    }

    let branch = sanitize_branch(branch)?;
    let worktrees_root = project.worktrees_root();
    let worktree_path = worktrees_root.join(&branch);
    ensure_within_root(&worktrees_root, &worktree_path)?;

    if worktree_path.exists() {
        if !git_is_worktree(git, &worktree_path).await {
            return Err(WorktreeError::new(format!(
                "{} exists but is not a git worktree",
                worktree_path.display()
            )));
        }
        return Ok(worktree_path);
    }

    std::fs::create_dir_all(&worktrees_root).map_err(|e| {
        WorktreeError::new(format!(
            "cannot create {}: {}",
            worktrees_root.display(),
            e
        ))
    })?;

    let local_ref = format!("refs/heads/{}", branch);
    if git_ok(git, &["show-ref", "--verify", "--quiet", &local_ref], root).await {
        git_worktree_add(git, root, &worktree_path, &branch, None).await?;
        return Ok(worktree_path);
    }

    let remote_ref = format!("refs/remotes/origin/{}", branch);
    if git_ok(git, &["show-ref", "--verify", "--quiet", &remote_ref], root).await {
        let base = format!("origin/{}", branch);
        git_worktree_add(git, root, &worktree_path, &branch, Some(&base)).await?;
        return Ok(worktree_path);
    }

    let base = match &project.worktree_base {
        Some(base) => Some(base.clone()),
        None => resolve_default_base(git, root).await,
    }
    .ok_or_else(|| WorktreeError::new("cannot determine base branch for new worktree"))?;
    git_worktree_add(git, root, &worktree_path, &branch, Some(&base)).await?;
    Ok(worktree_path)
}
