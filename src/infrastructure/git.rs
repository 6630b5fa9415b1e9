//! # Git Helpers
//!
//! Thin wrappers over the `git` CLI used by worktree resolution.
//! `SystemGit` shells out with `tokio::process`; the free helpers work against any `GitRunner`.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::domain::paths;
use crate::domain::traits::{GitOutput, GitRunner};

/// Runs the real `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, args: &[String], cwd: &Path) -> Option<GitOutput> {
        tracing::debug!("git {} (cwd={})", args.join(" "), cwd.display());
        let output = match Command::new("git").args(args).current_dir(cwd).output().await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Failed to run git: {}", e);
                return None;
            }
        };
        Some(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// True when the command ran and exited zero.
pub async fn git_ok(git: &dyn GitRunner, args: &[&str], cwd: &Path) -> bool {
    git.run(&owned(args), cwd)
        .await
        .map(|out| out.success)
        .unwrap_or(false)
}

/// Trimmed stdout of a successful command; `None` on failure or empty output.
pub async fn git_stdout(git: &dyn GitRunner, args: &[&str], cwd: &Path) -> Option<String> {
    let out = git.run(&owned(args), cwd).await?;
    if !out.success {
        return None;
    }
    let text = out.stdout.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// True when `path` is the top level of a git working tree.
pub async fn git_is_worktree(git: &dyn GitRunner, path: &Path) -> bool {
    let inside = git_stdout(git, &["rev-parse", "--is-inside-work-tree"], path).await;
    if inside.as_deref() != Some("true") {
        return false;
    }
    let Some(top) = git_stdout(
        git,
        &["rev-parse", "--path-format=absolute", "--show-toplevel"],
        path,
    )
    .await
    else {
        return false;
    };
    let top = Path::new(&top);
    let expected = std::fs::canonicalize(path).unwrap_or_else(|_| paths::normalize_lexically(path));
    let actual = std::fs::canonicalize(top).unwrap_or_else(|_| paths::normalize_lexically(top));
    actual == expected
}

/// The repository's default branch: `origin/HEAD`, else a local `main`/`master`.
pub async fn resolve_default_base(git: &dyn GitRunner, root: &Path) -> Option<String> {
    if let Some(head) = git_stdout(
        git,
        &["symbolic-ref", "--quiet", "--short", "refs/remotes/origin/HEAD"],
        root,
    )
    .await
    {
        let branch = head.strip_prefix("origin/").unwrap_or(&head);
        if !branch.is_empty() {
            return Some(branch.to_string());
        }
    }
    for candidate in ["main", "master"] {
        let reference = format!("refs/heads/{}", candidate);
        if git_ok(git, &["show-ref", "--verify", "--quiet", &reference], root).await {
            return Some(candidate.to_string());
        }
    }
    None
}

#[cfg(test)]
pub mod testing {
    //! Scripted `GitRunner` for unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeGit {
        responses: Mutex<HashMap<Vec<String>, GitOutput>>,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeGit {
        pub fn new() -> Self {
            Self::default()
        }

        /// Any command without a scripted answer fails.
        pub fn respond(self, args: &[&str], stdout: &str) -> Self {
            self.responses.lock().unwrap().insert(
                owned(args),
                GitOutput {
                    success: true,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            );
            self
        }

        pub fn fail(self, args: &[&str], stderr: &str) -> Self {
            self.responses.lock().unwrap().insert(
                owned(args),
                GitOutput {
                    success: false,
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
            );
            self
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GitRunner for FakeGit {
        async fn run(&self, args: &[String], _cwd: &Path) -> Option<GitOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            let scripted = self.responses.lock().unwrap().get(args).cloned();
            Some(scripted.unwrap_or(GitOutput {
                success: false,
                stdout: String::new(),
                stderr: String::new(),
            }))
        }
    }
}
