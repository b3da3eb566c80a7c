//! Git mirror for history backups.
//!
//! Copies the history into a git working copy, commits it when it changed,
//! and pushes to the configured remote branch.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::storage::RemoteSync;

/// Backup target backed by a git working copy.
#[derive(Debug, Clone)]
pub struct GitRemote {
    repo_dir: PathBuf,
    file: PathBuf,
    remote: String,
    branch: String,
}

impl GitRemote {
    /// Create a mirror for `history_path` inside `repo_dir`.
    ///
    /// When the history file already lives inside the working copy it is
    /// committed in place; otherwise a copy with the same file name is kept
    /// at the root of the working copy.
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        history_path: &Path,
        remote: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        let repo_dir = repo_dir.into();
        let file = Self::file_in_repo(&repo_dir, history_path);
        Self {
            repo_dir,
            file,
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    /// Path of the history file relative to the working copy.
    fn file_in_repo(repo_dir: &Path, history_path: &Path) -> PathBuf {
        history_path
            .strip_prefix(repo_dir)
            .map(Path::to_path_buf)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| history_path.file_name().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("sent_links.json"))
    }

    async fn git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| AppError::sync(self.target(), format!("failed to run git: {e}")))
    }

    async fn git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.git(args).await?;
        if !output.status.success() {
            return Err(AppError::sync(
                self.target(),
                format!(
                    "git {} failed: {}",
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(output)
    }
}

#[async_trait]
impl RemoteSync for GitRemote {
    async fn sync_remote(&self, bytes: &[u8]) -> Result<()> {
        let file = self.file.to_string_lossy().into_owned();

        tokio::fs::write(self.repo_dir.join(&self.file), bytes).await?;
        self.git_checked(&["add", "--", &file]).await?;

        // Exit status 0 means nothing is staged for this file.
        let staged = self.git(&["diff", "--cached", "--quiet", "--", &file]).await?;
        if staged.status.success() {
            log::debug!("No staged changes for {file}, skipping commit");
        } else {
            let message = format!("Update sent links ({})", Utc::now().format("%Y-%m-%d"));
            self.git_checked(&["commit", "-m", &message, "--", &file])
                .await?;
        }

        let refspec = format!("HEAD:{}", self.branch);
        self.git_checked(&["push", &self.remote, &refspec]).await?;
        Ok(())
    }

    fn target(&self) -> String {
        format!("git:{}/{}", self.remote, self.branch)
    }
}
