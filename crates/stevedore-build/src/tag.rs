use std::path::Path;
use std::process::Command;

/// Suffix appended when the working tree has uncommitted changes.
pub const DIRTY_SUFFIX: &str = "-dirty";

/// Image tag for the current source revision.
///
/// The short commit hash of `HEAD`, with [`DIRTY_SUFFIX`] when the working
/// tree differs from it.
pub fn source_tag(project_dir: &Path) -> Result<String, TagError> {
    let revision = git(project_dir, &["rev-parse", "--short", "HEAD"])?;
    let revision = revision.trim();
    if revision.is_empty() {
        return Err(TagError::NoRevision);
    }

    if is_dirty(project_dir)? {
        tracing::warn!(revision, "working tree has uncommitted changes");
        Ok(format!("{revision}{DIRTY_SUFFIX}"))
    } else {
        Ok(revision.to_owned())
    }
}

/// Checks whether the git working tree has uncommitted changes.
pub fn is_dirty(project_dir: &Path) -> Result<bool, TagError> {
    let status = git(project_dir, &["status", "--porcelain"])?;
    Ok(!status.trim().is_empty())
}

fn git(project_dir: &Path, args: &[&str]) -> Result<String, TagError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(project_dir)
        .output()
        .map_err(|e| TagError::GitCommand {
            detail: format!("failed to execute git {}", args.join(" ")),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TagError::GitFailed {
            detail: format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("git command failed: {detail}")]
    GitCommand {
        detail: String,
        source: std::io::Error,
    },
    #[error("git failed: {detail}")]
    GitFailed { detail: String },
    #[error("git reported no revision for HEAD")]
    NoRevision,
}
