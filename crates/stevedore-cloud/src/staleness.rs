//! Post-deploy staleness check.
//!
//! `check pre` records when the deploy started; `check post` compares that
//! against the service's primary deployment. A primary deployment that was
//! last updated before the deploy started means the stack update did not
//! roll the service, so a new deployment has to be forced.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::client::Deployment;

/// Marker file, relative to the project directory.
pub const MARKER_FILE: &str = ".stevedore/deploy-started";

/// Whether the service still runs a deployment older than `recorded`.
///
/// A service without a primary deployment counts as stale.
pub fn primary_is_stale(deployments: &[Deployment], recorded: DateTime<Utc>) -> bool {
    match deployments.iter().find(|d| d.is_primary()) {
        Some(primary) => primary.updated_at < recorded,
        None => true,
    }
}

pub fn marker_path(project_dir: &Path) -> PathBuf {
    project_dir.join(MARKER_FILE)
}

/// Record `at` as the start of the current deploy.
pub fn record_deploy_start(project_dir: &Path, at: DateTime<Utc>) -> Result<PathBuf, MarkerError> {
    let path = marker_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MarkerError::Write {
            path: path.clone(),
            source: e,
        })?;
    }

    std::fs::write(&path, at.to_rfc3339()).map_err(|e| MarkerError::Write {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

/// The recorded deploy start, or `None` when `check pre` never ran.
pub fn read_deploy_start(project_dir: &Path) -> Result<Option<DateTime<Utc>>, MarkerError> {
    let path = marker_path(project_dir);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| MarkerError::Read {
        path: path.clone(),
        source: e,
    })?;
    let at = DateTime::parse_from_rfc3339(content.trim()).map_err(|e| MarkerError::Parse {
        path: path.clone(),
        source: e,
    })?;
    Ok(Some(at.with_timezone(&Utc)))
}

/// Remove the marker once a deploy has been checked, so the next
/// `check post` cannot reuse a stale start time. Returns whether one existed.
pub fn clear_deploy_start(project_dir: &Path) -> Result<bool, MarkerError> {
    let path = marker_path(project_dir);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(MarkerError::Remove { path, source: e }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid timestamp in {path}")]
    Parse {
        path: PathBuf,
        source: chrono::ParseError,
    },
}
