//! Result classification, run summaries and retry files
//!
//! Failures are classified by substring match on the client's error text.
//! The markers follow the wording of the Telegram API and its client
//! libraries, which is not a stable contract: treat the categories as best
//! effort.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::{Result, TgcastError};
use crate::types::SendResult;

/// Marker of a flood-control rejection
pub const FLOOD_MARKER: &str = "PEER_FLOOD";

/// Markers of a recipient that does not exist
pub const NOT_FOUND_MARKERS: &[&str] = &[
    "No user has",
    "Cannot find any entity",
    "USERNAME_INVALID",
    "USERNAME_NOT_OCCUPIED",
];

pub const FLOOD_RETRY_PREFIX: &str = "retry_peer_flood_";
pub const NOT_FOUND_PREFIX: &str = "invalid_usernames_";
pub const OTHER_ERRORS_PREFIX: &str = "other_errors_";
pub const RETRY_FILE_EXTENSION: &str = ".txt";

/// Retry files kept by [`prune_retry_files`] unless told otherwise
pub const DEFAULT_RETRY_FILES_KEPT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    FloodControl,
    NotFound,
    Other,
}

impl FailureCategory {
    /// Classify an error text; flood control wins over not-found
    pub fn classify(error: &str) -> Self {
        if error.contains(FLOOD_MARKER) {
            FailureCategory::FloodControl
        } else if NOT_FOUND_MARKERS.iter().any(|marker| error.contains(marker)) {
            FailureCategory::NotFound
        } else {
            FailureCategory::Other
        }
    }

    /// File name prefix for this category's retry list
    pub fn file_prefix(&self) -> &'static str {
        match self {
            FailureCategory::FloodControl => FLOOD_RETRY_PREFIX,
            FailureCategory::NotFound => NOT_FOUND_PREFIX,
            FailureCategory::Other => OTHER_ERRORS_PREFIX,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FailureCategory::FloodControl => "PEER_FLOOD handles",
            FailureCategory::NotFound => "invalid usernames",
            FailureCategory::Other => "other errors",
        }
    }
}

/// A retry list written to disk
#[derive(Debug, Clone)]
pub struct SavedList {
    pub category: FailureCategory,
    pub path: PathBuf,
    pub count: usize,
}

/// Results of one run partitioned for reporting
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub successful: Vec<SendResult>,
    /// Every failure, in dispatch order
    pub failed: Vec<SendResult>,
    pub flood_limited: Vec<SendResult>,
    pub not_found: Vec<SendResult>,
    pub other_errors: Vec<SendResult>,
}

impl RunReport {
    pub fn from_results(results: &[SendResult]) -> Self {
        let mut report = RunReport::default();

        for result in results {
            if result.success {
                report.successful.push(result.clone());
                continue;
            }

            report.failed.push(result.clone());
            match FailureCategory::classify(result.error_text()) {
                FailureCategory::FloodControl => report.flood_limited.push(result.clone()),
                FailureCategory::NotFound => report.not_found.push(result.clone()),
                FailureCategory::Other => report.other_errors.push(result.clone()),
            }
        }

        report
    }

    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// Percentage of successful sends; zero for an empty run
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.successful.len() as f64 / self.total() as f64 * 100.0
    }

    pub fn category(&self, category: FailureCategory) -> &[SendResult] {
        match category {
            FailureCategory::FloodControl => &self.flood_limited,
            FailureCategory::NotFound => &self.not_found,
            FailureCategory::Other => &self.other_errors,
        }
    }

    /// Console summary of the run
    pub fn summary(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "\n📊 Results Summary:");
        let _ = writeln!(out, "✅ Successful: {}", self.successful.len());
        let _ = writeln!(out, "❌ Failed: {}", self.failed.len());
        let _ = writeln!(out, "📈 Success rate: {:.1}%", self.success_rate());

        if !self.flood_limited.is_empty() {
            let _ = writeln!(
                out,
                "⏳ Rate Limited (PEER_FLOOD): {} - Can retry later",
                self.flood_limited.len()
            );
        }
        if !self.not_found.is_empty() {
            let _ = writeln!(
                out,
                "👤 Username Not Found: {} - Invalid usernames",
                self.not_found.len()
            );
        }
        if !self.other_errors.is_empty() {
            let _ = writeln!(out, "⚠️  Other Errors: {}", self.other_errors.len());
        }

        if !self.failed.is_empty() {
            let _ = writeln!(out, "\n❌ Failed sends:");
            for result in &self.failed {
                let _ = writeln!(out, "  • {}: {}", result.handle, result.error_text());
            }
        }

        if !self.successful.is_empty() {
            let _ = writeln!(out, "\n✅ Successful sends:");
            for result in &self.successful {
                let _ = writeln!(out, "  • {}", result.handle);
            }
        }

        out
    }

    /// Write one file per non-empty failure category into `dir`
    ///
    /// `dir` is created when missing. The flood-control file holds one handle
    /// per line so it can be fed straight back as input; the others hold
    /// `handle - error` lines. A failed write does not stop the remaining
    /// categories: every file that was written is listed in the result along
    /// with the first error.
    pub fn save_retry_lists(&self, dir: &Path, now: DateTime<Utc>) -> SavedLists {
        let mut outcome = SavedLists::default();
        let pending: Vec<(FailureCategory, &[SendResult])> = [
            FailureCategory::FloodControl,
            FailureCategory::NotFound,
            FailureCategory::Other,
        ]
        .into_iter()
        .map(|category| (category, self.category(category)))
        .filter(|(_, results)| !results.is_empty())
        .collect();

        if pending.is_empty() {
            return outcome;
        }

        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("Failed to create {}: {}", dir.display(), e);
            outcome.error = Some(e.into());
            return outcome;
        }

        let timestamp = file_timestamp(now);
        for (category, results) in pending {
            let content = match category {
                FailureCategory::FloodControl => results
                    .iter()
                    .map(|r| r.handle.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => results
                    .iter()
                    .map(|r| format!("{} - {}", r.handle, r.error_text()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            };

            let path = dir.join(format!(
                "{}{}{}",
                category.file_prefix(),
                timestamp,
                RETRY_FILE_EXTENSION
            ));
            if let Err(e) = std::fs::write(&path, content) {
                error!("Failed to write {}: {}", path.display(), e);
                if outcome.error.is_none() {
                    outcome.error = Some(e.into());
                }
                continue;
            }

            info!("Saved {} {} to {}", results.len(), category.describe(), path.display());
            outcome.saved.push(SavedList {
                category,
                path,
                count: results.len(),
            });
        }

        outcome
    }
}

/// Files written by [`RunReport::save_retry_lists`]
#[derive(Debug, Default)]
pub struct SavedLists {
    pub saved: Vec<SavedList>,
    /// First failure, if any file or the directory could not be written
    pub error: Option<TgcastError>,
}

impl SavedList {
    /// Console line announcing the file
    pub fn announcement(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string());
        format!("💾 Saved {} {} to {}", self.count, self.category.describe(), name)
    }
}

/// Timestamp embedded in retry file names, e.g. `2024-01-15T10-30-45-123Z`
///
/// Sorts lexicographically in creation order.
pub fn file_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Flood retry files in `dir`, newest first
pub fn find_retry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    name.starts_with(FLOOD_RETRY_PREFIX) && name.ends_with(RETRY_FILE_EXTENSION)
                })
        })
        .collect();

    files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(files)
}

/// Most recent flood retry file in `dir`, if any
pub fn latest_retry_file(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(find_retry_files(dir)?.into_iter().next())
}

/// Delete flood retry files beyond the `keep` most recent
///
/// Returns the deleted paths.
pub fn prune_retry_files(dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let stale: Vec<PathBuf> = find_retry_files(dir)?.into_iter().skip(keep).collect();

    for path in &stale {
        std::fs::remove_file(path)?;
        info!("Deleted old retry file: {}", path.display());
    }

    Ok(stale)
}
