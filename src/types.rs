//! Shared result types used across pipeline stages.
//!
//! Problems that the batch recovers from are values, not errors. A
//! [`RenderIssue`] is produced while composing a page; the pipeline turns it
//! (and persistence or packaging problems) into a [`CollectionIssue`] on the
//! collection's [`CollectionReport`]. The whole run ends in a [`RunSummary`]
//! that is printed and written to `_processing_report.json`.

use crate::scan::Exclusion;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// A local recovery made while composing a page.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderIssue {
    #[error("slot {slot}: could not load {path} ({message}), placeholder drawn")]
    SlotPlaceholder {
        slot: usize,
        path: String,
        message: String,
    },
    #[error("avatar {path} could not be loaded ({message}), placeholder drawn")]
    AvatarPlaceholder { path: String, message: String },
    #[error("icon {path} could not be loaded ({message}), placeholder drawn")]
    IconPlaceholder { path: String, message: String },
    #[error("typeface has no glyphs for {chars:?} in {text:?}")]
    MissingGlyphs { text: String, chars: String },
    #[error("font {path} unusable ({message}), built-in font used")]
    FontFallback { path: String, message: String },
}

impl RenderIssue {
    /// Issues that only affect header text do not degrade the collection.
    pub fn severity(&self) -> Severity {
        match self {
            RenderIssue::MissingGlyphs { .. } | RenderIssue::FontFallback { .. } => {
                Severity::Warning
            }
            _ => Severity::Failure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Failure,
}

/// Stage of a collection's processing where an issue was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStage {
    Render,
    Persist,
    Package,
}

impl std::fmt::Display for IssueStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IssueStage::Render => "render",
            IssueStage::Persist => "persist",
            IssueStage::Package => "package",
        };
        f.write_str(label)
    }
}

/// One recorded problem for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionIssue {
    pub stage: IssueStage,
    /// Output filename of the affected page, if the issue is page-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl CollectionIssue {
    pub fn failure(stage: IssueStage, page: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            stage,
            page: page.map(str::to_string),
            message: message.into(),
            severity: Severity::Failure,
        }
    }

    pub fn from_render(page: &str, issue: &RenderIssue) -> Self {
        Self {
            stage: IssueStage::Render,
            page: Some(page.to_string()),
            message: issue.to_string(),
            severity: issue.severity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Succeeded,
    PartiallyFailed,
    Failed,
}

impl CollectionStatus {
    /// `Failed` when nothing was published, `PartiallyFailed` when something
    /// was published but a failure-severity issue was recorded.
    pub fn from_outcome(pages_written: usize, has_archive: bool, issues: &[CollectionIssue]) -> Self {
        if pages_written == 0 || !has_archive {
            CollectionStatus::Failed
        } else if issues.iter().any(|i| i.severity == Severity::Failure) {
            CollectionStatus::PartiallyFailed
        } else {
            CollectionStatus::Succeeded
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CollectionStatus::Succeeded => "succeeded",
            CollectionStatus::PartiallyFailed => "partially failed",
            CollectionStatus::Failed => "failed",
        }
    }
}

/// A written zip archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    /// Entry names in archive order.
    pub entries: Vec<String>,
    /// Hex SHA-256 of the archive file.
    pub sha256: String,
}

/// Outcome of rendering and packaging one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub dir_name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub slug: String,
    pub image_count: usize,
    /// Page files written, in template order.
    pub pages: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveInfo>,
    pub issues: Vec<CollectionIssue>,
    pub status: CollectionStatus,
}

/// Per-status collection counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub succeeded: usize,
    pub partially_failed: usize,
    pub failed: usize,
    pub excluded: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// RFC 3339 local time the run started.
    pub started_at: String,
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub collections: Vec<CollectionReport>,
    pub excluded: Vec<Exclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<ArchiveInfo>,
    /// Run-level problems that did not belong to a single collection.
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts {
            excluded: self.excluded.len(),
            ..RunCounts::default()
        };
        for report in &self.collections {
            match report.status {
                CollectionStatus::Succeeded => counts.succeeded += 1,
                CollectionStatus::PartiallyFailed => counts.partially_failed += 1,
                CollectionStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity) -> CollectionIssue {
        CollectionIssue {
            stage: IssueStage::Render,
            page: None,
            message: "x".into(),
            severity,
        }
    }

    #[test]
    fn status_failed_without_pages_or_archive() {
        assert_eq!(
            CollectionStatus::from_outcome(0, false, &[]),
            CollectionStatus::Failed
        );
        assert_eq!(
            CollectionStatus::from_outcome(4, false, &[]),
            CollectionStatus::Failed
        );
    }

    #[test]
    fn status_partial_only_for_failure_severity() {
        assert_eq!(
            CollectionStatus::from_outcome(4, true, &[issue(Severity::Warning)]),
            CollectionStatus::Succeeded
        );
        assert_eq!(
            CollectionStatus::from_outcome(4, true, &[issue(Severity::Failure)]),
            CollectionStatus::PartiallyFailed
        );
    }

    #[test]
    fn glyph_issues_are_warnings() {
        let glyphs = RenderIssue::MissingGlyphs {
            text: "共 3 张".into(),
            chars: "共张".into(),
        };
        assert_eq!(glyphs.severity(), Severity::Warning);
        let slot = RenderIssue::SlotPlaceholder {
            slot: 2,
            path: "a.png".into(),
            message: "corrupt".into(),
        };
        assert_eq!(slot.severity(), Severity::Failure);
        assert!(slot.to_string().starts_with("slot 2: could not load a.png"));
    }

    #[test]
    fn render_issue_serializes_tagged() {
        let issue = RenderIssue::IconPlaceholder {
            path: "qq.png".into(),
            message: "missing".into(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "icon_placeholder");
        assert_eq!(json["path"], "qq.png");
    }
}
