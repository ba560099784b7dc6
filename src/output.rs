//! CLI output formatting for the scan and run stages.
//!
//! # Information-First Display
//!
//! Every collection is shown by its positional index and title; directory
//! names, page files and archive paths are indented context lines beneath it.
//! The same collection reads the same way in the scan listing, the progress
//! stream and the final summary.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Collections
//! 001 春意慵懒kitty (48 images)
//!     Source: 01 春意慵懒kitty/
//!     Cover: 001_main.png
//! 002 Bunny (20 images)
//!     Source: Bunny·Daily/
//!     Subtitle: Daily
//!     Cover: 000.png
//!
//! Excluded
//!     tiny/: insufficient images (3 found, 15 required)
//! ```
//!
//! ## Run progress
//!
//! ```text
//! 春意慵懒kitty (48 images)
//!     01_cover_春意慵懒kitty.jpg
//!     02_grid1_春意慵懒kitty.jpg (1 issue)
//!     → partially failed: output/_zip_packages/春意慵懒kitty_bundle.zip
//! ```
//!
//! ## Summary
//!
//! ```text
//! Collections
//! 001 春意慵懒kitty: partially failed (4 pages)
//!     Archive: output/_zip_packages/春意慵懒kitty_bundle.zip
//!     SHA-256: 9f2c...
//!     [render] 02_grid1_春意慵懒kitty.jpg: slot 3: could not load ...
//!
//! Aggregate: output/_zip_packages/aggregate_20250101_120000.zip (2 archives)
//!
//! 1 succeeded, 1 partially failed, 0 failed, 1 excluded
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::pipeline::RunEvent;
use crate::scan::{Exclusion, ScanReport};
use crate::types::{RunSummary, Severity};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn exclusion_lines(excluded: &[Exclusion]) -> Vec<String> {
    if excluded.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), "Excluded".to_string()];
    lines.extend(
        excluded
            .iter()
            .map(|e| format!("{}{}/: {}", indent(1), e.dir_name, e.reason)),
    );
    lines
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the scan result: eligible collections, then exclusions.
pub fn format_scan_output(report: &ScanReport) -> Vec<String> {
    let mut lines = vec!["Collections".to_string()];
    if report.collections.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, collection) in report.collections.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            collection.title,
            plural(collection.images.len(), "image", "images")
        ));
        lines.push(format!("{}Source: {}/", indent(1), collection.dir_name));
        if let Some(subtitle) = &collection.subtitle {
            lines.push(format!("{}Subtitle: {}", indent(1), subtitle));
        }
        if collection.slug != collection.title {
            lines.push(format!("{}Output: {}/", indent(1), collection.slug));
        }
        if let Some(main) = collection.main_image_path() {
            lines.push(format!("{}Cover: {}", indent(1), file_name(main)));
        }
    }
    lines.extend(exclusion_lines(&report.excluded));
    lines
}

pub fn print_scan_output(report: &ScanReport) {
    for line in format_scan_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Run progress
// ============================================================================

/// Format a single run progress event as display lines.
pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    match event {
        RunEvent::CollectionStarted { title, image_count } => {
            vec![format!(
                "{} ({})",
                title,
                plural(*image_count, "image", "images")
            )]
        }
        RunEvent::PageWritten { path, issues, .. } => {
            let name = file_name(path);
            if *issues == 0 {
                vec![format!("{}{}", indent(1), name)]
            } else {
                vec![format!(
                    "{}{} ({})",
                    indent(1),
                    name,
                    plural(*issues, "issue", "issues")
                )]
            }
        }
        RunEvent::CollectionFinished {
            status, archive, ..
        } => match archive {
            Some(path) => vec![format!(
                "{}\u{2192} {}: {}",
                indent(1),
                status.label(),
                path.display()
            )],
            None => vec![format!("{}\u{2192} {}: no archive", indent(1), status.label())],
        },
        RunEvent::AggregateWritten { path, collections } => vec![format!(
            "Aggregate \u{2192} {} ({})",
            path.display(),
            plural(*collections, "archive", "archives")
        )],
    }
}

// ============================================================================
// Run summary
// ============================================================================

/// Format the end-of-run summary.
///
/// Warning-severity issues are listed under the collection but do not change
/// its status.
pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec!["Collections".to_string()];
    if summary.collections.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, report) in summary.collections.iter().enumerate() {
        lines.push(format!(
            "{} {}: {} ({})",
            format_index(i + 1),
            report.title,
            report.status.label(),
            plural(report.pages.len(), "page", "pages")
        ));
        if let Some(archive) = &report.archive {
            lines.push(format!("{}Archive: {}", indent(1), archive.path.display()));
            lines.push(format!("{}SHA-256: {}", indent(1), archive.sha256));
        }
        for issue in &report.issues {
            let marker = match issue.severity {
                Severity::Failure => "",
                Severity::Warning => "warning ",
            };
            let scope = issue
                .page
                .as_deref()
                .map(|p| format!(" {p}"))
                .unwrap_or_default();
            lines.push(format!(
                "{}{}[{}]{}: {}",
                indent(1),
                marker,
                issue.stage,
                scope,
                issue.message
            ));
        }
    }

    lines.extend(exclusion_lines(&summary.excluded));

    lines.push(String::new());
    match &summary.aggregate {
        Some(aggregate) => lines.push(format!(
            "Aggregate: {} ({})",
            aggregate.path.display(),
            plural(aggregate.entries.len(), "archive", "archives")
        )),
        None => lines.push("Aggregate: not created (no collection archives)".to_string()),
    }

    if !summary.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        lines.extend(
            summary
                .warnings
                .iter()
                .map(|w| format!("{}{}", indent(1), w)),
        );
    }

    let counts = summary.counts();
    lines.push(String::new());
    lines.push(format!(
        "{} succeeded, {} partially failed, {} failed, {} excluded",
        counts.succeeded, counts.partially_failed, counts.failed, counts.excluded
    ));
    lines
}

pub fn print_run_event(event: &RunEvent) {
    for line in format_run_event(event) {
        println!("{}", line);
    }
}

pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{Collection, ExclusionReason};
    use crate::templates::Template;
    use crate::types::{
        ArchiveInfo, CollectionIssue, CollectionReport, CollectionStatus, IssueStage,
    };
    use std::path::PathBuf;

    fn collection(dir_name: &str, title: &str, subtitle: Option<&str>, n: usize) -> Collection {
        Collection {
            root_path: PathBuf::from("/src").join(dir_name),
            dir_name: dir_name.into(),
            title: title.into(),
            subtitle: subtitle.map(str::to_string),
            slug: title.into(),
            images: (0..n)
                .map(|i| PathBuf::from(format!("/src/{dir_name}/{i:03}.png")))
                .collect(),
            main_image: 1,
        }
    }

    fn tiny() -> Exclusion {
        Exclusion {
            dir_name: "tiny".into(),
            path: PathBuf::from("/src/tiny"),
            reason: ExclusionReason::InsufficientImages {
                found: 3,
                required: 15,
            },
        }
    }

    fn report(title: &str, status: CollectionStatus, issues: Vec<CollectionIssue>) -> CollectionReport {
        CollectionReport {
            dir_name: title.into(),
            title: title.into(),
            subtitle: None,
            slug: title.into(),
            image_count: 20,
            pages: vec![PathBuf::from("/out/a.jpg"); 4],
            archive: Some(ArchiveInfo {
                path: PathBuf::from(format!("/out/_zip_packages/{title}_bundle.zip")),
                entries: vec![],
                sha256: "ab12".into(),
            }),
            issues,
            status,
        }
    }

    fn summary(collections: Vec<CollectionReport>) -> RunSummary {
        RunSummary {
            started_at: "2025-01-01T12:00:00+00:00".into(),
            source_root: PathBuf::from("/src"),
            output_root: PathBuf::from("/out"),
            collections,
            excluded: vec![tiny()],
            aggregate: None,
            warnings: vec![],
        }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(120), "120");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "image", "images"), "1 image");
        assert_eq!(plural(0, "image", "images"), "0 images");
    }

    #[test]
    fn scan_output_lists_collections_then_exclusions() {
        let report = ScanReport {
            collections: vec![
                collection("01 Kitty", "Kitty", None, 20),
                collection("Bunny·Daily", "Bunny", Some("Daily"), 16),
            ],
            excluded: vec![tiny()],
        };
        let lines = format_scan_output(&report);
        assert_eq!(
            lines,
            vec![
                "Collections",
                "001 Kitty (20 images)",
                "    Source: 01 Kitty/",
                "    Cover: 001.png",
                "002 Bunny (16 images)",
                "    Source: Bunny·Daily/",
                "    Subtitle: Daily",
                "    Cover: 001.png",
                "",
                "Excluded",
                "    tiny/: insufficient images (3 found, 15 required)",
            ]
        );
    }

    #[test]
    fn scan_output_shows_disambiguated_slug() {
        let mut c = collection("a:b", "a:b", None, 15);
        c.slug = "a_b_2".into();
        let lines = format_scan_output(&ScanReport {
            collections: vec![c],
            excluded: vec![],
        });
        assert!(lines.contains(&"    Output: a_b_2/".to_string()));
    }

    #[test]
    fn scan_output_empty() {
        let lines = format_scan_output(&ScanReport::default());
        assert_eq!(lines, vec!["Collections", "    (none)"]);
    }

    #[test]
    fn run_events() {
        let started = RunEvent::CollectionStarted {
            title: "Kitty".into(),
            image_count: 1,
        };
        assert_eq!(format_run_event(&started), vec!["Kitty (1 image)"]);

        let page = RunEvent::PageWritten {
            title: "Kitty".into(),
            template: Template::Grid1,
            path: PathBuf::from("/out/Kitty/02_grid1_Kitty.jpg"),
            issues: 2,
        };
        assert_eq!(
            format_run_event(&page),
            vec!["    02_grid1_Kitty.jpg (2 issues)"]
        );

        let finished = RunEvent::CollectionFinished {
            title: "Kitty".into(),
            status: CollectionStatus::Failed,
            archive: None,
        };
        assert_eq!(
            format_run_event(&finished),
            vec!["    \u{2192} failed: no archive"]
        );
    }

    #[test]
    fn summary_lists_issues_and_counts() {
        let issues = vec![
            CollectionIssue::failure(IssueStage::Render, Some("02_grid1_Kitty.jpg"), "slot 3: bad"),
            CollectionIssue {
                stage: IssueStage::Render,
                page: Some("01_cover_Kitty.jpg".into()),
                message: "no glyphs".into(),
                severity: Severity::Warning,
            },
        ];
        let lines = format_run_summary(&summary(vec![
            report("Kitty", CollectionStatus::PartiallyFailed, issues),
            report("Bunny", CollectionStatus::Succeeded, vec![]),
        ]));

        assert_eq!(lines[1], "001 Kitty: partially failed (4 pages)");
        assert_eq!(lines[2], "    Archive: /out/_zip_packages/Kitty_bundle.zip");
        assert_eq!(lines[3], "    SHA-256: ab12");
        assert_eq!(lines[4], "    [render] 02_grid1_Kitty.jpg: slot 3: bad");
        assert_eq!(lines[5], "    warning [render] 01_cover_Kitty.jpg: no glyphs");
        assert_eq!(lines[6], "002 Bunny: succeeded (4 pages)");
        assert!(lines.contains(&"Aggregate: not created (no collection archives)".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "1 succeeded, 1 partially failed, 0 failed, 1 excluded"
        );
    }

    #[test]
    fn summary_shows_warnings() {
        let mut s = summary(vec![]);
        s.warnings.push("font /x.ttf unusable".into());
        let lines = format_run_summary(&s);
        let at = lines.iter().position(|l| l == "Warnings").unwrap();
        assert_eq!(lines[at + 1], "    font /x.ttf unusable");
    }
}
