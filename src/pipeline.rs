//! Batch orchestration.
//!
//! ```text
//! scan ──► confirm ──► ┌ collection 1: render → write pages → zip ┐
//!                      │ collection 2: render → write pages → zip │ ──► aggregate ──► report
//!                      └ collection n: ...                         ┘
//! ```
//!
//! Collections are independent, so they are processed in parallel on a rayon
//! pool bounded by `processing.max_workers`. Results are collected in scan
//! order before the aggregate archive is built, which makes the aggregate a
//! barrier: it only ever sees finished collections.
//!
//! Nothing that goes wrong inside a collection stops the batch. The only
//! fatal errors are an invalid config and a scan failure (missing or
//! unreadable source root).
//!
//! Progress is streamed as [`RunEvent`]s over an optional channel so the CLI
//! can print while workers run.

use crate::config::{self, BatchConfig, ConfigError};
use crate::imaging::{ImageBackend, Quality, RustBackend, Typeface};
use crate::package;
use crate::scan::{self, Collection, ScanError, ScanOptions, ScanReport};
use crate::templates::{self, Template};
use crate::types::{
    ArchiveInfo, CollectionIssue, CollectionReport, CollectionStatus, IssueStage, RenderIssue,
    RunCounts, RunSummary,
};
use chrono::Local;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
}

pub use crate::config::REPORT_FILE;

/// Progress events emitted while collections are processed.
#[derive(Debug, Clone)]
pub enum RunEvent {
    CollectionStarted {
        title: String,
        image_count: usize,
    },
    PageWritten {
        title: String,
        template: Template,
        path: PathBuf,
        issues: usize,
    },
    CollectionFinished {
        title: String,
        status: CollectionStatus,
        archive: Option<PathBuf>,
    },
    AggregateWritten {
        path: PathBuf,
        collections: usize,
    },
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The operator declined after seeing the scan.
    Cancelled(ScanReport),
    Completed(RunSummary),
}

/// Scan the configured source root.
pub fn scan_sources(config: &BatchConfig) -> Result<ScanReport, ScanError> {
    scan::scan(&config.source_root, &ScanOptions::from_config(config))
}

/// Run the full pipeline with the production backend.
pub fn run(
    config: &BatchConfig,
    confirm: impl FnOnce(&ScanReport) -> bool,
    events: Option<Sender<RunEvent>>,
) -> Result<RunOutcome, PipelineError> {
    run_with_backend(&RustBackend::new(), config, confirm, events)
}

/// Run the full pipeline using a specific backend (allows testing with mock).
///
/// The config is validated first. `confirm` is asked between scan and render
/// unless `config.auto_start` is set; returning `false` ends the run before
/// anything is written.
pub fn run_with_backend(
    backend: &impl ImageBackend,
    config: &BatchConfig,
    confirm: impl FnOnce(&ScanReport) -> bool,
    events: Option<Sender<RunEvent>>,
) -> Result<RunOutcome, PipelineError> {
    config.validate()?;
    let report = scan_sources(config)?;
    if !config.auto_start && !confirm(&report) {
        info!("run cancelled after scan");
        return Ok(RunOutcome::Cancelled(report));
    }
    Ok(RunOutcome::Completed(process_batch(
        backend, config, report, events,
    )))
}

/// Render, persist and package every scanned collection, then build the
/// aggregate archive and write the processing report.
pub fn process_batch(
    backend: &impl ImageBackend,
    config: &BatchConfig,
    report: ScanReport,
    events: Option<Sender<RunEvent>>,
) -> RunSummary {
    let started = Local::now();
    let mut warnings = Vec::new();

    let (typeface, font_issue) = load_typeface(config.font_path.as_deref());
    if let Some(issue) = font_issue {
        warn!(%issue, "font fallback");
        warnings.push(issue.to_string());
    }

    let work = || -> Vec<CollectionReport> {
        report
            .collections
            .par_iter()
            .map_with(events.clone(), |tx, collection| {
                process_collection(backend, &typeface, collection, config, tx.as_ref())
            })
            .collect()
    };
    let workers = config::effective_workers(&config.processing);
    let collections = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(work),
        Err(e) => {
            warn!(error = %e, "falling back to the global thread pool");
            work()
        }
    };

    // Every collection has finished by now
    let archives: Vec<&ArchiveInfo> = collections
        .iter()
        .filter(|c| c.status != CollectionStatus::Failed)
        .filter_map(|c| c.archive.as_ref())
        .collect();
    let timestamp = started.format("%Y%m%d_%H%M%S").to_string();
    let aggregate = match package::build_aggregate(&archives, &config.packages_dir(), &timestamp) {
        Ok(aggregate) => aggregate,
        Err(e) => {
            warn!(error = %e, "aggregate archive failed");
            warnings.push(format!("aggregate archive failed: {e}"));
            None
        }
    };
    if let (Some(aggregate), Some(tx)) = (&aggregate, &events) {
        let _ = tx.send(RunEvent::AggregateWritten {
            path: aggregate.path.clone(),
            collections: archives.len(),
        });
    }

    let mut summary = RunSummary {
        started_at: started.to_rfc3339(),
        source_root: config.source_root.clone(),
        output_root: config.output_root.clone(),
        collections,
        excluded: report.excluded,
        aggregate,
        warnings,
    };
    if let Err(e) = write_report(config, &summary) {
        warn!(error = %e, "processing report not written");
        summary
            .warnings
            .push(format!("processing report not written: {e}"));
    }
    summary
}

/// Load the configured font, falling back to the built-in bitmap font.
pub fn load_typeface(font_path: Option<&Path>) -> (Typeface, Option<RenderIssue>) {
    let Some(path) = font_path else {
        return (Typeface::builtin(), None);
    };
    match Typeface::load(path) {
        Ok(face) => (face, None),
        Err(e) => (
            Typeface::builtin(),
            Some(RenderIssue::FontFallback {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        ),
    }
}

fn process_collection(
    backend: &impl ImageBackend,
    typeface: &Typeface,
    collection: &Collection,
    config: &BatchConfig,
    events: Option<&Sender<RunEvent>>,
) -> CollectionReport {
    let emit = |event: RunEvent| {
        if let Some(tx) = events {
            let _ = tx.send(event);
        }
    };
    emit(RunEvent::CollectionStarted {
        title: collection.title.clone(),
        image_count: collection.images.len(),
    });

    let mut issues = Vec::new();
    let set = templates::build_template_set(backend, typeface, collection, config);
    for failure in &set.failures {
        issues.push(CollectionIssue::failure(
            IssueStage::Render,
            Some(failure.output_filename.as_str()),
            failure.error.to_string(),
        ));
    }

    let page_dir = config.output_root.join(&collection.slug);
    let quality = Quality::new(config.quality);
    let mut pages = Vec::new();
    let mut written_names = Vec::new();
    for page in set.pages {
        issues.extend(
            page.issues
                .iter()
                .map(|issue| CollectionIssue::from_render(&page.output_filename, issue)),
        );
        match package::write_page(backend, &page, &page_dir, quality) {
            Ok(path) => {
                emit(RunEvent::PageWritten {
                    title: collection.title.clone(),
                    template: page.template,
                    path: path.clone(),
                    issues: page.issues.len(),
                });
                pages.push(path);
                written_names.push(page.output_filename.clone());
            }
            Err(e) => {
                warn!(page = %page.output_filename, error = %e, "page not written");
                issues.push(CollectionIssue::failure(
                    IssueStage::Persist,
                    Some(page.output_filename.as_str()),
                    e.to_string(),
                ));
            }
        }
        // The raster is released here, before the next page is encoded
    }

    let archive = if written_names.is_empty() {
        None
    } else {
        match package::package_collection(
            &collection.slug,
            &page_dir,
            &written_names,
            &config.packages_dir(),
        ) {
            Ok(archive) => {
                for missing in &archive.missing {
                    issues.push(CollectionIssue::failure(
                        IssueStage::Package,
                        Some(missing.file_name.as_str()),
                        format!("left out of archive: {}", missing.reason),
                    ));
                }
                Some(archive.info)
            }
            Err(e) => {
                warn!(collection = %collection.title, error = %e, "archive not written");
                issues.push(CollectionIssue::failure(
                    IssueStage::Package,
                    None,
                    e.to_string(),
                ));
                None
            }
        }
    };

    let status = CollectionStatus::from_outcome(pages.len(), archive.is_some(), &issues);
    if status == CollectionStatus::Failed {
        // An archive from an earlier run would look current
        match package::remove_collection_archive(&collection.slug, &config.packages_dir()) {
            Ok(Some(path)) => info!(path = %path.display(), "removed stale archive"),
            Ok(None) => {}
            Err(e) => issues.push(CollectionIssue::failure(
                IssueStage::Package,
                None,
                format!(
                    "stale {} from an earlier run could not be removed: {e}",
                    package::collection_archive_name(&collection.slug)
                ),
            )),
        }
    }
    emit(RunEvent::CollectionFinished {
        title: collection.title.clone(),
        status,
        archive: archive.as_ref().map(|a| a.path.clone()),
    });

    CollectionReport {
        dir_name: collection.dir_name.clone(),
        title: collection.title.clone(),
        subtitle: collection.subtitle.clone(),
        slug: collection.slug.clone(),
        image_count: collection.images.len(),
        pages,
        archive,
        issues,
        status,
    }
}

/// JSON written to `_processing_report.json`.
#[derive(Serialize)]
struct ProcessingReport<'a> {
    generated_at: String,
    config: &'a BatchConfig,
    counts: RunCounts,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

fn write_report(config: &BatchConfig, summary: &RunSummary) -> Result<(), std::io::Error> {
    let report = ProcessingReport {
        generated_at: Local::now().to_rfc3339(),
        config,
        counts: summary.counts(),
        summary,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::create_dir_all(&config.output_root)?;
    std::fs::write(config.report_path(), json)
}
