//! # Sticker Sheets
//!
//! Batch page generator for sticker and emoji collections. Point it at a
//! directory of image folders and every folder with enough images becomes a
//! fixed set of four shareable pages (a cover and three grids), zipped per
//! collection and bundled into one aggregate archive per run.
//!
//! # Architecture: Stage Pipeline
//!
//! Data flows strictly downward through independent stages:
//!
//! ```text
//! 1. Scan      collections/  →  Collection records   (filesystem → structured data)
//! 2. Render    Collection    →  RenderedPage × 4     (layout + text + images)
//! 3. Package   pages         →  <slug>_bundle.zip    (persist, zip, atomic publish)
//! 4. Aggregate archives      →  aggregate_<ts>.zip   (after every collection is done)
//! ```
//!
//! Each stage is usable on its own, so unit tests exercise layout and slot
//! assignment against a mock image backend without encoding real files.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: finds collections, filters images, records exclusions |
//! | [`naming`] | Folder-name pattern matchers, sanitization, unique slugs |
//! | [`layout`] | Page specs and composition of one page |
//! | [`templates`] | The fixed cover + 3 grid template set and cyclic slot planning |
//! | [`package`] | Page persistence, per-collection and aggregate zip archives |
//! | [`pipeline`] | Orchestration: worker pool, progress events, summary, JSON report |
//! | [`config`] | `batch.toml` loading, defaults and validation |
//! | [`imaging`] | Codec backend, geometry, typefaces, header palette |
//! | [`types`] | Issues, statuses and the run summary shared across stages |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Recoveries Are Values
//!
//! An unreadable sticker, a missing avatar or an unusable font never abort a
//! page. Each becomes a [`types::RenderIssue`] attached to the page and then a
//! [`types::CollectionIssue`] on the collection's report, so the final summary
//! says exactly what was substituted and where. Only an invalid config or a
//! missing or unreadable source root stops a run.
//!
//! ## Cyclic Slot Filling
//!
//! Grid page *k* takes source positions `15k .. 15k+15` modulo the collection
//! size and the cover takes `0 .. 9`. Small collections repeat images instead
//! of leaving blank slots, and a 45-image collection fills the three grids
//! with every image exactly once.
//!
//! ## One Immutable Config
//!
//! A single [`config::BatchConfig`] is loaded per run and passed by reference
//! into every stage. There is no global state.

pub mod config;
pub mod imaging;
pub mod layout;
pub mod naming;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod scan;
pub mod templates;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
