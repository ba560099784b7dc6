//! Page persistence and zip packaging.
//!
//! ```text
//! output/
//! ├── Kitty/
//! │   ├── 01_cover_Kitty.jpg
//! │   └── 02_grid1_Kitty.jpg ...
//! └── _zip_packages/
//!     ├── Kitty_bundle.zip                 # Kitty/01_cover_Kitty.jpg, ...
//!     └── aggregate_20250101_120000.zip    # Kitty_bundle.zip, ...
//! ```
//!
//! Archives are written to `<name>.partial` and renamed into place, so an
//! interrupted run never leaves a truncated archive under the final name.
//! Entries carry a fixed timestamp: packaging the same pages twice produces
//! byte-identical archives.

use crate::imaging::{BackendError, ImageBackend, Quality};
use crate::templates::RenderedPage;
use crate::types::ArchiveInfo;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] ZipError),
    #[error("Failed to encode page: {0}")]
    Encode(#[from] BackendError),
    #[error("No pages available to package")]
    NoPages,
}

/// A page that was expected in the archive but could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPage {
    pub file_name: String,
    pub reason: String,
}

/// A collection archive and the pages it had to leave out.
#[derive(Debug, Clone)]
pub struct CollectionArchive {
    pub info: ArchiveInfo,
    pub missing: Vec<MissingPage>,
}

pub fn collection_archive_name(slug: &str) -> String {
    format!("{slug}_bundle.zip")
}

pub fn aggregate_archive_name(timestamp: &str) -> String {
    format!("aggregate_{timestamp}.zip")
}

/// Encode one rendered page into `dir`.
pub fn write_page(
    backend: &impl ImageBackend,
    page: &RenderedPage,
    dir: &Path,
    quality: Quality,
) -> Result<PathBuf, PackagingError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(&page.output_filename);
    backend.encode_jpeg(&page.raster, &path, quality)?;
    debug!(path = %path.display(), "page written");
    Ok(path)
}

/// Zip the named pages of one collection.
///
/// Pages that are missing or unreadable are left out and reported; the
/// archive is still written as long as at least one page is available.
pub fn package_collection(
    slug: &str,
    page_dir: &Path,
    page_names: &[String],
    packages_dir: &Path,
) -> Result<CollectionArchive, PackagingError> {
    let mut sources = Vec::new();
    let mut missing = Vec::new();
    for name in page_names {
        match File::open(page_dir.join(name)) {
            Ok(file) => sources.push((format!("{slug}/{name}"), file)),
            Err(e) => {
                warn!(page = %name, error = %e, "page missing from archive");
                missing.push(MissingPage {
                    file_name: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    if sources.is_empty() {
        return Err(PackagingError::NoPages);
    }

    fs::create_dir_all(packages_dir)?;
    let path = packages_dir.join(collection_archive_name(slug));
    let info = write_archive(&path, sources, CompressionMethod::Deflated)?;
    Ok(CollectionArchive { info, missing })
}

/// Delete the collection archive left by an earlier run, if any.
///
/// Returns the removed path.
pub fn remove_collection_archive(
    slug: &str,
    packages_dir: &Path,
) -> io::Result<Option<PathBuf>> {
    let path = packages_dir.join(collection_archive_name(slug));
    match fs::remove_file(&path) {
        Ok(()) => Ok(Some(path)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Bundle every collection archive of the run into one timestamped archive.
///
/// Returns `None` when there is nothing to bundle. A numeric suffix is added
/// when an archive with the same timestamp already exists.
pub fn build_aggregate(
    archives: &[&ArchiveInfo],
    packages_dir: &Path,
    timestamp: &str,
) -> Result<Option<ArchiveInfo>, PackagingError> {
    if archives.is_empty() {
        return Ok(None);
    }
    let mut sources = Vec::with_capacity(archives.len());
    for archive in archives {
        let name = archive
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        sources.push((name, File::open(&archive.path)?));
    }

    fs::create_dir_all(packages_dir)?;
    let path = unique_path(packages_dir, &format!("aggregate_{timestamp}"), "zip");
    // Collection archives are already deflated
    write_archive(&path, sources, CompressionMethod::Stored).map(Some)
}

/// Stream `sources` into a zip at `path` via a `.partial` sibling.
fn write_archive(
    path: &Path,
    sources: Vec<(String, File)>,
    method: CompressionMethod,
) -> Result<ArchiveInfo, PackagingError> {
    let partial = partial_path(path);
    let entries: Vec<String> = sources.iter().map(|(name, _)| name.clone()).collect();
    if let Err(e) = write_entries(&partial, sources, method) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    fs::rename(&partial, path)?;
    let sha256 = sha256_file(path)?;
    debug!(path = %path.display(), entries = entries.len(), "archive written");
    Ok(ArchiveInfo {
        path: path.to_path_buf(),
        entries,
        sha256,
    })
}

fn write_entries(
    partial: &Path,
    sources: Vec<(String, File)>,
    method: CompressionMethod,
) -> Result<(), PackagingError> {
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(DateTime::default());
    let mut zip = ZipWriter::new(BufWriter::new(File::create(partial)?));
    for (name, mut file) in sources {
        zip.start_file(name, options)?;
        io::copy(&mut file, &mut zip)?;
    }
    let mut writer = zip.finish()?;
    io::Write::flush(&mut writer)?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// `dir/stem.ext`, or `dir/stem_2.ext`, `dir/stem_3.ext`, ... if taken.
fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{stem}.{ext}"));
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| dir.join(format!("{stem}_{n}.{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// SHA-256 of a file's contents, returned as a hex string.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::templates::Template;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_pages(dir: &Path, names: &[&str]) -> Vec<String> {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
        names.iter().map(|n| n.to_string()).collect()
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn stale_collection_archive_is_removed() {
        let tmp = TempDir::new().unwrap();
        let packages = tmp.path().join("_zip_packages");
        fs::create_dir_all(&packages).unwrap();
        fs::write(packages.join("Kitty_bundle.zip"), b"old run").unwrap();

        let removed = remove_collection_archive("Kitty", &packages).unwrap();
        assert_eq!(removed, Some(packages.join("Kitty_bundle.zip")));
        assert!(!packages.join("Kitty_bundle.zip").exists());
        assert_eq!(remove_collection_archive("Kitty", &packages).unwrap(), None);
    }

    #[test]
    fn write_page_encodes_into_dir() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let page = RenderedPage {
            page_index: 0,
            template: Template::Cover,
            collection_slug: "Kitty".into(),
            raster: RgbaImage::from_pixel(12, 16, Rgba([255, 255, 255, 255])),
            output_filename: "01_cover_Kitty.jpg".into(),
            issues: vec![],
        };
        let dir = tmp.path().join("Kitty");
        let path = write_page(&backend, &page, &dir, Quality::new(80)).unwrap();

        assert_eq!(path, dir.join("01_cover_Kitty.jpg"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "12x16");
        assert_eq!(backend.encoded.lock().unwrap()[0].1, 80);
    }

    #[test]
    fn collection_archive_contains_pages_under_slug() {
        let tmp = TempDir::new().unwrap();
        let pages = tmp.path().join("Kitty");
        let names = write_pages(&pages, &["01_cover_Kitty.jpg", "02_grid1_Kitty.jpg"]);
        let packages = tmp.path().join("_zip_packages");

        let archive = package_collection("Kitty", &pages, &names, &packages).unwrap();

        assert_eq!(archive.info.path, packages.join("Kitty_bundle.zip"));
        assert!(archive.missing.is_empty());
        assert_eq!(
            entry_names(&archive.info.path),
            vec!["Kitty/01_cover_Kitty.jpg", "Kitty/02_grid1_Kitty.jpg"]
        );
        assert_eq!(archive.info.entries, entry_names(&archive.info.path));
        assert_eq!(archive.info.sha256.len(), 64);
        assert!(!packages.join("Kitty_bundle.zip.partial").exists());
    }

    #[test]
    fn missing_page_is_recorded_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let pages = tmp.path().join("Kitty");
        let mut names = write_pages(&pages, &["01_cover_Kitty.jpg"]);
        names.push("02_grid1_Kitty.jpg".into());

        let archive =
            package_collection("Kitty", &pages, &names, &tmp.path().join("zips")).unwrap();

        assert_eq!(archive.info.entries, vec!["Kitty/01_cover_Kitty.jpg"]);
        assert_eq!(archive.missing.len(), 1);
        assert_eq!(archive.missing[0].file_name, "02_grid1_Kitty.jpg");
    }

    #[test]
    fn no_pages_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = package_collection(
            "Kitty",
            tmp.path(),
            &["01_cover_Kitty.jpg".to_string()],
            &tmp.path().join("zips"),
        );
        assert!(matches!(result, Err(PackagingError::NoPages)));
        assert!(!tmp.path().join("zips/Kitty_bundle.zip").exists());
    }

    #[test]
    fn repackaging_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let pages = tmp.path().join("Kitty");
        let names = write_pages(&pages, &["01_cover_Kitty.jpg", "02_grid1_Kitty.jpg"]);

        let first = package_collection("Kitty", &pages, &names, &tmp.path().join("a")).unwrap();
        let second = package_collection("Kitty", &pages, &names, &tmp.path().join("b")).unwrap();

        assert_eq!(first.info.sha256, second.info.sha256);
    }

    #[test]
    fn repackaging_replaces_previous_archive() {
        let tmp = TempDir::new().unwrap();
        let pages = tmp.path().join("Kitty");
        let packages = tmp.path().join("zips");
        let names = write_pages(&pages, &["01_cover_Kitty.jpg"]);
        package_collection("Kitty", &pages, &names, &packages).unwrap();

        let names = write_pages(&pages, &["01_cover_Kitty.jpg", "02_grid1_Kitty.jpg"]);
        let archive = package_collection("Kitty", &pages, &names, &packages).unwrap();
        assert_eq!(entry_names(&archive.info.path).len(), 2);
    }

    #[test]
    fn aggregate_bundles_collection_archives() {
        let tmp = TempDir::new().unwrap();
        let packages = tmp.path().join("_zip_packages");
        let mut infos = Vec::new();
        for slug in ["Bunny", "Kitty"] {
            let pages = tmp.path().join(slug);
            let names = write_pages(&pages, &["01_cover.jpg"]);
            infos.push(package_collection(slug, &pages, &names, &packages).unwrap().info);
        }
        let refs: Vec<&ArchiveInfo> = infos.iter().collect();

        let aggregate = build_aggregate(&refs, &packages, "20250101_120000")
            .unwrap()
            .unwrap();

        assert_eq!(
            aggregate.path,
            packages.join(aggregate_archive_name("20250101_120000"))
        );
        assert_eq!(
            entry_names(&aggregate.path),
            vec!["Bunny_bundle.zip", "Kitty_bundle.zip"]
        );
    }

    #[test]
    fn aggregate_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let pages = tmp.path().join("Kitty");
        let names = write_pages(&pages, &["01_cover.jpg"]);
        let info = package_collection("Kitty", &pages, &names, tmp.path())
            .unwrap()
            .info;

        let first = build_aggregate(&[&info], tmp.path(), "ts").unwrap().unwrap();
        let second = build_aggregate(&[&info], tmp.path(), "ts").unwrap().unwrap();

        assert_eq!(first.path, tmp.path().join("aggregate_ts.zip"));
        assert_eq!(second.path, tmp.path().join("aggregate_ts_2.zip"));
    }

    #[test]
    fn aggregate_skipped_without_archives() {
        let tmp = TempDir::new().unwrap();
        assert!(build_aggregate(&[], tmp.path(), "ts").unwrap().is_none());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/out/a.b_bundle.zip")),
            PathBuf::from("/out/a.b_bundle.zip.partial")
        );
    }
}
