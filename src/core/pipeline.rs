//! Download, filter, mosaic and record zipped LiDAR archives.
//!
//! Each URL moves through download, member selection, per-product mosaic to COG and
//! archive deletion, in that order. The URL lands in the completed log only when the
//! archive was available and no product failed.
use std::fs;
use std::path::{Path, PathBuf};

use gdal::Dataset;
use tracing::{debug, info, warn};

use crate::core::params::ArchiveParams;
use crate::core::processed::ProcessedLog;
use crate::core::selection::MemberFilter;
use crate::error::{Error, Result};
use crate::io::{CogOptions, Fetcher, RasterArchive, RasterError, translate_to_cog};
use crate::types::{BatchReport, Outcome};

/// Archive file name: last path segment of the trimmed URL
pub fn archive_name(url: &str) -> Option<&str> {
    url.trim()
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

pub struct ArchivePipeline<'a, F: Fetcher> {
    fetcher: &'a F,
    params: &'a ArchiveParams,
    log: ProcessedLog,
}

impl<'a, F: Fetcher> ArchivePipeline<'a, F> {
    pub fn new(fetcher: &'a F, params: &'a ArchiveParams) -> Result<Self> {
        fs::create_dir_all(&params.output_dir)?;
        let log = ProcessedLog::open(params.log_path())?;
        Ok(Self {
            fetcher,
            params,
            log,
        })
    }

    pub fn log(&self) -> &ProcessedLog {
        &self.log
    }

    /// Process every URL in order; per-archive failures are recorded, not returned
    pub fn run(&mut self, urls: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        for url in urls {
            let outcome = self.process_url(url);
            match &outcome {
                Outcome::Processed => info!("Processed archive: {}", url),
                Outcome::Skipped(reason) => info!("Skipping {}: {}", url, reason),
                Outcome::Failed(reason) => warn!("Failed {}: {}", url, reason),
            }
            report.record(url.as_str(), outcome);
        }
        report
    }

    fn process_url(&mut self, url: &str) -> Outcome {
        if self.log.contains(url) {
            return Outcome::Skipped("already processed".to_string());
        }
        // Fail before downloading when the log cannot be recorded to
        if let Err(e) = self.log.refresh() {
            return Outcome::Failed(format!("completed log unavailable: {}", e));
        }
        if self.log.contains(url) {
            return Outcome::Skipped("processed by another run".to_string());
        }
        let Some(name) = archive_name(url) else {
            return Outcome::Failed("URL has no file name".to_string());
        };
        let zip_path = self.params.output_dir.join(name);

        if zip_path.exists() {
            info!("File already exists: {:?}. Skipping download.", zip_path);
        } else if let Err(e) = self.fetcher.fetch(url, &zip_path) {
            return Outcome::Failed(format!("download failed: {}", e));
        }

        let result = self.mosaic_archive(&zip_path);

        match fs::remove_file(&zip_path) {
            Ok(()) => info!("Deleted ZIP file: {:?}", zip_path),
            Err(e) => warn!("Error deleting file {:?}: {}", zip_path, e),
        }

        match result {
            Ok(failures) if failures.is_empty() => match self.log.insert(url) {
                Ok(_) => Outcome::Processed,
                Err(e) => Outcome::Failed(format!("could not record URL: {}", e)),
            },
            Ok(failures) => Outcome::Failed(failures.join("; ")),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    /// Write one COG per product marker; returns the per-marker failures
    fn mosaic_archive(&self, zip_path: &Path) -> Result<Vec<String>> {
        let mut archive = RasterArchive::open(zip_path)?;
        let names = archive.member_names();
        let stem = archive.stem();
        let mut failures = Vec::new();

        for marker in &self.params.markers {
            let filter =
                MemberFilter::new(marker, &self.params.member_extension, &self.params.exclude);
            let members = filter.select(&names);
            if members.is_empty() {
                info!("No files found in {} folder within {:?}", marker, zip_path);
                continue;
            }
            debug!("{} members for {}: {:?}", members.len(), marker, members);

            let output = cog_path(&self.params.output_dir, &stem, marker.as_str());
            if let Err(e) = mosaic_members(&mut archive, &members, &output, &self.params.cog) {
                warn!("Failed to build {:?}: {}", output, e);
                failures.push(format!("{}: {}", marker, e));
            }
        }
        Ok(failures)
    }
}

fn cog_path(output_dir: &Path, stem: &str, marker: &str) -> PathBuf {
    output_dir.join(format!("{}_{}.tif", stem, marker))
}

fn mosaic_members(
    archive: &mut RasterArchive,
    members: &[String],
    output: &Path,
    options: &CogOptions,
) -> Result<()> {
    let buffers = archive.buffer_members(members)?;
    let sources = buffers
        .iter()
        .map(|b| b.open())
        .collect::<std::result::Result<Vec<Dataset>, RasterError>>()?;
    translate_to_cog(&sources, output, options).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs::File;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    struct FakeFetcher {
        calls: Cell<usize>,
        fail: bool,
    }

    impl FakeFetcher {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
            }
        }
    }

    impl Fetcher for FakeFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(Error::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                });
            }
            // Archive without any DSM/DTM grids
            let mut zip = zip::ZipWriter::new(File::create(dest)?);
            zip.start_file("Site/readme.txt", SimpleFileOptions::default())?;
            zip.write_all(b"no grids")?;
            zip.finish()?;
            Ok(())
        }
    }

    fn params(dir: &Path) -> ArchiveParams {
        ArchiveParams {
            output_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn archive_name_is_last_segment() {
        assert_eq!(
            archive_name(" https://host/lpslidar/Omagh_23_05_2004.zip\n"),
            Some("Omagh_23_05_2004.zip")
        );
        assert_eq!(archive_name("https://host/dir/"), None);
    }

    #[test]
    fn logged_url_is_never_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://host/lidar/Omagh.zip";
        fs::write(dir.path().join("logfile.txt"), format!("{}\n", url)).unwrap();
        let fetcher = FakeFetcher::new(false);
        let params = params(dir.path());
        let mut pipeline = ArchivePipeline::new(&fetcher, &params).unwrap();

        let report = pipeline.run(&[url.to_string()]);
        assert_eq!(fetcher.calls.get(), 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn whitespace_variant_is_not_a_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logfile.txt"), "https://host/lidar/Omagh.zip\n").unwrap();
        let fetcher = FakeFetcher::new(false);
        let params = params(dir.path());
        let mut pipeline = ArchivePipeline::new(&fetcher, &params).unwrap();

        let report = pipeline.run(&["https://host/lidar/Omagh.zip ".to_string()]);
        assert_eq!(fetcher.calls.get(), 1);
        assert_eq!(report.processed, 1);
    }

    #[test]
    fn failed_download_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(true);
        let params = params(dir.path());
        let mut pipeline = ArchivePipeline::new(&fetcher, &params).unwrap();

        let report = pipeline.run(&["https://host/lidar/Gone.zip".to_string()]);
        assert_eq!(report.errors, 1);
        assert!(pipeline.log().is_empty());
        assert!(!dir.path().join("logfile.txt").exists());
        assert!(!dir.path().join("Gone.zip").exists());
    }

    #[test]
    fn archive_without_products_is_logged_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(false);
        let params = params(dir.path());
        let mut pipeline = ArchivePipeline::new(&fetcher, &params).unwrap();
        let url = "https://host/lidar/Empty.zip".to_string();

        let report = pipeline.run(&[url.clone(), url.clone()]);
        assert_eq!((report.processed, report.skipped), (1, 1));
        assert_eq!(fetcher.calls.get(), 1);
        assert!(!dir.path().join("Empty.zip").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("logfile.txt")).unwrap(),
            format!("{}\n", url)
        );
    }

    #[test]
    fn held_log_lock_fails_before_download() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logfile.txt.lock"), "4242\n").unwrap();
        let fetcher = FakeFetcher::new(false);
        let params = params(dir.path());
        let mut pipeline = ArchivePipeline::new(&fetcher, &params).unwrap();

        let report = pipeline.run(&["https://host/lidar/Omagh.zip".to_string()]);
        assert_eq!(fetcher.calls.get(), 0);
        assert_eq!(report.errors, 1);
        assert!(!dir.path().join("Omagh.zip").exists());
        assert!(!dir.path().join("logfile.txt").exists());
    }

    #[test]
    fn url_logged_by_another_run_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(false);
        let params = params(dir.path());
        let mut pipeline = ArchivePipeline::new(&fetcher, &params).unwrap();
        let url = "https://host/lidar/Omagh.zip";
        fs::write(dir.path().join("logfile.txt"), format!("{}\n", url)).unwrap();

        let report = pipeline.run(&[url.to_string()]);
        assert_eq!(fetcher.calls.get(), 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn corrupt_existing_archive_fails_and_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Bad.zip"), b"truncated").unwrap();
        let fetcher = FakeFetcher::new(false);
        let params = params(dir.path());
        let mut pipeline = ArchivePipeline::new(&fetcher, &params).unwrap();

        let report = pipeline.run(&["https://host/lidar/Bad.zip".to_string()]);
        assert_eq!(fetcher.calls.get(), 0);
        assert_eq!(report.errors, 1);
        assert!(!dir.path().join("Bad.zip").exists());
        assert!(pipeline.log().is_empty());
    }
}
