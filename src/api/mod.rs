//! High-level, ergonomic library API: one entry point per batch job (analysis reports,
//! COG conversion, archive mosaicking, STAC catalogs, size backfill and validation).
//! Prefer these over the low-level `core` and `io` modules when integrating lidarkit.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::core::catalog::{CatalogTree, Item};
use crate::core::params::{
    AnalyzeParams, ArchiveParams, CatalogParams, ConvertParams, ReencodeParams, ValidateParams,
};
use crate::core::pipeline::ArchivePipeline;
use crate::core::report::RasterSummary;
use crate::core::sizes::{apply_sizes, parse_manifest, parse_sizes};
use crate::error::{Error, Result};
use crate::io::writers::catalog::{RewriteSummary, rewrite_prefix_in_files, write_catalog};
use crate::io::writers::validation::ValidationLog;
use crate::io::{Fetcher, RasterReader, reencode_file};
pub use crate::types::{BatchEntry, BatchReport, Outcome};

/// Files in `dir` (non-recursive) whose extension is `extension`, sorted by path
pub fn collect_rasters(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Result of an analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub summaries: Vec<RasterSummary>,
    pub batch: BatchReport,
}

fn summarize(path: &Path, params: &AnalyzeParams) -> Result<std::result::Result<RasterSummary, String>> {
    let reader = RasterReader::open(path)?;
    if params.require_single_band && reader.info.bands != 1 {
        return Ok(Err(format!(
            "has {} bands, expected 1",
            reader.info.bands
        )));
    }
    let stats = if params.compute_statistics {
        Some(reader.statistics()?)
    } else {
        None
    };
    Ok(Ok(RasterSummary::from_info(&reader.info, stats)))
}

/// Read metadata (and statistics) of each raster; unreadable files are recorded, not fatal
pub fn analyze_rasters(paths: &[PathBuf], params: &AnalyzeParams) -> AnalysisReport {
    let mut report = AnalysisReport::default();
    for path in paths {
        let name = path.display().to_string();
        match summarize(path, params) {
            Ok(Ok(summary)) => {
                debug!("{}: min={:?} max={:?}", summary.filename, summary.min, summary.max);
                report.summaries.push(summary);
                report.batch.record(name, Outcome::Processed);
            }
            Ok(Err(reason)) => {
                warn!("Skipping {}: {}", name, reason);
                report.batch.record(name, Outcome::Skipped(reason));
            }
            Err(e) => {
                error!("Error processing {}: {}", name, e);
                report.batch.record(name, Outcome::Failed(e.to_string()));
            }
        }
    }
    if params.sort {
        report
            .summaries
            .sort_by(|a, b| a.filename.cmp(&b.filename));
    }
    report
}

fn file_stem(input: &Path) -> Result<String> {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidArgument {
            arg: "input",
            value: input.display().to_string(),
        })
}

/// Rescale one raster and write `<stem><suffix>.tif` as COG into `output_dir`
pub fn convert_raster(input: &Path, output_dir: &Path, params: &ConvertParams) -> Result<PathBuf> {
    let stem = file_stem(input)?;
    let output = output_dir.join(format!("{}{}.tif", stem, params.output_suffix));
    // Intermediate lives next to the outputs and goes away with the guard
    let scratch = tempfile::Builder::new()
        .prefix(".convert_")
        .tempdir_in(output_dir)?;
    let intermediate = scratch.path().join(format!("{}_temp.tif", stem));

    info!("Processing {:?}...", input);
    params.calc.run(input, &intermediate)?;
    reencode_file(&intermediate, &output, &params.cog)?;
    info!("Created COG file: {:?}", output);
    Ok(output)
}

/// Rescale and convert each raster.
/// If `continue_on_error` is false the first failure is returned; otherwise it is recorded.
pub fn convert_rasters(
    paths: &[PathBuf],
    output_dir: &Path,
    params: &ConvertParams,
    continue_on_error: bool,
) -> Result<BatchReport> {
    fs::create_dir_all(output_dir)?;
    let mut report = BatchReport::default();
    for input in paths {
        match convert_raster(input, output_dir, params) {
            Ok(_) => report.record(input.display().to_string(), Outcome::Processed),
            Err(e) => {
                error!("Failed to convert {:?}: {}", input, e);
                if !continue_on_error {
                    return Err(e);
                }
                report.record(input.display().to_string(), Outcome::Failed(e.to_string()));
            }
        }
    }
    Ok(report)
}

/// Re-encode each raster as COG under the same file name in `output_dir`
pub fn reencode_rasters(
    paths: &[PathBuf],
    output_dir: &Path,
    params: &ReencodeParams,
    continue_on_error: bool,
) -> Result<BatchReport> {
    fs::create_dir_all(output_dir)?;
    let mut report = BatchReport::default();
    for input in paths {
        let Some(name) = input.file_name() else {
            report.record(
                input.display().to_string(),
                Outcome::Skipped("no file name".to_string()),
            );
            continue;
        };
        let output = output_dir.join(name);
        if output == *input {
            report.record(
                input.display().to_string(),
                Outcome::Skipped("output would overwrite input".to_string()),
            );
            continue;
        }
        match reencode_file(input, &output, &params.cog) {
            Ok(()) => report.record(input.display().to_string(), Outcome::Processed),
            Err(e) => {
                error!("Failed to re-encode {:?}: {}", input, e);
                if !continue_on_error {
                    return Err(e.into());
                }
                report.record(input.display().to_string(), Outcome::Failed(e.to_string()));
            }
        }
    }
    Ok(report)
}

/// Read a URL list: one URL per line, blank lines and `#` comments ignored
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Download, mosaic and record each archive URL
pub fn process_archives<F: Fetcher>(
    urls: &[String],
    params: &ArchiveParams,
    fetcher: &F,
) -> Result<BatchReport> {
    let mut pipeline = ArchivePipeline::new(fetcher, params)?;
    info!(
        "{} URL(s) queued, {} already in {:?}",
        urls.len(),
        pipeline.log().len(),
        pipeline.log().path()
    );
    Ok(pipeline.run(urls))
}

/// Result of a catalog build
#[derive(Debug)]
pub struct CatalogReport {
    pub tree: CatalogTree,
    pub written: Vec<PathBuf>,
    pub batch: BatchReport,
    /// Hrefs rebased before writing
    pub rebased: usize,
    /// Set when the textual rewrite ran
    pub rewrite: Option<RewriteSummary>,
}

/// Build a STAC catalog over the `*.tif` files in `geotiff_dir` and write it to `output_dir`
pub fn build_catalog(
    geotiff_dir: &Path,
    base_url: &str,
    output_dir: &Path,
    params: &CatalogParams,
) -> Result<CatalogReport> {
    let rewrite = match (&params.local_prefix, &params.public_prefix) {
        (Some(from), Some(to)) => Some((from.as_str(), to.as_str())),
        (None, None) => None,
        (Some(_), None) => {
            return Err(Error::MissingArgument {
                arg: "public_prefix".to_string(),
            });
        }
        (None, Some(_)) => {
            return Err(Error::MissingArgument {
                arg: "local_prefix".to_string(),
            });
        }
    };
    let rasters = collect_rasters(geotiff_dir, "tif")?;
    fs::create_dir_all(output_dir)?;
    let root_href = match &params.catalog_url {
        Some(url) => url.clone(),
        None => std::path::absolute(output_dir)?.display().to_string(),
    };

    let mut tree = CatalogTree::new(params, &root_href, Utc::now());
    let mut batch = BatchReport::default();
    for path in &rasters {
        let name = path.display().to_string();
        let item = RasterReader::open(path)
            .map_err(Error::from)
            .and_then(|reader| Item::from_raster(&reader.info, base_url, params, Utc::now()));
        match item {
            Ok(item) => {
                debug!("Added item {}", item.id);
                tree.add_item(item);
                batch.record(name, Outcome::Processed);
            }
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                batch.record(name, Outcome::Skipped(e.to_string()));
            }
        }
    }

    let mut rebased = 0;
    if let Some((from, to)) = rewrite.filter(|_| !params.text_rewrite) {
        rebased = tree.rebase_hrefs(from, to);
        info!("Rebased {} href(s) from {} to {}", rebased, from, to);
    }
    let written = write_catalog(&tree, output_dir)?;
    let rewrite = match rewrite.filter(|_| params.text_rewrite) {
        Some((from, to)) => {
            let summary = rewrite_prefix_in_files(output_dir, from, to)?;
            info!(
                "Path replacement completed: {} of {} file(s) updated",
                summary.updated, summary.scanned
            );
            Some(summary)
        }
        None => None,
    };

    Ok(CatalogReport {
        tree,
        written,
        batch,
        rebased,
        rewrite,
    })
}

/// Set `fileSize` on manifest entries from a size listing; returns entries updated
pub fn update_file_sizes(json_file: &Path, sizes_file: &Path, output_file: &Path) -> Result<usize> {
    let mut manifest = parse_manifest(&fs::read_to_string(json_file)?)?;
    let sizes = parse_sizes(&fs::read_to_string(sizes_file)?)?;
    let updated = apply_sizes(&mut manifest, &sizes)?;
    fs::write(output_file, serde_json::to_string_pretty(&manifest)?)?;
    info!("Updated JSON data written to {:?} ({} entries)", output_file, updated);
    Ok(updated)
}

/// Counts from a validation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub files: usize,
    /// Nonzero exits, signals and spawn failures
    pub failed: usize,
}

/// Run the validator on every regular file in `directory`, logging to `output_log`
pub fn validate_directory(
    directory: &Path,
    output_log: &Path,
    params: &ValidateParams,
) -> Result<ValidationSummary> {
    if !directory.is_dir() {
        return Err(Error::DirectoryNotFound {
            path: directory.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let out = std::io::BufWriter::new(fs::File::create(output_log)?);
    let mut log = ValidationLog::new(out);
    log.header(
        chrono::Local::now().naive_local(),
        &std::path::absolute(directory)?,
    )?;

    let mut summary = ValidationSummary::default();
    if files.is_empty() {
        log.no_files()?;
        log.finish()?;
        info!("No files found in the directory.");
        return Ok(summary);
    }

    let validator = params.display_name().to_string();
    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Validating: {}", file_name);
        log.validating(&file_name)?;
        summary.files += 1;

        match Command::new(&params.program)
            .args(&params.args)
            .arg(path)
            .output()
        {
            Ok(output) => {
                if !output.status.success() {
                    summary.failed += 1;
                }
                log.result(
                    output.status.code(),
                    &String::from_utf8_lossy(&output.stdout),
                    &String::from_utf8_lossy(&output.stderr),
                )?;
            }
            Err(e) => {
                warn!("Error with {}: {}", file_name, e);
                summary.failed += 1;
                log.spawn_error(&validator, &e)?;
            }
        }
    }
    log.completed()?;
    info!("Validation completed. Results saved to {:?}", output_log);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_is_sorted_and_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.tif"), b"").unwrap();
        fs::write(dir.path().join("a.tif"), b"").unwrap();
        fs::write(dir.path().join("c.tiff"), b"").unwrap();
        fs::create_dir(dir.path().join("nested.tif")).unwrap();
        let files = collect_rasters(dir.path(), ".tif").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.tif", "b.tif"]);
    }

    #[test]
    fn unreadable_raster_is_recorded_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.tif");
        fs::write(&bogus, b"not a tiff").unwrap();
        let report = analyze_rasters(&[bogus], &AnalyzeParams::default());
        assert!(report.summaries.is_empty());
        assert_eq!(report.batch.errors, 1);
    }

    #[test]
    fn convert_is_fail_fast_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let params = ConvertParams {
            calc: crate::io::RasterCalc {
                program: "lidarkit-no-such-calc".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let inputs = vec![dir.path().join("a.tif"), dir.path().join("b.tif")];
        let out = dir.path().join("out");
        assert!(convert_rasters(&inputs, &out, &params, false).is_err());

        let report = convert_rasters(&inputs, &out, &params, true).unwrap();
        assert_eq!(report.errors, 2);
        // Scratch directories are gone
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn converted_raster_is_named_after_its_stem() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Omagh_DSM.tif");
        let driver = gdal::DriverManager::get_driver_by_name("GTiff").unwrap();
        let mut ds = driver
            .create_with_band_type::<f32, _>(&input, 2, 2, 1)
            .unwrap();
        ds.set_geo_transform(&[300000.0, 1.0, 0.0, 400000.0, 0.0, -1.0])
            .unwrap();
        drop(ds);

        // Stand-in calculator: copy `-A <input>` to `--outfile <output>`
        let calc = dir.path().join("calc.sh");
        fs::write(&calc, "#!/bin/sh\ncp \"$2\" \"$4\"\n").unwrap();
        fs::set_permissions(&calc, fs::Permissions::from_mode(0o755)).unwrap();
        let params = ConvertParams {
            calc: crate::io::RasterCalc {
                program: calc.display().to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let out = dir.path().join("out");
        let report = convert_rasters(&[input], &out, &params, false).unwrap();
        assert_eq!(report.processed, 1);
        let names: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Omagh_DSM_processed.tif"]);
        let reader = RasterReader::open(out.join("Omagh_DSM_processed.tif")).unwrap();
        assert_eq!(reader.info.compression.as_deref(), Some("LZW"));
    }

    #[test]
    fn url_list_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        fs::write(&path, "# lpslidar\nhttps://host/a.zip\n\n  \nhttps://host/b.zip\n").unwrap();
        assert_eq!(
            read_url_list(&path).unwrap(),
            vec!["https://host/a.zip", "https://host/b.zip"]
        );
    }

    #[test]
    fn size_backfill_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("data.json");
        let sizes = dir.path().join("sizes.txt");
        let out = dir.path().join("out.json");
        fs::write(
            &json,
            "{\"downloadUrl\": \"/some/path\", \"fileSize\": \"1\"}\n {\"downloadUrl\": \"/x\"}",
        )
        .unwrap();
        fs::write(&sizes, "1234, '/some/path'\n").unwrap();

        assert_eq!(update_file_sizes(&json, &sizes, &out).unwrap(), 1);
        let written = fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("[\n  {\n    \"downloadUrl\": \"/some/path\",\n    \"fileSize\": \"1234\"\n  },"));
    }

    #[test]
    fn catalog_requires_both_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let params = CatalogParams {
            local_prefix: Some("/Users/a/".to_string()),
            ..Default::default()
        };
        let err = build_catalog(dir.path(), "https://x", &dir.path().join("stac"), &params)
            .unwrap_err();
        assert!(matches!(err, Error::MissingArgument { .. }));
    }

    #[test]
    fn missing_validation_directory_writes_no_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("validation.log");
        let err = validate_directory(&dir.path().join("absent"), &log, &ValidateParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound { .. }));
        assert!(!log.exists());
    }

    #[test]
    fn empty_validation_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cogs");
        fs::create_dir(&target).unwrap();
        let log = dir.path().join("validation.log");
        let summary = validate_directory(&target, &log, &ValidateParams::default()).unwrap();
        assert_eq!(summary.files, 0);
        let text = fs::read_to_string(&log).unwrap();
        assert!(text.starts_with("Validation Log - "));
        assert!(text.ends_with(&format!("{}\n\nNo files found in the directory.\n", "=".repeat(60))));
        assert!(!text.contains("Validation completed."));
    }

    #[cfg(unix)]
    #[test]
    fn validator_output_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cogs");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("b.tif"), b"").unwrap();
        fs::write(target.join("a.tif"), b"").unwrap();
        let log = dir.path().join("validation.log");
        let params = ValidateParams {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "case \"$0\" in *a.tif) echo ok;; *) echo bad >&2; exit 3;; esac".to_string(),
            ],
        };

        let summary = validate_directory(&target, &log, &params).unwrap();
        assert_eq!(summary, ValidationSummary { files: 2, failed: 1 });
        let text = fs::read_to_string(&log).unwrap();
        let a = text.find("Validating: a.tif\nReturn code: 0\nSTDOUT:\nok\nSTDERR:\nNo errors\n");
        let b = text.find("Validating: b.tif\nReturn code: 3\nSTDOUT:\nNo output\nSTDERR:\nbad\n");
        assert!(a.is_some() && b.is_some());
        assert!(a < b);
        assert!(text.ends_with("Validation completed.\n"));
    }

    #[test]
    fn missing_validator_is_logged_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cogs");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("a.tif"), b"").unwrap();
        let log = dir.path().join("validation.log");
        let params = ValidateParams {
            program: "lidarkit-no-such-validator".to_string(),
            args: vec!["validate.py".to_string()],
        };
        let summary = validate_directory(&target, &log, &params).unwrap();
        assert_eq!(summary.failed, 1);
        let text = fs::read_to_string(&log).unwrap();
        assert!(text.contains("Validating: a.tif\nError executing validate.py: "));
        assert!(text.ends_with("Validation completed.\n"));
    }
}
