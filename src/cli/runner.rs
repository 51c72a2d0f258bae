use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lidarkit::api::{self, BatchReport};
use lidarkit::core::params::{AnalyzeParams, Settings};
use lidarkit::core::report::render_table;
use lidarkit::io::HttpFetcher;
use lidarkit::io::writers::table::{save_markdown, save_text};

use super::args::{
    CatalogArgs, CliArgs, Command, ConvertArgs, FetchArgs, ReencodeArgs, StatsArgs,
    UpdateSizesArgs, ValidateArgs,
};
use super::errors::AppError;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn init_logging(debug: bool) {
    // `--log` wins over RUST_LOG; otherwise RUST_LOG or info
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn log_batch(job: &str, report: &BatchReport) {
    info!("{} complete!", job);
    info!("Processed: {}", report.processed);
    info!("Skipped: {}", report.skipped);
    info!("Errors: {}", report.errors);
    for entry in report.failures() {
        warn!("{}: {}", entry.input, entry.outcome);
    }
}

fn resolve_inputs(
    inputs: Vec<PathBuf>,
    input_dir: Option<&Path>,
    extension: &str,
) -> Result<Vec<PathBuf>, AppError> {
    match (inputs.is_empty(), input_dir) {
        (true, None) => Err(AppError::MissingArgument {
            arg: "<INPUTS> or --input-dir".to_string(),
        }),
        (false, Some(dir)) => Err(AppError::ConflictingArguments {
            first: "<INPUTS>".to_string(),
            second: format!("--input-dir {}", dir.display()),
        }),
        (false, None) => Ok(inputs),
        (true, Some(dir)) => Ok(api::collect_rasters(dir, extension)?),
    }
}

fn run_stats(args: StatsArgs, settings: &Settings) -> CliResult {
    let params = match args.layout {
        Some(layout) => AnalyzeParams {
            extension: settings.analyze.extension.clone(),
            ..AnalyzeParams::for_layout(layout)
        },
        None => settings.analyze.clone(),
    };
    let paths = resolve_inputs(args.inputs, args.input_dir.as_deref(), &params.extension)?;
    info!("Analyzing {} raster(s)", paths.len());

    let report = api::analyze_rasters(&paths, &params);
    println!("{}", render_table(params.layout, &report.summaries));

    if let Some(path) = &args.markdown {
        save_markdown(path, params.layout, &report.summaries)?;
    }
    if let Some(path) = &args.text {
        save_text(path, params.layout, &report.summaries)?;
    }
    log_batch("Analysis", &report.batch);
    Ok(())
}

fn run_convert(args: ConvertArgs, settings: &Settings) -> CliResult {
    let mut params = settings.convert.clone();
    if let Some(divisor) = args.divisor {
        params.calc.divisor = divisor;
    }
    if let Some(nodata) = args.nodata {
        params.calc.nodata = nodata;
    }
    if let Some(compression) = args.compression {
        params.cog.compression = compression;
    }
    let paths = resolve_inputs(args.inputs, args.input_dir.as_deref(), "tif")?;
    info!("Output directory: {:?}", args.output_dir);

    let report = api::convert_rasters(&paths, &args.output_dir, &params, args.continue_on_error)?;
    log_batch("Conversion", &report);
    Ok(())
}

fn run_reencode(args: ReencodeArgs, settings: &Settings) -> CliResult {
    let mut params = settings.reencode.clone();
    if let Some(compression) = args.compression {
        params.cog.compression = compression;
    }
    match args.target_crs.as_deref() {
        Some(crs) if crs.eq_ignore_ascii_case("none") => params.cog.target_crs = None,
        Some(crs) => params.cog.target_crs = Some(crs.to_string()),
        None => {}
    }
    let paths = api::collect_rasters(&args.input_dir, &params.extension)?;
    info!("Re-encoding {} raster(s) from {:?}", paths.len(), args.input_dir);

    let report = api::reencode_rasters(&paths, &args.output_dir, &params, args.continue_on_error)?;
    log_batch("Re-encode", &report);
    Ok(())
}

fn run_fetch(args: FetchArgs, settings: &Settings) -> CliResult {
    let mut params = settings.archive.clone();
    if let Some(dir) = args.output_dir {
        params.output_dir = dir;
    }
    if args.log_file.is_some() {
        params.log_file = args.log_file;
    }
    if !args.markers.is_empty() {
        params.markers = args.markers;
    }
    if let Some(exclude) = args.exclude {
        params.exclude = exclude;
    }

    let mut urls = args.urls;
    if let Some(file) = &args.urls_file {
        urls.extend(api::read_url_list(file)?);
    }
    if urls.is_empty() {
        return Err(AppError::MissingArgument {
            arg: "<URLS> or --urls-file".to_string(),
        }
        .into());
    }

    let fetcher = HttpFetcher::new()?;
    let report = api::process_archives(&urls, &params, &fetcher)?;
    log_batch("Archive processing", &report);
    Ok(())
}

fn run_catalog(args: CatalogArgs, settings: &Settings) -> CliResult {
    let mut params = settings.catalog.clone();
    if args.catalog_url.is_some() {
        params.catalog_url = args.catalog_url;
    }
    if args.local_prefix.is_some() {
        params.local_prefix = args.local_prefix;
    }
    if args.public_prefix.is_some() {
        params.public_prefix = args.public_prefix;
    }
    if args.text_rewrite {
        params.text_rewrite = true;
    }
    if let Some(epsg) = args.epsg {
        params.epsg = epsg;
    }

    let report = api::build_catalog(&args.geotiff_folder, &args.base_url, &args.output, &params)?;
    info!(
        "STAC catalog created at {:?}: {} item(s), {} file(s)",
        args.output,
        report.tree.items.len(),
        report.written.len()
    );
    if let Some(rewrite) = report.rewrite {
        info!(
            "Text rewrite: {} scanned, {} updated, {} errors",
            rewrite.scanned, rewrite.updated, rewrite.errors
        );
    }
    info!(
        "All asset hrefs point to base URL: {}",
        args.base_url.trim_end_matches('/')
    );
    log_batch("Catalog", &report.batch);
    Ok(())
}

fn run_update_sizes(args: UpdateSizesArgs) -> CliResult {
    let updated = api::update_file_sizes(&args.json_file, &args.sizes_file, &args.output_file)?;
    info!("{} entr(ies) updated", updated);
    Ok(())
}

fn run_validate(args: ValidateArgs, settings: &Settings) -> CliResult {
    let mut params = settings.validate.clone();
    if let Some(program) = args.validator {
        params.program = program;
    }
    if !args.validator_args.is_empty() {
        params.args = args.validator_args;
    }
    let summary = api::validate_directory(&args.directory, &args.output_log, &params)?;
    info!(
        "Validated {} file(s), {} reported problems",
        summary.files, summary.failed
    );
    Ok(())
}

pub fn run(args: CliArgs) -> CliResult {
    init_logging(args.log);

    let settings = match &args.config {
        Some(path) => {
            info!("Loading settings from {:?}", path);
            Settings::load(path).map_err(AppError::from)?
        }
        None => Settings::default(),
    };

    match args.command {
        Command::Stats(a) => run_stats(a, &settings),
        Command::Convert(a) => run_convert(a, &settings),
        Command::Reencode(a) => run_reencode(a, &settings),
        Command::Fetch(a) => run_fetch(a, &settings),
        Command::Catalog(a) => run_catalog(a, &settings),
        Command::UpdateSizes(a) => run_update_sizes(a),
        Command::Validate(a) => run_validate(a, &settings),
    }
}
