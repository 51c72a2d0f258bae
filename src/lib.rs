#![doc = r#"
lidarkit — batch tooling for LiDAR elevation rasters.

This crate provides a typed API over the jobs that maintain a public archive of LiDAR
derived DSM/DTM rasters: statistics reports, Cloud-Optimized GeoTIFF conversion,
download-and-mosaic of zipped ASCII grid archives, static STAC catalogs, a JSON size
backfill and a validation runner. It powers the `lidarkit` CLI and can be embedded in
your own Rust applications. All raster work is done by GDAL.

Requirements
------------
- GDAL development headers and runtime available on your system.
- `gdal_calc.py` on `PATH` for the rescale conversion.
- Rust 2024 edition toolchain.

Quick start: statistics table
-----------------------------
```rust,no_run
use std::path::Path;
use lidarkit::{analyze_rasters, collect_rasters, AnalyzeParams, TableLayout};
use lidarkit::core::report::render_table;

fn main() -> lidarkit::Result<()> {
    let params = AnalyzeParams::for_layout(TableLayout::Stats);
    let paths = collect_rasters(Path::new("/data/lidar"), "tif")?;
    let report = analyze_rasters(&paths, &params);
    println!("{}", render_table(params.layout, &report.summaries));
    Ok(())
}
```

Archive download and mosaic
---------------------------
```rust,no_run
use std::path::PathBuf;
use lidarkit::{process_archives, ArchiveParams, HttpFetcher};

fn main() -> lidarkit::Result<()> {
    let params = ArchiveParams {
        output_dir: PathBuf::from("processed"),
        ..Default::default()
    };
    let urls = vec!["https://opendatani.blob.core.windows.net/lpslidar/Omagh_23_05_2004.zip".to_string()];
    let report = process_archives(&urls, &params, &HttpFetcher::new()?)?;
    println!("processed={} skipped={} errors={}", report.processed, report.skipped, report.errors);
    Ok(())
}
```

STAC catalog
------------
```rust,no_run
use std::path::Path;
use lidarkit::{build_catalog, CatalogParams};

fn main() -> lidarkit::Result<()> {
    let params = CatalogParams {
        local_prefix: Some("/Users/me/Downloads/".to_string()),
        public_prefix: Some("https://better-open-data.com/".to_string()),
        ..Default::default()
    };
    build_catalog(
        Path::new("lidar"),
        "https://better-open-data.com/lidar",
        Path::new("stac-catalog"),
        &params,
    )?;
    Ok(())
}
```

Error handling
--------------
All public functions return `lidarkit::Result<T>`; match on `lidarkit::Error` to handle
specific cases. Batch jobs record per-file failures in a `BatchReport` instead of
returning them.

```rust,no_run
use std::path::Path;
use lidarkit::{validate_directory, Error, ValidateParams};

fn main() {
    match validate_directory(Path::new("cogs"), Path::new("validation.log"), &ValidateParams::default()) {
        Ok(summary) => println!("{} files, {} failed", summary.files, summary.failed),
        Err(Error::DirectoryNotFound { path }) => eprintln!("no such directory: {}", path.display()),
        Err(other) => eprintln!("Other error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`] — high-level entry points, one per batch job.
- [`core`] — parameters, report rendering, archive pipeline, STAC model.
- [`io`] — GDAL reader, COG writer, zip and HTTP plumbing, file writers.
- [`types`] — shared enums and the batch report.
- [`error`] — crate-level `Error` and `Result`.
"#]

pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::params::{
    AnalyzeParams, ArchiveParams, CatalogParams, ConvertParams, ReencodeParams, Settings,
    ValidateParams,
};
pub use crate::error::{Error, Result};
pub use types::{BatchEntry, BatchReport, Compression, Outcome, ProductMarker, TableLayout};

// Readers and fetchers
pub use io::{CogOptions, Fetcher, HttpFetcher, RasterError, RasterInfo, RasterReader};

// High-level API re-exports
pub use api::{
    AnalysisReport, CatalogReport, ValidationSummary, analyze_rasters, build_catalog,
    collect_rasters, convert_raster, convert_rasters, process_archives, read_url_list,
    reencode_rasters, update_file_sizes, validate_directory,
};
