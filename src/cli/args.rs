use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use lidarkit::{Compression, ProductMarker, TableLayout};

#[derive(Parser)]
#[command(name = "lidarkit", version, about = "lidarkit CLI")]
pub struct CliArgs {
    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    /// JSON settings file; explicit flags override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print metadata and statistics of GeoTIFFs as a table
    Stats(StatsArgs),
    /// Rescale rasters with gdal_calc.py and write them as COGs
    Convert(ConvertArgs),
    /// Re-encode GeoTIFFs as COGs with statistics and a forced CRS
    Reencode(ReencodeArgs),
    /// Download zipped ASCII grids and mosaic each product to a COG
    Fetch(FetchArgs),
    /// Create a static STAC catalog from a folder of GeoTIFFs
    Catalog(CatalogArgs),
    /// Backfill `fileSize` in a JSON manifest from a size listing
    UpdateSizes(UpdateSizesArgs),
    /// Run a validator on every file of a directory and log the results
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct StatsArgs {
    /// Input rasters
    pub inputs: Vec<PathBuf>,

    /// Directory scanned (non-recursively) for rasters
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Table layout (stats, detailed or pixel-size)
    #[arg(long, value_enum)]
    pub layout: Option<TableLayout>,

    /// Also save the table as Markdown
    #[arg(long)]
    pub markdown: Option<PathBuf>,

    /// Also save the table as plain text
    #[arg(long)]
    pub text: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Input rasters
    pub inputs: Vec<PathBuf>,

    /// Directory scanned (non-recursively) for `*.tif`
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Value every pixel is divided by
    #[arg(long)]
    pub divisor: Option<f64>,

    /// NoData value of the output
    #[arg(long)]
    pub nodata: Option<f64>,

    /// COG compression (deflate, lzw, zstd, none)
    #[arg(long, value_enum)]
    pub compression: Option<Compression>,

    /// Record failures and keep going instead of stopping at the first one
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,
}

#[derive(Args)]
pub struct ReencodeArgs {
    /// Directory of GeoTIFFs to re-encode
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// COG compression (deflate, lzw, zstd, none)
    #[arg(long, value_enum)]
    pub compression: Option<Compression>,

    /// Output CRS assigned to every file (e.g. EPSG:29902); "none" keeps the input CRS
    #[arg(long)]
    pub target_crs: Option<String>,

    /// Record failures and keep going instead of stopping at the first one
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Archive URLs
    pub urls: Vec<String>,

    /// File with one URL per line
    #[arg(long)]
    pub urls_file: Option<PathBuf>,

    /// Download and output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Completed-URL log (default: <output-dir>/logfile.txt)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Products to mosaic (repeatable)
    #[arg(long = "marker", value_enum)]
    pub markers: Vec<ProductMarker>,

    /// Members containing this text are ignored
    #[arg(long)]
    pub exclude: Option<String>,
}

#[derive(Args)]
pub struct CatalogArgs {
    /// Folder containing the GeoTIFF files
    pub geotiff_folder: PathBuf,

    /// Base URL where the GeoTIFFs will be hosted
    pub base_url: String,

    /// Output directory for the STAC catalog
    #[arg(long, default_value = "stac-catalog")]
    pub output: PathBuf,

    /// Published URL of the catalog root (default: the output directory)
    #[arg(long)]
    pub catalog_url: Option<String>,

    /// Href prefix to replace
    #[arg(long)]
    pub local_prefix: Option<String>,

    /// Replacement for --local-prefix
    #[arg(long)]
    pub public_prefix: Option<String>,

    /// Replace the prefix as plain text in every written file, not only in hrefs
    #[arg(long, default_value_t = false)]
    pub text_rewrite: bool,

    /// EPSG code recorded on every item
    #[arg(long)]
    pub epsg: Option<u32>,
}

#[derive(Args)]
pub struct UpdateSizesArgs {
    pub json_file: PathBuf,
    pub sizes_file: PathBuf,
    pub output_file: PathBuf,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Directory containing the files to validate
    pub directory: PathBuf,

    /// Log file written with the results
    pub output_log: PathBuf,

    /// Validator program (default: python3)
    #[arg(long)]
    pub validator: Option<String>,

    /// Validator arguments placed before the file path (repeatable)
    #[arg(long = "validator-arg", allow_hyphen_values = true)]
    pub validator_args: Vec<String>,
}
