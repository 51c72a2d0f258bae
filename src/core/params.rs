use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::cog::{CogOptions, RasterCalc};
use crate::types::{Compression, ProductMarker, TableLayout};

/// Statistics/metadata report parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeParams {
    pub layout: TableLayout,
    /// Skip rasters with more than one band
    pub require_single_band: bool,
    /// Force min/max computation
    pub compute_statistics: bool,
    /// Sort records by filename
    pub sort: bool,
    /// Extension matched when scanning a directory
    pub extension: String,
}

impl Default for AnalyzeParams {
    fn default() -> Self {
        Self {
            layout: TableLayout::Detailed,
            require_single_band: true,
            compute_statistics: true,
            sort: true,
            extension: "tif".to_string(),
        }
    }
}

impl AnalyzeParams {
    /// Parameters matching a table layout's original report
    pub fn for_layout(layout: TableLayout) -> Self {
        match layout {
            TableLayout::Stats => Self {
                layout,
                sort: false,
                ..Default::default()
            },
            TableLayout::Detailed => Self::default(),
            TableLayout::PixelSize => Self {
                layout,
                require_single_band: false,
                compute_statistics: false,
                ..Default::default()
            },
        }
    }
}

/// Rescale-then-COG conversion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertParams {
    pub calc: RasterCalc,
    pub cog: CogOptions,
    /// Appended to the input stem to name the output
    pub output_suffix: String,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            calc: RasterCalc::default(),
            cog: CogOptions {
                compression: Compression::Lzw,
                ..Default::default()
            },
            output_suffix: "_processed".to_string(),
        }
    }
}

/// Plain COG re-encode parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReencodeParams {
    pub cog: CogOptions,
    pub extension: String,
}

impl Default for ReencodeParams {
    fn default() -> Self {
        Self {
            cog: CogOptions {
                compression: Compression::Zstd,
                predictor: Some(2),
                statistics: true,
                target_crs: Some("EPSG:29902".to_string()),
                ..Default::default()
            },
            extension: "tif".to_string(),
        }
    }
}

/// Archive download-and-mosaic parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveParams {
    /// Where archives are downloaded and COGs written
    pub output_dir: PathBuf,
    /// Completed-URL log; defaults to `<output_dir>/logfile.txt`
    pub log_file: Option<PathBuf>,
    pub markers: Vec<ProductMarker>,
    /// Members containing this substring are excluded
    pub exclude: String,
    pub member_extension: String,
    pub cog: CogOptions,
}

impl Default for ArchiveParams {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("processed"),
            log_file: None,
            markers: vec![ProductMarker::Dsm, ProductMarker::Dtm],
            exclude: "ITM".to_string(),
            member_extension: ".asc".to_string(),
            cog: CogOptions {
                compression: Compression::Deflate,
                big_tiff: true,
                target_crs: Some("EPSG:29902".to_string()),
                ..Default::default()
            },
        }
    }
}

impl ArchiveParams {
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("logfile.txt"))
    }
}

/// STAC catalog parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogParams {
    pub catalog_id: String,
    pub title: String,
    pub collection_id: String,
    pub collection_description: String,
    pub license: String,
    pub epsg: u32,
    pub asset_key: String,
    /// Published location of `catalog.json`'s directory; local output dir when unset
    pub catalog_url: Option<String>,
    /// Href prefix to rewrite, paired with `public_prefix`
    pub local_prefix: Option<String>,
    pub public_prefix: Option<String>,
    /// Rewrite by plain text substitution over the written files
    pub text_rewrite: bool,
}

impl Default for CatalogParams {
    fn default() -> Self {
        Self {
            catalog_id: "better-open-data.com".to_string(),
            title: "better-open-data.com STAC Catalog".to_string(),
            collection_id: "lidar-collection".to_string(),
            collection_description:
                "A collection of LiDAR GeoTIFF files (COGs) with EPSG:29902 CRS".to_string(),
            license: "OGL V3".to_string(),
            epsg: 29902,
            asset_key: "cog".to_string(),
            catalog_url: None,
            local_prefix: None,
            public_prefix: None,
            text_rewrite: false,
        }
    }
}

/// External validator invocation; the file path is appended to `args`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateParams {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ValidateParams {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["validate.py".to_string()],
        }
    }
}

impl ValidateParams {
    /// Name used in log lines, e.g. `validate.py`
    pub fn display_name(&self) -> &str {
        self.args.first().unwrap_or(&self.program)
    }
}

/// All job parameters, suitable for a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analyze: AnalyzeParams,
    pub convert: ConvertParams,
    pub reencode: ReencodeParams,
    pub archive: ArchiveParams,
    pub catalog: CatalogParams,
    pub validate: ValidateParams,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
