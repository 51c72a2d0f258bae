//! Cloud-Optimized GeoTIFF output.
//!
//! Every translation goes through an in-memory VRT over the sources: a single source is
//! a one-tile mosaic, several sources (archive members) are mosaicked. The VRT is the
//! place where an output CRS is forced, so inputs are never touched.
use std::path::Path;
use std::process::Command;

use gdal::cpl::CslStringList;
use gdal::programs::raster::build_vrt;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::RasterError;
use crate::types::Compression;

/// Creation options for the GDAL COG driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CogOptions {
    pub compression: Compression,
    /// `PREDICTOR=` value (2 = horizontal differencing)
    pub predictor: Option<u8>,
    /// Force `BIGTIFF=YES`
    pub big_tiff: bool,
    /// `NUM_THREADS=` value, e.g. `ALL_CPUS`
    pub num_threads: Option<String>,
    /// Embed band statistics (`STATISTICS=YES`)
    pub statistics: bool,
    /// Output CRS assigned to the mosaic, e.g. `EPSG:29902`
    pub target_crs: Option<String>,
}

impl Default for CogOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Deflate,
            predictor: None,
            big_tiff: false,
            num_threads: Some("ALL_CPUS".to_string()),
            statistics: false,
            target_crs: None,
        }
    }
}

impl CogOptions {
    /// `KEY=VALUE` creation options in the order GDAL receives them
    pub fn creation_options(&self) -> Vec<String> {
        let mut opts = vec![format!("COMPRESS={}", self.compression.as_gdal())];
        if let Some(p) = self.predictor {
            opts.push(format!("PREDICTOR={}", p));
        }
        if self.big_tiff {
            opts.push("BIGTIFF=YES".to_string());
        }
        if let Some(n) = &self.num_threads {
            opts.push(format!("NUM_THREADS={}", n));
        }
        if self.statistics {
            opts.push("STATISTICS=YES".to_string());
        }
        opts
    }
}

/// Mosaic `sources` into a virtual raster and write it as a COG at `output`
pub fn translate_to_cog(
    sources: &[Dataset],
    output: &Path,
    options: &CogOptions,
) -> std::result::Result<(), RasterError> {
    if sources.is_empty() {
        return Err(RasterError::Unsupported(
            "no source rasters to translate".to_string(),
        ));
    }
    debug!("Building VRT over {} source(s)", sources.len());
    let mut vrt = build_vrt(None, sources, None)?;

    if let Some(crs) = &options.target_crs {
        let srs = SpatialRef::from_definition(crs)?;
        vrt.set_spatial_ref(&srs)?;
        debug!("Assigned output CRS {}", crs);
    }

    let driver = DriverManager::get_driver_by_name("COG")?;
    let mut creation = CslStringList::new();
    for opt in options.creation_options() {
        creation.add_string(&opt)?;
    }
    vrt.create_copy(&driver, output, &creation)?;
    info!("Converted to COG: {:?}", output);
    Ok(())
}

/// Open `input` and re-encode it as a COG at `output`
pub fn reencode_file(
    input: &Path,
    output: &Path,
    options: &CogOptions,
) -> std::result::Result<(), RasterError> {
    let ds = Dataset::open(input)?;
    translate_to_cog(&[ds], output, options)
}

/// External raster-algebra invocation producing `value / divisor` as Float32
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterCalc {
    pub program: String,
    pub divisor: f64,
    pub nodata: f64,
}

impl Default for RasterCalc {
    fn default() -> Self {
        Self {
            program: "gdal_calc.py".to_string(),
            divisor: 1000.0,
            nodata: -9999.0,
        }
    }
}

impl RasterCalc {
    pub fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-A".into(),
            input.display().to_string(),
            "--outfile".into(),
            output.display().to_string(),
            "--calc".into(),
            format!("A/{}", self.divisor),
            "--NoDataValue".into(),
            self.nodata.to_string(),
            "--type".into(),
            "Float32".into(),
            "--quiet".into(),
            "--overwrite".into(),
        ]
    }

    /// Run the calculation; a nonzero exit is an error
    pub fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let args = self.args(input, output);
        debug!("{} {}", self.program, args.join(" "));
        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| Error::ExternalCommand {
                program: self.program.clone(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })?;
        if !result.status.success() {
            return Err(Error::ExternalCommand {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
