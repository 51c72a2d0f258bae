use gdal::{Dataset, Metadata, errors::GdalError as GdalCrateError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors encountered when using the GDAL raster layer
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported raster: {0}")]
    Unsupported(String),
    #[error("No statistics available for {0}")]
    NoStatistics(String),
}

/// Georeferenced extent in the raster's own CRS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    /// Extent of a `size_x` x `size_y` grid under an affine geotransform
    pub fn from_geotransform(gt: &[f64; 6], size_x: usize, size_y: usize) -> Self {
        let (w, h) = (size_x as f64, size_y as f64);
        let corner = |px: f64, ln: f64| (gt[0] + px * gt[1] + ln * gt[2], gt[3] + px * gt[4] + ln * gt[5]);
        let corners = [corner(0.0, 0.0), corner(w, 0.0), corner(0.0, h), corner(w, h)];
        let xs = corners.iter().map(|c| c.0);
        let ys = corners.iter().map(|c| c.1);
        Bounds {
            left: xs.clone().fold(f64::INFINITY, f64::min),
            right: xs.fold(f64::NEG_INFINITY, f64::max),
            bottom: ys.clone().fold(f64::INFINITY, f64::min),
            top: ys.fold(f64::NEG_INFINITY, f64::max),
        }
    }

    pub fn bbox(&self) -> [f64; 4] {
        [self.left, self.bottom, self.right, self.top]
    }
}

/// Attributes GDAL reports for an opened raster
#[derive(Debug, Clone)]
pub struct RasterInfo {
    pub path: PathBuf,
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    pub bands: usize,
    /// Affine geotransform, absent when the file carries none
    pub geotransform: Option<[f64; 6]>,
    pub projection: String,
    pub epsg: Option<u32>,
    /// `IMAGE_STRUCTURE` compression, if declared
    pub compression: Option<String>,
    /// Datatype name of band 1 (e.g. `Float32`)
    pub data_type: String,
    pub nodata: Option<f64>,
    pub file_size_bytes: u64,
}

impl RasterInfo {
    pub fn pixel_size(&self) -> Option<(f64, f64)> {
        self.geotransform.map(|gt| (gt[1].abs(), gt[5].abs()))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.geotransform
            .map(|gt| Bounds::from_geotransform(&gt, self.size_x, self.size_y))
    }
}

/// Min/max of band 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
}

/// Reader for the GeoTIFFs and grids handled by the batch jobs
pub struct RasterReader {
    pub dataset: Dataset,
    pub info: RasterInfo,
}

// Extract an EPSG code from WKT1 `AUTHORITY["EPSG","n"]` or WKT2 `ID["EPSG",n]`
pub(crate) fn parse_epsg(wkt: &str) -> Option<u32> {
    for key in ["AUTHORITY[\"EPSG\",\"", "ID[\"EPSG\","] {
        if let Some(idx) = wkt.rfind(key) {
            let start = idx + key.len();
            let code: String = wkt[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(code) = code.parse() {
                return Some(code);
            }
        }
    }
    None
}

impl RasterReader {
    /// Open a GDAL-supported raster and collect its metadata
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let dataset = Dataset::open(path)?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(RasterError::Unsupported(format!(
                "{} has no raster bands",
                path.display()
            )));
        }
        let geotransform = dataset.geo_transform().ok();
        let projection = dataset.projection();
        let epsg = match dataset.spatial_ref() {
            Ok(srs) => srs.auth_code().ok().map(|c| c as u32),
            Err(_) => None,
        }
        .or_else(|| parse_epsg(&projection));
        let compression = dataset.metadata_item("COMPRESSION", "IMAGE_STRUCTURE");
        let band = dataset.rasterband(1)?;
        let data_type = band.band_type().name();
        let nodata = band.no_data_value();
        // `/vsimem` paths have no filesystem metadata
        let file_size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        Ok(RasterReader {
            info: RasterInfo {
                path: path.to_path_buf(),
                size_x: size_x as usize,
                size_y: size_y as usize,
                bands,
                geotransform,
                projection,
                epsg,
                compression,
                data_type,
                nodata,
                file_size_bytes,
            },
            dataset,
        })
    }

    /// Force min/max computation on band 1 (approximation allowed)
    pub fn statistics(&self) -> Result<BandStatistics, RasterError> {
        let band = self.dataset.rasterband(1)?;
        match band.get_statistics(true, true)? {
            Some(stats) => Ok(BandStatistics {
                min: stats.min,
                max: stats.max,
            }),
            None => Err(RasterError::NoStatistics(
                self.info.path.display().to_string(),
            )),
        }
    }
}
