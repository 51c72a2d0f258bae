//! I/O layer: GDAL-backed raster reading and COG writing, zip archives with `/vsimem`
//! buffering, HTTP downloads, and `writers` for reports, catalogs and validation logs.
pub mod gdal;
pub use gdal::{BandStatistics, Bounds, RasterError, RasterInfo, RasterReader};

pub mod archive;
pub use archive::{MemFile, RasterArchive};

pub mod cog;
pub use cog::{CogOptions, RasterCalc, reencode_file, translate_to_cog};

pub mod http;
pub use http::{Fetcher, HttpFetcher};

pub mod writers;
