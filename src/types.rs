//! Shared types and enums used across lidarkit.
//! Includes `Compression`, `TableLayout`, `ProductMarker`, and the batch `Outcome`
//! and `BatchReport` returned by every batch job.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// GeoTIFF/COG compression scheme
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Deflate,
    Lzw,
    Zstd,
    None,
}

impl Compression {
    /// Value of the GDAL `COMPRESS=` creation option
    pub fn as_gdal(&self) -> &'static str {
        match self {
            Compression::Deflate => "DEFLATE",
            Compression::Lzw => "LZW",
            Compression::Zstd => "ZSTD",
            Compression::None => "NONE",
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_gdal())
    }
}

/// Column set used when rendering an analysis report
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableLayout {
    /// Filename, nodata, min, max
    Stats,
    /// Filename, size, compression, datatype, nodata, min, max
    Detailed,
    /// Filename, pixel width, pixel height
    PixelSize,
}

impl std::fmt::Display for TableLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableLayout::Stats => write!(f, "Stats"),
            TableLayout::Detailed => write!(f, "Detailed"),
            TableLayout::PixelSize => write!(f, "PixelSize"),
        }
    }
}

/// Elevation product folders found inside LiDAR archives
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductMarker {
    #[value(name = "DSM")]
    Dsm,
    #[value(name = "DTM")]
    Dtm,
}

impl ProductMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductMarker::Dsm => "DSM",
            ProductMarker::Dtm => "DTM",
        }
    }
}

impl std::fmt::Display for ProductMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one unit of batch work
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Outcome {
    Processed,
    Skipped(String),
    Failed(String),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Processed => write!(f, "processed"),
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One input of a batch and what happened to it
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BatchEntry {
    pub input: String,
    pub outcome: Outcome,
}

/// Batch processing report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn record(&mut self, input: impl Into<String>, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.errors += 1,
        }
        self.entries.push(BatchEntry {
            input: input.into(),
            outcome,
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Failed(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_maps_to_gdal_names() {
        assert_eq!(Compression::Deflate.as_gdal(), "DEFLATE");
        assert_eq!(Compression::Lzw.to_string(), "LZW");
        assert_eq!(Compression::Zstd.as_gdal(), "ZSTD");
    }

    #[test]
    fn compression_deserializes_lowercase() {
        let c: Compression = serde_json::from_str("\"zstd\"").unwrap();
        assert_eq!(c, Compression::Zstd);
    }

    #[test]
    fn markers_parse_from_cli_names() {
        let m = ProductMarker::from_str("DTM", false).unwrap();
        assert_eq!(m, ProductMarker::Dtm);
        assert_eq!(ProductMarker::Dsm.to_string(), "DSM");
    }

    #[test]
    fn report_counts_follow_outcomes() {
        let mut report = BatchReport::default();
        report.record("a.tif", Outcome::Processed);
        report.record("b.tif", Outcome::Skipped("has 3 bands".into()));
        report.record("c.tif", Outcome::Failed("cannot open".into()));
        report.record("d.tif", Outcome::Processed);
        assert_eq!((report.processed, report.skipped, report.errors), (2, 1, 1));
        let failed: Vec<_> = report.failures().map(|e| e.input.as_str()).collect();
        assert_eq!(failed, vec!["c.tif"]);
    }
}
