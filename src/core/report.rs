//! Analysis records and their text/Markdown table renderings.
//!
//! Cells are left-aligned and padded to fixed widths; values wider than a column
//! overflow it instead of being truncated.
use serde::Serialize;

use crate::io::{BandStatistics, RasterInfo};
use crate::types::TableLayout;

/// Per-file analysis result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterSummary {
    pub filename: String,
    pub file_size_mb: f64,
    pub compression: String,
    pub data_type: String,
    pub nodata: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pixel_width: Option<f64>,
    pub pixel_height: Option<f64>,
}

impl RasterSummary {
    pub fn from_info(info: &RasterInfo, stats: Option<BandStatistics>) -> Self {
        let filename = info
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| info.path.display().to_string());
        let pixel = info.pixel_size();
        RasterSummary {
            filename,
            file_size_mb: info.file_size_bytes as f64 / (1024.0 * 1024.0),
            compression: info
                .compression
                .clone()
                .unwrap_or_else(|| "None".to_string()),
            data_type: info.data_type.clone(),
            nodata: info.nodata,
            min: stats.map(|s| s.min),
            max: stats.map(|s| s.max),
            pixel_width: pixel.map(|p| p.0),
            pixel_height: pixel.map(|p| p.1),
        }
    }
}

/// Nodata the way a float literal reads: `-9999.0`, `nan`, `None` when unset.
///
/// Shortest round-trip digits; exponent form below 1e-4 or from 1e16 on, e.g.
/// `-3.4028234663852886e+38`.
pub fn format_nodata(nodata: Option<f64>) -> String {
    match nodata {
        None => "None".to_string(),
        Some(v) if v.is_nan() => "nan".to_string(),
        Some(v) if v.is_infinite() => if v > 0.0 { "inf" } else { "-inf" }.to_string(),
        Some(v) => float_literal(v),
    }
}

fn float_literal(v: f64) -> String {
    let sci = format!("{:e}", v);
    if let Some((mantissa, exp)) = sci.split_once('e') {
        if let Ok(exp) = exp.parse::<i32>() {
            if v != 0.0 && !(-4..16).contains(&exp) {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exp.abs());
            }
        }
    }
    let plain = v.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

fn fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

struct Column {
    header: &'static str,
    width: usize,
    /// Dashes under the header in the Markdown table
    rule: usize,
}

const STATS_COLUMNS: &[Column] = &[
    Column { header: "Filename", width: 30, rule: 10 },
    Column { header: "No Data Value", width: 15, rule: 15 },
    Column { header: "Min Value", width: 15, rule: 11 },
    Column { header: "Max Value", width: 15, rule: 11 },
];

const DETAILED_COLUMNS: &[Column] = &[
    Column { header: "Filename", width: 30, rule: 10 },
    Column { header: "Size (MB)", width: 10, rule: 11 },
    Column { header: "Compression", width: 12, rule: 13 },
    Column { header: "Data Type", width: 10, rule: 11 },
    Column { header: "No Data", width: 10, rule: 10 },
    Column { header: "Min Value", width: 15, rule: 11 },
    Column { header: "Max Value", width: 15, rule: 12 },
];

const PIXEL_COLUMNS: &[Column] = &[
    Column { header: "Filename", width: 40, rule: 10 },
    Column { header: "Pixel Width", width: 20, rule: 13 },
    Column { header: "Pixel Height", width: 20, rule: 14 },
];

fn columns(layout: TableLayout) -> &'static [Column] {
    match layout {
        TableLayout::Stats => STATS_COLUMNS,
        TableLayout::Detailed => DETAILED_COLUMNS,
        TableLayout::PixelSize => PIXEL_COLUMNS,
    }
}

fn cells(layout: TableLayout, s: &RasterSummary) -> Vec<String> {
    match layout {
        TableLayout::Stats => vec![
            s.filename.clone(),
            format_nodata(s.nodata),
            fixed(s.min, 6),
            fixed(s.max, 6),
        ],
        TableLayout::Detailed => vec![
            s.filename.clone(),
            format!("{:.2}", s.file_size_mb),
            s.compression.clone(),
            s.data_type.clone(),
            format_nodata(s.nodata),
            fixed(s.min, 6),
            fixed(s.max, 6),
        ],
        TableLayout::PixelSize => vec![
            s.filename.clone(),
            fixed(s.pixel_width, 6),
            fixed(s.pixel_height, 6),
        ],
    }
}

/// Width of the dashed rules around the header
pub fn rule_width(layout: TableLayout) -> usize {
    match layout {
        TableLayout::Detailed => 120,
        TableLayout::Stats | TableLayout::PixelSize => 80,
    }
}

fn title(layout: TableLayout) -> &'static str {
    match layout {
        TableLayout::PixelSize => "GeoTIFF Pixel Size Results",
        TableLayout::Stats | TableLayout::Detailed => "GeoTIFF Analysis Results",
    }
}

fn padded_row(layout: TableLayout, values: &[String]) -> String {
    columns(layout)
        .iter()
        .zip(values)
        .map(|(col, v)| format!("{:<width$}", v, width = col.width))
        .collect::<Vec<_>>()
        .join(" ")
}

fn table_body(layout: TableLayout, summaries: &[RasterSummary]) -> String {
    let rule = "-".repeat(rule_width(layout));
    let headers: Vec<String> = columns(layout)
        .iter()
        .map(|c| c.header.to_string())
        .collect();
    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&padded_row(layout, &headers));
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    for s in summaries {
        out.push_str(&padded_row(layout, &cells(layout, s)));
        out.push('\n');
    }
    out
}

/// Console rendering: blank line, `<title>:`, ruled header, one row per record
pub fn render_table(layout: TableLayout, summaries: &[RasterSummary]) -> String {
    format!("\n{}:\n{}", title(layout), table_body(layout, summaries))
}

/// Plain-text file rendering
pub fn render_text(layout: TableLayout, summaries: &[RasterSummary]) -> String {
    format!("{}\n{}", title(layout), table_body(layout, summaries))
}

/// Markdown file rendering
pub fn render_markdown(layout: TableLayout, summaries: &[RasterSummary]) -> String {
    let cols = columns(layout);
    let mut out = format!("# {}\n\n", title(layout));
    let headers: Vec<&str> = cols.iter().map(|c| c.header).collect();
    out.push_str(&format!("| {} |\n", headers.join(" | ")));
    let dashes: Vec<String> = cols.iter().map(|c| "-".repeat(c.rule)).collect();
    out.push_str(&format!("|{}|\n", dashes.join("|")));
    for s in summaries {
        out.push_str(&format!("| {} |\n", cells(layout, s).join(" | ")));
    }
    out
}
