use std::path::Path;

use tracing::info;

use crate::core::report::{RasterSummary, render_markdown, render_text};
use crate::error::Result;
use crate::types::TableLayout;

/// Save the analysis table as Markdown
pub fn save_markdown(path: &Path, layout: TableLayout, summaries: &[RasterSummary]) -> Result<()> {
    std::fs::write(path, render_markdown(layout, summaries))?;
    info!("Results saved to {:?}", path);
    Ok(())
}

/// Save the analysis table as plain text
pub fn save_text(path: &Path, layout: TableLayout, summaries: &[RasterSummary]) -> Result<()> {
    std::fs::write(path, render_text(layout, summaries))?;
    info!("Results saved to {:?}", path);
    Ok(())
}
