use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::catalog::CatalogTree;
use crate::error::Result;

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json_string = serde_json::to_string_pretty(value)?;
    fs::write(path, json_string)?;
    debug!("Wrote {:?}", path);
    Ok(())
}

/// Write the tree under `output_dir`; returns the files written
pub fn write_catalog(tree: &CatalogTree, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(tree.items.len() + 2);

    let path = output_dir.join(CatalogTree::catalog_path());
    write_json(&path, &tree.catalog)?;
    written.push(path);

    let path = output_dir.join(tree.collection_path());
    write_json(&path, &tree.collection)?;
    written.push(path);

    for item in &tree.items {
        let path = output_dir.join(tree.item_path(item));
        write_json(&path, item)?;
        written.push(path);
    }
    info!(
        "STAC catalog created at {:?} ({} items)",
        output_dir,
        tree.items.len()
    );
    Ok(written)
}

/// Files visited by a textual rewrite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub scanned: usize,
    pub updated: usize,
    pub errors: usize,
}

/// Replace every occurrence of `from` with `to` in each `*.json` under `dir`.
///
/// Plain text substitution: matches outside hrefs are replaced too.
pub fn rewrite_prefix_in_files(dir: &Path, from: &str, to: &str) -> Result<RewriteSummary> {
    let mut summary = RewriteSummary::default();
    if from.is_empty() {
        return Ok(summary);
    }
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "json") {
            continue;
        }
        summary.scanned += 1;
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Error processing {:?}: {}", path, e);
                summary.errors += 1;
                continue;
            }
        };
        if !content.contains(from) {
            debug!("No replacements needed in: {:?}", path);
            continue;
        }
        match fs::write(path, content.replace(from, to)) {
            Ok(()) => {
                info!("Updated: {:?}", path);
                summary.updated += 1;
            }
            Err(e) => {
                warn!("Error processing {:?}: {}", path, e);
                summary.errors += 1;
            }
        }
    }
    Ok(summary)
}
