//! File-size backfill for JSON download manifests.
use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// `<size>, '<path>'` at the start of a line
pub const SIZE_LINE_PATTERN: &str = r"^\s*(\d+),\s*'([^']+)'";

/// Parse a size listing into path -> size; non-matching lines are ignored
pub fn parse_sizes(content: &str) -> Result<HashMap<String, String>> {
    let pattern = Regex::new(SIZE_LINE_PATTERN)?;
    let sizes: HashMap<String, String> = content
        .lines()
        .filter_map(|line| pattern.captures(line))
        .map(|caps| (caps[2].to_string(), caps[1].to_string()))
        .collect();
    debug!("Parsed {} size entries", sizes.len());
    Ok(sizes)
}

/// Parse the manifest, repairing a stream of bare objects into an array when needed
pub fn parse_manifest(content: &str) -> Result<Value> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("Manifest is not valid JSON ({}), retrying as concatenated objects", e);
            let repaired = format!("[{}]", content.replace("}\n {", "}, {"));
            Ok(serde_json::from_str(&repaired)?)
        }
    }
}

/// Set `fileSize` (as a string) on every object whose `downloadUrl` has a known size
pub fn apply_sizes(manifest: &mut Value, sizes: &HashMap<String, String>) -> Result<usize> {
    let entries = manifest
        .as_array_mut()
        .ok_or_else(|| Error::Processing("manifest must be a JSON array".to_string()))?;
    let mut updated = 0;
    for entry in entries.iter_mut() {
        let Some(obj) = entry.as_object_mut() else {
            continue;
        };
        let size = obj
            .get("downloadUrl")
            .and_then(Value::as_str)
            .and_then(|url| sizes.get(url));
        if let Some(size) = size.cloned() {
            obj.insert("fileSize".to_string(), Value::String(size));
            updated += 1;
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_lines_are_anchored() {
        let sizes = parse_sizes(
            "1234, '/some/path'\n  99,'/other'\nnote: 5, '/ignored'\nbad line\n",
        )
        .unwrap();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes["/some/path"], "1234");
        assert_eq!(sizes["/other"], "99");
    }

    #[test]
    fn matching_entry_gets_string_size() {
        let mut manifest = parse_manifest(
            r#"[{"name": "a", "downloadUrl": "/some/path", "fileSize": "1"},
                {"name": "b", "downloadUrl": "/elsewhere", "fileSize": "7"}]"#,
        )
        .unwrap();
        let sizes = parse_sizes("1234, '/some/path'\n").unwrap();
        assert_eq!(apply_sizes(&mut manifest, &sizes).unwrap(), 1);
        assert_eq!(manifest[0]["fileSize"], "1234");
        assert_eq!(manifest[1]["fileSize"], "7");
    }

    #[test]
    fn key_order_is_preserved() {
        let mut manifest =
            parse_manifest(r#"[{"fileSize": "0", "name": "a", "downloadUrl": "/p"}]"#).unwrap();
        let sizes = parse_sizes("10, '/p'").unwrap();
        apply_sizes(&mut manifest, &sizes).unwrap();
        let keys: Vec<&String> = manifest[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["fileSize", "name", "downloadUrl"]);
    }

    #[test]
    fn bare_objects_are_repaired() {
        let content = "{\"downloadUrl\": \"/a\"}\n {\"downloadUrl\": \"/b\"}";
        let manifest = parse_manifest(content).unwrap();
        assert_eq!(manifest.as_array().unwrap().len(), 2);
        assert_eq!(manifest[1]["downloadUrl"], "/b");
    }

    #[test]
    fn unrepairable_manifest_fails() {
        assert!(parse_manifest("{\"a\": 1}\n{\"b\": 2}").is_err());
        let mut obj = parse_manifest("{\"a\": 1}").unwrap();
        assert!(apply_sizes(&mut obj, &HashMap::new()).is_err());
    }
}
