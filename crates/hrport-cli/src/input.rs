use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use hrport::RawInputs;
use serde_json::Value as JsonValue;

/// Merge a JSON object file with `id=value` overrides; overrides win.
pub fn raw_inputs(file: Option<&Path>, sets: &[String]) -> Result<RawInputs> {
    let mut raw = RawInputs::new();
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading inputs {}", path.display()))?;
        let value: JsonValue = serde_json::from_str(&text)
            .with_context(|| format!("parsing inputs {}", path.display()))?;
        let JsonValue::Object(map) = value else {
            bail!("inputs file {} must contain a JSON object", path.display());
        };
        raw.extend(map);
    }
    for set in sets {
        let (id, value) = set
            .split_once('=')
            .ok_or_else(|| anyhow!("`--set {set}` must look like id=value"))?;
        raw.insert(id.trim().to_string(), JsonValue::String(value.to_string()));
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sets_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        std::fs::write(&path, r#"{"total_headcount": 1200, "report_date": "2025-06-30"}"#)
            .unwrap();

        let raw = raw_inputs(Some(&path), &["total_headcount=1300".to_string()]).unwrap();
        assert_eq!(raw["total_headcount"], json!("1300"));
        assert_eq!(raw["report_date"], json!("2025-06-30"));
    }

    #[test]
    fn malformed_sets_and_non_objects_fail() {
        assert!(raw_inputs(None, &["no-equals".to_string()]).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(raw_inputs(Some(&path), &[]).is_err());
    }
}
