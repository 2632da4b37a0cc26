//! JSON export of stored postings.

use std::path::Path;

use tracing::{info, instrument};

use internscout_shared::{InternScoutError, Posting, Result};

/// Write `postings` as a pretty-printed JSON array to `path`.
///
/// The file is written to a sibling temp file and renamed into place.
#[instrument(skip_all, fields(path = %path.display(), count = postings.len()))]
pub fn export_json(postings: &[Posting], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(postings)
        .map_err(|e| InternScoutError::validation(format!("failed to encode export: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| InternScoutError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export.json".into());
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, json).map_err(|e| InternScoutError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| InternScoutError::io(path, e))?;

    info!("export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_array_with_keywords_and_raw() {
        let dir = std::env::temp_dir().join(format!("is-export-test-{}", uuid::Uuid::now_v7()));
        let path = dir.join("internships.json");

        let mut posting = Posting::from_feed_value(json!({
            "id": "a", "company_name": "Acme", "xata": {"version": 1}
        }))
        .unwrap();
        posting.keywords = Some(["rust".to_string()].into());

        export_json(&[posting], &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["id"], "a");
        assert_eq!(written[0]["keywords"], json!(["rust"]));
        assert_eq!(written[0]["raw"]["xata"]["version"], 1);
        assert_eq!(written[0]["is_visible"], false);
        assert!(!dir.join(".internships.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
