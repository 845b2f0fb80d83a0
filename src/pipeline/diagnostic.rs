//! Pipeline diagnostic dump: writes every stage artifact of a run to disk.
//!
//! Disabled unless `PAGESMITH_DUMP_DIR` is set.
//!
//! ```text
//! {dump_dir}/{run_id}/
//!   01-instructions.json
//!   02-segments.json
//!   03-blocks.json
//!   04-encoded.json
//!   05-outcome.json
//! ```

use std::path::{Path, PathBuf};

use uuid::Uuid;

pub const INSTRUCTIONS_FILE: &str = "01-instructions.json";
pub const SEGMENTS_FILE: &str = "02-segments.json";
pub const BLOCKS_FILE: &str = "03-blocks.json";
pub const ENCODED_FILE: &str = "04-encoded.json";
pub const OUTCOME_FILE: &str = "05-outcome.json";

/// Returns the dump directory for a run, creating it.
///
/// `None` (with a warning) if creation fails. Never blocks the pipeline.
pub fn dump_dir_for(base: &Path, run_id: &Uuid) -> Option<PathBuf> {
    let dir = base.join(run_id.to_string());

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "Diagnostic dump: failed to create directory"
        );
        return None;
    }

    Some(dir)
}

/// Write a pretty-printed JSON artifact. Never panics.
pub fn dump_json<T: serde::Serialize>(dir: &Path, filename: &str, value: &T) {
    let path = dir.join(filename);
    match serde_json::to_string_pretty(value) {
        Ok(json) => match std::fs::write(&path, json.as_bytes()) {
            Ok(()) => tracing::debug!(
                path = %path.display(),
                size = json.len(),
                "Diagnostic dump: JSON written"
            ),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Diagnostic dump: failed to write JSON"
            ),
        },
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Diagnostic dump: failed to serialize JSON"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_dir_for_creates_run_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let run_id = Uuid::new_v4();
        let dir = dump_dir_for(tmp.path(), &run_id).unwrap();

        assert!(dir.exists());
        assert!(dir.ends_with(run_id.to_string()));
    }

    #[test]
    fn dump_dir_for_reports_unwritable_base() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(dump_dir_for(&file, &Uuid::new_v4()).is_none());
    }

    #[test]
    fn dump_json_writes_pretty_json() {
        let tmp = tempfile::tempdir().unwrap();
        let value = serde_json::json!({ "block_instructions": "구분선", "count": 2 });

        dump_json(tmp.path(), INSTRUCTIONS_FILE, &value);

        let content = std::fs::read_to_string(tmp.path().join(INSTRUCTIONS_FILE)).unwrap();
        assert!(content.contains("\"block_instructions\": \"구분선\""));
        assert!(content.contains('\n'));
    }

    #[test]
    fn dump_json_handles_write_failure_gracefully() {
        let bad_dir = Path::new("/nonexistent/path");
        dump_json(bad_dir, OUTCOME_FILE, &"data");
    }
}
