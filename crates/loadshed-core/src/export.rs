// ── Schedule export ──
//
// Serializes the current schedule into a pretty-printed JSON file named
// after the selection.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use loadshed_api::Schedule;

use crate::error::CoreError;

/// A ready-to-write export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// `<province>-<town>-schedule.json`.
    pub file_name: String,
    /// Pretty-printed JSON mirror of the schedule.
    pub contents: String,
}

impl ExportFile {
    pub fn new(
        schedule: &Schedule,
        province: Option<&str>,
        town: Option<&str>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            file_name: export_file_name(province, town),
            contents: serde_json::to_string_pretty(schedule)?,
        })
    }

    /// Write into `dir` and return the full path.
    ///
    /// Path separators in the name are replaced so the file always lands
    /// directly inside `dir`.
    pub fn write_into(&self, dir: &Path) -> Result<PathBuf, CoreError> {
        let safe_name: String = self
            .file_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        let path = dir.join(safe_name);

        fs::write(&path, &self.contents).map_err(|source| CoreError::ExportWrite {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "schedule exported");
        Ok(path)
    }
}

/// Unset parts fall back to the literals `province` and `town`.
pub fn export_file_name(province: Option<&str>, town: Option<&str>) -> String {
    format!(
        "{}-{}-schedule.json",
        province.unwrap_or("province"),
        town.unwrap_or("town")
    )
}
