use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AppError;

pub const ACTIVE_API: &str = "active-editais-api.json";
pub const ACTIVE_UI: &str = "active-editais-ui.json";
pub const API_ROOT: &str = "api-root-response.txt";
pub const LOTS: &str = "calculadora-lotes.json";
pub const LOTS_SUMMARY: &str = "calculadora-lotes-summary.txt";
pub const UI_DATA: &str = "ui-edital-data.json";

/// Writes scenario artifacts under one directory, creating it on first write.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Pretty-printed JSON, two-space indent.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, AppError> {
        let body = serde_json::to_string_pretty(value)?;
        self.write_text(name, &body)
    }

    pub fn write_text(&self, name: &str, text: &str) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, text.as_bytes())?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "Wrote artifact");
        Ok(path)
    }
}
