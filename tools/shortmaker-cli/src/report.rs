//! `render-report.json` written after a batch run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shortmaker_render_engine::{EncodePath, RenderFailure, RenderResult, RenderStage};

pub const REPORT_FILE_NAME: &str = "render-report.json";

#[derive(Debug, Serialize)]
pub struct RenderReport {
    pub video: PathBuf,
    pub rendered_at: DateTime<Utc>,
    pub clips: Vec<ReportEntry>,
}

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub title: String,
    pub file: PathBuf,
    pub status: &'static str,
    pub size_bytes: Option<u64>,
    pub stage: RenderStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder: Option<EncodePath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RenderFailure>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub diagnostic: String,
    pub attempts: usize,
    pub elapsed_secs: f64,
}

impl RenderReport {
    pub fn new(video: &Path, rendered_at: DateTime<Utc>, results: &[RenderResult]) -> Self {
        let clips = results
            .iter()
            .map(|result| ReportEntry {
                title: result.title.clone(),
                file: result.output_path.clone(),
                status: if result.succeeded { "ok" } else { "failed" },
                size_bytes: result
                    .succeeded
                    .then(|| std::fs::metadata(&result.output_path).ok())
                    .flatten()
                    .map(|m| m.len()),
                stage: result.stage,
                encoder: result.encoder,
                failure: result.failure,
                diagnostic: result.diagnostic_tail.clone(),
                attempts: result.attempts.len(),
                elapsed_secs: result.elapsed_secs,
            })
            .collect();

        Self {
            video: video.to_path_buf(),
            rendered_at,
            clips,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.clips.iter().filter(|c| c.status == "ok").count()
    }

    /// Write the report into `dir`, returning its path.
    pub fn write(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(REPORT_FILE_NAME);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
