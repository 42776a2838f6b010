use crate::audio::transcode_to_opus;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Archival storage for clients with `save_recordings`.
///
/// Each successful transcription leaves two artifacts named
/// `{client_id}_{timestamp}`: a compact mono Opus copy of the upload and the
/// transcript text next to it.
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create recordings directory")?;

        Ok(Self { dir })
    }

    /// Artifact base name for one request.
    pub fn base_name(client_id: &str) -> String {
        format!("{}_{}", client_id, Utc::now().format("%Y-%m-%d_%H%M%S"))
    }

    /// Transcode the staged upload into `{base}.opus`.
    pub async fn save_audio(&self, base: &str, staged_upload: &Path) -> Result<PathBuf> {
        let target = self.dir.join(format!("{base}.opus"));
        transcode_to_opus(staged_upload, &target).await?;

        info!("Archived recording {}", target.display());
        Ok(target)
    }

    /// Write the transcript text into `{base}.txt`.
    pub fn save_transcript(&self, base: &str, text: &str) -> Result<PathBuf> {
        let target = self.dir.join(format!("{base}.txt"));
        fs::write(&target, text).context("Failed to write transcript")?;

        info!("Archived transcript {}", target.display());
        Ok(target)
    }
}
