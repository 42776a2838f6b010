use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Transcode `input` to mono Opus at ~20 kbps via the external `ffmpeg` tool.
///
/// The encoder is opaque to the rest of the system; callers treat this as a
/// fire-and-forget archival step.
pub async fn transcode_to_opus(input: &Path, output: &Path) -> Result<()> {
    debug!(
        "Transcoding {} -> {}",
        input.display(),
        output.display()
    );

    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-c:a", "libopus", "-b:a", "20k", "-ac", "1"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .context("Failed to spawn ffmpeg")?;

    if !status.success() {
        bail!("ffmpeg exited with status {}", status);
    }

    Ok(())
}
