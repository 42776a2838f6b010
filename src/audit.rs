use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Best-effort append-only error log.
///
/// Every entry is one timestamped line. Write failures are reported to the
/// process log and swallowed; the caller never fails because auditing did.
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append one entry for `client_id`. Never fails the caller.
    pub fn record(&self, client_id: &str, message: &str) {
        let line = format!("{} [{}] {}\n", Utc::now().to_rfc3339(), client_id, message);

        if let Err(e) = self.append(&line) {
            warn!("audit log write failed: {}", e);
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}
