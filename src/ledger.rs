use crate::backend::BackendKind;
use crate::error::{RelayError, RelayResult};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

const LEDGER_HEADER: &str = "Date;LocalSeconds;CloudSeconds";

/// Accumulated backend-seconds for one client on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayUsage {
    pub local_seconds: u64,
    pub cloud_seconds: u64,
}

/// Durable per-client, per-day usage counters.
///
/// Each client owns one append-only text file whose last row is the mutable
/// current-day row. An update reads the file, bumps the matching counter on
/// the day's row (creating it with zeros if absent) and rewrites the file.
/// Updates for the same client serialize through a per-client async mutex so
/// concurrent requests cannot lose increments; counters only ever grow within
/// a day, and rows are never deleted.
pub struct UsageLedger {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UsageLedger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create ledger directory")?;

        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Credit `floor(seconds)` against the backend's counter for
    /// `(client_id, date)`.
    pub async fn record(
        &self,
        client_id: &str,
        date: NaiveDate,
        seconds: f64,
        backend: BackendKind,
    ) -> Result<()> {
        let billable = seconds.max(0.0).floor() as u64;

        let lock = self.client_lock(client_id).await;
        let _guard = lock.lock().await;

        let path = self.client_path(client_id);
        let mut rows = read_rows(&path)?;

        match rows.last_mut() {
            Some(row) if row.date == date => match backend {
                BackendKind::Local => row.usage.local_seconds += billable,
                BackendKind::Cloud => row.usage.cloud_seconds += billable,
            },
            _ => {
                let mut usage = DayUsage::default();
                match backend {
                    BackendKind::Local => usage.local_seconds = billable,
                    BackendKind::Cloud => usage.cloud_seconds = billable,
                }
                rows.push(LedgerRow { date, usage });
            }
        }

        write_rows(&path, &rows)
    }

    /// Usage for every client that has a current row for `date`.
    ///
    /// An absent store, or a store with no rows for the date, is a distinct
    /// no-data condition rather than an empty map.
    pub fn usage_for(&self, date: NaiveDate) -> RelayResult<BTreeMap<String, DayUsage>> {
        let entries = fs::read_dir(&self.dir).map_err(|_| RelayError::NoUsageData)?;

        let mut usage = BTreeMap::new();

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(client_id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".log"))
            else {
                continue;
            };

            let rows = match read_rows(&path) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("Skipping unreadable ledger {}: {}", path.display(), e);
                    continue;
                }
            };

            if let Some(row) = rows.last() {
                if row.date == date {
                    usage.insert(client_id.to_string(), row.usage);
                }
            }
        }

        if usage.is_empty() {
            return Err(RelayError::NoUsageData);
        }

        Ok(usage)
    }

    fn client_path(&self, client_id: &str) -> PathBuf {
        self.dir.join(format!("{client_id}.log"))
    }

    async fn client_lock(&self, client_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(client_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

struct LedgerRow {
    date: NaiveDate,
    usage: DayUsage,
}

fn read_rows(path: &Path) -> Result<Vec<LedgerRow>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).context("Failed to read ledger file"),
    };

    let mut rows = Vec::new();
    for line in contents.lines().skip(1) {
        if let Some(row) = parse_row(line) {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn write_rows(path: &Path, rows: &[LedgerRow]) -> Result<()> {
    let mut contents = String::from(LEDGER_HEADER);
    contents.push('\n');

    for row in rows {
        contents.push_str(&format!(
            "{};{};{}\n",
            row.date.format("%Y-%m-%d"),
            row.usage.local_seconds,
            row.usage.cloud_seconds
        ));
    }

    fs::write(path, contents).context("Failed to write ledger file")
}

fn parse_row(line: &str) -> Option<LedgerRow> {
    let mut fields = line.trim().split(';');
    let date = NaiveDate::parse_from_str(fields.next()?, "%Y-%m-%d").ok()?;
    let local_seconds = fields.next()?.parse().ok()?;
    let cloud_seconds = fields.next()?.parse().ok()?;

    Some(LedgerRow {
        date,
        usage: DayUsage {
            local_seconds,
            cloud_seconds,
        },
    })
}
