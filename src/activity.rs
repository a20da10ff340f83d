use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::warn;

/// Terminal outcome for one processed issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    WouldComment,
    Commented,
    Skipped,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::WouldComment => write!(f, "Would comment"),
            Action::Commented => write!(f, "Commented"),
            Action::Skipped => write!(f, "Skipped"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub repository: String,
    pub number: u64,
    pub title: String,
    pub action: Action,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only audit trail, one file per calendar day.
///
/// Records are a diagnostic artifact: a failed write is logged and the run
/// moves on.
pub struct ActivityLog {
    dir: PathBuf,
}

impl ActivityLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, timestamp: &DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("processed_issues_{}.log", timestamp.format("%Y%m%d")))
    }

    fn format_line(record: &ActionRecord) -> String {
        format!(
            "{} | {} | Issue #{} | {}\n",
            record.timestamp.to_rfc3339(),
            record.repository,
            record.number,
            record.action
        )
    }

    pub fn record(&self, record: &ActionRecord) {
        if let Err(e) = self.append(record) {
            warn!(
                repo = record.repository,
                number = record.number,
                error = %e,
                "failed to persist activity record"
            );
        }
    }

    fn append(&self, record: &ActionRecord) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(&record.timestamp))?;
        file.write_all(Self::format_line(record).as_bytes())
    }
}
