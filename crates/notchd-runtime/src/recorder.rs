//! Append-only JSONL log of accepted mode changes (`notchd run --record`).

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use notchd_coordinator::ModeChange;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One line of the record file: the change plus the wall-clock time it was
/// written.
#[derive(Debug, Serialize)]
pub struct RecordedChange {
    pub ts: String,
    #[serde(flatten)]
    pub change: ModeChange,
}

pub struct Recorder {
    out: BufWriter<File>,
    changes: broadcast::Receiver<ModeChange>,
    cancel: CancellationToken,
    written: u64,
}

impl Recorder {
    /// Appends to `path`, creating it if missing.
    pub fn with_cancel(
        path: &Path,
        changes: broadcast::Receiver<ModeChange>,
        cancel: CancellationToken,
    ) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            changes,
            cancel,
            written: 0,
        })
    }

    fn append(&mut self, change: ModeChange) -> std::io::Result<()> {
        let record = RecordedChange {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            change,
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        // Each line is flushed so a killed daemon leaves a readable file.
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Record changes until the sender side closes or `cancel` fires.
    /// Returns the number of lines written.
    pub async fn run(&mut self) -> u64 {
        loop {
            tokio::select! {
                received = self.changes.recv() => match received {
                    Ok(change) => {
                        let sequence = change.sequence;
                        if let Err(e) = self.append(change) {
                            error!(sequence, error = %e, "recorder: failed to append change");
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "recorder: fell behind, changes missing from record");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = self.cancel.cancelled() => {
                    debug!("recorder: cancelled");
                    break;
                }
            }
        }
        info!(written = self.written, "recorder: stopped");
        self.written
    }
}
