//! Append-only journal for control decisions.
//!
//! Each line is a JSON-serialized [`ControlDecision`]. The journal backs
//! the audit trail across restarts: it supports replay for recovery,
//! rotation for archival, and graceful handling of corrupt lines. Records
//! are never updated or deleted.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use tl_core::types::ControlDecision;

/// Append-only decision journal.
///
/// Each line is a JSON-serialized `ControlDecision`. Writes are flushed
/// immediately so a committed decision survives a crash.
pub struct DecisionJournal {
    /// Path to the journal file.
    path: PathBuf,
    /// Buffered writer (None if the journal has been rotated and not reopened).
    writer: Option<BufWriter<File>>,
}

impl DecisionJournal {
    /// Create or open a journal file at the given path.
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open decision journal at {}", path.display()))?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Append a decision to the journal.
    ///
    /// Serializes to JSON, writes a single line, and flushes. The store
    /// calls this before updating its current-state index, so a failure
    /// here leaves no partial state behind.
    pub fn append(&mut self, decision: &ControlDecision) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("journal writer not available (rotated?)")?;

        let json =
            serde_json::to_string(decision).context("failed to serialize ControlDecision")?;
        writeln!(writer, "{}", json).context("failed to write to decision journal")?;
        writer.flush().context("failed to flush decision journal")?;
        Ok(())
    }

    /// Replay all decisions from the journal file.
    ///
    /// Corrupt lines are skipped with a warning log. Returns all
    /// successfully deserialized decisions in append order.
    pub fn replay(&self) -> Result<Vec<ControlDecision>> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open journal {} for replay", self.path.display()))?;
        let reader = BufReader::new(file);
        let mut decisions = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.context("failed to read journal line")?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ControlDecision>(&line) {
                Ok(decision) => decisions.push(decision),
                Err(e) => {
                    tracing::warn!(
                        line_num = line_num + 1,
                        error = %e,
                        "skipping corrupt journal line"
                    );
                }
            }
        }

        Ok(decisions)
    }

    /// Rotate the journal: rename the current file with a date suffix and
    /// open a new one. Returns the path to the rotated (old) file.
    pub fn rotate(&mut self) -> Result<PathBuf> {
        self.writer.take();

        let now = chrono::Utc::now();
        let suffix = now.format("%Y%m%d_%H%M%S");
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "decisions".into());
        let ext = self
            .path
            .extension()
            .map(|s| format!(".{}", s.to_string_lossy()))
            .unwrap_or_default();
        let rotated_name = format!("{}_{}{}", stem, suffix, ext);
        let rotated_path = self
            .path
            .parent()
            .unwrap_or(std::path::Path::new("."))
            .join(rotated_name);

        std::fs::rename(&self.path, &rotated_path)
            .with_context(|| format!("failed to rotate journal to {}", rotated_path.display()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open new journal at {}", self.path.display()))?;
        self.writer = Some(BufWriter::new(file));

        Ok(rotated_path)
    }

    /// Count the number of decisions (lines) in the journal.
    pub fn decision_count(&self) -> Result<usize> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open journal {} for counting", self.path.display()))?;
        let reader = BufReader::new(file);
        let count = reader
            .lines()
            .map_while(|l| l.ok())
            .filter(|l| !l.trim().is_empty())
            .count();
        Ok(count)
    }
}
