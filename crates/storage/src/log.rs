// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only update log.
//!
//! One serialized update per line, in application order. Only input updates
//! are written; generated ones are re-derived on replay. The log holds an
//! exclusive advisory lock for as long as it is open.

use fs2::FileExt;
use kiln_core::{Update, UpdateError, UpdateKind};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("update log {0} is locked by another process")]
    Locked(PathBuf),

    #[error("refusing to persist generated update {0}")]
    Generated(UpdateKind),

    #[error("cannot serialize update: {0}")]
    Encode(#[from] UpdateError),

    #[error("{path}:{line}: corrupt record: {reason}")]
    Corrupt { path: PathBuf, line: usize, reason: String },

    #[error("{path}: record {seq} cannot be replayed: {reason}")]
    Replay { path: PathBuf, seq: u64, reason: String },
}

/// A persisted update with its 1-based position in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub seq: u64,
    pub update: Update,
}

/// Single-writer handle on an update log file.
pub struct UpdateLog {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
    /// Updates appended since the last flush.
    pending: usize,
}

impl UpdateLog {
    /// Open (creating if needed) the log at `path` and take its lock.
    ///
    /// A torn final record, left by a crash mid-write, is truncated away.
    /// Any other unreadable record fails the open.
    pub fn open(path: &Path) -> Result<Self, LogError> {
        let io_err = |source| LogError::Io { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        if file.try_lock_exclusive().is_err() {
            return Err(LogError::Locked(path.to_path_buf()));
        }

        let scan = scan(path)?;
        let mut writer = BufWriter::new(file);
        if let Some(torn_at) = scan.torn_at {
            warn!(path = %path.display(), offset = torn_at, "truncating torn record at end of log");
            writer.get_ref().set_len(torn_at).map_err(io_err)?;
        } else if scan.unterminated {
            writer.write_all(b"\n").map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            write_seq: scan.entries.len() as u64,
            pending: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number of the last appended record (0 when empty).
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Buffer one input update for writing. Returns its sequence number.
    pub fn append(&mut self, update: &Update) -> Result<u64, LogError> {
        if update.is_generated() {
            return Err(LogError::Generated(update.kind()));
        }
        let record = update.serialize()?;
        writeln!(self.writer, "{record}").map_err(|e| self.io_err(e))?;
        self.write_seq += 1;
        self.pending += 1;
        debug!(seq = self.write_seq, kind = %update.kind(), "appended update");
        Ok(self.write_seq)
    }

    /// Whether buffered records are waiting for [`flush`](Self::flush).
    pub fn needs_flush(&self) -> bool {
        self.pending > 0
    }

    /// Write buffered records through to disk.
    pub fn flush(&mut self) -> Result<(), LogError> {
        if self.pending == 0 {
            return Ok(());
        }
        self.writer.flush().map_err(|e| self.io_err(e))?;
        self.writer.get_ref().sync_data().map_err(|e| self.io_err(e))?;
        self.pending = 0;
        Ok(())
    }

    /// Read back every record on disk, in order.
    ///
    /// Buffered records are flushed first so the result includes them.
    pub fn entries(&mut self) -> Result<Vec<LogEntry>, LogError> {
        self.flush()?;
        let scan = scan(&self.path)?;
        if let Some(offset) = scan.torn_at {
            return Err(LogError::Corrupt {
                path: self.path.clone(),
                line: scan.entries.len() + 1,
                reason: format!("incomplete record at offset {offset}"),
            });
        }
        Ok(scan.entries)
    }

    fn io_err(&self, source: std::io::Error) -> LogError {
        LogError::Io { path: self.path.clone(), source }
    }
}

impl Drop for UpdateLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush update log on close");
        }
    }
}

struct Scan {
    entries: Vec<LogEntry>,
    /// Byte offset of an unterminated, undecodable final record.
    torn_at: Option<u64>,
    /// The final record decoded but lacks its newline.
    unterminated: bool,
}

fn scan(path: &Path) -> Result<Scan, LogError> {
    let io_err = |source| LogError::Io { path: path.to_path_buf(), source };
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);

    let mut entries = Vec::new();
    let mut offset = 0u64;
    let mut line_no = 0usize;
    let mut buf = Vec::new();
    let mut unterminated = false;
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(io_err)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let terminated = buf.last() == Some(&b'\n');
        unterminated = !terminated;

        match decode(&buf) {
            Ok(Some(update)) => {
                entries.push(LogEntry { seq: entries.len() as u64 + 1, update });
            }
            Ok(None) => {}
            Err(_) if !terminated => {
                return Ok(Scan { entries, torn_at: Some(offset), unterminated: false });
            }
            Err(reason) => {
                return Err(LogError::Corrupt { path: path.to_path_buf(), line: line_no, reason });
            }
        }
        offset += read as u64;
    }
    Ok(Scan { entries, torn_at: None, unterminated })
}

/// Decode one raw line. Blank lines decode to `None`.
fn decode(raw: &[u8]) -> Result<Option<Update>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    let text = text.trim_end_matches(['\n', '\r']);
    if text.trim().is_empty() {
        return Ok(None);
    }
    Update::construct(text).map(Some).map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
