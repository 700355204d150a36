//! File-backed audit persistence
//!
//! JSON-lines append-only store. Idempotency keys already on disk are
//! re-indexed on open, so a caller retrying events after a crash gets
//! deduplicated receipts instead of duplicate rows.
//!
//! Writes track how many bytes the file accepted, so a retry after a
//! transient error resumes mid-line instead of appending the whole line
//! again. Rows therefore stay parseable across retries; a row can only be
//! truncated by a crash, never duplicated or interleaved.

use crate::audit::{AuditEvent, AuditRecorder, RecordReceipt};
use fieldveil_core::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

const AUDIT_FILE: &str = "audit.jsonl";

/// Configuration for the JSONL store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the audit file
    pub dir: PathBuf,

    /// Flush to disk after this many events
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,

    /// Write retry attempts before surfacing an error
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Backoff between retries, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./audit"),
            flush_interval: default_flush_interval(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_flush_interval() -> usize {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    50
}

struct WriterState {
    file: File,
    /// Serialized lines accepted by `record` but not yet by the file
    pending: Vec<u8>,
    seen: HashSet<String>,
    events_since_flush: usize,
}

/// Append-only JSON-lines audit store
pub struct JsonlAuditStore {
    config: StoreConfig,
    path: PathBuf,
    state: Mutex<WriterState>,
}

impl JsonlAuditStore {
    /// Open (or create) the store, rebuilding the deduplication index from
    /// events already on disk.
    pub fn open(config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        let path = config.dir.join(AUDIT_FILE);

        let mut seen = HashSet::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<AuditEvent>(&line) {
                    Ok(event) => {
                        seen.insert(event.idempotency_key());
                    }
                    Err(e) => debug!("skipping unparsable audit line: {}", e),
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), indexed = seen.len(), "audit store opened");

        Ok(Self {
            config,
            path,
            state: Mutex::new(WriterState {
                file,
                pending: Vec::new(),
                seen,
                events_since_flush: 0,
            }),
        })
    }

    fn flush_state(&self, state: &mut WriterState) -> Result<()> {
        write_pending(
            &mut state.file,
            &mut state.pending,
            self.config.retry_attempts,
            self.config.retry_backoff_ms,
        )?;
        state.events_since_flush = 0;
        Ok(())
    }
}

/// Write `pending` to `writer` without ever resending accepted bytes.
///
/// `Write::write` guarantees no bytes were consumed when it errors, so the
/// offset is only advanced on `Ok(n)` and a retry resumes with the exact
/// unwritten suffix. When retries run out, the accepted prefix is drained
/// from `pending` so a later call continues where the writer left off.
fn write_pending(
    writer: &mut impl Write,
    pending: &mut Vec<u8>,
    retry_attempts: u32,
    retry_backoff_ms: u64,
) -> Result<()> {
    let mut offset = 0;
    let mut attempt = 0;
    while offset < pending.len() {
        match writer.write(&pending[offset..]) {
            Ok(0) => {
                pending.drain(..offset);
                return Err(Error::audit("audit file accepted no bytes"));
            }
            Ok(n) => {
                offset += n;
                attempt = 0;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) if attempt + 1 < retry_attempts => {
                attempt += 1;
                warn!(attempt, "audit write failed, retrying: {}", e);
                std::thread::sleep(Duration::from_millis(retry_backoff_ms * u64::from(attempt)));
            }
            Err(e) => {
                pending.drain(..offset);
                return Err(Error::audit(format!("audit write failed: {e}")));
            }
        }
    }
    pending.clear();
    Ok(())
}

impl AuditRecorder for JsonlAuditStore {
    fn record(&self, event: &AuditEvent) -> Result<RecordReceipt> {
        let key = event.idempotency_key();
        let mut state = self.state.lock();

        if state.seen.contains(&key) {
            return Ok(RecordReceipt {
                key,
                deduplicated: true,
            });
        }

        let line = serde_json::to_string(event)?;
        state.pending.extend_from_slice(line.as_bytes());
        state.pending.push(b'\n');
        state.seen.insert(key.clone());
        state.events_since_flush += 1;

        if state.events_since_flush >= self.config.flush_interval {
            self.flush_state(&mut state)?;
        }

        Ok(RecordReceipt {
            key,
            deduplicated: false,
        })
    }

    fn query(&self, record_id: &str) -> Result<Vec<AuditEvent>> {
        self.flush()?;

        let mut matching = Vec::new();
        let reader = BufReader::new(File::open(&self.path)?);
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEvent>(&line) {
                Ok(event) if event.record_id == record_id => matching.push(event),
                Ok(_) => {}
                Err(e) => debug!("skipping unparsable audit line: {}", e),
            }
        }
        matching.sort_by_key(|event| event.sequence);
        Ok(matching)
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.flush_state(&mut state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use tempfile::TempDir;

    fn config(dir: &std::path::Path) -> StoreConfig {
        StoreConfig {
            dir: dir.to_path_buf(),
            flush_interval: 1,
            ..StoreConfig::default()
        }
    }

    fn event(record_id: &str, path: &str, sequence: u64) -> AuditEvent {
        AuditEvent::success(record_id, path.into(), "mask", sequence, Some("masked".into()))
    }

    #[test]
    fn write_then_query_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonlAuditStore::open(config(dir.path())).unwrap();

        store.record(&event("rec-1", "email", 0)).unwrap();
        store.record(&event("rec-1", "user.ssn", 1)).unwrap();
        store.record(&event("rec-2", "email", 0)).unwrap();

        let events = store.query("rec-1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].field_path.to_string(), "email");
        assert_eq!(events[1].field_path.to_string(), "user.ssn");
    }

    #[test]
    fn duplicate_keys_are_stored_once() {
        let dir = TempDir::new().unwrap();
        let store = JsonlAuditStore::open(config(dir.path())).unwrap();

        let event = event("rec-1", "email", 0);
        assert!(!store.record(&event).unwrap().deduplicated);
        assert!(store.record(&event).unwrap().deduplicated);

        assert_eq!(store.query("rec-1").unwrap().len(), 1);
    }

    #[test]
    fn dedup_index_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let event = event("rec-1", "email", 0);

        {
            let store = JsonlAuditStore::open(config(dir.path())).unwrap();
            store.record(&event).unwrap();
            store.flush().unwrap();
        }

        // A caller retrying after a crash gets a deduplicated receipt.
        let store = JsonlAuditStore::open(config(dir.path())).unwrap();
        assert!(store.record(&event).unwrap().deduplicated);
        assert_eq!(store.query("rec-1").unwrap().len(), 1);
    }

    #[test]
    fn query_orders_by_sequence_not_write_order() {
        let dir = TempDir::new().unwrap();
        let store = JsonlAuditStore::open(config(dir.path())).unwrap();

        store.record(&event("rec-1", "late", 2)).unwrap();
        store.record(&event("rec-1", "early", 0)).unwrap();
        store.record(&event("rec-1", "mid", 1)).unwrap();

        let paths: Vec<String> = store
            .query("rec-1")
            .unwrap()
            .iter()
            .map(|e| e.field_path.to_string())
            .collect();
        assert_eq!(paths, vec!["early", "mid", "late"]);
    }

    enum Step {
        Accept(usize),
        Fail,
    }

    /// Writer that accepts or rejects bytes per a scripted plan, accepting
    /// everything once the plan runs out
    struct FlakyWriter {
        accepted: Vec<u8>,
        plan: VecDeque<Step>,
    }

    impl FlakyWriter {
        fn new(plan: Vec<Step>) -> Self {
            Self {
                accepted: Vec::new(),
                plan: plan.into(),
            }
        }
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.plan.pop_front() {
                Some(Step::Accept(n)) => {
                    let n = n.min(buf.len());
                    self.accepted.extend_from_slice(&buf[..n]);
                    Ok(n)
                }
                Some(Step::Fail) => Err(io::Error::new(io::ErrorKind::Other, "disk hiccup")),
                None => {
                    self.accepted.extend_from_slice(buf);
                    Ok(buf.len())
                }
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn retry_resumes_after_accepted_bytes_keeping_the_row_intact() {
        let line = b"{\"correlation_id\":\"evt_1\"}\n";
        let mut writer = FlakyWriter::new(vec![Step::Accept(5), Step::Fail, Step::Accept(3)]);
        let mut pending = line.to_vec();

        write_pending(&mut writer, &mut pending, 3, 1).unwrap();

        // The accepted prefix was not resent after the transient error.
        assert_eq!(writer.accepted, line);
        assert!(pending.is_empty());
    }

    #[test]
    fn exhausted_retries_keep_the_unwritten_suffix_pending() {
        let line = b"{\"correlation_id\":\"evt_2\"}\n";
        let mut writer = FlakyWriter::new(vec![Step::Accept(4), Step::Fail, Step::Fail, Step::Fail]);
        let mut pending = line.to_vec();

        assert!(write_pending(&mut writer, &mut pending, 3, 1).is_err());
        assert_eq!(writer.accepted, &line[..4]);
        assert_eq!(pending, &line[4..]);

        // A later flush completes the row exactly where the file left off.
        write_pending(&mut writer, &mut pending, 3, 1).unwrap();
        assert_eq!(writer.accepted, line);
    }
}
