//! Per-session streaming token logs.
//!
//! Every chunk a session streams is buffered in memory and periodically
//! flushed to `<dir>/streaming/active/<session>.log` by one shared background
//! task. The calling path (`append`) does no I/O. Completing a session
//! force-flushes, closes, and deletes its file: the raw stream log exists for
//! observing *live* sessions (runaway generation, stalls); the durable record
//! is the structured event log.
//!
//! All shared state lives behind a single mutex owned by this struct. The
//! flush path swaps the buffer out under the lock, so chunks appended while
//! a write is in progress land in a fresh buffer and are picked up by the
//! next cycle.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::schema::StreamingLogConfig;

struct StreamLogState {
    /// session id -> buffered chunks awaiting flush.
    buffers: HashMap<String, Vec<String>>,
    /// session id -> open append handle for the active log file.
    files: HashMap<String, File>,
    /// session id -> last flush time.
    last_flush: HashMap<String, Instant>,
}

/// Buffered, periodically-flushed streaming logger shared by all sessions.
pub struct StreamLogger {
    enabled: bool,
    active_dir: PathBuf,
    flush_interval: Duration,
    state: Mutex<StreamLogState>,
}

impl StreamLogger {
    /// Create a logger rooted at `<base_dir>/streaming/active`.
    ///
    /// The directory is created eagerly; failure to create it disables the
    /// logger rather than failing the caller.
    pub fn new(base_dir: &Path, config: &StreamingLogConfig) -> Arc<Self> {
        let active_dir = base_dir.join("streaming").join("active");
        let mut enabled = config.enabled;

        if enabled {
            if let Err(e) = std::fs::create_dir_all(&active_dir) {
                warn!(
                    "Failed to create streaming log dir {}: {}; streaming logs disabled",
                    active_dir.display(),
                    e
                );
                enabled = false;
            }
        }

        Arc::new(Self {
            enabled,
            active_dir,
            flush_interval: Duration::from_secs(config.flush_interval_secs.max(1)),
            state: Mutex::new(StreamLogState {
                buffers: HashMap::new(),
                files: HashMap::new(),
                last_flush: HashMap::new(),
            }),
        })
    }

    /// Spawn the shared background flush task.
    ///
    /// One task serves every session. It wakes each interval and flushes
    /// sessions whose buffered content is at least one interval old.
    pub fn spawn_flush_worker(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let logger = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(logger.flush_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !logger.enabled {
                    continue;
                }
                let session_ids: Vec<String> = {
                    let state = logger.state.lock().await;
                    state.buffers.keys().cloned().collect()
                };
                for session_id in session_ids {
                    logger.flush_session(&session_id, false).await;
                }
            }
        })
    }

    /// Add a streaming chunk to the session's in-memory buffer. No I/O.
    pub async fn append(&self, session_id: &str, content: &str) {
        if !self.enabled || session_id.is_empty() || content.is_empty() {
            return;
        }
        let mut state = self.state.lock().await;
        state
            .buffers
            .entry(session_id.to_string())
            .or_default()
            .push(content.to_string());
    }

    /// Flush one session's buffer to its active log file.
    ///
    /// Without `force`, sessions flushed more recently than the interval are
    /// skipped. The buffer is swapped out under the lock and the write runs
    /// with the lock released.
    pub async fn flush_session(&self, session_id: &str, force: bool) {
        if !self.enabled {
            return;
        }

        let (chunks, file) = {
            let mut state = self.state.lock().await;

            if !force {
                if let Some(last) = state.last_flush.get(session_id) {
                    if last.elapsed() < self.flush_interval {
                        return;
                    }
                }
            }

            let chunks = match state.buffers.get_mut(session_id) {
                Some(buf) if !buf.is_empty() => std::mem::take(buf),
                _ => return,
            };

            // Take the handle out of the map for the duration of the write;
            // concurrent appends go to the fresh buffer left behind.
            let file = match state.files.remove(session_id) {
                Some(f) => f,
                None => {
                    let path = self.session_path(session_id);
                    match OpenOptions::new().create(true).append(true).open(&path) {
                        Ok(f) => f,
                        Err(e) => {
                            warn!(
                                "Failed to open streaming log {}: {}; dropping {} chunks",
                                path.display(),
                                e,
                                chunks.len()
                            );
                            return;
                        }
                    }
                }
            };

            (chunks, file)
        };

        let mut file = file;
        let content = chunks.concat();
        if let Err(e) = file.write_all(content.as_bytes()).and_then(|_| file.sync_data()) {
            warn!("Failed to write streaming log for {}: {}", session_id, e);
        }

        let mut state = self.state.lock().await;
        // A session completed mid-write has no buffer entry any more;
        // re-inserting its handle would leak state for a dead session.
        if state.buffers.contains_key(session_id) {
            state.files.insert(session_id.to_string(), file);
            state.last_flush.insert(session_id.to_string(), Instant::now());
        }
    }

    /// Complete a session: final flush, close the handle, delete the file,
    /// and discard all in-memory state. A completed session leaves no
    /// streaming artifact on disk.
    pub async fn complete(&self, session_id: &str) {
        if !self.enabled {
            return;
        }

        self.flush_session(session_id, true).await;

        let mut state = self.state.lock().await;
        state.buffers.remove(session_id);
        state.last_flush.remove(session_id);
        // Dropping the handle closes the file before removal.
        drop(state.files.remove(session_id));

        let path = self.session_path(session_id);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(
                    "Failed to remove streaming log {}: {}",
                    path.display(),
                    e
                );
            } else {
                debug!("Removed streaming log for completed session {}", session_id);
            }
        }
    }

    /// Delete active log files whose last modification is older than
    /// `max_age`. Safeguard for sessions abandoned by a crash; deletion is
    /// unconditional.
    ///
    /// Returns the number of files removed.
    pub fn cleanup_stale(&self, max_age: Duration) -> usize {
        if !self.enabled {
            return 0;
        }

        let entries = match std::fs::read_dir(&self.active_dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(
                    "Failed to scan streaming log dir {}: {}",
                    self.active_dir.display(),
                    e
                );
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("log") {
                continue;
            }
            let modified = entry.metadata().and_then(|m| m.modified());
            let stale = match modified {
                Ok(mtime) => mtime
                    .elapsed()
                    .map(|elapsed| elapsed > max_age)
                    .unwrap_or(false),
                Err(_) => false,
            };
            if stale {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        debug!("Cleaned up stale streaming log {}", path.display());
                        removed += 1;
                    }
                    Err(e) => warn!("Failed to remove stale log {}: {}", path.display(), e),
                }
            }
        }
        removed
    }

    /// Path of a session's active log file.
    fn session_path(&self, session_id: &str) -> PathBuf {
        // Session ids are caller-supplied; keep them filesystem-safe.
        let safe: String = session_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.active_dir.join(format!("{}.log", safe))
    }
}
