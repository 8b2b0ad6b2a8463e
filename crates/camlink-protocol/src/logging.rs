//! Structured transfer logging.
//!
//! The sender and receiver report protocol milestones as `TransferEvent`s
//! through a `TransferLogger`, so a host can mirror them to a status line,
//! a file or `tracing`.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Structured log entry for a transfer operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLog {
    pub component: &'static str,
    pub event: TransferEvent,
}

/// Transfer events that can be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Sender: file picked and split
    FileLoaded {
        file_name: String,
        bytes: usize,
        total_chunks: u64,
    },
    /// Sender: chunk put on screen
    ChunkDisplayed {
        id: u64,
    },
    /// Sender: acknowledgment seen for the chunk on screen
    AckReceived {
        id: u64,
    },
    /// Sender: decodable record that is not the awaited acknowledgment
    AckIgnored {
        expected: u64,
        got: u64,
    },
    /// Receiver: metadata accepted
    MetadataReceived {
        file_name: String,
        total_chunks: u64,
    },
    /// Receiver: new data chunk stored
    ChunkStored {
        id: u64,
        received: u64,
        total: u64,
    },
    /// Receiver: chunk already stored, not acknowledged again
    DuplicateChunk {
        id: u64,
    },
    /// Receiver: data id beyond the announced chunk count
    OutOfWindowChunk {
        id: u64,
        total: u64,
    },
    /// Receiver: acknowledgment put on screen
    AckSent {
        id: u64,
    },
    /// Receiver: chunks joined in id order
    FileReconstructed {
        bytes: usize,
    },
    /// Receiver: file written
    FileSaved {
        path: String,
    },
    /// Transfer complete
    TransferComplete {
        total_chunks: u64,
        duration_ms: u64,
    },
    /// Error occurred
    Error {
        message: String,
    },
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileLoaded { file_name, bytes, total_chunks } => {
                write!(f, "file_loaded name={} bytes={} chunks={}", file_name, bytes, total_chunks)
            }
            Self::ChunkDisplayed { id } => write!(f, "chunk_displayed id={}", id),
            Self::AckReceived { id } => write!(f, "ack_received id={}", id),
            Self::AckIgnored { expected, got } => {
                write!(f, "ack_ignored expected={} got={}", expected, got)
            }
            Self::MetadataReceived { file_name, total_chunks } => {
                write!(f, "metadata_received name={} chunks={}", file_name, total_chunks)
            }
            Self::ChunkStored { id, received, total } => {
                write!(f, "chunk_stored id={} progress={}/{}", id, received, total)
            }
            Self::DuplicateChunk { id } => write!(f, "duplicate_chunk id={}", id),
            Self::OutOfWindowChunk { id, total } => {
                write!(f, "out_of_window_chunk id={} total={}", id, total)
            }
            Self::AckSent { id } => write!(f, "ack_sent id={}", id),
            Self::FileReconstructed { bytes } => write!(f, "file_reconstructed bytes={}", bytes),
            Self::FileSaved { path } => write!(f, "file_saved path={}", path),
            Self::TransferComplete { total_chunks, duration_ms } => {
                write!(f, "transfer_complete chunks={} duration_ms={}", total_chunks, duration_ms)
            }
            Self::Error { message } => write!(f, "error: {}", message),
        }
    }
}

/// Trait for transfer logging. Implementations can write to tracing,
/// collect entries, or discard them.
pub trait TransferLogger: Send + Sync {
    fn log(&self, entry: TransferLog);
}

/// Logger that uses the `tracing` crate.
pub struct TracingLogger;

impl TransferLogger for TracingLogger {
    fn log(&self, entry: TransferLog) {
        match &entry.event {
            TransferEvent::FileLoaded { .. }
            | TransferEvent::MetadataReceived { .. }
            | TransferEvent::FileSaved { .. }
            | TransferEvent::TransferComplete { .. } => {
                tracing::info!(component = entry.component, "{}", entry.event);
            }
            TransferEvent::Error { .. } => {
                tracing::warn!(component = entry.component, "{}", entry.event);
            }
            _ => {
                tracing::debug!(component = entry.component, "{}", entry.event);
            }
        }
    }
}

/// No-op logger that discards all log entries.
pub struct NullLogger;

impl TransferLogger for NullLogger {
    fn log(&self, _entry: TransferLog) {}
}

/// Logger that keeps every entry, for hosts that replay them later.
#[derive(Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<TransferLog>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TransferEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }
}

impl TransferLogger for MemoryLogger {
    fn log(&self, entry: TransferLog) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
