//! Sender: show one chunk, wait for its acknowledgment, move on.
//!
//! ```text
//! PickingFile -> Idle -> Displaying(0) -> AwaitingAck(0) -> Displaying(1) -> ... -> Done
//!      |
//!      +-> Aborted (nothing picked)
//! ```
//!
//! There is no timeout. The sender keeps polling the camera until the
//! receiver's acknowledgment for the chunk on screen shows up or the run
//! is cancelled.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::chunker;
use crate::classify;
use crate::codec;
use crate::error::TransferError;
use crate::link::{Display, FileSource, Pacer, Scanner, VisualLink};
use crate::logging::{TransferEvent, TransferLog, TransferLogger};
use crate::progress::{Phase, TransferProgress};
use crate::record::{ChunkRecord, DEFAULT_CHUNK_SIZE};

const COMPONENT: &str = "sender";

/// Sender state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    PickingFile,
    Idle,
    Displaying { id: u64 },
    AwaitingAck { id: u64 },
    Done,
    Aborted,
}

/// What a scanned frame meant while awaiting an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The awaited acknowledgment; the session moved on.
    Accepted { id: u64 },
    /// A record, but not the acknowledgment for the chunk on screen.
    Ignored { got: u64 },
    /// Not a record at all.
    Undecodable,
    /// The session is not waiting for an acknowledgment.
    NotAwaiting,
}

/// The sender protocol without any I/O: which chunk is up and whether a
/// scanned frame acknowledges it.
#[derive(Debug)]
pub struct SenderSession {
    chunks: Vec<ChunkRecord>,
    next: usize,
    state: SenderState,
}

impl SenderSession {
    /// A session waiting for the host to pick a file.
    pub fn picking() -> Self {
        Self {
            chunks: Vec::new(),
            next: 0,
            state: SenderState::PickingFile,
        }
    }

    pub fn new(file_name: &str, data: &[u8], chunk_size: usize) -> Self {
        Self::from_chunks(chunker::build_chunks_with_size(file_name, data, chunk_size))
    }

    /// The picked file: chunk it and move to `Idle`. No effect outside
    /// `PickingFile`.
    pub fn load(&mut self, file_name: &str, data: &[u8], chunk_size: usize) {
        if self.state == SenderState::PickingFile {
            *self = Self::new(file_name, data, chunk_size);
        }
    }

    /// Nothing was picked. No effect outside `PickingFile`.
    pub fn abort(&mut self) {
        if self.state == SenderState::PickingFile {
            self.state = SenderState::Aborted;
        }
    }

    /// Start from a prepared chunk sequence (metadata record first).
    pub fn from_chunks(chunks: Vec<ChunkRecord>) -> Self {
        let state = if chunks.is_empty() {
            SenderState::Done
        } else {
            SenderState::Idle
        };
        Self {
            chunks,
            next: 0,
            state,
        }
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn chunks(&self) -> &[ChunkRecord] {
        &self.chunks
    }

    /// Number of data chunks, excluding the metadata record.
    pub fn total_chunks(&self) -> u64 {
        self.chunks.len().saturating_sub(1) as u64
    }

    /// Chunks acknowledged so far, metadata included.
    pub fn acknowledged(&self) -> usize {
        self.next
    }

    pub fn current(&self) -> Option<&ChunkRecord> {
        self.chunks.get(self.next)
    }

    /// Move to `Displaying` for the current chunk and hand it out for
    /// rendering. `None` once everything is acknowledged.
    pub fn begin_display(&mut self) -> Option<&ChunkRecord> {
        match self.chunks.get(self.next) {
            Some(chunk) => {
                self.state = SenderState::Displaying { id: chunk.id() };
                Some(chunk)
            }
            None => {
                self.state = SenderState::Done;
                None
            }
        }
    }

    /// The current chunk is on screen; start waiting for its acknowledgment.
    pub fn displayed(&mut self) {
        if let SenderState::Displaying { id } = self.state {
            self.state = SenderState::AwaitingAck { id };
        }
    }

    /// Feed one scanned frame.
    pub fn on_frame(&mut self, text: &str) -> AckOutcome {
        let SenderState::AwaitingAck { id } = self.state else {
            return AckOutcome::NotAwaiting;
        };
        let Some(current) = self.chunks.get(self.next) else {
            return AckOutcome::NotAwaiting;
        };
        let decoded = codec::decode(text);
        if classify::is_acknowledgment_for(decoded.as_ref(), current) {
            self.next += 1;
            self.state = match self.chunks.get(self.next) {
                Some(next) => SenderState::Displaying { id: next.id() },
                None => SenderState::Done,
            };
            return AckOutcome::Accepted { id };
        }
        match decoded {
            Some(record) => AckOutcome::Ignored { got: record.id() },
            None => AckOutcome::Undecodable,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == SenderState::Done
    }
}

/// Configuration for the sender.
#[derive(Clone)]
pub struct SenderConfig {
    pub chunk_size: usize,
    pub logger: Option<Arc<dyn TransferLogger>>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            logger: None,
        }
    }
}

/// Result of a completed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub file_name: String,
    pub bytes: usize,
    pub total_chunks: u64,
    pub duration: Duration,
}

/// Surface name for a chunk on the sender's screen.
pub fn chunk_label(id: u64) -> String {
    format!("chunk {}", id)
}

/// Run the sender: pick a file, then show every chunk until acknowledged.
/// Blocks until done, cancelled or failed.
pub fn run_sender<F, S, D, P>(
    config: &SenderConfig,
    source: &mut F,
    link: &mut VisualLink<S, D, P>,
    progress: &TransferProgress,
) -> Result<SendReport, TransferError>
where
    F: FileSource + ?Sized,
    S: Scanner,
    D: Display,
    P: Pacer,
{
    let mut session = SenderSession::picking();
    let result = send(config, &mut session, source, link, progress);
    if let Err(ref e) = result {
        // A chunk left on screen would be picked up by the next receiver.
        if let Err(clear_err) = link.clear_all() {
            tracing::warn!("failed to clear sender display: {}", clear_err);
        }
        let phase = match e {
            TransferError::NoInputSelected => Phase::Aborted,
            TransferError::Cancelled => Phase::Cancelled,
            _ => Phase::Failed,
        };
        progress.set_phase(phase);
        progress.set_error(e.to_string());
        log(config, TransferEvent::Error { message: e.to_string() });
    }
    result
}

fn send<F, S, D, P>(
    config: &SenderConfig,
    session: &mut SenderSession,
    source: &mut F,
    link: &mut VisualLink<S, D, P>,
    progress: &TransferProgress,
) -> Result<SendReport, TransferError>
where
    F: FileSource + ?Sized,
    S: Scanner,
    D: Display,
    P: Pacer,
{
    progress.set_phase(Phase::PickingFile);
    let input = match source.pick_input() {
        Ok(Some(input)) => input,
        Ok(None) => {
            session.abort();
            return Err(TransferError::NoInputSelected);
        }
        Err(e) => {
            session.abort();
            return Err(TransferError::Read(e));
        }
    };

    session.load(&input.name, &input.bytes, config.chunk_size);
    let total_chunks = session.total_chunks();
    log(
        config,
        TransferEvent::FileLoaded {
            file_name: input.name.clone(),
            bytes: input.bytes.len(),
            total_chunks,
        },
    );
    progress.chunks_total.store(total_chunks, Ordering::Relaxed);
    progress.set_phase(Phase::Transferring);

    let start = Instant::now();
    loop {
        let Some(chunk) = session.begin_display() else {
            break;
        };
        let id = chunk.id();
        let text = codec::encode(chunk).map_err(|source| TransferError::Encode { id, source })?;
        let label = chunk_label(id);
        link.show(&text, &label)?;
        session.displayed();
        log(config, TransferEvent::ChunkDisplayed { id });

        loop {
            let frame = link.next_frame()?;
            match session.on_frame(&frame) {
                AckOutcome::Accepted { .. } => break,
                AckOutcome::Ignored { got } => {
                    log(config, TransferEvent::AckIgnored { expected: id, got });
                    link.pause()?;
                }
                AckOutcome::Undecodable | AckOutcome::NotAwaiting => link.pause()?,
            }
        }

        link.clear(&label)?;
        log(config, TransferEvent::AckReceived { id });
        if id > 0 {
            progress.chunks_complete.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                "chunk {}/{} acknowledged ({:.1}%)",
                id,
                total_chunks,
                progress.percent()
            );
        } else {
            tracing::info!("receiver accepted metadata for {}", input.name);
        }
    }

    let duration = start.elapsed();
    progress.set_phase(Phase::Complete);
    log(
        config,
        TransferEvent::TransferComplete {
            total_chunks,
            duration_ms: duration.as_millis() as u64,
        },
    );

    Ok(SendReport {
        file_name: input.name,
        bytes: input.bytes.len(),
        total_chunks,
        duration,
    })
}

fn log(config: &SenderConfig, event: TransferEvent) {
    if let Some(ref logger) = config.logger {
        logger.log(TransferLog {
            component: COMPONENT,
            event,
        });
    }
}
