//! Receiver: scan chunks, acknowledge each new one, rebuild the file.
//!
//! ```text
//! Idle -> ScanningForMetadata -> ReceivingData -> Reconstructing -> Saved
//!                        |                            ^
//!                        +---- total_chunks == 0 -----+
//! ```
//!
//! Chunks may arrive in any order and any number of times. Each id is
//! stored and acknowledged once; the file is joined in id order.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::classify::{self, RecordKind};
use crate::codec;
use crate::error::TransferError;
use crate::link::{Display, FileSink, Pacer, Scanner, VisualLink};
use crate::logging::{TransferEvent, TransferLog, TransferLogger};
use crate::progress::{Phase, TransferProgress};
use crate::record::{FileMetadata, METADATA_ID, UNKNOWN_FILE_NAME};

const COMPONENT: &str = "receiver";

/// How long the last acknowledgment stays up before the receiver moves on,
/// so the sender has a chance to see it.
pub const DEFAULT_ACK_LINGER: Duration = Duration::from_millis(1500);

/// Outcome of offering a data chunk to the reassembly buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Stored,
    Duplicate,
    OutOfWindow,
}

/// Reassembly buffer: data ids `1..=total` mapped to their payloads.
/// A stored id is never overwritten.
#[derive(Debug)]
pub struct Reassembly {
    total: u64,
    chunks: BTreeMap<u64, Vec<u8>>,
}

impl Reassembly {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            chunks: BTreeMap::new(),
        }
    }

    pub fn offer(&mut self, id: u64, payload: Vec<u8>) -> Offer {
        if id == METADATA_ID || id > self.total {
            return Offer::OutOfWindow;
        }
        if self.chunks.contains_key(&id) {
            return Offer::Duplicate;
        }
        self.chunks.insert(id, payload);
        Offer::Stored
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn received(&self) -> u64 {
        self.chunks.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.received() == self.total
    }

    /// Ids still missing, ascending.
    pub fn missing(&self) -> impl Iterator<Item = u64> + '_ {
        (1..=self.total).filter(move |id| !self.chunks.contains_key(id))
    }

    /// Join the payloads in ascending id order.
    pub fn assemble(self) -> Vec<u8> {
        let len = self.chunks.values().map(Vec::len).sum();
        let mut out = Vec::with_capacity(len);
        for payload in self.chunks.into_values() {
            out.extend_from_slice(&payload);
        }
        out
    }
}

/// Receiver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Idle,
    ScanningForMetadata,
    ReceivingData,
    Reconstructing,
    Saved,
}

/// What to do after a scanned frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverStep {
    /// Accepted something new: put up the acknowledgment for `id`.
    Acknowledge(u64),
    /// Already have this data chunk. No acknowledgment.
    Duplicate(u64),
    /// Data id outside `1..=total_chunks`. No acknowledgment.
    OutOfWindow(u64),
    /// Not relevant in the current state.
    Ignored,
}

/// The receiver protocol without any I/O.
#[derive(Debug)]
pub struct ReceiverSession {
    state: ReceiverState,
    metadata: Option<FileMetadata>,
    reassembly: Option<Reassembly>,
}

impl ReceiverSession {
    pub fn new() -> Self {
        Self {
            state: ReceiverState::Idle,
            metadata: None,
            reassembly: None,
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }

    pub fn reassembly(&self) -> Option<&Reassembly> {
        self.reassembly.as_ref()
    }

    /// Start looking for the metadata record.
    pub fn start(&mut self) {
        if self.state == ReceiverState::Idle {
            self.state = ReceiverState::ScanningForMetadata;
        }
    }

    /// Feed one scanned frame.
    pub fn on_frame(&mut self, text: &str) -> ReceiverStep {
        let Some(record) = codec::decode(text) else {
            return ReceiverStep::Ignored;
        };
        match (self.state, classify::classify(&record)) {
            (ReceiverState::ScanningForMetadata, RecordKind::Metadata) => {
                let metadata = FileMetadata::from_record(&record);
                self.reassembly = Some(Reassembly::new(metadata.total_chunks));
                self.state = if metadata.total_chunks == 0 {
                    ReceiverState::Reconstructing
                } else {
                    ReceiverState::ReceivingData
                };
                self.metadata = Some(metadata);
                ReceiverStep::Acknowledge(METADATA_ID)
            }
            (ReceiverState::ReceivingData, RecordKind::Data) => {
                let Some(reassembly) = self.reassembly.as_mut() else {
                    return ReceiverStep::Ignored;
                };
                let id = record.id();
                match reassembly.offer(id, record.into_payload()) {
                    Offer::Stored => {
                        if reassembly.is_complete() {
                            self.state = ReceiverState::Reconstructing;
                        }
                        ReceiverStep::Acknowledge(id)
                    }
                    Offer::Duplicate => ReceiverStep::Duplicate(id),
                    Offer::OutOfWindow => ReceiverStep::OutOfWindow(id),
                }
            }
            _ => ReceiverStep::Ignored,
        }
    }

    /// True once every data chunk is in.
    pub fn is_ready(&self) -> bool {
        self.state == ReceiverState::Reconstructing
    }

    /// Take the joined file bytes. Only yields once, in `Reconstructing`.
    pub fn reconstruct(&mut self) -> Option<Vec<u8>> {
        if self.state != ReceiverState::Reconstructing {
            return None;
        }
        self.reassembly.take().map(Reassembly::assemble)
    }

    pub fn mark_saved(&mut self) {
        self.state = ReceiverState::Saved;
    }
}

impl Default for ReceiverSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the receiver.
#[derive(Clone)]
pub struct ReceiverConfig {
    pub ack_linger: Duration,
    pub logger: Option<Arc<dyn TransferLogger>>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            ack_linger: DEFAULT_ACK_LINGER,
            logger: None,
        }
    }
}

/// Result of a completed receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveReport {
    pub file_name: String,
    pub total_chunks: u64,
    pub bytes: usize,
    pub path: PathBuf,
    pub duration: Duration,
}

/// Surface name for an acknowledgment on the receiver's screen.
pub fn ack_label(id: u64) -> String {
    format!("ack {}", id)
}

/// Put up the acknowledgment for `id`, replacing whatever was shown before.
pub fn send_acknowledgment<S, D, P>(link: &mut VisualLink<S, D, P>, id: u64) -> Result<(), TransferError>
where
    S: Scanner,
    D: Display,
    P: Pacer,
{
    let ack = classify::build_acknowledgment(id);
    let text = codec::encode(&ack).map_err(|source| TransferError::Encode { id, source })?;
    link.replace(&text, &ack_label(id))
}

/// Reduce a received file name to a bare name that stays inside the
/// output directory.
pub fn sanitize_file_name(name: &str) -> String {
    match name.rsplit(['/', '\\']).next() {
        Some(base) if !base.is_empty() && base != "." && base != ".." => base.to_string(),
        _ => UNKNOWN_FILE_NAME.to_string(),
    }
}

/// Run the receiver: pick the output directory, collect every chunk, then
/// write the file. Blocks until saved, cancelled or failed.
pub fn run_receiver<K, S, D, P>(
    config: &ReceiverConfig,
    sink: &mut K,
    link: &mut VisualLink<S, D, P>,
    progress: &TransferProgress,
) -> Result<ReceiveReport, TransferError>
where
    K: FileSink + ?Sized,
    S: Scanner,
    D: Display,
    P: Pacer,
{
    let result = receive(config, sink, link, progress);
    if let Err(ref e) = result {
        let phase = if e.is_cancelled() {
            Phase::Cancelled
        } else {
            Phase::Failed
        };
        progress.set_phase(phase);
        progress.set_error(e.to_string());
        log(config, TransferEvent::Error { message: e.to_string() });
    }
    result
}

fn receive<K, S, D, P>(
    config: &ReceiverConfig,
    sink: &mut K,
    link: &mut VisualLink<S, D, P>,
    progress: &TransferProgress,
) -> Result<ReceiveReport, TransferError>
where
    K: FileSink + ?Sized,
    S: Scanner,
    D: Display,
    P: Pacer,
{
    let dir = sink.pick_output_dir().map_err(TransferError::OutputDir)?;

    let mut session = ReceiverSession::new();
    session.start();
    progress.set_phase(Phase::ScanningForMetadata);
    tracing::info!("waiting for file transfer to start");

    let start = Instant::now();
    while !session.is_ready() {
        let frame = link.next_frame()?;
        match session.on_frame(&frame) {
            ReceiverStep::Acknowledge(id) => {
                send_acknowledgment(link, id)?;
                log(config, TransferEvent::AckSent { id });
                on_accepted(config, &session, progress, id);
            }
            ReceiverStep::Duplicate(id) => {
                log(config, TransferEvent::DuplicateChunk { id });
                link.pause()?;
            }
            ReceiverStep::OutOfWindow(id) => {
                let total = session.metadata().map_or(0, |m| m.total_chunks);
                log(config, TransferEvent::OutOfWindowChunk { id, total });
                link.pause()?;
            }
            ReceiverStep::Ignored => link.pause()?,
        }
    }

    // last acknowledgment stays up while we linger
    link.pause_for(config.ack_linger)?;

    progress.set_phase(Phase::Reconstructing);
    let metadata = session.metadata().cloned().unwrap_or_else(|| FileMetadata {
        file_name: UNKNOWN_FILE_NAME.to_string(),
        total_chunks: 0,
    });
    let bytes = session.reconstruct().unwrap_or_default();
    log(config, TransferEvent::FileReconstructed { bytes: bytes.len() });

    let name = sanitize_file_name(&metadata.file_name);
    let path = sink.write(&dir, &name, &bytes).map_err(|source| TransferError::Save {
        path: dir.join(&name),
        source,
    })?;
    session.mark_saved();

    let duration = start.elapsed();
    progress.set_phase(Phase::Complete);
    log(config, TransferEvent::FileSaved { path: path.display().to_string() });
    log(
        config,
        TransferEvent::TransferComplete {
            total_chunks: metadata.total_chunks,
            duration_ms: duration.as_millis() as u64,
        },
    );

    Ok(ReceiveReport {
        file_name: name,
        total_chunks: metadata.total_chunks,
        bytes: bytes.len(),
        path,
        duration,
    })
}

fn on_accepted(config: &ReceiverConfig, session: &ReceiverSession, progress: &TransferProgress, id: u64) {
    let Some(metadata) = session.metadata() else {
        return;
    };
    if id == METADATA_ID {
        progress.chunks_total.store(metadata.total_chunks, Ordering::Relaxed);
        progress.set_phase(Phase::Transferring);
        log(
            config,
            TransferEvent::MetadataReceived {
                file_name: metadata.file_name.clone(),
                total_chunks: metadata.total_chunks,
            },
        );
        return;
    }
    let received = session.reassembly().map_or(metadata.total_chunks, Reassembly::received);
    progress.chunks_complete.store(received, Ordering::Relaxed);
    log(
        config,
        TransferEvent::ChunkStored {
            id,
            received,
            total: metadata.total_chunks,
        },
    );
    tracing::info!(
        "progress: {:.1}% ({}/{})",
        progress.percent(),
        received,
        metadata.total_chunks
    );
}

fn log(config: &ReceiverConfig, event: TransferEvent) {
    if let Some(ref logger) = config.logger {
        logger.log(TransferLog {
            component: COMPONENT,
            event,
        });
    }
}
