//! Camlink protocol: move one file between air-gapped machines through a
//! screen and a camera.
//!
//! Provides the chunk transfer protocol over a half-duplex QR channel:
//! - Chunker: file bytes -> metadata record + numbered data records
//! - JSON + base64 wire codec, one record per QR code
//! - Sender state machine: display a chunk, wait for its acknowledgment
//! - Receiver state machine: acknowledge new chunks, ignore duplicates,
//!   rebuild the file in id order
//! - Polling link with injectable pacing and cancellation
//!
//! Cameras, QR rendering and file pickers are supplied by the host through
//! the traits in `link`.

pub mod chunker;
pub mod classify;
pub mod codec;
pub mod error;
pub mod link;
pub mod logging;
pub mod memory;
pub mod progress;
pub mod receiver;
pub mod record;
pub mod sender;

// Re-export key types for convenience.
pub use chunker::{build_chunks, build_chunks_with_size, split};
pub use classify::{
    RecordKind, build_acknowledgment, classify, is_acknowledgment_for, is_data, is_metadata,
};
pub use codec::{CodecError, decode, decode_record, encode};
pub use error::TransferError;
pub use link::{
    CancelToken, DEFAULT_POLL_INTERVAL, Display, FileSink, FileSource, InputFile, NoDelay, Pacer,
    Scanner, ThreadPacer, VisualLink,
};
pub use logging::{MemoryLogger, NullLogger, TracingLogger, TransferEvent, TransferLog, TransferLogger};
pub use progress::{Phase, TransferProgress};
pub use receiver::{
    DEFAULT_ACK_LINGER, ReceiveReport, ReceiverConfig, ReceiverSession, ReceiverState,
    ReceiverStep, run_receiver,
};
pub use record::{
    APPROVED, ChunkRecord, DEFAULT_CHUNK_SIZE, FileMetadata, METADATA_ID, STARTING,
    UNKNOWN_FILE_NAME,
};
pub use sender::{AckOutcome, SendReport, SenderConfig, SenderSession, SenderState, run_sender};
