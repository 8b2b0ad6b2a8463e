//! Protocol classifier: what a decoded record means.
//!
//! Classification goes by payload sentinel first, then id. A data chunk
//! whose bytes happen to equal a sentinel is read as a control record.

use crate::record::{APPROVED, ChunkRecord, METADATA_ID, STARTING};

/// Semantic kind of a decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Metadata,
    Data,
    Acknowledgment,
    /// `STARTING` on a non-zero id. Not valid in any state.
    Invalid,
}

pub fn classify(record: &ChunkRecord) -> RecordKind {
    let payload = record.payload();
    if payload == APPROVED {
        RecordKind::Acknowledgment
    } else if payload == STARTING {
        if record.id() == METADATA_ID {
            RecordKind::Metadata
        } else {
            RecordKind::Invalid
        }
    } else if record.id() == METADATA_ID {
        // id 0 is reserved; a plain payload there is not a data chunk
        RecordKind::Invalid
    } else {
        RecordKind::Data
    }
}

pub fn is_metadata(record: Option<&ChunkRecord>) -> bool {
    record.is_some_and(|r| classify(r) == RecordKind::Metadata)
}

pub fn is_data(record: Option<&ChunkRecord>) -> bool {
    record.is_some_and(|r| classify(r) == RecordKind::Data)
}

/// True iff `decoded` is an acknowledgment carrying `reference`'s id.
pub fn is_acknowledgment_for(decoded: Option<&ChunkRecord>, reference: &ChunkRecord) -> bool {
    decoded.is_some_and(|r| r.id() == reference.id() && r.payload() == APPROVED)
}

pub fn build_acknowledgment(id: u64) -> ChunkRecord {
    ChunkRecord::acknowledgment(id)
}
