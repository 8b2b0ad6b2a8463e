//! Chunk records: the unit carried by one QR code.
//!
//! A record is an `id` plus a raw byte payload. The metadata record (id 0)
//! additionally carries the file name and the number of data chunks that
//! follow. Control records are recognised by reserved payload values
//! (`STARTING`, `APPROVED`) rather than by a separate kind field, so the
//! wire format stays a flat `{id, data, ...}` object.

/// Id reserved for the metadata record.
pub const METADATA_ID: u64 = 0;

/// Payload marking the metadata record.
pub const STARTING: &[u8] = b"STARTING";

/// Payload marking an acknowledgment record.
pub const APPROVED: &[u8] = b"APPROVED";

/// Default number of file bytes per data chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// File name used when a metadata record arrives without one.
pub const UNKNOWN_FILE_NAME: &str = "unknown_file";

/// One chunk record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    id: u64,
    payload: Vec<u8>,
    file_name: Option<String>,
    total_chunks: Option<u64>,
}

impl ChunkRecord {
    /// A record with an arbitrary id and payload and no metadata fields.
    pub fn new(id: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: payload.into(),
            file_name: None,
            total_chunks: None,
        }
    }

    /// The metadata record announcing `file_name` and its data-chunk count.
    pub fn metadata(file_name: impl Into<String>, total_chunks: u64) -> Self {
        Self {
            id: METADATA_ID,
            payload: STARTING.to_vec(),
            file_name: Some(file_name.into()),
            total_chunks: Some(total_chunks),
        }
    }

    /// Acknowledgment for chunk `id`.
    pub fn acknowledgment(id: u64) -> Self {
        Self::new(id, APPROVED)
    }

    /// Attach metadata fields. Used by the codec when rebuilding a record
    /// from wire text; the fields are kept whatever the id.
    pub(crate) fn with_fields(mut self, file_name: Option<String>, total_chunks: Option<u64>) -> Self {
        self.file_name = file_name;
        self.total_chunks = total_chunks;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn total_chunks(&self) -> Option<u64> {
        self.total_chunks
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// File description carried by the metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub file_name: String,
    pub total_chunks: u64,
}

impl FileMetadata {
    /// Read the metadata fields off a record, filling in defaults for
    /// anything missing.
    pub fn from_record(record: &ChunkRecord) -> Self {
        Self {
            file_name: record
                .file_name()
                .unwrap_or(UNKNOWN_FILE_NAME)
                .to_string(),
            total_chunks: record.total_chunks().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_record_fields() {
        let r = ChunkRecord::metadata("f.bin", 3);
        assert_eq!(r.id(), METADATA_ID);
        assert_eq!(r.payload(), STARTING);
        assert_eq!(r.file_name(), Some("f.bin"));
        assert_eq!(r.total_chunks(), Some(3));
    }

    #[test]
    fn acknowledgment_has_no_metadata() {
        let r = ChunkRecord::acknowledgment(7);
        assert_eq!(r.id(), 7);
        assert_eq!(r.payload(), APPROVED);
        assert!(r.file_name().is_none());
        assert!(r.total_chunks().is_none());
    }

    #[test]
    fn metadata_defaults_when_fields_missing() {
        let r = ChunkRecord::new(METADATA_ID, STARTING);
        let meta = FileMetadata::from_record(&r);
        assert_eq!(meta.file_name, UNKNOWN_FILE_NAME);
        assert_eq!(meta.total_chunks, 0);
    }
}
