//! Chunker: split file bytes into QR-sized pieces and build the record
//! sequence the sender walks through.

use crate::record::{ChunkRecord, DEFAULT_CHUNK_SIZE};

/// Split `data` into consecutive slices of at most `chunk_size` bytes.
/// Empty input yields no slices. A zero `chunk_size` uses the default.
pub fn split(data: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    let size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };
    data.chunks(size).collect()
}

/// Build the full record sequence using the default chunk size.
pub fn build_chunks(file_name: &str, data: &[u8]) -> Vec<ChunkRecord> {
    build_chunks_with_size(file_name, data, DEFAULT_CHUNK_SIZE)
}

/// Build the full record sequence: the metadata record first, then data
/// records numbered from 1 in file order.
pub fn build_chunks_with_size(file_name: &str, data: &[u8], chunk_size: usize) -> Vec<ChunkRecord> {
    let slices = split(data, chunk_size);
    let mut records = Vec::with_capacity(slices.len() + 1);
    records.push(ChunkRecord::metadata(file_name, slices.len() as u64));
    records.extend(
        slices
            .into_iter()
            .enumerate()
            .map(|(i, slice)| ChunkRecord::new(i as u64 + 1, slice.to_vec())),
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{METADATA_ID, STARTING};

    #[test]
    fn split_with_remainder() {
        let data = vec![7u8; 250];
        let lens: Vec<usize> = split(&data, 100).iter().map(|s| s.len()).collect();
        assert_eq!(lens, vec![100, 100, 50]);
    }

    #[test]
    fn split_empty() {
        assert!(split(&[], 100).is_empty());
    }

    #[test]
    fn split_exact_size() {
        let data = vec![1u8; 100];
        let slices = split(&data, 100);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].len(), 100);
    }

    #[test]
    fn split_zero_size_uses_default() {
        let data = vec![0u8; DEFAULT_CHUNK_SIZE * 2];
        assert_eq!(split(&data, 0).len(), 2);
    }

    #[test]
    fn build_chunks_metadata_and_order() {
        let data: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        let records = build_chunks("f.bin", &data);
        assert_eq!(records.len(), 4);

        let meta = &records[0];
        assert_eq!(meta.id(), METADATA_ID);
        assert_eq!(meta.payload(), STARTING);
        assert_eq!(meta.file_name(), Some("f.bin"));
        assert_eq!(meta.total_chunks(), Some(3));

        assert_eq!(records[1].id(), 1);
        assert_eq!(records[1].payload(), &data[0..100]);
        assert_eq!(records[2].id(), 2);
        assert_eq!(records[2].payload(), &data[100..200]);
        assert_eq!(records[3].id(), 3);
        assert_eq!(records[3].payload(), &data[200..250]);
    }

    #[test]
    fn build_chunks_empty_file() {
        let records = build_chunks("empty.txt", &[]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_chunks(), Some(0));
    }

    #[test]
    fn build_chunks_custom_size() {
        let records = build_chunks_with_size("hi.txt", b"hello world!", 5);
        let lens: Vec<usize> = records[1..].iter().map(|r| r.payload().len()).collect();
        assert_eq!(lens, vec![5, 5, 2]);
        assert_eq!(records[0].total_chunks(), Some(3));
    }
}
