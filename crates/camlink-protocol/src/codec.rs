//! Wire codec: one JSON object per QR code.
//!
//! ```text
//! {"id": 0, "data": "U1RBUlRJTkc=", "file_name": "hi.txt", "total_chunks": 3}
//! {"id": 1, "data": "aGVsbG8="}
//! ```
//!
//! `data` is standard base64 of the payload bytes. `file_name` and
//! `total_chunks` are only written when the record carries them. Key order
//! does not matter and unknown keys are ignored on decode.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::record::ChunkRecord;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid record json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record has no data field")]
    MissingData,
    #[error("invalid base64 in data field: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Serialize)]
struct WireRecordRef<'a> {
    id: u64,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_chunks: Option<u64>,
}

#[derive(Deserialize)]
struct WireRecord {
    id: u64,
    data: Option<String>,
    file_name: Option<String>,
    total_chunks: Option<u64>,
}

/// Encode a record as wire text.
pub fn encode(record: &ChunkRecord) -> Result<String, CodecError> {
    let wire = WireRecordRef {
        id: record.id(),
        data: BASE64.encode(record.payload()),
        file_name: record.file_name(),
        total_chunks: record.total_chunks(),
    };
    Ok(serde_json::to_string(&wire)?)
}

/// Decode wire text, reporting why it was rejected.
pub fn decode_record(text: &str) -> Result<ChunkRecord, CodecError> {
    let wire: WireRecord = serde_json::from_str(text)?;
    let data = wire.data.ok_or(CodecError::MissingData)?;
    let payload = BASE64.decode(data.as_bytes())?;
    Ok(ChunkRecord::new(wire.id, payload).with_fields(wire.file_name, wire.total_chunks))
}

/// Decode wire text. Anything that is not a well-formed record yields `None`;
/// a camera picking up an unrelated QR code is normal channel noise.
pub fn decode(text: &str) -> Option<ChunkRecord> {
    match decode_record(text) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::trace!(error = %e, "discarding undecodable frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{APPROVED, STARTING};
    use proptest::prelude::*;

    #[test]
    fn encodes_payload_as_base64() {
        let text = encode(&ChunkRecord::new(1, b"Hello World".to_vec())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["data"], "SGVsbG8gV29ybGQ=");
        assert!(value.get("file_name").is_none());
        assert!(value.get("total_chunks").is_none());
    }

    #[test]
    fn metadata_fields_survive() {
        let record = ChunkRecord::metadata("test.txt", 5);
        let decoded = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.file_name(), Some("test.txt"));
        assert_eq!(decoded.total_chunks(), Some(5));
    }

    #[test]
    fn field_order_and_unknown_keys_are_tolerated() {
        let text = r#"{"version": 2, "data": "eHl6", "extra": [1, 2], "id": 3}"#;
        let decoded = decode(text).unwrap();
        assert_eq!(decoded, ChunkRecord::new(3, b"xyz".to_vec()));
    }

    #[test]
    fn malformed_json_is_none() {
        assert!(decode(r#"{"id": 1, "data": "invalid json"#).is_none());
        assert!(decode("not json at all").is_none());
        assert!(decode("").is_none());
    }

    #[test]
    fn invalid_base64_is_none() {
        assert!(decode(r#"{"id": 1, "data": "invalid_base64!!!"}"#).is_none());
    }

    #[test]
    fn missing_data_field_is_none() {
        assert!(matches!(
            decode_record(r#"{"id": 1}"#),
            Err(CodecError::MissingData)
        ));
        assert!(decode(r#"{"id": 1}"#).is_none());
    }

    #[test]
    fn negative_or_missing_id_is_none() {
        assert!(decode(r#"{"id": -1, "data": ""}"#).is_none());
        assert!(decode(r#"{"data": ""}"#).is_none());
    }

    #[test]
    fn realistic_file_headers() {
        let jpeg = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01\x01\x01\x00H\x00H\x00\x00".to_vec();
        let pdf = b"%PDF-1.4\n%\xf2\xf3\xf4\xf5\xf6\n".to_vec();
        for (id, payload) in [(1, jpeg), (2, pdf)] {
            let record = ChunkRecord::new(id, payload);
            assert_eq!(decode(&encode(&record).unwrap()), Some(record));
        }
    }

    #[test]
    fn edge_payloads_round_trip() {
        let payloads: [&[u8]; 5] = [b"", &[0x00; 64], &[0xFF; 64], STARTING, APPROVED];
        for payload in payloads {
            let record = ChunkRecord::new(9, payload.to_vec());
            assert_eq!(decode(&encode(&record).unwrap()), Some(record));
        }
    }

    proptest! {
        #[test]
        fn round_trip_any_bytes(id in any::<u64>(), payload in prop::collection::vec(any::<u8>(), 0..512)) {
            let record = ChunkRecord::new(id, payload);
            let decoded = decode(&encode(&record).unwrap());
            prop_assert_eq!(decoded, Some(record));
        }
    }
}
