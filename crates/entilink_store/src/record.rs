//! Journal records and their on-disk framing.
//!
//! Each record is written as one frame:
//!
//! ```text
//! | magic (4) | length (4, LE) | CBOR payload (length) | crc32 (4, LE) |
//! ```
//!
//! The checksum covers the payload. A frame cut short at the end of the
//! journal is a torn write and is dropped on replay; any other damage is
//! reported as corruption.

use crate::error::{StoreError, StoreResult};
use entilink_core::{EntityId, TransferObject};
use serde::{Deserialize, Serialize};

/// Frame marker.
pub const MAGIC: [u8; 4] = *b"ELJR";

const HEADER_LEN: usize = 8;
const TRAILER_LEN: usize = 4;

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalRecord {
    /// Inserts or replaces a row.
    Put(TransferObject),
    /// Removes a row.
    Delete {
        /// Canonical type name.
        type_name: String,
        /// Row id.
        id: EntityId,
    },
    /// Raises the id high-water mark of a type.
    Reserve {
        /// Canonical type name.
        type_name: String,
        /// Next id to hand out.
        next_id: i64,
    },
}

/// Encodes a record into a complete frame.
pub fn encode_frame(record: &JournalRecord) -> StoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(record, &mut payload).map_err(|e| StoreError::Codec(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| StoreError::Codec(format!("record of {} bytes is too large", payload.len())))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&compute_crc32(&payload).to_le_bytes());
    Ok(frame)
}

/// Outcome of decoding a journal.
#[derive(Debug, Default)]
pub struct Replay {
    /// Records in journal order.
    pub records: Vec<JournalRecord>,
    /// Length of the intact prefix.
    pub valid_len: u64,
    /// True if an incomplete frame followed the intact prefix.
    pub torn: bool,
}

/// Decodes every frame of a journal.
///
/// # Errors
///
/// Returns an error if a frame before the last one is damaged.
pub fn decode_frames(bytes: &[u8]) -> StoreResult<Replay> {
    let mut replay = Replay::default();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < HEADER_LEN {
            replay.torn = true;
            break;
        }
        if rest[..4] != MAGIC {
            return Err(StoreError::corrupted(format!("bad frame marker at offset {offset}")));
        }
        let len = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let total = HEADER_LEN + len + TRAILER_LEN;
        if rest.len() < total {
            replay.torn = true;
            break;
        }

        let payload = &rest[HEADER_LEN..HEADER_LEN + len];
        let trailer = &rest[HEADER_LEN + len..total];
        let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let actual = compute_crc32(payload);
        if expected != actual {
            if offset + total == bytes.len() {
                replay.torn = true;
                break;
            }
            return Err(StoreError::ChecksumMismatch {
                offset: offset as u64,
                expected,
                actual,
            });
        }

        let record: JournalRecord = ciborium::from_reader(payload)
            .map_err(|e| StoreError::corrupted(format!("undecodable record at offset {offset}: {e}")))?;
        replay.records.push(record);
        offset += total;
    }

    replay.valid_len = offset as u64;
    Ok(replay)
}

/// CRC32 (IEEE polynomial).
pub fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn put(id: i64) -> JournalRecord {
        JournalRecord::Put(
            TransferObject::new("Book", EntityId::new(id))
                .with_field("title", json!("Middlemarch"))
                .with_field("pages", json!(880))
                .with_one("author", EntityId::new(3))
                .with_many("tags", vec![EntityId::new(1), EntityId::new(2)]),
        )
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn frames_decode_in_order() {
        let mut bytes = encode_frame(&put(1)).unwrap();
        bytes.extend(
            encode_frame(&JournalRecord::Delete {
                type_name: "Book".into(),
                id: EntityId::new(1),
            })
            .unwrap(),
        );
        let replay = decode_frames(&bytes).unwrap();
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.records[0], put(1));
        assert!(!replay.torn);
        assert_eq!(replay.valid_len, bytes.len() as u64);
    }

    #[test]
    fn torn_tail_is_dropped() {
        let first = encode_frame(&put(1)).unwrap();
        let second = encode_frame(&put(2)).unwrap();
        let mut bytes = first.clone();
        bytes.extend_from_slice(&second[..second.len() - 3]);

        let replay = decode_frames(&bytes).unwrap();
        assert_eq!(replay.records.len(), 1);
        assert!(replay.torn);
        assert_eq!(replay.valid_len, first.len() as u64);
    }

    #[test]
    fn damage_before_the_tail_is_corruption() {
        let mut bytes = encode_frame(&put(1)).unwrap();
        bytes.extend(encode_frame(&put(2)).unwrap());
        bytes[HEADER_LEN + 2] ^= 0xFF;
        assert!(matches!(
            decode_frames(&bytes),
            Err(StoreError::ChecksumMismatch { offset: 0, .. })
        ));
    }

    #[test]
    fn bad_marker_is_corruption() {
        let mut bytes = encode_frame(&put(1)).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode_frames(&bytes), Err(StoreError::Corrupted(_))));
    }

    proptest! {
        #[test]
        fn any_prefix_decodes_without_error(cut in 0usize..200) {
            let mut bytes = encode_frame(&put(1)).unwrap();
            bytes.extend(encode_frame(&put(2)).unwrap());
            let cut = cut.min(bytes.len());
            let replay = decode_frames(&bytes[..cut]).unwrap();
            prop_assert!(replay.valid_len <= cut as u64);
            prop_assert!(replay.records.len() <= 2);
        }
    }
}
