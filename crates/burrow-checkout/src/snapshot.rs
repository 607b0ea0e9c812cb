//! SNAPSHOT record codec.
//!
//! Every record starts with an 8-byte header: the ASCII magic `eden` and a
//! big-endian u32 format version.
//!
//! - Version 1: one 20-byte commit id, optionally followed by a second
//!   20-byte id left behind by older writers. The second id is ignored.
//! - Version 2: a big-endian u32 length `L`, then exactly `L` bytes holding
//!   the root id as 20 raw bytes or 40 hex characters.
//!
//! Writers always produce version 1 with a single id.

use burrow_types::Hash20;

use crate::error::SnapshotError;

pub const SNAPSHOT_MAGIC: &[u8; 4] = b"eden";
pub const HEADER_SIZE: usize = 8;
pub const FORMAT_VERSION_1: u32 = 1;
pub const FORMAT_VERSION_2: u32 = 2;

/// Size of every record written by [`encode_snapshot`].
pub const ENCODED_SIZE: usize = HEADER_SIZE + Hash20::RAW_SIZE;

/// Decode a SNAPSHOT record into the commit it points at.
pub fn decode_snapshot(data: &[u8]) -> Result<Hash20, SnapshotError> {
    if data.len() < HEADER_SIZE {
        return Err(SnapshotError::TooShort(data.len()));
    }
    if !data.starts_with(SNAPSHOT_MAGIC) {
        return Err(SnapshotError::BadMagic);
    }
    let version = read_be_u32(&data[4..8]);
    let body = &data[HEADER_SIZE..];

    match version {
        FORMAT_VERSION_1 => {
            if body.len() != Hash20::RAW_SIZE && body.len() != 2 * Hash20::RAW_SIZE {
                return Err(SnapshotError::BadLength(data.len()));
            }
            hash_from_raw(&body[..Hash20::RAW_SIZE])
        }
        FORMAT_VERSION_2 => {
            if body.len() < 4 {
                return Err(SnapshotError::BadLength(data.len()));
            }
            let declared = read_be_u32(&body[..4]) as usize;
            let root_id = &body[4..];
            if root_id.len() != declared {
                return Err(SnapshotError::LengthMismatch {
                    declared,
                    actual: root_id.len(),
                });
            }
            match root_id.len() {
                Hash20::RAW_SIZE => hash_from_raw(root_id),
                Hash20::HEX_SIZE => {
                    let hex = std::str::from_utf8(root_id)
                        .map_err(|e| SnapshotError::InvalidHex(e.to_string()))?;
                    Hash20::from_hex(hex).map_err(|e| SnapshotError::InvalidHex(e.to_string()))
                }
                other => Err(SnapshotError::BadRootIdLength(other)),
            }
        }
        other => Err(SnapshotError::UnsupportedVersion(other)),
    }
}

/// Encode `parent` as a version 1 record.
pub fn encode_snapshot(parent: &Hash20) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENCODED_SIZE);
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION_1.to_be_bytes());
    out.extend_from_slice(parent.as_bytes());
    out
}

fn read_be_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(buf)
}

fn hash_from_raw(bytes: &[u8]) -> Result<Hash20, SnapshotError> {
    Hash20::from_slice(bytes).map_err(|_| SnapshotError::BadRootIdLength(bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header(version: u32) -> Vec<u8> {
        let mut out = SNAPSHOT_MAGIC.to_vec();
        out.extend_from_slice(&version.to_be_bytes());
        out
    }

    fn commit() -> Hash20 {
        Hash20::sha1(b"commit")
    }

    #[test]
    fn encoded_layout() {
        let bytes = encode_snapshot(&commit());
        assert_eq!(bytes.len(), ENCODED_SIZE);
        assert_eq!(&bytes[..4], b"eden");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 1]);
        assert_eq!(&bytes[8..], commit().as_bytes());
        assert_eq!(decode_snapshot(&bytes).unwrap(), commit());
    }

    #[test]
    fn v1_second_parent_is_ignored() {
        let mut bytes = encode_snapshot(&commit());
        bytes.extend_from_slice(Hash20::sha1(b"other").as_bytes());
        assert_eq!(decode_snapshot(&bytes).unwrap(), commit());
    }

    #[test]
    fn v1_bad_body_length() {
        let mut bytes = header(1);
        bytes.extend_from_slice(&[0u8; 21]);
        assert_eq!(decode_snapshot(&bytes), Err(SnapshotError::BadLength(29)));
        assert_eq!(
            decode_snapshot(&header(1)),
            Err(SnapshotError::BadLength(8))
        );
    }

    #[test]
    fn v2_raw_and_hex_root_ids() {
        let mut raw = header(2);
        raw.extend_from_slice(&20u32.to_be_bytes());
        raw.extend_from_slice(commit().as_bytes());
        assert_eq!(decode_snapshot(&raw).unwrap(), commit());

        let mut hex = header(2);
        hex.extend_from_slice(&40u32.to_be_bytes());
        hex.extend_from_slice(commit().to_hex().as_bytes());
        assert_eq!(decode_snapshot(&hex).unwrap(), commit());
    }

    #[test]
    fn v2_rejects_other_lengths() {
        let mut bytes = header(2);
        bytes.extend_from_slice(&10u32.to_be_bytes());
        bytes.extend_from_slice(&[7u8; 10]);
        assert_eq!(
            decode_snapshot(&bytes),
            Err(SnapshotError::BadRootIdLength(10))
        );
    }

    #[test]
    fn v2_declared_length_must_match() {
        let mut bytes = header(2);
        bytes.extend_from_slice(&40u32.to_be_bytes());
        bytes.extend_from_slice(commit().as_bytes());
        assert_eq!(
            decode_snapshot(&bytes),
            Err(SnapshotError::LengthMismatch {
                declared: 40,
                actual: 20
            })
        );

        let mut missing_length = header(2);
        missing_length.extend_from_slice(&[0, 0]);
        assert!(decode_snapshot(&missing_length).is_err());
    }

    #[test]
    fn v2_rejects_non_hex() {
        let mut bytes = header(2);
        bytes.extend_from_slice(&40u32.to_be_bytes());
        bytes.extend_from_slice(&[b'z'; 40]);
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(SnapshotError::InvalidHex(_))
        ));
    }

    #[test]
    fn rejects_short_and_foreign_records() {
        assert_eq!(decode_snapshot(b"eden"), Err(SnapshotError::TooShort(4)));
        assert_eq!(decode_snapshot(b""), Err(SnapshotError::TooShort(0)));

        let mut bytes = encode_snapshot(&commit());
        bytes[..4].copy_from_slice(b"hg\0\0");
        assert_eq!(decode_snapshot(&bytes), Err(SnapshotError::BadMagic));
    }

    #[test]
    fn unsupported_version_is_named() {
        let mut bytes = header(3);
        bytes.extend_from_slice(commit().as_bytes());
        let err = decode_snapshot(&bytes).unwrap_err();
        assert_eq!(err, SnapshotError::UnsupportedVersion(3));
        assert!(err.to_string().contains("version 3"));
    }

    proptest! {
        #[test]
        fn decode_recovers_encoded_parent(bytes in proptest::array::uniform20(any::<u8>())) {
            let parent = Hash20::from(bytes);
            prop_assert_eq!(decode_snapshot(&encode_snapshot(&parent)).unwrap(), parent);
        }

        #[test]
        fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..96)) {
            let _ = decode_snapshot(&data);
        }
    }
}
