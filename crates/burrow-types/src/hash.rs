use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::TypeError;

/// A fixed-width 20-byte digest.
///
/// Used for SHA-1 content hashes in blob metadata and for the commit ids
/// recorded in a checkout's snapshot file.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash20([u8; 20]);

impl Hash20 {
    /// Size of the raw digest in bytes.
    pub const RAW_SIZE: usize = 20;

    /// Size of the hex rendering in characters.
    pub const HEX_SIZE: usize = 40;

    /// Create from a raw 20-byte array.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Compute the SHA-1 digest of `data`.
    pub fn sha1(data: &[u8]) -> Self {
        let digest = Sha1::digest(data);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Create from a byte slice that must be exactly 20 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: Self::RAW_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Parse from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != Self::HEX_SIZE {
            return Err(TypeError::InvalidLength {
                expected: Self::HEX_SIZE,
                actual: s.len(),
            });
        }
        let mut arr = [0u8; 20];
        hex::decode_to_slice(s, &mut arr).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self(arr))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash20({})", self.to_hex())
    }
}

impl fmt::Display for Hash20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 20]> for Hash20 {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl From<Hash20> for [u8; 20] {
    fn from(hash: Hash20) -> Self {
        hash.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sha1_of_known_input() {
        // `printf hello | sha1sum`
        let hash = Hash20::sha1(b"hello");
        assert_eq!(hash.to_hex(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn sha1_of_empty_input() {
        assert_eq!(
            Hash20::sha1(b"").to_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(Hash20::from_slice(&[0u8; 20]).is_ok());
        assert_eq!(
            Hash20::from_slice(&[0u8; 19]),
            Err(TypeError::InvalidLength {
                expected: 20,
                actual: 19
            })
        );
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(matches!(
            Hash20::from_hex("abcd"),
            Err(TypeError::InvalidLength { expected: 40, .. })
        ));
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let bad = "z".repeat(40);
        assert!(matches!(Hash20::from_hex(&bad), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(Hash20::default().as_bytes(), &[0u8; 20]);
    }

    proptest! {
        #[test]
        fn hex_roundtrip(bytes in proptest::array::uniform20(any::<u8>())) {
            let hash = Hash20::new(bytes);
            prop_assert_eq!(Hash20::from_hex(&hash.to_hex()).unwrap(), hash);
        }
    }
}
