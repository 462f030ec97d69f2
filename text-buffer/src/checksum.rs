use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use text_error::{Result, TextError};

/// Digest width in bytes.
pub const CHECKSUM_LEN: usize = 32;

/// A 32-byte BLAKE3 digest of a document's encoded byte
/// representation.
///
/// The digest is computed over the bytes the document's encoding
/// produces, not over abstract characters, so the same text under
/// different encodings yields different checksums.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct Checksum(pub [u8; CHECKSUM_LEN]);

impl Checksum {
    /// Digest a byte slice in one shot.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        log::debug!("Computing BLAKE3 digest for {} bytes", bytes.len());
        let mut hasher = blake3::Hasher::new();
        hasher.update(bytes);
        Checksum(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; CHECKSUM_LEN] {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Checksum {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| TextError::Parse)?;
        let digest: [u8; CHECKSUM_LEN] =
            bytes.try_into().map_err(|_| TextError::Parse)?;
        Ok(Checksum(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_64_hex_digits() {
        let digest = Checksum::from_bytes(b"hello");
        assert_eq!(digest.as_bytes().len(), CHECKSUM_LEN);
        let hex = digest.to_string();
        assert_eq!(hex.len(), 2 * CHECKSUM_LEN);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let digest = Checksum::from_bytes(b"round trip");
        let parsed: Checksum =
            digest.to_string().parse().expect("failed to parse hex digest");
        assert_eq!(parsed, digest);
    }

    #[test]
    fn equal_input_equal_digest() {
        assert_eq!(
            Checksum::from_bytes(b"same bytes"),
            Checksum::from_bytes(b"same bytes")
        );
    }

    #[test]
    fn different_input_different_digest() {
        assert_ne!(
            Checksum::from_bytes(b"input one"),
            Checksum::from_bytes(b"input two")
        );
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("not hex".parse::<Checksum>().is_err());
        // Valid hex, wrong width.
        assert!("deadbeef".parse::<Checksum>().is_err());
    }
}
