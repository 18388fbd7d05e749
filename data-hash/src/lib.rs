//! # Data Hash
//!
//! `data-hash` provides [`NameHash`], the 128-bit content-addressed key every
//! avatar is derived from. The digest is MD5 so that generated file names stay
//! compatible with artifacts produced by earlier deployments.
//!
//! All pseudo-random choices are taken from fixed byte windows of the digest
//! through [`NameHash::word`], so the same name always reproduces the same
//! avatar without an external RNG.

use core::{fmt::Display, str::FromStr};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use data_error::{MemojiError, Result};

/// Length of the digest in bytes.
pub const HASH_LEN: usize = 16;

/// MD5 digest of an avatar name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct NameHash([u8; HASH_LEN]);

impl NameHash {
    /// Computes the digest of the given name's UTF-8 bytes
    pub fn from_name(name: &str) -> Self {
        log::trace!("Computing MD5 hash for name of {} bytes", name.len());

        let digest = Md5::digest(name.as_bytes());
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&digest);
        NameHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Reads 4 bytes starting at `offset` as a big-endian integer.
    ///
    /// This is the same value as parsing the corresponding 8 hex characters
    /// of the textual digest.
    ///
    /// # Panics
    /// Panics if `offset + 4` exceeds the digest length. Offsets are
    /// compile-time constants of the selector.
    pub fn word(&self, offset: usize) -> u32 {
        let mut window = [0u8; 4];
        window.copy_from_slice(&self.0[offset..offset + 4]);
        u32::from_be_bytes(window)
    }

    /// Lowercase hexadecimal form, 32 characters long
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for NameHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for NameHash {
    type Err = MemojiError;

    fn from_str(s: &str) -> Result<Self> {
        let decoded = hex::decode(s).map_err(|_| MemojiError::Parse)?;
        let bytes: [u8; HASH_LEN] =
            decoded.try_into().map_err(|_| MemojiError::Parse)?;
        Ok(NameHash(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("john", "527bd5b5d689e2c32ae974c6229ff785")]
    #[case("", "d41d8cd98f00b204e9800998ecf8427e")]
    #[case("abc", "900150983cd24fb0d6963f7d28e17f72")]
    fn digest_matches_md5(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(NameHash::from_name(name).to_hex(), expected);
    }

    #[test]
    fn words_are_big_endian_windows() {
        let hash = NameHash::from_name("john");
        assert_eq!(hash.word(0), 0x527bd5b5);
        assert_eq!(hash.word(4), 0xd689e2c3);
        assert_eq!(hash.word(8), 0x2ae974c6);
        assert_eq!(hash.word(12), 0x229ff785);
    }

    #[test]
    fn same_name_same_hash() {
        assert_eq!(NameHash::from_name("Zoë"), NameHash::from_name("Zoë"));
        assert_ne!(NameHash::from_name("zoe"), NameHash::from_name("Zoe"));
    }

    #[test]
    fn parses_back_from_hex() {
        let hash = NameHash::from_name("john");
        let parsed: NameHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);

        assert!("xyz".parse::<NameHash>().is_err());
        assert!("527bd5b5".parse::<NameHash>().is_err());
    }
}
