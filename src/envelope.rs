//! Binary envelope layout
//!
//! ```text
//! offset  size  field
//!      0     1  version (0x01)
//!      1    32  salt
//!     33    16  iv (initial counter block)
//!     49    32  tag = SHA-256(mac key || ciphertext)
//!     81     n  ciphertext (n = plaintext length)
//! ```

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{EcodecError, Result};
use crate::kdf::SUBKEY_LEN;

/// The only envelope version this crate reads or writes.
pub const VERSION: u8 = 0x01;

pub const VERSION_LEN: usize = 1;
pub const SALT_LEN: usize = 32;
pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 32;

const SALT_OFFSET: usize = VERSION_LEN;
const IV_OFFSET: usize = SALT_OFFSET + SALT_LEN;
const TAG_OFFSET: usize = IV_OFFSET + IV_LEN;

/// Size of the fixed fields; also the offset of the ciphertext.
pub const HEADER_LEN: usize = TAG_OFFSET + TAG_LEN;

pub type Tag = [u8; TAG_LEN];

/// A borrowed, validated view of an encoded envelope.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub salt: &'a [u8; SALT_LEN],
    pub iv: &'a [u8; IV_LEN],
    pub tag: &'a Tag,
    pub ciphertext: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Split an encoded envelope into its fields.
    ///
    /// Only the length and the version byte are checked; the tag is not.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let (header, ciphertext) = data.split_at_checked(HEADER_LEN).ok_or_else(too_short)?;

        let (version, rest) = header.split_at(VERSION_LEN);
        if version[0] != VERSION {
            return Err(EcodecError::format(format!(
                "unhandled version {:#04x}",
                version[0]
            )));
        }

        let (salt, rest) = rest.split_first_chunk::<SALT_LEN>().ok_or_else(too_short)?;
        let (iv, rest) = rest.split_first_chunk::<IV_LEN>().ok_or_else(too_short)?;
        let tag = rest.first_chunk::<TAG_LEN>().ok_or_else(too_short)?;

        Ok(Self {
            salt,
            iv,
            tag,
            ciphertext,
        })
    }

    /// Constant-time comparison of the embedded tag against `expected`.
    pub fn tag_matches(&self, expected: &Tag) -> bool {
        self.tag[..].ct_eq(&expected[..]).into()
    }
}

fn too_short() -> EcodecError {
    EcodecError::format(format!(
        "encrypted data must be at least {} bytes",
        HEADER_LEN
    ))
}

/// Integrity tag over the ciphertext, keyed by the second half of the derived key.
pub fn compute_tag(mac_key: &[u8; SUBKEY_LEN], ciphertext: &[u8]) -> Tag {
    let mut hasher = Sha256::new();
    hasher.update(mac_key);
    hasher.update(ciphertext);
    hasher.finalize().into()
}

/// Allocate an envelope with the header filled in except for the tag, and
/// room for `payload_len` bytes of ciphertext.
pub(crate) fn allocate(salt: &[u8; SALT_LEN], iv: &[u8; IV_LEN], payload_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN + payload_len];
    out[0] = VERSION;
    out[SALT_OFFSET..IV_OFFSET].copy_from_slice(salt);
    out[IV_OFFSET..TAG_OFFSET].copy_from_slice(iv);
    out
}

/// Split a buffer from [`allocate`] into its tag slot and ciphertext slot.
pub(crate) fn tag_and_payload_mut(envelope: &mut [u8]) -> (&mut [u8], &mut [u8]) {
    envelope[TAG_OFFSET..].split_at_mut(TAG_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_layout_constants() {
        assert_eq!(HEADER_LEN, 81);
        assert_eq!(SALT_OFFSET, 1);
        assert_eq!(IV_OFFSET, 33);
        assert_eq!(TAG_OFFSET, 49);
    }

    #[test]
    fn test_parse_fields() {
        let mut data = Vec::new();
        data.push(VERSION);
        data.extend_from_slice(&[0x11; SALT_LEN]);
        data.extend_from_slice(&[0x22; IV_LEN]);
        data.extend_from_slice(&[0x33; TAG_LEN]);
        data.extend_from_slice(b"ciphertext");

        let env = Envelope::parse(&data).unwrap();
        assert_eq!(env.salt, &[0x11; SALT_LEN]);
        assert_eq!(env.iv, &[0x22; IV_LEN]);
        assert_eq!(env.tag, &[0x33; TAG_LEN]);
        assert_eq!(env.ciphertext, b"ciphertext");
    }

    #[test]
    fn test_parse_header_only() {
        let mut data = vec![0u8; HEADER_LEN];
        data[0] = VERSION;

        let env = Envelope::parse(&data).unwrap();
        assert!(env.ciphertext.is_empty());
    }

    #[test]
    fn test_parse_too_short() {
        for len in [0, 1, 49, HEADER_LEN - 1] {
            let mut data = vec![0u8; len];
            if let Some(first) = data.first_mut() {
                *first = VERSION;
            }
            let err = Envelope::parse(&data).expect_err("expected format error");
            assert_eq!(err.kind, Some(ErrorKind::Format));
            assert_eq!(err.to_string(), "encrypted data must be at least 81 bytes");
        }
    }

    #[test]
    fn test_parse_length_checked_before_version() {
        let data = [0x02u8; 10];
        let err = Envelope::parse(&data).expect_err("expected format error");
        assert_eq!(err.to_string(), "encrypted data must be at least 81 bytes");
    }

    #[test]
    fn test_parse_unhandled_version() {
        for (version, msg) in [
            (0x00u8, "unhandled version 0x00"),
            (0x02, "unhandled version 0x02"),
            (0xff, "unhandled version 0xff"),
        ] {
            let mut data = vec![0u8; HEADER_LEN + 16];
            data[0] = version;
            let err = Envelope::parse(&data).expect_err("expected format error");
            assert_eq!(err.kind, Some(ErrorKind::Format));
            assert_eq!(err.to_string(), msg);
        }
    }

    #[test]
    fn test_allocate_layout() {
        let mut buf = allocate(&[0xaa; SALT_LEN], &[0xbb; IV_LEN], 5);
        assert_eq!(buf.len(), HEADER_LEN + 5);

        let (tag, payload) = tag_and_payload_mut(&mut buf);
        assert_eq!(tag.len(), TAG_LEN);
        assert_eq!(payload.len(), 5);

        let env = Envelope::parse(&buf).unwrap();
        assert_eq!(env.salt, &[0xaa; SALT_LEN]);
        assert_eq!(env.iv, &[0xbb; IV_LEN]);
    }

    #[test]
    fn test_tag_matches() {
        let tag = compute_tag(&[9u8; SUBKEY_LEN], b"some ciphertext");

        let mut data = allocate(&[0u8; SALT_LEN], &[0u8; IV_LEN], 0);
        data[TAG_OFFSET..].copy_from_slice(&tag);
        let env = Envelope::parse(&data).unwrap();
        assert!(env.tag_matches(&tag));

        let mut other = tag;
        other[TAG_LEN - 1] ^= 1;
        assert!(!env.tag_matches(&other));
    }

    #[test]
    fn test_tag_depends_on_key_and_ciphertext() {
        let base = compute_tag(&[1u8; SUBKEY_LEN], b"abc");
        assert_ne!(base, compute_tag(&[2u8; SUBKEY_LEN], b"abc"));
        assert_ne!(base, compute_tag(&[1u8; SUBKEY_LEN], b"abd"));
    }
}
