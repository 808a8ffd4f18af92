//! Key derivation using PBKDF2-HMAC-SHA256
//!
//! A secret of any length and a 32-byte salt are stretched into 32 bytes of
//! key material. The first half keys the stream cipher, the second half keys
//! the integrity tag.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

use crate::envelope::SALT_LEN;
use crate::error::{EcodecError, Result};

/// Length of derived key material in bytes
pub const KEY_LEN: usize = 32;

/// Length of each half of the derived key in bytes
pub const SUBKEY_LEN: usize = KEY_LEN / 2;

/// Iteration count for PBKDF2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    rounds: u32,
}

impl KdfParams {
    /// Rounds used for every envelope written with default parameters (2^18).
    pub const DEFAULT_ROUNDS: u32 = 1 << 18;

    /// Rounds used by envelopes written before the round count was corrected.
    ///
    /// Those writers spelled the constant `2 ^ 18`, which is XOR and comes
    /// out as 16. The envelope does not record its round count, so reading
    /// such data requires asking for these parameters explicitly.
    pub const LEGACY_ROUNDS: u32 = 16;

    pub fn new(rounds: u32) -> Result<Self> {
        if rounds == 0 {
            return Err(EcodecError::input("kdf rounds must be at least 1"));
        }
        Ok(Self { rounds })
    }

    pub fn legacy() -> Self {
        Self {
            rounds: Self::LEGACY_ROUNDS,
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            rounds: Self::DEFAULT_ROUNDS,
        }
    }
}

/// Derived key material, wiped from memory on drop.
pub struct DerivedKey {
    halves: Zeroizing<[[u8; SUBKEY_LEN]; 2]>,
}

impl DerivedKey {
    /// Key for the stream cipher (bytes 0..16).
    pub fn cipher_key(&self) -> &[u8; SUBKEY_LEN] {
        &self.halves[0]
    }

    /// Key for the integrity tag (bytes 16..32).
    pub fn mac_key(&self) -> &[u8; SUBKEY_LEN] {
        &self.halves[1]
    }

    #[cfg(test)]
    fn as_bytes(&self) -> &[u8] {
        self.halves.as_flattened()
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive 32 bytes of key material from a secret and salt.
///
/// Deterministic in `(secret, salt, params)`.
pub fn derive(secret: &[u8], salt: &[u8; SALT_LEN], params: &KdfParams) -> DerivedKey {
    tracing::trace!(rounds = params.rounds, "deriving key");

    let mut halves = Zeroizing::new([[0u8; SUBKEY_LEN]; 2]);
    pbkdf2_hmac::<Sha256>(secret, salt, params.rounds, halves.as_flattened_mut());
    DerivedKey { halves }
}
