//! Encryption/decryption using PBKDF2 + AES-128-CTR + SHA-256
//!
//! This module implements password-based authenticated encryption using:
//! - PBKDF2-HMAC-SHA256 for key derivation from the secret
//! - AES-128 in counter mode for confidentiality
//! - SHA-256 over (second key half || ciphertext) for integrity
//!
//! See [`crate::envelope`] for the binary format.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::envelope::{self, Envelope, IV_LEN, SALT_LEN};
use crate::error::{EcodecError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{self, KdfParams, SUBKEY_LEN};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Smallest plaintext accepted by encryption.
pub const MIN_PLAINTEXT_LEN: usize = 16;

/// Encrypt plaintext with a secret using random salt and IV and the default
/// KDF parameters.
///
/// Returns the envelope: version(1) + salt(32) + iv(16) + tag(32) + ciphertext(n)
pub fn encrypt(plaintext: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    encrypt_with(plaintext, secret, &KdfParams::default())
}

/// Encrypt plaintext with explicit KDF parameters.
pub fn encrypt_with(plaintext: &[u8], secret: &[u8], params: &KdfParams) -> Result<Vec<u8>> {
    encrypt_with_rng(plaintext, secret, params, &mut OsRng)
}

/// Encrypt plaintext drawing salt and IV from `rng`.
///
/// A failing `rng` aborts the encryption; nothing is produced from
/// partially filled randomness.
pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    secret: &[u8],
    params: &KdfParams,
    rng: &mut R,
) -> Result<Vec<u8>> {
    check_encrypt_input(plaintext, secret)?;

    let mut salt = [0u8; SALT_LEN];
    fill_random(rng, &mut salt)?;

    let mut iv = [0u8; IV_LEN];
    fill_random(rng, &mut iv)?;

    Ok(seal(plaintext, secret, &salt, &iv, params))
}

/// Encrypt plaintext with a secret using provided salt and IV
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates random salt/IV.
pub fn encrypt_deterministic(
    plaintext: &[u8],
    secret: &[u8],
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
    params: &KdfParams,
) -> Result<Vec<u8>> {
    check_encrypt_input(plaintext, secret)?;
    Ok(seal(plaintext, secret, salt, iv, params))
}

/// Decrypt an envelope with a secret and the default KDF parameters.
pub fn decrypt(envelope: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    decrypt_with(envelope, secret, &KdfParams::default())
}

/// Decrypt an envelope with explicit KDF parameters.
///
/// The tag is verified before any plaintext is produced. A wrong secret and
/// a corrupted envelope fail identically.
pub fn decrypt_with(envelope: &[u8], secret: &[u8], params: &KdfParams) -> Result<Vec<u8>> {
    let env = Envelope::parse(envelope)?;

    let key = kdf::derive(secret, env.salt, params);
    let expected = envelope::compute_tag(key.mac_key(), env.ciphertext);
    if !env.tag_matches(&expected) {
        return Err(EcodecError::with_kind(
            ErrorCategory::User,
            ErrorKind::Authentication,
            "invalid key",
        ));
    }

    let mut plaintext = env.ciphertext.to_vec();
    apply_keystream(key.cipher_key(), env.iv, &mut plaintext);

    Ok(plaintext)
}

fn check_encrypt_input(plaintext: &[u8], secret: &[u8]) -> Result<()> {
    if plaintext.is_empty() {
        return Err(EcodecError::input("no data"));
    }
    if secret.is_empty() {
        return Err(EcodecError::input("no key"));
    }
    if plaintext.len() < MIN_PLAINTEXT_LEN {
        return Err(EcodecError::input(format!(
            "data must be at least {} bytes",
            MIN_PLAINTEXT_LEN
        )));
    }
    Ok(())
}

fn fill_random<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(buf).map_err(|e| {
        EcodecError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Entropy,
            "failed to obtain random bytes",
            e,
        )
    })
}

fn seal(
    plaintext: &[u8],
    secret: &[u8],
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
    params: &KdfParams,
) -> Vec<u8> {
    let key = kdf::derive(secret, salt, params);

    let mut output = envelope::allocate(salt, iv, plaintext.len());
    let (tag_slot, payload) = envelope::tag_and_payload_mut(&mut output);

    payload.copy_from_slice(plaintext);
    apply_keystream(key.cipher_key(), iv, payload);

    let tag = envelope::compute_tag(key.mac_key(), payload);
    tag_slot.copy_from_slice(&tag);

    output
}

fn apply_keystream(key: &[u8; SUBKEY_LEN], iv: &[u8; IV_LEN], buf: &mut [u8]) {
    let mut cipher = Aes128Ctr::new(key.into(), iv.into());
    cipher.apply_keystream(buf);
}
