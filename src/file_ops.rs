//! File encryption/decryption operations
//!
//! High-level helpers that read a file, run it through the codec, and write
//! the result. Envelopes are written either as raw binary or armored text;
//! reading accepts both.

use crate::codec;
use crate::error::{EcodecError, ErrorCategory, ErrorKind, Result};
use crate::kdf::KdfParams;
use crate::secret::SecretReader;
use crate::varmor;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Options shared by the file operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOptions {
    /// KDF parameters used for both encryption and decryption.
    pub params: KdfParams,
    /// Write armored text instead of a binary envelope when encrypting.
    pub armor: bool,
}

/// Encrypt a file with a secret
///
/// Reads plaintext from `input_path`, encrypts it using a secret from
/// `secret_reader`, and writes the envelope to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    secret_reader: &mut dyn SecretReader,
    options: &FileOptions,
) -> Result<()> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let secret = secret_reader.read_secret()?;
    let envelope = codec::encrypt_with(&plaintext, &secret, &options.params)
        .map_err(|e| e.with_context("encryption failed"))?;
    let encoded = encode_output(envelope, options.armor);
    write_file_secure(output_path, &encoded)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::debug!(
        input = %input_path.display(),
        output = %output_path.display(),
        armor = options.armor,
        "encrypted file"
    );
    Ok(())
}

/// Decrypt a file with a secret
///
/// Reads a binary or armored envelope from `input_path`, decrypts it using a
/// secret from `secret_reader`, and writes the plaintext to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    secret_reader: &mut dyn SecretReader,
    options: &FileOptions,
) -> Result<()> {
    let stored = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let (envelope, armored) = decode_input(stored)?;
    let secret = secret_reader.read_secret()?;
    let plaintext = codec::decrypt_with(&envelope, &secret, &options.params)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::debug!(
        input = %input_path.display(),
        output = %output_path.display(),
        armored,
        "decrypted file"
    );
    Ok(())
}

/// Replace an encrypted file with new plaintext under the same secret
///
/// This function:
/// 1. Decrypts the existing file at `crypt_path` to validate the secret
/// 2. Reads new plaintext from `plain_path`
/// 3. Encrypts the new plaintext with the validated secret, keeping the
///    existing file's armoring
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// Either the old file or the new file exists afterwards, never a partial one.
/// Validating first prevents accidentally changing the secret.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    secret_reader: &mut dyn SecretReader,
    options: &FileOptions,
) -> Result<()> {
    let stored = fs::read(crypt_path).map_err(|e| read_error(crypt_path, e))?;
    let (envelope, armored) = decode_input(stored)?;
    let secret = secret_reader.read_secret()?;

    // Validate the secret by decrypting the existing file (discard plaintext)
    codec::decrypt_with(&envelope, &secret, &options.params)
        .map_err(|e| e.with_context("failed to decrypt"))?;

    let crypt_dir = match crypt_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(crypt_dir).map_err(|e| {
        EcodecError::io(ErrorCategory::Internal, "failed to create tempfile", e)
    })?;
    let new_plaintext = fs::read(plain_path).map_err(|e| read_error(plain_path, e))?;
    let new_envelope = codec::encrypt_with(&new_plaintext, &secret, &options.params)
        .map_err(|e| e.with_context("failed to encrypt"))?;
    let encoded = encode_output(new_envelope, armored);

    temp_file.write_all(&encoded).map_err(|e| {
        EcodecError::io(ErrorCategory::Internal, "failed to write to tempfile", e)
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| EcodecError::io(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        EcodecError::io(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                EcodecError::io(
                    ErrorCategory::Internal,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }
    temp_file.persist(crypt_path).map_err(|e| {
        EcodecError::io(
            ErrorCategory::Internal,
            format!("failed to rename to target file {}", crypt_path.display()),
            e,
        )
    })?;

    tracing::debug!(
        input = %plain_path.display(),
        output = %crypt_path.display(),
        armored,
        "updated file"
    );
    Ok(())
}

/// Returns the binary envelope and whether it was stored armored.
fn decode_input(stored: Vec<u8>) -> Result<(Vec<u8>, bool)> {
    if !varmor::is_armored(&stored) {
        return Ok((stored, false));
    }

    let armored = String::from_utf8(stored).map_err(|e| {
        EcodecError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "armored input is not valid UTF-8",
            e,
        )
    })?;
    let envelope = varmor::unwrap(&armored).map_err(|e| e.with_context("failed to unarmor"))?;
    Ok((envelope, true))
}

fn encode_output(envelope: Vec<u8>, armor: bool) -> Vec<u8> {
    if armor {
        varmor::wrap(&envelope).into_bytes()
    } else {
        envelope
    }
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                EcodecError::io(
                    ErrorCategory::User,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents).map_err(|e| {
            EcodecError::io(
                ErrorCategory::Internal,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            EcodecError::io(
                ErrorCategory::User,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }
}

fn read_error(path: &Path, err: io::Error) -> EcodecError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    EcodecError::io(category, format!("failed to read from {}", path.display()), err)
}
