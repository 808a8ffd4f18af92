//! Sources for the encryption secret
//!
//! A secret is arbitrary bytes: a typed passphrase, raw key material piped in
//! on stdin, or hex-encoded key material.

use crate::error::{EcodecError, ErrorCategory, ErrorKind, Result};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for obtaining a secret from some source
pub trait SecretReader {
    /// Read the secret as arbitrary bytes (not necessarily UTF-8)
    ///
    /// Returns the secret wrapped in `Zeroizing` so it is wiped from memory
    /// when dropped.
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed secret (for testing and embedding)
pub struct ConstantSecretReader {
    secret: Zeroizing<Vec<u8>>,
}

impl ConstantSecretReader {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret: Zeroizing::new(secret),
        }
    }
}

impl SecretReader for ConstantSecretReader {
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.secret).clone()))
    }
}

/// How bytes read from a stream map to the secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretEncoding {
    /// Every byte read is part of the secret, including any trailing newline.
    #[default]
    Raw,
    /// Hex digits, with surrounding whitespace ignored.
    Hex,
}

/// Reads the secret from any io::Read source until EOF
pub struct StreamSecretReader {
    reader: Box<dyn Read>,
    encoding: SecretEncoding,
}

impl StreamSecretReader {
    pub fn new(reader: Box<dyn Read>, encoding: SecretEncoding) -> Self {
        Self { reader, encoding }
    }
}

impl SecretReader for StreamSecretReader {
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            EcodecError::io(
                ErrorCategory::Internal,
                format!("error reading secret: {}", e),
                e,
            )
        })?;

        match self.encoding {
            SecretEncoding::Raw => Ok(data),
            SecretEncoding::Hex => decode_hex(&data),
        }
    }
}

fn decode_hex(data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    hex::decode(data.trim_ascii())
        .map(Zeroizing::new)
        .map_err(|e| {
            EcodecError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::SecretUnavailable,
                format!("secret is not valid hex: {}", e),
                e,
            )
        })
}

/// Reads a passphrase from the terminal with no echo
#[derive(Default)]
pub struct TerminalSecretReader;

impl TerminalSecretReader {
    pub fn new() -> Self {
        Self
    }
}

impl SecretReader for TerminalSecretReader {
    /// Read a passphrase from the terminal.
    ///
    /// Terminal input is limited to UTF-8 by rpassword. Use a stream reader
    /// for arbitrary bytes.
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(EcodecError::with_kind(
                ErrorCategory::User,
                ErrorKind::SecretUnavailable,
                "cannot read passphrase from terminal - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(b"Passphrase (ecodec): ")
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                EcodecError::io(
                    ErrorCategory::Internal,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        // rpassword returns a String that is not zeroized itself
        let passphrase = rpassword::read_password().map_err(|e| {
            EcodecError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::SecretUnavailable,
                format!("failure reading passphrase: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(passphrase.into_bytes()))
    }
}
