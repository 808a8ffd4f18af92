//! ecodec - password-based authenticated encryption with a self-describing envelope
//!
//! ```no_run
//! let envelope = ecodec::encrypt(b"at least sixteen bytes", b"secret")?;
//! let plaintext = ecodec::decrypt(&envelope, b"secret")?;
//! assert_eq!(plaintext, b"at least sixteen bytes");
//! # Ok::<(), ecodec::EcodecError>(())
//! ```

#![forbid(unsafe_code)]

pub mod codec;
pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod secret;
pub mod varmor;

pub use codec::{decrypt, decrypt_with, encrypt, encrypt_with};
pub use error::{EcodecError, ErrorCategory, ErrorKind, Result};
pub use kdf::KdfParams;
