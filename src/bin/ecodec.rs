//! ecodec CLI - password-based file encryption
//!
//! Command-line interface for encrypting and decrypting files into
//! self-describing envelopes (PBKDF2-HMAC-SHA256, AES-128-CTR, SHA-256 tag).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use ecodec::{EcodecError, KdfParams};
use ecodec::file_ops::{self, FileOptions};
use ecodec::secret::{SecretEncoding, SecretReader, StreamSecretReader, TerminalSecretReader};

#[derive(Parser)]
#[command(name = "ecodec")]
#[command(version)]
#[command(about = "Password-based file encryption.", long_about = None)]
struct Cli {
    /// Read the secret as raw bytes from stdin instead of from the terminal
    #[arg(long, global = true)]
    secret_stdin: bool,

    /// Read the secret as hex-encoded key material from stdin
    #[arg(long, global = true, conflicts_with = "secret_stdin")]
    secret_hex_stdin: bool,

    /// Use the 16-round key derivation of envelopes written by older releases
    #[arg(long, global = true)]
    legacy_kdf: bool,

    /// Log what is being done to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the envelope to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Write armored text instead of a binary envelope
        #[arg(short, long)]
        armor: bool,
    },

    /// Decrypt a file (binary or armored)
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file whose contents is to be decrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the decrypted contents to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Update an encrypted file with new content, while validating
    /// that the secret is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing envelope to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        if let Some(err) = e.downcast_ref::<EcodecError>() {
            tracing::debug!(kind = ?err.kind, category = ?err.category, "command failed");
        }
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let params = if cli.legacy_kdf {
        KdfParams::legacy()
    } else {
        KdfParams::default()
    };
    let mut reader = secret_reader(&cli);

    match cli.command {
        Commands::Encrypt {
            input,
            output,
            armor,
        } => {
            let options = FileOptions { params, armor };
            file_ops::encrypt_file(&input, &output, &mut *reader, &options)?;
        }
        Commands::Decrypt { input, output } => {
            let options = FileOptions {
                params,
                ..Default::default()
            };
            file_ops::decrypt_file(&input, &output, &mut *reader, &options)?;
        }
        Commands::Update { input, output } => {
            let options = FileOptions {
                params,
                ..Default::default()
            };
            file_ops::update_file(&input, &output, &mut *reader, &options)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "ecodec=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn secret_reader(cli: &Cli) -> Box<dyn SecretReader> {
    if cli.secret_stdin {
        Box::new(StreamSecretReader::new(
            Box::new(std::io::stdin()),
            SecretEncoding::Raw,
        ))
    } else if cli.secret_hex_stdin {
        Box::new(StreamSecretReader::new(
            Box::new(std::io::stdin()),
            SecretEncoding::Hex,
        ))
    } else {
        Box::new(TerminalSecretReader::new())
    }
}
