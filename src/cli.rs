use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rsaseal", version, about = "Seal a random 32-byte secret under an RSA key, and recover it later")]
pub struct Cli {
    /// Log key detection and envelope steps to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a secret and seal it under an RSA public key
    Seal(SealArgs),
    /// Recover and verify a sealed secret with the matching private key
    Unseal(UnsealArgs),
    /// Show how a key file is detected
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct SealArgs {
    /// Public key: authorized_keys line, SSH2 block, or PEM (use - for stdin)
    #[arg(long, value_name = "PATH")]
    pub key: PathBuf,

    /// Write the metadata JSON here instead of stdout
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct UnsealArgs {
    /// Private key: OpenSSH, PKCS #1, or (encrypted) PKCS #8 PEM (use - for stdin)
    #[arg(long, value_name = "PATH")]
    pub key: PathBuf,

    /// Metadata JSON written by `rsaseal seal`
    #[arg(long, value_name = "FILE")]
    pub meta: PathBuf,

    /// Read the key passphrase from this environment variable instead of prompting
    #[arg(long, value_name = "VAR")]
    pub passphrase_env: Option<String>,

    /// Print the recovered secret (URL-safe base64) on stdout
    #[arg(long)]
    pub reveal: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Key file to inspect (use - for stdin)
    #[arg(long, value_name = "PATH")]
    pub key: PathBuf,

    /// Treat the input as a private key
    #[arg(long)]
    pub private: bool,

    /// Read the key passphrase from this environment variable instead of prompting
    #[arg(long, value_name = "VAR", requires = "private")]
    pub passphrase_env: Option<String>,
}
