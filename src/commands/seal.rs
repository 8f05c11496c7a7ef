/// Seal command: reads a public key in any supported encoding, seals a fresh
/// secret under it and writes the metadata document.
use anyhow::Context;
use owo_colors::{OwoColorize, Stream::Stderr};

use rsaseal::passphrase::NoPassphrase;
use rsaseal::record::Metadata;
use rsaseal::session::RsaSession;

use crate::cli::SealArgs;

pub fn run_seal(args: SealArgs) -> anyhow::Result<()> {
    // ── 1. Load and seal ──────────────────────────────────────────────────
    let key_bytes = super::read_input(&args.key)?;
    let mut session = RsaSession::new(Metadata::new(), key_bytes);
    // Sealing only ever reads public keys, so no passphrase can be needed.
    session.setup(&NoPassphrase)?;

    let encoding = session
        .encoding()
        .map(|e| e.to_string())
        .unwrap_or_default();
    let meta = session.into_metadata();
    let record = meta.record()?;

    // ── 2. Write the document ─────────────────────────────────────────────
    let json = meta.to_json().context("failed to serialize metadata")?;
    match args.out {
        Some(ref path) => std::fs::write(path, format!("{json}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    // ── 3. Report on stderr so stdout stays pipeable ──────────────────────
    eprintln!("{}", "Sealed!".if_supports_color(Stderr, |t| t.green()));
    eprintln!("  Key:    {} public key", encoding);
    eprintln!(
        "  Digest: {}",
        record.digest.if_supports_color(Stderr, |t| t.cyan())
    );
    if let Some(ref path) = args.out {
        eprintln!("  Wrote:  {}", path.display());
    }

    Ok(())
}
