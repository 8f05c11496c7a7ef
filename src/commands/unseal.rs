/// Unseal command: recovers the secret from a metadata document with the
/// matching private key and verifies its digest.
use anyhow::Context;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use owo_colors::{OwoColorize, Stream::Stderr};

use rsaseal::record::Metadata;
use rsaseal::session::RsaSession;
use rsaseal::util::human_age;

use super::read_input;
use crate::cli::UnsealArgs;

pub fn run_unseal(args: UnsealArgs) -> anyhow::Result<()> {
    let meta_text = std::fs::read_to_string(&args.meta)
        .with_context(|| format!("failed to read {}", args.meta.display()))?;
    let meta = Metadata::from_json(&meta_text)
        .with_context(|| format!("{} is not a metadata document", args.meta.display()))?;
    let key_bytes = read_input(&args.key)?;

    let source = super::passphrase_source(args.passphrase_env.as_deref());
    let mut session = RsaSession::new(meta, key_bytes);
    if let Err(e) = session.setup(&*source) {
        eprintln!(
            "{} secret could not be recovered",
            "Error:".if_supports_color(Stderr, |t| t.red())
        );
        return Err(e.into());
    }

    let secret = session
        .secret()
        .context("unseal finished without a secret")?;
    let record = session.metadata().record()?;

    eprintln!("{}", "verified".if_supports_color(Stderr, |t| t.green()));
    eprintln!(
        "  Digest: {}",
        record.digest.if_supports_color(Stderr, |t| t.cyan())
    );
    eprintln!(
        "  Sealed: {} ({})",
        record.timestamp.to_rfc3339(),
        human_age(record.timestamp, chrono::Utc::now())
    );
    if let Some(encoding) = session.encoding() {
        eprintln!("  Key:    {} private key", encoding);
    }

    if args.reveal {
        println!("{}", URL_SAFE.encode(secret.as_bytes()));
    }

    Ok(())
}
