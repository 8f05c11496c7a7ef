/// Inspect command: reports which encoding a key file was detected as and
/// the RSA modulus size.
use owo_colors::{OwoColorize, Stream::Stdout};
use rsa::traits::PublicKeyParts;

use rsaseal::keys::{locate_private_key, locate_public_key};
use super::read_input;
use crate::cli::InspectArgs;

pub fn run_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = read_input(&args.key)?;

    let (kind, encoding, bits) = if args.private {
        let source = super::passphrase_source(args.passphrase_env.as_deref());
        let material = locate_private_key(&bytes, &*source)?;
        ("private", material.encoding, material.key.size() * 8)
    } else {
        let material = locate_public_key(&bytes)?;
        ("public", material.encoding, material.key.size() * 8)
    };

    println!(
        "Encoding: {}",
        encoding.if_supports_color(Stdout, |t| t.cyan())
    );
    println!("Key:      RSA {} key, {} bits", kind, bits);

    Ok(())
}
