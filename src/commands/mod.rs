pub mod inspect;
pub mod seal;
pub mod unseal;

use std::io::Read;
use std::path::Path;

use anyhow::Context;

use rsaseal::passphrase::{EnvPassphrase, PassphraseSource, TerminalPassphrase};

/// Read a whole input, where `-` means stdin.
pub(crate) fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// `--passphrase-env VAR` wins over the interactive prompt.
pub(crate) fn passphrase_source(env_var: Option<&str>) -> Box<dyn PassphraseSource> {
    match env_var {
        Some(var) => Box::new(EnvPassphrase::new(var)),
        None => Box::new(TerminalPassphrase::new("Private key passphrase")),
    }
}
