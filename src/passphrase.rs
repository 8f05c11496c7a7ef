//! Passphrase sources for protected private keys.
//!
//! The private-key locator asks for a passphrase only when the key format
//! demands one, through the [`PassphraseSource`] it was handed. Tests plug in
//! deterministic fakes; the CLI uses [`TerminalPassphrase`] or
//! [`EnvPassphrase`].

use std::io::IsTerminal;

use zeroize::Zeroizing;

use crate::error::SealError;

/// Something that can supply a passphrase on demand.
pub trait PassphraseSource {
    fn passphrase(&self) -> Result<Zeroizing<String>, SealError>;
}

impl<F> PassphraseSource for F
where
    F: Fn() -> Result<Zeroizing<String>, SealError>,
{
    fn passphrase(&self) -> Result<Zeroizing<String>, SealError> {
        self()
    }
}

/// Interactive hidden prompt on the controlling terminal.
pub struct TerminalPassphrase {
    prompt: String,
}

impl TerminalPassphrase {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Default for TerminalPassphrase {
    fn default() -> Self {
        Self::new("Enter passphrase")
    }
}

impl PassphraseSource for TerminalPassphrase {
    fn passphrase(&self) -> Result<Zeroizing<String>, SealError> {
        if !std::io::stdin().is_terminal() {
            return Err(SealError::Passphrase(
                "key is passphrase-protected but stdin is not a terminal (use --passphrase-env)"
                    .to_string(),
            ));
        }
        dialoguer::Password::new()
            .with_prompt(&self.prompt)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| SealError::Passphrase(format!("prompt failed: {e}")))
    }
}

/// Reads the passphrase from an environment variable.
pub struct EnvPassphrase {
    var: String,
}

impl EnvPassphrase {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl PassphraseSource for EnvPassphrase {
    fn passphrase(&self) -> Result<Zeroizing<String>, SealError> {
        std::env::var(&self.var)
            .map(Zeroizing::new)
            .map_err(|e| SealError::Passphrase(format!("{}: {e}", self.var)))
    }
}

/// Never yields a passphrase. Used where a protected key is an error, e.g.
/// when only public keys are expected.
pub struct NoPassphrase;

impl PassphraseSource for NoPassphrase {
    fn passphrase(&self) -> Result<Zeroizing<String>, SealError> {
        Err(SealError::Passphrase("no passphrase source configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_passphrase_reads_variable() {
        let var = "RSASEAL_TEST_PASSPHRASE_PRESENT";
        std::env::set_var(var, "hunter2");
        let pass = EnvPassphrase::new(var).passphrase().expect("variable is set");
        assert_eq!(pass.as_str(), "hunter2");
        std::env::remove_var(var);
    }

    #[test]
    fn test_env_passphrase_missing_variable() {
        let err = EnvPassphrase::new("RSASEAL_TEST_PASSPHRASE_ABSENT")
            .passphrase()
            .expect_err("unset variable must fail");
        assert!(
            err.to_string().contains("RSASEAL_TEST_PASSPHRASE_ABSENT"),
            "error should name the variable, got: {err}"
        );
    }

    #[test]
    fn test_closure_is_a_source() {
        let source =
            || -> Result<Zeroizing<String>, SealError> { Ok(Zeroizing::new("from closure".to_string())) };
        assert_eq!(source.passphrase().expect("closure source").as_str(), "from closure");
    }

    #[test]
    fn test_no_passphrase_always_fails() {
        assert!(NoPassphrase.passphrase().is_err());
    }
}
