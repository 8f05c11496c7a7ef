/// rsaseal library crate: RSA envelope protection of a 32-byte secret.
///
/// Modules are public so the binary and the `tests/` integration tests can
/// reach key detection, the envelope protocol and the metadata document via
/// `use rsaseal::...`.
pub mod crypto;
pub mod error;
pub mod keys;
pub mod passphrase;
pub mod pem;
pub mod record;
pub mod session;
pub mod util;
