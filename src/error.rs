use thiserror::Error;

/// Errors surfaced at the crate boundary.
///
/// Malformed feed payloads are deliberately not represented here: the
/// adapter drops them without closing the connection, and log-text provider
/// failures are absorbed by the fallback line. Neither ever reaches a
/// caller as an error.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Missing or unusable configuration, e.g. no plan generator credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// Initial feed connect failure. Terminal for that attempt — the caller
    /// must re-invoke `open` to try again.
    #[error("feed connect failed: {0}")]
    Connect(String),

    /// The plan generator call itself failed (network, HTTP status, decode).
    #[error("plan generator failed: {0}")]
    Provider(String),
}
