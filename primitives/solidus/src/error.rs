use thiserror::Error;

/// Failures in group arithmetic, encryption, or table lookups.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("balance {0} outside the encryptable range")]
    BalanceOutOfRange(i64),
    /// Decryption landed outside the lookup table. Distinct from an internal
    /// bug so callers can attribute it to a malicious counterparty.
    #[error("discrete log not present in the lookup table")]
    DlogNotFound,
    #[error("invalid curve point")]
    InvalidPoint,
}

/// Failures while reading ledger bytes. None of these are retried on the
/// same input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),
    #[error("invalid curve point encoding")]
    InvalidPoint,
    #[error("message header mismatch: {0}")]
    VersionMismatch(&'static str),
    #[error("unexpected trailing bytes")]
    TrailingBytes,
}
