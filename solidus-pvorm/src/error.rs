use solidus_primitives::error::{CodecError, CryptoError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PvormError {
    #[error("invalid PVORM configuration: {0}")]
    Config(&'static str),
    #[error("account already present")]
    AccountExists,
    #[error("PVORM at capacity")]
    CapacityExceeded,
    #[error("unknown account")]
    UnknownAccount,
    /// Unrecoverable: the deployment needs a larger bucket or stash size.
    #[error("stash overflow; reconfigure with a larger bucket or stash size")]
    StashOverflow,
    #[error("update shape does not match PVORM dimensions")]
    SizeMismatch,
    #[error("no verified update pending")]
    NoVerifiedUpdate,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
