use solidus_primitives::error::{CodecError, CryptoError};
use solidus_pvorm::PvormError;
use thiserror::Error;

/// Input-validation and protocol failures at the bank surface. None of
/// these change PVORM state.
#[derive(Debug, Error)]
pub enum BankError {
    #[error("request or header addressed to a different bank")]
    WrongBank,
    #[error("request signature check failed")]
    BadSignature,
    #[error("unknown source account")]
    UnknownAccount,
    #[error("negative transfer value")]
    NegativeTransfer,
    #[error("balance below transfer amount")]
    InsufficientBalance,
    #[error("balance would exceed the encryptable range")]
    BalanceOverflow,
    #[error("transaction header proofs failed verification")]
    RejectedHeader,
    #[error("PVORM update failed verification")]
    RejectedUpdate,
    #[error(transparent)]
    Pvorm(#[from] PvormError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
