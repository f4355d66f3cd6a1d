//! # solidus-bank — the settlement-facing surface of a bank
//!
//! One confidential transfer touches three parties:
//!
//! 1. The **sending bank** turns a customer's [`TransactionRequest`] into a
//!    [`TransactionHeader`] (fresh value ciphers under both bank keys plus
//!    range, same-key, and cross-key proofs), then decrements the source
//!    account with a PVORM update signed into a [`SenderInfo`].
//! 2. The **receiving bank** checks the header and increments the
//!    destination account, producing a [`ReceiverInfo`].
//! 3. **Every other bank** holds a [`RemoteBank`] shadow of both parties and
//!    verifies-then-applies the two updates from the broadcast log.
//!
//! Banks are identified by the base64url (no padding) of their compressed
//! public key; one secp256k1 keypair serves encryption and signing.

pub mod bank;
pub mod error;
pub mod txn;

pub use bank::{bank_id, LocalBank, LocalBankBuilder, RemoteBank};
pub use error::BankError;
pub use txn::{ReceiverInfo, SenderInfo, Transaction, TransactionHeader, TransactionRequest};

#[cfg(test)]
mod tests;
