//! # solidus-pvorm — the publicly verifiable ORAM machine
//!
//! A bank's account map lives twice: a plaintext circuit-ORAM
//! ([`PlainOram`]) that the bank alone can read, and a ciphertext mirror
//! ([`EncryptedPvorm`]) that every other bank holds a copy of. The two stay
//! in lock-step through [`UpdateTranscript`]s: the plaintext eviction decides
//! *where* blocks move, and the encrypted side replays those moves as
//! reencryption swaps, each carrying a
//! [`DoubleSwapProof`](solidus_proofs::DoubleSwapProof) so observers can
//! check the step without learning whether it moved anything.
//!
//! [`OwnedPvorm`] couples the halves on the owner side and emits a
//! [`PvormUpdate`] per balance change; [`EncryptedPvorm::verify_update`]
//! checks one against a shadow overlay which
//! [`EncryptedPvorm::apply_last_verified_update`] then flushes.
//!
//! ## Shape invariants
//!
//! Bucket 0 is the temp slot (capacity 1, encrypting the identity between
//! updates), bucket 1 the stash, buckets `2..2^(D+1)` the tree. Every bucket
//! is always a full array of ciphertexts — filler blocks encrypt the
//! identity — so occupancy never leaks. A real block is either in the stash
//! or on the path to its assigned leaf.

pub mod encrypted;
pub mod error;
pub mod layout;
pub mod owned;
pub mod plain;
pub mod update;

pub use encrypted::{Block, EncryptedPvorm};
pub use error::PvormError;
pub use layout::{Position, STASH_BUCKET, TEMP_BUCKET};
pub use owned::{OwnedPvorm, OwnedPvormBuilder};
pub use plain::{EvictionRecord, PlainOram, UpdateTranscript};
pub use update::{PvormUpdate, SwapRecord};

#[cfg(test)]
mod tests;
