//! # solidus-proofs — the Σ-protocols behind every PVORM update
//!
//! All proofs here are Fiat–Shamir non-interactive: the prover samples
//! nonces, commits, derives the challenge from a hash over every public
//! input in a fixed order, and answers with responses; the verifier
//! recomputes the same challenge from the same transcript and checks the
//! algebraic identities. The transcript orders are protocol constants —
//! reordering a single point breaks verification across implementations.
//!
//! ## Proof objects
//!
//! - [`PlaintextEqProof`] — two ciphers encrypt the same message under one
//!   key (witness: the secret key)
//! - [`PlaintextEqDisKeyProof`] — two ciphers encrypt the same value under
//!   different keys (witnesses: the value and both randomizers)
//! - [`OneOfTwoDlogProof`] — Cramer–Damgård–Schoenmakers OR of two discrete
//!   logs; the bit gadget of the range proof
//! - [`DoubleSwapProof`] — two ciphertext-pairs were reencrypted straight or
//!   crossed, without revealing which
//! - [`MaxwellRangeProof`] — a cipher encrypts a value in `[0, 2^t)` via bit
//!   ciphers, per-bit OR-proofs, and a weighted-sum equality proof
//! - [`SchnorrSignature`] — signatures over ledger artifacts
//!
//! Any operation composed of several proofs verifies every one of them and
//! ANDs the results; independent sub-proofs may be scheduled on an
//! [`Executor`](solidus_primitives::Executor).

pub mod double_swap;
pub mod one_of_two;
pub mod plaintext_eq;
pub mod range;
pub mod schnorr;

pub use double_swap::{DoubleSwapProof, SwapRandomizers};
pub use one_of_two::OneOfTwoDlogProof;
pub use plaintext_eq::{PlaintextEqDisKeyProof, PlaintextEqProof};
pub use range::MaxwellRangeProof;
pub use schnorr::SchnorrSignature;
