//! # solidus-primitives — group, encryption, hashing, and the serial codec
//!
//! Everything the PVORM and its proof system share sits in this crate:
//!
//! - [`group`] — secp256k1 points and scalars, canonical encodings
//! - [`params`] — deployment-wide [`Params`] built once and shared by `Arc`
//! - [`dlog`] — the gapped discrete-log lookup table used to invert balances
//! - [`elgamal`] — ElGamal [`Cipher`] pairs, [`Encryptor`] / [`Decryptor`]
//! - [`hash`] — the Fiat–Shamir challenge family over SHA-256
//! - [`codec`] — byte-exact serialization; verifiers must reconstitute
//!   identical challenge transcripts, so every encoding here is deterministic
//! - [`exec`] — the task [`Executor`] the core schedules proof work on
//!
//! ## Wire discipline
//!
//! Top-level ledger messages carry the header
//! `version(4) || curve_name || hash_name || transaction_timeout_ms(8)` and
//! are rejected on any mismatch. Scalars serialize as
//! `len(1) || two's-complement big-endian`; points as `len(1) || SEC1 bytes`
//! with `len = 0` reserved for the identity.

pub mod codec;
pub mod dlog;
pub mod elgamal;
pub mod error;
pub mod exec;
pub mod group;
pub mod hash;
pub mod params;

pub use codec::{Codec, Decoder, Encoder};
pub use elgamal::{Cipher, Decryptor, Encryptor, ZeroEnc};
pub use error::{CodecError, CryptoError};
pub use exec::Executor;
pub use group::{Point, PointEncoding, PointKey, Scalar, G};
pub use params::{Params, ParamsBuilder};
