//! Deterministic fixtures for the cross-crate scenario tests.
//!
//! Seeds pin the CSPRNG so leaf assignment and every encryption replay
//! identically; the dimensions and balances below are the canonical
//! drain/restore and two-bank transfer scenarios exercised by the
//! `solidus-pvorm` and `solidus-bank` integration tests.

/// Balance range for all scenario deployments.
pub const MAX_BALANCE_BITS: u32 = 8;

// Drain/restore scenario: one bank, seven accounts emptied and refilled.

pub const DRAIN_TREE_DEPTH: u32 = 4;
pub const DRAIN_BUCKET_SIZE: u8 = 2;
pub const DRAIN_STASH_SIZE: u8 = 5;
pub const DRAIN_BALANCES: [i64; 7] = [0x83, 0x92, 0x53, 0x0b, 0x54, 0x8b, 0xd0];
pub const DRAIN_PARAMS_SEED: [u8; 32] = [0xd1; 32];

// Two-bank transfer scenario: four customers each, opening balance 10.

pub const TRANSFER_TREE_DEPTH: u32 = 3;
pub const TRANSFER_BUCKET_SIZE: u8 = 2;
pub const TRANSFER_STASH_SIZE: u8 = 5;
pub const TRANSFER_USERS_PER_BANK: usize = 4;
pub const TRANSFER_OPENING_BALANCE: i64 = 10;
pub const TRANSFER_PARAMS_SEED: [u8; 32] = [0xb2; 32];
