//! The published update object.
//!
//! Wire layout (spec-fixed, read and written in exactly this order):
//!
//! ```text
//! u32 tree_depth; u8 bucket_size; u8 stash_size; point public_key;
//! u32 pre_len;  pre_swaps…;
//! pair enc_account_key; pair enc_balance_change;
//! PlaintextEqProof account_key_proof;
//! bool has_range; MaxwellRangeProof?;
//! u32 post_len; post_swaps…
//! ```
//!
//! with each swap as
//! `u32 bucket_idx; u8 slot_idx; Block new_temp; Block new_in_pvorm;
//! DoubleSwapProof`.

use std::sync::Arc;

use solidus_primitives::codec::{self, Codec, Decoder, Encoder};
use solidus_primitives::error::CodecError;
use solidus_primitives::group::{Point, PointEncoding};
use solidus_primitives::params::Params;
use solidus_primitives::Cipher;
use solidus_proofs::{DoubleSwapProof, MaxwellRangeProof, PlaintextEqProof};

use crate::encrypted::Block;
use crate::error::PvormError;
use crate::layout::{self, Position};

/// One oblivious slot exchange: the address, both replacement ciphertext
/// blocks, and the proof that they reencrypt the previous temp/slot pair in
/// one of the two orders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapRecord {
    pub bucket: u32,
    pub slot: u8,
    pub new_temp: Block,
    pub new_in_pvorm: Block,
    pub proof: DoubleSwapProof,
}

impl SwapRecord {
    pub fn position(&self) -> Position {
        Position {
            bucket: self.bucket,
            slot: self.slot,
        }
    }
}

impl Codec for SwapRecord {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u32(self.bucket);
        enc.put_u8(self.slot);
        self.new_temp.encode(enc);
        self.new_in_pvorm.encode(enc);
        self.proof.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            bucket: dec.u32()?,
            slot: dec.u8()?,
            new_temp: Block::decode(dec)?,
            new_in_pvorm: Block::decode(dec)?,
            proof: DoubleSwapProof::decode(dec)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PvormUpdate {
    pub tree_depth: u32,
    pub bucket_size: u8,
    pub stash_size: u8,
    pub public_key: Point,
    pub pre_swaps: Vec<SwapRecord>,
    pub encrypted_account_key: Cipher,
    pub encrypted_balance_change: Cipher,
    pub account_key_proof: PlaintextEqProof,
    pub range_proof: Option<MaxwellRangeProof>,
    pub post_swaps: Vec<SwapRecord>,
}

impl PvormUpdate {
    /// Shape check: declared dimensions match, the pre-update list is one
    /// canonical walk, and the post-update list is exactly the two eviction
    /// walks.
    pub fn valid_size(&self, depth: u32, bucket_size: u8, stash_size: u8) -> bool {
        if self.tree_depth != depth
            || self.bucket_size != bucket_size
            || self.stash_size != stash_size
        {
            return false;
        }
        let walk = stash_size as usize + depth as usize * bucket_size as usize;
        if self.pre_swaps.len() != walk || self.post_swaps.len() != 2 * walk {
            return false;
        }
        let positions: Vec<Position> = self.pre_swaps.iter().map(SwapRecord::position).collect();
        if !layout::is_canonical_walk(&positions, depth, bucket_size, stash_size) {
            return false;
        }
        for half in self.post_swaps.chunks(walk) {
            let positions: Vec<Position> = half.iter().map(SwapRecord::position).collect();
            if !layout::is_canonical_walk(&positions, depth, bucket_size, stash_size) {
                return false;
            }
        }
        true
    }

    pub fn serialize(&self, params: &Arc<Params>, encoding: PointEncoding) -> Vec<u8> {
        codec::write_message(params, self, encoding)
    }

    pub fn deserialize(params: &Arc<Params>, bytes: &[u8]) -> Result<Self, PvormError> {
        Ok(codec::read_message(params, bytes)?)
    }
}

fn decode_swaps(dec: &mut Decoder<'_>) -> Result<Vec<SwapRecord>, CodecError> {
    let len = dec.u32()?;
    if len > 1 << 20 {
        return Err(CodecError::MalformedInput("swap list too long"));
    }
    let mut swaps = Vec::with_capacity(len as usize);
    for _ in 0..len {
        swaps.push(SwapRecord::decode(dec)?);
    }
    Ok(swaps)
}

impl Codec for PvormUpdate {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u32(self.tree_depth);
        enc.put_u8(self.bucket_size);
        enc.put_u8(self.stash_size);
        enc.put_point(&self.public_key);
        enc.put_u32(self.pre_swaps.len() as u32);
        for swap in &self.pre_swaps {
            swap.encode(enc);
        }
        enc.put_pair(&self.encrypted_account_key);
        enc.put_pair(&self.encrypted_balance_change);
        self.account_key_proof.encode(enc);
        enc.put_bool(self.range_proof.is_some());
        if let Some(range_proof) = &self.range_proof {
            range_proof.encode(enc);
        }
        enc.put_u32(self.post_swaps.len() as u32);
        for swap in &self.post_swaps {
            swap.encode(enc);
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let tree_depth = dec.u32()?;
        let bucket_size = dec.u8()?;
        let stash_size = dec.u8()?;
        let public_key = dec.point()?;
        let pre_swaps = decode_swaps(dec)?;
        let encrypted_account_key = dec.pair()?;
        let encrypted_balance_change = dec.pair()?;
        let account_key_proof = PlaintextEqProof::decode(dec)?;
        let range_proof = if dec.bool()? {
            Some(MaxwellRangeProof::decode(dec)?)
        } else {
            None
        };
        let post_swaps = decode_swaps(dec)?;
        Ok(Self {
            tree_depth,
            bucket_size,
            stash_size,
            public_key,
            pre_swaps,
            encrypted_account_key,
            encrypted_balance_change,
            account_key_proof,
            range_proof,
            post_swaps,
        })
    }
}
