//! The ciphertext half of the PVORM.
//!
//! Observers hold one of these per remote bank: the full bucket array of
//! [`Block`]s and nothing else. [`verify_update`](EncryptedPvorm::verify_update)
//! replays an update against a copy-on-write shadow overlay — authoritative
//! state is read through the overlay, proof verifications are scheduled on
//! the executor, and state assignments happen strictly in list order. Only a
//! fully successful verification retains the overlay for
//! [`apply_last_verified_update`](EncryptedPvorm::apply_last_verified_update).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use solidus_primitives::codec::{self, Codec, Decoder, Encoder};
use solidus_primitives::error::CodecError;
use solidus_primitives::exec::{Executor, Task};
use solidus_primitives::group::{self, Point, PointKey, Scalar};
use solidus_primitives::params::Params;
use solidus_primitives::{Cipher, Decryptor};

use crate::error::PvormError;
use crate::layout::{self, Position, TEMP_POSITION};
use crate::update::{PvormUpdate, SwapRecord};

/// An encrypted account block: `(enc_key, enc_balance)`. Filler blocks
/// encrypt the identity in both halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub key: Cipher,
    pub balance: Cipher,
}

impl Block {
    pub fn as_pair(&self) -> (Cipher, Cipher) {
        (self.key, self.balance)
    }
}

impl Codec for Block {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_pair(&self.key);
        enc.put_pair(&self.balance);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            key: dec.pair()?,
            balance: dec.pair()?,
        })
    }
}

/// Copy-on-write view over the bucket array, keyed by bucket index.
#[derive(Clone, Debug, Default)]
struct Overlay {
    buckets: HashMap<u32, Vec<Block>>,
}

impl Overlay {
    fn read(&self, buckets: &[Vec<Block>], pos: Position) -> Block {
        match self.buckets.get(&pos.bucket) {
            Some(bucket) => bucket[pos.slot as usize],
            None => buckets[pos.bucket as usize][pos.slot as usize],
        }
    }

    fn write(&mut self, buckets: &[Vec<Block>], pos: Position, block: Block) {
        self.buckets
            .entry(pos.bucket)
            .or_insert_with(|| buckets[pos.bucket as usize].clone())[pos.slot as usize] = block;
    }
}

#[derive(Clone)]
pub struct EncryptedPvorm {
    params: Arc<Params>,
    depth: u32,
    bucket_size: u8,
    stash_size: u8,
    public_key: Point,
    buckets: Vec<Vec<Block>>,
    pending: Option<Overlay>,
}

impl EncryptedPvorm {
    pub(crate) fn from_buckets(
        params: &Arc<Params>,
        depth: u32,
        bucket_size: u8,
        stash_size: u8,
        public_key: Point,
        buckets: Vec<Vec<Block>>,
    ) -> Self {
        Self {
            params: Arc::clone(params),
            depth,
            bucket_size,
            stash_size,
            public_key,
            buckets,
            pending: None,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn bucket_size(&self) -> u8 {
        self.bucket_size
    }

    pub fn stash_size(&self) -> u8 {
        self.stash_size
    }

    pub fn public_key(&self) -> Point {
        self.public_key
    }

    pub fn params(&self) -> &Arc<Params> {
        &self.params
    }

    /// A duplicate holding only authoritative state; any pending overlay is
    /// not carried over.
    pub fn duplicate(&self) -> Self {
        Self {
            params: Arc::clone(&self.params),
            depth: self.depth,
            bucket_size: self.bucket_size,
            stash_size: self.stash_size,
            public_key: self.public_key,
            buckets: self.buckets.clone(),
            pending: None,
        }
    }

    pub(crate) fn block_at(&self, pos: Position) -> Block {
        self.buckets[pos.bucket as usize][pos.slot as usize]
    }

    pub(crate) fn set_block(&mut self, pos: Position, block: Block) {
        self.buckets[pos.bucket as usize][pos.slot as usize] = block;
    }

    /// Replay `update` against a shadow overlay, scheduling every sub-proof
    /// on `exec`. Returns `true` and caches the overlay iff every proof
    /// holds; on failure the overlay is discarded and state is unchanged.
    ///
    /// Calling this again before applying overwrites the cached overlay.
    pub fn verify_update(&mut self, update: &PvormUpdate, exec: &Executor) -> bool {
        self.pending = None;
        if update.tree_depth != self.depth
            || update.bucket_size != self.bucket_size
            || update.stash_size != self.stash_size
            || update.public_key != self.public_key
        {
            tracing::debug!("update rejected: dimension or key mismatch");
            return false;
        }
        if !update.valid_size(self.depth, self.bucket_size, self.stash_size) {
            tracing::debug!("update rejected: swap lists are not canonical walks");
            return false;
        }

        let mut overlay = Overlay::default();
        let mut tasks: Vec<Task<bool>> = Vec::new();

        self.schedule_swaps(&mut overlay, &update.pre_swaps, &mut tasks);

        // The retrieved block now sits in the temp slot; its key must match
        // the request ciphertext.
        let temp = overlay.read(&self.buckets, TEMP_POSITION);
        {
            let proof = update.account_key_proof.clone();
            let request_key = update.encrypted_account_key;
            let public_key = self.public_key;
            let temp_key = temp.key;
            tasks.push(Box::new(move || {
                proof.verify(&temp_key, &request_key, &public_key)
            }));
        }

        // Homomorphic balance change, then the optional range proof on the
        // result.
        let adjusted = Block {
            key: temp.key,
            balance: temp.balance + update.encrypted_balance_change,
        };
        overlay.write(&self.buckets, TEMP_POSITION, adjusted);
        if let Some(range_proof) = &update.range_proof {
            tasks.extend(range_proof.verify_tasks(
                adjusted.balance,
                self.public_key,
                self.params.max_balance_bits(),
            ));
        }

        self.schedule_swaps(&mut overlay, &update.post_swaps, &mut tasks);

        let results = exec.run_all(tasks);
        if results.into_iter().all(|ok| ok) {
            self.pending = Some(overlay);
            true
        } else {
            tracing::debug!("update rejected: proof verification failed");
            false
        }
    }

    /// Verifications are scheduled out of order, but the overlay assignments
    /// below happen in list order — each swap's "pre" state is whatever the
    /// previous swaps left behind.
    fn schedule_swaps(
        &self,
        overlay: &mut Overlay,
        swaps: &[SwapRecord],
        tasks: &mut Vec<Task<bool>>,
    ) {
        for swap in swaps {
            let pos = Position {
                bucket: swap.bucket,
                slot: swap.slot,
            };
            let pre_temp = overlay.read(&self.buckets, TEMP_POSITION);
            let pre_slot = overlay.read(&self.buckets, pos);

            let proof = swap.proof.clone();
            let public_key = self.public_key;
            let new_temp = swap.new_temp;
            let new_in_pvorm = swap.new_in_pvorm;
            tasks.push(Box::new(move || {
                proof.verify(
                    &public_key,
                    &pre_temp.as_pair(),
                    &pre_slot.as_pair(),
                    &new_temp.as_pair(),
                    &new_in_pvorm.as_pair(),
                )
            }));

            overlay.write(&self.buckets, TEMP_POSITION, swap.new_temp);
            overlay.write(&self.buckets, pos, swap.new_in_pvorm);
        }
    }

    /// Flush the overlay retained by the last successful verification.
    pub fn apply_last_verified_update(&mut self) -> Result<(), PvormError> {
        let overlay = self.pending.take().ok_or(PvormError::NoVerifiedUpdate)?;
        for (bucket, contents) in overlay.buckets {
            self.buckets[bucket as usize] = contents;
        }
        Ok(())
    }

    /// Insecure fast path for offline audits: apply the update's state
    /// transitions without checking a single proof.
    pub fn apply_update_without_verification(
        &mut self,
        update: &PvormUpdate,
    ) -> Result<(), PvormError> {
        if update.tree_depth != self.depth
            || update.bucket_size != self.bucket_size
            || update.stash_size != self.stash_size
            || update.public_key != self.public_key
        {
            return Err(PvormError::SizeMismatch);
        }
        if !update.valid_size(self.depth, self.bucket_size, self.stash_size) {
            return Err(PvormError::SizeMismatch);
        }
        for swap in &update.pre_swaps {
            self.apply_swap(swap);
        }
        let temp = self.block_at(TEMP_POSITION);
        self.set_block(
            TEMP_POSITION,
            Block {
                key: temp.key,
                balance: temp.balance + update.encrypted_balance_change,
            },
        );
        for swap in &update.post_swaps {
            self.apply_swap(swap);
        }
        Ok(())
    }

    fn apply_swap(&mut self, swap: &SwapRecord) {
        self.set_block(TEMP_POSITION, swap.new_temp);
        self.set_block(
            Position {
                bucket: swap.bucket,
                slot: swap.slot,
            },
            swap.new_in_pvorm,
        );
    }

    /// Decrypt every real block. Filler blocks (key = identity) are skipped;
    /// a balance outside the dlog table surfaces as an error.
    pub fn decrypt_all(&self, secret: &Scalar) -> Result<BTreeMap<PointKey, i64>, PvormError> {
        let decryptor = Decryptor::for_key(&self.params, *secret);
        let mut out = BTreeMap::new();
        for bucket in &self.buckets {
            for block in bucket {
                let account = decryptor.decrypt_point(&block.key);
                if group::is_identity(&account) {
                    continue;
                }
                let balance = decryptor.decrypt_balance(&block.balance)?;
                out.insert(PointKey::new(&account), balance);
            }
        }
        Ok(out)
    }

    pub fn encode_payload(&self, enc: &mut Encoder) {
        enc.put_u32(self.depth);
        enc.put_u8(self.bucket_size);
        enc.put_u8(self.stash_size);
        enc.put_point(&self.public_key);
        for bucket in &self.buckets {
            for block in bucket {
                block.encode(enc);
            }
        }
    }

    pub fn decode_payload(
        params: &Arc<Params>,
        dec: &mut Decoder<'_>,
    ) -> Result<Self, CodecError> {
        let depth = dec.u32()?;
        if depth == 0 || depth > 20 {
            return Err(CodecError::MalformedInput("tree depth out of range"));
        }
        let bucket_size = dec.u8()?;
        let stash_size = dec.u8()?;
        if bucket_size == 0 || stash_size == 0 {
            return Err(CodecError::MalformedInput("zero bucket or stash size"));
        }
        let public_key = dec.point()?;

        let mut buckets = Vec::with_capacity(layout::bucket_count(depth) as usize);
        for bucket_idx in 0..layout::bucket_count(depth) {
            let capacity = match bucket_idx {
                0 => 1,
                1 => stash_size as usize,
                _ => bucket_size as usize,
            };
            let mut bucket = Vec::with_capacity(capacity);
            for _ in 0..capacity {
                bucket.push(Block::decode(dec)?);
            }
            buckets.push(bucket);
        }
        Ok(Self::from_buckets(
            params,
            depth,
            bucket_size,
            stash_size,
            public_key,
            buckets,
        ))
    }

    pub fn serialize(&self, encoding: solidus_primitives::PointEncoding) -> Vec<u8> {
        let mut enc = codec::message_encoder(&self.params, encoding);
        self.encode_payload(&mut enc);
        enc.finish()
    }

    pub fn deserialize(params: &Arc<Params>, bytes: &[u8]) -> Result<Self, PvormError> {
        let mut dec = codec::open_message(params, bytes)?;
        let pvorm = Self::decode_payload(params, &mut dec)?;
        dec.finish().map_err(PvormError::from)?;
        Ok(pvorm)
    }
}
