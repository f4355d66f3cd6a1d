//! The owner side: plaintext ORAM and encrypted mirror in lock-step.
//!
//! The two halves never reference each other; the [`UpdateTranscript`]
//! mediates. An update decrypts its inputs, runs the plaintext access, and
//! then replays the transcript over the ciphertexts: the canonical walk to
//! the block's old leaf retrieves it into the temp slot (one real exchange,
//! the rest fake), the balance change lands homomorphically, and the two
//! eviction walks put everything back. Every slot visited yields a
//! [`SwapRecord`] whose proof is built on the executor; records are emitted
//! in walk order regardless of task completion order.

use std::sync::Arc;

use solidus_primitives::exec::{Executor, Task};
use solidus_primitives::group::{Point, PointKey, Scalar, G};
use solidus_primitives::params::Params;
use solidus_primitives::{Cipher, Decryptor, Encryptor};
use solidus_proofs::{DoubleSwapProof, MaxwellRangeProof, PlaintextEqProof, SwapRandomizers};

use crate::encrypted::{Block, EncryptedPvorm};
use crate::error::PvormError;
use crate::layout::{walk_positions, Position, TEMP_POSITION};
use crate::plain::PlainOram;
use crate::update::{PvormUpdate, SwapRecord};

pub struct OwnedPvormBuilder {
    params: Arc<Params>,
    secret: Scalar,
    public_key: Point,
    plain: PlainOram,
}

impl OwnedPvormBuilder {
    pub fn new(
        params: &Arc<Params>,
        secret: Scalar,
        depth: u32,
        bucket_size: u8,
        stash_size: u8,
    ) -> Result<Self, PvormError> {
        Ok(Self {
            params: Arc::clone(params),
            public_key: G * secret,
            secret,
            plain: PlainOram::new(params, depth, bucket_size, stash_size)?,
        })
    }

    /// Register an account with its opening balance.
    pub fn insert(&mut self, account: Point, balance: i64) -> Result<(), PvormError> {
        if balance > self.params.max_balance() {
            return Err(PvormError::Crypto(
                solidus_primitives::error::CryptoError::BalanceOutOfRange(balance),
            ));
        }
        self.plain.insert(account, balance)
    }

    /// Encrypt the final plaintext state slot for slot; empty slots become
    /// filler blocks encrypting the identity.
    pub fn build(self) -> Result<OwnedPvorm, PvormError> {
        let encryptor = Encryptor::for_key(&self.params, self.public_key);
        let mut buckets = Vec::with_capacity(self.plain.buckets().len());
        for bucket in self.plain.buckets() {
            let mut encrypted = Vec::with_capacity(bucket.len());
            for slot in bucket {
                encrypted.push(match slot {
                    Some(block) => Block {
                        key: encryptor.encrypt_point(&block.account),
                        balance: encryptor.encrypt_balance(block.balance)?,
                    },
                    None => Block {
                        key: encryptor.encrypt_zero(),
                        balance: encryptor.encrypt_zero(),
                    },
                });
            }
            buckets.push(encrypted);
        }
        let encrypted = EncryptedPvorm::from_buckets(
            &self.params,
            self.plain.depth(),
            self.plain.bucket_size(),
            self.plain.stash_size(),
            self.public_key,
            buckets,
        );
        Ok(OwnedPvorm {
            decryptor: Decryptor::for_key(&self.params, self.secret),
            params: self.params,
            secret: self.secret,
            public_key: self.public_key,
            plain: self.plain,
            encrypted,
            encryptor,
        })
    }
}

pub struct OwnedPvorm {
    params: Arc<Params>,
    secret: Scalar,
    public_key: Point,
    plain: PlainOram,
    encrypted: EncryptedPvorm,
    encryptor: Arc<Encryptor>,
    decryptor: Decryptor,
}

impl OwnedPvorm {
    pub fn public_key(&self) -> Point {
        self.public_key
    }

    pub fn depth(&self) -> u32 {
        self.plain.depth()
    }

    pub fn bucket_size(&self) -> u8 {
        self.plain.bucket_size()
    }

    pub fn stash_size(&self) -> u8 {
        self.plain.stash_size()
    }

    pub fn contains(&self, account: &Point) -> bool {
        self.plain.contains(account)
    }

    pub fn balance_of(&self, account: &Point) -> Option<i64> {
        self.plain.balance_of(account)
    }

    pub fn len(&self) -> usize {
        self.plain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty()
    }

    /// A duplicate of the encrypted half for observers.
    pub fn encrypted_snapshot(&self) -> EncryptedPvorm {
        self.encrypted.duplicate()
    }

    /// Decrypt the authoritative state (owner convenience).
    pub fn decrypt_all(
        &self,
    ) -> Result<std::collections::BTreeMap<PointKey, i64>, PvormError> {
        self.encrypted.decrypt_all(&self.secret)
    }

    /// Apply an encrypted balance change to an encrypted account key and
    /// emit the publicly verifiable update.
    pub fn update(
        &mut self,
        enc_account_key: &Cipher,
        enc_balance_change: &Cipher,
        include_range_proof: bool,
        exec: &Executor,
    ) -> Result<PvormUpdate, PvormError> {
        let account = self.decryptor.decrypt_point(enc_account_key);
        let delta = self.decryptor.decrypt_balance(enc_balance_change)?;
        let transcript = self.plain.update(&account, delta)?;

        let mut tasks: Vec<Task<DoubleSwapProof>> = Vec::new();

        // Retrieval: walk the stash and the path to the old leaf, exchanging
        // for real only where the block actually sat.
        let walk = walk_positions(
            self.plain.depth(),
            self.plain.bucket_size(),
            self.plain.stash_size(),
            transcript.old_leaf,
        );
        let pre_meta = self.perform_walk(
            &walk,
            std::slice::from_ref(&transcript.initial_position),
            &mut tasks,
        );

        // The block is in the temp slot; bind its key to the request.
        let temp = self.encrypted.block_at(TEMP_POSITION);
        let account_key_proof = PlaintextEqProof::build(
            &self.params,
            &temp.key,
            enc_account_key,
            &self.public_key,
            &self.secret,
        );

        let adjusted = Block {
            key: temp.key,
            balance: temp.balance + *enc_balance_change,
        };
        self.encrypted.set_block(TEMP_POSITION, adjusted);

        let range_proof = if include_range_proof {
            let balance = self
                .plain
                .balance_of(&account)
                .ok_or(PvormError::UnknownAccount)?;
            Some(MaxwellRangeProof::build(
                &self.params,
                &self.encryptor,
                &self.secret,
                &adjusted.balance,
                balance,
                self.params.max_balance_bits(),
                exec,
            ))
        } else {
            None
        };

        // Evictions: identical walks over the transcript's two paths.
        let mut post_meta = Vec::new();
        for eviction in &transcript.evictions {
            let walk = walk_positions(
                self.plain.depth(),
                self.plain.bucket_size(),
                self.plain.stash_size(),
                eviction.leaf,
            );
            post_meta.extend(self.perform_walk(&walk, &eviction.swaps, &mut tasks));
        }

        let proofs = exec.run_all(tasks);
        let (pre_proofs, post_proofs) = proofs.split_at(pre_meta.len());

        Ok(PvormUpdate {
            tree_depth: self.plain.depth(),
            bucket_size: self.plain.bucket_size(),
            stash_size: self.plain.stash_size(),
            public_key: self.public_key,
            pre_swaps: assemble(pre_meta, pre_proofs),
            encrypted_account_key: *enc_account_key,
            encrypted_balance_change: *enc_balance_change,
            account_key_proof,
            range_proof,
            post_swaps: assemble(post_meta, post_proofs),
        })
    }

    /// Walk `positions`, exchanging the temp slot with each slot in turn:
    /// a real exchange where `real` (ordered) says so, a fake one elsewhere.
    /// Either way both blocks are freshly reencrypted, the state advances
    /// immediately, and the proof is deferred to a task.
    fn perform_walk(
        &mut self,
        positions: &[Position],
        real: &[Position],
        tasks: &mut Vec<Task<DoubleSwapProof>>,
    ) -> Vec<(Position, Block, Block)> {
        let mut real_iter = real.iter().peekable();
        let mut out = Vec::with_capacity(positions.len());
        for &pos in positions {
            let is_real = real_iter.peek().map_or(false, |&&next| next == pos);
            if is_real {
                real_iter.next();
            }

            let temp = self.encrypted.block_at(TEMP_POSITION);
            let slot_block = self.encrypted.block_at(pos);
            let (temp_source, slot_source) = if is_real {
                (slot_block, temp)
            } else {
                (temp, slot_block)
            };

            let (new_temp_key, key1) = self.encryptor.reencrypt_opening(&temp_source.key);
            let (new_temp_balance, balance1) =
                self.encryptor.reencrypt_opening(&temp_source.balance);
            let (new_slot_key, key2) = self.encryptor.reencrypt_opening(&slot_source.key);
            let (new_slot_balance, balance2) =
                self.encryptor.reencrypt_opening(&slot_source.balance);
            let new_temp = Block {
                key: new_temp_key,
                balance: new_temp_balance,
            };
            let new_in_pvorm = Block {
                key: new_slot_key,
                balance: new_slot_balance,
            };
            self.encrypted.set_block(TEMP_POSITION, new_temp);
            self.encrypted.set_block(pos, new_in_pvorm);

            let params = Arc::clone(&self.params);
            let public_key = self.public_key;
            let randomizers = SwapRandomizers {
                key1,
                balance1,
                key2,
                balance2,
            };
            tasks.push(Box::new(move || {
                DoubleSwapProof::build(
                    &params,
                    &public_key,
                    &temp.as_pair(),
                    &slot_block.as_pair(),
                    &new_temp.as_pair(),
                    &new_in_pvorm.as_pair(),
                    &randomizers,
                    is_real,
                )
            }));
            out.push((pos, new_temp, new_in_pvorm));
        }
        debug_assert!(real_iter.next().is_none(), "unconsumed real swap position");
        out
    }
}

fn assemble(meta: Vec<(Position, Block, Block)>, proofs: &[DoubleSwapProof]) -> Vec<SwapRecord> {
    meta.into_iter()
        .zip(proofs)
        .map(|((pos, new_temp, new_in_pvorm), proof)| SwapRecord {
            bucket: pos.bucket,
            slot: pos.slot,
            new_temp,
            new_in_pvorm,
            proof: proof.clone(),
        })
        .collect()
}
