//! The plaintext circuit-ORAM.
//!
//! Deterministic three-phase eviction (prepare-deepest, prepare-target,
//! evict-once) over paths chosen by the bit-reversal counter. The only thing
//! the outside world ever sees of this structure is the ordered list of swap
//! positions in an [`UpdateTranscript`]; the encrypted PVORM replays those
//! positions slot for slot, so every choice here — including tie-breaks —
//! must be a deterministic function of the state.

use std::collections::HashMap;
use std::sync::Arc;

use solidus_primitives::group::{Point, PointKey};
use solidus_primitives::params::Params;

use crate::error::PvormError;
use crate::layout::{
    self, eviction_leaves, leaf_count, path_bucket, shared_depth, Position, STASH_BUCKET,
    TEMP_BUCKET,
};

#[derive(Clone, Copy, Debug)]
pub struct PlainBlock {
    pub account: Point,
    pub balance: i64,
    pub leaf: u32,
}

/// One path eviction: the target leaf and the positions where the walk
/// actually exchanged the hold register with a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvictionRecord {
    pub leaf: u32,
    pub swaps: Vec<Position>,
}

/// Everything the encrypted side needs to mirror one plaintext update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateTranscript {
    pub old_leaf: u32,
    pub new_leaf: u32,
    /// Where the block sat before it was staged into the temp slot.
    pub initial_position: Position,
    pub evictions: Vec<EvictionRecord>,
}

pub struct PlainOram {
    params: Arc<Params>,
    depth: u32,
    bucket_size: u8,
    stash_size: u8,
    buckets: Vec<Vec<Option<PlainBlock>>>,
    positions: HashMap<PointKey, Position>,
    evict_ctr: u32,
}

impl PlainOram {
    pub fn new(
        params: &Arc<Params>,
        depth: u32,
        bucket_size: u8,
        stash_size: u8,
    ) -> Result<Self, PvormError> {
        if depth == 0 || depth > 20 {
            return Err(PvormError::Config("tree depth must be in 1..=20"));
        }
        if bucket_size == 0 {
            return Err(PvormError::Config("bucket size must be nonzero"));
        }
        if stash_size == 0 {
            return Err(PvormError::Config("stash size must be nonzero"));
        }
        let mut buckets = Vec::with_capacity(layout::bucket_count(depth) as usize);
        buckets.push(vec![None; 1]);
        buckets.push(vec![None; stash_size as usize]);
        for _ in 2..layout::bucket_count(depth) {
            buckets.push(vec![None; bucket_size as usize]);
        }
        Ok(Self {
            params: Arc::clone(params),
            depth,
            bucket_size,
            stash_size,
            buckets,
            positions: HashMap::new(),
            evict_ctr: 0,
        })
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

    /// One block per leaf at most.
    pub fn capacity(&self) -> u32 {
        leaf_count(self.depth)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, account: &Point) -> bool {
        self.positions.contains_key(&PointKey::new(account))
    }

    pub fn balance_of(&self, account: &Point) -> Option<i64> {
        let pos = self.positions.get(&PointKey::new(account))?;
        self.block(*pos).map(|b| b.balance)
    }

    pub(crate) fn buckets(&self) -> &[Vec<Option<PlainBlock>>] {
        &self.buckets
    }

    fn block(&self, pos: Position) -> Option<&PlainBlock> {
        self.buckets[pos.bucket as usize][pos.slot as usize].as_ref()
    }

    fn set_position(&mut self, account: &Point, pos: Position) {
        self.positions.insert(PointKey::new(account), pos);
    }

    /// Build-time only: stage a new block in the temp slot and evict it into
    /// the tree. The temp slot is empty again afterwards.
    pub fn insert(&mut self, account: Point, balance: i64) -> Result<(), PvormError> {
        if balance < 0 {
            return Err(PvormError::Config("insert requires a nonnegative balance"));
        }
        let key = PointKey::new(&account);
        if self.positions.contains_key(&key) {
            return Err(PvormError::AccountExists);
        }
        if self.positions.len() as u32 >= self.capacity() {
            return Err(PvormError::CapacityExceeded);
        }
        let leaf = self.params.random_index(leaf_count(self.depth));
        self.buckets[TEMP_BUCKET as usize][0] = Some(PlainBlock {
            account,
            balance,
            leaf,
        });
        self.positions.insert(
            key,
            Position {
                bucket: TEMP_BUCKET,
                slot: 0,
            },
        );
        self.evict_pair()?;
        debug_assert!(self.buckets[TEMP_BUCKET as usize][0].is_none());
        Ok(())
    }

    /// Apply a signed balance delta: stage the block in the temp slot under a
    /// fresh random leaf, run the double eviction, and report the transcript
    /// that drives the encrypted mirror.
    pub fn update(&mut self, account: &Point, delta: i64) -> Result<UpdateTranscript, PvormError> {
        let key = PointKey::new(account);
        let initial_position = *self.positions.get(&key).ok_or(PvormError::UnknownAccount)?;
        let mut block = self.buckets[initial_position.bucket as usize]
            [initial_position.slot as usize]
            .take()
            .expect("position map points at a live block");

        let old_leaf = block.leaf;
        let new_leaf = self.params.random_index(leaf_count(self.depth));
        block.balance += delta;
        block.leaf = new_leaf;
        self.buckets[TEMP_BUCKET as usize][0] = Some(block);
        self.positions.insert(
            key,
            Position {
                bucket: TEMP_BUCKET,
                slot: 0,
            },
        );

        let evictions = self.evict_pair()?;
        debug_assert!(self.buckets[TEMP_BUCKET as usize][0].is_none());
        Ok(UpdateTranscript {
            old_leaf,
            new_leaf,
            initial_position,
            evictions,
        })
    }

    /// Two path evictions on non-overlapping paths.
    fn evict_pair(&mut self) -> Result<Vec<EvictionRecord>, PvormError> {
        let (leaf_a, leaf_b) = eviction_leaves(self.evict_ctr, self.depth);
        self.evict_ctr = (self.evict_ctr + 1) % (leaf_count(self.depth) / 2).max(1);
        Ok(vec![self.evict_path(leaf_a)?, self.evict_path(leaf_b)?])
    }

    fn evict_path(&mut self, leaf: u32) -> Result<EvictionRecord, PvormError> {
        let depth = self.depth as usize;
        let path: Vec<u32> = (1..=self.depth)
            .map(|level| path_bucket(leaf, self.depth, level))
            .collect();

        // Deepest-eligible block per level; first encountered wins ties, and
        // level 0 scans the temp slot before the stash. The encrypted side
        // replays the resulting positions verbatim, so this order is fixed.
        let mut best: Vec<Option<(Position, u32)>> = vec![None; depth + 1];
        for (bucket, limit) in [(TEMP_BUCKET, 1), (STASH_BUCKET, self.stash_size)] {
            for slot in 0..limit {
                if let Some(block) = &self.buckets[bucket as usize][slot as usize] {
                    let goal = shared_depth(block.leaf, leaf, self.depth);
                    if best[0].map_or(true, |(_, g)| goal > g) {
                        best[0] = Some((Position { bucket, slot }, goal));
                    }
                }
            }
        }
        for (idx, &bucket) in path.iter().enumerate() {
            let level = idx + 1;
            for slot in 0..self.bucket_size {
                if let Some(block) = &self.buckets[bucket as usize][slot as usize] {
                    let goal = shared_depth(block.leaf, leaf, self.depth);
                    if best[level].map_or(true, |(_, g)| goal > g) {
                        best[level] = Some((Position { bucket, slot }, goal));
                    }
                }
            }
        }

        // PrepareDeepest: deepest[i] is the nearest level above i holding a
        // block that can legally sink to level i or beyond.
        let mut deepest: Vec<Option<usize>> = vec![None; depth + 1];
        let mut src: Option<usize> = None;
        let mut goal: i64 = -1;
        if let Some((_, g)) = best[0] {
            src = Some(0);
            goal = g as i64;
        }
        for level in 1..=depth {
            if goal >= level as i64 {
                deepest[level] = src;
            }
            if let Some((_, g)) = best[level] {
                if g as i64 > goal {
                    goal = g as i64;
                    src = Some(level);
                }
            }
        }

        // PrepareTarget: walk back up, assigning each scheduled source the
        // deepest open destination on its path.
        let mut target: Vec<Option<usize>> = vec![None; depth + 1];
        let mut dest: Option<usize> = None;
        let mut pick_src: Option<usize> = None;
        for level in (0..=depth).rev() {
            if pick_src == Some(level) {
                target[level] = dest;
                dest = None;
                pick_src = None;
            }
            let has_room = level > 0
                && self.buckets[path[level - 1] as usize]
                    .iter()
                    .any(|slot| slot.is_none());
            if ((dest.is_none() && has_room) || target[level].is_some())
                && deepest[level].is_some()
            {
                pick_src = deepest[level];
                dest = Some(level);
            }
        }

        // EvictOnceFast, with the temp slot as the hold register. A recorded
        // position means "exchange the hold register with this slot".
        let mut swaps: Vec<Position> = Vec::new();
        let mut hold: Option<PlainBlock> = None;
        let mut hold_dest: Option<usize> = None;

        let staged = self.buckets[TEMP_BUCKET as usize][0].take();
        if let Some(t0) = target[0] {
            let (pos, _) = best[0].expect("scheduled pick has a candidate");
            if pos.bucket == TEMP_BUCKET {
                // The staged block itself sinks; it is already in the hold
                // register, so no exchange happens at level 0.
                hold = staged;
            } else {
                let picked = self.buckets[STASH_BUCKET as usize][pos.slot as usize].take();
                if let Some(staged_block) = staged {
                    self.set_position(&staged_block.account, pos);
                    self.buckets[STASH_BUCKET as usize][pos.slot as usize] = Some(staged_block);
                }
                hold = picked;
                if let Some(block) = &hold {
                    let account = block.account;
                    self.set_position(
                        &account,
                        Position {
                            bucket: TEMP_BUCKET,
                            slot: 0,
                        },
                    );
                }
                swaps.push(pos);
            }
            hold_dest = Some(t0);
        } else if let Some(staged_block) = staged {
            // No pick frees a slot, so the staged block needs an empty one.
            let empty = (0..self.stash_size)
                .find(|&slot| self.buckets[STASH_BUCKET as usize][slot as usize].is_none());
            let Some(slot) = empty else {
                self.buckets[TEMP_BUCKET as usize][0] = Some(staged_block);
                tracing::error!(
                    depth = self.depth,
                    bucket_size = self.bucket_size,
                    stash_size = self.stash_size,
                    "stash overflow during eviction"
                );
                return Err(PvormError::StashOverflow);
            };
            let pos = Position {
                bucket: STASH_BUCKET,
                slot,
            };
            self.set_position(&staged_block.account, pos);
            self.buckets[STASH_BUCKET as usize][slot as usize] = Some(staged_block);
            swaps.push(pos);
        }

        for level in 1..=depth {
            let bucket = path[level - 1];
            let incoming = hold.is_some() && hold_dest == Some(level);
            let picking = target[level].is_some();

            if incoming && picking {
                // Drop into the slot the pick vacates: one exchange does both.
                let (pos, _) = best[level].expect("scheduled pick has a candidate");
                let picked = self.buckets[bucket as usize][pos.slot as usize].take();
                let dropped = hold.take().expect("incoming hold");
                self.set_position(&dropped.account, pos);
                self.buckets[bucket as usize][pos.slot as usize] = Some(dropped);
                hold = picked;
                if let Some(block) = &hold {
                    let account = block.account;
                    self.set_position(
                        &account,
                        Position {
                            bucket: TEMP_BUCKET,
                            slot: 0,
                        },
                    );
                }
                hold_dest = target[level];
                swaps.push(pos);
            } else if incoming {
                let dropped = hold.take().expect("incoming hold");
                let slot = (0..self.bucket_size)
                    .find(|&slot| self.buckets[bucket as usize][slot as usize].is_none())
                    .ok_or(PvormError::Config("scheduled bucket has no room"))?;
                let pos = Position { bucket, slot };
                self.set_position(&dropped.account, pos);
                self.buckets[bucket as usize][slot as usize] = Some(dropped);
                hold_dest = None;
                swaps.push(pos);
            } else if picking {
                let (pos, _) = best[level].expect("scheduled pick has a candidate");
                let picked = self.buckets[bucket as usize][pos.slot as usize].take();
                hold = picked;
                if let Some(block) = &hold {
                    let account = block.account;
                    self.set_position(
                        &account,
                        Position {
                            bucket: TEMP_BUCKET,
                            slot: 0,
                        },
                    );
                }
                hold_dest = target[level];
                swaps.push(pos);
            }
        }
        debug_assert!(hold.is_none(), "eviction ended with a held block");
        Ok(EvictionRecord { leaf, swaps })
    }

    /// Every block is live, mapped, and either stashed or on its leaf path;
    /// the temp slot is empty.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert!(self.buckets[TEMP_BUCKET as usize][0].is_none());
        let mut seen = 0usize;
        for (bucket_idx, bucket) in self.buckets.iter().enumerate() {
            for (slot_idx, slot) in bucket.iter().enumerate() {
                let Some(block) = slot else { continue };
                seen += 1;
                let pos = self.positions[&PointKey::new(&block.account)];
                assert_eq!(
                    (pos.bucket as usize, pos.slot as usize),
                    (bucket_idx, slot_idx)
                );
                if pos.bucket >= 2 {
                    let level = 32 - (pos.bucket.leading_zeros() + 1);
                    assert_eq!(
                        path_bucket(block.leaf, self.depth, level),
                        pos.bucket,
                        "block off its leaf path"
                    );
                }
            }
        }
        assert_eq!(seen, self.positions.len());
    }
}
