//! Maxwell-style range proof by bit decomposition.

use std::sync::Arc;

use solidus_primitives::codec::{Codec, Decoder, Encoder};
use solidus_primitives::error::CodecError;
use solidus_primitives::exec::{Executor, Task};
use solidus_primitives::group::{Point, Scalar, G};
use solidus_primitives::params::Params;
use solidus_primitives::{Cipher, Encryptor};

use crate::one_of_two::OneOfTwoDlogProof;
use crate::plaintext_eq::PlaintextEqProof;

/// Upper bound on provable widths; the balance range of any deployment is
/// far below this.
pub const MAX_RANGE_BITS: u32 = 63;

/// Proves a cipher encrypts `v ∈ [0, 2^t)` under `public_key`.
///
/// The prover encrypts each of the `t` bits, shows each bit cipher encrypts
/// 0 or 1 with a [`OneOfTwoDlogProof`], and ties the power-of-two weighted
/// sum of the bit ciphers to the balance cipher with a [`PlaintextEqProof`].
/// Per-bit proofs are independent and run on the executor.
///
/// Building never fails: a value outside the range encodes only its low `t`
/// bits, and the sum proof then refuses to verify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaxwellRangeProof {
    pub bit_ciphers: Vec<Cipher>,
    pub bit_proofs: Vec<OneOfTwoDlogProof>,
    pub sum_proof: PlaintextEqProof,
}

/// The OR-proof inputs for one bit cipher: witness `r` with `Y = r·G` and
/// either `X = r·P` (bit 0) or `X − G = r·P` (bit 1).
fn bit_statement(cipher: &Cipher, public_key: &Point) -> (Point, Point, Point, Point) {
    (*public_key, cipher.y, cipher.x, cipher.x - G)
}

impl MaxwellRangeProof {
    pub fn build(
        params: &Arc<Params>,
        encryptor: &Encryptor,
        secret: &Scalar,
        balance_cipher: &Cipher,
        value: i64,
        max_bits: u32,
        exec: &Executor,
    ) -> Self {
        let max_bits = max_bits.min(MAX_RANGE_BITS);
        let public_key = encryptor.public_key();
        let raw = value as u64;

        let mut bit_ciphers = Vec::with_capacity(max_bits as usize);
        let mut tasks: Vec<Task<OneOfTwoDlogProof>> = Vec::with_capacity(max_bits as usize);
        for i in 0..max_bits {
            let bit = (raw >> i) & 1 == 1;
            let zero = encryptor.zero_opening();
            let cipher = Cipher {
                x: if bit { G + zero.cipher.x } else { zero.cipher.x },
                y: zero.cipher.y,
            };
            bit_ciphers.push(cipher);

            let params = Arc::clone(params);
            let randomizer = zero.randomizer;
            tasks.push(Box::new(move || {
                let (base, key, point1, point2) = bit_statement(&cipher, &public_key);
                OneOfTwoDlogProof::build(&params, &base, &key, &point1, &point2, &randomizer, !bit)
            }));
        }
        let bit_proofs = exec.run_all(tasks);

        let sum_cipher = weighted_sum(&bit_ciphers);
        let sum_proof =
            PlaintextEqProof::build(params, balance_cipher, &sum_cipher, &public_key, secret);

        MaxwellRangeProof {
            bit_ciphers,
            bit_proofs,
            sum_proof,
        }
    }

    pub fn verify(
        &self,
        balance_cipher: &Cipher,
        public_key: &Point,
        max_bits: u32,
        exec: &Executor,
    ) -> bool {
        let results = exec.run_all(self.verify_tasks(*balance_cipher, *public_key, max_bits));
        results.into_iter().all(|ok| ok)
    }

    /// The independent verification units, for callers that schedule them
    /// alongside other proof work.
    pub fn verify_tasks(
        &self,
        balance_cipher: Cipher,
        public_key: Point,
        max_bits: u32,
    ) -> Vec<Task<bool>> {
        let expected = max_bits.min(MAX_RANGE_BITS) as usize;
        if self.bit_ciphers.len() != expected || self.bit_proofs.len() != expected {
            return vec![Box::new(|| false)];
        }

        let mut tasks: Vec<Task<bool>> = Vec::with_capacity(expected + 1);
        for (cipher, proof) in self.bit_ciphers.iter().zip(&self.bit_proofs) {
            let cipher = *cipher;
            let proof = proof.clone();
            tasks.push(Box::new(move || {
                let (base, key, point1, point2) = bit_statement(&cipher, &public_key);
                proof.verify(&base, &key, &point1, &point2)
            }));
        }

        let sum_cipher = weighted_sum(&self.bit_ciphers);
        let sum_proof = self.sum_proof.clone();
        tasks.push(Box::new(move || {
            sum_proof.verify(&balance_cipher, &sum_cipher, &public_key)
        }));
        tasks
    }
}

fn weighted_sum(bit_ciphers: &[Cipher]) -> Cipher {
    let mut sum = Cipher::identity();
    for (i, cipher) in bit_ciphers.iter().enumerate() {
        sum = sum + cipher.scale(&Scalar::from(1u64 << i));
    }
    sum
}

impl Codec for MaxwellRangeProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u32(self.bit_ciphers.len() as u32);
        for (cipher, proof) in self.bit_ciphers.iter().zip(&self.bit_proofs) {
            enc.put_pair(cipher);
            proof.encode(enc);
        }
        self.sum_proof.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let count = dec.u32()?;
        if count > MAX_RANGE_BITS {
            return Err(CodecError::MalformedInput("range proof too wide"));
        }
        let mut bit_ciphers = Vec::with_capacity(count as usize);
        let mut bit_proofs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            bit_ciphers.push(dec.pair()?);
            bit_proofs.push(OneOfTwoDlogProof::decode(dec)?);
        }
        Ok(Self {
            bit_ciphers,
            bit_proofs,
            sum_proof: PlaintextEqProof::decode(dec)?,
        })
    }
}
