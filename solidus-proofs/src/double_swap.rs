//! The double-swap proof behind every oblivious slot update.
//!
//! A PVORM swap replaces the temp block and one in-tree block with fresh
//! ciphertexts. The proof shows the new pair reencrypts the old pair either
//! straight (`post1 ← pre1, post2 ← pre2`) or crossed
//! (`post1 ← pre2, post2 ← pre1`) — the two outcomes are indistinguishable,
//! which is exactly the property the ORAM's access pattern hiding rests on.
//!
//! Construction: challenges
//! `(e1, e2, e3) = H_multi({0,1,2}, 16 block points ‖ P)` compress the eight
//! per-cipher reencryption conditions of each ordering into a single
//! discrete-log equality (`Δ_P = σ·P ∧ Δ_G = σ·G` with
//! `σ = e1·ρ_key1 + e2·ρ_bal1 + e3·(e1·ρ_key2 + e2·ρ_bal2)`), and a CDS OR
//! over the straight and crossed statements finishes the job with final
//! challenge `H_3(16 points ‖ P ‖ 4 commitments)`.

use subtle::ConstantTimeEq;

use solidus_primitives::codec::{Codec, Decoder, Encoder};
use solidus_primitives::error::CodecError;
use solidus_primitives::group::{Point, Scalar, G};
use solidus_primitives::hash;
use solidus_primitives::params::Params;
use solidus_primitives::Cipher;

/// A ciphertext pair as the swap proof sees it: `(enc_key, enc_balance)`.
pub type CipherPair = (Cipher, Cipher);

/// The reencryption randomizers behind `post1` and `post2`. `post1` always
/// reencrypts its source (pre1 when straight, pre2 when swapped) with
/// `(key1, balance1)`, and `post2` the other source with `(key2, balance2)`.
#[derive(Clone, Copy, Debug)]
pub struct SwapRandomizers {
    pub key1: Scalar,
    pub balance1: Scalar,
    pub key2: Scalar,
    pub balance2: Scalar,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoubleSwapProof {
    pub straight_challenge: Scalar,
    pub crossed_challenge: Scalar,
    pub straight_response: Scalar,
    pub crossed_response: Scalar,
}

/// All sixteen coordinates in transcript order.
fn transcript_points(
    pre1: &CipherPair,
    pre2: &CipherPair,
    post1: &CipherPair,
    post2: &CipherPair,
    public_key: &Point,
) -> Vec<Point> {
    let mut points = Vec::with_capacity(17);
    for pair in [pre1, pre2, post1, post2] {
        points.extend_from_slice(&[pair.0.x, pair.0.y, pair.1.x, pair.1.y]);
    }
    points.push(*public_key);
    points
}

/// The compressed difference statement for one ordering: `from1 → to1`,
/// `from2 → to2`. Returns `(Δ_P, Δ_G)`, both equal to `σ·P` / `σ·G` exactly
/// when the ordering is a genuine componentwise reencryption.
fn compressed_statement(
    from1: &CipherPair,
    to1: &CipherPair,
    from2: &CipherPair,
    to2: &CipherPair,
    e1: &Scalar,
    e2: &Scalar,
    e3: &Scalar,
) -> (Point, Point) {
    let first_p = (to1.0.x - from1.0.x) * *e1 + (to1.1.x - from1.1.x) * *e2;
    let first_g = (to1.0.y - from1.0.y) * *e1 + (to1.1.y - from1.1.y) * *e2;
    let second_p = (to2.0.x - from2.0.x) * *e1 + (to2.1.x - from2.1.x) * *e2;
    let second_g = (to2.0.y - from2.0.y) * *e1 + (to2.1.y - from2.1.y) * *e2;
    (first_p + second_p * *e3, first_g + second_g * *e3)
}

impl DoubleSwapProof {
    /// Build a proof that `(post1, post2)` reencrypts `(pre1, pre2)`.
    /// `swapped = false` claims the straight ordering, `swapped = true` the
    /// crossed one; `randomizers` must open the claimed ordering or the
    /// proof will not verify.
    pub fn build(
        params: &Params,
        public_key: &Point,
        pre1: &CipherPair,
        pre2: &CipherPair,
        post1: &CipherPair,
        post2: &CipherPair,
        randomizers: &SwapRandomizers,
        swapped: bool,
    ) -> Self {
        let points = transcript_points(pre1, pre2, post1, post2, public_key);
        let challenges = hash::challenge_multi(&[0, 1, 2], &points);
        let (e1, e2, e3) = (challenges[0], challenges[1], challenges[2]);

        let straight = compressed_statement(pre1, post1, pre2, post2, &e1, &e2, &e3);
        let crossed = compressed_statement(pre2, post1, pre1, post2, &e1, &e2, &e3);

        let sigma =
            e1 * randomizers.key1 + e2 * randomizers.balance1 + e3 * (e1 * randomizers.key2 + e2 * randomizers.balance2);

        let nonce = params.random_scalar();
        let sim_challenge = params.random_scalar();
        let sim_response = params.random_scalar();

        let real_p = *public_key * nonce;
        let real_g = G * nonce;
        let sim_statement = if swapped { straight } else { crossed };
        let sim_p = sim_statement.0 * sim_challenge + *public_key * sim_response;
        let sim_g = sim_statement.1 * sim_challenge + G * sim_response;

        let (ws_p, ws_g, wc_p, wc_g) = if swapped {
            (sim_p, sim_g, real_p, real_g)
        } else {
            (real_p, real_g, sim_p, sim_g)
        };

        let mut final_points = points;
        final_points.extend_from_slice(&[ws_p, ws_g, wc_p, wc_g]);
        let combined = hash::challenge_indexed(3, &final_points);
        let real_challenge = combined - sim_challenge;
        let real_response = nonce - real_challenge * sigma;

        if swapped {
            DoubleSwapProof {
                straight_challenge: sim_challenge,
                crossed_challenge: real_challenge,
                straight_response: sim_response,
                crossed_response: real_response,
            }
        } else {
            DoubleSwapProof {
                straight_challenge: real_challenge,
                crossed_challenge: sim_challenge,
                straight_response: real_response,
                crossed_response: sim_response,
            }
        }
    }

    pub fn verify(
        &self,
        public_key: &Point,
        pre1: &CipherPair,
        pre2: &CipherPair,
        post1: &CipherPair,
        post2: &CipherPair,
    ) -> bool {
        let points = transcript_points(pre1, pre2, post1, post2, public_key);
        let challenges = hash::challenge_multi(&[0, 1, 2], &points);
        let (e1, e2, e3) = (challenges[0], challenges[1], challenges[2]);

        let straight = compressed_statement(pre1, post1, pre2, post2, &e1, &e2, &e3);
        let crossed = compressed_statement(pre2, post1, pre1, post2, &e1, &e2, &e3);

        let ws_p = straight.0 * self.straight_challenge + *public_key * self.straight_response;
        let ws_g = straight.1 * self.straight_challenge + G * self.straight_response;
        let wc_p = crossed.0 * self.crossed_challenge + *public_key * self.crossed_response;
        let wc_g = crossed.1 * self.crossed_challenge + G * self.crossed_response;

        let mut final_points = points;
        final_points.extend_from_slice(&[ws_p, ws_g, wc_p, wc_g]);
        let combined = hash::challenge_indexed(3, &final_points);
        bool::from(
            (self.straight_challenge + self.crossed_challenge).ct_eq(&combined),
        )
    }
}

impl Codec for DoubleSwapProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_scalar(&self.straight_challenge);
        enc.put_scalar(&self.crossed_challenge);
        enc.put_scalar(&self.straight_response);
        enc.put_scalar(&self.crossed_response);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            straight_challenge: dec.scalar()?,
            crossed_challenge: dec.scalar()?,
            straight_response: dec.scalar()?,
            crossed_response: dec.scalar()?,
        })
    }
}
