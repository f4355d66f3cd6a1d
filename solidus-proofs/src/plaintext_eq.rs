//! Plaintext-equality proofs, same-key and cross-key.

use subtle::ConstantTimeEq;

use solidus_primitives::codec::{Codec, Decoder, Encoder};
use solidus_primitives::error::CodecError;
use solidus_primitives::group::{Point, Scalar, G};
use solidus_primitives::hash;
use solidus_primitives::params::Params;
use solidus_primitives::Cipher;

/// Proves `cipher1` and `cipher2` encrypt the same message under
/// `public_key`, with the secret key as witness.
///
/// Both ciphers encrypting `m` gives `X1 − X2 = s·(Y1 − Y2)` alongside
/// `P = s·G`, a discrete-log equality. Transcript:
/// `c = H(X1, Y1, X2, Y2, P, (Y1−Y2)·e, e·G)` for a nonce `e`;
/// response `e − c·s`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaintextEqProof {
    pub challenge: Scalar,
    pub response: Scalar,
}

impl PlaintextEqProof {
    pub fn build(
        params: &Params,
        cipher1: &Cipher,
        cipher2: &Cipher,
        public_key: &Point,
        secret: &Scalar,
    ) -> Self {
        let e = params.random_scalar();
        let commit_cipher = (cipher1.y - cipher2.y) * e;
        let commit_key = G * e;
        let challenge = hash::challenge(&[
            cipher1.x,
            cipher1.y,
            cipher2.x,
            cipher2.y,
            *public_key,
            commit_cipher,
            commit_key,
        ]);
        PlaintextEqProof {
            challenge,
            response: e - challenge * secret,
        }
    }

    pub fn verify(&self, cipher1: &Cipher, cipher2: &Cipher, public_key: &Point) -> bool {
        let commit_cipher =
            (cipher1.x - cipher2.x) * self.challenge + (cipher1.y - cipher2.y) * self.response;
        let commit_key = *public_key * self.challenge + G * self.response;
        let expected = hash::challenge(&[
            cipher1.x,
            cipher1.y,
            cipher2.x,
            cipher2.y,
            *public_key,
            commit_cipher,
            commit_key,
        ]);
        bool::from(expected.ct_eq(&self.challenge))
    }
}

impl Codec for PlaintextEqProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_scalar(&self.challenge);
        enc.put_scalar(&self.response);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            challenge: dec.scalar()?,
            response: dec.scalar()?,
        })
    }
}

/// Proves `cipher1` (under `key1`) and `cipher2` (under `key2`) encrypt the
/// same value, with the value and both randomizers as witnesses.
///
/// Three nonces `(e_m, e_1, e_2)` commit to
/// `(e_m·G + e_1·K1, e_1·G, e_m·G + e_2·K2, e_2·G)`; one challenge over both
/// ciphers, both keys, and the four commitments; three responses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaintextEqDisKeyProof {
    pub challenge: Scalar,
    pub value_response: Scalar,
    pub randomizer1_response: Scalar,
    pub randomizer2_response: Scalar,
}

impl PlaintextEqDisKeyProof {
    pub fn build(
        params: &Params,
        cipher1: &Cipher,
        cipher2: &Cipher,
        key1: &Point,
        key2: &Point,
        value: &Scalar,
        randomizer1: &Scalar,
        randomizer2: &Scalar,
    ) -> Self {
        let e_m = params.random_scalar();
        let e_1 = params.random_scalar();
        let e_2 = params.random_scalar();

        let w1 = G * e_m + *key1 * e_1;
        let wy1 = G * e_1;
        let w2 = G * e_m + *key2 * e_2;
        let wy2 = G * e_2;

        let challenge = hash::challenge(&[
            cipher1.x, cipher1.y, cipher2.x, cipher2.y, *key1, *key2, w1, wy1, w2, wy2,
        ]);
        PlaintextEqDisKeyProof {
            challenge,
            value_response: e_m - challenge * value,
            randomizer1_response: e_1 - challenge * randomizer1,
            randomizer2_response: e_2 - challenge * randomizer2,
        }
    }

    pub fn verify(&self, cipher1: &Cipher, cipher2: &Cipher, key1: &Point, key2: &Point) -> bool {
        let c = self.challenge;
        let w1 = cipher1.x * c + G * self.value_response + *key1 * self.randomizer1_response;
        let wy1 = cipher1.y * c + G * self.randomizer1_response;
        let w2 = cipher2.x * c + G * self.value_response + *key2 * self.randomizer2_response;
        let wy2 = cipher2.y * c + G * self.randomizer2_response;
        let expected = hash::challenge(&[
            cipher1.x, cipher1.y, cipher2.x, cipher2.y, *key1, *key2, w1, wy1, w2, wy2,
        ]);
        bool::from(expected.ct_eq(&self.challenge))
    }
}

impl Codec for PlaintextEqDisKeyProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_scalar(&self.challenge);
        enc.put_scalar(&self.value_response);
        enc.put_scalar(&self.randomizer1_response);
        enc.put_scalar(&self.randomizer2_response);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            challenge: dec.scalar()?,
            value_response: dec.scalar()?,
            randomizer1_response: dec.scalar()?,
            randomizer2_response: dec.scalar()?,
        })
    }
}
