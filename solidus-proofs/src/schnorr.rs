//! Schnorr signatures over ledger artifacts.

use subtle::ConstantTimeEq;

use solidus_primitives::codec::{Codec, Decoder, Encoder};
use solidus_primitives::error::CodecError;
use solidus_primitives::group::{Point, Scalar, G};
use solidus_primitives::hash;
use solidus_primitives::params::Params;

/// A signature over an ordered list of byte blobs:
/// `c = H(blobs… ‖ k·G)`, `response = k − c·x`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchnorrSignature {
    pub challenge: Scalar,
    pub response: Scalar,
}

impl SchnorrSignature {
    pub fn sign(params: &Params, secret: &Scalar, blobs: &[&[u8]]) -> Self {
        let nonce = params.random_scalar();
        let commitment = G * nonce;
        let challenge = hash::challenge_over_data(blobs, &[commitment]);
        SchnorrSignature {
            challenge,
            response: nonce - challenge * secret,
        }
    }

    pub fn verify(&self, public_key: &Point, blobs: &[&[u8]]) -> bool {
        let commitment = G * self.response + *public_key * self.challenge;
        let expected = hash::challenge_over_data(blobs, &[commitment]);
        bool::from(expected.ct_eq(&self.challenge))
    }
}

impl Codec for SchnorrSignature {
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
