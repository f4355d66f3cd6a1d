//! One-of-two discrete-log OR-proof.

use subtle::ConstantTimeEq;

use solidus_primitives::codec::{Codec, Decoder, Encoder};
use solidus_primitives::error::CodecError;
use solidus_primitives::group::{Point, Scalar, G};
use solidus_primitives::hash;
use solidus_primitives::params::Params;

/// Proves knowledge of `s` with `public_key = s·G` and **either**
/// `point1 = s·base` or `point2 = s·base`, without revealing which.
///
/// Standard Cramer–Damgård–Schoenmakers composition: the live branch runs a
/// real Σ-protocol, the other is simulated from a random challenge/response
/// pair, and the two branch challenges must sum to
/// `H(base, public_key, point1, point2, w1g, w1b, w2g, w2b)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneOfTwoDlogProof {
    pub challenge1: Scalar,
    pub challenge2: Scalar,
    pub response1: Scalar,
    pub response2: Scalar,
}

impl OneOfTwoDlogProof {
    pub fn build(
        params: &Params,
        base: &Point,
        public_key: &Point,
        point1: &Point,
        point2: &Point,
        secret: &Scalar,
        first_is_real: bool,
    ) -> Self {
        let nonce = params.random_scalar();
        let sim_challenge = params.random_scalar();
        let sim_response = params.random_scalar();

        let real_g = G * nonce;
        let real_b = *base * nonce;
        let sim_point = if first_is_real { point2 } else { point1 };
        let sim_g = *public_key * sim_challenge + G * sim_response;
        let sim_b = *sim_point * sim_challenge + *base * sim_response;

        let (w1g, w1b, w2g, w2b) = if first_is_real {
            (real_g, real_b, sim_g, sim_b)
        } else {
            (sim_g, sim_b, real_g, real_b)
        };
        let combined =
            hash::challenge(&[*base, *public_key, *point1, *point2, w1g, w1b, w2g, w2b]);
        let real_challenge = combined - sim_challenge;
        let real_response = nonce - real_challenge * secret;

        if first_is_real {
            OneOfTwoDlogProof {
                challenge1: real_challenge,
                challenge2: sim_challenge,
                response1: real_response,
                response2: sim_response,
            }
        } else {
            OneOfTwoDlogProof {
                challenge1: sim_challenge,
                challenge2: real_challenge,
                response1: sim_response,
                response2: real_response,
            }
        }
    }

    pub fn verify(&self, base: &Point, public_key: &Point, point1: &Point, point2: &Point) -> bool {
        let w1g = *public_key * self.challenge1 + G * self.response1;
        let w1b = *point1 * self.challenge1 + *base * self.response1;
        let w2g = *public_key * self.challenge2 + G * self.response2;
        let w2b = *point2 * self.challenge2 + *base * self.response2;
        let combined =
            hash::challenge(&[*base, *public_key, *point1, *point2, w1g, w1b, w2g, w2b]);
        bool::from((self.challenge1 + self.challenge2).ct_eq(&combined))
    }
}

impl Codec for OneOfTwoDlogProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_scalar(&self.challenge1);
        enc.put_scalar(&self.challenge2);
        enc.put_scalar(&self.response1);
        enc.put_scalar(&self.response2);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            challenge1: dec.scalar()?,
            challenge2: dec.scalar()?,
            response1: dec.scalar()?,
            response2: dec.scalar()?,
        })
    }
}
