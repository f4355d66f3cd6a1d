//! secp256k1 points and scalars with canonical encodings.
//!
//! All ciphertexts and proof transcripts are built from [`Point`]s in the
//! curve's prime-order group (including the identity) and [`Scalar`]s modulo
//! its order. Serialization normalizes to affine SEC1 bytes so that every
//! party hashes identical transcripts.

use k256::{
    elliptic_curve::{
        group::Group,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Field, PrimeField,
    },
    EncodedPoint, ProjectivePoint,
};
use rand::RngCore;

use crate::error::CryptoError;

pub type Point = ProjectivePoint;
pub type Scalar = k256::Scalar;

/// The fixed group generator.
pub const G: Point = ProjectivePoint::GENERATOR;

/// Which SEC1 form a serialization uses. Challenge hashing always consumes
/// the compressed form regardless of this flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointEncoding {
    Compressed,
    Uncompressed,
}

pub fn is_identity(p: &Point) -> bool {
    bool::from(p.is_identity())
}

/// Uniform scalar in `[1, N)` by rejection sampling.
pub fn random_scalar<R: RngCore>(rng: &mut R) -> Scalar {
    loop {
        let mut repr = k256::FieldBytes::default();
        rng.fill_bytes(repr.as_mut_slice());
        if let Some(s) = Option::<Scalar>::from(Scalar::from_repr(repr)) {
            if !bool::from(s.is_zero()) {
                return s;
            }
        }
    }
}

/// `v·G` for a signed value.
pub fn value_point(v: i64) -> Point {
    let p = G * Scalar::from(v.unsigned_abs());
    if v < 0 {
        -p
    } else {
        p
    }
}

/// Canonical compressed encoding; the identity encodes as the single byte 0.
pub fn compress(p: &Point) -> Vec<u8> {
    p.to_affine().to_encoded_point(true).as_bytes().to_vec()
}

pub fn encode_point(p: &Point, encoding: PointEncoding) -> Vec<u8> {
    let compress = matches!(encoding, PointEncoding::Compressed);
    p.to_affine().to_encoded_point(compress).as_bytes().to_vec()
}

pub fn decode_point(bytes: &[u8]) -> Result<Point, CryptoError> {
    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| CryptoError::InvalidPoint)?;
    Option::<Point>::from(Point::from_encoded_point(&encoded)).ok_or(CryptoError::InvalidPoint)
}

/// A point's canonical compressed bytes, usable as a map/set key. Account
/// registries and the encryptor cache are keyed this way.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PointKey(Vec<u8>);

impl PointKey {
    pub fn new(p: &Point) -> Self {
        Self(compress(p))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
