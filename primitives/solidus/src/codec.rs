//! Byte-exact serialization.
//!
//! Verifiers rebuild challenge transcripts from these bytes, so the format
//! is fixed and self-describing with no framing:
//!
//! - `u32`/`u64`: big-endian, fixed width
//! - scalar: length byte (1..=255) + two's-complement big-endian bytes
//! - point: length byte + SEC1 bytes per the encoder's [`PointEncoding`];
//!   length 0 encodes the identity
//! - pair: two points, same flag
//! - bool: one byte, 0 or 1
//! - string: UTF-8 bytes terminated by a single 0x00
//!
//! Top-level ledger messages prefix the header
//! `version || curve_name || hash_name || transaction_timeout_ms`;
//! [`read_message`] rejects any deviation with [`CodecError::VersionMismatch`].

use k256::elliptic_curve::PrimeField;

use crate::elgamal::Cipher;
use crate::error::CodecError;
use crate::group::{decode_point, encode_point, Point, PointEncoding, Scalar};
use crate::params::Params;

/// Wire format version for all top-level messages.
pub const WIRE_VERSION: u32 = 1;

/// A value with a fixed wire image.
pub trait Codec: Sized {
    fn encode(&self, enc: &mut Encoder);
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError>;
}

pub struct Encoder {
    buf: Vec<u8>,
    encoding: PointEncoding,
}

impl Encoder {
    pub fn new(encoding: PointEncoding) -> Self {
        Self {
            buf: Vec::new(),
            encoding,
        }
    }

    pub fn compressed() -> Self {
        Self::new(PointEncoding::Compressed)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn put_scalar(&mut self, s: &Scalar) {
        let repr = s.to_repr();
        let bytes = repr.as_slice();
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        let magnitude = &bytes[start..];
        // Two's complement of a nonnegative value: pad with a sign byte when
        // the top bit is set; zero is the single byte 0x00.
        if magnitude.is_empty() {
            self.buf.extend_from_slice(&[1, 0]);
        } else if magnitude[0] & 0x80 != 0 {
            self.buf.push(magnitude.len() as u8 + 1);
            self.buf.push(0);
            self.buf.extend_from_slice(magnitude);
        } else {
            self.buf.push(magnitude.len() as u8);
            self.buf.extend_from_slice(magnitude);
        }
    }

    pub fn put_point(&mut self, p: &Point) {
        if crate::group::is_identity(p) {
            self.buf.push(0);
            return;
        }
        let bytes = encode_point(p, self.encoding);
        self.buf.push(bytes.len() as u8);
        self.buf.extend_from_slice(&bytes);
    }

    pub fn put_pair(&mut self, c: &Cipher) {
        self.put_point(&c.x);
        self.put_point(&c.y);
    }

    pub fn put_string(&mut self, s: &str) {
        debug_assert!(!s.as_bytes().contains(&0), "strings are NUL-terminated");
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }
}

pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Fails with [`CodecError::TrailingBytes`] if input remains.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes)
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.buf.len() - self.pos < n {
            return Err(CodecError::MalformedInput("truncated stream"));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn bool(&mut self) -> Result<bool, CodecError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::MalformedInput("boolean byte not 0 or 1")),
        }
    }

    pub fn scalar(&mut self) -> Result<Scalar, CodecError> {
        let len = self.u8()? as usize;
        if len == 0 || len > 33 {
            return Err(CodecError::MalformedInput("scalar length out of range"));
        }
        let raw = self.take(len)?;
        if raw[0] & 0x80 != 0 {
            return Err(CodecError::MalformedInput("negative scalar"));
        }
        // Only the minimal encoding round-trips: a leading zero is valid
        // solely as the sign byte of a magnitude with its top bit set.
        let magnitude = if raw[0] == 0 && raw.len() > 1 {
            if raw[1] & 0x80 == 0 {
                return Err(CodecError::MalformedInput("non-minimal scalar"));
            }
            &raw[1..]
        } else {
            raw
        };
        if magnitude.len() > 32 {
            return Err(CodecError::MalformedInput("scalar magnitude too wide"));
        }
        let mut repr = [0u8; 32];
        repr[32 - magnitude.len()..].copy_from_slice(magnitude);
        Option::<Scalar>::from(Scalar::from_repr(repr.into()))
            .ok_or(CodecError::MalformedInput("scalar not in field"))
    }

    pub fn point(&mut self) -> Result<Point, CodecError> {
        let len = self.u8()? as usize;
        if len == 0 {
            return Ok(Point::IDENTITY);
        }
        let bytes = self.take(len)?;
        decode_point(bytes).map_err(|_| CodecError::InvalidPoint)
    }

    pub fn pair(&mut self) -> Result<Cipher, CodecError> {
        Ok(Cipher {
            x: self.point()?,
            y: self.point()?,
        })
    }

    pub fn string(&mut self) -> Result<String, CodecError> {
        let rest = &self.buf[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::MalformedInput("unterminated string"))?;
        let s = std::str::from_utf8(&rest[..nul])
            .map_err(|_| CodecError::MalformedInput("string not UTF-8"))?
            .to_owned();
        self.pos += nul + 1;
        Ok(s)
    }
}

/// An encoder pre-loaded with the top-level deployment header.
pub fn message_encoder(params: &Params, encoding: PointEncoding) -> Encoder {
    let mut enc = Encoder::new(encoding);
    enc.put_u32(WIRE_VERSION);
    enc.put_string(params.curve_name());
    enc.put_string(params.hash_name());
    enc.put_u64(params.transaction_timeout_ms());
    enc
}

/// A decoder positioned after a byte-compared deployment header.
pub fn open_message<'a>(params: &Params, bytes: &'a [u8]) -> Result<Decoder<'a>, CodecError> {
    let mut dec = Decoder::new(bytes);
    if dec.u32()? != WIRE_VERSION {
        return Err(CodecError::VersionMismatch("wire version"));
    }
    if dec.string()? != params.curve_name() {
        return Err(CodecError::VersionMismatch("curve name"));
    }
    if dec.string()? != params.hash_name() {
        return Err(CodecError::VersionMismatch("hash name"));
    }
    if dec.u64()? != params.transaction_timeout_ms() {
        return Err(CodecError::VersionMismatch("transaction timeout"));
    }
    Ok(dec)
}

/// Serialize a top-level ledger message with the deployment header.
pub fn write_message<T: Codec>(params: &Params, value: &T, encoding: PointEncoding) -> Vec<u8> {
    let mut enc = message_encoder(params, encoding);
    value.encode(&mut enc);
    enc.finish()
}

/// Parse a top-level ledger message, byte-comparing the header against the
/// local deployment and rejecting trailing input.
pub fn read_message<T: Codec>(params: &Params, bytes: &[u8]) -> Result<T, CodecError> {
    let mut dec = open_message(params, bytes)?;
    let value = T::decode(&mut dec)?;
    dec.finish()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{random_scalar, G};
    use crate::params::ParamsBuilder;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn integer_layout_is_big_endian() {
        let mut enc = Encoder::compressed();
        enc.put_u32(0x0102_0304);
        enc.put_u64(0x0506_0708_090a_0b0c);
        enc.put_bool(true);
        assert_eq!(hex::encode(enc.finish()), "0102030405060708090a0b0c01");
    }

    #[test]
    fn scalar_round_trip_includes_sign_padding() {
        let mut rng = ChaCha20Rng::from_seed([9u8; 32]);
        for _ in 0..16 {
            let s = random_scalar(&mut rng);
            let mut enc = Encoder::compressed();
            enc.put_scalar(&s);
            let bytes = enc.finish();
            let mut dec = Decoder::new(&bytes);
            assert_eq!(dec.scalar().expect("scalar"), s);
            dec.finish().expect("no trailing");
        }
        // Zero and one get minimal encodings.
        let mut enc = Encoder::compressed();
        enc.put_scalar(&Scalar::ZERO);
        enc.put_scalar(&Scalar::ONE);
        assert_eq!(enc.finish(), vec![1, 0, 1, 1]);
    }

    #[test]
    fn point_round_trip_both_encodings() {
        let mut rng = ChaCha20Rng::from_seed([10u8; 32]);
        let p = G * random_scalar(&mut rng);
        for encoding in [PointEncoding::Compressed, PointEncoding::Uncompressed] {
            let mut enc = Encoder::new(encoding);
            enc.put_point(&p);
            enc.put_point(&Point::IDENTITY);
            let bytes = enc.finish();
            let mut dec = Decoder::new(&bytes);
            assert_eq!(dec.point().expect("point"), p);
            assert_eq!(dec.point().expect("identity"), Point::IDENTITY);
        }
    }

    #[test]
    fn strings_are_nul_terminated() {
        let mut enc = Encoder::compressed();
        enc.put_string("secp256k1");
        let bytes = enc.finish();
        assert_eq!(bytes.last(), Some(&0u8));
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.string().expect("string"), "secp256k1");
    }

    #[test]
    fn truncated_input_is_malformed() {
        let mut dec = Decoder::new(&[0x05, 0x01]);
        assert!(matches!(
            dec.point(),
            Err(CodecError::MalformedInput("truncated stream"))
        ));
    }

    struct Probe(u32);

    impl Codec for Probe {
        fn encode(&self, enc: &mut Encoder) {
            enc.put_u32(self.0);
        }

        fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
            Ok(Probe(dec.u32()?))
        }
    }

    #[test]
    fn message_header_is_byte_compared() {
        let params = ParamsBuilder::new()
            .max_balance_bits(4)
            .seed([11u8; 32])
            .build()
            .expect("params");
        let bytes = write_message(&params, &Probe(7), PointEncoding::Compressed);
        assert_eq!(
            read_message::<Probe>(&params, &bytes).expect("round trip").0,
            7
        );

        // A different timeout is a different deployment.
        let other = ParamsBuilder::new()
            .max_balance_bits(4)
            .transaction_timeout_ms(1)
            .seed([11u8; 32])
            .build()
            .expect("params");
        assert!(matches!(
            read_message::<Probe>(&other, &bytes),
            Err(CodecError::VersionMismatch(_))
        ));

        // Trailing bytes are rejected.
        let mut extended = bytes.clone();
        extended.push(0);
        assert!(matches!(
            read_message::<Probe>(&params, &extended),
            Err(CodecError::TrailingBytes)
        ));
    }
}
