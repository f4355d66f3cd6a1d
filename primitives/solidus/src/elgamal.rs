//! ElGamal over the deployment curve.
//!
//! A [`Cipher`] is the pair `(X, Y) = (m·G + r·P, r·G)` under a public key
//! `P`. Ciphers are additively homomorphic and support reencryption by
//! adding a fresh encryption of zero to both halves.
//!
//! [`Encryptor`] variants differ only in where zero encryptions come from:
//! computed inline, pulled from a bounded queue kept full by background
//! workers, or read from a disk stream of precomputed records. Every variant
//! is safe to call from multiple threads and falls back to inline computation
//! instead of blocking when its source runs dry.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::ops::{Add, Neg, Sub};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use k256::elliptic_curve::PrimeField;
use rand::{rngs::OsRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::CryptoError;
use crate::group::{self, decode_point, value_point, Point, Scalar, G};
use crate::params::Params;

/// An ElGamal ciphertext pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cipher {
    pub x: Point,
    pub y: Point,
}

impl Cipher {
    /// The trivial encryption of the identity with randomness zero.
    pub fn identity() -> Self {
        Self {
            x: Point::IDENTITY,
            y: Point::IDENTITY,
        }
    }

    /// Scale both halves; encrypts `s·m` when `self` encrypts `m`.
    pub fn scale(&self, s: &Scalar) -> Self {
        Self {
            x: self.x * *s,
            y: self.y * *s,
        }
    }
}

impl Add for Cipher {
    type Output = Cipher;

    fn add(self, rhs: Cipher) -> Cipher {
        Cipher {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Cipher {
    type Output = Cipher;

    fn sub(self, rhs: Cipher) -> Cipher {
        Cipher {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Neg for Cipher {
    type Output = Cipher;

    fn neg(self) -> Cipher {
        Cipher {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// A zero encryption together with the randomizer that produced it. Swap
/// proofs need the opening, not just the ciphertext.
#[derive(Clone, Copy, Debug)]
pub struct ZeroEnc {
    pub cipher: Cipher,
    pub randomizer: Scalar,
}

enum ZeroSource {
    Inline,
    Pooled {
        queue: Receiver<ZeroEnc>,
        shutdown: Arc<AtomicBool>,
        workers: Mutex<Vec<JoinHandle<()>>>,
    },
    Stream {
        reader: Mutex<BufReader<File>>,
        exhausted: AtomicBool,
    },
}

pub struct Encryptor {
    public_key: Point,
    max_balance: i64,
    rng: Arc<Mutex<ChaCha20Rng>>,
    source: ZeroSource,
}

impl Encryptor {
    /// The cached encryptor for `public_key` (inline zero computation),
    /// created on first use.
    pub fn for_key(params: &Arc<Params>, public_key: Point) -> Arc<Self> {
        let mut cache = params.encryptor_cache().lock().expect("encryptor cache lock");
        Arc::clone(
            cache
                .entry(crate::group::PointKey::new(&public_key))
                .or_insert_with(|| Arc::new(Self::inline(params, public_key))),
        )
    }

    pub fn inline(params: &Arc<Params>, public_key: Point) -> Self {
        Self::with_source(params, public_key, ZeroSource::Inline)
    }

    /// Zero encryptions precomputed by `workers` background threads into a
    /// queue of at most `queue_depth` entries. Consumers never wait on the
    /// queue: a drained queue falls back to inline computation.
    pub fn pooled(
        params: &Arc<Params>,
        public_key: Point,
        queue_depth: usize,
        workers: usize,
    ) -> Self {
        let (tx, rx) = bounded(queue_depth.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let handles = (0..workers.max(1))
            .map(|_| spawn_zero_worker(public_key, tx.clone(), Arc::clone(&shutdown)))
            .collect();
        Self::with_source(
            params,
            public_key,
            ZeroSource::Pooled {
                queue: rx,
                shutdown,
                workers: Mutex::new(handles),
            },
        )
    }

    /// Zero encryptions read from a file written by [`write_zero_stream`];
    /// inline computation takes over once the stream is exhausted.
    pub fn stream_backed(
        params: &Arc<Params>,
        public_key: Point,
        path: &Path,
    ) -> io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(Self::with_source(
            params,
            public_key,
            ZeroSource::Stream {
                reader: Mutex::new(reader),
                exhausted: AtomicBool::new(false),
            },
        ))
    }

    fn with_source(params: &Arc<Params>, public_key: Point, source: ZeroSource) -> Self {
        Self {
            public_key,
            max_balance: params.max_balance(),
            rng: params.rng_handle(),
            source,
        }
    }

    pub fn public_key(&self) -> Point {
        self.public_key
    }

    fn inline_zero(&self) -> ZeroEnc {
        let r = {
            let mut rng = self.rng.lock().expect("encryptor rng lock");
            group::random_scalar(&mut *rng)
        };
        ZeroEnc {
            cipher: Cipher {
                x: self.public_key * r,
                y: G * r,
            },
            randomizer: r,
        }
    }

    /// A fresh encryption of zero with its randomizer.
    pub fn zero_opening(&self) -> ZeroEnc {
        match &self.source {
            ZeroSource::Inline => self.inline_zero(),
            ZeroSource::Pooled { queue, .. } => {
                queue.try_recv().unwrap_or_else(|_| self.inline_zero())
            }
            ZeroSource::Stream { reader, exhausted } => {
                if exhausted.load(Ordering::Relaxed) {
                    return self.inline_zero();
                }
                let mut reader = reader.lock().expect("stream reader lock");
                match read_zero_record(&mut *reader) {
                    Ok(Some(zero)) => zero,
                    Ok(None) => {
                        exhausted.store(true, Ordering::Relaxed);
                        tracing::debug!("zero-encryption stream exhausted; computing inline");
                        self.inline_zero()
                    }
                    Err(err) => {
                        exhausted.store(true, Ordering::Relaxed);
                        tracing::warn!(%err, "zero-encryption stream unreadable; computing inline");
                        self.inline_zero()
                    }
                }
            }
        }
    }

    pub fn encrypt_zero(&self) -> Cipher {
        self.zero_opening().cipher
    }

    pub fn encrypt_point(&self, m: &Point) -> Cipher {
        let zero = self.encrypt_zero();
        Cipher {
            x: *m + zero.x,
            y: zero.y,
        }
    }

    pub fn encrypt_value(&self, v: i64) -> Cipher {
        self.encrypt_point(&value_point(v))
    }

    /// `encrypt_value` plus the randomizer; proofs over fresh value
    /// encryptions need the opening.
    pub fn encrypt_value_opening(&self, v: i64) -> (Cipher, Scalar) {
        let zero = self.zero_opening();
        (
            Cipher {
                x: value_point(v) + zero.cipher.x,
                y: zero.cipher.y,
            },
            zero.randomizer,
        )
    }

    /// Bounds-checked balance encryption.
    pub fn encrypt_balance(&self, v: i64) -> Result<Cipher, CryptoError> {
        if v < 0 || v > self.max_balance {
            return Err(CryptoError::BalanceOutOfRange(v));
        }
        Ok(self.encrypt_value(v))
    }

    pub fn reencrypt(&self, c: &Cipher) -> Cipher {
        let zero = self.encrypt_zero();
        *c + zero
    }

    /// Reencrypt and return the randomizer of the zero encryption applied.
    pub fn reencrypt_opening(&self, c: &Cipher) -> (Cipher, Scalar) {
        let zero = self.zero_opening();
        (*c + zero.cipher, zero.randomizer)
    }
}

impl Drop for Encryptor {
    fn drop(&mut self) {
        if let ZeroSource::Pooled {
            queue,
            shutdown,
            workers,
        } = &self.source
        {
            shutdown.store(true, Ordering::Relaxed);
            // Unblock producers stuck on a full queue, then reap them.
            while queue.try_recv().is_ok() {}
            let mut workers = workers.lock().expect("worker handle lock");
            for handle in workers.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

fn spawn_zero_worker(
    public_key: Point,
    tx: Sender<ZeroEnc>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        let mut rng = ChaCha20Rng::from_seed(seed);
        while !shutdown.load(Ordering::Relaxed) {
            let r = group::random_scalar(&mut rng);
            let zero = ZeroEnc {
                cipher: Cipher {
                    x: public_key * r,
                    y: G * r,
                },
                randomizer: r,
            };
            // Bounded send so a full queue never wedges shutdown.
            match tx.send_timeout(zero, Duration::from_millis(50)) {
                Ok(()) => {}
                Err(crossbeam_channel::SendTimeoutError::Timeout(_)) => {}
                Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => break,
            }
        }
    })
}

/// Decrypts with the secret key; optional blinding splits the secret into
/// `(s + b, b)` with a fresh `b` per call.
pub struct Decryptor {
    params: Arc<Params>,
    secret: Scalar,
    blinded: bool,
}

impl Decryptor {
    pub fn for_key(params: &Arc<Params>, secret: Scalar) -> Self {
        Self {
            params: Arc::clone(params),
            secret,
            blinded: false,
        }
    }

    pub fn with_blinding(mut self) -> Self {
        self.blinded = true;
        self
    }

    pub fn public_key(&self) -> Point {
        G * self.secret
    }

    pub fn decrypt_point(&self, c: &Cipher) -> Point {
        if self.blinded {
            let b = self.params.random_scalar();
            c.x - c.y * (self.secret + b) + c.y * b
        } else {
            c.x - c.y * self.secret
        }
    }

    pub fn decrypt_balance(&self, c: &Cipher) -> Result<i64, CryptoError> {
        self.params.dlog().lookup(&self.decrypt_point(c))
    }
}

// ---------------- precomputed zero-encryption streams ----------------
//
// Record layout, repeated to EOF:
//   x_len(1) || x_sec1 || y_len(1) || y_sec1 || r_len(1) || r_be
// Points are compressed; the scalar is big-endian with no sign byte.

/// Precompute `count` zero encryptions for `public_key` into `out`.
pub fn write_zero_stream<W: Write>(
    params: &Arc<Params>,
    public_key: Point,
    count: usize,
    out: &mut W,
) -> io::Result<()> {
    let encryptor = Encryptor::inline(params, public_key);
    for _ in 0..count {
        let zero = encryptor.inline_zero();
        write_length_prefixed(out, &group::compress(&zero.cipher.x))?;
        write_length_prefixed(out, &group::compress(&zero.cipher.y))?;
        let repr = zero.randomizer.to_bytes();
        write_length_prefixed(out, repr.as_slice())?;
    }
    Ok(())
}

fn write_length_prefixed<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(&[bytes.len() as u8])?;
    out.write_all(bytes)
}

fn read_zero_record<R: Read>(reader: &mut R) -> io::Result<Option<ZeroEnc>> {
    let x = match read_length_prefixed(reader)? {
        Some(bytes) => bytes,
        None => return Ok(None),
    };
    let y = read_length_prefixed(reader)?
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "truncated record"))?;
    let r = read_length_prefixed(reader)?
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "truncated record"))?;

    let bad = |what: &str| io::Error::new(io::ErrorKind::InvalidData, what.to_owned());
    let x = decode_point(&x).map_err(|_| bad("bad X point"))?;
    let y = decode_point(&y).map_err(|_| bad("bad Y point"))?;
    if r.len() > 32 {
        return Err(bad("oversized randomizer"));
    }
    let mut repr = [0u8; 32];
    repr[32 - r.len()..].copy_from_slice(&r);
    let randomizer = Option::<Scalar>::from(k256::Scalar::from_repr(repr.into()))
        .ok_or_else(|| bad("non-canonical randomizer"))?;
    Ok(Some(ZeroEnc {
        cipher: Cipher { x, y },
        randomizer,
    }))
}

fn read_length_prefixed<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len = [0u8; 1];
    match reader.read_exact(&mut len) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }
    let mut bytes = vec![0u8; len[0] as usize];
    reader.read_exact(&mut bytes)?;
    Ok(Some(bytes))
}
