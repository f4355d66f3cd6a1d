//! Deployment-wide encryption parameters.
//!
//! [`Params`] is built once, wrapped in an `Arc`, and shared by reference for
//! the life of the process: the curve and hash names that go into every
//! message header, the balance range, the discrete-log table, the
//! pseudorandom source, and a per-public-key cache of [`Encryptor`]s. It is
//! immutable after construction; the interior mutexes guard only the RNG and
//! the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::{rngs::OsRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::dlog::DlogTable;
use crate::elgamal::Encryptor;
use crate::error::CryptoError;
use crate::group::{self, PointKey, Scalar};

pub const CURVE_NAME: &str = "secp256k1";
pub const HASH_NAME: &str = "sha-256";

pub struct Params {
    max_balance_bits: u32,
    transaction_timeout_ms: u64,
    dlog: DlogTable,
    rng: Arc<Mutex<ChaCha20Rng>>,
    encryptors: Mutex<HashMap<PointKey, Arc<Encryptor>>>,
}

pub struct ParamsBuilder {
    max_balance_bits: u32,
    dlog_gap: u32,
    transaction_timeout_ms: u64,
    seed: Option<[u8; 32]>,
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        Self {
            max_balance_bits: 16,
            dlog_gap: 1,
            transaction_timeout_ms: 30_000,
            seed: None,
        }
    }
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balances must fit in this many bits; also sizes the dlog table.
    pub fn max_balance_bits(mut self, bits: u32) -> Self {
        self.max_balance_bits = bits;
        self
    }

    pub fn dlog_gap(mut self, gap: u32) -> Self {
        self.dlog_gap = gap;
        self
    }

    pub fn transaction_timeout_ms(mut self, ms: u64) -> Self {
        self.transaction_timeout_ms = ms;
        self
    }

    /// Fix the CSPRNG seed. Tests use this for reproducible leaf assignment;
    /// production deployments leave it unset and seed from the OS.
    pub fn seed(mut self, seed: [u8; 32]) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<Arc<Params>, CryptoError> {
        Params::build(self)
    }
}

impl Params {
    pub fn build(builder: ParamsBuilder) -> Result<Arc<Self>, CryptoError> {
        let dlog = DlogTable::build(builder.max_balance_bits, builder.dlog_gap)?;
        let seed = builder.seed.unwrap_or_else(|| {
            let mut seed = [0u8; 32];
            OsRng.fill_bytes(&mut seed);
            seed
        });
        Ok(Arc::new(Self {
            max_balance_bits: builder.max_balance_bits,
            transaction_timeout_ms: builder.transaction_timeout_ms,
            dlog,
            rng: Arc::new(Mutex::new(ChaCha20Rng::from_seed(seed))),
            encryptors: Mutex::new(HashMap::new()),
        }))
    }

    pub fn curve_name(&self) -> &'static str {
        CURVE_NAME
    }

    pub fn hash_name(&self) -> &'static str {
        HASH_NAME
    }

    pub fn max_balance_bits(&self) -> u32 {
        self.max_balance_bits
    }

    pub fn max_balance(&self) -> i64 {
        self.dlog.max_value() as i64
    }

    pub fn transaction_timeout_ms(&self) -> u64 {
        self.transaction_timeout_ms
    }

    pub fn dlog(&self) -> &DlogTable {
        &self.dlog
    }

    pub fn random_scalar(&self) -> Scalar {
        let mut rng = self.rng.lock().expect("params rng lock");
        group::random_scalar(&mut *rng)
    }

    /// Uniform index in `[0, bound)`; used for leaf assignment.
    pub fn random_index(&self, bound: u32) -> u32 {
        let mut rng = self.rng.lock().expect("params rng lock");
        rng.gen_range(0..bound)
    }

    pub(crate) fn rng_handle(&self) -> Arc<Mutex<ChaCha20Rng>> {
        Arc::clone(&self.rng)
    }

    /// Per-key cache backing [`Encryptor::for_key`]. Pooled and
    /// stream-backed encryptors are constructed explicitly and not cached.
    pub(crate) fn encryptor_cache(&self) -> &Mutex<HashMap<PointKey, Arc<Encryptor>>> {
        &self.encryptors
    }
}
