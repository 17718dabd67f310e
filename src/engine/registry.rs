//! Algorithm registry: fixed identifiers, sink constructors, and the resolved [`AlgorithmSet`].
//!
//! The registry is an immutable capability table. [`Registry::standard`] is built once and
//! cached; callers resolve the algorithms they want into an [`AlgorithmSet`] before the
//! pipeline starts and share it by reference (`Arc`) with every worker.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use digest::Digest;

use crate::error::RegistryError;

/// Digest algorithm identifiers. Declaration order is the canonical (output) order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Blake3,
}

impl Algorithm {
    pub const ALL: [Algorithm; 13] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha224,
        Algorithm::Sha256,
        Algorithm::Sha384,
        Algorithm::Sha512,
        Algorithm::Sha512_224,
        Algorithm::Sha512_256,
        Algorithm::Sha3_224,
        Algorithm::Sha3_256,
        Algorithm::Sha3_384,
        Algorithm::Sha3_512,
        Algorithm::Blake3,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha224 => "SHA224",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha384 => "SHA384",
            Algorithm::Sha512 => "SHA512",
            Algorithm::Sha512_224 => "SHA512-224",
            Algorithm::Sha512_256 => "SHA512-256",
            Algorithm::Sha3_224 => "SHA3-224",
            Algorithm::Sha3_256 => "SHA3-256",
            Algorithm::Sha3_384 => "SHA3-384",
            Algorithm::Sha3_512 => "SHA3-512",
            Algorithm::Blake3 => "BLAKE3",
        }
    }

    /// Digest length in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            Algorithm::Md5 => 16,
            Algorithm::Sha1 => 20,
            Algorithm::Sha224 | Algorithm::Sha512_224 | Algorithm::Sha3_224 => 28,
            Algorithm::Sha256
            | Algorithm::Sha512_256
            | Algorithm::Sha3_256
            | Algorithm::Blake3 => 32,
            Algorithm::Sha384 | Algorithm::Sha3_384 => 48,
            Algorithm::Sha512 | Algorithm::Sha3_512 => 64,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = RegistryError;

    /// Case-insensitive; `_` is accepted in place of `-` (`sha3_256`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('_', "-");
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == normalized)
            .ok_or_else(|| RegistryError::Unknown(s.to_string()))
    }
}

/// Incremental digest consumer: absorbs a byte stream and yields a fixed-size digest.
pub trait StreamingDigest: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

/// Adapter from any RustCrypto [`Digest`] to [`StreamingDigest`].
pub struct Hashed<D>(pub D);

impl<D> StreamingDigest for Hashed<D>
where
    D: Digest + Send,
{
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        let Hashed(inner) = *self;
        inner.finalize().to_vec()
    }
}

impl StreamingDigest for blake3::Hasher {
    fn update(&mut self, data: &[u8]) {
        blake3::Hasher::update(self, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        blake3::Hasher::finalize(&self).as_bytes().to_vec()
    }
}

/// Constructor for a fresh sink. Plain fn pointers keep the table `Copy` and `Send`.
pub type SinkFactory = fn() -> Box<dyn StreamingDigest>;

fn rust_crypto<D>() -> Box<dyn StreamingDigest>
where
    D: Digest + Send + 'static,
{
    Box::new(Hashed(D::new()))
}

fn blake3_sink() -> Box<dyn StreamingDigest> {
    Box::new(blake3::Hasher::new())
}

static STANDARD: OnceLock<Registry> = OnceLock::new();

/// Immutable `Algorithm -> SinkFactory` table.
#[derive(Clone, Default)]
pub struct Registry {
    entries: BTreeMap<Algorithm, SinkFactory>,
}

impl Registry {
    /// Empty table; add entries with [`Registry::with`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in algorithm. Built on first use, then cached for the process.
    pub fn standard() -> &'static Registry {
        STANDARD.get_or_init(|| {
            Registry::new()
                .with(Algorithm::Md5, rust_crypto::<md5::Md5>)
                .with(Algorithm::Sha1, rust_crypto::<sha1::Sha1>)
                .with(Algorithm::Sha224, rust_crypto::<sha2::Sha224>)
                .with(Algorithm::Sha256, rust_crypto::<sha2::Sha256>)
                .with(Algorithm::Sha384, rust_crypto::<sha2::Sha384>)
                .with(Algorithm::Sha512, rust_crypto::<sha2::Sha512>)
                .with(Algorithm::Sha512_224, rust_crypto::<sha2::Sha512_224>)
                .with(Algorithm::Sha512_256, rust_crypto::<sha2::Sha512_256>)
                .with(Algorithm::Sha3_224, rust_crypto::<sha3::Sha3_224>)
                .with(Algorithm::Sha3_256, rust_crypto::<sha3::Sha3_256>)
                .with(Algorithm::Sha3_384, rust_crypto::<sha3::Sha3_384>)
                .with(Algorithm::Sha3_512, rust_crypto::<sha3::Sha3_512>)
                .with(Algorithm::Blake3, blake3_sink)
        })
    }

    /// Register (or replace) the constructor for `algorithm`.
    pub fn with(mut self, algorithm: Algorithm, factory: SinkFactory) -> Self {
        self.entries.insert(algorithm, factory);
        self
    }

    pub fn algorithms(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.entries.keys().copied()
    }

    pub fn contains(&self, algorithm: Algorithm) -> bool {
        self.entries.contains_key(&algorithm)
    }

    /// Resolve `algorithms` into a non-empty set. Duplicates collapse.
    pub fn resolve(&self, algorithms: &[Algorithm]) -> Result<AlgorithmSet, RegistryError> {
        let mut entries = BTreeMap::new();
        for &algorithm in algorithms {
            let factory = self
                .entries
                .get(&algorithm)
                .ok_or(RegistryError::Unsupported(algorithm))?;
            entries.insert(algorithm, *factory);
        }
        if entries.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(AlgorithmSet {
            entries: entries.into_iter().collect(),
        })
    }

    /// Parse and resolve algorithm names (`"md5"`, `"SHA3-256"`, ...).
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<AlgorithmSet, RegistryError> {
        let algorithms = names
            .iter()
            .map(|n| n.as_ref().parse::<Algorithm>())
            .collect::<Result<Vec<_>, _>>()?;
        self.resolve(&algorithms)
    }
}

/// Enabled algorithms for one run. Never empty; iterates in canonical order.
#[derive(Clone)]
pub struct AlgorithmSet {
    entries: Vec<(Algorithm, SinkFactory)>,
}

impl AlgorithmSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn algorithms(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.entries.iter().map(|(a, _)| *a)
    }

    pub fn contains(&self, algorithm: Algorithm) -> bool {
        self.entries.iter().any(|(a, _)| *a == algorithm)
    }

    pub(crate) fn entries(&self) -> &[(Algorithm, SinkFactory)] {
        &self.entries
    }
}

impl fmt::Debug for AlgorithmSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.algorithms()).finish()
    }
}
