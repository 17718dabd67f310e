//! Engine tests: registry, known digests, small vs streamed paths, sink failure isolation.

use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use xhash::engine::StreamingDigest;
use xhash::pipeline::{CancelSource, CancellationToken};
use xhash::{Algorithm, DigestEngine, DigestError, FileTask, Registry, RegistryError};

fn md5_sink() -> Box<dyn StreamingDigest> {
    Box::new(xhash::engine::Hashed(md5::Md5::default()))
}

fn engine(algorithms: &[Algorithm]) -> DigestEngine {
    DigestEngine::new(Arc::new(Registry::standard().resolve(algorithms).unwrap()))
}

fn hex_of(digests: &xhash::Digests, algorithm: Algorithm) -> String {
    hex::encode(&digests[&algorithm])
}

// --- registry ---

#[test]
fn test_algorithm_parse_is_case_insensitive() {
    assert_eq!("md5".parse::<Algorithm>().unwrap(), Algorithm::Md5);
    assert_eq!("SHA256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
    assert_eq!("sha3_256".parse::<Algorithm>().unwrap(), Algorithm::Sha3_256);
    assert_eq!("Sha512-224".parse::<Algorithm>().unwrap(), Algorithm::Sha512_224);
    assert_eq!("blake3".parse::<Algorithm>().unwrap(), Algorithm::Blake3);
    assert_eq!(
        "whirlpool".parse::<Algorithm>(),
        Err(RegistryError::Unknown("whirlpool".to_string()))
    );
}

#[test]
fn test_algorithm_names_round_trip() {
    for algorithm in Algorithm::ALL {
        assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
    }
}

#[test]
fn test_standard_registry_has_every_algorithm() {
    let registry = Registry::standard();
    assert_eq!(registry.algorithms().count(), Algorithm::ALL.len());
    for algorithm in Algorithm::ALL {
        assert!(registry.contains(algorithm));
    }
}

#[test]
fn test_resolve_rejects_empty_and_unsupported() {
    assert_eq!(
        Registry::standard().resolve(&[]).unwrap_err(),
        RegistryError::Empty
    );
    let partial = Registry::new().with(Algorithm::Md5, md5_sink);
    assert_eq!(
        partial.resolve(&[Algorithm::Sha1]).unwrap_err(),
        RegistryError::Unsupported(Algorithm::Sha1)
    );
}

#[test]
fn test_resolve_collapses_duplicates_in_canonical_order() {
    let set = Registry::standard()
        .resolve(&[Algorithm::Sha256, Algorithm::Md5, Algorithm::Sha256])
        .unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(
        set.algorithms().collect::<Vec<_>>(),
        vec![Algorithm::Md5, Algorithm::Sha256]
    );
}

#[test]
fn test_resolve_names() {
    let set = Registry::standard()
        .resolve_names(&["sha1", "BLAKE3"])
        .unwrap();
    assert!(set.contains(Algorithm::Sha1));
    assert!(set.contains(Algorithm::Blake3));
    assert!(!set.contains(Algorithm::Md5));
    assert!(matches!(
        Registry::standard().resolve_names(&["nope"]),
        Err(RegistryError::Unknown(_))
    ));
}

// --- known digests ---

#[test]
fn test_known_vectors_empty_input() {
    let e = engine(&Algorithm::ALL);
    let d = e.digest_bytes(Path::new("empty"), b"").unwrap();
    assert_eq!(d.len(), Algorithm::ALL.len());
    assert_eq!(hex_of(&d, Algorithm::Md5), "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(
        hex_of(&d, Algorithm::Sha1),
        "da39a3ee5e6b4b0d3255bfef95601890afd80709"
    );
    assert_eq!(
        hex_of(&d, Algorithm::Sha256),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(
        hex_of(&d, Algorithm::Sha3_256),
        "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
    );
    assert_eq!(
        hex_of(&d, Algorithm::Blake3),
        "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
    );
    for (algorithm, digest) in &d {
        assert_eq!(digest.len(), algorithm.output_len(), "{algorithm}");
    }
}

#[test]
fn test_known_vectors_hello() {
    let e = engine(&[Algorithm::Md5, Algorithm::Sha1, Algorithm::Sha256]);
    let d = e.digest_bytes(Path::new("hello"), b"hello").unwrap();
    assert_eq!(hex_of(&d, Algorithm::Md5), "5d41402abc4b2a76b9719d911017c592");
    assert_eq!(
        hex_of(&d, Algorithm::Sha1),
        "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
    );
    assert_eq!(
        hex_of(&d, Algorithm::Sha256),
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}

#[test]
fn test_empty_file_through_both_paths() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("empty");
    std::fs::write(&path, b"").unwrap();

    let small = engine(&[Algorithm::Md5]).digest_file(&path).unwrap();
    // Threshold 0 forces even empty files onto the streamed path.
    let streamed = engine(&[Algorithm::Md5])
        .with_small_file_threshold(0)
        .digest_file(&path)
        .unwrap();
    assert_eq!(small, streamed);
    assert_eq!(hex_of(&small, Algorithm::Md5), "d41d8cd98f00b204e9800998ecf8427e");
}

// --- small vs streamed ---

#[test]
fn test_streamed_matches_in_memory_across_chunk_sizes() {
    let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 256) as u8).collect();
    let reference = engine(&Algorithm::ALL)
        .digest_bytes(Path::new("ref"), &data)
        .unwrap();

    for chunk_size in [1, 7, 4096, 10_000, 65_536] {
        let e = engine(&Algorithm::ALL).with_chunk_size(chunk_size);
        let streamed = e
            .digest_reader(Path::new("ref"), Cursor::new(&data), &CancellationToken::never())
            .unwrap();
        assert_eq!(streamed, reference, "chunk size {chunk_size}");
    }
}

#[test]
fn test_threshold_boundary_is_exclusive() {
    let e = engine(&[Algorithm::Md5]).with_small_file_threshold(1000);
    assert!(e.is_small(999));
    assert!(!e.is_small(1000));
    assert!(!e.is_small(1001));
}

#[test]
fn test_file_straddling_threshold_digests_identically() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("edge.bin");
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 97) as u8).collect();
    std::fs::write(&path, &data).unwrap();

    let algorithms = [Algorithm::Sha256, Algorithm::Sha3_512, Algorithm::Blake3];
    let in_memory = engine(&algorithms)
        .with_small_file_threshold(1001)
        .digest_file(&path)
        .unwrap();
    let streamed = engine(&algorithms)
        .with_small_file_threshold(1000)
        .with_chunk_size(128)
        .digest_file(&path)
        .unwrap();
    assert_eq!(in_memory, streamed);
    assert_eq!(
        in_memory,
        engine(&algorithms).digest_bytes(&path, &data).unwrap()
    );
}

#[test]
fn test_default_threshold_file_is_streamed_correctly() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("million.bin");
    let data: Vec<u8> = (0..1_000_000u32).map(|i| (i ^ (i >> 8)) as u8).collect();
    std::fs::write(&path, &data).unwrap();

    let e = engine(&[Algorithm::Md5, Algorithm::Sha512]);
    assert!(!e.is_small(data.len() as u64));
    assert_eq!(
        e.digest_file(&path).unwrap(),
        e.digest_bytes(&path, &data).unwrap()
    );
}

// --- failures ---

struct PanicsOnUpdate;

impl StreamingDigest for PanicsOnUpdate {
    fn update(&mut self, _data: &[u8]) {
        panic!("update failed");
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        Vec::new()
    }
}

struct PanicsOnFinalize;

impl StreamingDigest for PanicsOnFinalize {
    fn update(&mut self, _data: &[u8]) {}

    fn finalize(self: Box<Self>) -> Vec<u8> {
        panic!("finalize failed");
    }
}

fn panics_on_update() -> Box<dyn StreamingDigest> {
    Box::new(PanicsOnUpdate)
}

fn panics_on_finalize() -> Box<dyn StreamingDigest> {
    Box::new(PanicsOnFinalize)
}

fn engine_with_broken_sha256(factory: xhash::engine::SinkFactory) -> DigestEngine {
    let set = Registry::standard()
        .clone()
        .with(Algorithm::Sha256, factory)
        .resolve(&[Algorithm::Md5, Algorithm::Sha256, Algorithm::Sha1])
        .unwrap();
    DigestEngine::new(Arc::new(set)).with_chunk_size(16)
}

#[test]
fn test_panicking_sink_fails_only_the_file() {
    let factories: [xhash::engine::SinkFactory; 2] = [panics_on_update, panics_on_finalize];
    let data = vec![1u8; 100];
    for factory in factories {
        let e = engine_with_broken_sha256(factory);

        let err = e.digest_bytes(Path::new("f"), &data).unwrap_err();
        assert!(matches!(
            err,
            DigestError::Sink {
                algorithm: Algorithm::Sha256,
                ..
            }
        ));

        let err = e
            .digest_reader(Path::new("f"), Cursor::new(&data), &CancellationToken::never())
            .unwrap_err();
        match err {
            DigestError::Sink {
                path,
                algorithm,
                reason,
            } => {
                assert_eq!(path, Path::new("f"));
                assert_eq!(algorithm, Algorithm::Sha256);
                assert!(reason.ends_with("failed"), "{reason}");
            }
            other => panic!("expected sink error, got {other:?}"),
        }

        // Failure is confined to that engine; a healthy one is unaffected.
        let healthy = engine(&[Algorithm::Md5])
            .digest_bytes(Path::new("g"), b"hello")
            .unwrap();
        assert_eq!(hex_of(&healthy, Algorithm::Md5), "5d41402abc4b2a76b9719d911017c592");
    }
}

/// Yields `good` bytes, then fails.
struct FailingReader {
    good: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.good == 0 {
            return Err(io::Error::other("device went away"));
        }
        let n = buf.len().min(self.good);
        buf[..n].fill(0xAB);
        self.good -= n;
        Ok(n)
    }
}

#[test]
fn test_read_error_mid_stream() {
    let e = engine(&[Algorithm::Md5, Algorithm::Sha256]).with_chunk_size(64);
    let err = e
        .digest_reader(
            Path::new("flaky"),
            FailingReader { good: 500 },
            &CancellationToken::never(),
        )
        .unwrap_err();
    match err {
        DigestError::Read { path, source } => {
            assert_eq!(path, Path::new("flaky"));
            assert_eq!(source.to_string(), "device went away");
        }
        other => panic!("expected read error, got {other:?}"),
    }
}

/// Retries on `Interrupted` instead of failing.
struct InterruptOnce {
    inner: Cursor<Vec<u8>>,
    interrupted: bool,
}

impl Read for InterruptOnce {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.interrupted {
            self.interrupted = true;
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        self.inner.read(buf)
    }
}

#[test]
fn test_interrupted_read_is_retried() {
    let e = engine(&[Algorithm::Md5]);
    let d = e
        .digest_reader(
            Path::new("eintr"),
            InterruptOnce {
                inner: Cursor::new(b"hello".to_vec()),
                interrupted: false,
            },
            &CancellationToken::never(),
        )
        .unwrap();
    assert_eq!(hex_of(&d, Algorithm::Md5), "5d41402abc4b2a76b9719d911017c592");
}

#[test]
fn test_cancelled_token_stops_digest() {
    let source = CancelSource::new();
    source.cancel();
    let token = source.token();
    assert!(token.is_cancelled());

    let e = engine(&[Algorithm::Sha1]);
    let err = e
        .digest_reader(Path::new("c"), Cursor::new(vec![0u8; 1024]), &token)
        .unwrap_err();
    assert!(matches!(err, DigestError::Cancelled { .. }));

    let tmp = tempdir().unwrap();
    let path = tmp.path().join("x");
    std::fs::write(&path, b"data").unwrap();
    let task = FileTask {
        path: path.clone(),
        size_hint: 4,
    };
    assert!(matches!(
        e.digest(&task, &token),
        Err(DigestError::Cancelled { .. })
    ));
}

#[test]
fn test_open_error_names_the_file() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("gone");
    let task = FileTask {
        path: missing.clone(),
        size_hint: 10,
    };
    let err = engine(&[Algorithm::Md5])
        .digest(&task, &CancellationToken::never())
        .unwrap_err();
    assert!(matches!(err, DigestError::Open { .. }));
    assert_eq!(err.path(), &missing);
}

// --- cancellation primitives ---

#[test]
fn test_cancel_is_idempotent_and_visible_to_clones() {
    let source = CancelSource::new();
    let token = source.token();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    source.cancel();
    source.cancel();
    assert!(token.is_cancelled());
    assert!(clone.is_cancelled());
    assert!(source.is_cancelled());
    // Closed signal channel: recv returns immediately with an error.
    assert!(clone.signal().recv().is_err());
}

#[test]
fn test_never_token_stays_live() {
    let token = CancellationToken::never();
    assert!(!token.is_cancelled());
    assert!(
        token
            .signal()
            .recv_timeout(std::time::Duration::from_millis(20))
            .is_err()
    );
}
