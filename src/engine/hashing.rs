//! File hashing: one read of a file feeds every enabled algorithm.
//!
//! Small files are read whole and each algorithm runs on the shared buffer in parallel (rayon).
//! Larger files are streamed: a broadcaster reads fixed-size chunks and hands each chunk to one
//! sink thread per algorithm, moving on only after every sink acknowledged the chunk.

use crossbeam_channel::{Receiver, Sender, bounded};
use rayon::prelude::*;
use std::any::Any;
use std::fs::File;
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crate::engine::registry::{Algorithm, AlgorithmSet, StreamingDigest};
use crate::error::DigestError;
use crate::pipeline::cancel::CancellationToken;
use crate::types::{Digests, FileTask};
use crate::utils::config::HashingConsts;

/// One broadcast chunk. `data` is shared by all sinks; only `data[..len]` is valid.
struct Chunk {
    data: Arc<Vec<u8>>,
    len: usize,
}

/// Per-chunk acknowledgement from a sink.
struct Ack {
    algorithm: Algorithm,
    outcome: Result<(), String>,
}

/// Computes every enabled digest for one file at a time. Cheap to share across workers.
#[derive(Clone, Debug)]
pub struct DigestEngine {
    algorithms: Arc<AlgorithmSet>,
    small_file_threshold: u64,
    chunk_size: usize,
}

impl DigestEngine {
    pub fn new(algorithms: Arc<AlgorithmSet>) -> Self {
        Self {
            algorithms,
            small_file_threshold: HashingConsts::SMALL_FILE_THRESHOLD,
            chunk_size: HashingConsts::CHUNK_SIZE,
        }
    }

    pub fn with_small_file_threshold(mut self, bytes: u64) -> Self {
        self.small_file_threshold = bytes;
        self
    }

    /// Zero is treated as 1.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn algorithms(&self) -> &AlgorithmSet {
        &self.algorithms
    }

    /// True when a file of `size` bytes takes the in-memory path.
    pub fn is_small(&self, size: u64) -> bool {
        size < self.small_file_threshold
    }

    /// Digest one enumerated file. The handle is opened here and closed on every return path.
    pub fn digest(&self, task: &FileTask, token: &CancellationToken) -> Result<Digests, DigestError> {
        if token.is_cancelled() {
            return Err(DigestError::Cancelled {
                path: task.path.clone(),
            });
        }
        let file = File::open(&task.path).map_err(|source| DigestError::Open {
            path: task.path.clone(),
            source,
        })?;
        if self.is_small(task.size_hint) {
            self.digest_small(&task.path, file, task.size_hint)
        } else {
            self.digest_reader(&task.path, file, token)
        }
    }

    /// Stat and digest a single path outside a pipeline.
    pub fn digest_file(&self, path: &Path) -> Result<Digests, DigestError> {
        let meta = std::fs::metadata(path).map_err(|source| DigestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let task = FileTask {
            path: path.to_path_buf(),
            size_hint: meta.len(),
        };
        self.digest(&task, &CancellationToken::never())
    }

    fn digest_small(&self, path: &Path, mut file: File, size: u64) -> Result<Digests, DigestError> {
        let mut data = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        file.read_to_end(&mut data)
            .map_err(|source| DigestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        drop(file);
        self.digest_bytes(path, &data)
    }

    /// Run every algorithm over an in-memory buffer, one rayon task per algorithm.
    /// `path` only labels errors.
    pub fn digest_bytes(&self, path: &Path, data: &[u8]) -> Result<Digests, DigestError> {
        self.algorithms
            .entries()
            .par_iter()
            .map(|&(algorithm, factory)| {
                panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut sink = factory();
                    sink.update(data);
                    sink.finalize()
                }))
                .map(|digest| (algorithm, digest))
                .map_err(|payload| sink_error(path, algorithm, panic_message(payload)))
            })
            .collect()
    }

    /// Stream `reader` to one sink thread per algorithm. Checks `token` before every chunk read.
    /// `path` only labels errors.
    pub fn digest_reader<R: Read>(
        &self,
        path: &Path,
        mut reader: R,
        token: &CancellationToken,
    ) -> Result<Digests, DigestError> {
        let entries = self.algorithms.entries();

        // Construct every sink up front so a failing constructor never leaves the
        // broadcaster waiting for an acknowledgement that cannot arrive.
        let mut sinks: Vec<(Algorithm, Box<dyn StreamingDigest>)> = Vec::with_capacity(entries.len());
        for &(algorithm, factory) in entries {
            let sink = panic::catch_unwind(factory)
                .map_err(|payload| sink_error(path, algorithm, panic_message(payload)))?;
            sinks.push((algorithm, sink));
        }

        thread::scope(|scope| {
            let (ack_tx, ack_rx) = bounded::<Ack>(sinks.len());
            let mut feeds = Vec::with_capacity(sinks.len());
            let mut handles = Vec::with_capacity(sinks.len());
            for (algorithm, sink) in sinks {
                let (chunk_tx, chunk_rx) = bounded::<Chunk>(1);
                let ack_tx = ack_tx.clone();
                feeds.push((algorithm, chunk_tx));
                handles.push((
                    algorithm,
                    scope.spawn(move || run_sink(algorithm, sink, chunk_rx, ack_tx)),
                ));
            }
            drop(ack_tx);

            let broadcast = broadcast(&mut reader, &feeds, &ack_rx, self.chunk_size, token, path);
            // End of stream (or abort): sinks finalize or exit.
            drop(feeds);

            let mut digests = Digests::new();
            let mut failure = None;
            for (algorithm, handle) in handles {
                match handle.join() {
                    Ok(Ok(digest)) => {
                        digests.insert(algorithm, digest);
                    }
                    Ok(Err(reason)) => {
                        failure.get_or_insert_with(|| sink_error(path, algorithm, reason));
                    }
                    Err(payload) => {
                        failure.get_or_insert_with(|| sink_error(path, algorithm, panic_message(payload)));
                    }
                }
            }
            broadcast?;
            match failure {
                Some(err) => Err(err),
                None => Ok(digests),
            }
        })
    }
}

/// Read chunks and fan each one out to every feed; wait for all acks before the next read.
fn broadcast<R: Read>(
    reader: &mut R,
    feeds: &[(Algorithm, Sender<Chunk>)],
    acks: &Receiver<Ack>,
    chunk_size: usize,
    token: &CancellationToken,
    path: &Path,
) -> Result<(), DigestError> {
    let mut buffer = Arc::new(vec![0u8; chunk_size]);
    loop {
        if token.is_cancelled() {
            return Err(DigestError::Cancelled {
                path: path.to_path_buf(),
            });
        }
        // Every sink dropped its clone before acking, so this never copies.
        let len = read_chunk(reader, Arc::make_mut(&mut buffer).as_mut_slice()).map_err(|source| DigestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if len == 0 {
            return Ok(());
        }
        for (algorithm, feed) in feeds {
            let chunk = Chunk {
                data: Arc::clone(&buffer),
                len,
            };
            if feed.send(chunk).is_err() {
                return Err(sink_error(path, *algorithm, "sink stopped".to_string()));
            }
        }
        for (algorithm, _) in feeds {
            match acks.recv() {
                Ok(Ack { outcome: Ok(()), .. }) => {}
                Ok(Ack {
                    algorithm,
                    outcome: Err(reason),
                }) => return Err(sink_error(path, algorithm, reason)),
                Err(_) => return Err(sink_error(path, *algorithm, "sink stopped".to_string())),
            }
        }
    }
}

/// Sink thread body: digest every chunk, ack it, finalize at end of stream.
fn run_sink(
    algorithm: Algorithm,
    mut sink: Box<dyn StreamingDigest>,
    chunks: Receiver<Chunk>,
    acks: Sender<Ack>,
) -> Result<Vec<u8>, String> {
    for chunk in chunks.iter() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.update(&chunk.data[..chunk.len])))
            .map_err(panic_message);
        drop(chunk);
        if let Err(reason) = outcome {
            let _ = acks.send(Ack {
                algorithm,
                outcome: Err(reason.clone()),
            });
            return Err(reason);
        }
        let _ = acks.send(Ack {
            algorithm,
            outcome: Ok(()),
        });
    }
    panic::catch_unwind(AssertUnwindSafe(move || sink.finalize())).map_err(panic_message)
}

fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

fn sink_error(path: &Path, algorithm: Algorithm, reason: String) -> DigestError {
    DigestError::Sink {
        path: path.to_path_buf(),
        algorithm,
        reason,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}
