use std::{io, num::NonZeroUsize};

use text_encoding::CharRead;
use text_error::{Result, TextError};

/// How far a resolving call needs the chunk frontier to advance.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ResolveTarget {
    /// Through the character at this index.
    UpTo(usize),
    /// Until the stream is exhausted.
    End,
}

/// A fixed-capacity run of characters. Filled exactly once; only the
/// final chunk of a document may be partial.
pub(crate) struct Chunk {
    cells: Box<[char]>,
    len: usize,
}

impl Chunk {
    pub(crate) fn as_slice(&self) -> &[char] {
        &self.cells[..self.len]
    }
}

/// Pull one chunk's worth of characters from the stream.
///
/// Short reads are retried until the chunk is full or the stream
/// reports end, so a partial chunk always means exhaustion.
pub(crate) fn fill_chunk(
    reader: &mut dyn CharRead,
    size: usize,
) -> Result<(Option<Chunk>, bool)> {
    let mut cells = vec!['\0'; size].into_boxed_slice();
    let mut len = 0;
    let mut saw_end = false;
    while len < size {
        let read = reader.read_chars(&mut cells[len..])?;
        if read == 0 {
            saw_end = true;
            break;
        }
        len += read;
    }
    let chunk = if len > 0 { Some(Chunk { cells, len }) } else { None };
    Ok((chunk, saw_end))
}

/// A stream failure, recorded so that every later resolving call can
/// re-report it. The document never serves a partial prefix after its
/// stream has failed.
#[derive(Debug, Clone)]
pub(crate) enum StreamFailure {
    Io { kind: io::ErrorKind, message: String },
    Decode { encoding: String, offset: u64, reason: String },
    Other { message: String },
}

impl StreamFailure {
    pub(crate) fn record(err: &TextError) -> Self {
        match err {
            TextError::Io(io_err) => StreamFailure::Io {
                kind: io_err.kind(),
                message: io_err.to_string(),
            },
            TextError::Decode {
                encoding,
                offset,
                reason,
            } => StreamFailure::Decode {
                encoding: encoding.clone(),
                offset: *offset,
                reason: reason.clone(),
            },
            other => StreamFailure::Other {
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn to_error(&self) -> TextError {
        match self {
            StreamFailure::Io { kind, message } => {
                TextError::Io(io::Error::new(*kind, message.clone()))
            }
            StreamFailure::Decode {
                encoding,
                offset,
                reason,
            } => TextError::decode(
                encoding.clone(),
                *offset,
                reason.clone(),
            ),
            StreamFailure::Other { message } => TextError::Io(
                io::Error::new(io::ErrorKind::Other, message.clone()),
            ),
        }
    }
}

pub(crate) enum StoreStatus {
    /// The stream still has (or may have) characters to deliver.
    Streaming,
    /// The stream ended; `resolved` is the document length.
    Exhausted,
    /// The stream failed; the document is permanently unusable.
    Failed(StreamFailure),
}

/// The resolved portion of a document: an append-only sequence of
/// chunks plus the stream status. Never hands out unresolved
/// positions.
pub(crate) struct ChunkStore {
    chunk_size: NonZeroUsize,
    chunks: Vec<Chunk>,
    resolved: usize,
    status: StoreStatus,
}

impl ChunkStore {
    pub(crate) fn new(chunk_size: NonZeroUsize) -> Self {
        ChunkStore {
            chunk_size,
            chunks: Vec::new(),
            resolved: 0,
            status: StoreStatus::Streaming,
        }
    }

    pub(crate) fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    /// Characters materialized so far. Equals the document length
    /// once the status is `Exhausted`.
    pub(crate) fn resolved(&self) -> usize {
        self.resolved
    }

    pub(crate) fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether `target` can already be answered: `Some(Ok)` when the
    /// frontier suffices (or the stream has ended and bounds checking
    /// is the caller's concern), `Some(Err)` when the stream failed,
    /// `None` when resolution must continue.
    pub(crate) fn check(&self, target: ResolveTarget) -> Option<Result<()>> {
        match &self.status {
            StoreStatus::Failed(failure) => Some(Err(failure.to_error())),
            StoreStatus::Exhausted => Some(Ok(())),
            StoreStatus::Streaming => match target {
                ResolveTarget::UpTo(index) if index < self.resolved => {
                    Some(Ok(()))
                }
                _ => None,
            },
        }
    }

    pub(crate) fn append(&mut self, chunk: Chunk) {
        self.resolved += chunk.len;
        self.chunks.push(chunk);
    }

    pub(crate) fn mark_exhausted(&mut self) {
        self.status = StoreStatus::Exhausted;
    }

    pub(crate) fn mark_failed(&mut self, err: &TextError) {
        self.status = StoreStatus::Failed(StreamFailure::record(err));
    }

    pub(crate) fn char_at(&self, index: usize) -> Option<char> {
        if index >= self.resolved {
            return None;
        }
        let size = self.chunk_size.get();
        let chunk = &self.chunks[index / size];
        Some(chunk.cells[index % size])
    }

    /// Copy `out.len()` characters starting at `source_index`,
    /// run-by-run across chunk boundaries. The range must already be
    /// resolved and in bounds.
    pub(crate) fn copy_into(&self, source_index: usize, out: &mut [char]) {
        let size = self.chunk_size.get();
        let mut written = 0;
        while written < out.len() {
            let pos = source_index + written;
            let chunk = &self.chunks[pos / size];
            let offset = pos % size;
            let run = (chunk.len - offset).min(out.len() - written);
            out[written..written + run]
                .copy_from_slice(&chunk.cells[offset..offset + run]);
            written += run;
        }
    }

    /// All resolved characters in document order.
    pub(crate) fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.as_slice().iter().copied())
    }

    /// The resolved chunk contents, in order.
    pub(crate) fn chunk_slices(&self) -> impl Iterator<Item = &[char]> {
        self.chunks.iter().map(|chunk| chunk.as_slice())
    }
}
