use std::{
    fmt, io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
};

use once_cell::sync::OnceCell;

use text_encoding::{
    CharRead, DecodingReader, StringReader, TextEncoding,
};
use text_error::{Result, TextError};

use crate::{
    checksum::Checksum,
    chunks::{self, ChunkStore, ResolveTarget},
    lines::{self, LineSpan},
};

/// Chunk capacity used by [`SourceText::from_string`], in characters.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(4096)
{
    Some(size) => size,
    None => unreachable!(),
};

/// Constructor-supplied document metadata, carried as-is.
///
/// Both paths are optional and independent of each other; the buffer
/// never validates or resolves them.
#[derive(Debug, Clone, Default)]
pub struct TextOptions {
    pub file_path: Option<PathBuf>,
    pub relative_path: Option<PathBuf>,
}

impl TextOptions {
    /// Options for a document loaded from `path`.
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        TextOptions {
            file_path: Some(path.into()),
            relative_path: None,
        }
    }
}

/// A random-access view over a character stream that is consumed
/// exactly once.
///
/// Content is pulled from the stream on demand into fixed-size chunks
/// and retained for the document's lifetime; the stream is never
/// rewound or re-read. Length, checksum and line boundaries resolve
/// lazily on first use and stay cached.
///
/// A document is freely shareable across threads. Resolution is
/// internally serialized, so concurrent first accesses cannot consume
/// the stream twice. A stream failure is permanent: every later
/// resolving call re-reports it rather than serving a partial prefix.
pub struct SourceText {
    encoding: TextEncoding,
    options: TextOptions,
    /// The not-yet-consumed stream; locked only while the frontier
    /// advances, `None` once the stream has ended or failed.
    source: Mutex<Option<Box<dyn CharRead + Send>>>,
    store: RwLock<ChunkStore>,
    checksum: OnceCell<Checksum>,
    lines: OnceCell<Vec<LineSpan>>,
}

impl SourceText {
    pub fn new(
        reader: impl CharRead + Send + 'static,
        encoding: TextEncoding,
        chunk_size: NonZeroUsize,
        options: TextOptions,
    ) -> Self {
        log::debug!(
            "Opening {} document (chunk size {}, path {:?})",
            encoding,
            chunk_size,
            options.file_path
        );
        SourceText {
            encoding,
            options,
            source: Mutex::new(Some(Box::new(reader))),
            store: RwLock::new(ChunkStore::new(chunk_size)),
            checksum: OnceCell::new(),
            lines: OnceCell::new(),
        }
    }

    /// Decode `reader` as `encoding` and buffer the characters.
    pub fn from_reader(
        reader: impl io::Read + Send + 'static,
        encoding: TextEncoding,
        chunk_size: NonZeroUsize,
        options: TextOptions,
    ) -> Self {
        Self::new(
            DecodingReader::new(reader, encoding),
            encoding,
            chunk_size,
            options,
        )
    }

    /// Buffer in-memory text. `encoding` still matters: it decides
    /// the byte representation the checksum digests.
    pub fn from_string(
        text: impl Into<String>,
        encoding: TextEncoding,
        options: TextOptions,
    ) -> Self {
        Self::new(
            StringReader::new(text),
            encoding,
            DEFAULT_CHUNK_SIZE,
            options,
        )
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.store.read().unwrap().chunk_size()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.options.file_path.as_deref()
    }

    pub fn relative_path(&self) -> Option<&Path> {
        self.options.relative_path.as_deref()
    }

    /// Total character count. Exhausts the stream on first call.
    pub fn len(&self) -> Result<usize> {
        self.ensure(ResolveTarget::End)?;
        Ok(self.store.read().unwrap().resolved())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The character at `index`, resolving the stream just far enough
    /// to answer. An index past the end is an error, never a clamp.
    pub fn char_at(&self, index: usize) -> Result<char> {
        self.ensure(ResolveTarget::UpTo(index))?;
        let store = self.store.read().unwrap();
        store.char_at(index).ok_or_else(|| TextError::OutOfBounds {
            index,
            len: store.resolved(),
        })
    }

    /// Copy `count` characters starting at `source_index` into
    /// `dest[dest_index..dest_index + count]`.
    ///
    /// A `count` of zero succeeds without validating the other
    /// arguments and leaves `dest` untouched. The copy walks chunk
    /// runs, so the range may straddle any number of chunk
    /// boundaries.
    pub fn copy_to(
        &self,
        source_index: usize,
        dest: &mut [char],
        dest_index: usize,
        count: usize,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let source_end =
            source_index.checked_add(count).ok_or_else(|| {
                TextError::InvalidRange(format!(
                    "copy of {} chars from {} overflows",
                    count, source_index
                ))
            })?;
        let dest_end = dest_index.checked_add(count).ok_or_else(|| {
            TextError::InvalidRange(format!(
                "copy of {} chars into {} overflows",
                count, dest_index
            ))
        })?;
        if dest_end > dest.len() {
            return Err(TextError::InvalidRange(format!(
                "destination range {}..{} exceeds capacity {}",
                dest_index,
                dest_end,
                dest.len()
            )));
        }
        self.ensure(ResolveTarget::UpTo(source_end - 1))?;
        let store = self.store.read().unwrap();
        if source_end > store.resolved() {
            return Err(TextError::OutOfBounds {
                index: source_end - 1,
                len: store.resolved(),
            });
        }
        store.copy_into(source_index, &mut dest[dest_index..dest_end]);
        Ok(())
    }

    /// BLAKE3 digest of the document's encoded byte representation.
    ///
    /// Computed once over the full content (re-encoded chunk by chunk
    /// with the document's encoding) and cached; every call returns
    /// its own copy of the 32 bytes. The digest depends on content
    /// and encoding only, never on the chunk size.
    pub fn checksum(&self) -> Result<Checksum> {
        let digest = self.checksum.get_or_try_init(|| -> Result<Checksum> {
            self.ensure(ResolveTarget::End)?;
            let store = self.store.read().unwrap();
            log::debug!(
                "Computing BLAKE3 checksum over {} chars as {}",
                store.resolved(),
                self.encoding
            );
            let mut hasher = blake3::Hasher::new();
            let mut encoded =
                Vec::with_capacity(store.chunk_size().get() * 4);
            for cells in store.chunk_slices() {
                encoded.clear();
                self.encoding
                    .encode_chars(cells.iter().copied(), &mut encoded);
                hasher.update(&encoded);
            }
            Ok(Checksum(*hasher.finalize().as_bytes()))
        })?;
        Ok(*digest)
    }

    /// Line spans in document order, built by a single lazy scan.
    ///
    /// `\n`, `\r\n` and bare `\r` each terminate a line (`\r\n` as
    /// one terminator, even split across chunks). A span is recorded
    /// per terminated segment plus one for non-empty trailing
    /// content: an empty document has no lines, and a document ending
    /// in a terminator has no trailing empty line.
    pub fn lines(&self) -> Result<&[LineSpan]> {
        let spans = self.lines.get_or_try_init(|| -> Result<Vec<LineSpan>> {
            self.ensure(ResolveTarget::End)?;
            let store = self.store.read().unwrap();
            log::debug!(
                "Scanning {} chars for line boundaries",
                store.resolved()
            );
            Ok(lines::scan(store.chars()))
        })?;
        Ok(spans.as_slice())
    }

    pub fn line_count(&self) -> Result<usize> {
        Ok(self.lines()?.len())
    }

    /// Advance the chunk frontier until `target` is answerable.
    ///
    /// Readers that only need already-resolved content never wait on
    /// the stream; at most one caller at a time consumes it.
    fn ensure(&self, target: ResolveTarget) -> Result<()> {
        if let Some(ready) = self.store.read().unwrap().check(target) {
            return ready;
        }
        let size = self.store.read().unwrap().chunk_size().get();
        let mut source = self.source.lock().unwrap();
        loop {
            if let Some(ready) = self.store.read().unwrap().check(target)
            {
                return ready;
            }
            let reader = match source.as_mut() {
                Some(reader) => reader,
                // The reader is dropped as soon as the stream ends;
                // nothing further can be resolved.
                None => return Ok(()),
            };
            match chunks::fill_chunk(reader.as_mut(), size) {
                Ok((chunk, saw_end)) => {
                    let mut store = self.store.write().unwrap();
                    if let Some(chunk) = chunk {
                        store.append(chunk);
                    }
                    if saw_end {
                        log::debug!(
                            "Stream exhausted: {} chars in {} chunks",
                            store.resolved(),
                            store.chunk_count()
                        );
                        store.mark_exhausted();
                        drop(store);
                        *source = None;
                    } else {
                        log::trace!(
                            "Resolved {} chars in {} chunks",
                            store.resolved(),
                            store.chunk_count()
                        );
                    }
                }
                Err(err) => {
                    log::debug!(
                        "Stream failed, poisoning document: {}",
                        err
                    );
                    self.store.write().unwrap().mark_failed(&err);
                    *source = None;
                    return Err(err);
                }
            }
        }
    }
}

impl fmt::Debug for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceText")
            .field("encoding", &self.encoding)
            .field("file_path", &self.options.file_path)
            .field("relative_path", &self.options.relative_path)
            .finish_non_exhaustive()
    }
}
