use std::io::Read;

use text_error::{Result, TextError};

use crate::TextEncoding;

const DECODE_BUFFER_CAPACITY: usize = 8 * 1024;

/// Longest encoded form of one character across the supported
/// encodings (4 bytes: a UTF-8 tail, a surrogate pair, a UTF-32 unit).
const MAX_SEQUENCE_LEN: usize = 4;

/// A forward-only character stream.
///
/// Implementations yield each character exactly once, in order. There
/// is no seek and no re-read: whatever a consumer needs to revisit it
/// must retain itself. `Ok(0)` for a non-empty `out` means the stream
/// is exhausted, mirroring [`std::io::Read`].
pub trait CharRead {
    /// Read up to `out.len()` characters into `out`, returning how
    /// many were written.
    fn read_chars(&mut self, out: &mut [char]) -> Result<usize>;
}

/// A [`CharRead`] over owned in-memory text.
pub struct StringReader {
    text: String,
    pos: usize,
}

impl StringReader {
    pub fn new(text: impl Into<String>) -> Self {
        StringReader {
            text: text.into(),
            pos: 0,
        }
    }
}

impl CharRead for StringReader {
    fn read_chars(&mut self, out: &mut [char]) -> Result<usize> {
        let mut written = 0;
        for ch in self.text[self.pos..].chars() {
            if written == out.len() {
                break;
            }
            out[written] = ch;
            written += 1;
            self.pos += ch.len_utf8();
        }
        Ok(written)
    }
}

/// Decodes a byte stream into characters according to a
/// [`TextEncoding`], incrementally and strictly forward.
///
/// Sequences split across read boundaries — a UTF-8 tail, a surrogate
/// pair, a partially delivered code unit — are reassembled
/// transparently. Malformed input and a truncated final sequence are
/// reported as [`TextError::Decode`] carrying the absolute byte
/// offset of the offending sequence.
pub struct DecodingReader<R> {
    inner: R,
    encoding: TextEncoding,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    /// Absolute stream offset of `buf[start]`.
    offset: u64,
    eof: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: TextEncoding) -> Self {
        log::debug!("Decoding character stream as {}", encoding);
        DecodingReader {
            inner,
            encoding,
            buf: vec![0u8; DECODE_BUFFER_CAPACITY].into_boxed_slice(),
            start: 0,
            end: 0,
            offset: 0,
            eof: false,
        }
    }

    fn available(&self) -> usize {
        self.end - self.start
    }

    /// Compact the undecoded tail to the front of the buffer and pull
    /// bytes from the inner reader until a full sequence is available
    /// or the stream ends.
    fn fill(&mut self) -> Result<()> {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        while self.available() < MAX_SEQUENCE_LEN {
            let read = self.inner.read(&mut self.buf[self.end..])?;
            if read == 0 {
                self.eof = true;
                break;
            }
            self.end += read;
        }
        Ok(())
    }

    fn take(&mut self, width: usize) {
        self.start += width;
        self.offset += width as u64;
    }

    fn truncated(&self, what: &str) -> TextError {
        TextError::decode(
            self.encoding.name(),
            self.offset,
            format!("stream ends inside {}", what),
        )
    }

    fn scalar(&self, value: u32) -> Result<char> {
        char::from_u32(value).ok_or_else(|| {
            TextError::decode(
                self.encoding.name(),
                self.offset,
                format!("0x{:X} is not a Unicode scalar value", value),
            )
        })
    }

    /// Decode the next character from the buffered window.
    ///
    /// `fill` has already run, so fewer available bytes than the
    /// sequence needs can only mean the stream ended mid-sequence.
    fn decode_one(&mut self) -> Result<char> {
        match self.encoding {
            TextEncoding::Utf8 => self.decode_utf8(),
            TextEncoding::Utf16Le => self.decode_utf16(u16::from_le_bytes),
            TextEncoding::Utf16Be => self.decode_utf16(u16::from_be_bytes),
            TextEncoding::Utf32Le => self.decode_utf32(u32::from_le_bytes),
            TextEncoding::Utf32Be => self.decode_utf32(u32::from_be_bytes),
        }
    }

    fn decode_utf8(&mut self) -> Result<char> {
        let lead = self.buf[self.start];
        let width = match lead {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => {
                return Err(TextError::decode(
                    self.encoding.name(),
                    self.offset,
                    format!("invalid leading byte 0x{:02X}", lead),
                ));
            }
        };
        if self.available() < width {
            return Err(self.truncated("a multi-byte sequence"));
        }
        let bytes = &self.buf[self.start..self.start + width];
        let decoded = std::str::from_utf8(bytes).map_err(|_| {
            TextError::decode(
                self.encoding.name(),
                self.offset,
                "malformed UTF-8 sequence",
            )
        })?;
        let ch = decoded.chars().next().ok_or_else(|| {
            TextError::decode(
                self.encoding.name(),
                self.offset,
                "empty UTF-8 sequence",
            )
        })?;
        self.take(width);
        Ok(ch)
    }

    fn decode_utf16(&mut self, unpack: fn([u8; 2]) -> u16) -> Result<char> {
        if self.available() < 2 {
            return Err(self.truncated("a UTF-16 code unit"));
        }
        let unit =
            unpack([self.buf[self.start], self.buf[self.start + 1]]);
        match unit {
            0xD800..=0xDBFF => {
                if self.available() < 4 {
                    return Err(self.truncated("a surrogate pair"));
                }
                let low = unpack([
                    self.buf[self.start + 2],
                    self.buf[self.start + 3],
                ]);
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(TextError::decode(
                        self.encoding.name(),
                        self.offset,
                        format!("unpaired high surrogate 0x{:04X}", unit),
                    ));
                }
                let value = 0x10000
                    + ((u32::from(unit) - 0xD800) << 10)
                    + (u32::from(low) - 0xDC00);
                let ch = self.scalar(value)?;
                self.take(4);
                Ok(ch)
            }
            0xDC00..=0xDFFF => Err(TextError::decode(
                self.encoding.name(),
                self.offset,
                format!("unpaired low surrogate 0x{:04X}", unit),
            )),
            _ => {
                let ch = self.scalar(u32::from(unit))?;
                self.take(2);
                Ok(ch)
            }
        }
    }

    fn decode_utf32(&mut self, unpack: fn([u8; 4]) -> u32) -> Result<char> {
        if self.available() < 4 {
            return Err(self.truncated("a UTF-32 code unit"));
        }
        let value = unpack([
            self.buf[self.start],
            self.buf[self.start + 1],
            self.buf[self.start + 2],
            self.buf[self.start + 3],
        ]);
        let ch = self.scalar(value)?;
        self.take(4);
        Ok(ch)
    }
}

impl<R: Read> CharRead for DecodingReader<R> {
    fn read_chars(&mut self, out: &mut [char]) -> Result<usize> {
        let mut written = 0;
        while written < out.len() {
            if self.available() < MAX_SEQUENCE_LEN && !self.eof {
                self.fill()?;
            }
            if self.available() == 0 {
                break;
            }
            out[written] = self.decode_one()?;
            written += 1;
        }
        Ok(written)
    }
}
