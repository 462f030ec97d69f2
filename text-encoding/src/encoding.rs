use core::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use text_error::TextError;

/// Identifies the byte encoding of a source document.
///
/// The variant fixes the byte order explicitly, so the encoded byte
/// sequence of a given character sequence is fully determined by the
/// (content, encoding) pair. No byte-order mark is ever written by
/// [`TextEncoding::encode_chars`] and none is consumed by
/// [`crate::DecodingReader`]; a leading U+FEFF in a stream is ordinary
/// content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl TextEncoding {
    /// Canonical lowercase name of the encoding.
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Utf32Le => "utf-32le",
            TextEncoding::Utf32Be => "utf-32be",
        }
    }

    /// Width in bytes of one code unit, the granularity at which a
    /// stream in this encoding can be cut.
    pub fn unit_width(&self) -> usize {
        match self {
            TextEncoding::Utf8 => 1,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
            TextEncoding::Utf32Le | TextEncoding::Utf32Be => 4,
        }
    }

    /// Encoded width in bytes of a single character.
    pub fn encoded_len(&self, ch: char) -> usize {
        match self {
            TextEncoding::Utf8 => ch.len_utf8(),
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
                ch.len_utf16() * 2
            }
            TextEncoding::Utf32Le | TextEncoding::Utf32Be => 4,
        }
    }

    /// Append the encoded bytes of `chars` to `out`.
    ///
    /// Encoding a character sequence is infallible: every `char` is a
    /// Unicode scalar value and has a representation in all supported
    /// encodings.
    pub fn encode_chars<I>(&self, chars: I, out: &mut Vec<u8>)
    where
        I: IntoIterator<Item = char>,
    {
        match self {
            TextEncoding::Utf8 => {
                let mut buf = [0u8; 4];
                for ch in chars {
                    out.extend_from_slice(
                        ch.encode_utf8(&mut buf).as_bytes(),
                    );
                }
            }
            TextEncoding::Utf16Le => {
                encode_utf16(chars, out, u16::to_le_bytes)
            }
            TextEncoding::Utf16Be => {
                encode_utf16(chars, out, u16::to_be_bytes)
            }
            TextEncoding::Utf32Le => {
                encode_utf32(chars, out, u32::to_le_bytes)
            }
            TextEncoding::Utf32Be => {
                encode_utf32(chars, out, u32::to_be_bytes)
            }
        }
    }
}

fn encode_utf16<I>(chars: I, out: &mut Vec<u8>, pack: fn(u16) -> [u8; 2])
where
    I: IntoIterator<Item = char>,
{
    let mut units = [0u16; 2];
    for ch in chars {
        for unit in ch.encode_utf16(&mut units) {
            out.extend_from_slice(&pack(*unit));
        }
    }
}

fn encode_utf32<I>(chars: I, out: &mut Vec<u8>, pack: fn(u32) -> [u8; 4])
where
    I: IntoIterator<Item = char>,
{
    for ch in chars {
        out.extend_from_slice(&pack(ch as u32));
    }
}

impl Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = TextError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-16le" | "utf16le" => Ok(TextEncoding::Utf16Le),
            "utf-16be" | "utf16be" => Ok(TextEncoding::Utf16Be),
            "utf-32le" | "utf32le" => Ok(TextEncoding::Utf32Le),
            "utf-32be" | "utf32be" => Ok(TextEncoding::Utf32Be),
            _ => Err(TextError::Parse),
        }
    }
}
