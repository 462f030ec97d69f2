//! # Text Encoding
//!
//! `text-encoding` names the byte encodings a source document can be
//! stored in and converts between encoded bytes and characters. It
//! also defines [`CharRead`], the forward-only character-stream seam
//! that the buffer crates consume, together with two implementations:
//! [`DecodingReader`] over any [`std::io::Read`], and [`StringReader`]
//! over in-memory text.

mod encoding;
mod reader;

pub use encoding::TextEncoding;
pub use reader::{CharRead, DecodingReader, StringReader};
