mod checksum;
mod chunks;
mod lines;
mod source_text;

pub use checksum::{Checksum, CHECKSUM_LEN};
pub use lines::LineSpan;
pub use source_text::{
    SourceText, TextOptions, DEFAULT_CHUNK_SIZE,
};
