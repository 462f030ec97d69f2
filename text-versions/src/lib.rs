mod cache;

pub use cache::{
    DocumentEvent, VersionCache, DEFAULT_VERSION_CAPACITY,
};
