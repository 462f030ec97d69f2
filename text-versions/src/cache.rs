use std::{
    collections::{HashMap, VecDeque},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{Arc, Weak},
};

use text_buffer::SourceText;

/// Versions retained per path unless a capacity is given explicitly.
pub const DEFAULT_VERSION_CAPACITY: NonZeroUsize =
    match NonZeroUsize::new(10) {
        Some(capacity) => capacity,
        None => unreachable!(),
    };

/// Project-state notifications the cache subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    Added,
    Opened,
    Closed,
    Removed,
}

/// One tracked version of a document.
struct VersionEntry {
    version: u64,
    /// The snapshot marked for this version, if any and still alive.
    snapshot: Weak<SourceText>,
}

/// Bounded per-path version bookkeeping for document snapshots.
///
/// Versions are tracked per file path, newest last, and the history
/// is bounded: tracking past capacity discards the oldest entry.
/// Snapshots are held weakly, so the cache never keeps a document
/// alive and an expired snapshot simply stops matching. A history is
/// dropped only on a `Closed` notification; the cache never looks at
/// buffer content.
pub struct VersionCache {
    /// Label for logging
    label: String,
    /// Maximum retained versions per path.
    capacity: NonZeroUsize,
    versions: HashMap<PathBuf, VecDeque<VersionEntry>>,
}

impl VersionCache {
    /// Creates a new cache instance.
    ///
    /// # Arguments
    /// * `label` - Identifier used in logs
    /// * `capacity` - Maximum tracked versions per path
    pub fn new(label: String, capacity: NonZeroUsize) -> Self {
        log::debug!(
            "cache/{}: initialized with {} versions per path",
            label,
            capacity
        );
        VersionCache {
            label,
            capacity,
            versions: HashMap::new(),
        }
    }

    /// Records `version` as the newest for `path`, discarding the
    /// oldest tracked version when the history is full.
    pub fn track_version(
        &mut self,
        path: impl Into<PathBuf>,
        version: u64,
    ) {
        let path = path.into();
        log::debug!(
            "cache/{}: tracking version {} for {}",
            self.label,
            version,
            path.display()
        );
        let history = self.versions.entry(path).or_default();
        while history.len() >= self.capacity.get() {
            if let Some(oldest) = history.pop_front() {
                log::debug!(
                    "cache/{}: discarding version {}",
                    self.label,
                    oldest.version
                );
            }
        }
        history.push_back(VersionEntry {
            version,
            snapshot: Weak::new(),
        });
    }

    /// Associates `snapshot` with the newest tracked version of its
    /// file path, replacing any snapshot marked there before.
    ///
    /// Documents without a file path cannot be tracked; marking one
    /// is a logged no-op, as is marking a path with no history.
    pub fn mark_latest(&mut self, snapshot: &Arc<SourceText>) {
        let path = match snapshot.file_path() {
            Some(path) => path,
            None => {
                log::warn!(
                    "cache/{}: document has no file path, not marked",
                    self.label
                );
                return;
            }
        };
        let latest = self
            .versions
            .get_mut(path)
            .and_then(|history| history.back_mut());
        match latest {
            Some(entry) => {
                log::debug!(
                    "cache/{}: marking version {} for {}",
                    self.label,
                    entry.version,
                    path.display()
                );
                entry.snapshot = Arc::downgrade(snapshot);
            }
            None => log::warn!(
                "cache/{}: no versions tracked for {}",
                self.label,
                path.display()
            ),
        }
    }

    /// The version previously associated with exactly this snapshot.
    ///
    /// Returns `None` when the snapshot was never marked, its entry
    /// was discarded or evicted, or the marked snapshot has since
    /// been dropped. Identity is pointer identity of the live `Arc`,
    /// so a dead entry can never match a reused allocation.
    pub fn try_get_version(
        &self,
        snapshot: &Arc<SourceText>,
    ) -> Option<u64> {
        let path = snapshot.file_path()?;
        let history = self.versions.get(path)?;
        let found = history.iter().rev().find_map(|entry| {
            let candidate = entry.snapshot.upgrade()?;
            if Arc::ptr_eq(&candidate, snapshot) {
                Some(entry.version)
            } else {
                None
            }
        });
        if found.is_none() {
            log::debug!(
                "cache/{}: no version for snapshot of {}",
                self.label,
                path.display()
            );
        }
        found
    }

    /// Tracked version count for `path`.
    pub fn tracked_versions(&self, path: &Path) -> usize {
        self.versions
            .get(path)
            .map(|history| history.len())
            .unwrap_or(0)
    }

    /// Project-state notification feed.
    ///
    /// Only `Closed` evicts the path's history; every other event is
    /// bookkeeping and leaves tracked versions untouched.
    pub fn on_document_event(&mut self, path: &Path, event: DocumentEvent) {
        log::debug!(
            "cache/{}: {:?} for {}",
            self.label,
            event,
            path.display()
        );
        if event == DocumentEvent::Closed {
            if let Some(history) = self.versions.remove(path) {
                log::debug!(
                    "cache/{}: evicted {} versions for {}",
                    self.label,
                    history.len(),
                    path.display()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use text_buffer::TextOptions;
    use text_encoding::TextEncoding;

    const DOC_PATH: &str = "/project/src/lib.rs";

    fn snapshot(path: &str, content: &str) -> Arc<SourceText> {
        Arc::new(SourceText::from_string(
            content,
            TextEncoding::Utf8,
            TextOptions::for_file(path),
        ))
    }

    fn test_cache(capacity: usize) -> VersionCache {
        let _ = env_logger::builder().is_test(true).try_init();
        VersionCache::new(
            "versions".to_string(),
            NonZeroUsize::new(capacity).expect("capacity must be positive"),
        )
    }

    #[test]
    fn test_track_and_mark_round_trip() {
        let mut cache = test_cache(3);
        cache.track_version(DOC_PATH, 1);

        let snap = snapshot(DOC_PATH, "fn main() {}");
        cache.mark_latest(&snap);

        assert_eq!(cache.try_get_version(&snap), Some(1));
    }

    #[test]
    fn test_capacity_discards_oldest() {
        let mut cache = test_cache(3);
        cache.track_version(DOC_PATH, 1);
        let first = snapshot(DOC_PATH, "v1");
        cache.mark_latest(&first);

        for version in 2..=4 {
            cache.track_version(DOC_PATH, version);
        }

        // Version 1 fell off the front; its snapshot is unknown now.
        assert_eq!(cache.tracked_versions(Path::new(DOC_PATH)), 3);
        assert_eq!(cache.try_get_version(&first), None);
    }

    #[test]
    fn test_only_closed_evicts() {
        let mut cache = test_cache(3);
        cache.track_version(DOC_PATH, 7);
        let snap = snapshot(DOC_PATH, "content");
        cache.mark_latest(&snap);

        let path = Path::new(DOC_PATH);
        for event in [
            DocumentEvent::Added,
            DocumentEvent::Opened,
            DocumentEvent::Removed,
        ] {
            cache.on_document_event(path, event);
            assert_eq!(cache.try_get_version(&snap), Some(7));
        }

        cache.on_document_event(path, DocumentEvent::Closed);
        assert_eq!(cache.try_get_version(&snap), None);
        assert_eq!(cache.tracked_versions(path), 0);
    }

    #[test]
    fn test_dead_snapshot_never_matches() {
        let mut cache = test_cache(3);
        cache.track_version(DOC_PATH, 1);

        let first = snapshot(DOC_PATH, "original");
        cache.mark_latest(&first);
        drop(first);

        // A fresh snapshot of the same path must not alias the dead
        // entry.
        let second = snapshot(DOC_PATH, "original");
        assert_eq!(cache.try_get_version(&second), None);

        cache.mark_latest(&second);
        assert_eq!(cache.try_get_version(&second), Some(1));
    }

    #[test]
    fn test_unmarked_snapshot_has_no_version() {
        let mut cache = test_cache(3);
        cache.track_version(DOC_PATH, 1);
        let marked = snapshot(DOC_PATH, "marked");
        cache.mark_latest(&marked);

        let unmarked = snapshot(DOC_PATH, "unmarked");
        assert_eq!(cache.try_get_version(&unmarked), None);
    }

    #[test]
    fn test_document_without_path_is_skipped() {
        let mut cache = test_cache(3);
        cache.track_version(DOC_PATH, 1);

        let pathless = Arc::new(SourceText::from_string(
            "anonymous",
            TextEncoding::Utf8,
            TextOptions::default(),
        ));
        cache.mark_latest(&pathless);
        assert_eq!(cache.try_get_version(&pathless), None);
    }

    #[test]
    fn test_histories_are_per_path() {
        let mut cache = test_cache(3);
        cache.track_version("/a.rs", 1);
        let a = snapshot("/a.rs", "a");
        cache.mark_latest(&a);

        cache.track_version("/b.rs", 5);
        let b = snapshot("/b.rs", "b");
        cache.mark_latest(&b);

        cache.on_document_event(Path::new("/a.rs"), DocumentEvent::Closed);
        assert_eq!(cache.try_get_version(&a), None);
        assert_eq!(cache.try_get_version(&b), Some(5));
    }

    #[test]
    fn test_marking_again_replaces_the_snapshot() {
        let mut cache = test_cache(3);
        cache.track_version(DOC_PATH, 1);
        let earlier = snapshot(DOC_PATH, "one");
        cache.mark_latest(&earlier);

        cache.track_version(DOC_PATH, 2);
        let later = snapshot(DOC_PATH, "two");
        cache.mark_latest(&later);

        // Both versions keep their own snapshots.
        assert_eq!(cache.try_get_version(&earlier), Some(1));
        assert_eq!(cache.try_get_version(&later), Some(2));

        // Re-marking version 2 forgets its previous snapshot.
        let replacement = snapshot(DOC_PATH, "two prime");
        cache.mark_latest(&replacement);
        assert_eq!(cache.try_get_version(&later), None);
        assert_eq!(cache.try_get_version(&replacement), Some(2));
    }

    #[test]
    fn test_marking_before_tracking_is_a_no_op() {
        let mut cache = test_cache(3);
        let snap = snapshot(DOC_PATH, "early bird");
        cache.mark_latest(&snap);
        assert_eq!(cache.try_get_version(&snap), None);
        assert_eq!(cache.tracked_versions(Path::new(DOC_PATH)), 0);
    }
}
