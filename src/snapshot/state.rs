use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use tracing::{debug, trace};

use super::hierarchy::SnapshotHierarchy;
use super::lookup::Lookup;
use super::metadata::Metadata;
use super::segment::CaseSensitivity;

/// Shared holder of the current [`SnapshotHierarchy`].
///
/// Readers never block. Writers compute a new version off the current root and
/// publish it with a compare-and-swap, retrying against the newer root when
/// another writer got there first.
#[derive(Debug)]
pub struct FileSystemState {
    root: ArcSwap<SnapshotHierarchy>,
}

impl Default for FileSystemState {
    fn default() -> Self {
        Self::new(CaseSensitivity::default())
    }
}

impl FileSystemState {
    pub fn new(case_sensitivity: CaseSensitivity) -> Self {
        Self {
            root: ArcSwap::from_pointee(SnapshotHierarchy::empty(case_sensitivity)),
        }
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.root.load().case_sensitivity()
    }

    /// The current version. It stays valid and unchanged while later updates are published.
    pub fn snapshot(&self) -> Arc<SnapshotHierarchy> {
        self.root.load_full()
    }

    pub fn query<S: AsRef<str>>(&self, path: &[S]) -> Lookup {
        self.root.load().query(path)
    }

    pub fn store<S: AsRef<str>>(&self, path: &[S], metadata: Metadata) {
        self.update("store", |root| root.store(path, metadata.clone()));
    }

    pub fn store_listing<S, N, I>(&self, path: &[S], entries: I)
    where
        S: AsRef<str>,
        N: AsRef<str>,
        I: IntoIterator<Item = (N, Metadata)>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, metadata)| (name.as_ref().to_owned(), metadata))
            .collect::<Vec<_>>();
        self.update("store_listing", |root| {
            root.store_listing(path, entries.iter().map(|(name, metadata)| (name, metadata.clone())))
        });
    }

    pub fn invalidate<S: AsRef<str>>(&self, path: &[S]) {
        self.update("invalidate", |root| root.invalidate(path));
    }

    pub fn invalidate_all(&self) {
        self.update("invalidate_all", SnapshotHierarchy::invalidate_all);
    }

    fn update<F>(&self, operation: &str, apply: F)
    where
        F: Fn(&SnapshotHierarchy) -> SnapshotHierarchy,
    {
        let mut current = self.root.load_full();
        let mut attempts = 1;
        loop {
            let updated = apply(&current);
            if updated.shares_root_with(&current) {
                debug!("{operation} left the snapshot unchanged");
                return;
            }

            let updated = Arc::new(updated);
            let previous = self.root.compare_and_swap(&current, Arc::clone(&updated));
            if Arc::ptr_eq(&*previous, &current) {
                trace!("{operation} published after {attempts} attempt(s)");
                return;
            }

            trace!("{operation} lost a race against a concurrent update, retrying");
            current = Guard::into_inner(previous);
            attempts += 1;
        }
    }
}
