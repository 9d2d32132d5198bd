use super::metadata::{EntryKind, Metadata};

/// Answer to "what do we know about this path".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Definitive. For a directory the listing is exhaustive as well.
    Complete(Metadata),
    /// A directory whose listing has only been partially probed.
    PartialDirectory,
    /// Nothing is known; the caller has to probe the filesystem.
    Unknown,
}

impl Lookup {
    /// Own metadata of the entry, if its type is known.
    pub fn metadata(&self) -> Option<Metadata> {
        match self {
            Lookup::Complete(metadata) => Some(metadata.clone()),
            Lookup::PartialDirectory => Some(Metadata::Directory),
            Lookup::Unknown => None,
        }
    }

    pub fn kind(&self) -> Option<EntryKind> {
        match self {
            Lookup::Complete(metadata) => Some(metadata.kind()),
            Lookup::PartialDirectory => Some(EntryKind::Directory),
            Lookup::Unknown => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Lookup::Complete(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Lookup::Unknown)
    }
}
