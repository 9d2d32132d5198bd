use std::time::SystemTime;

use derive_more::{Display, From};

/// Opaque content hash of a regular file, computed by whoever probed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From)]
#[display("{_0:016x}")]
pub struct FileFingerprint(u64);

impl FileFingerprint {
    pub fn new(hash: u64) -> Self {
        Self(hash)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EntryKind {
    #[display("file")]
    RegularFile,
    #[display("directory")]
    Directory,
    #[display("missing")]
    Missing,
}

/// Complete knowledge about the type of a single filesystem entry.
///
/// `Directory` only records that the entry is a directory. Whether its
/// children are fully known is a property of the node holding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Metadata {
    RegularFile {
        size: u64,
        last_modified: SystemTime,
        fingerprint: FileFingerprint,
    },
    Directory,
    Missing,
}

impl Metadata {
    pub fn regular_file(
        size: u64,
        last_modified: SystemTime,
        fingerprint: impl Into<FileFingerprint>,
    ) -> Self {
        Metadata::RegularFile {
            size,
            last_modified,
            fingerprint: fingerprint.into(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Metadata::RegularFile { .. } => EntryKind::RegularFile,
            Metadata::Directory => EntryKind::Directory,
            Metadata::Missing => EntryKind::Missing,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Metadata::Directory)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Metadata::Missing)
    }

    /// Whether anything may exist beneath this entry.
    pub fn can_have_children(&self) -> bool {
        self.is_directory()
    }
}
