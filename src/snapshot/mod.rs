//! Immutable, structurally shared snapshot of what is known about a directory tree.
//!
//! Each node records one of three degrees of knowledge: complete, a directory
//! with only some children probed, or nothing at all beyond the children below
//! it. Updates produce new versions that share every untouched subtree with the
//! previous one; [`FileSystemState`] publishes versions to concurrent readers.

mod children;
mod hierarchy;
mod lookup;
mod metadata;
mod node;
mod segment;
mod state;

pub use children::{Child, ChildSet};
pub use hierarchy::SnapshotHierarchy;
pub use lookup::Lookup;
pub use metadata::{EntryKind, FileFingerprint, Metadata};
pub use node::{CompleteNode, Node, PartialDirectoryNode, SnapshotNode, UnknownNode};
pub use segment::{CaseSensitivity, PathParseError, RelativePath};
pub use state::FileSystemState;
