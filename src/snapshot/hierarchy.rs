use std::sync::Arc;

use super::children::ChildSet;
use super::lookup::Lookup;
use super::metadata::Metadata;
use super::node::{Node, SnapshotNode};
use super::segment::CaseSensitivity;

/// What a probe reported for the last segment of a stored path.
enum Observation {
    Entry(Metadata),
    /// Full listing of a directory.
    Listing(Vec<(Arc<str>, Metadata)>),
}

impl Observation {
    fn is_missing(&self) -> bool {
        matches!(self, Observation::Entry(Metadata::Missing))
    }

    fn merge_into(&self, existing: Option<&Arc<Node>>, case: CaseSensitivity) -> Arc<Node> {
        match self {
            Observation::Entry(Metadata::Directory) => merge_directory(existing),
            Observation::Entry(metadata) => merge_leaf(existing, metadata),
            Observation::Listing(entries) => merge_listing(existing, entries, case),
        }
    }
}

enum Invalidation {
    Unchanged,
    Replaced(Arc<Node>),
    Removed,
}

/// One immutable version of the snapshot tree.
///
/// The root stands for the base directory all paths are relative to. Nothing
/// is recorded about the base itself, so an absent top-level entry is always
/// unknown. Updates return a new version that shares every untouched subtree
/// with `self`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHierarchy {
    case_sensitivity: CaseSensitivity,
    root: ChildSet,
}

impl SnapshotHierarchy {
    pub fn empty(case_sensitivity: CaseSensitivity) -> Self {
        Self {
            case_sensitivity,
            root: ChildSet::new(),
        }
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case_sensitivity
    }

    pub fn root(&self) -> &ChildSet {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Whether `other` is the same version, i.e. an update turned out to be a no-op.
    pub fn shares_root_with(&self, other: &SnapshotHierarchy) -> bool {
        self.root.ptr_eq(&other.root)
    }

    /// Records `metadata` for `path`. Newer observations overwrite contradicting knowledge.
    ///
    /// Panics if `path` is empty.
    pub fn store<S: AsRef<str>>(&self, path: &[S], metadata: Metadata) -> Self {
        self.apply_store(path, &Observation::Entry(metadata))
    }

    /// Records that `path` is a directory containing exactly `entries`.
    ///
    /// Knowledge already held about listed subdirectories is kept, entries
    /// not in the listing are dropped. Panics if `path` is empty.
    pub fn store_listing<S, N, I>(&self, path: &[S], entries: I) -> Self
    where
        S: AsRef<str>,
        N: AsRef<str>,
        I: IntoIterator<Item = (N, Metadata)>,
    {
        let listing = entries
            .into_iter()
            .map(|(name, metadata)| (Arc::from(name.as_ref()), metadata))
            .collect();
        self.apply_store(path, &Observation::Listing(listing))
    }

    fn apply_store<S: AsRef<str>>(&self, path: &[S], observation: &Observation) -> Self {
        assert_non_empty(path);
        match store_in_children(&self.root, path, observation, self.case_sensitivity) {
            Some(root) => self.with_root(root),
            None => self.clone(),
        }
    }

    /// Forgets everything at and below `path`. Panics if `path` is empty.
    pub fn invalidate<S: AsRef<str>>(&self, path: &[S]) -> Self {
        assert_non_empty(path);
        match invalidate_in_children(&self.root, path, self.case_sensitivity) {
            Some(root) => self.with_root(root),
            None => self.clone(),
        }
    }

    pub fn invalidate_all(&self) -> Self {
        Self::empty(self.case_sensitivity)
    }

    /// Answers from recorded knowledge only. Panics if `path` is empty.
    pub fn query<S: AsRef<str>>(&self, path: &[S]) -> Lookup {
        assert_non_empty(path);

        let mut children = &self.root;
        let mut listing_complete = false;
        let mut current: Option<&Arc<Node>> = None;

        for segment in path {
            if let Some(node) = current {
                if node.is_leaf() {
                    return Lookup::Complete(Metadata::Missing);
                }
                children = node.children();
                listing_complete = node.is_complete();
            }

            match children.get(segment.as_ref(), self.case_sensitivity) {
                Some(node) => current = Some(node),
                None if listing_complete => return Lookup::Complete(Metadata::Missing),
                None => return Lookup::Unknown,
            }
        }

        current.map_or(Lookup::Unknown, |node| node.lookup())
    }

    /// Depth-first walk in name order, handing each node its path from the root.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&[&str], &Node),
    {
        let mut path = Vec::new();
        visit_children(&self.root, &mut path, &mut visitor);
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.visit(|_, _| count += 1);
        count
    }

    fn with_root(&self, root: ChildSet) -> Self {
        Self {
            case_sensitivity: self.case_sensitivity,
            root,
        }
    }
}

fn assert_non_empty<S>(path: &[S]) {
    assert!(
        !path.is_empty(),
        "snapshot paths must have at least one segment"
    );
}

fn visit_children<'a, F>(children: &'a ChildSet, path: &mut Vec<&'a str>, visitor: &mut F)
where
    F: FnMut(&[&str], &Node),
{
    for child in children {
        path.push(child.name());
        let node: &Node = child.node();
        visitor(path.as_slice(), node);
        visit_children(node.children(), path, visitor);
        path.pop();
    }
}

/// Stores below `children`. Returns `None` if the tree already said as much.
fn store_in_children<S: AsRef<str>>(
    children: &ChildSet,
    path: &[S],
    observation: &Observation,
    case: CaseSensitivity,
) -> Option<ChildSet> {
    let (segment, rest) = path.split_first()?;
    let segment = segment.as_ref();

    let existing = children.get(segment, case);
    let updated = store_at(existing, rest, observation, case);
    if existing.is_some_and(|node| Arc::ptr_eq(node, &updated)) {
        return None;
    }
    Some(children.insert_or_replace(segment, updated, case))
}

/// Computes the node replacing `existing` when storing `rest` below it.
fn store_at<S: AsRef<str>>(
    existing: Option<&Arc<Node>>,
    rest: &[S],
    observation: &Observation,
    case: CaseSensitivity,
) -> Arc<Node> {
    let Some((segment, below)) = rest.split_first() else {
        return observation.merge_into(existing, case);
    };

    match existing {
        Some(node) => store_below(node, rest, observation, case),
        None => Arc::new(Node::unknown(ChildSet::single(
            segment.as_ref(),
            store_at(None, below, observation, case),
        ))),
    }
}

fn store_below<S: AsRef<str>>(
    node: &Arc<Node>,
    path: &[S],
    observation: &Observation,
    case: CaseSensitivity,
) -> Arc<Node> {
    if node.is_leaf() {
        if observation.is_missing() {
            return Arc::clone(node);
        }
        // Something exists beneath a file or missing entry: the entry changed since it was probed.
        return store_at(None, path, observation, case);
    }

    let listed = path
        .first()
        .is_some_and(|segment| node.children().get(segment.as_ref(), case).is_some());
    let base = match (node.is_complete(), listed) {
        (true, false) if observation.is_missing() => return Arc::clone(node),
        (true, false) => Arc::new(node.demoted()),
        _ => Arc::clone(node),
    };

    match store_in_children(base.children(), path, observation, case) {
        Some(children) => Arc::new(base.with_children(children)),
        None => base,
    }
}

fn merge_leaf(existing: Option<&Arc<Node>>, metadata: &Metadata) -> Arc<Node> {
    match existing {
        Some(node) if node.is_leaf() && node.own_metadata() == Some(metadata) => Arc::clone(node),
        _ => Arc::new(Node::complete(metadata.clone())),
    }
}

fn merge_directory(existing: Option<&Arc<Node>>) -> Arc<Node> {
    let Some(node) = existing else {
        return Arc::new(Node::partial_directory(ChildSet::new()));
    };

    match node.as_ref() {
        Node::PartialDirectory(_) => Arc::clone(node),
        Node::Complete(complete) if complete.metadata().is_directory() => Arc::clone(node),
        Node::Unknown(unknown) => Arc::new(Node::partial_directory(unknown.children().clone())),
        Node::Complete(_) => Arc::new(Node::partial_directory(ChildSet::new())),
    }
}

fn merge_listing(
    existing: Option<&Arc<Node>>,
    entries: &[(Arc<str>, Metadata)],
    case: CaseSensitivity,
) -> Arc<Node> {
    let previous = existing.map(|node| node.children());
    let children = entries
        .iter()
        .filter(|(_, metadata)| !metadata.is_missing())
        .map(|(name, metadata)| {
            let known = previous.and_then(|children| children.get(name, case));
            let node = match metadata {
                Metadata::Directory => merge_directory(known),
                _ => merge_leaf(known, metadata),
            };
            (Arc::clone(name), node)
        });
    let children = ChildSet::from_unsorted(children, case);

    match existing {
        Some(node)
            if node.own_metadata() == Some(&Metadata::Directory)
                && node.children() == &children =>
        {
            Arc::clone(node)
        }
        _ => Arc::new(Node::complete_directory(children)),
    }
}

/// Invalidates below `children`. Returns `None` if nothing was recorded there.
fn invalidate_in_children<S: AsRef<str>>(
    children: &ChildSet,
    path: &[S],
    case: CaseSensitivity,
) -> Option<ChildSet> {
    let (segment, rest) = path.split_first()?;
    let segment = segment.as_ref();
    let existing = children.get(segment, case)?;

    if rest.is_empty() {
        return Some(children.remove(segment, case));
    }

    match invalidate_below(existing, rest, case) {
        Invalidation::Unchanged => None,
        Invalidation::Replaced(node) => Some(children.insert_or_replace(segment, node, case)),
        Invalidation::Removed => Some(children.remove(segment, case)),
    }
}

fn invalidate_below<S: AsRef<str>>(
    node: &Arc<Node>,
    path: &[S],
    case: CaseSensitivity,
) -> Invalidation {
    if node.is_leaf() {
        // A change beneath a file or missing entry means the entry itself is stale.
        return Invalidation::Removed;
    }

    let listed = path
        .first()
        .is_some_and(|segment| node.children().get(segment.as_ref(), case).is_some());
    if node.is_complete() && !listed {
        // The listing did not know about the changed entry.
        return Invalidation::Replaced(Arc::new(node.demoted()));
    }

    let Some(children) = invalidate_in_children(node.children(), path, case) else {
        return Invalidation::Unchanged;
    };

    let lost_entry = children.len() < node.children().len();
    let rebuilt = if children.is_empty() {
        match node.demoted().with_all_children_removed() {
            Some(rebuilt) => rebuilt,
            None => return Invalidation::Removed,
        }
    } else if lost_entry {
        node.demoted().with_children(children)
    } else {
        node.with_children(children)
    };

    Invalidation::Replaced(Arc::new(rebuilt))
}
