use std::slice;
use std::sync::Arc;

use super::node::Node;
use super::segment::CaseSensitivity;

/// A named entry in a node's child set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    name: Arc<str>,
    node: Arc<Node>,
}

impl Child {
    pub fn new(name: impl Into<Arc<str>>, node: Arc<Node>) -> Self {
        Self {
            name: name.into(),
            node,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }
}

/// Immutable children of a node, sorted by name under the tree's [`CaseSensitivity`].
///
/// Every update returns a new set. The backing slice is reference counted, so
/// cloning a set is cheap and unchanged sets can be recognised with [`ChildSet::ptr_eq`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSet {
    entries: Arc<[Child]>,
}

impl Default for ChildSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ChildSet {
    pub fn new() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
        }
    }

    pub fn single(name: impl Into<Arc<str>>, node: Arc<Node>) -> Self {
        Self {
            entries: Arc::from(vec![Child::new(name, node)]),
        }
    }

    /// Builds a set from entries in any order. When names collide the last entry wins.
    pub fn from_unsorted<N>(
        entries: impl IntoIterator<Item = (N, Arc<Node>)>,
        case_sensitivity: CaseSensitivity,
    ) -> Self
    where
        N: Into<Arc<str>>,
    {
        let mut sorted = entries
            .into_iter()
            .map(|(name, node)| Child::new(name, node))
            .collect::<Vec<_>>();
        sorted.sort_by(|left, right| case_sensitivity.compare(&left.name, &right.name));

        let mut unique: Vec<Child> = Vec::with_capacity(sorted.len());
        for child in sorted {
            match unique.last_mut() {
                Some(last) if case_sensitivity.equals(&last.name, &child.name) => *last = child,
                _ => unique.push(child),
            }
        }

        Self {
            entries: Arc::from(unique),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Child> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Child] {
        &self.entries
    }

    /// Whether both sets share the same backing storage.
    pub fn ptr_eq(&self, other: &ChildSet) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Binary search for `segment`. `Err` carries the insertion point.
    pub fn find(&self, segment: &str, case_sensitivity: CaseSensitivity) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|child| case_sensitivity.compare(&child.name, segment))
    }

    pub fn get(&self, segment: &str, case_sensitivity: CaseSensitivity) -> Option<&Arc<Node>> {
        self.find(segment, case_sensitivity)
            .ok()
            .map(|index| &self.entries[index].node)
    }

    /// Splits the set around the entry matching `segment`.
    pub fn partition_by_prefix(
        &self,
        segment: &str,
        case_sensitivity: CaseSensitivity,
    ) -> (&[Child], Option<&Child>, &[Child]) {
        match self.find(segment, case_sensitivity) {
            Ok(index) => (
                &self.entries[..index],
                Some(&self.entries[index]),
                &self.entries[index + 1..],
            ),
            Err(index) => (&self.entries[..index], None, &self.entries[index..]),
        }
    }

    /// Returns a new set where `segment` maps to `node`. Other entries are shared.
    pub fn insert_or_replace(
        &self,
        segment: &str,
        node: Arc<Node>,
        case_sensitivity: CaseSensitivity,
    ) -> ChildSet {
        let (before, existing, after) = self.partition_by_prefix(segment, case_sensitivity);
        // Reuse the stored name when the spelling did not change.
        let name = match existing {
            Some(child) if &*child.name == segment => Arc::clone(&child.name),
            _ => Arc::from(segment),
        };

        let mut entries = Vec::with_capacity(before.len() + 1 + after.len());
        entries.extend_from_slice(before);
        entries.push(Child { name, node });
        entries.extend_from_slice(after);

        Self {
            entries: Arc::from(entries),
        }
    }

    /// Returns a set without `segment`, or a clone of `self` if it is absent.
    pub fn remove(&self, segment: &str, case_sensitivity: CaseSensitivity) -> ChildSet {
        match self.partition_by_prefix(segment, case_sensitivity) {
            (before, Some(_), after) => {
                let mut entries = Vec::with_capacity(before.len() + after.len());
                entries.extend_from_slice(before);
                entries.extend_from_slice(after);
                Self {
                    entries: Arc::from(entries),
                }
            }
            (_, None, _) => self.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a ChildSet {
    type Item = &'a Child;
    type IntoIter = slice::Iter<'a, Child>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
