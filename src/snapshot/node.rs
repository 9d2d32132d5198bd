use super::children::ChildSet;
use super::lookup::Lookup;
use super::metadata::Metadata;

/// Behaviour shared by every degree of knowledge a node can carry.
pub trait SnapshotNode {
    /// Metadata of the node itself, only present when it is fully known.
    fn own_metadata(&self) -> Option<&Metadata>;
    fn children(&self) -> &ChildSet;
    /// Same kind of node with `children` in place of the current ones.
    fn with_children(&self, children: ChildSet) -> Node;
    /// Same kind of node with nothing probed beneath it, or `None` if that
    /// would leave a node without any information.
    fn with_all_children_removed(&self) -> Option<Node>;
}

/// Own type and, for directories, the exhaustive list of children are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteNode {
    metadata: Metadata,
    children: ChildSet,
}

impl CompleteNode {
    fn new(metadata: Metadata, children: ChildSet) -> Self {
        assert!(
            children.is_empty() || metadata.can_have_children(),
            "a complete {} node cannot have children",
            metadata.kind()
        );
        Self { metadata, children }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl SnapshotNode for CompleteNode {
    fn own_metadata(&self) -> Option<&Metadata> {
        Some(&self.metadata)
    }

    fn children(&self) -> &ChildSet {
        &self.children
    }

    fn with_children(&self, children: ChildSet) -> Node {
        Node::Complete(CompleteNode::new(self.metadata.clone(), children))
    }

    fn with_all_children_removed(&self) -> Option<Node> {
        Some(Node::Complete(CompleteNode::new(
            self.metadata.clone(),
            ChildSet::new(),
        )))
    }
}

/// Known to be a directory; only the probed children are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDirectoryNode {
    children: ChildSet,
}

impl SnapshotNode for PartialDirectoryNode {
    fn own_metadata(&self) -> Option<&Metadata> {
        None
    }

    fn children(&self) -> &ChildSet {
        &self.children
    }

    fn with_children(&self, children: ChildSet) -> Node {
        Node::partial_directory(children)
    }

    fn with_all_children_removed(&self) -> Option<Node> {
        Some(Node::partial_directory(ChildSet::new()))
    }
}

/// Own type unknown. Exists only to hold children probed beneath it, so it is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNode {
    children: ChildSet,
}

impl SnapshotNode for UnknownNode {
    fn own_metadata(&self) -> Option<&Metadata> {
        None
    }

    fn children(&self) -> &ChildSet {
        &self.children
    }

    fn with_children(&self, children: ChildSet) -> Node {
        Node::unknown(children)
    }

    fn with_all_children_removed(&self) -> Option<Node> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Complete(CompleteNode),
    PartialDirectory(PartialDirectoryNode),
    Unknown(UnknownNode),
}

impl Node {
    /// A leaf whose own type is fully known. Directories built this way are known to be empty.
    pub fn complete(metadata: Metadata) -> Self {
        Node::Complete(CompleteNode::new(metadata, ChildSet::new()))
    }

    pub fn missing() -> Self {
        Node::complete(Metadata::Missing)
    }

    /// A directory whose listing is exactly `children`.
    pub fn complete_directory(children: ChildSet) -> Self {
        Node::Complete(CompleteNode::new(Metadata::Directory, children))
    }

    pub fn partial_directory(children: ChildSet) -> Self {
        Node::PartialDirectory(PartialDirectoryNode { children })
    }

    /// Panics if `children` is empty: such a node carries no information.
    pub fn unknown(children: ChildSet) -> Self {
        assert!(
            !children.is_empty(),
            "an unknown node must have at least one child"
        );
        Node::Unknown(UnknownNode { children })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Node::Complete(_))
    }

    /// Whether nothing can exist beneath this node (a complete file or missing entry).
    pub fn is_leaf(&self) -> bool {
        match self {
            Node::Complete(complete) => !complete.metadata.can_have_children(),
            Node::PartialDirectory(_) | Node::Unknown(_) => false,
        }
    }

    /// A complete directory loses its claim to an exhaustive listing. Other nodes are unchanged.
    pub fn demoted(&self) -> Node {
        match self {
            Node::Complete(complete) if complete.metadata.is_directory() => {
                Node::partial_directory(complete.children.clone())
            }
            _ => self.clone(),
        }
    }

    /// What this node says about its own path.
    pub fn lookup(&self) -> Lookup {
        match self {
            Node::Complete(complete) => Lookup::Complete(complete.metadata.clone()),
            Node::PartialDirectory(_) => Lookup::PartialDirectory,
            Node::Unknown(_) => Lookup::Unknown,
        }
    }
}

impl SnapshotNode for Node {
    fn own_metadata(&self) -> Option<&Metadata> {
        match self {
            Node::Complete(node) => node.own_metadata(),
            Node::PartialDirectory(node) => node.own_metadata(),
            Node::Unknown(node) => node.own_metadata(),
        }
    }

    fn children(&self) -> &ChildSet {
        match self {
            Node::Complete(node) => node.children(),
            Node::PartialDirectory(node) => node.children(),
            Node::Unknown(node) => node.children(),
        }
    }

    fn with_children(&self, children: ChildSet) -> Node {
        match self {
            Node::Complete(node) => node.with_children(children),
            Node::PartialDirectory(node) => node.with_children(children),
            Node::Unknown(node) => node.with_children(children),
        }
    }

    fn with_all_children_removed(&self) -> Option<Node> {
        match self {
            Node::Complete(node) => node.with_all_children_removed(),
            Node::PartialDirectory(node) => node.with_all_children_removed(),
            Node::Unknown(node) => node.with_all_children_removed(),
        }
    }
}
