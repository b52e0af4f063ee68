//! Host node types.

use std::rc::Rc;

use super::events::DomEvent;

// =============================================================================
// Node Handle
// =============================================================================

/// Handle to a node in the host document.
///
/// Slots are reused after a node is released; the generation makes stale
/// handles fail lookups instead of aliasing the new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot index (stable while the node is alive).
    pub fn index(self) -> u32 {
        self.index
    }
}

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Host event listener callback.
pub type Listener = Rc<dyn Fn(&DomEvent)>;

// =============================================================================
// Node Data
// =============================================================================

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with a lowercase tag name.
    Element { tag: String },
    /// Text leaf.
    Text { text: String },
}

pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Attributes in insertion order (`class` and `style` excluded from style).
    pub(crate) attributes: Vec<(String, String)>,
    /// Inline style declarations in order.
    pub(crate) style: Vec<(String, String)>,
    pub(crate) listeners: Vec<(ListenerId, String, Listener)>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            style: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// Mutation Journal
// =============================================================================

bitflags::bitflags! {
    /// Kinds of host mutations, combinable as a filter.
    ///
    /// `MutationKind::INSERT | MutationKind::REMOVE` selects structural changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MutationKind: u8 {
        const CREATE = 1 << 0;
        const INSERT = 1 << 1;
        const REMOVE = 1 << 2;
        const ATTRIBUTE = 1 << 3;
        const STYLE = 1 << 4;
        const TEXT = 1 << 5;
        const RELEASE = 1 << 6;
        const STRUCTURE = Self::INSERT.bits() | Self::REMOVE.bits();
    }
}

/// One recorded host mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub target: NodeId,
    pub kind: MutationKind,
    /// Attribute name for `ATTRIBUTE` mutations.
    pub name: Option<String>,
}
