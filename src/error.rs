//! Error types.
//!
//! Usage errors (missing parent node, invalid attribute names) are logged
//! at the call site and returned as `Err` without touching the document.
//! Structural errors (editing a child list the element does not own) are
//! returned the same way but indicate a bug in the calling component.

use thiserror::Error;

use crate::dom::NodeId;
use crate::element::Element;

/// Errors produced by element and document operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiError {
    /// The element handle refers to a destroyed (or never registered) element.
    #[error("element {0:?} is not alive")]
    DeadElement(Element),

    /// The operation needs a host node but the element has none yet.
    #[error("element {0:?} is not mounted")]
    NotMounted(Element),

    /// The host node handle is stale.
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// A child-list mutator was called on an element whose rendered
    /// children are not its own `options.children`.
    #[error("children of {0:?} are computed by render(); edit options.children via set_children instead")]
    ChildrenNotAuthoritative(Element),

    /// Attribute names must be non-empty and free of whitespace, quotes, `=`, `/` and `>`.
    #[error("invalid attribute name {0:?}")]
    InvalidAttributeName(String),

    /// Position outside the child list.
    #[error("child index {index} out of range (len {len})")]
    ChildIndexOutOfRange { index: usize, len: usize },

    /// The element is not a child of the given parent.
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: Element, child: Element },

    /// `reference` is not a child of `parent`.
    #[error("node {child:?} is not a child of node {parent:?}")]
    NotAChildNode { parent: NodeId, child: NodeId },

    /// Inserting the node there would create a cycle.
    #[error("node {0:?} cannot be inserted into its own subtree")]
    HierarchyCycle(NodeId),

    /// Text nodes cannot hold children.
    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, UiError>;
