//! Host document - an in-memory node tree with DOM semantics.
//!
//! Nodes live in a thread-local arena with a free-slot pool, the same way
//! component indices are pooled. Every change that actually alters the tree
//! is appended to a mutation journal; writes of an unchanged value are not
//! recorded, which is what makes redraw idempotence observable.

use std::cell::RefCell;

use crate::error::{Result, UiError};

use super::node::{ListenerId, Mutation, MutationKind, NodeData, NodeId, NodeKind};

// =============================================================================
// Document State
// =============================================================================

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

pub(crate) struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    body: Option<NodeId>,
    journal: Vec<Mutation>,
    next_listener_id: u64,
}

impl Document {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            body: None,
            journal: Vec::new(),
            next_listener_id: 0,
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
            .ok_or(UiError::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
            .ok_or(UiError::UnknownNode(id))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData::new(kind);
        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(data);
            NodeId { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, data: Some(data) });
            NodeId { index, generation: 0 }
        };
        self.record(id, MutationKind::CREATE, None);
        id
    }

    fn record(&mut self, target: NodeId, kind: MutationKind, name: Option<&str>) {
        self.journal.push(Mutation {
            target,
            kind,
            name: name.map(str::to_string),
        });
    }

    pub(crate) fn next_listener_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        id
    }

    /// Unlink `child` from its parent (no-op if detached).
    fn detach(&mut self, child: NodeId) -> Result<()> {
        let parent = self.get(child)?.parent;
        if let Some(parent) = parent {
            let siblings = &mut self.get_mut(parent)?.children;
            siblings.retain(|&c| c != child);
            self.get_mut(child)?.parent = None;
            self.record(child, MutationKind::REMOVE, None);
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.get(id).ok().and_then(|n| n.parent);
        }
        false
    }
}

thread_local! {
    static DOCUMENT: RefCell<Document> = RefCell::new(Document::new());
}

pub(crate) fn with_document<R>(f: impl FnOnce(&Document) -> R) -> R {
    DOCUMENT.with(|doc| f(&doc.borrow()))
}

pub(crate) fn with_document_mut<R>(f: impl FnOnce(&mut Document) -> R) -> R {
    DOCUMENT.with(|doc| f(&mut doc.borrow_mut()))
}

// =============================================================================
// Creation
// =============================================================================

/// The document body (created on first use).
pub fn body() -> NodeId {
    with_document_mut(|doc| {
        if let Some(body) = doc.body {
            if doc.get(body).is_ok() {
                return body;
            }
        }
        let body = doc.alloc(NodeKind::Element { tag: "body".to_string() });
        doc.body = Some(body);
        body
    })
}

/// Create a detached element node.
pub fn create_element(tag: &str) -> NodeId {
    with_document_mut(|doc| doc.alloc(NodeKind::Element { tag: tag.to_ascii_lowercase() }))
}

/// Create a detached text node.
pub fn create_text(text: &str) -> NodeId {
    with_document_mut(|doc| doc.alloc(NodeKind::Text { text: text.to_string() }))
}

/// Check whether a handle refers to a live node.
pub fn exists(node: NodeId) -> bool {
    with_document(|doc| doc.get(node).is_ok())
}

// =============================================================================
// Tree Structure
// =============================================================================

/// Append `child` as the last child of `parent`, moving it if attached elsewhere.
pub fn append_child(parent: NodeId, child: NodeId) -> Result<()> {
    insert_before(parent, child, None)
}

/// Insert `child` into `parent` before `reference` (append when `None`).
///
/// Moves `child` if it is already attached. Inserting a node before itself
/// leaves the tree unchanged.
pub fn insert_before(parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
    with_document_mut(|doc| {
        if matches!(doc.get(parent)?.kind, NodeKind::Text { .. }) {
            return Err(UiError::NotAContainer(parent));
        }
        doc.get(child)?;
        if doc.is_ancestor_or_self(child, parent) {
            return Err(UiError::HierarchyCycle(child));
        }
        if reference == Some(child) {
            return Ok(());
        }
        if let Some(reference) = reference {
            if doc.get(reference)?.parent != Some(parent) {
                return Err(UiError::NotAChildNode { parent, child: reference });
            }
        }

        // Already in place: no mutation.
        let siblings = &doc.get(parent)?.children;
        if let Some(pos) = siblings.iter().position(|&c| c == child) {
            let next = siblings.get(pos + 1).copied();
            if next == reference {
                return Ok(());
            }
        }

        doc.detach(child)?;
        let siblings = &mut doc.get_mut(parent)?.children;
        let pos = match reference {
            Some(reference) => siblings
                .iter()
                .position(|&c| c == reference)
                .unwrap_or(siblings.len()),
            None => siblings.len(),
        };
        siblings.insert(pos, child);
        doc.get_mut(child)?.parent = Some(parent);
        doc.record(child, MutationKind::INSERT, None);
        Ok(())
    })
}

/// Detach `node` from its parent. The node stays alive.
pub fn remove_node(node: NodeId) -> Result<()> {
    with_document_mut(|doc| doc.detach(node))
}

/// Detach and free `node` and everything below it.
pub fn release_node(node: NodeId) -> Result<()> {
    with_document_mut(|doc| {
        doc.detach(node)?;
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(slot) = doc.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(data) = slot.data.take() {
                stack.extend(data.children);
                slot.generation = slot.generation.wrapping_add(1);
                doc.free.push(id.index);
                doc.record(id, MutationKind::RELEASE, None);
            }
        }
        Ok(())
    })
}

/// Parent of `node`, if attached.
pub fn parent_node(node: NodeId) -> Option<NodeId> {
    with_document(|doc| doc.get(node).ok().and_then(|n| n.parent))
}

/// Child nodes in order.
pub fn child_nodes(node: NodeId) -> Vec<NodeId> {
    with_document(|doc| doc.get(node).map(|n| n.children.clone()).unwrap_or_default())
}

/// First child of `node`.
pub fn first_child(node: NodeId) -> Option<NodeId> {
    with_document(|doc| doc.get(node).ok().and_then(|n| n.children.first().copied()))
}

/// Next sibling of `node`.
pub fn next_sibling(node: NodeId) -> Option<NodeId> {
    with_document(|doc| {
        let parent = doc.get(node).ok()?.parent?;
        let siblings = &doc.get(parent).ok()?.children;
        let pos = siblings.iter().position(|&c| c == node)?;
        siblings.get(pos + 1).copied()
    })
}

/// Whether `node` is attached under the document body.
pub fn is_connected(node: NodeId) -> bool {
    let Some(body) = with_document(|doc| doc.body) else {
        return false;
    };
    with_document(|doc| doc.is_ancestor_or_self(body, node))
}

// =============================================================================
// Node Content
// =============================================================================

/// Node kind (tag or text).
pub fn node_kind(node: NodeId) -> Option<NodeKind> {
    with_document(|doc| doc.get(node).ok().map(|n| n.kind.clone()))
}

/// Tag name of an element node.
pub fn tag_name(node: NodeId) -> Option<String> {
    with_document(|doc| match &doc.get(node).ok()?.kind {
        NodeKind::Element { tag } => Some(tag.clone()),
        NodeKind::Text { .. } => None,
    })
}

/// Concatenated text of `node` and its descendants.
pub fn text_content(node: NodeId) -> String {
    fn collect(doc: &Document, node: NodeId, out: &mut String) {
        let Ok(data) = doc.get(node) else { return };
        match &data.kind {
            NodeKind::Text { text } => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in &data.children {
                    collect(doc, child, out);
                }
            }
        }
    }
    let mut out = String::new();
    with_document(|doc| collect(doc, node, &mut out));
    out
}

/// Replace the text of a text node. Returns whether it changed.
pub fn set_text(node: NodeId, value: &str) -> Result<bool> {
    with_document_mut(|doc| {
        let data = doc.get_mut(node)?;
        match &mut data.kind {
            NodeKind::Text { text } if *text != value => {
                *text = value.to_string();
                doc.record(node, MutationKind::TEXT, None);
                Ok(true)
            }
            NodeKind::Text { .. } => Ok(false),
            NodeKind::Element { .. } => Err(UiError::NotAContainer(node)),
        }
    })
}

// =============================================================================
// Attributes
// =============================================================================

/// Read an attribute.
pub fn get_attribute(node: NodeId, name: &str) -> Option<String> {
    with_document(|doc| doc.get(node).ok()?.attribute(name).map(str::to_string))
}

/// Whether an attribute is present.
pub fn has_attribute(node: NodeId, name: &str) -> bool {
    get_attribute(node, name).is_some()
}

/// Attribute names in insertion order.
pub fn attribute_names(node: NodeId) -> Vec<String> {
    with_document(|doc| {
        doc.get(node)
            .map(|n| n.attributes.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    })
}

/// Write an attribute. Returns whether the stored value changed.
pub fn set_attribute(node: NodeId, name: &str, value: &str) -> Result<bool> {
    with_document_mut(|doc| {
        let data = doc.get_mut(node)?;
        match data.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, current)) if *current == value => return Ok(false),
            Some((_, current)) => *current = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }
        doc.record(node, MutationKind::ATTRIBUTE, Some(name));
        Ok(true)
    })
}

/// Remove an attribute. Returns whether it was present.
pub fn remove_attribute(node: NodeId, name: &str) -> Result<bool> {
    with_document_mut(|doc| {
        let data = doc.get_mut(node)?;
        let before = data.attributes.len();
        data.attributes.retain(|(n, _)| n != name);
        let removed = data.attributes.len() != before;
        if removed {
            doc.record(node, MutationKind::ATTRIBUTE, Some(name));
        }
        Ok(removed)
    })
}

// =============================================================================
// Inline Style
// =============================================================================

/// Inline style declarations in order.
pub fn style(node: NodeId) -> Vec<(String, String)> {
    with_document(|doc| doc.get(node).map(|n| n.style.clone()).unwrap_or_default())
}

/// Read one inline style property.
pub fn style_property(node: NodeId, property: &str) -> Option<String> {
    with_document(|doc| {
        doc.get(node)
            .ok()?
            .style
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.clone())
    })
}

/// Replace the whole inline style. Returns whether it changed.
pub fn set_style(node: NodeId, declarations: Vec<(String, String)>) -> Result<bool> {
    with_document_mut(|doc| {
        let data = doc.get_mut(node)?;
        if data.style == declarations {
            return Ok(false);
        }
        data.style = declarations;
        doc.record(node, MutationKind::STYLE, None);
        Ok(true)
    })
}

/// Set a single inline style property. Returns whether it changed.
pub fn set_style_property(node: NodeId, property: &str, value: &str) -> Result<bool> {
    with_document_mut(|doc| {
        let data = doc.get_mut(node)?;
        match data.style.iter_mut().find(|(k, _)| k == property) {
            Some((_, current)) if *current == value => return Ok(false),
            Some((_, current)) => *current = value.to_string(),
            None => data.style.push((property.to_string(), value.to_string())),
        }
        doc.record(node, MutationKind::STYLE, None);
        Ok(true)
    })
}

// =============================================================================
// Mutation Journal
// =============================================================================

/// Number of recorded mutations since the last clear.
pub fn mutation_count() -> usize {
    with_document(|doc| doc.journal.len())
}

/// Number of recorded mutations whose kind intersects `kinds`.
pub fn count_mutations(kinds: MutationKind) -> usize {
    with_document(|doc| doc.journal.iter().filter(|m| m.kind.intersects(kinds)).count())
}

/// Drain the journal.
pub fn take_mutations() -> Vec<Mutation> {
    with_document_mut(|doc| std::mem::take(&mut doc.journal))
}

/// Discard the journal.
pub fn clear_mutations() {
    with_document_mut(|doc| doc.journal.clear());
}

/// Drop every node, listener and journal entry (for testing).
pub fn reset_document() {
    with_document_mut(|doc| *doc = Document::new());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() {
        reset_document();
    }

    #[test]
    fn test_append_and_order() {
        setup();
        let root = create_element("DIV");
        let a = create_element("span");
        let b = create_text("hi");

        append_child(root, a).unwrap();
        append_child(root, b).unwrap();

        assert_eq!(tag_name(root).as_deref(), Some("div"));
        assert_eq!(child_nodes(root), vec![a, b]);
        assert_eq!(first_child(root), Some(a));
        assert_eq!(next_sibling(a), Some(b));
        assert_eq!(next_sibling(b), None);
        assert_eq!(parent_node(b), Some(root));
    }

    #[test]
    fn test_insert_before_moves_node() {
        setup();
        let root = create_element("ul");
        let a = create_element("li");
        let b = create_element("li");
        append_child(root, a).unwrap();
        append_child(root, b).unwrap();

        insert_before(root, b, Some(a)).unwrap();
        assert_eq!(child_nodes(root), vec![b, a]);

        // Already in place
        clear_mutations();
        insert_before(root, b, Some(a)).unwrap();
        insert_before(root, a, None).unwrap();
        assert_eq!(mutation_count(), 0);
    }

    #[test]
    fn test_insert_rejects_foreign_reference_and_cycles() {
        setup();
        let root = create_element("div");
        let other = create_element("div");
        let child = create_element("p");
        append_child(other, child).unwrap();

        let stray = create_element("p");
        assert_eq!(
            insert_before(root, stray, Some(child)),
            Err(UiError::NotAChildNode { parent: root, child })
        );

        append_child(root, other).unwrap();
        assert_eq!(append_child(child, root), Err(UiError::HierarchyCycle(root)));

        let text = create_text("x");
        assert_eq!(append_child(text, stray), Err(UiError::NotAContainer(text)));
    }

    #[test]
    fn test_attribute_writes_are_change_tracked() {
        setup();
        let node = create_element("input");
        clear_mutations();

        assert!(set_attribute(node, "value", "1").unwrap());
        assert!(!set_attribute(node, "value", "1").unwrap());
        assert!(set_attribute(node, "value", "2").unwrap());
        assert_eq!(get_attribute(node, "value").as_deref(), Some("2"));
        assert_eq!(count_mutations(MutationKind::ATTRIBUTE), 2);

        assert!(remove_attribute(node, "value").unwrap());
        assert!(!remove_attribute(node, "value").unwrap());
        assert!(!has_attribute(node, "value"));
    }

    #[test]
    fn test_release_invalidates_handles() {
        setup();
        let root = create_element("div");
        let child = create_element("span");
        append_child(root, child).unwrap();

        release_node(root).unwrap();
        assert!(!exists(root));
        assert!(!exists(child));

        // Slot reuse does not resurrect the old handle
        let fresh = create_element("div");
        assert!(exists(fresh));
        assert!(!exists(root) || fresh != root);
        assert_eq!(get_attribute(root, "id"), None);
    }

    #[test]
    fn test_text_content_and_style() {
        setup();
        let p = create_element("p");
        let t1 = create_text("Hello, ");
        let b = create_element("b");
        let t2 = create_text("world");
        append_child(p, t1).unwrap();
        append_child(p, b).unwrap();
        append_child(b, t2).unwrap();
        assert_eq!(text_content(p), "Hello, world");

        assert!(set_text(t2, "there").unwrap());
        assert!(!set_text(t2, "there").unwrap());
        assert_eq!(text_content(p), "Hello, there");

        assert!(set_style(p, vec![("color".into(), "red".into())]).unwrap());
        assert!(!set_style(p, vec![("color".into(), "red".into())]).unwrap());
        assert!(set_style_property(p, "width", "10px").unwrap());
        assert_eq!(style_property(p, "width").as_deref(), Some("10px"));
    }

    #[test]
    fn test_body_is_connected() {
        setup();
        let b = body();
        assert_eq!(body(), b);
        let div = create_element("div");
        assert!(!is_connected(div));
        append_child(b, div).unwrap();
        assert!(is_connected(div));
        remove_node(div).unwrap();
        assert!(!is_connected(div));
        assert!(exists(div));
    }
}
