//! Keyed reconciliation scenarios, checked through the document's
//! mutation journal.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;

use spark_dom::dom::{self, Mutation, MutationKind};
use spark_dom::{
    mount_root, reset_runtime, tag, Child, Children, Component, Element, ElementDesc, Options,
};

fn setup() {
    reset_runtime();
}

fn item(key: &str) -> ElementDesc {
    tag("li").key(key).child(key.to_uppercase())
}

fn list(keys: &[&str]) -> Element {
    mount_root(tag("ul").children(keys.iter().map(|k| item(k))), dom::body()).unwrap()
}

fn html(element: Element) -> String {
    dom::inner_html(element.node().unwrap())
}

// =============================================================================
// Reordering / Insertion / Removal
// =============================================================================

#[test]
fn swap_preserves_nodes() {
    setup();
    let root = list(&["a", "b"]);
    let before = root.children();
    let nodes: Vec<_> = before.iter().map(|c| c.node().unwrap()).collect();
    dom::clear_mutations();

    root.set_children([item("b"), item("a")]).unwrap();

    let after = root.children();
    assert_eq!(after, vec![before[1], before[0]]);
    assert_eq!(dom::child_nodes(root.node().unwrap()), vec![nodes[1], nodes[0]]);
    assert_eq!(dom::count_mutations(MutationKind::CREATE | MutationKind::RELEASE), 0);
    assert!(before.iter().all(|c| c.is_alive()));
    assert_eq!(html(root), "<li>B</li><li>A</li>");
}

#[test]
fn append_mounts_after_existing() {
    setup();
    let root = list(&["a"]);
    let a = root.children()[0];
    let a_node = a.node().unwrap();
    dom::clear_mutations();

    root.set_children([item("a"), item("b")]).unwrap();

    let children = root.children();
    assert_eq!(children[0], a);
    assert_eq!(dom::next_sibling(a_node), children[1].node());
    // li + text for "b", nothing released
    assert_eq!(dom::count_mutations(MutationKind::CREATE), 2);
    assert_eq!(dom::count_mutations(MutationKind::RELEASE), 0);
    assert_eq!(html(root), "<li>A</li><li>B</li>");
}

#[test]
fn removal_destroys_missing_child() {
    setup();
    let root = list(&["a", "b"]);
    let b = root.children()[1];
    let b_node = b.node().unwrap();

    root.set_children([item("a")]).unwrap();

    assert!(!b.is_alive());
    assert!(!dom::exists(b_node));
    assert_eq!(root.children().len(), 1);
    assert_eq!(html(root), "<li>A</li>");
}

#[test]
fn insertion_in_the_middle() {
    setup();
    let root = list(&["a", "c"]);
    let old = root.children();

    root.set_children([item("a"), item("b"), item("c")]).unwrap();

    let children = root.children();
    assert_eq!(children[0], old[0]);
    assert_eq!(children[2], old[1]);
    assert_eq!(html(root), "<li>A</li><li>B</li><li>C</li>");
}

#[test]
fn reverse_of_many() {
    setup();
    let keys = ["a", "b", "c", "d", "e"];
    let root = list(&keys);
    let old = root.children();
    dom::clear_mutations();

    root.set_children(keys.iter().rev().map(|k| item(k))).unwrap();

    let mut expected = old.clone();
    expected.reverse();
    assert_eq!(root.children(), expected);
    assert_eq!(dom::count_mutations(MutationKind::CREATE | MutationKind::RELEASE), 0);
    assert_eq!(
        html(root),
        "<li>E</li><li>D</li><li>C</li><li>B</li><li>A</li>"
    );
}

#[test]
fn kind_change_recreates() {
    setup();
    let root = mount_root(tag("div").child(tag("span").key("x")), dom::body()).unwrap();
    let span = root.children()[0];

    root.set_children([tag("em").key("x")]).unwrap();

    assert!(!span.is_alive());
    assert_eq!(html(root), "<em></em>");
}

#[test]
fn text_children_are_patched_in_place() {
    setup();
    let root = mount_root(tag("p").child("hello"), dom::body()).unwrap();
    let text_node = root.children()[0].node().unwrap();

    root.set_children(["world"]).unwrap();

    assert_eq!(root.children()[0].node(), Some(text_node));
    assert_eq!(dom::text_content(root.node().unwrap()), "world");
}

// =============================================================================
// Idempotence / Fast Path
// =============================================================================

#[test]
fn redraw_with_identical_descriptions_is_silent() {
    setup();
    let build = || {
        [
            tag("li").key("a").class("first").attr("title", "A").child("A"),
            tag("li").key("b").style("width", 10).child("B"),
        ]
    };
    let root = mount_root(tag("ul").children(build()), dom::body()).unwrap();
    dom::clear_mutations();

    root.set_children(build()).unwrap();
    assert_eq!(dom::take_mutations(), Vec::<Mutation>::new());

    root.redraw();
    assert_eq!(dom::mutation_count(), 0);
}

struct Fixed {
    children: Children,
    renders: Cell<usize>,
}

impl Component for Fixed {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn render(&self, _element: Element, _options: &Options) -> Children {
        self.renders.set(self.renders.get() + 1);
        self.children.clone()
    }
}

#[test]
fn fast_path_redraws_children_without_matching() {
    setup();
    let children: Children = Rc::new(vec![item("a").into(), item("b").into()]);
    let root = mount_root(
        ElementDesc::new(Fixed {
            children,
            renders: Cell::new(0),
        }),
        dom::body(),
    )
    .unwrap();
    let before = root.children();
    dom::clear_mutations();

    assert!(root.redraw());
    assert!(root.redraw());

    assert_eq!(root.children(), before);
    let structural = MutationKind::CREATE | MutationKind::RELEASE | MutationKind::STRUCTURE;
    assert_eq!(dom::count_mutations(structural), 0);
    assert_eq!(root.with_component(|f: &Fixed| f.renders.get()), Some(3));
}

// =============================================================================
// Keys
// =============================================================================

#[test]
fn duplicate_existing_keys_last_wins() {
    setup();
    let root = mount_root(
        tag("ul").children([item("a").class("first"), item("a").class("second")]),
        dom::body(),
    )
    .unwrap();
    let old = root.children();
    assert_eq!(old.len(), 2);

    root.set_children([item("a")]).unwrap();

    assert_eq!(root.children(), vec![old[1]]);
    assert!(!old[0].is_alive());
    assert!(!old[1].has_class("second"));
}

#[test]
fn duplicate_new_keys_only_last_claims() {
    setup();
    let root = list(&["a"]);
    let a = root.children()[0];

    root.set_children([item("a").class("one"), item("a").class("two")]).unwrap();

    let children = root.children();
    assert_eq!(children.len(), 2);
    assert_ne!(children[0], a);
    assert_eq!(children[1], a);
    assert!(a.has_class("two"));
    assert_eq!(html(root), "<li class=\"one\">A</li><li class=\"two\">A</li>");
}

#[test]
fn positional_keys_reuse_by_index() {
    setup();
    let root = mount_root(tag("div").children([tag("span"), tag("span")]), dom::body()).unwrap();
    let old = root.children();

    root.set_children([tag("span").class("x")]).unwrap();

    assert_eq!(root.children(), vec![old[0]]);
    assert!(!old[1].is_alive());
    assert_eq!(old[0].key().map(|k| k.to_string()).as_deref(), Some("autokey0"));
}

// =============================================================================
// Listeners
// =============================================================================

#[test]
fn declared_listener_survives_reuse() {
    setup();
    let hits = Rc::new(RefCell::new(Vec::new()));
    let h1 = hits.clone();
    let root = mount_root(
        tag("div").child(tag("button").key("b").on_click(move |_| h1.borrow_mut().push("first"))),
        dom::body(),
    )
    .unwrap();
    let button = root.children()[0];
    let node = button.node().unwrap();
    dom::fire(node, "click");

    let h2 = hits.clone();
    root.set_children([tag("button").key("b").on_click(move |_| h2.borrow_mut().push("second"))])
        .unwrap();

    assert_eq!(root.children()[0], button);
    assert_eq!(dom::listener_count(node), 1);
    dom::fire(node, "click");
    assert_eq!(*hits.borrow(), vec!["first", "second"]);
}

#[test]
fn destroy_detaches_everything() {
    setup();
    let root = list(&["a", "b"]);
    let children = root.children();
    let root_node = root.node().unwrap();

    root.destroy_node();

    assert!(!root.is_alive());
    assert!(children.iter().all(|c| !c.is_alive()));
    assert!(!dom::exists(root_node));
    assert!(dom::child_nodes(dom::body()).is_empty());
    assert_eq!(spark_dom::element::live_count(), 0);
    assert!(!root.redraw());
}

#[test]
fn child_variants_convert() {
    setup();
    let children: Vec<Child> = vec![tag("b").into(), "text".into(), String::from("more").into()];
    let root = mount_root(tag("p").children(children), dom::body()).unwrap();
    assert_eq!(html(root), "<b></b>textmore");
}
