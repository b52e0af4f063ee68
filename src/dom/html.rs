//! HTML serialisation of host nodes.

use super::document::{with_document, Document};
use super::node::{NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Serialise `node` including its own tag.
pub fn outer_html(node: NodeId) -> String {
    let mut out = String::new();
    with_document(|doc| write_node(doc, node, &mut out));
    out
}

/// Serialise the children of `node`.
pub fn inner_html(node: NodeId) -> String {
    let mut out = String::new();
    with_document(|doc| {
        if let Ok(data) = doc.get(node) {
            for &child in &data.children {
                write_node(doc, child, &mut out);
            }
        }
    });
    out
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    let Ok(data) = doc.get(node) else { return };
    match &data.kind {
        NodeKind::Text { text } => escape_into(text, false, out),
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in &data.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            if !data.style.is_empty() {
                out.push_str(" style=\"");
                let css = data
                    .style
                    .iter()
                    .map(|(k, v)| format!("{k}: {v};"))
                    .collect::<Vec<_>>()
                    .join(" ");
                escape_into(&css, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for &child in &data.children {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
