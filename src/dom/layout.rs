//! Layout - computes box sizes for host nodes with Taffy.
//!
//! Inline style is the only input. Supported properties: `display`
//! (`none`, `block`, `flex`), `width`, `height`, `min-width`,
//! `min-height`, `max-width`, `max-height`, `padding`, `margin`
//! (single value or per side), `border-width`, `flex-direction`,
//! `flex-grow`, `flex-shrink`. Text is measured with the configured
//! character width and line height, wrapping at the available width.

use std::collections::HashMap;

use taffy::{
    AvailableSpace, Dimension as TaffyDimension, Display, FlexDirection, LengthPercentage,
    LengthPercentageAuto, NodeId as TaffyNodeId, Rect, Size, Style, TaffyTree,
};

use crate::config::{viewport_height, viewport_width, with_config};
use crate::error::{Result, UiError};

use super::document::{with_document, Document};
use super::node::{NodeId, NodeKind};

/// Computed size of a node in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutSize {
    pub width: f32,
    pub height: f32,
}

// =============================================================================
// CSS VALUE PARSING
// =============================================================================

/// Parse a CSS length: `12px`, `12`, `50%`, `auto`.
fn parse_dimension(raw: &str) -> Option<TaffyDimension> {
    let raw = raw.trim();
    if raw == "auto" {
        return Some(TaffyDimension::Auto);
    }
    if let Some(pct) = raw.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|p| TaffyDimension::Percent(p / 100.0));
    }
    let number = raw.strip_suffix("px").unwrap_or(raw);
    number.trim().parse::<f32>().ok().map(TaffyDimension::Length)
}

fn to_lp(dim: TaffyDimension) -> LengthPercentage {
    match dim {
        TaffyDimension::Length(v) => LengthPercentage::Length(v),
        TaffyDimension::Percent(p) => LengthPercentage::Percent(p),
        TaffyDimension::Auto => LengthPercentage::Length(0.0),
    }
}

fn to_lpa(dim: TaffyDimension) -> LengthPercentageAuto {
    match dim {
        TaffyDimension::Length(v) => LengthPercentageAuto::Length(v),
        TaffyDimension::Percent(p) => LengthPercentageAuto::Percent(p),
        TaffyDimension::Auto => LengthPercentageAuto::Auto,
    }
}

/// Parse a 1-4 value box shorthand into top/right/bottom/left.
fn parse_box(raw: &str) -> Option<Rect<TaffyDimension>> {
    let parts: Vec<TaffyDimension> = raw
        .split_whitespace()
        .map(parse_dimension)
        .collect::<Option<Vec<_>>>()?;
    let (top, right, bottom, left) = match parts.as_slice() {
        [all] => (*all, *all, *all, *all),
        [v, h] => (*v, *h, *v, *h),
        [t, h, b] => (*t, *h, *b, *h),
        [t, r, b, l] => (*t, *r, *b, *l),
        _ => return None,
    };
    Some(Rect { top, right, bottom, left })
}

// =============================================================================
// STYLE BUILDING
// =============================================================================

fn build_style(declarations: &[(String, String)]) -> Style {
    let mut style = Style {
        display: Display::Block,
        ..Default::default()
    };
    let zero = Rect {
        top: TaffyDimension::Length(0.0),
        right: TaffyDimension::Length(0.0),
        bottom: TaffyDimension::Length(0.0),
        left: TaffyDimension::Length(0.0),
    };
    let mut padding = zero;
    let mut margin = zero;

    for (property, value) in declarations {
        let value = value.trim();
        match property.as_str() {
            "display" => {
                style.display = match value {
                    "none" => Display::None,
                    "flex" | "inline-flex" => Display::Flex,
                    _ => Display::Block,
                }
            }
            "width" => style.size.width = parse_dimension(value).unwrap_or(TaffyDimension::Auto),
            "height" => style.size.height = parse_dimension(value).unwrap_or(TaffyDimension::Auto),
            "min-width" => style.min_size.width = parse_dimension(value).unwrap_or(TaffyDimension::Auto),
            "min-height" => style.min_size.height = parse_dimension(value).unwrap_or(TaffyDimension::Auto),
            "max-width" => style.max_size.width = parse_dimension(value).unwrap_or(TaffyDimension::Auto),
            "max-height" => style.max_size.height = parse_dimension(value).unwrap_or(TaffyDimension::Auto),
            "padding" => padding = parse_box(value).unwrap_or(padding),
            "padding-top" => padding.top = parse_dimension(value).unwrap_or(padding.top),
            "padding-right" => padding.right = parse_dimension(value).unwrap_or(padding.right),
            "padding-bottom" => padding.bottom = parse_dimension(value).unwrap_or(padding.bottom),
            "padding-left" => padding.left = parse_dimension(value).unwrap_or(padding.left),
            "margin" => margin = parse_box(value).unwrap_or(margin),
            "margin-top" => margin.top = parse_dimension(value).unwrap_or(margin.top),
            "margin-right" => margin.right = parse_dimension(value).unwrap_or(margin.right),
            "margin-bottom" => margin.bottom = parse_dimension(value).unwrap_or(margin.bottom),
            "margin-left" => margin.left = parse_dimension(value).unwrap_or(margin.left),
            "border-width" => {
                if let Some(border) = parse_box(value) {
                    style.border = Rect {
                        top: to_lp(border.top),
                        right: to_lp(border.right),
                        bottom: to_lp(border.bottom),
                        left: to_lp(border.left),
                    };
                }
            }
            "flex-direction" => {
                style.flex_direction = match value {
                    "column" => FlexDirection::Column,
                    "column-reverse" => FlexDirection::ColumnReverse,
                    "row-reverse" => FlexDirection::RowReverse,
                    _ => FlexDirection::Row,
                }
            }
            "flex-grow" => style.flex_grow = value.parse().unwrap_or(style.flex_grow),
            "flex-shrink" => style.flex_shrink = value.parse().unwrap_or(style.flex_shrink),
            _ => {}
        }
    }

    style.padding = Rect {
        top: to_lp(padding.top),
        right: to_lp(padding.right),
        bottom: to_lp(padding.bottom),
        left: to_lp(padding.left),
    };
    style.margin = Rect {
        top: to_lpa(margin.top),
        right: to_lpa(margin.right),
        bottom: to_lpa(margin.bottom),
        left: to_lpa(margin.left),
    };
    style
}

// =============================================================================
// TEXT MEASUREMENT
// =============================================================================

fn measure_text(
    text: &str,
    known_dimensions: Size<Option<f32>>,
    available_space: Size<AvailableSpace>,
    char_width: f32,
    line_height: f32,
) -> Size<f32> {
    let chars = text.chars().count() as f32;
    if chars == 0.0 {
        return Size::ZERO;
    }
    let full_width = chars * char_width;
    let avail_width = match available_space.width {
        AvailableSpace::Definite(w) => w,
        AvailableSpace::MinContent => char_width,
        AvailableSpace::MaxContent => f32::INFINITY,
    };
    let width = known_dimensions.width.unwrap_or(full_width.min(avail_width.max(char_width)));
    let per_line = (width / char_width).floor().max(1.0);
    let lines = (chars / per_line).ceil().max(1.0);
    Size {
        width,
        height: known_dimensions.height.unwrap_or(lines * line_height),
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Compute the size of `node` inside its tree.
///
/// The whole tree containing `node` (from its topmost ancestor) is laid out
/// against the viewport.
pub fn measure(node: NodeId) -> Result<LayoutSize> {
    let (char_width, line_height) = with_config(|c| (c.char_width, c.line_height));
    let available = Size {
        width: AvailableSpace::Definite(viewport_width()),
        height: AvailableSpace::Definite(viewport_height()),
    };

    with_document(|doc| {
        doc.get(node)?;
        let mut root = node;
        while let Some(parent) = doc.get(root)?.parent {
            root = parent;
        }

        let mut tree: TaffyTree<String> = TaffyTree::new();
        let mut node_map: HashMap<NodeId, TaffyNodeId> = HashMap::new();
        let Some(root_id) = build_tree(doc, root, &mut tree, &mut node_map) else {
            return Err(UiError::UnknownNode(root));
        };

        let mut measure_fn = |known_dimensions: Size<Option<f32>>,
                              available_space: Size<AvailableSpace>,
                              _node_id: TaffyNodeId,
                              context: Option<&mut String>,
                              _style: &Style| {
            match context {
                Some(text) => measure_text(text, known_dimensions, available_space, char_width, line_height),
                None => Size::ZERO,
            }
        };
        if let Err(err) = tree.compute_layout_with_measure(root_id, available, &mut measure_fn) {
            tracing::warn!(error = %err, "layout computation failed");
            return Ok(LayoutSize::default());
        }

        let size = node_map
            .get(&node)
            .and_then(|id| tree.layout(*id).ok())
            .map(|layout| LayoutSize {
                width: layout.size.width,
                height: layout.size.height,
            })
            .unwrap_or_default();
        Ok(size)
    })
}

fn build_tree(
    doc: &Document,
    node: NodeId,
    tree: &mut TaffyTree<String>,
    node_map: &mut HashMap<NodeId, TaffyNodeId>,
) -> Option<TaffyNodeId> {
    let data = doc.get(node).ok()?;
    let id = match &data.kind {
        NodeKind::Text { text } => tree
            .new_leaf_with_context(Style::default(), text.clone())
            .ok()?,
        NodeKind::Element { .. } => {
            let children: Vec<TaffyNodeId> = data
                .children
                .iter()
                .filter_map(|&child| build_tree(doc, child, tree, node_map))
                .collect();
            tree.new_with_children(build_style(&data.style), &children).ok()?
        }
    };
    node_map.insert(node, id);
    Some(id)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::reset_config;
    use crate::dom::document::*;

    fn setup() {
        reset_document();
        reset_config();
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("12px"), Some(TaffyDimension::Length(12.0)));
        assert_eq!(parse_dimension(" 7 "), Some(TaffyDimension::Length(7.0)));
        assert_eq!(parse_dimension("50%"), Some(TaffyDimension::Percent(0.5)));
        assert_eq!(parse_dimension("auto"), Some(TaffyDimension::Auto));
        assert_eq!(parse_dimension("3em"), None);
    }

    #[test]
    fn test_explicit_size_with_padding() {
        setup();
        let div = create_element("div");
        set_style(
            div,
            vec![
                ("width".into(), "100px".into()),
                ("height".into(), "40px".into()),
            ],
        )
        .unwrap();
        let size = measure(div).unwrap();
        assert_eq!(size, LayoutSize { width: 100.0, height: 40.0 });
    }

    #[test]
    fn test_block_fills_parent_width_and_wraps_text() {
        setup();
        let outer = create_element("div");
        set_style(outer, vec![("width".into(), "80px".into())]).unwrap();
        let inner = create_element("p");
        // 20 chars at 8px = 160px -> two lines inside 80px
        let text = create_text("abcdefghijklmnopqrst");
        append_child(outer, inner).unwrap();
        append_child(inner, text).unwrap();

        let size = measure(inner).unwrap();
        assert_eq!(size.width, 80.0);
        assert_eq!(size.height, 32.0);
    }

    #[test]
    fn test_display_none_has_no_size() {
        setup();
        let div = create_element("div");
        set_style(
            div,
            vec![("display".into(), "none".into()), ("width".into(), "10px".into())],
        )
        .unwrap();
        assert_eq!(measure(div).unwrap(), LayoutSize::default());
    }
}
