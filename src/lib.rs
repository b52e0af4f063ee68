//! # spark-dom
//!
//! Declarative UI elements with keyed reconciliation over a host document.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! signal-driven redraws and [taffy](https://github.com/DioxusLabs/taffy)
//! for layout.
//!
//! ## Architecture
//!
//! Elements are `Copy` handles into a thread-local registry. Each owns at
//! most one node of the host document and a list of live children.
//! A redraw asks the element's component for its child list and patches
//! the existing children in place:
//! ```text
//! ElementDesc ──mount──► Element ──redraw──► render() ──► keyed reconcile ──► document mutations
//! ```
//!
//! ## Modules
//!
//! - [`dom`] - In-memory host document (nodes, attributes, events, layout, HTML)
//! - [`element`] - Elements, components, options, reconciliation, attribute projection
//! - [`dispatcher`] - Listener lists, named channels, single-active tracking
//! - [`frames`] - Animation frame queue
//! - [`transition`] - Frame-driven transitions and transition lists
//! - [`reactive`] - Signal-driven redraws
//! - [`config`] - Runtime configuration
//! - [`logging`] - tracing subscriber setup
//!
//! ## Example
//!
//! ```ignore
//! use spark_dom::{dom, mount_root, tag};
//!
//! let list = mount_root(
//!     tag("ul").children([tag("li").key("a").child("A"), tag("li").key("b").child("B")]),
//!     dom::body(),
//! )?;
//! list.set_children([tag("li").key("b").child("B"), tag("li").key("a").child("A")])?;
//! assert_eq!(dom::inner_html(list.node().unwrap()), "<li>B</li><li>A</li>");
//! ```

pub mod config;
pub mod dispatcher;
pub mod dom;
pub mod element;
pub mod error;
pub mod frames;
pub mod logging;
pub mod reactive;
pub mod transition;

pub use config::{config, set_config, update_config, Config};
pub use dispatcher::{Dispatchable, Dispatcher, DispatcherHandle, SingleActiveElementDispatcher};
pub use dom::{DomEvent, NodeId};
pub use element::{
    create, current_owner, mount_root, tag, text, with_owner, AttrValue, Child, Children,
    ClassSet, Cleanup, Component, Element, ElementDesc, Key, ListenerHandle, NodeAttributes,
    NodeType, Options, StyleMap, StyleValue, Tag, TextLeaf,
};
pub use error::{Result, UiError};
pub use frames::{cancel_animation_frame, request_animation_frame, run_animation_frame, FrameHandle};
pub use reactive::redraw_on;
pub use transition::{Transition, TransitionList};

/// Reset every thread-local piece of state: elements, refs, the document,
/// frames and config (for testing).
pub fn reset_runtime() {
    element::reset_elements();
    dom::reset_document();
    frames::reset_frames();
    config::reset_config();
}
