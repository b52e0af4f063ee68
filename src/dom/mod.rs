//! Host Document - the live node tree elements are reconciled into.
//!
//! The document is an in-memory DOM: element and text nodes with
//! attributes, inline style, listeners with bubbling dispatch, layout, and
//! HTML serialisation. Only the element that owns a node mutates it; this
//! is a convention, not something the document enforces.
//!
//! ```text
//! body
//! ├── div  (class="game")
//! │   ├── button  (listeners: click)
//! │   │   └── "?"
//! │   └── button
//! └── h1
//!     └── "Welcome"
//! ```

mod document;
mod events;
mod html;
pub mod layout;
mod node;

pub use document::*;
pub use events::*;
pub use html::{inner_html, outer_html};
pub use layout::{measure, LayoutSize};
pub use node::{Listener, ListenerId, Mutation, MutationKind, NodeId, NodeKind};
