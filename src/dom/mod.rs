//! Mutable document tree for rendered chapter content.
//!
//! Chapter markup is parsed into an arena ([`Document`]) addressed by
//! [`NodeId`]. The CFI and highlighting code read and mutate it; the host
//! renderer receives the result back through [`to_html`].

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{Children, Descendants, Document, Node, NodeData, NodeId};
pub use serialize::{VOID_ELEMENTS, inner_html, is_void, outer_html, to_html};
pub use tree_sink::parse;
