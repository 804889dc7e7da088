//! Abstract document tree model.
//!
//! An upstream parser builds a [`Document`]: a strict single-owner tree
//! of typed nodes (paragraphs, lists, tables, references, footnotes,
//! math, …). Writer crates such as `doctree-html` perform a single
//! depth-first traversal of the tree and emit output fragments.
//!
//! # Example
//!
//! ```
//! use doctree::{Document, NodeKind};
//!
//! let mut doc = Document::with_title(Some("Hi"));
//! let title = doc.push(doc.root(), NodeKind::Title { refid: None });
//! doc.push_text(title, "Hi");
//! let para = doc.push(doc.root(), NodeKind::Paragraph);
//! doc.push_text(para, "Body");
//!
//! assert_eq!(doc.astext(title), "Hi");
//! ```

mod kind;
mod tree;

pub use kind::{ImageAttrs, NodeKind, SystemMessageAttrs};
pub use tree::{Document, Node, NodeId};
