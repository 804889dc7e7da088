//! HTML writer for [`doctree`] document trees.
//!
//! Produces plain, semantically sound HTML5: no style attributes beyond
//! image sizing and table column widths, layout left to a stylesheet.
//! One [`HtmlWriter`] pass renders a [`doctree::Document`] into named
//! output [`Parts`] — the complete page, or fragments (`body`,
//! `html_body`, `title`, …) for embedding into an existing shell.
//!
//! # Example
//!
//! ```
//! use doctree::{Document, NodeKind};
//! use doctree_html::{HtmlWriter, Settings};
//!
//! let mut doc = Document::with_title(Some("Greeting"));
//! let para = doc.push(doc.root(), NodeKind::Paragraph);
//! doc.push_text(para, "Hello.");
//!
//! let settings = Settings {
//!     stylesheet_path: Vec::new(),
//!     ..Settings::default()
//! };
//! let parts = HtmlWriter::new(&settings).write(&mut doc)?;
//! assert_eq!(parts.fragment, "<p>Hello.</p>\n");
//! # Ok::<(), doctree_html::Error>(())
//! ```

mod error;
mod labels;
pub mod markup;
pub mod math;
mod settings;
pub mod simple;
mod translator;
mod writer;

pub use error::{Error, Result};
pub use math::{EncodedTex, MathConverter, MathRendered};
pub use settings::{AttributionFormat, FootnoteReferences, Settings};
pub use translator::HtmlTranslator;
pub use writer::{DEFAULT_TEMPLATE, HtmlWriter, Parts};
