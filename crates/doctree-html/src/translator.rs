//! Document-tree-to-HTML translation.
//!
//! A single depth-first walk over the tree drives one enter and one
//! exit action per node. Output accumulates in a set of buffers that
//! the assembly step at document exit combines into the final page
//! parts. A heterogeneous context stack carries state between an enter
//! action and the matching exit action; typed pops turn unbalanced
//! push/pop sequences into hard errors instead of corrupt output.
//!
//! Lists are rendered compactly (a `simple` class the stylesheet turns
//! into reduced vertical whitespace) when every item holds at most one
//! paragraph, see the [`crate::simple`] module.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use doctree::{Document, NodeId, NodeKind};

use crate::error::{Error, Result};
use crate::labels;
use crate::markup::{self, AttrValue, Attrs};
use crate::math::{MathConverter, MathDispatcher, MathRendered};
use crate::settings::Settings;
use crate::simple;

const DOCTYPE: &str = "<!DOCTYPE html>\n";
const BODY_PREFIX: &str = "</head>\n<body>\n";
const BODY_SUFFIX: &str = "</body>\n</html>\n";
const GENERATOR: &str = "<meta name=\"generator\" content=\"doctree-html %s\">\n";
/// Kept uninterpolated in the `html_head` part; the charset is filled
/// in by the consumer.
const CONTENT_TYPE: &str = "<meta charset=\"%s\">\n";

/// Tokenizer for literal text: words, space runs, newlines.
static WORDS_AND_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+| +|\n").unwrap());
/// Wide character, vertical whitespace, wide character.
static WIDE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^!-~])[\n\r\t]+([^!-~])").unwrap());
/// Wide character (plus optional whitespace) at end of text.
static WIDE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^!-~])\s*$").unwrap());
/// Wide character (after optional whitespace) at start of text.
static WIDE_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*([^!-~])").unwrap());
/// Leading number and trailing unit of a measure.
static VALUE_UNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9.]+)(\S*)$").unwrap());

/// One saved piece of traversal state, pushed on enter and consumed by
/// the matching exit.
enum ContextFrame {
    /// Markup appended verbatim on exit.
    ClosingTag(String),
    /// Compact-list state saved around a nested list.
    SavedCompact { simple: bool, p: Option<bool> },
    /// A body-buffer position, for exits that splice body content
    /// elsewhere (header, footer).
    Mark(usize),
}

impl ContextFrame {
    fn name(&self) -> &'static str {
        match self {
            ContextFrame::ClosingTag(_) => "closing-tag",
            ContextFrame::SavedCompact { .. } => "saved-compact",
            ContextFrame::Mark(_) => "mark",
        }
    }
}

/// A pending `<col>` element; buffered until the first row group
/// decides where the `<colgroup>` ends.
struct ColSpec {
    ids: Vec<String>,
    classes: Vec<String>,
    colwidth: u32,
}

/// Tree walker accumulating HTML output parts.
pub struct HtmlTranslator<'a> {
    settings: &'a Settings,
    math: MathDispatcher,

    pub head_prefix: Vec<String>,
    pub head: Vec<String>,
    pub stylesheet: Vec<String>,
    pub body_prefix: Vec<String>,
    pub body_pre_docinfo: Vec<String>,
    pub docinfo: Vec<String>,
    pub body: Vec<String>,
    pub body_suffix: Vec<String>,
    pub title: Vec<String>,
    pub subtitle: Vec<String>,
    pub header: Vec<String>,
    pub footer: Vec<String>,
    pub meta: Vec<String>,
    pub fragment: Vec<String>,
    pub html_prolog: Vec<String>,
    pub html_head: Vec<String>,
    pub html_title: Vec<String>,
    pub html_subtitle: Vec<String>,
    pub html_body: Vec<String>,

    context: Vec<ContextFrame>,
    section_level: u32,
    in_contents: bool,
    compact_simple: bool,
    compact_p: Option<bool>,
    in_footnote_list: bool,
    /// Body index where the document title's content starts, 0 when
    /// not inside the document title.
    in_document_title: usize,
    in_mailto: bool,
    protect_literal_text: bool,
    line_block_nest: u32,
    colspecs: Vec<ColSpec>,
    /// Per-table-group stub flags, one entry per column.
    stubs: Vec<Vec<bool>>,
    /// Per-row column cursor.
    columns: Vec<usize>,
}

impl<'a> HtmlTranslator<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        let meta = vec![GENERATOR.replace("%s", env!("CARGO_PKG_VERSION"))];
        let stylesheet = settings
            .stylesheet_list()
            .iter()
            .map(|path| settings.stylesheet_call(path))
            .collect();
        Self {
            settings,
            math: MathDispatcher::new(&settings.math_output),
            head_prefix: Vec::new(),
            head: meta.clone(),
            stylesheet,
            body_prefix: vec![BODY_PREFIX.to_owned()],
            body_pre_docinfo: Vec::new(),
            docinfo: Vec::new(),
            body: Vec::new(),
            body_suffix: vec![BODY_SUFFIX.to_owned()],
            title: Vec::new(),
            subtitle: Vec::new(),
            header: Vec::new(),
            footer: Vec::new(),
            meta,
            fragment: Vec::new(),
            html_prolog: Vec::new(),
            html_head: vec![CONTENT_TYPE.to_owned()],
            html_title: Vec::new(),
            html_subtitle: Vec::new(),
            html_body: Vec::new(),
            context: Vec::new(),
            section_level: 0,
            in_contents: false,
            compact_simple: false,
            compact_p: Some(true),
            in_footnote_list: false,
            in_document_title: 0,
            in_mailto: false,
            protect_literal_text: false,
            line_block_nest: 0,
            colspecs: Vec::new(),
            stubs: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Replace the LaTeX-to-HTML conversion strategy used by the
    /// `html` math output mode.
    #[must_use]
    pub fn with_math_converter(mut self, converter: Box<dyn MathConverter>) -> Self {
        self.math = MathDispatcher::new(&self.settings.math_output).with_converter(converter);
        self
    }

    /// Walk the whole document and fill the output buffers.
    pub fn translate(&mut self, doc: &mut Document) -> Result<()> {
        self.walk(doc, doc.root())
    }

    /// The complete page, assembled from the standalone-output parts.
    pub fn astext(&self) -> String {
        self.head_prefix
            .iter()
            .chain(&self.head)
            .chain(&self.stylesheet)
            .chain(&self.body_prefix)
            .chain(&self.body_pre_docinfo)
            .chain(&self.docinfo)
            .chain(&self.body)
            .chain(&self.body_suffix)
            .map(String::as_str)
            .collect()
    }

    fn walk(&mut self, doc: &mut Document, id: NodeId) -> Result<()> {
        let descend = self.enter(doc, id)?;
        if descend {
            let children: Vec<NodeId> = doc.children(id).to_vec();
            for child in children {
                self.walk(doc, child)?;
            }
        }
        self.exit(doc, id)
    }

    // Context stack

    fn pop_tag(&mut self) -> Result<String> {
        match self.context.pop() {
            Some(ContextFrame::ClosingTag(tag)) => Ok(tag),
            Some(frame) => Err(Error::ContextMismatch {
                expected: "closing-tag",
                found: frame.name(),
            }),
            None => Err(Error::ContextUnderflow {
                expected: "closing-tag",
            }),
        }
    }

    fn pop_mark(&mut self) -> Result<usize> {
        match self.context.pop() {
            Some(ContextFrame::Mark(pos)) => Ok(pos),
            Some(frame) => Err(Error::ContextMismatch {
                expected: "mark",
                found: frame.name(),
            }),
            None => Err(Error::ContextUnderflow { expected: "mark" }),
        }
    }

    /// Save the compact-list state and recompute it for the list at
    /// `id`. Returns whether the list gets the `simple` class: only
    /// the outermost compact list is tagged, nested ones inherit the
    /// styling.
    fn push_compact(&mut self, doc: &Document, id: NodeId) -> bool {
        let old_simple = self.compact_simple;
        self.context.push(ContextFrame::SavedCompact {
            simple: self.compact_simple,
            p: self.compact_p,
        });
        self.compact_p = None;
        self.compact_simple = simple::is_compactable(doc, id, self.settings, self.in_contents);
        self.compact_simple && !old_simple
    }

    fn pop_compact(&mut self) -> Result<()> {
        match self.context.pop() {
            Some(ContextFrame::SavedCompact { simple, p }) => {
                self.compact_simple = simple;
                self.compact_p = p;
                Ok(())
            }
            Some(frame) => Err(Error::ContextMismatch {
                expected: "saved-compact",
                found: frame.name(),
            }),
            None => Err(Error::ContextUnderflow {
                expected: "saved-compact",
            }),
        }
    }

    // Markup helpers

    fn cloaking(&self) -> bool {
        self.in_mailto && self.settings.cloak_email_addresses
    }

    fn starttag(
        &self,
        doc: &Document,
        id: NodeId,
        tag: &str,
        suffix: &str,
        attrs: Attrs,
    ) -> Result<String> {
        let node = &doc[id];
        markup::starttag(&node.ids, &node.classes, tag, suffix, false, attrs, self.cloaking())
    }

    fn emptytag(
        &self,
        doc: &Document,
        id: NodeId,
        tag: &str,
        suffix: &str,
        attrs: Attrs,
    ) -> Result<String> {
        let node = &doc[id];
        markup::emptytag(&node.ids, &node.classes, tag, suffix, attrs, self.cloaking())
    }

    fn encode(&self, text: &str) -> String {
        markup::encode(text)
    }

    fn add_meta(&mut self, tag: String) {
        self.meta.push(tag.clone());
        self.head.push(tag);
    }

    fn class_attr(value: impl Into<String>) -> Attrs {
        vec![("class".to_owned(), AttrValue::text(value.into()))]
    }

    // Docinfo items

    fn enter_docinfo_item(
        &mut self,
        doc: &Document,
        id: NodeId,
        name: &str,
        meta: bool,
    ) -> Result<()> {
        if meta {
            let tag = format!(
                "<meta name=\"{name}\" content=\"{}\">\n",
                markup::attval(&doc.astext(id), self.cloaking())
            );
            self.add_meta(tag);
        }
        self.body
            .push(format!("<dt class=\"{name}\">{}</dt>\n", labels::label(name)));
        let dd = self.starttag(doc, id, "dd", "", Self::class_attr(name))?;
        self.body.push(dd);
        Ok(())
    }

    fn exit_docinfo_item(&mut self) {
        self.body.push("</dd>\n".to_owned());
    }

    // Tables

    fn write_colspecs(&mut self) -> Result<()> {
        let total: u32 = self.colspecs.iter().map(|c| c.colwidth).sum();
        for spec in std::mem::take(&mut self.colspecs) {
            let pct = (f64::from(spec.colwidth) * 100.0 / f64::from(total.max(1)) + 0.5) as u32;
            let col = markup::emptytag(
                &spec.ids,
                &spec.classes,
                "col",
                "\n",
                vec![("style".to_owned(), AttrValue::text(format!("width:{pct}%")))],
                self.cloaking(),
            )?;
            self.body.push(col);
        }
        Ok(())
    }

    // Wide-character whitespace normalization
    //
    // A line break between two wide (non-ASCII) characters carries no
    // meaning and would render as an unwanted space, so it is removed
    // before the paragraph's text is emitted. Both breaks inside one
    // text leaf and breaks falling on a leaf boundary are covered.

    fn normalize_wide_text(doc: &mut Document, para: NodeId) {
        let leaves = doc.text_leaves(para);
        for &leaf in &leaves {
            let text = doc.astext(leaf);
            let replaced = WIDE_GAP.replace_all(&text, "${1}${2}");
            if replaced != text {
                let replaced = replaced.into_owned();
                doc.set_text(leaf, replaced);
            }
        }
        let mut prev: Option<NodeId> = None;
        for &leaf in &leaves {
            if let Some(p) = prev {
                let prev_text = doc.astext(p);
                let cur_text = doc.astext(leaf);
                if WIDE_END.is_match(&prev_text) && WIDE_START.is_match(&cur_text) {
                    doc.set_text(p, prev_text.trim_end().to_owned());
                    doc.set_text(leaf, cur_text.trim_start().to_owned());
                }
            }
            prev = Some(leaf);
        }
    }

    // Images

    fn value_with_unit(value: &str) -> Option<(f64, String)> {
        let caps = VALUE_UNIT.captures(value)?;
        let number: f64 = caps[1].parse().ok()?;
        let unit = if caps[2].is_empty() { "px" } else { &caps[2] };
        Some((number, unit.to_owned()))
    }

    fn probe_image(uri: &str) -> Option<(u32, u32)> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        let path = percent_encoding::percent_decode_str(path)
            .decode_utf8()
            .ok()?
            .into_owned();
        match image::image_dimensions(&path) {
            Ok(dims) => Some(dims),
            Err(err) => {
                warn!("cannot determine size of image \"{uri}\": {err}");
                None
            }
        }
    }

    // Math

    fn emit_math_error(&mut self, doc: &Document, id: NodeId, message: &str, fallback: &str) {
        self.body
            .push("<div class=\"system-message\">\n".to_owned());
        self.body.push(format!(
            "<p class=\"system-message-title\">System Message: ERROR/3 \
             (<span class=\"docutils literal\">{}</span>)</p>\n",
            self.encode(&doc[id].kind.name().to_owned())
        ));
        self.body.push(format!("<p>{}</p>\n", self.encode(message)));
        self.body.push(format!(
            "<pre class=\"literal-block\">{}\n</pre>\n",
            self.encode(fallback)
        ));
        self.body.push("</div>\n".to_owned());
    }

    fn enter_math(&mut self, doc: &Document, id: NodeId, block: bool) -> Result<()> {
        let source = doc.astext(id);
        match self.math.dispatch(&source, block, self.settings) {
            MathRendered::Fragment { tag, class, code } => {
                if let Some(tag) = tag {
                    let suffix = if block { "\n" } else { "" };
                    let open =
                        self.starttag(doc, id, tag, suffix, Self::class_attr(class))?;
                    self.body.push(open);
                    self.body.push(code);
                    if block {
                        self.body.push("\n".to_owned());
                    }
                    self.body.push(format!("</{tag}>"));
                } else {
                    self.body.push(code);
                    if block {
                        self.body.push("\n".to_owned());
                    }
                }
                if block {
                    self.body.push("\n".to_owned());
                }
            }
            MathRendered::ParseError { message, fallback } => {
                self.emit_math_error(doc, id, &message, &fallback);
            }
        }
        Ok(())
    }

    // Enter / exit dispatch

    #[allow(clippy::too_many_lines)]
    fn enter(&mut self, doc: &mut Document, id: NodeId) -> Result<bool> {
        let kind = doc[id].kind.clone();
        match kind {
            NodeKind::Text(text) => {
                let encoded = self.encode(&text);
                if self.protect_literal_text || self.line_block_nest > 0 {
                    for token in WORDS_AND_SPACES.find_iter(&encoded) {
                        let token = token.as_str();
                        if !token.trim().is_empty() {
                            self.body
                                .push(format!("<span class=\"pre\">{token}</span>"));
                        } else if token == " " || token == "\n" {
                            self.body.push(token.to_owned());
                        } else {
                            // A run of spaces: all but the last become
                            // no-break spaces so only the last can wrap.
                            let mut run = "&nbsp;".repeat(token.len() - 1);
                            run.push(' ');
                            self.body.push(run);
                        }
                    }
                } else {
                    let encoded = if self.cloaking() {
                        markup::cloak_email(&encoded)
                    } else {
                        encoded
                    };
                    self.body.push(encoded);
                }
            }
            NodeKind::Document { title } => {
                self.head.push(format!(
                    "<title>{}</title>\n",
                    self.encode(title.as_deref().unwrap_or(""))
                ));
            }
            NodeKind::Section => {
                self.section_level += 1;
                let tag = self.starttag(doc, id, "section", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Title { ref refid } => self.enter_title(doc, id, refid.as_deref())?,
            NodeKind::Subtitle => self.enter_subtitle(doc, id)?,
            NodeKind::Paragraph => {
                Self::normalize_wide_text(doc, id);
                let tag = self.starttag(doc, id, "p", "", vec![])?;
                self.body.push(tag);
            }

            NodeKind::BulletList => {
                let attrs = if self.push_compact(doc, id) {
                    Self::class_attr("simple")
                } else {
                    vec![]
                };
                let tag = self.starttag(doc, id, "ul", "\n", attrs)?;
                self.body.push(tag);
            }
            NodeKind::EnumeratedList { start, ref enumtype } => {
                let mut attrs: Attrs = Vec::new();
                if let Some(start) = start {
                    attrs.push(("start".to_owned(), AttrValue::text(start.to_string())));
                }
                let mut class = enumtype.clone().unwrap_or_default();
                if self.push_compact(doc, id) {
                    if !class.is_empty() {
                        class.push(' ');
                    }
                    class.push_str("simple");
                }
                if !class.is_empty() {
                    attrs.push(("class".to_owned(), AttrValue::Text(class)));
                }
                let tag = self.starttag(doc, id, "ol", "\n", attrs)?;
                self.body.push(tag);
            }
            NodeKind::ListItem => {
                let tag = self.starttag(doc, id, "li", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::DefinitionList => {
                let attrs = if self.push_compact(doc, id) {
                    Self::class_attr("simple")
                } else {
                    vec![]
                };
                let tag = self.starttag(doc, id, "dl", "\n", attrs)?;
                self.body.push(tag);
            }
            NodeKind::DefinitionListItem => {
                // Class arguments, ids and names move to the term.
                if let Some(&term) = doc.children(id).first() {
                    let parent = doc[id].clone();
                    let child = &mut doc[term];
                    child.classes.splice(0..0, parent.classes.iter().cloned());
                    child.ids.splice(0..0, parent.ids.iter().cloned());
                    child.names.splice(0..0, parent.names.iter().cloned());
                }
            }
            NodeKind::Term => {
                let tag = self.starttag(doc, id, "dt", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Classifier => {
                let tag = self.starttag(doc, id, "span", "", Self::class_attr("classifier"))?;
                self.body.push(tag);
            }
            NodeKind::Definition => {
                // The term's end tag waits until here, in case a
                // classifier follows it.
                self.body.push("</dt>\n".to_owned());
                let tag = self.starttag(doc, id, "dd", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::FieldList => {
                let mut class = "field-list".to_owned();
                if self.push_compact(doc, id) {
                    class.push_str(" simple");
                }
                let tag = self.starttag(doc, id, "dl", "\n", Self::class_attr(class))?;
                self.body.push(tag);
            }
            NodeKind::Field => {}
            NodeKind::FieldName => {
                // The field container emits no markup; its classes
                // surface on the name and body instead.
                let tag = self.field_child_tag(doc, id, "dt")?;
                self.body.push(tag);
            }
            NodeKind::FieldBody => {
                let tag = self.field_child_tag(doc, id, "dd")?;
                self.body.push(tag);
            }
            NodeKind::OptionList => {
                let tag = self.starttag(doc, id, "dl", "\n", Self::class_attr("option-list"))?;
                self.body.push(tag);
            }
            NodeKind::OptionListItem => {}
            NodeKind::OptionGroup => {
                let tag = self.starttag(doc, id, "dt", "", vec![])?;
                self.body.push(tag);
                self.body.push("<kbd>".to_owned());
            }
            NodeKind::OptionElement => {
                let tag = self.starttag(doc, id, "span", "", Self::class_attr("option"))?;
                self.body.push(tag);
            }
            NodeKind::OptionString => {}
            NodeKind::OptionArgument { ref delimiter } => {
                self.body
                    .push(delimiter.clone().unwrap_or_else(|| " ".to_owned()));
                let tag = self.starttag(doc, id, "var", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Description => {
                let tag = self.starttag(doc, id, "dd", "", vec![])?;
                self.body.push(tag);
            }

            NodeKind::Docinfo => {
                let mut class = "docinfo".to_owned();
                if self.push_compact(doc, id) {
                    class.push_str(" simple");
                }
                let tag = self.starttag(doc, id, "dl", "\n", Self::class_attr(class))?;
                self.body.push(tag);
            }
            NodeKind::Author => {
                if !matches!(doc[doc.parent(id).unwrap_or(id)].kind, NodeKind::Authors) {
                    self.enter_docinfo_item(doc, id, "author", true)?;
                }
                self.body.push("<p>".to_owned());
            }
            NodeKind::Authors => self.enter_docinfo_item(doc, id, "authors", false)?,
            NodeKind::Address => {
                self.enter_docinfo_item(doc, id, "address", false)?;
                let pre =
                    markup::starttag(&[], &[], "pre", "\n", false, Self::class_attr("address"), false)?;
                self.body.push(pre);
            }
            NodeKind::Contact => self.enter_docinfo_item(doc, id, "contact", false)?,
            NodeKind::Copyright => self.enter_docinfo_item(doc, id, "copyright", false)?,
            NodeKind::Date => self.enter_docinfo_item(doc, id, "date", false)?,
            NodeKind::Organization => self.enter_docinfo_item(doc, id, "organization", false)?,
            NodeKind::Revision => self.enter_docinfo_item(doc, id, "revision", false)?,
            NodeKind::Status => self.enter_docinfo_item(doc, id, "status", false)?,
            NodeKind::Version => self.enter_docinfo_item(doc, id, "version", false)?,

            NodeKind::BlockQuote => {
                let tag = self.starttag(doc, id, "blockquote", "\n", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Attribution => {
                let (prefix, suffix) = self.settings.attribution.delimiters();
                self.context.push(ContextFrame::ClosingTag(suffix.to_owned()));
                let tag =
                    self.starttag(doc, id, "p", prefix, Self::class_attr("attribution"))?;
                self.body.push(tag);
                let cite = self.starttag(doc, id, "cite", "", vec![])?;
                self.body.push(cite);
            }
            NodeKind::LiteralBlock => {
                let tag = self.starttag(doc, id, "pre", "\n", Self::class_attr("literal-block"))?;
                self.body.push(tag);
                if doc[id].classes.iter().any(|c| c == "code") {
                    self.body.push("<code>".to_owned());
                }
            }
            NodeKind::DoctestBlock => {
                let tag =
                    self.starttag(doc, id, "pre", "", Self::class_attr("code python doctest"))?;
                self.body.push(tag);
            }
            NodeKind::LineBlock => {
                let tag = self.starttag(doc, id, "div", "\n", Self::class_attr("line-block"))?;
                self.body.push(tag);
                self.line_block_nest += 1;
            }
            NodeKind::Line => {}
            NodeKind::Rubric => {
                let tag = self.starttag(doc, id, "p", "", Self::class_attr("rubric"))?;
                self.body.push(tag);
            }
            NodeKind::Topic => {
                let tag = self.starttag(doc, id, "div", "\n", Self::class_attr("topic"))?;
                self.body.push(tag);
                self.in_contents = doc[id].classes.iter().any(|c| c == "contents");
            }
            NodeKind::Sidebar => {
                let tag = self.starttag(doc, id, "div", "\n", Self::class_attr("sidebar"))?;
                self.body.push(tag);
            }
            NodeKind::Admonition => {
                doc[id].classes.insert(0, "admonition".to_owned());
                let tag = self.starttag(doc, id, "div", "\n", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Compound => {
                let tag = self.starttag(doc, id, "div", "\n", Self::class_attr("compound"))?;
                self.body.push(tag);
                let children: Vec<NodeId> = doc.children(id).to_vec();
                if children.len() > 1 {
                    for (index, &child) in children.iter().enumerate() {
                        let class = if index == 0 {
                            "compound-first"
                        } else if index == children.len() - 1 {
                            "compound-last"
                        } else {
                            "compound-middle"
                        };
                        doc[child].classes.push(class.to_owned());
                    }
                }
            }
            NodeKind::Container => {
                let tag =
                    self.starttag(doc, id, "div", "\n", Self::class_attr("docutils container"))?;
                self.body.push(tag);
            }
            NodeKind::Decoration => {}
            NodeKind::Header | NodeKind::Footer => {
                self.context.push(ContextFrame::Mark(self.body.len()));
            }
            NodeKind::Transition => {
                let tag = self.emptytag(doc, id, "hr", "\n", Self::class_attr("docutils"))?;
                self.body.push(tag);
            }
            NodeKind::Figure { ref figwidth, ref align } => {
                self.enter_figure(doc, id, figwidth.as_deref(), align.as_deref())?;
            }
            NodeKind::Caption => {
                let tag = self.starttag(doc, id, "figcaption", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Legend => {
                let tag = self.starttag(doc, id, "div", "\n", Self::class_attr("legend"))?;
                self.body.push(tag);
            }
            NodeKind::Image(ref attrs) => self.enter_image(doc, id, attrs)?,

            NodeKind::Literal => {
                let tag =
                    self.starttag(doc, id, "code", "", Self::class_attr("docutils literal"))?;
                self.body.push(tag);
                self.protect_literal_text = true;
            }
            NodeKind::Emphasis => {
                let tag = self.starttag(doc, id, "em", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Strong => {
                let tag = self.starttag(doc, id, "strong", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Subscript => {
                let tag = self.starttag(doc, id, "sub", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Superscript => {
                let tag = self.starttag(doc, id, "sup", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::TitleReference => {
                let tag = self.starttag(doc, id, "cite", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Abbreviation | NodeKind::Acronym => {
                let tag = self.starttag(doc, id, "abbr", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Inline => {
                let tag = self.starttag(doc, id, "span", "", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Reference { ref refuri, ref refid } => {
                self.enter_reference(doc, id, refuri.as_deref(), refid.as_deref())?;
            }
            NodeKind::Target { ref refuri, ref refid, ref refname } => {
                if refuri.is_none() && refid.is_none() && refname.is_none() {
                    let tag = self.starttag(doc, id, "span", "", Self::class_attr("target"))?;
                    self.body.push(tag);
                    self.context
                        .push(ContextFrame::ClosingTag("</span>".to_owned()));
                } else {
                    self.context.push(ContextFrame::ClosingTag(String::new()));
                }
            }
            NodeKind::FootnoteReference { ref refid } => {
                let class = format!(
                    "footnote-reference {}",
                    self.settings.footnote_references.as_str()
                );
                let attrs = vec![
                    ("class".to_owned(), AttrValue::Text(class)),
                    ("href".to_owned(), AttrValue::text(format!("#{refid}"))),
                ];
                let tag = self.starttag(doc, id, "a", "", attrs)?;
                self.body.push(tag);
            }
            NodeKind::CitationReference { ref refid, ref refname } => {
                let target = refid.clone().or_else(|| {
                    refname
                        .as_ref()
                        .and_then(|name| doc.nameids.get(name).cloned())
                });
                let attrs = vec![
                    ("class".to_owned(), AttrValue::text("citation-reference")),
                    (
                        "href".to_owned(),
                        AttrValue::text(format!("#{}", target.unwrap_or_default())),
                    ),
                ];
                let tag = self.starttag(doc, id, "a", "[", attrs)?;
                self.body.push(tag);
            }
            NodeKind::Footnote { .. } => {
                if !self.in_footnote_list {
                    self.body.push(format!(
                        "<dl class=\"footnote {}\">\n",
                        self.settings.footnote_references.as_str()
                    ));
                    self.in_footnote_list = true;
                }
            }
            NodeKind::Citation { .. } => {
                if !self.in_footnote_list {
                    self.body.push("<dl class=\"citation\">\n".to_owned());
                    self.in_footnote_list = true;
                }
            }
            NodeKind::Label => self.enter_label(doc, id)?,
            NodeKind::Generated => {
                if doc[id].classes.iter().any(|c| c == "sectnum") {
                    let sectnum = doc.astext(id);
                    let sectnum = sectnum.trim_end_matches(['\u{a0}', ' ']);
                    self.body.push(format!(
                        "<span class=\"sectnum\">{}</span> ",
                        self.encode(sectnum)
                    ));
                    return Ok(false);
                }
            }
            NodeKind::Problematic { ref refid } => {
                if let Some(refid) = refid {
                    self.body.push(format!("<a href=\"#{refid}\">"));
                    self.context
                        .push(ContextFrame::ClosingTag("</a>".to_owned()));
                } else {
                    self.context.push(ContextFrame::ClosingTag(String::new()));
                }
                let tag = self.starttag(doc, id, "span", "", Self::class_attr("problematic"))?;
                self.body.push(tag);
            }

            NodeKind::Table => {
                let classes: Vec<&str> = self
                    .settings
                    .table_style
                    .split(',')
                    .map(|c| c.trim_matches([' ', '\t', '\n']))
                    .filter(|c| !c.is_empty())
                    .collect();
                let tag =
                    self.starttag(doc, id, "table", "\n", Self::class_attr(classes.join(" ")))?;
                self.body.push(tag);
            }
            NodeKind::Tgroup { .. } => {
                // Colgroup is required by some engines for column styling.
                let tag = self.starttag(doc, id, "colgroup", "\n", vec![])?;
                self.body.push(tag);
                // Consumed by the first row group (thead or tbody).
                self.context
                    .push(ContextFrame::ClosingTag("</colgroup>\n".to_owned()));
                self.stubs.push(Vec::new());
            }
            NodeKind::Colspec { colwidth, stub } => {
                let node = &doc[id];
                self.colspecs.push(ColSpec {
                    ids: node.ids.clone(),
                    classes: node.classes.clone(),
                    colwidth,
                });
                if let Some(stubs) = self.stubs.last_mut() {
                    stubs.push(stub);
                }
            }
            NodeKind::Thead => {
                self.write_colspecs()?;
                let close = self.pop_tag()?;
                self.body.push(close);
                // For tbody: the colgroup is already closed.
                self.context.push(ContextFrame::ClosingTag(String::new()));
                let tag = self.starttag(doc, id, "thead", "\n", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Tbody => {
                self.write_colspecs()?;
                let close = self.pop_tag()?;
                self.body.push(close);
                let tag = self.starttag(doc, id, "tbody", "\n", vec![])?;
                self.body.push(tag);
            }
            NodeKind::Row => {
                let tag = self.starttag(doc, id, "tr", "", vec![])?;
                self.body.push(tag);
                self.columns.push(0);
            }
            NodeKind::Entry { morerows, morecols } => {
                self.enter_entry(doc, id, morerows, morecols)?;
            }

            NodeKind::Math => {
                self.enter_math(doc, id, false)?;
                return Ok(false);
            }
            NodeKind::MathBlock => {
                self.enter_math(doc, id, true)?;
                return Ok(false);
            }

            NodeKind::Raw { ref formats } => {
                if formats.iter().any(|f| f == "html") {
                    let parent_inline = doc
                        .parent(id)
                        .is_some_and(|p| doc[p].kind.is_inline_container());
                    let tag = if parent_inline { "span" } else { "div" };
                    let has_classes = !doc[id].classes.is_empty();
                    if has_classes {
                        let open = self.starttag(doc, id, tag, "", vec![])?;
                        self.body.push(open);
                    }
                    self.body.push(doc.astext(id));
                    if has_classes {
                        self.body.push(format!("</{tag}>"));
                    }
                }
                // Raw text for other formats stays out of the output.
                return Ok(false);
            }
            NodeKind::Comment => {
                self.body
                    .push(format!("<!-- {} -->\n", escape_comment_dashes(&doc.astext(id))));
                return Ok(false);
            }
            NodeKind::SubstitutionDefinition | NodeKind::Pending => return Ok(false),
            NodeKind::SubstitutionReference => {
                return Err(Error::Unimplemented("substitution_reference"));
            }
            NodeKind::SystemMessage(ref attrs) => {
                let tag = self.starttag(doc, id, "div", "\n", Self::class_attr("system-message"))?;
                self.body.push(tag);
                self.body
                    .push("<p class=\"system-message-title\">".to_owned());
                let backref_text = match attrs.backrefs.len() {
                    0 => String::new(),
                    1 => format!(
                        "; <em><a href=\"#{}\">backlink</a></em>",
                        attrs.backrefs[0]
                    ),
                    _ => {
                        let backlinks: Vec<String> = attrs
                            .backrefs
                            .iter()
                            .enumerate()
                            .map(|(i, r)| format!("<a href=\"#{r}\">{}</a>", i + 1))
                            .collect();
                        format!("; <em>backlinks: {}</em>", backlinks.join(", "))
                    }
                };
                let line = attrs
                    .line
                    .map_or_else(String::new, |l| format!(", line {l}"));
                self.body.push(format!(
                    "System Message: {}/{} (<span class=\"docutils literal\">{}</span>{line}){backref_text}</p>\n",
                    attrs.msg_type,
                    attrs.level,
                    self.encode(&attrs.source)
                ));
            }
            NodeKind::Meta { ref attrs } => {
                let attr_list: Attrs = attrs
                    .iter()
                    .map(|(name, value)| (name.clone(), AttrValue::text(value.clone())))
                    .collect();
                let tag = self.emptytag(doc, id, "meta", "\n", attr_list)?;
                self.add_meta(tag);
            }
        }
        Ok(true)
    }

    #[allow(clippy::too_many_lines)]
    fn exit(&mut self, doc: &mut Document, id: NodeId) -> Result<()> {
        let kind = doc[id].kind.clone();
        match kind {
            NodeKind::Document { .. } => self.exit_document(doc, id)?,
            NodeKind::Section => {
                self.section_level -= 1;
                self.body.push("</section>\n".to_owned());
            }
            NodeKind::Title { .. } => {
                let close = self.pop_tag()?;
                self.body.push(close);
                self.extract_document_title(true);
            }
            NodeKind::Subtitle => {
                self.body.push("</p>\n".to_owned());
                self.extract_document_title(false);
            }
            NodeKind::Paragraph => {
                self.body.push("</p>".to_owned());
                let single_child_item = doc.parent(id).is_some_and(|p| {
                    matches!(doc[p].kind, NodeKind::ListItem | NodeKind::Entry { .. })
                        && doc.children(p).len() == 1
                });
                if !single_child_item {
                    self.body.push("\n".to_owned());
                }
            }

            NodeKind::BulletList => {
                self.pop_compact()?;
                self.body.push("</ul>\n".to_owned());
            }
            NodeKind::EnumeratedList { .. } => {
                self.pop_compact()?;
                self.body.push("</ol>\n".to_owned());
            }
            NodeKind::ListItem => self.body.push("</li>\n".to_owned()),
            NodeKind::DefinitionList => {
                self.pop_compact()?;
                self.body.push("</dl>\n".to_owned());
            }
            NodeKind::DefinitionListItem | NodeKind::Term => {}
            NodeKind::Classifier => self.body.push("</span>".to_owned()),
            NodeKind::Definition => self.body.push("</dd>\n".to_owned()),
            NodeKind::FieldList => {
                self.pop_compact()?;
                self.body.push("</dl>\n".to_owned());
            }
            NodeKind::Field => {}
            NodeKind::FieldName => self.body.push("</dt>\n".to_owned()),
            NodeKind::FieldBody => self.body.push("</dd>\n".to_owned()),
            NodeKind::OptionList => self.body.push("</dl>\n".to_owned()),
            NodeKind::OptionListItem | NodeKind::OptionString => {}
            NodeKind::OptionGroup => self.body.push("</kbd></dt>\n".to_owned()),
            NodeKind::OptionElement => {
                self.body.push("</span>".to_owned());
                let next_is_option = doc
                    .next_sibling(id)
                    .is_some_and(|s| matches!(doc[s].kind, NodeKind::OptionElement));
                if next_is_option {
                    self.body.push(", ".to_owned());
                }
            }
            NodeKind::OptionArgument { .. } => self.body.push("</var>".to_owned()),
            NodeKind::Description => self.body.push("</dd>\n".to_owned()),

            NodeKind::Docinfo => {
                self.pop_compact()?;
                self.body.push("</dl>\n".to_owned());
            }
            NodeKind::Author => {
                self.body.push("</p>".to_owned());
                if matches!(doc[doc.parent(id).unwrap_or(id)].kind, NodeKind::Authors) {
                    self.body.push("\n".to_owned());
                } else {
                    self.exit_docinfo_item();
                }
            }
            NodeKind::Address => {
                self.body.push("\n</pre>\n".to_owned());
                self.exit_docinfo_item();
            }
            NodeKind::Authors
            | NodeKind::Contact
            | NodeKind::Copyright
            | NodeKind::Date
            | NodeKind::Organization
            | NodeKind::Revision
            | NodeKind::Status
            | NodeKind::Version => self.exit_docinfo_item(),

            NodeKind::BlockQuote => self.body.push("</blockquote>\n".to_owned()),
            NodeKind::Attribution => {
                let suffix = self.pop_tag()?;
                self.body.push(format!("</cite>{suffix}</p>\n"));
            }
            NodeKind::LiteralBlock => {
                if doc[id].classes.iter().any(|c| c == "code") {
                    self.body.push("</code>".to_owned());
                }
                self.body.push("\n</pre>\n".to_owned());
            }
            NodeKind::DoctestBlock => self.body.push("\n</pre>\n".to_owned()),
            NodeKind::LineBlock => {
                self.line_block_nest -= 1;
                self.body.push("</div>\n".to_owned());
            }
            NodeKind::Line => self.body.push("<br>\n".to_owned()),
            NodeKind::Rubric => self.body.push("</p>\n".to_owned()),
            NodeKind::Topic => {
                self.body.push("</div>\n".to_owned());
                self.in_contents = false;
            }
            NodeKind::Sidebar
            | NodeKind::Admonition
            | NodeKind::Compound
            | NodeKind::Container
            | NodeKind::Legend => self.body.push("</div>\n".to_owned()),
            NodeKind::Decoration | NodeKind::Transition => {}
            NodeKind::Header => self.exit_header(doc, id)?,
            NodeKind::Footer => self.exit_footer(doc, id)?,
            NodeKind::Figure { .. } | NodeKind::Image(_) => {
                let close = self.pop_tag()?;
                self.body.push(close);
            }
            NodeKind::Caption => self.body.push("</figcaption>\n".to_owned()),

            NodeKind::Literal => {
                self.protect_literal_text = false;
                self.body.push("</code>".to_owned());
            }
            NodeKind::Emphasis => self.body.push("</em>".to_owned()),
            NodeKind::Strong => self.body.push("</strong>".to_owned()),
            NodeKind::Subscript => self.body.push("</sub>".to_owned()),
            NodeKind::Superscript => self.body.push("</sup>".to_owned()),
            NodeKind::TitleReference => self.body.push("</cite>".to_owned()),
            NodeKind::Abbreviation | NodeKind::Acronym => self.body.push("</abbr>".to_owned()),
            NodeKind::Inline => self.body.push("</span>".to_owned()),
            NodeKind::Reference { .. } => {
                let close = self.pop_tag()?;
                self.body.push(close);
                let parent_inline = doc
                    .parent(id)
                    .is_some_and(|p| doc[p].kind.is_inline_container());
                if !parent_inline {
                    self.body.push("\n".to_owned());
                }
                self.in_mailto = false;
            }
            NodeKind::Target { .. } => {
                let close = self.pop_tag()?;
                self.body.push(close);
            }
            NodeKind::FootnoteReference { .. } => self.body.push("</a>".to_owned()),
            NodeKind::CitationReference { .. } => self.body.push("]</a>".to_owned()),
            NodeKind::Footnote { .. } => {
                self.body.push("</dd>\n".to_owned());
                let next_is_footnote = doc
                    .next_sibling(id)
                    .is_some_and(|s| matches!(doc[s].kind, NodeKind::Footnote { .. }));
                if !next_is_footnote {
                    self.body.push("</dl>\n".to_owned());
                    self.in_footnote_list = false;
                }
            }
            NodeKind::Citation { .. } => {
                self.body.push("</dd>\n".to_owned());
                let next_is_citation = doc
                    .next_sibling(id)
                    .is_some_and(|s| matches!(doc[s].kind, NodeKind::Citation { .. }));
                if !next_is_citation {
                    self.body.push("</dl>\n".to_owned());
                    self.in_footnote_list = false;
                }
            }
            NodeKind::Label => self.exit_label(doc, id),
            NodeKind::Problematic { .. } => {
                self.body.push("</span>".to_owned());
                let close = self.pop_tag()?;
                self.body.push(close);
            }

            NodeKind::Table => self.body.push("</table>\n".to_owned()),
            NodeKind::Tgroup { .. } => {
                self.stubs.pop();
            }
            NodeKind::Thead => self.body.push("</thead>\n".to_owned()),
            NodeKind::Tbody => self.body.push("</tbody>\n".to_owned()),
            NodeKind::Row => {
                self.columns.pop();
                self.body.push("</tr>\n".to_owned());
            }
            NodeKind::Entry { .. } => {
                let close = self.pop_tag()?;
                self.body.push(close);
            }
            NodeKind::SystemMessage(_) => self.body.push("</div>\n".to_owned()),

            // Skipped subtrees and output-free kinds.
            NodeKind::Text(_)
            | NodeKind::Colspec { .. }
            | NodeKind::Math
            | NodeKind::MathBlock
            | NodeKind::Raw { .. }
            | NodeKind::Comment
            | NodeKind::SubstitutionDefinition
            | NodeKind::SubstitutionReference
            | NodeKind::Generated
            | NodeKind::Meta { .. }
            | NodeKind::Pending => {}
        }
        Ok(())
    }

    // Structure-heavy enter/exit actions, split out of the dispatch.

    fn enter_title(&mut self, doc: &Document, id: NodeId, refid: Option<&str>) -> Result<()> {
        let parent = doc.parent(id).unwrap_or(id);
        let close_tag;
        match &doc[parent].kind {
            NodeKind::Topic => {
                let tag = self.starttag(doc, id, "p", "", Self::class_attr("topic-title first"))?;
                self.body.push(tag);
                close_tag = "</p>\n".to_owned();
            }
            NodeKind::Sidebar => {
                let tag = self.starttag(doc, id, "p", "", Self::class_attr("sidebar-title"))?;
                self.body.push(tag);
                close_tag = "</p>\n".to_owned();
            }
            kind if kind.is_admonition() => {
                let tag =
                    self.starttag(doc, id, "p", "", Self::class_attr("admonition-title"))?;
                self.body.push(tag);
                close_tag = "</p>\n".to_owned();
            }
            NodeKind::Table => {
                let tag = self.starttag(doc, id, "caption", "", vec![])?;
                self.body.push(tag);
                close_tag = "</caption>\n".to_owned();
            }
            NodeKind::Document { .. } => {
                let tag = self.starttag(doc, id, "h1", "", Self::class_attr("title"))?;
                self.body.push(tag);
                close_tag = "</h1>\n".to_owned();
                self.in_document_title = self.body.len();
            }
            _ => {
                // Section title; heading depth follows nesting.
                let level = self.section_level + self.settings.initial_header_level - 1;
                let with_subtitle = doc
                    .children(parent)
                    .get(1)
                    .is_some_and(|&second| matches!(doc[second].kind, NodeKind::Subtitle));
                let attrs = if with_subtitle {
                    Self::class_attr("with-subtitle")
                } else {
                    vec![]
                };
                let tag = self.starttag(doc, id, &format!("h{level}"), "", attrs)?;
                self.body.push(tag);
                if let Some(refid) = refid {
                    let anchor = markup::starttag(
                        &[],
                        &[],
                        "a",
                        "",
                        false,
                        vec![
                            ("class".to_owned(), AttrValue::text("toc-backref")),
                            ("href".to_owned(), AttrValue::text(format!("#{refid}"))),
                        ],
                        false,
                    )?;
                    self.body.push(anchor);
                    close_tag = format!("</a></h{level}>\n");
                } else {
                    close_tag = format!("</h{level}>\n");
                }
            }
        }
        self.context.push(ContextFrame::ClosingTag(close_tag));
        Ok(())
    }

    fn enter_subtitle(&mut self, doc: &Document, id: NodeId) -> Result<()> {
        let parent = doc.parent(id).unwrap_or(id);
        let class = match doc[parent].kind {
            NodeKind::Sidebar => "sidebar-subtitle",
            NodeKind::Document { .. } => "subtitle",
            _ => "section-subtitle",
        };
        let tag = self.starttag(doc, id, "p", "", Self::class_attr(class))?;
        self.body.push(tag);
        if matches!(doc[parent].kind, NodeKind::Document { .. }) {
            self.in_document_title = self.body.len();
        }
        Ok(())
    }

    /// Move the finished document title (or subtitle) out of the body:
    /// the inner content lands in the dedicated part, the complete
    /// markup in `body_pre_docinfo`.
    fn extract_document_title(&mut self, is_title: bool) {
        if self.in_document_title == 0 {
            return;
        }
        let content: Vec<String> =
            self.body[self.in_document_title..self.body.len() - 1].to_vec();
        self.in_document_title = 0;
        if is_title {
            self.title = content;
            self.html_title.extend(self.body.iter().cloned());
        } else {
            self.subtitle = content;
            self.html_subtitle.extend(self.body.iter().cloned());
        }
        self.body_pre_docinfo.append(&mut self.body);
    }

    fn exit_header(&mut self, doc: &Document, id: NodeId) -> Result<()> {
        let start = self.pop_mark()?;
        let mut header = vec![self.starttag(doc, id, "div", "\n", Self::class_attr("header"))?];
        header.extend(self.body[start..].iter().cloned());
        header.push("\n<hr class=\"header\"/>\n</div>\n".to_owned());
        self.body_prefix.extend(header.iter().cloned());
        self.header.extend(header);
        self.body.truncate(start);
        Ok(())
    }

    fn exit_footer(&mut self, doc: &Document, id: NodeId) -> Result<()> {
        let start = self.pop_mark()?;
        let mut footer = vec![
            self.starttag(doc, id, "div", "\n", Self::class_attr("footer"))?,
            "<hr class=\"footer\">\n".to_owned(),
        ];
        footer.extend(self.body[start..].iter().cloned());
        footer.push("\n</div>\n".to_owned());
        self.footer.extend(footer.iter().cloned());
        self.body_suffix.splice(0..0, footer);
        self.body.truncate(start);
        Ok(())
    }

    fn field_child_tag(&self, doc: &Document, id: NodeId, tag: &str) -> Result<String> {
        // The classes of the enclosing field surface here.
        let node = &doc[id];
        let mut classes = node.classes.clone();
        if let Some(field) = doc.parent(id) {
            classes.extend(doc[field].classes.iter().cloned());
        }
        markup::starttag(&node.ids, &classes, tag, "", false, vec![], self.cloaking())
    }

    fn enter_label(&mut self, doc: &Document, id: NodeId) -> Result<()> {
        let parent = doc.parent(id).unwrap_or(id);
        let class = if matches!(doc[parent].kind, NodeKind::Footnote { .. }) {
            self.settings.footnote_references.as_str()
        } else {
            "brackets"
        };
        // The parent's ids land on the dt so backlinks can target it.
        let parent_node = &doc[parent];
        let dt = markup::starttag(
            &parent_node.ids,
            &parent_node.classes,
            "dt",
            "",
            false,
            Self::class_attr("label"),
            self.cloaking(),
        )?;
        self.body.push(dt);
        let span = self.starttag(doc, id, "span", "", Self::class_attr(class))?;
        self.body.push(span);
        if self.settings.footnote_backlinks {
            if let [backref] = Self::label_backrefs(doc, parent).as_slice() {
                self.body
                    .push(format!("<a class=\"fn-backref\" href=\"#{backref}\">"));
            }
        }
        Ok(())
    }

    fn exit_label(&mut self, doc: &Document, id: NodeId) {
        self.body.push("</span>".to_owned());
        if self.settings.footnote_backlinks {
            let parent = doc.parent(id).unwrap_or(id);
            let backrefs = Self::label_backrefs(doc, parent);
            if backrefs.len() == 1 {
                self.body.push("</a>".to_owned());
            } else if backrefs.len() > 1 {
                let backlinks: Vec<String> = backrefs
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("<a href=\"#{r}\">{}</a>", i + 1))
                    .collect();
                self.body.push(format!(
                    "<span class=\"fn-backref\">({})</span>",
                    backlinks.join(",")
                ));
            }
        }
        self.body.push("</dt>\n<dd>".to_owned());
    }

    fn label_backrefs(doc: &Document, parent: NodeId) -> Vec<String> {
        match &doc[parent].kind {
            NodeKind::Footnote { backrefs } | NodeKind::Citation { backrefs } => backrefs.clone(),
            _ => Vec::new(),
        }
    }

    fn enter_reference(
        &mut self,
        doc: &Document,
        id: NodeId,
        refuri: Option<&str>,
        refid: Option<&str>,
    ) -> Result<()> {
        let mut class = "reference".to_owned();
        let href = if let Some(uri) = refuri {
            class.push_str(" external");
            if self.settings.cloak_email_addresses && uri.starts_with("mailto:") {
                self.in_mailto = true;
                markup::cloak_mailto(uri)
            } else {
                uri.to_owned()
            }
        } else {
            class.push_str(" internal");
            format!("#{}", refid.unwrap_or_default())
        };
        let mut attrs: Attrs = vec![("href".to_owned(), AttrValue::Text(markup::attval(&href, self.cloaking())))];

        let children = doc.children(id);
        let image_child = match children {
            [only] => match &doc[*only].kind {
                NodeKind::Image(image) => Some(image.align.clone()),
                _ => None,
            },
            _ => None,
        };
        let parent = doc.parent(id).unwrap_or(id);
        let parent_is_figure = matches!(doc[parent].kind, NodeKind::Figure { .. });

        if let Some(align) = image_child.filter(|_| !parent_is_figure) {
            let halign = horizontal_align(align.as_deref());
            match halign {
                Some("center") => {
                    self.body.push(
                        "<div style=\"height:auto;margin:16px auto;display:table\">\n".to_owned(),
                    );
                    self.context
                        .push(ContextFrame::ClosingTag("</a></div>".to_owned()));
                }
                Some(side @ ("left" | "right")) => {
                    self.body.push(format!(
                        "<div class=\"align-{side}\" style=\"height:auto\">\n"
                    ));
                    self.context
                        .push(ContextFrame::ClosingTag("</a></div>".to_owned()));
                }
                _ => {
                    if doc[parent].kind.is_inline_container() {
                        self.context
                            .push(ContextFrame::ClosingTag("</a>".to_owned()));
                    } else {
                        self.body.push("<div style=\"height:auto\">\n".to_owned());
                        self.context
                            .push(ContextFrame::ClosingTag("</a></div>".to_owned()));
                    }
                }
            }
            class.push_str(" image-reference");
            attrs.push(("style".to_owned(), AttrValue::text("display:inline-block")));
        } else {
            self.context
                .push(ContextFrame::ClosingTag("</a>".to_owned()));
        }
        attrs.push(("class".to_owned(), AttrValue::Text(class)));
        let tag = self.starttag(doc, id, "a", "", attrs)?;
        self.body.push(tag);
        Ok(())
    }

    fn enter_figure(
        &mut self,
        doc: &Document,
        id: NodeId,
        figwidth: Option<&str>,
        align: Option<&str>,
    ) -> Result<()> {
        let mut styles: Vec<(String, String)> = Vec::new();
        if let Some(width) = figwidth {
            styles.push(("width".to_owned(), width.to_owned()));
        }
        let halign = horizontal_align(align);
        styles.push(("vertical-align".to_owned(), "bottom".to_owned()));

        let parent = doc.parent(id).unwrap_or(id);
        let suffix;
        if matches!(doc[parent].kind, NodeKind::Reference { .. }) {
            suffix = "";
            self.context
                .push(ContextFrame::ClosingTag("</figure>".to_owned()));
        } else {
            suffix = "\n";
            match halign {
                Some(side @ ("left" | "right")) => self.body.push(format!(
                    "<div class=\"align-{side}\" style=\"height:auto\">\n"
                )),
                Some("center") => self.body.push(
                    "<div style=\"height:auto;margin:16px auto;display:table\">\n".to_owned(),
                ),
                _ => self.body.push("<div style=\"height:auto\">\n".to_owned()),
            }
            self.context
                .push(ContextFrame::ClosingTag("</figure></div>\n".to_owned()));
        }

        let attrs = if styles.is_empty() {
            vec![]
        } else {
            vec![("style".to_owned(), AttrValue::Text(style_string(&styles)))]
        };
        let tag = self.emptytag(doc, id, "figure", suffix, attrs)?;
        self.body.push(tag);
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn enter_image(
        &mut self,
        doc: &Document,
        id: NodeId,
        image: &doctree::ImageAttrs,
    ) -> Result<()> {
        let mut attrs: Attrs = Vec::new();
        let mut styles: Vec<(String, String)> = Vec::new();
        let mut dims: [Option<(f64, String)>; 2] = [None, None];
        let mut pixel_dims: [Option<f64>; 2] = [None, None];

        for (slot, value) in [image.width.as_deref(), image.height.as_deref()]
            .into_iter()
            .enumerate()
        {
            if let Some((number, unit)) = value.and_then(Self::value_with_unit) {
                if unit == "px" {
                    pixel_dims[slot] = Some(number);
                }
                dims[slot] = Some((number, unit));
            }
        }

        if let Some(scale) = image.scale {
            if !(pixel_dims[0].is_some() && pixel_dims[1].is_some())
                && self.settings.file_insertion_enabled
            {
                if let Some((w, h)) = Self::probe_image(&image.uri) {
                    pixel_dims[0] = Some(f64::from(w));
                    pixel_dims[1] = Some(f64::from(h));
                }
            }
            for (slot, name) in ["width", "height"].into_iter().enumerate() {
                if let Some((number, unit)) = &dims[slot] {
                    let scaled = (number * scale / 100.0).floor() as i64;
                    set_style(&mut styles, name, format!("{scaled}{unit}"));
                }
            }
            let width_set = styles.iter().any(|(n, _)| n == "width");
            let height_set = styles.iter().any(|(n, _)| n == "height");
            if !width_set && height_set {
                for (slot, name) in ["width", "height"].into_iter().enumerate() {
                    if let Some(px) = pixel_dims[slot] {
                        let scaled = (px * scale / 100.0).floor() as i64;
                        set_style(&mut styles, name, format!("{scaled}px"));
                    }
                }
            }
            fill_missing_dimension(&mut styles, || format!("{}%", scale as i64));
        } else {
            for (slot, name) in ["width", "height"].into_iter().enumerate() {
                if let Some((number, unit)) = &dims[slot] {
                    set_style(&mut styles, name, format!("{}{unit}", *number as i64));
                }
            }
            fill_missing_dimension(&mut styles, || "100%".to_owned());
        }

        for (slot, name) in ["width", "height"].into_iter().enumerate() {
            if let Some(px) = pixel_dims[slot] {
                attrs.push((name.to_owned(), AttrValue::text(format!("{}", px as i64))));
            }
        }

        let (halign, valign) = alignments(image.align.as_deref());
        set_style(
            &mut styles,
            "vertical-align",
            valign.unwrap_or("bottom").to_owned(),
        );

        let parent = doc.parent(id).unwrap_or(id);
        let suffix;
        if matches!(
            doc[parent].kind,
            NodeKind::Reference { .. } | NodeKind::Figure { .. }
        ) {
            // Inline context or surrounded by the reference's anchor.
            suffix = "";
            self.context.push(ContextFrame::ClosingTag(String::new()));
        } else {
            suffix = "\n";
            match halign {
                Some(side @ ("left" | "right")) => self.body.push(format!(
                    "<div class=\"align-{side}\" style=\"height:auto\">\n"
                )),
                Some("center") => self.body.push(
                    "<div style=\"height:auto;margin:16px auto;display:table\">\n".to_owned(),
                ),
                _ => self.body.push("<div style=\"height:auto\">\n".to_owned()),
            }
            self.context
                .push(ContextFrame::ClosingTag("</div>\n".to_owned()));
        }

        attrs.push(("style".to_owned(), AttrValue::Text(style_string(&styles))));

        let is_swf = std::path::Path::new(&image.uri)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("swf"));
        if is_swf {
            attrs.push(("data".to_owned(), AttrValue::Text(markup::attval(&image.uri, false))));
            attrs.push((
                "type".to_owned(),
                AttrValue::text("application/x-shockwave-flash"),
            ));
            let open = self.starttag(doc, id, "object", "", attrs)?;
            self.body.push(format!(
                "{open}<param name=\"movie\" value=\"{uri}\"><embed src=\"{uri}\"></embed></object>{suffix}",
                uri = markup::attval(&image.uri, false)
            ));
        } else {
            attrs.push(("src".to_owned(), AttrValue::Text(markup::attval(&image.uri, false))));
            let alt = image.alt.as_deref().unwrap_or(&image.uri);
            attrs.push(("alt".to_owned(), AttrValue::Text(markup::attval(alt, false))));
            let tag = self.emptytag(doc, id, "img", suffix, attrs)?;
            self.body.push(tag);
        }
        Ok(())
    }

    fn enter_entry(
        &mut self,
        doc: &Document,
        id: NodeId,
        morerows: u32,
        morecols: u32,
    ) -> Result<()> {
        let row = doc.parent(id).unwrap_or(id);
        let group = doc.parent(row).unwrap_or(row);
        let mut classes: Vec<&str> = Vec::new();
        if matches!(doc[group].kind, NodeKind::Thead) {
            classes.push("head");
        }
        let column = self.columns.last().copied().unwrap_or(0);
        let is_stub = self
            .stubs
            .last()
            .and_then(|stubs| stubs.get(column).copied())
            .unwrap_or(false);
        if is_stub {
            classes.push("stub");
        }
        let tag_name = if classes.is_empty() { "td" } else { "th" };
        let mut attrs: Attrs = Vec::new();
        if !classes.is_empty() {
            attrs.push(("class".to_owned(), AttrValue::text(classes.join(" "))));
        }
        if morerows > 0 {
            attrs.push(("rowspan".to_owned(), AttrValue::text((morerows + 1).to_string())));
        }
        let mut advance = 1;
        if morecols > 0 {
            attrs.push(("colspan".to_owned(), AttrValue::text((morecols + 1).to_string())));
            advance += morecols as usize;
        }
        if let Some(cursor) = self.columns.last_mut() {
            *cursor += advance;
        }
        let tag = self.starttag(doc, id, tag_name, "", attrs)?;
        self.body.push(tag);
        self.context
            .push(ContextFrame::ClosingTag(format!("</{tag_name}>\n")));
        Ok(())
    }

    fn exit_document(&mut self, doc: &Document, id: NodeId) -> Result<()> {
        self.head_prefix.push(DOCTYPE.to_owned());
        self.head_prefix.push(format!(
            "<html lang=\"{}\">\n",
            self.settings.language_code
        ));
        self.html_prolog.push(DOCTYPE.to_owned());
        let content_type = CONTENT_TYPE.replace("%s", &self.settings.output_encoding);
        self.meta.insert(0, content_type.clone());
        self.head.insert(0, content_type);
        if !self.math.header().is_empty() {
            if self.math.header_in_head() {
                self.head.extend(self.math.header().iter().cloned());
            } else {
                self.stylesheet.extend(self.math.header().iter().cloned());
            }
        }
        // The charset meta is replaced by the uninterpolated template
        // already present in html_head.
        self.html_head.extend(self.head[1..].iter().cloned());
        let open = self.starttag(doc, id, "div", "\n", Self::class_attr("document"))?;
        self.body_prefix.push(open);
        self.body_suffix.insert(0, "</div>\n".to_owned());
        self.fragment.extend(self.body.iter().cloned());
        self.html_body.extend(
            self.body_prefix[1..]
                .iter()
                .chain(&self.body_pre_docinfo)
                .chain(&self.docinfo)
                .chain(&self.body)
                .chain(&self.body_suffix[..self.body_suffix.len() - 1])
                .cloned(),
        );
        if !self.context.is_empty() {
            return Err(Error::ContextLeak(self.context.len()));
        }
        Ok(())
    }
}

/// Escape a double dash inside comment text: a `-` directly followed
/// by another `-` gets a space appended.
fn escape_comment_dashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '-' && chars.peek() == Some(&'-') {
            out.push(' ');
        }
    }
    out
}

/// Join style pairs into a `style` attribute value, insertion order
/// preserved.
fn style_string(styles: &[(String, String)]) -> String {
    styles
        .iter()
        .map(|(name, value)| format!("{name}:{value};"))
        .collect()
}

fn set_style(styles: &mut Vec<(String, String)>, name: &str, value: String) {
    if let Some(entry) = styles.iter_mut().find(|(n, _)| n == name) {
        entry.1 = value;
    } else {
        styles.push((name.to_owned(), value));
    }
}

/// Complete a width/height pair: a single given dimension is padded
/// with `auto`, a fully absent pair falls back to a maximum width.
fn fill_missing_dimension(styles: &mut Vec<(String, String)>, max_width: impl FnOnce() -> String) {
    let width = styles.iter().any(|(n, _)| n == "width");
    let height = styles.iter().any(|(n, _)| n == "height");
    if width && !height {
        styles.push(("height".to_owned(), "auto".to_owned()));
    } else if !width && height {
        styles.push(("width".to_owned(), "auto".to_owned()));
    } else if !width && !height {
        styles.push(("max-width".to_owned(), max_width()));
        styles.push(("height".to_owned(), "auto".to_owned()));
    }
}

fn horizontal_align(align: Option<&str>) -> Option<&str> {
    let (halign, _) = alignments(align);
    halign
}

/// Split a comma-separated alignment value into its horizontal and
/// vertical components. Later values win.
fn alignments(align: Option<&str>) -> (Option<&str>, Option<&str>) {
    let mut halign = None;
    let mut valign = None;
    if let Some(align) = align {
        for value in align.split(',').map(str::trim) {
            match value {
                "left" | "right" | "center" => halign = Some(value),
                "top" | "bottom" | "middle" => valign = Some(value),
                _ => {}
            }
        }
    }
    (halign, valign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree::ImageAttrs;
    use pretty_assertions::assert_eq;

    fn test_settings() -> Settings {
        Settings {
            stylesheet_path: Vec::new(),
            ..Settings::default()
        }
    }

    fn render(doc: &mut Document) -> HtmlTranslator<'static> {
        static SETTINGS: LazyLock<Settings> = LazyLock::new(|| Settings {
            stylesheet_path: Vec::new(),
            ..Settings::default()
        });
        let mut translator = HtmlTranslator::new(&SETTINGS);
        translator.translate(doc).unwrap();
        translator
    }

    fn body_text(translator: &HtmlTranslator<'_>) -> String {
        translator.body.concat()
    }

    #[test]
    fn test_document_title_moves_out_of_body() {
        let mut doc = Document::with_title(Some("Meta title"));
        let title = doc.push(doc.root(), NodeKind::Title { refid: None });
        doc.push_text(title, "Hi");
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        doc.push_text(para, "Body text.");

        let translator = render(&mut doc);
        assert_eq!(translator.title.concat(), "Hi");
        assert_eq!(
            translator.body_pre_docinfo.concat(),
            "<h1 class=\"title\">Hi</h1>\n"
        );
        let body = body_text(&translator);
        assert!(!body.contains("<h1"));
        assert!(body.contains("<p>Body text.</p>"));
        assert!(translator.head.concat().contains("<title>Meta title</title>"));
    }

    #[test]
    fn test_section_titles_follow_nesting_depth() {
        let mut doc = Document::new();
        let outer = doc.push(doc.root(), NodeKind::Section);
        let t1 = doc.push(outer, NodeKind::Title { refid: None });
        doc.push_text(t1, "Outer");
        let inner = doc.push(outer, NodeKind::Section);
        let t2 = doc.push(inner, NodeKind::Title { refid: None });
        doc.push_text(t2, "Inner");

        let body = body_text(&render(&mut doc));
        assert!(body.contains("<h1>Outer</h1>"));
        assert!(body.contains("<h2>Inner</h2>"));
    }

    #[test]
    fn test_simple_list_tagged_once() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        let item = doc.push(list, NodeKind::ListItem);
        let para = doc.push(item, NodeKind::Paragraph);
        doc.push_text(para, "one");
        let nested = doc.push(item, NodeKind::BulletList);
        let nested_item = doc.push(nested, NodeKind::ListItem);
        let nested_para = doc.push(nested_item, NodeKind::Paragraph);
        doc.push_text(nested_para, "two");

        let body = body_text(&render(&mut doc));
        assert_eq!(body.matches("class=\"simple\"").count(), 1);
        assert!(body.starts_with("<ul class=\"simple\">"));
    }

    #[test]
    fn test_paragraph_newline_suppressed_in_single_child_item() {
        let mut doc = Document::new();
        let list = doc.push(doc.root(), NodeKind::BulletList);
        let item = doc.push(list, NodeKind::ListItem);
        let para = doc.push(item, NodeKind::Paragraph);
        doc.push_text(para, "only");

        let body = body_text(&render(&mut doc));
        assert!(body.contains("</p></li>\n"));
    }

    #[test]
    fn test_enumerated_list_start_and_type() {
        let mut doc = Document::new();
        let list = doc.push(
            doc.root(),
            NodeKind::EnumeratedList {
                start: Some(3),
                enumtype: Some("loweralpha".to_owned()),
            },
        );
        let item = doc.push(list, NodeKind::ListItem);
        let para = doc.push(item, NodeKind::Paragraph);
        doc.push_text(para, "c");

        let body = body_text(&render(&mut doc));
        assert!(body.starts_with("<ol class=\"loweralpha simple\" start=\"3\">"));
    }

    #[test]
    fn test_footnotes_share_one_list() {
        let mut doc = Document::new();
        for text in ["first", "second"] {
            let footnote = doc.push(
                doc.root(),
                NodeKind::Footnote {
                    backrefs: vec!["r1".to_owned()],
                },
            );
            let label = doc.push(footnote, NodeKind::Label);
            doc.push_text(label, "1");
            let para = doc.push(footnote, NodeKind::Paragraph);
            doc.push_text(para, text);
        }

        let body = body_text(&render(&mut doc));
        assert_eq!(body.matches("<dl class=\"footnote brackets\">").count(), 1);
        assert_eq!(body.matches("</dl>").count(), 1);
        assert!(body.contains("<a class=\"fn-backref\" href=\"#r1\">"));
    }

    #[test]
    fn test_multiple_backrefs_render_as_backref_list() {
        let mut doc = Document::new();
        let footnote = doc.push(
            doc.root(),
            NodeKind::Footnote {
                backrefs: vec!["a".to_owned(), "b".to_owned()],
            },
        );
        let label = doc.push(footnote, NodeKind::Label);
        doc.push_text(label, "1");
        let para = doc.push(footnote, NodeKind::Paragraph);
        doc.push_text(para, "text");

        let body = body_text(&render(&mut doc));
        assert!(body.contains(
            "<span class=\"fn-backref\">(<a href=\"#a\">1</a>,<a href=\"#b\">2</a>)</span>"
        ));
    }

    #[test]
    fn test_table_colspecs_render_percent_widths() {
        let mut doc = Document::new();
        let table = doc.push(doc.root(), NodeKind::Table);
        let tgroup = doc.push(table, NodeKind::Tgroup { cols: 2 });
        doc.push(tgroup, NodeKind::Colspec { colwidth: 1, stub: true });
        doc.push(tgroup, NodeKind::Colspec { colwidth: 2, stub: false });
        let tbody = doc.push(tgroup, NodeKind::Tbody);
        let row = doc.push(tbody, NodeKind::Row);
        for text in ["a", "b"] {
            let entry = doc.push(row, NodeKind::Entry { morerows: 0, morecols: 0 });
            let para = doc.push(entry, NodeKind::Paragraph);
            doc.push_text(para, text);
        }

        let body = body_text(&render(&mut doc));
        assert!(body.contains("<col style=\"width:33%\">"));
        assert!(body.contains("<col style=\"width:67%\">"));
        // First column is a stub, so its cell is a header cell.
        assert!(body.contains("<th class=\"stub\">"));
        assert!(body.contains("<td>"));
    }

    #[test]
    fn test_entry_spans_advance_column_cursor() {
        let mut doc = Document::new();
        let table = doc.push(doc.root(), NodeKind::Table);
        let tgroup = doc.push(table, NodeKind::Tgroup { cols: 3 });
        doc.push(tgroup, NodeKind::Colspec { colwidth: 1, stub: false });
        doc.push(tgroup, NodeKind::Colspec { colwidth: 1, stub: false });
        doc.push(tgroup, NodeKind::Colspec { colwidth: 1, stub: true });
        let tbody = doc.push(tgroup, NodeKind::Tbody);
        let row = doc.push(tbody, NodeKind::Row);
        let wide = doc.push(row, NodeKind::Entry { morerows: 0, morecols: 1 });
        let para = doc.push(wide, NodeKind::Paragraph);
        doc.push_text(para, "span");
        let last = doc.push(row, NodeKind::Entry { morerows: 0, morecols: 0 });
        let para = doc.push(last, NodeKind::Paragraph);
        doc.push_text(para, "stub cell");

        let body = body_text(&render(&mut doc));
        assert!(body.contains("<td colspan=\"2\">"));
        // The span pushes the second entry into the stub column.
        assert!(body.contains("<th class=\"stub\">"));
    }

    #[test]
    fn test_comment_dashes_are_escaped_and_children_skipped() {
        let mut doc = Document::new();
        let comment = doc.push(doc.root(), NodeKind::Comment);
        doc.push_text(comment, "a -- b");

        let body = body_text(&render(&mut doc));
        assert!(body.contains("<!-- a - - b -->"));
        assert!(!body.contains("a -- b"));
    }

    #[test]
    fn test_raw_html_passes_through_other_formats_dropped() {
        let mut doc = Document::new();
        let html = doc.push(
            doc.root(),
            NodeKind::Raw {
                formats: vec!["html".to_owned()],
            },
        );
        doc.push_text(html, "<b>bold</b>");
        let latex = doc.push(
            doc.root(),
            NodeKind::Raw {
                formats: vec!["latex".to_owned()],
            },
        );
        doc.push_text(latex, "\\textbf{bold}");
        // Never traversed; would fail the walk if it were.
        doc.push(latex, NodeKind::SubstitutionReference);

        let body = body_text(&render(&mut doc));
        assert!(body.contains("<b>bold</b>"));
        assert!(!body.contains("textbf"));
    }

    #[test]
    fn test_image_scale_without_dimensions_uses_max_width() {
        let mut doc = Document::new();
        doc.push(
            doc.root(),
            NodeKind::Image(ImageAttrs {
                uri: "missing.png".to_owned(),
                scale: Some(50.0),
                ..ImageAttrs::default()
            }),
        );

        let settings = Settings {
            file_insertion_enabled: false,
            ..test_settings()
        };
        let mut translator = HtmlTranslator::new(&settings);
        translator.translate(&mut doc).unwrap();
        let body = body_text(&translator);
        assert!(body.contains(
            "style=\"max-width:50%;height:auto;vertical-align:bottom;\""
        ));
        assert!(body.contains("alt=\"missing.png\""));
    }

    #[test]
    fn test_image_explicit_width_is_scaled() {
        let mut doc = Document::new();
        doc.push(
            doc.root(),
            NodeKind::Image(ImageAttrs {
                uri: "pic.png".to_owned(),
                width: Some("10em".to_owned()),
                scale: Some(50.0),
                ..ImageAttrs::default()
            }),
        );

        let settings = Settings {
            file_insertion_enabled: false,
            ..test_settings()
        };
        let mut translator = HtmlTranslator::new(&settings);
        translator.translate(&mut doc).unwrap();
        let body = body_text(&translator);
        assert!(body.contains("width:5em;height:auto;vertical-align:bottom;"));
    }

    #[test]
    fn test_wide_character_line_break_removed() {
        let mut doc = Document::new();
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        doc.push_text(para, "\u{65e5}\u{672c}\n\u{8a9e}");

        let body = body_text(&render(&mut doc));
        assert!(body.contains("<p>\u{65e5}\u{672c}\u{8a9e}</p>"));
    }

    #[test]
    fn test_mailto_reference_is_cloaked() {
        let mut doc = Document::new();
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        let reference = doc.push(
            para,
            NodeKind::Reference {
                refuri: Some("mailto:user@example.com".to_owned()),
                refid: None,
            },
        );
        doc.push_text(reference, "user@example.com");

        let settings = Settings {
            cloak_email_addresses: true,
            ..test_settings()
        };
        let mut translator = HtmlTranslator::new(&settings);
        translator.translate(&mut doc).unwrap();
        let body = body_text(&translator);
        assert!(body.contains("href=\"mailto:user&#37;&#52;&#48;example&#46;com\""));
        assert!(body.contains("user<span>&#64;</span>example<span>&#46;</span>com"));
    }

    #[test]
    fn test_literal_text_is_protected() {
        let mut doc = Document::new();
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        let literal = doc.push(para, NodeKind::Literal);
        doc.push_text(literal, "two  words");

        let body = body_text(&render(&mut doc));
        assert!(body.contains("<span class=\"pre\">two</span>"));
        assert!(body.contains("&nbsp; <span class=\"pre\">words</span>"));
    }

    #[test]
    fn test_docinfo_author_gets_meta_and_label() {
        let mut doc = Document::new();
        let docinfo = doc.push(doc.root(), NodeKind::Docinfo);
        let author = doc.push(docinfo, NodeKind::Author);
        doc.push_text(author, "Ada");

        let translator = render(&mut doc);
        let body = body_text(&translator);
        assert!(body.contains("<dt class=\"author\">Author</dt>"));
        assert!(body.contains("<p>Ada</p>"));
        assert!(translator
            .meta
            .concat()
            .contains("<meta name=\"author\" content=\"Ada\">"));
    }

    #[test]
    fn test_header_moves_to_body_prefix() {
        let mut doc = Document::new();
        let header = doc.push(doc.root(), NodeKind::Header);
        let para = doc.push(header, NodeKind::Paragraph);
        doc.push_text(para, "top matter");

        let translator = render(&mut doc);
        assert!(!body_text(&translator).contains("top matter"));
        let prefix = translator.body_prefix.concat();
        assert!(prefix.contains("<div class=\"header\">"));
        assert!(prefix.contains("top matter"));
    }

    #[test]
    fn test_system_message_title_line() {
        let mut doc = Document::new();
        let message = doc.push(
            doc.root(),
            NodeKind::SystemMessage(doctree::SystemMessageAttrs {
                msg_type: "WARNING".to_owned(),
                level: 2,
                source: "input.txt".to_owned(),
                line: Some(7),
                backrefs: vec!["id1".to_owned()],
            }),
        );
        let para = doc.push(message, NodeKind::Paragraph);
        doc.push_text(para, "problem");

        let body = body_text(&render(&mut doc));
        assert!(body.contains(
            "System Message: WARNING/2 (<span class=\"docutils literal\">input.txt</span>, line 7); \
             <em><a href=\"#id1\">backlink</a></em></p>"
        ));
    }

    #[test]
    fn test_attribution_dash_format() {
        let mut doc = Document::new();
        let quote = doc.push(doc.root(), NodeKind::BlockQuote);
        let para = doc.push(quote, NodeKind::Paragraph);
        doc.push_text(para, "Words.");
        let attribution = doc.push(quote, NodeKind::Attribution);
        doc.push_text(attribution, "Someone");

        let body = body_text(&render(&mut doc));
        assert!(body.contains("<p class=\"attribution\">\u{2014}<cite>Someone</cite></p>"));
    }

    #[test]
    fn test_assembled_page_shape() {
        let mut doc = Document::with_title(Some("Page"));
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        doc.push_text(para, "Hello.");

        let translator = render(&mut doc);
        let page = translator.astext();
        assert!(page.starts_with("<!DOCTYPE html>\n<html lang=\"en\">\n"));
        assert!(page.contains("<meta charset=\"utf-8\">"));
        assert!(page.contains("<div class=\"document\">"));
        assert!(page.ends_with("</div>\n</body>\n</html>\n"));
    }

    #[test]
    fn test_unbalanced_context_is_reported() {
        let settings = test_settings();
        let mut translator = HtmlTranslator::new(&settings);
        translator
            .context
            .push(ContextFrame::ClosingTag("</stray>".to_owned()));
        let mut doc = Document::new();
        let err = translator.translate(&mut doc).unwrap_err();
        assert!(matches!(err, Error::ContextLeak(1)));
    }
}
