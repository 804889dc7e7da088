//! The node-kind vocabulary.
//!
//! Every node in a [`Document`](crate::Document) carries exactly one
//! `NodeKind`. Kind-specific attributes live as variant payloads, so a
//! renderer can dispatch with a single exhaustive `match` instead of
//! downcasting.

/// Attributes of an image node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageAttrs {
    /// Image location, as written in the source document.
    pub uri: String,
    /// Alternate text. Renderers fall back to the URI when absent.
    pub alt: Option<String>,
    /// Explicit width, a number with an optional unit (`"120"`, `"50%"`, `"4em"`).
    pub width: Option<String>,
    /// Explicit height, same format as `width`.
    pub height: Option<String>,
    /// Scale factor in percent.
    pub scale: Option<f64>,
    /// Comma-separated alignment values (`left`/`right`/`center`,
    /// `top`/`middle`/`bottom`).
    pub align: Option<String>,
}

/// Attributes of a system-message node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemMessageAttrs {
    /// Message category, e.g. `"WARNING"` or `"ERROR"`.
    pub msg_type: String,
    /// Numeric severity level.
    pub level: u32,
    /// Source file or description the message refers to.
    pub source: String,
    /// Source line, when known.
    pub line: Option<u32>,
    /// Identifiers of the places in the text that triggered the message.
    pub backrefs: Vec<String>,
}

/// The discriminant identifying what a tree node represents.
///
/// The vocabulary mirrors the upstream parser's element set. Inline
/// text lives in [`NodeKind::Text`] leaves; every other kind is a
/// container whose content is its child sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A leaf run of text.
    Text(String),
    /// The document root.
    Document {
        /// Metadata title used for the `<title>` element.
        title: Option<String>,
    },
    Section,
    Title {
        /// Identifier of a table-of-contents entry linking back here.
        refid: Option<String>,
    },
    Subtitle,
    Paragraph,

    // Lists
    BulletList,
    EnumeratedList {
        /// Explicit start ordinal, when not 1.
        start: Option<u64>,
        /// Enumeration style, e.g. `"arabic"` or `"loweralpha"`.
        enumtype: Option<String>,
    },
    ListItem,
    DefinitionList,
    DefinitionListItem,
    Term,
    Classifier,
    Definition,
    FieldList,
    Field,
    FieldName,
    FieldBody,
    OptionList,
    OptionListItem,
    OptionGroup,
    /// A single command-line option within an option group.
    OptionElement,
    OptionString,
    OptionArgument {
        /// Separator between option string and argument, defaults to a space.
        delimiter: Option<String>,
    },
    Description,

    // Bibliographic fields
    Docinfo,
    Address,
    Author,
    Authors,
    Contact,
    Copyright,
    Date,
    Organization,
    Revision,
    Status,
    Version,

    // Body elements
    BlockQuote,
    Attribution,
    LiteralBlock,
    DoctestBlock,
    LineBlock,
    Line,
    Rubric,
    Topic,
    Sidebar,
    Admonition,
    Compound,
    Container,
    Decoration,
    Header,
    Footer,
    Transition,
    Figure {
        /// Figure width, number with optional unit.
        figwidth: Option<String>,
        /// Comma-separated alignment values.
        align: Option<String>,
    },
    Caption,
    Legend,
    Image(ImageAttrs),

    // Inline elements
    Literal,
    Emphasis,
    Strong,
    Subscript,
    Superscript,
    TitleReference,
    Abbreviation,
    Acronym,
    Inline,
    Reference {
        /// External target URI.
        refuri: Option<String>,
        /// Internal target identifier.
        refid: Option<String>,
    },
    Target {
        refuri: Option<String>,
        refid: Option<String>,
        refname: Option<String>,
    },
    FootnoteReference {
        refid: String,
    },
    CitationReference {
        refid: Option<String>,
        refname: Option<String>,
    },
    Footnote {
        /// Identifiers of the references pointing at this footnote.
        backrefs: Vec<String>,
    },
    Citation {
        backrefs: Vec<String>,
    },
    Label,
    Generated,
    Problematic {
        refid: Option<String>,
    },

    // Tables
    Table,
    Tgroup {
        /// Declared column count.
        cols: usize,
    },
    Colspec {
        /// Relative column width.
        colwidth: u32,
        /// Whether cells in this column render as header-style cells.
        stub: bool,
    },
    Thead,
    Tbody,
    Row,
    Entry {
        /// Rows spanned beyond the first.
        morerows: u32,
        /// Columns spanned beyond the first.
        morecols: u32,
    },

    // Math
    Math,
    MathBlock,

    // Special
    Raw {
        /// Output formats this raw content targets, e.g. `["html"]`.
        formats: Vec<String>,
    },
    Comment,
    SubstitutionDefinition,
    SubstitutionReference,
    SystemMessage(SystemMessageAttrs),
    Meta {
        /// Attribute name/value pairs emitted verbatim on the tag.
        attrs: Vec<(String, String)>,
    },
    Pending,
}

impl NodeKind {
    /// Stable kind name for diagnostics and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Text(_) => "text",
            NodeKind::Document { .. } => "document",
            NodeKind::Section => "section",
            NodeKind::Title { .. } => "title",
            NodeKind::Subtitle => "subtitle",
            NodeKind::Paragraph => "paragraph",
            NodeKind::BulletList => "bullet_list",
            NodeKind::EnumeratedList { .. } => "enumerated_list",
            NodeKind::ListItem => "list_item",
            NodeKind::DefinitionList => "definition_list",
            NodeKind::DefinitionListItem => "definition_list_item",
            NodeKind::Term => "term",
            NodeKind::Classifier => "classifier",
            NodeKind::Definition => "definition",
            NodeKind::FieldList => "field_list",
            NodeKind::Field => "field",
            NodeKind::FieldName => "field_name",
            NodeKind::FieldBody => "field_body",
            NodeKind::OptionList => "option_list",
            NodeKind::OptionListItem => "option_list_item",
            NodeKind::OptionGroup => "option_group",
            NodeKind::OptionElement => "option",
            NodeKind::OptionString => "option_string",
            NodeKind::OptionArgument { .. } => "option_argument",
            NodeKind::Description => "description",
            NodeKind::Docinfo => "docinfo",
            NodeKind::Address => "address",
            NodeKind::Author => "author",
            NodeKind::Authors => "authors",
            NodeKind::Contact => "contact",
            NodeKind::Copyright => "copyright",
            NodeKind::Date => "date",
            NodeKind::Organization => "organization",
            NodeKind::Revision => "revision",
            NodeKind::Status => "status",
            NodeKind::Version => "version",
            NodeKind::BlockQuote => "block_quote",
            NodeKind::Attribution => "attribution",
            NodeKind::LiteralBlock => "literal_block",
            NodeKind::DoctestBlock => "doctest_block",
            NodeKind::LineBlock => "line_block",
            NodeKind::Line => "line",
            NodeKind::Rubric => "rubric",
            NodeKind::Topic => "topic",
            NodeKind::Sidebar => "sidebar",
            NodeKind::Admonition => "admonition",
            NodeKind::Compound => "compound",
            NodeKind::Container => "container",
            NodeKind::Decoration => "decoration",
            NodeKind::Header => "header",
            NodeKind::Footer => "footer",
            NodeKind::Transition => "transition",
            NodeKind::Figure { .. } => "figure",
            NodeKind::Caption => "caption",
            NodeKind::Legend => "legend",
            NodeKind::Image(_) => "image",
            NodeKind::Literal => "literal",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::Subscript => "subscript",
            NodeKind::Superscript => "superscript",
            NodeKind::TitleReference => "title_reference",
            NodeKind::Abbreviation => "abbreviation",
            NodeKind::Acronym => "acronym",
            NodeKind::Inline => "inline",
            NodeKind::Reference { .. } => "reference",
            NodeKind::Target { .. } => "target",
            NodeKind::FootnoteReference { .. } => "footnote_reference",
            NodeKind::CitationReference { .. } => "citation_reference",
            NodeKind::Footnote { .. } => "footnote",
            NodeKind::Citation { .. } => "citation",
            NodeKind::Label => "label",
            NodeKind::Generated => "generated",
            NodeKind::Problematic { .. } => "problematic",
            NodeKind::Table => "table",
            NodeKind::Tgroup { .. } => "tgroup",
            NodeKind::Colspec { .. } => "colspec",
            NodeKind::Thead => "thead",
            NodeKind::Tbody => "tbody",
            NodeKind::Row => "row",
            NodeKind::Entry { .. } => "entry",
            NodeKind::Math => "math",
            NodeKind::MathBlock => "math_block",
            NodeKind::Raw { .. } => "raw",
            NodeKind::Comment => "comment",
            NodeKind::SubstitutionDefinition => "substitution_definition",
            NodeKind::SubstitutionReference => "substitution_reference",
            NodeKind::SystemMessage(_) => "system_message",
            NodeKind::Meta { .. } => "meta",
            NodeKind::Pending => "pending",
        }
    }

    /// Kinds that produce no visible output and are skipped by layout
    /// decisions such as compact-list classification.
    pub fn is_invisible(&self) -> bool {
        matches!(
            self,
            NodeKind::Comment
                | NodeKind::SubstitutionDefinition
                | NodeKind::Target { .. }
                | NodeKind::Pending
        )
    }

    /// Kinds whose content model is text plus inline elements.
    ///
    /// Renderers consult this to decide between inline and block
    /// treatment of children, e.g. `span` vs `div` for raw output.
    pub fn is_inline_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Title { .. }
                | NodeKind::Subtitle
                | NodeKind::Rubric
                | NodeKind::Attribution
                | NodeKind::Caption
                | NodeKind::Line
                | NodeKind::Term
                | NodeKind::Classifier
                | NodeKind::FieldName
                | NodeKind::LiteralBlock
                | NodeKind::DoctestBlock
                | NodeKind::Literal
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Subscript
                | NodeKind::Superscript
                | NodeKind::TitleReference
                | NodeKind::Abbreviation
                | NodeKind::Acronym
                | NodeKind::Inline
                | NodeKind::Reference { .. }
                | NodeKind::FootnoteReference { .. }
                | NodeKind::CitationReference { .. }
                | NodeKind::Label
                | NodeKind::Generated
                | NodeKind::Problematic { .. }
                | NodeKind::Math
                | NodeKind::MathBlock
        )
    }

    /// Whether this kind is an admonition container.
    pub fn is_admonition(&self) -> bool {
        matches!(self, NodeKind::Admonition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_snake_case() {
        assert_eq!(NodeKind::BulletList.name(), "bullet_list");
        assert_eq!(NodeKind::Text(String::new()).name(), "text");
        assert_eq!(
            NodeKind::Reference {
                refuri: None,
                refid: None
            }
            .name(),
            "reference"
        );
    }

    #[test]
    fn test_invisible_kinds() {
        assert!(NodeKind::Comment.is_invisible());
        assert!(
            NodeKind::Target {
                refuri: None,
                refid: None,
                refname: None
            }
            .is_invisible()
        );
        assert!(!NodeKind::Paragraph.is_invisible());
    }

    #[test]
    fn test_inline_containers() {
        assert!(NodeKind::Paragraph.is_inline_container());
        assert!(NodeKind::Emphasis.is_inline_container());
        assert!(!NodeKind::BulletList.is_inline_container());
        assert!(!NodeKind::Table.is_inline_container());
    }
}
