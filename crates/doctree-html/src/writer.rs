//! Document assembler.
//!
//! Drives one [`HtmlTranslator`] pass over a document and exposes the
//! result two ways: the complete page rendered through a template, and
//! the named output parts for callers that embed fragments into their
//! own page shells (the `fragment` and `html_body` parts in
//! particular).

use std::collections::HashMap;

use doctree::Document;

use crate::error::{Error, Result};
use crate::math::MathConverter;
use crate::settings::Settings;
use crate::translator::HtmlTranslator;

/// Reproduces the translator's own part order; placeholders are filled
/// with each part's text, trailing newlines trimmed, one part per line.
pub const DEFAULT_TEMPLATE: &str = "\
%(head_prefix)s
%(head)s
%(stylesheet)s
%(body_prefix)s
%(body_pre_docinfo)s
%(docinfo)s
%(body)s
%(body_suffix)s
";

/// Named output parts of one rendered document.
///
/// Every part is the concatenation of the matching translator buffer,
/// with trailing newlines kept. `whole` is the template-rendered page.
#[derive(Clone, Debug, Default)]
pub struct Parts {
    pub head_prefix: String,
    pub head: String,
    pub stylesheet: String,
    pub body_prefix: String,
    pub body_pre_docinfo: String,
    pub docinfo: String,
    pub body: String,
    pub body_suffix: String,
    pub title: String,
    pub subtitle: String,
    pub header: String,
    pub footer: String,
    pub meta: String,
    pub fragment: String,
    pub html_prolog: String,
    pub html_head: String,
    pub html_title: String,
    pub html_subtitle: String,
    pub html_body: String,
    pub whole: String,
    pub encoding: String,
    pub version: String,
}

/// HTML writer: settings plus the page template.
pub struct HtmlWriter<'a> {
    settings: &'a Settings,
    template: String,
    math_converter: Option<Box<dyn MathConverter>>,
}

impl<'a> HtmlWriter<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            template: DEFAULT_TEMPLATE.to_owned(),
            math_converter: None,
        }
    }

    /// Replace the page template. Placeholders take the form
    /// `%(part)s`; a literal percent sign is written `%%`.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Replace the LaTeX-to-HTML conversion strategy of the `html`
    /// math output mode.
    #[must_use]
    pub fn with_math_converter(mut self, converter: Box<dyn MathConverter>) -> Self {
        self.math_converter = Some(converter);
        self
    }

    /// Render `doc` and return the assembled parts.
    pub fn write(&mut self, doc: &mut Document) -> Result<Parts> {
        self.settings.validate()?;
        let mut translator = HtmlTranslator::new(self.settings);
        if let Some(converter) = self.math_converter.take() {
            translator = translator.with_math_converter(converter);
        }
        translator.translate(doc)?;

        let whole = fill_template(&self.template, &interpolation_dict(&translator, self.settings))?;
        let join = |buffer: &[String]| buffer.concat();
        Ok(Parts {
            head_prefix: join(&translator.head_prefix),
            head: join(&translator.head),
            stylesheet: join(&translator.stylesheet),
            body_prefix: join(&translator.body_prefix),
            body_pre_docinfo: join(&translator.body_pre_docinfo),
            docinfo: join(&translator.docinfo),
            body: join(&translator.body),
            body_suffix: join(&translator.body_suffix),
            title: join(&translator.title),
            subtitle: join(&translator.subtitle),
            header: join(&translator.header),
            footer: join(&translator.footer),
            meta: join(&translator.meta),
            fragment: join(&translator.fragment),
            html_prolog: join(&translator.html_prolog),
            html_head: join(&translator.html_head),
            html_title: join(&translator.html_title),
            html_subtitle: join(&translator.html_subtitle),
            html_body: join(&translator.html_body),
            whole,
            encoding: self.settings.output_encoding.clone(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        })
    }
}

/// Template values: every part with trailing newlines trimmed, plus
/// the output encoding and the writer version.
fn interpolation_dict(
    translator: &HtmlTranslator<'_>,
    settings: &Settings,
) -> HashMap<&'static str, String> {
    let trimmed = |buffer: &[String]| buffer.concat().trim_end_matches('\n').to_owned();
    let mut dict: HashMap<&'static str, String> = HashMap::new();
    dict.insert("head_prefix", trimmed(&translator.head_prefix));
    dict.insert("head", trimmed(&translator.head));
    dict.insert("stylesheet", trimmed(&translator.stylesheet));
    dict.insert("body_prefix", trimmed(&translator.body_prefix));
    dict.insert("body_pre_docinfo", trimmed(&translator.body_pre_docinfo));
    dict.insert("docinfo", trimmed(&translator.docinfo));
    dict.insert("body", trimmed(&translator.body));
    dict.insert("body_suffix", trimmed(&translator.body_suffix));
    dict.insert("title", trimmed(&translator.title));
    dict.insert("subtitle", trimmed(&translator.subtitle));
    dict.insert("header", trimmed(&translator.header));
    dict.insert("footer", trimmed(&translator.footer));
    dict.insert("meta", trimmed(&translator.meta));
    dict.insert("fragment", trimmed(&translator.fragment));
    dict.insert("html_prolog", trimmed(&translator.html_prolog));
    dict.insert("html_head", trimmed(&translator.html_head));
    dict.insert("html_title", trimmed(&translator.html_title));
    dict.insert("html_subtitle", trimmed(&translator.html_subtitle));
    dict.insert("html_body", trimmed(&translator.html_body));
    dict.insert("encoding", settings.output_encoding.clone());
    dict.insert("version", env!("CARGO_PKG_VERSION").to_owned());
    dict
}

/// Substitute `%(name)s` placeholders; `%%` is a literal percent sign.
fn fill_template(template: &str, values: &HashMap<&'static str, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        if let Some(stripped) = rest.strip_prefix('%') {
            out.push('%');
            rest = stripped;
        } else if let Some(after_paren) = rest.strip_prefix('(') {
            let close = after_paren
                .find(")s")
                .ok_or_else(|| Error::Template(after_paren.to_owned()))?;
            let name = &after_paren[..close];
            let value = values
                .get(name)
                .ok_or_else(|| Error::Template(name.to_owned()))?;
            out.push_str(value);
            rest = &after_paren[close + 2..];
        } else {
            out.push('%');
        }
    }
    out.push_str(rest);
    Ok(out)
}
