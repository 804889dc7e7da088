//! Math dispatcher.
//!
//! HTML has no universal native math support, so an embedded formula is
//! converted to one of several target notations depending on the
//! configured output mode:
//!
//! - `mathml` parses the LaTeX source and serializes MathML,
//! - `html` converts Unicode math characters to TeX macros and renders
//!   through a pluggable [`MathConverter`],
//! - `mathjax` emits the delimited source for client-side rendering and
//!   registers the script include once per document,
//! - `latex` passes the source through for later external typesetting.
//!
//! An unrecognized mode falls back to `latex` with a logged warning.

use pulldown_latex::config::{DisplayMode, RenderConfig};
use pulldown_latex::mathml::push_mathml;
use pulldown_latex::{Parser, Storage};
use tracing::warn;

use crate::markup::encode;
use crate::settings::Settings;

/// Script include registered on first MathJax use.
const MATHJAX_SCRIPT: &str = "<script type=\"text/javascript\" src=\"%s\"></script>\n";

/// Default MathJax location, overridable via a mode argument.
const MATHJAX_URL: &str =
    "http://cdn.mathjax.org/mathjax/latest/MathJax.js?config=TeX-AMS-MML_HTMLorMML";

/// Pluggable LaTeX-to-HTML conversion strategy for the `html` mode.
///
/// The conversion library itself is an external collaborator; the
/// default [`EncodedTex`] implementation emits the delimited, encoded
/// TeX source unchanged.
pub trait MathConverter {
    /// Convert delimited TeX source to an HTML fragment.
    ///
    /// `displayed` is true for block-level formulas. An `Err` carries a
    /// human-readable message and triggers the writer's diagnostic +
    /// verbatim-fallback rendering.
    fn convert(&self, tex: &str, displayed: bool) -> std::result::Result<String, String>;
}

/// Default converter: encodes the TeX source without converting it.
#[derive(Debug, Default)]
pub struct EncodedTex;

impl MathConverter for EncodedTex {
    fn convert(&self, tex: &str, _displayed: bool) -> std::result::Result<String, String> {
        Ok(encode(tex))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MathMode {
    Mathml,
    Html,
    Mathjax,
    Latex,
}

/// A dispatched formula, ready for the translator to emit.
#[derive(Debug, PartialEq)]
pub enum MathRendered {
    /// Converted content plus its container tag and class argument.
    /// `tag` is `None` when the content carries its own container
    /// (inline MathML).
    Fragment {
        tag: Option<&'static str>,
        class: &'static str,
        code: String,
    },
    /// The formula could not be parsed; the writer emits an inline
    /// diagnostic followed by `fallback` as a verbatim block.
    ParseError { message: String, fallback: String },
}

/// Per-document math state: resolved output mode, mode arguments, and
/// the deduplicated one-time header include.
pub struct MathDispatcher {
    mode: MathMode,
    options: Vec<String>,
    header: Vec<String>,
    converter: Box<dyn MathConverter>,
}

impl MathDispatcher {
    /// Parse a `math_output` settings string: a mode word followed by
    /// optional mode-specific arguments.
    pub fn new(spec: &str) -> Self {
        let mut words = spec.split_whitespace();
        let mode_word = words.next().unwrap_or("latex");
        let options: Vec<String> = words.map(str::to_owned).collect();
        let mode = match mode_word.to_lowercase().as_str() {
            "mathml" => MathMode::Mathml,
            "html" => MathMode::Html,
            "mathjax" => MathMode::Mathjax,
            "latex" => MathMode::Latex,
            other => {
                warn!("math-output format \"{other}\" not supported, falling back to \"latex\"");
                MathMode::Latex
            }
        };
        Self {
            mode,
            options,
            header: Vec::new(),
            converter: Box::new(EncodedTex),
        }
    }

    /// Replace the `html` mode conversion strategy.
    #[must_use]
    pub fn with_converter(mut self, converter: Box<dyn MathConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Whether the one-time header include belongs in the document head
    /// (MathJax script) rather than with the stylesheets.
    pub fn header_in_head(&self) -> bool {
        self.mode == MathMode::Mathjax
    }

    /// Accumulated one-time header fragments.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Convert one formula. `block` selects display (vs inline) layout.
    pub fn dispatch(&mut self, source: &str, block: bool, settings: &Settings) -> MathRendered {
        let env = block.then(|| pick_math_environment(source));
        let mut code = unichar_to_tex(source);

        match self.mode {
            MathMode::Mathml => match latex_to_mathml(&code, block) {
                Ok(mathml) => MathRendered::Fragment {
                    tag: block.then_some("div"),
                    class: "",
                    code: mathml,
                },
                Err(err) => MathRendered::ParseError {
                    message: err.to_string(),
                    fallback: code,
                },
            },
            MathMode::Html => {
                code = wrap_tex(&code, env.as_deref(), "$", "$");
                if self.header.is_empty() && !self.options.is_empty() {
                    let stylesheets = self.options[0].clone();
                    for sheet in stylesheets.split(',') {
                        let path = settings
                            .find_in_dirs(sheet)
                            .map_or_else(|| sheet.to_owned(), |p| p.to_string_lossy().into_owned());
                        self.header.push(settings.stylesheet_call(&path));
                    }
                }
                match self.converter.convert(&code, block) {
                    Ok(html) => MathRendered::Fragment {
                        tag: Some(if block { "div" } else { "span" }),
                        class: "formula",
                        code: html,
                    },
                    Err(message) => MathRendered::ParseError {
                        message,
                        fallback: code,
                    },
                }
            }
            MathMode::Mathjax => {
                code = encode(&wrap_tex(&code, env.as_deref(), "\\(", "\\)"));
                if self.header.is_empty() {
                    let url = self.options.first().map_or(MATHJAX_URL, String::as_str);
                    self.header.push(MATHJAX_SCRIPT.replace("%s", url));
                }
                MathRendered::Fragment {
                    tag: Some(if block { "div" } else { "span" }),
                    class: "math",
                    code,
                }
            }
            MathMode::Latex => MathRendered::Fragment {
                tag: Some(if block { "pre" } else { "tt" }),
                class: "math",
                code: encode(&code),
            },
        }
    }
}

/// Wrap TeX source in inline delimiters or a display environment.
fn wrap_tex(code: &str, env: Option<&str>, open: &str, close: &str) -> String {
    match env {
        Some(env) => format!("\\begin{{{env}}}\n{code}\n\\end{{{env}}}"),
        None => format!("{open}{code}{close}"),
    }
}

/// Pick a display environment for block math: aligned when the source
/// contains row or column separators, plain equation otherwise.
pub fn pick_math_environment(code: &str) -> String {
    if code.contains("\\\\") || code.contains('&') {
        "align*".to_owned()
    } else {
        "equation*".to_owned()
    }
}

fn latex_to_mathml(code: &str, block: bool) -> std::io::Result<String> {
    let storage = Storage::new();
    let events: Vec<_> = Parser::new(code, &storage).collect();
    if let Some(err) = events.iter().filter_map(|e| e.as_ref().err()).next() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err.to_string(),
        ));
    }
    let config = RenderConfig {
        display_mode: if block {
            DisplayMode::Block
        } else {
            DisplayMode::Inline
        },
        ..RenderConfig::default()
    };
    let mut out = String::new();
    push_mathml(&mut out, events.into_iter(), config)?;
    Ok(out)
}

/// Replace Unicode math characters with their TeX macro equivalents.
///
/// Covers the characters an upstream parser commonly passes through;
/// anything unmapped is kept as-is.
pub fn unichar_to_tex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{3b1}' => out.push_str("\\alpha "),
            '\u{3b2}' => out.push_str("\\beta "),
            '\u{3b3}' => out.push_str("\\gamma "),
            '\u{3b4}' => out.push_str("\\delta "),
            '\u{3b5}' => out.push_str("\\varepsilon "),
            '\u{3b6}' => out.push_str("\\zeta "),
            '\u{3b7}' => out.push_str("\\eta "),
            '\u{3b8}' => out.push_str("\\theta "),
            '\u{3b9}' => out.push_str("\\iota "),
            '\u{3ba}' => out.push_str("\\kappa "),
            '\u{3bb}' => out.push_str("\\lambda "),
            '\u{3bc}' => out.push_str("\\mu "),
            '\u{3bd}' => out.push_str("\\nu "),
            '\u{3be}' => out.push_str("\\xi "),
            '\u{3c0}' => out.push_str("\\pi "),
            '\u{3c1}' => out.push_str("\\rho "),
            '\u{3c3}' => out.push_str("\\sigma "),
            '\u{3c4}' => out.push_str("\\tau "),
            '\u{3c5}' => out.push_str("\\upsilon "),
            '\u{3c6}' => out.push_str("\\varphi "),
            '\u{3c7}' => out.push_str("\\chi "),
            '\u{3c8}' => out.push_str("\\psi "),
            '\u{3c9}' => out.push_str("\\omega "),
            '\u{393}' => out.push_str("\\Gamma "),
            '\u{394}' => out.push_str("\\Delta "),
            '\u{398}' => out.push_str("\\Theta "),
            '\u{39b}' => out.push_str("\\Lambda "),
            '\u{39e}' => out.push_str("\\Xi "),
            '\u{3a0}' => out.push_str("\\Pi "),
            '\u{3a3}' => out.push_str("\\Sigma "),
            '\u{3a5}' => out.push_str("\\Upsilon "),
            '\u{3a6}' => out.push_str("\\Phi "),
            '\u{3a8}' => out.push_str("\\Psi "),
            '\u{3a9}' => out.push_str("\\Omega "),
            '\u{b1}' => out.push_str("\\pm "),
            '\u{d7}' => out.push_str("\\times "),
            '\u{f7}' => out.push_str("\\div "),
            '\u{2212}' => out.push('-'),
            '\u{2260}' => out.push_str("\\neq "),
            '\u{2264}' => out.push_str("\\leq "),
            '\u{2265}' => out.push_str("\\geq "),
            '\u{221e}' => out.push_str("\\infty "),
            '\u{2211}' => out.push_str("\\sum "),
            '\u{220f}' => out.push_str("\\prod "),
            '\u{222b}' => out.push_str("\\int "),
            '\u{221a}' => out.push_str("\\sqrt "),
            '\u{2202}' => out.push_str("\\partial "),
            '\u{2207}' => out.push_str("\\nabla "),
            '\u{2192}' => out.push_str("\\rightarrow "),
            '\u{2190}' => out.push_str("\\leftarrow "),
            '\u{21d2}' => out.push_str("\\Rightarrow "),
            '\u{21d4}' => out.push_str("\\Leftrightarrow "),
            '\u{2208}' => out.push_str("\\in "),
            '\u{2209}' => out.push_str("\\notin "),
            '\u{2282}' => out.push_str("\\subset "),
            '\u{2286}' => out.push_str("\\subseteq "),
            '\u{222a}' => out.push_str("\\cup "),
            '\u{2229}' => out.push_str("\\cap "),
            '\u{2205}' => out.push_str("\\emptyset "),
            '\u{2200}' => out.push_str("\\forall "),
            '\u{2203}' => out.push_str("\\exists "),
            '\u{ac}' => out.push_str("\\neg "),
            '\u{2227}' => out.push_str("\\wedge "),
            '\u{2228}' => out.push_str("\\vee "),
            '\u{2248}' => out.push_str("\\approx "),
            '\u{2261}' => out.push_str("\\equiv "),
            '\u{22c5}' => out.push_str("\\cdot "),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_mode_falls_back_to_latex() {
        let mut dispatcher = MathDispatcher::new("troff");
        let settings = Settings::default();
        let rendered = dispatcher.dispatch("x^2", false, &settings);
        assert_eq!(
            rendered,
            MathRendered::Fragment {
                tag: Some("tt"),
                class: "math",
                code: "x^2".to_owned(),
            }
        );
    }

    #[test]
    fn test_latex_block_uses_pre_and_keeps_source() {
        let mut dispatcher = MathDispatcher::new("LaTeX");
        let settings = Settings::default();
        let rendered = dispatcher.dispatch("a < b", true, &settings);
        assert_eq!(
            rendered,
            MathRendered::Fragment {
                tag: Some("pre"),
                class: "math",
                code: "a &lt; b".to_owned(),
            }
        );
        assert!(dispatcher.header().is_empty());
    }

    #[test]
    fn test_mathjax_registers_header_once() {
        let mut dispatcher = MathDispatcher::new("mathjax");
        let settings = Settings::default();
        dispatcher.dispatch("x", false, &settings);
        dispatcher.dispatch("y", false, &settings);
        assert_eq!(dispatcher.header().len(), 1);
        assert!(dispatcher.header()[0].contains("MathJax.js"));
        assert!(dispatcher.header_in_head());
    }

    #[test]
    fn test_mathjax_custom_url() {
        let mut dispatcher = MathDispatcher::new("mathjax /js/MathJax.js");
        let settings = Settings::default();
        dispatcher.dispatch("x", false, &settings);
        assert_eq!(
            dispatcher.header()[0],
            "<script type=\"text/javascript\" src=\"/js/MathJax.js\"></script>\n"
        );
    }

    #[test]
    fn test_mathjax_inline_delimiters() {
        let mut dispatcher = MathDispatcher::new("mathjax");
        let settings = Settings::default();
        let rendered = dispatcher.dispatch("n!", false, &settings);
        match rendered {
            MathRendered::Fragment { tag, class, code } => {
                assert_eq!(tag, Some("span"));
                assert_eq!(class, "math");
                assert_eq!(code, "\\(n!\\)");
            }
            MathRendered::ParseError { .. } => panic!("expected fragment"),
        }
    }

    #[test]
    fn test_html_block_wraps_in_environment() {
        let mut dispatcher = MathDispatcher::new("html");
        let settings = Settings::default();
        let rendered = dispatcher.dispatch("a = b", true, &settings);
        match rendered {
            MathRendered::Fragment { tag, class, code } => {
                assert_eq!(tag, Some("div"));
                assert_eq!(class, "formula");
                assert_eq!(code, "\\begin{equation*}\na = b\n\\end{equation*}");
            }
            MathRendered::ParseError { .. } => panic!("expected fragment"),
        }
    }

    #[test]
    fn test_mathml_renders_math_element() {
        let mut dispatcher = MathDispatcher::new("mathml");
        let settings = Settings::default();
        match dispatcher.dispatch("x^2", false, &settings) {
            MathRendered::Fragment { tag, code, .. } => {
                assert_eq!(tag, None);
                assert!(code.contains("<math"));
            }
            MathRendered::ParseError { message, .. } => {
                panic!("valid formula failed to parse: {message}")
            }
        }
    }

    #[test]
    fn test_mathml_parse_error_yields_fallback() {
        let mut dispatcher = MathDispatcher::new("mathml");
        let settings = Settings::default();
        match dispatcher.dispatch("\\frac{1}{", false, &settings) {
            MathRendered::ParseError { fallback, .. } => {
                assert_eq!(fallback, "\\frac{1}{");
            }
            MathRendered::Fragment { .. } => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_pick_math_environment() {
        assert_eq!(pick_math_environment("a = b"), "equation*");
        assert_eq!(pick_math_environment("a &= b \\\\ c &= d"), "align*");
    }

    #[test]
    fn test_unichar_to_tex() {
        assert_eq!(unichar_to_tex("\u{3b1} + \u{3b2}"), "\\alpha  + \\beta ");
        assert_eq!(unichar_to_tex("x \u{2264} y"), "x \\leq  y");
        assert_eq!(unichar_to_tex("plain"), "plain");
    }
}
