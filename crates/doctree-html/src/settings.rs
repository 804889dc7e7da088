//! Writer configuration.
//!
//! The surrounding application owns option parsing; this module only
//! defines the recognized settings with their defaults, deserializable
//! from any serde format, plus stylesheet resolution (embed vs link).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::error;

use crate::error::{Error, Result};
use crate::markup::encode;

/// Format for footnote reference markers and labels.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FootnoteReferences {
    Superscript,
    #[default]
    Brackets,
}

impl FootnoteReferences {
    /// The class token used on footnote lists, labels, and references.
    pub fn as_str(self) -> &'static str {
        match self {
            FootnoteReferences::Superscript => "superscript",
            FootnoteReferences::Brackets => "brackets",
        }
    }
}

/// Format for block-quote attributions.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttributionFormat {
    /// Em-dash prefix.
    #[default]
    Dash,
    #[serde(alias = "parens")]
    Parentheses,
    None,
}

impl AttributionFormat {
    /// Prefix/suffix pair wrapped around the attribution text.
    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            AttributionFormat::Dash => ("\u{2014}", ""),
            AttributionFormat::Parentheses => ("(", ")"),
            AttributionFormat::None => ("", ""),
        }
    }
}

/// Recognized writer options.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Language of the document, used for the `lang` attribute.
    pub language_code: String,
    /// Initial heading level for section titles, 1–6.
    pub initial_header_level: u32,
    /// Maximum width (in characters) for one-column field names.
    /// Consumed by layout styling, not by the writer's control flow.
    pub field_name_limit: u32,
    /// Maximum width (in characters) for options in option lists.
    /// Consumed by layout styling, not by the writer's control flow.
    pub option_limit: u32,
    /// Footnote reference format.
    pub footnote_references: FootnoteReferences,
    /// Block-quote attribution format.
    pub attribution: AttributionFormat,
    /// Compact rendering of simple bullet and enumerated lists.
    pub compact_lists: bool,
    /// Compact rendering of simple field and definition lists.
    pub compact_field_lists: bool,
    /// Extra classes added to every table, space/comma separated.
    pub table_style: String,
    /// Math output mode: mode name plus optional mode arguments,
    /// e.g. `"mathjax https://example.org/MathJax.js"`.
    pub math_output: String,
    /// Obfuscate email addresses to confuse harvesters.
    pub cloak_email_addresses: bool,
    /// Generate backlinks from footnotes and citations to their
    /// references.
    pub footnote_backlinks: bool,
    /// Embed stylesheet contents in the output instead of linking.
    pub embed_stylesheet: bool,
    /// Stylesheet URLs, linked as given. Overrides `stylesheet_path`.
    pub stylesheet: Vec<String>,
    /// Stylesheet file paths, expanded against `stylesheet_dirs`.
    pub stylesheet_path: Vec<String>,
    /// Directories searched when expanding relative stylesheet paths.
    pub stylesheet_dirs: Vec<String>,
    /// Character encoding declared in the output.
    pub output_encoding: String,
    /// Whether file contents (stylesheets, image probing) may be read.
    pub file_insertion_enabled: bool,
    /// Output destination, used to rewrite linked stylesheet paths.
    pub destination: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language_code: "en".to_owned(),
            initial_header_level: 1,
            field_name_limit: 14,
            option_limit: 14,
            footnote_references: FootnoteReferences::default(),
            attribution: AttributionFormat::default(),
            compact_lists: true,
            compact_field_lists: true,
            table_style: String::new(),
            math_output: "HTML math.css".to_owned(),
            cloak_email_addresses: false,
            footnote_backlinks: true,
            embed_stylesheet: true,
            stylesheet: Vec::new(),
            stylesheet_path: vec!["doctree.css".to_owned()],
            stylesheet_dirs: vec![".".to_owned()],
            output_encoding: "utf-8".to_owned(),
            file_insertion_enabled: true,
            destination: None,
        }
    }
}

impl Settings {
    /// Check option invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(1..=6).contains(&self.initial_header_level) {
            return Err(Error::Settings(format!(
                "initial_header_level must be 1-6, got {}",
                self.initial_header_level
            )));
        }
        Ok(())
    }

    /// The effective stylesheet list: explicit URLs when configured,
    /// otherwise paths expanded against the stylesheet directories.
    pub fn stylesheet_list(&self) -> Vec<String> {
        if !self.stylesheet.is_empty() {
            return self.stylesheet.clone();
        }
        self.stylesheet_path
            .iter()
            .map(|path| {
                self.find_in_dirs(path)
                    .map_or_else(|| path.clone(), |found| found.to_string_lossy().into_owned())
            })
            .collect()
    }

    /// Search the stylesheet directories for `path`; absolute paths and
    /// paths that exist as given are returned unchanged.
    pub fn find_in_dirs(&self, path: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(path);
        if direct.is_absolute() || direct.exists() {
            return Some(direct);
        }
        self.stylesheet_dirs
            .iter()
            .map(|dir| Path::new(dir).join(path))
            .find(|candidate| candidate.exists())
    }

    /// Markup referencing or embedding the stylesheet at `path`.
    ///
    /// Embed mode reads the file; an unreadable file degrades to a
    /// visible inline diagnostic comment instead of failing the run.
    /// Link mode rewrites the path relative to the output destination
    /// when stylesheet paths (rather than URLs) were configured.
    pub fn stylesheet_call(&self, path: &str) -> String {
        if self.embed_stylesheet {
            return match std::fs::read_to_string(path) {
                Ok(content) => format!("<style>\n\n{content}\n</style>\n"),
                Err(err) => {
                    let msg = format!("Cannot embed stylesheet '{path}': {err}.");
                    error!("{msg}");
                    format!("<--- {msg} --->\n")
                }
            };
        }
        let href = if !self.stylesheet_path.is_empty() {
            match &self.destination {
                Some(dest) => relative_path(dest, Path::new(path)),
                None => path.to_owned(),
            }
        } else {
            path.to_owned()
        };
        format!("<link rel=\"stylesheet\" href=\"{}\">\n", encode(&href))
    }
}

/// Compute the path of `to` relative to the directory containing
/// `from`. Falls back to `to` as-is when the paths share no usable
/// prefix (e.g. different roots).
fn relative_path(from: &Path, to: &Path) -> String {
    let from_dir: Vec<_> = from
        .parent()
        .map(|dir| dir.components().collect())
        .unwrap_or_default();
    let to_comps: Vec<_> = to.components().collect();

    let common = from_dir
        .iter()
        .zip(&to_comps)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from_dir.len() - common;
    let mut segments: Vec<String> = std::iter::repeat_n("..".to_owned(), ups).collect();
    segments.extend(
        to_comps[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    if segments.is_empty() {
        to.to_string_lossy().into_owned()
    } else {
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.initial_header_level, 1);
        assert_eq!(settings.footnote_references, FootnoteReferences::Brackets);
        assert_eq!(settings.attribution, AttributionFormat::Dash);
        assert!(settings.compact_lists);
        assert!(settings.embed_stylesheet);
        settings.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_header_level() {
        let settings = Settings {
            initial_header_level: 7,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let settings: Settings = toml::from_str(
            r#"
            initial_header_level = 2
            footnote_references = "superscript"
            attribution = "parens"
            cloak_email_addresses = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.initial_header_level, 2);
        assert_eq!(settings.footnote_references, FootnoteReferences::Superscript);
        assert_eq!(settings.attribution, AttributionFormat::Parentheses);
        assert!(settings.cloak_email_addresses);
        // Unspecified fields keep their defaults.
        assert!(settings.footnote_backlinks);
    }

    #[test]
    fn test_attribution_delimiters() {
        assert_eq!(AttributionFormat::Dash.delimiters(), ("\u{2014}", ""));
        assert_eq!(AttributionFormat::Parentheses.delimiters(), ("(", ")"));
        assert_eq!(AttributionFormat::None.delimiters(), ("", ""));
    }

    #[test]
    fn test_stylesheet_embed_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "body {{ margin: 0 }}").unwrap();
        let settings = Settings::default();
        let markup = settings.stylesheet_call(&file.path().to_string_lossy());
        assert!(markup.starts_with("<style>"));
        assert!(markup.contains("body { margin: 0 }"));
    }

    #[test]
    fn test_stylesheet_embed_missing_file_degrades_to_comment() {
        let settings = Settings::default();
        let markup = settings.stylesheet_call("/no/such/file.css");
        assert!(markup.starts_with("<--- Cannot embed stylesheet"));
        assert!(markup.contains("/no/such/file.css"));
    }

    #[test]
    fn test_stylesheet_link_rewrites_relative_to_destination() {
        let settings = Settings {
            embed_stylesheet: false,
            destination: Some(PathBuf::from("out/page.html")),
            ..Settings::default()
        };
        let markup = settings.stylesheet_call("out/css/site.css");
        assert_eq!(markup, "<link rel=\"stylesheet\" href=\"css/site.css\">\n");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("out/page.html"), Path::new("out/site.css")),
            "site.css"
        );
        assert_eq!(
            relative_path(Path::new("out/a/page.html"), Path::new("css/site.css")),
            "../../css/site.css"
        );
        assert_eq!(
            relative_path(Path::new("page.html"), Path::new("css/site.css")),
            "css/site.css"
        );
    }
}
