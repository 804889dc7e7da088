//! Error types for the HTML writer.

use thiserror::Error;

/// Errors that can occur while translating a document tree to HTML.
///
/// Recoverable problems (unknown math mode, unreadable stylesheet,
/// unprobeable image) are degraded in place and logged; the variants
/// here are either genuine I/O failures or internal-invariant
/// violations that signal a defect in the translator.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("visiting unimplemented node kind: {0}")]
    Unimplemented(&'static str),

    #[error("explicit \"id\" attribute passed to start tag; ids must come from the node")]
    DuplicateId,

    #[error("context stack empty, expected {expected} frame")]
    ContextUnderflow { expected: &'static str },

    #[error("context stack mismatch: expected {expected} frame, found {found}")]
    ContextMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("context stack holds {0} leftover frame(s) after document exit")]
    ContextLeak(usize),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("unknown template placeholder: %({0})s")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, Error>;
