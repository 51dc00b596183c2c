//! Find the Python functions and classes whose source contains a tag, like
//! `TODO:` or `FIXME:`.
//!
//! The flow is [`model::ExtractorConfig`] in, [`model::ExtractionResult`] out,
//! with [`extractor::TagExtractor`] doing the work and reporting progress to a
//! [`Diagnostics`] sink.
use snafu::prelude::*;
use std::{borrow::Cow, path::PathBuf};

pub mod collector;
pub mod extractor;
pub mod finder;
pub mod model;
pub mod report;
pub mod syntax;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("The tag to search for must not be empty"))]
    EmptyTag,

    #[snafu(display("Path does not exist: {}: {source}", path.display()))]
    MissingPath {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Not a Python file: {}", path.display()))]
    NotPython { path: PathBuf },

    #[snafu(display("Invalid file pattern {pattern:?}: {source}"))]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[snafu(display("Could not walk the directory: {source}"))]
    Walk { source: walkdir::Error },

    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("File is not valid UTF-8: {source}"))]
    Utf8 { source: std::string::FromUtf8Error },

    #[snafu(display("Syntax error on line {line}: {reason}"))]
    Syntax {
        line: usize,
        reason: Cow<'static, str>,
    },

    #[snafu(display("Could not load the Python grammar: {source}"))]
    Language { source: tree_sitter::LanguageError },

    #[snafu(display("Could not render '{name}' from bytes {start}..{end}"))]
    Render {
        name: String,
        start: usize,
        end: usize,
    },

    #[snafu(display("Line numbers start at 1, got {line} for '{name}'"))]
    InvalidLine { name: String, line: usize },

    #[snafu(display("Kind must be 'function' or 'class', got '{kind}'"))]
    InvalidKind { kind: String },

    #[snafu(display("Could not write the report to {}: {source}", path.display()))]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("JSON error: {source}"))]
    Json { source: serde_json::Error },
}

pub(crate) type Result<T, E = Error> = core::result::Result<T, E>;

/// An external progress message sent from the tag extractor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    FindingFiles {
        root: PathBuf,
    },
    FoundFiles {
        count: usize,
    },

    ProcessingFile {
        path: PathBuf,
    },
    NoTagInFile {
        path: PathBuf,
    },
    FoundMatches {
        path: PathBuf,
        count: usize,
    },
    SkippedFile {
        path: PathBuf,
        reason: String,
    },

    Finished {
        processed: usize,
        matches: usize,
        skipped: usize,
    },
}

/// Somewhere to send progress messages.
///
/// Created once by the caller and handed to the extractor.
pub trait Diagnostics {
    fn send(&mut self, msg: Message);
}

/// Throws messages away.
impl Diagnostics for () {
    fn send(&mut self, _: Message) {}
}

/// Keeps every message, in order.
impl Diagnostics for Vec<Message> {
    fn send(&mut self, msg: Message) {
        self.push(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_collects_messages_in_order() {
        let mut sink: Vec<Message> = vec![];
        sink.send(Message::FoundFiles { count: 2 });
        sink.send(Message::Finished {
            processed: 2,
            matches: 0,
            skipped: 0,
        });
        assert_eq!(
            sink,
            vec![
                Message::FoundFiles { count: 2 },
                Message::Finished {
                    processed: 2,
                    matches: 0,
                    skipped: 0
                }
            ]
        );
    }

    #[test]
    fn syntax_error_mentions_line() {
        let err = SyntaxSnafu {
            line: 3usize,
            reason: "unexpected indent",
        }
        .build();
        assert_eq!(err.to_string(), "Syntax error on line 3: unexpected indent");
    }
}
