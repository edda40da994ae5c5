use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ParseError;

/// Failures of the structural pass.
///
/// None of these reach the caller of [`crate::Extractor::extract`]; they are
/// logged and the extraction falls back to the heuristic scanner.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The staging file for the structural parser could not be created or written
    #[error("failed to stage source for structural parsing: {0}")]
    Staging(#[source] io::Error),

    /// A source or included file could not be read
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, #[source] io::Error),

    /// An `include directive named a file found in no search directory
    #[error("include file '{file}' not found (line {line})")]
    IncludeNotFound { file: String, line: usize },

    /// An `include directive reopened a file that is still being expanded
    #[error("include file '{file}' includes itself (line {line})")]
    IncludeCycle { file: String, line: usize },

    /// The grammar produced no syntax tree at all
    #[error("structural parse failed: {0}")]
    Parse(#[from] ParseError),
}

pub type ExtractResult<T> = Result<T, ExtractError>;
