use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::SessionState;

#[derive(Debug, Error, Diagnostic)]
pub enum SearchError {
    #[error("invalid search query: {0:?}")]
    InvalidQuery(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("repository request failed: {0}")]
    Http(String),

    #[error("repository returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed repository response: {0}")]
    Parse(#[from] ParseError),

    #[error("search session already used (state: {0})")]
    SessionInUse(SessionState),

    #[error("failed to start search worker: {0}")]
    Worker(String),

    #[error("search worker exited without reporting an outcome")]
    WorkerLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Parse,
    Config,
    Usage,
    Internal,
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Http(_) | SearchError::Status { .. } => ErrorKind::Transport,
            SearchError::Parse(_) => ErrorKind::Parse,
            SearchError::ConfigRead(_)
            | SearchError::ConfigParse(_)
            | SearchError::InvalidConfig(_) => ErrorKind::Config,
            SearchError::InvalidQuery(_) | SearchError::SessionInUse(_) => ErrorKind::Usage,
            SearchError::Worker(_) | SearchError::WorkerLost => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ParseError {
    #[error("closing tag </{found}> does not match open element <{expected}>")]
    MismatchedTag { expected: String, found: String },

    #[error("closing tag </{0}> has no open element")]
    UnexpectedClosingTag(String),

    #[error("element <{0}> was never closed")]
    UnclosedElement(String),

    #[error("input ended inside markup")]
    TruncatedMarkup,

    #[error("malformed markup: <{0}>")]
    MalformedTag(String),

    #[error("markup exceeds {0} bytes")]
    TagTooLong(usize),

    #[error("record <{0}> opened inside another record")]
    NestedRecord(String),

    #[error("record closed without an identifier")]
    MissingIdentifier,

    #[error("field <{0}> is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("repository reported an error: {0}")]
    Remote(String),

    #[error("response contained no markup")]
    EmptyDocument,
}
