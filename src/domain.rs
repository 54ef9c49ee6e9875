use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Query(String);

impl Query {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Query {
    type Error = SearchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Query {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SearchError::InvalidQuery(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IdentifierRecord {
    pub identifier: String,
}

impl IdentifierRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleRecord {
    pub identifier: String,
    pub title: String,
    pub accession: Option<String>,
}

impl TitleRecord {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            accession: None,
        }
    }

    pub fn with_accession(mut self, accession: impl Into<String>) -> Self {
        self.accession = Some(accession.into());
        self
    }
}

/// `identifier` is the repository's own key; `accession` is the public entry
/// code (e.g. a PDB ID) when the title lookup reported one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelatedResult {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accession: Option<String>,
    pub title: String,
}

impl CorrelatedResult {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            accession: None,
            title: title.into(),
        }
    }

    pub fn with_accession(mut self, accession: impl Into<String>) -> Self {
        self.accession = Some(accession.into());
        self
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    FetchingIdentifiers,
    FetchingTitles,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::FetchingIdentifiers | SessionState::FetchingTitles
        )
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, FetchingIdentifiers)
                | (Idle, Cancelled)
                | (FetchingIdentifiers, FetchingTitles)
                | (FetchingIdentifiers, Completed)
                | (FetchingIdentifiers, Failed)
                | (FetchingIdentifiers, Cancelled)
                | (FetchingTitles, Completed)
                | (FetchingTitles, Failed)
                | (FetchingTitles, Cancelled)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::FetchingIdentifiers => "fetching-identifiers",
            SessionState::FetchingTitles => "fetching-titles",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}
