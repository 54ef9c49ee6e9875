use std::num::NonZeroUsize;

use crate::config::ResolvedConfig;
use crate::domain::{IdentifierRecord, Query};
use crate::parser::TagSchema;

pub const DEFAULT_SEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
pub const DEFAULT_SUMMARY_URL: &str =
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";

const TOOL_NAME: &str = "molsearch";

/// Parameter values are raw; the transport encodes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RequestTemplates {
    search_url: String,
    summary_url: String,
    database: String,
    title_item: String,
    accession_item: String,
    max_results: usize,
    title_batch_size: usize,
    api_key: Option<String>,
}

impl RequestTemplates {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            search_url: config.search_url.clone(),
            summary_url: config.summary_url.clone(),
            database: config.database.clone(),
            title_item: config.title_item.clone(),
            accession_item: config.accession_item.clone(),
            max_results: config.max_results,
            title_batch_size: config.title_batch_size,
            api_key: config.api_key.clone(),
        }
    }

    pub fn with_max_results(mut self, max_results: NonZeroUsize) -> Self {
        self.max_results = max_results.get();
        self
    }

    pub fn search_request(&self, query: &Query) -> FetchRequest {
        let request = FetchRequest::new(&self.search_url)
            .param("db", &self.database)
            .param("term", query.as_str())
            .param("retmax", self.max_results.to_string());
        self.decorate(request)
    }

    pub fn title_requests(&self, identifiers: &[IdentifierRecord]) -> Vec<FetchRequest> {
        identifiers
            .chunks(self.title_batch_size.max(1))
            .map(|batch| {
                let ids = batch
                    .iter()
                    .map(|record| record.identifier.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                let request = FetchRequest::new(&self.summary_url)
                    .param("db", &self.database)
                    .param("id", ids);
                self.decorate(request)
            })
            .collect()
    }

    pub fn search_schema(&self) -> TagSchema {
        TagSchema::search_ids()
    }

    pub fn title_schema(&self) -> TagSchema {
        TagSchema::summary_titles(&self.title_item, &self.accession_item)
    }

    fn decorate(&self, request: FetchRequest) -> FetchRequest {
        let request = request.param("tool", TOOL_NAME);
        match &self.api_key {
            Some(key) => request.param("api_key", key),
            None => request,
        }
    }
}
