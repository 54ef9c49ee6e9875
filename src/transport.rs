use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::ResolvedConfig;
use crate::error::SearchError;
use crate::request::FetchRequest;

/// An open response body. Dropping it closes the connection.
pub type ResponseStream = Box<dyn Read + Send>;

pub trait Transport: Send + Sync {
    fn open(&self, request: &FetchRequest) -> Result<ResponseStream, SearchError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ResolvedConfig) -> Result<Self, SearchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("molsearch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SearchError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| SearchError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, SearchError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "repository request failed".to_string());
        Err(SearchError::Status { status, message })
    }
}

impl Transport for HttpTransport {
    fn open(&self, request: &FetchRequest) -> Result<ResponseStream, SearchError> {
        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .send()
            .map_err(|err| SearchError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        Ok(Box::new(response))
    }
}
