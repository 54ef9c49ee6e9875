pub mod config;
pub mod correlate;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod request;
pub mod session;
pub mod transport;
