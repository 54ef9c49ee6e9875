use std::fs;

use assert_matches::assert_matches;
use tempfile::TempDir;

use molecule_search::config::{ConfigLoader, TitleFailurePolicy};
use molecule_search::error::{ErrorKind, SearchError};
use molecule_search::request::RequestTemplates;

fn write_config(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("molsearch.json");
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn file_values_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "schema_version": 1,
            "search_url": "http://127.0.0.1:9/esearch.fcgi",
            "max_results": 5,
            "title_batch_size": 2,
            "title_failure": "degrade"
        }"#,
    );

    let config = ConfigLoader::resolve(Some(&path)).unwrap();
    assert_eq!(config.search_url, "http://127.0.0.1:9/esearch.fcgi");
    assert_eq!(config.max_results, 5);
    assert_eq!(config.title_batch_size, 2);
    assert_eq!(config.title_failure, TitleFailurePolicy::Degrade);
    assert_eq!(config.database, "structure");
    assert_eq!(config.title_item, "PdbDescr");

    let request = RequestTemplates::from_config(&config).search_request(&"heme".parse().unwrap());
    assert_eq!(request.url, "http://127.0.0.1:9/esearch.fcgi");
    assert_eq!(request.get("retmax"), Some("5"));
}

#[test]
fn explicit_missing_path_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.json");
    let err = ConfigLoader::resolve(Some(&missing.to_string_lossy())).unwrap_err();
    assert_matches!(err, SearchError::ConfigRead(ref path) if path == &missing);
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn malformed_json_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "{ \"max_results\": ");
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, SearchError::ConfigParse(_));
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "max_result": 5 }"#);
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, SearchError::ConfigParse(message) if message.contains("max_result"));
}

#[test]
fn invalid_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "database": "  " }"#);
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, SearchError::InvalidConfig(message) if message.contains("database"));
}
