//! Document loading from files, strings and HTTP URLs.
//!
//! Registries, resource snapshots and affordances are plain JSON documents;
//! the typed loaders parse them after fetching.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::affordance::Affordance;
use crate::error::LoadError;
use crate::registry::Registry;
use crate::resource::Resource;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_json_str(&content)
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_json_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    tracing::debug!(url, "fetching document");
    client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json, application/ld+json")
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load from a URL or a file path, whichever `source` looks like.
pub fn load_json_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_json_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_json(Path::new(source))
    }
}

fn load_typed<T: DeserializeOwned>(source: &str, kind: &'static str) -> Result<T, LoadError> {
    let value = load_json_auto(source)?;
    parse_document(value, kind)
}

/// Convert an already loaded document.
///
/// # Errors
///
/// Returns `LoadError::InvalidDocument` naming `kind` if the document has the
/// wrong shape.
pub fn parse_document<T: DeserializeOwned>(value: Value, kind: &'static str) -> Result<T, LoadError> {
    serde_json::from_value(value).map_err(|source| LoadError::InvalidDocument { kind, source })
}

pub fn load_registry(source: &str) -> Result<Registry, LoadError> {
    load_typed(source, "registry")
}

pub fn load_resource(source: &str) -> Result<Resource, LoadError> {
    load_typed(source, "resource")
}

pub fn load_affordance(source: &str) -> Result<Affordance, LoadError> {
    load_typed(source, "affordance")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn load_json_valid_file() {
        let file = temp_json(r#"{"type": "Event"}"#);
        let value = load_json(file.path()).unwrap();
        assert_eq!(value["type"], "Event");
    }

    #[test]
    fn load_json_file_not_found() {
        let result = load_json(Path::new("/nonexistent/registry.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_json_invalid() {
        let file = temp_json("not valid json");
        assert!(matches!(
            load_json(file.path()),
            Err(LoadError::InvalidJson { .. })
        ));
        assert!(matches!(
            load_json_str("not json"),
            Err(LoadError::InvalidJson { .. })
        ));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/registry.json"));
        assert!(is_url("http://example.com/registry.json"));
        assert!(!is_url("/path/to/registry.json"));
        assert!(!is_url("./registry.json"));
        assert!(!is_url("registry.json"));
    }

    #[test]
    fn typed_loaders() {
        let registry = temp_json(r#"{"types": {"Event": {"expose": "MusicEvent"}}}"#);
        let registry = load_registry(registry.path().to_str().unwrap()).unwrap();
        assert_eq!(
            registry.type_config("Event").and_then(|t| t.expose.as_deref()),
            Some("MusicEvent")
        );

        let affordance = temp_json(r#"{"href": "/events{?q}", "rel": ["search"]}"#);
        let affordance = load_affordance(affordance.path().to_str().unwrap()).unwrap();
        assert_eq!(affordance.href(), "/events");
    }

    #[test]
    fn wrong_shape_names_document_kind() {
        let file = temp_json(r#"{"properties": {}}"#);
        let err = load_resource(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDocument { kind: "resource", .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn malformed_template_is_invalid_document() {
        let file = temp_json(r#"{"href": "/events{?q"}"#);
        let err = load_affordance(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDocument { kind: "affordance", .. }));
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_json_auto_url() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/registry.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"mixins": {"Event": "EventMixin"}}"#)
                .create();

            let url = format!("{}/registry.json", server.url());
            let value = load_json_auto(&url).unwrap();
            assert_eq!(value["mixins"]["Event"], "EventMixin");
            mock.assert();
        }

        #[test]
        fn http_error_is_network_error() {
            let mut server = mockito::Server::new();
            server.mock("GET", "/missing.json").with_status(404).create();

            let url = format!("{}/missing.json", server.url());
            let err = load_json_url(&url).unwrap_err();
            assert!(matches!(err, LoadError::NetworkError { .. }));
            assert_eq!(err.exit_code(), 3);
        }
    }
}
