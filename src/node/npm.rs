//! npm registry integration
//!
//! Fetches package metadata ("packuments") from the registry to read the
//! publish time of every version.

use crate::freshness::{PackageRegistry, PublishTimes};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Full packuments of popular packages run to tens of megabytes
const MAX_METADATA_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to fetch package info from {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to parse registry response for '{package}': {message}")]
    Parse { package: String, message: String },
}

/// Blocking npm registry client with a global per-request timeout
pub struct NpmRegistry {
    agent: ureq::Agent,
    base_url: String,
}

impl NpmRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Registry URL for a package - scoped packages need the slash encoded
    pub fn package_url(&self, package: &str) -> String {
        if package.starts_with('@') {
            // Encode the package name: @scope/name -> @scope%2fname
            let encoded = package.replace('/', "%2f");
            format!("{}/{}", self.base_url, encoded)
        } else {
            format!("{}/{}", self.base_url, package)
        }
    }
}

impl PackageRegistry for NpmRegistry {
    fn publish_times(&self, package: &str) -> Result<Option<PublishTimes>, RegistryError> {
        let url = self.package_url(package);

        let mut response = self
            .agent
            .get(&url)
            .header("User-Agent", concat!("day0guard/", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/json")
            .call()
            .map_err(|e| RegistryError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(package, status = status.as_u16(), "registry lookup unsuccessful");
            return Ok(None);
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_METADATA_BYTES)
            .read_to_string()
            .map_err(|e| RegistryError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            })?;

        parse_publish_times(&body, package).map(Some)
    }
}

/// npm registry JSON API response structure
///
/// `time` maps each version (plus the `created`/`modified` bookkeeping keys)
/// to an RFC 3339 timestamp. Unpublished packages carry an object under
/// `time.unpublished`, which is dropped.
#[derive(Deserialize)]
struct NpmMetadata {
    #[serde(default)]
    time: HashMap<String, serde_json::Value>,
}

fn parse_publish_times(body: &str, package: &str) -> Result<PublishTimes, RegistryError> {
    let metadata: NpmMetadata = serde_json::from_str(body).map_err(|e| RegistryError::Parse {
        package: package.to_string(),
        message: e.to_string(),
    })?;
    Ok(metadata
        .time
        .into_iter()
        .filter_map(|(version, value)| match value {
            serde_json::Value::String(at) => Some((version, at)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_url_plain() {
        let registry = NpmRegistry::new("https://registry.npmjs.org/", Duration::from_secs(5));
        assert_eq!(
            registry.package_url("left-pad"),
            "https://registry.npmjs.org/left-pad"
        );
    }

    #[test]
    fn test_package_url_scoped() {
        let registry = NpmRegistry::new(DEFAULT_REGISTRY_URL, Duration::from_secs(5));
        assert_eq!(
            registry.package_url("@types/node"),
            "https://registry.npmjs.org/@types%2fnode"
        );
    }

    #[test]
    fn test_parse_publish_times() {
        let body = r#"{
            "name": "left-pad",
            "time": {
                "created": "2014-03-14T07:15:26.000Z",
                "modified": "2022-06-19T04:43:20.384Z",
                "1.3.0": "2018-04-09T01:16:01.393Z"
            },
            "versions": {}
        }"#;
        let times = parse_publish_times(body, "left-pad").unwrap();
        assert_eq!(
            times.get("1.3.0").map(String::as_str),
            Some("2018-04-09T01:16:01.393Z")
        );
    }

    #[test]
    fn test_parse_publish_times_unpublished_package() {
        let body = r#"{"time": {"created": "2020-01-01T00:00:00.000Z", "unpublished": {"time": "2020-01-02T00:00:00.000Z"}}}"#;
        let times = parse_publish_times(body, "gone").unwrap();
        assert_eq!(times.len(), 1);
        assert!(!times.contains_key("unpublished"));
    }

    #[test]
    fn test_parse_publish_times_without_time_field() {
        let times = parse_publish_times(r#"{"name": "x"}"#, "x").unwrap();
        assert!(times.is_empty());
    }

    #[test]
    fn test_parse_publish_times_invalid_json() {
        let result = parse_publish_times("<html>rate limited</html>", "x");
        assert!(matches!(result, Err(RegistryError::Parse { .. })));
    }
}
