//! Catalog endpoint contracts and payload decoding.
//!
//! # Responsibility
//! - Define the HTTP collaborator used to fetch the kernelspec catalog.
//! - Build the catalog URL and decode its JSON payload.
//!
//! # Invariants
//! - Decoding keeps the payload's object order for tie-breaking.
//! - Decoding is all-or-nothing: one invalid entry rejects the payload.
//! - Decoded kernel names are unique; the first entry for a name wins.

use crate::kernelspec::model::KernelSpec;
use log::warn;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Relative path of the kernelspec catalog endpoint.
pub const CATALOG_PATH: &str = "api/kernelspecs";

/// Transport-level catalog fetch error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Transport(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "catalog transport error: {message}"),
        }
    }
}

impl Error for CatalogError {}

/// HTTP collaborator contract for catalog requests.
///
/// Implementations own authentication and transport details. The body is
/// returned undecoded.
pub trait CatalogClient: Send + Sync {
    fn get_json(&self, url: &str) -> Result<String, CatalogError>;
}

/// Decoded catalog payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    /// Server default kernel name, when advertised.
    pub default_name: Option<String>,
    /// Specs in payload order.
    pub specs: Vec<KernelSpec>,
}

#[derive(Deserialize)]
struct CatalogPayload {
    #[serde(default)]
    default: Option<String>,
    kernelspecs: serde_json::Map<String, serde_json::Value>,
}

/// Catalog decoding errors.
#[derive(Debug)]
pub enum CatalogDecodeError {
    Malformed(serde_json::Error),
    InvalidEntry {
        key: String,
        source: serde_json::Error,
    },
}

impl Display for CatalogDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed kernelspec payload: {err}"),
            Self::InvalidEntry { key, source } => {
                write!(f, "invalid kernelspec entry `{key}`: {source}")
            }
        }
    }
}

impl Error for CatalogDecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::InvalidEntry { source, .. } => Some(source),
        }
    }
}

/// Decodes a `{ default?, kernelspecs: { name: spec } }` payload.
///
/// Entries without a `name` take the catalog key as their name. A later
/// entry whose name repeats an earlier one is skipped with a warning.
pub fn decode_catalog(body: &str) -> Result<Catalog, CatalogDecodeError> {
    let payload: CatalogPayload =
        serde_json::from_str(body).map_err(CatalogDecodeError::Malformed)?;

    let mut specs = Vec::with_capacity(payload.kernelspecs.len());
    let mut seen = BTreeSet::new();
    for (key, value) in payload.kernelspecs {
        let mut spec: KernelSpec = match serde_json::from_value(value) {
            Ok(spec) => spec,
            Err(source) => return Err(CatalogDecodeError::InvalidEntry { key, source }),
        };
        if spec.name.trim().is_empty() {
            spec.name = key.clone();
        }
        if !seen.insert(spec.name.clone()) {
            warn!(
                "event=catalog_decode module=catalog status=skipped key={} kernel={} reason=duplicate_name",
                key, spec.name
            );
            continue;
        }
        specs.push(spec);
    }

    Ok(Catalog {
        default_name: payload.default.filter(|name| !name.trim().is_empty()),
        specs,
    })
}

/// Joins URL path parts with single slashes, percent-encoding each segment.
///
/// A `scheme://authority` prefix on `base` is kept verbatim.
pub fn url_join_encode(base: &str, path: &str) -> String {
    let (prefix, base_path) = split_origin(base);
    let segments = base_path
        .split('/')
        .chain(path.split('/'))
        .filter(|segment| !segment.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>();

    let mut url = prefix.to_string();
    url.push('/');
    url.push_str(&segments.join("/"));
    url
}

fn split_origin(base: &str) -> (&str, &str) {
    let trimmed = base.trim();
    let Some(scheme_end) = trimmed.find("://") else {
        return ("", trimmed);
    };
    let authority_start = scheme_end + 3;
    match trimmed[authority_start..].find('/') {
        Some(offset) => trimmed.split_at(authority_start + offset),
        None => (trimmed, ""),
    }
}

fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::{decode_catalog, url_join_encode, CatalogDecodeError, CATALOG_PATH};

    #[test]
    fn joins_relative_base_url() {
        assert_eq!(url_join_encode("/", CATALOG_PATH), "/api/kernelspecs");
        assert_eq!(
            url_join_encode("/hub/user/", CATALOG_PATH),
            "/hub/user/api/kernelspecs"
        );
    }

    #[test]
    fn keeps_origin_and_encodes_segments() {
        assert_eq!(
            url_join_encode("http://localhost:8888/my notebooks", CATALOG_PATH),
            "http://localhost:8888/my%20notebooks/api/kernelspecs"
        );
        assert_eq!(
            url_join_encode("https://example.org", CATALOG_PATH),
            "https://example.org/api/kernelspecs"
        );
    }

    #[test]
    fn decode_preserves_payload_order_and_fills_names() {
        let catalog = decode_catalog(
            r#"{
                "default": "zeta",
                "kernelspecs": {
                    "zeta": {"spec": {"display_name": "Same"}, "resources": {}},
                    "alpha": {"name": "alpha", "spec": {"display_name": "Same"}, "resources": {}}
                }
            }"#,
        )
        .expect("valid catalog");

        let names = catalog
            .specs
            .iter()
            .map(|spec| spec.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(catalog.default_name.as_deref(), Some("zeta"));
    }

    #[test]
    fn decode_rejects_missing_kernelspecs_and_bad_entries() {
        let err = decode_catalog(r#"{"default": "python3"}"#).expect_err("missing map");
        assert!(matches!(err, CatalogDecodeError::Malformed(_)));

        let err = decode_catalog(r#"{"kernelspecs": {"bad": {"resources": {}}}}"#)
            .expect_err("entry without spec");
        match err {
            CatalogDecodeError::InvalidEntry { key, .. } => assert_eq!(key, "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_keeps_first_entry_for_a_repeated_name() {
        let catalog = decode_catalog(
            r#"{
                "kernelspecs": {
                    "python3": {"name": "python3", "spec": {"display_name": "Python 3"}, "resources": {}},
                    "py3-alias": {"name": "python3", "spec": {"display_name": "Python 3 (alias)"}, "resources": {}}
                }
            }"#,
        )
        .expect("valid payload");

        assert_eq!(catalog.specs.len(), 1);
        assert_eq!(catalog.specs[0].display_name(), "Python 3");
    }
}
