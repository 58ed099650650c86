//! Kernel specification model.
//!
//! # Responsibility
//! - Define the catalog entry shape returned by the kernelspec endpoint.
//! - Provide typed accessors for well-known resource keys.
//!
//! # Invariants
//! - `name` is the stable registry key and never changes after fetch.
//! - Specs are replaced wholesale on re-fetch, never patched in place.
//!
//! # See also
//! - `kernelspec::registry` for ordering and lookup rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource key for the per-kernel stylesheet.
pub const RESOURCE_KERNEL_CSS: &str = "kernel.css";
/// Resource key for the per-kernel extension module.
pub const RESOURCE_KERNEL_JS: &str = "kernel.js";
/// Resource key for the indicator logo.
pub const RESOURCE_LOGO_64: &str = "logo-64x64";
/// Resource key for the small logo variant.
pub const RESOURCE_LOGO_32: &str = "logo-32x32";

/// One catalog entry describing an available kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    /// Stable kernel identifier, e.g. `python3`.
    ///
    /// Catalog payloads may omit it; the registry then falls back to the
    /// catalog key.
    #[serde(default)]
    pub name: String,
    /// Descriptive body of the spec.
    pub spec: KernelSpecBody,
    /// Resource name to URL mapping.
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
}

/// Descriptive part of a kernel spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpecBody {
    /// Human-readable label shown in menus and the indicator.
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub argv: Vec<String>,
    /// Fields this crate does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl KernelSpec {
    /// Creates a spec with no resources.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: KernelSpecBody {
                display_name: display_name.into(),
                language: None,
                argv: Vec::new(),
                extra: serde_json::Map::new(),
            },
            resources: BTreeMap::new(),
        }
    }

    /// Adds one resource entry, builder style.
    pub fn with_resource(mut self, key: impl Into<String>, url: impl Into<String>) -> Self {
        self.resources.insert(key.into(), url.into());
        self
    }

    pub fn display_name(&self) -> &str {
        &self.spec.display_name
    }

    /// Returns a resource URL, treating empty strings as absent.
    pub fn resource(&self, key: &str) -> Option<&str> {
        self.resources
            .get(key)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn stylesheet_url(&self) -> Option<&str> {
        self.resource(RESOURCE_KERNEL_CSS)
    }

    pub fn extension_url(&self) -> Option<&str> {
        self.resource(RESOURCE_KERNEL_JS)
    }

    pub fn logo_url(&self) -> Option<&str> {
        self.resource(RESOURCE_LOGO_64)
    }
}
