//! In-memory kernelspec registry and derived menu entries.
//!
//! # Responsibility
//! - Hold the most recent successfully fetched catalog.
//! - Derive the display-ordered menu from it.
//!
//! # Invariants
//! - A refresh either replaces mapping, menu and default together or
//!   changes nothing but the recorded status.
//! - Menu order is by `display_name` (case-sensitive), ties in payload order.

use crate::kernelspec::catalog::{decode_catalog, CatalogClient, CatalogDecodeError, CatalogError};
use crate::kernelspec::model::KernelSpec;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Registry refresh errors.
#[derive(Debug)]
pub enum RegistryError {
    Catalog(CatalogError),
    Decode(CatalogDecodeError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog(err) => write!(f, "{err}"),
            Self::Decode(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Catalog(err) => Some(err),
            Self::Decode(err) => Some(err),
        }
    }
}

impl From<CatalogError> for RegistryError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<CatalogDecodeError> for RegistryError {
    fn from(value: CatalogDecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Outcome of the latest refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryStatus {
    NotLoaded,
    Loaded { count: usize },
    /// Latest refresh failed; any earlier catalog is still served.
    Failed { error: String },
}

/// One selectable menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub name: String,
    pub display_name: String,
}

impl MenuEntry {
    /// Stable UI element id for this entry.
    pub fn element_id(&self) -> String {
        format!("kernel-submenu-{}", self.name)
    }
}

/// Kernelspec cache keyed by kernel name.
#[derive(Debug)]
pub struct SpecRegistry {
    specs: BTreeMap<String, KernelSpec>,
    menu: Vec<MenuEntry>,
    default_name: Option<String>,
    status: RegistryStatus,
}

impl Default for SpecRegistry {
    fn default() -> Self {
        Self {
            specs: BTreeMap::new(),
            menu: Vec::new(),
            default_name: None,
            status: RegistryStatus::NotLoaded,
        }
    }
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the catalog and replaces registry contents on success.
    ///
    /// Returns the number of loaded specs.
    ///
    /// # Errors
    /// - `RegistryError::Catalog` when the transport fails.
    /// - `RegistryError::Decode` when the payload is malformed.
    ///
    /// Previous contents stay untouched on error.
    pub fn refresh(
        &mut self,
        client: &dyn CatalogClient,
        catalog_url: &str,
    ) -> Result<usize, RegistryError> {
        let response = Self::fetch(client, catalog_url);
        self.apply_response(catalog_url, response)
    }

    /// Issues the catalog request without touching any registry.
    ///
    /// Callers that guard the registry with a lock fetch first, then
    /// `apply_response` under the lock.
    pub fn fetch(client: &dyn CatalogClient, catalog_url: &str) -> Result<String, CatalogError> {
        let started_at = Instant::now();
        let response = client.get_json(catalog_url);
        debug!(
            "event=kernelspec_fetch module=registry status=done url={} ok={} duration_ms={}",
            catalog_url,
            response.is_ok(),
            started_at.elapsed().as_millis()
        );
        response
    }

    /// Applies one catalog response obtained by the caller.
    ///
    /// Failures are logged and recorded in `status()`; the catalog already in
    /// memory is kept.
    pub fn apply_response(
        &mut self,
        catalog_url: &str,
        response: Result<String, CatalogError>,
    ) -> Result<usize, RegistryError> {
        let result = response
            .map_err(RegistryError::from)
            .and_then(|body| self.replace_from_json(&body));

        match &result {
            Ok(count) => info!(
                "event=kernelspec_refresh module=registry status=ok url={} count={}",
                catalog_url, count
            ),
            Err(err) => {
                warn!(
                    "event=kernelspec_refresh module=registry status=error url={} error={}",
                    catalog_url, err
                );
                self.status = RegistryStatus::Failed {
                    error: err.to_string(),
                };
            }
        }
        result
    }

    /// Replaces contents from a raw catalog payload.
    pub fn replace_from_json(&mut self, body: &str) -> Result<usize, RegistryError> {
        let catalog = decode_catalog(body)?;
        let menu = build_menu(&catalog.specs);
        let specs = catalog
            .specs
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect::<BTreeMap<_, _>>();

        let count = specs.len();
        self.specs = specs;
        self.menu = menu;
        self.default_name = catalog.default_name;
        self.status = RegistryStatus::Loaded { count };
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&KernelSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Menu entries in display order.
    pub fn menu_entries(&self) -> &[MenuEntry] {
        &self.menu
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn status(&self) -> &RegistryStatus {
        &self.status
    }
}

/// Three-way comparison on display names.
pub fn compare_display_names(left: &str, right: &str) -> Ordering {
    if left == right {
        Ordering::Equal
    } else if left > right {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

fn build_menu(specs: &[KernelSpec]) -> Vec<MenuEntry> {
    let mut menu = specs
        .iter()
        .map(|spec| MenuEntry {
            name: spec.name.clone(),
            display_name: spec.display_name().to_string(),
        })
        .collect::<Vec<_>>();
    // `sort_by` is stable, so equal display names keep payload order.
    menu.sort_by(|left, right| compare_display_names(&left.display_name, &right.display_name));
    menu
}
