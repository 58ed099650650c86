//! Kernel selection core.
//! Discovers kernelspecs, drives kernel switches for a document session and
//! keeps indicator state in line with the kernel the server actually runs.

pub mod config;
pub mod events;
pub mod extension;
pub mod kernelspec;
pub mod logging;
pub mod selector;
pub mod session;
pub mod ui;

pub use config::{ConfigError, LoggingConfig, SelectorConfig};
pub use events::{EventBus, EventKind, KernelCreated, KernelEvent, KernelInfo, SubscriptionId};
pub use extension::loader::{
    ExtensionLoadError, ExtensionLoader, ExtensionModule, LoadOutcome, ModuleFetcher,
};
pub use kernelspec::catalog::{url_join_encode, CatalogClient, CatalogError, CATALOG_PATH};
pub use kernelspec::model::{
    KernelSpec, KernelSpecBody, RESOURCE_KERNEL_CSS, RESOURCE_KERNEL_JS, RESOURCE_LOGO_32,
    RESOURCE_LOGO_64,
};
pub use kernelspec::registry::{MenuEntry, RegistryError, RegistryStatus, SpecRegistry};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use selector::coordinator::{
    Collaborators, KernelSelector, SwitchError, SwitchOutcome, SwitchPhase,
};
pub use session::{SessionClient, SessionError};
pub use ui::sync::{PresentationHooks, UiSynchronizer};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
