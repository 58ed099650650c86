//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `kernelselect_core` wiring against a catalog file on disk.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `kernelselect_cli <catalog.json> [kernel-name]`

use kernelselect_core::{
    init_logging, CatalogClient, CatalogError, Collaborators, EventBus, ExtensionLoadError,
    ExtensionModule, KernelSelector, LoggingConfig, ModuleFetcher, PresentationHooks,
    RegistryStatus, SelectorConfig, SessionClient, SessionError,
};
use log::warn;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Serves the catalog from a local file regardless of the requested URL.
struct FileCatalog {
    path: PathBuf,
}

impl CatalogClient for FileCatalog {
    fn get_json(&self, _url: &str) -> Result<String, CatalogError> {
        std::fs::read_to_string(&self.path)
            .map_err(|err| CatalogError::Transport(format!("{}: {err}", self.path.display())))
    }
}

struct AcceptingSession;

impl SessionClient for AcceptingSession {
    fn start_session(&self, _kernel_name: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

struct StdoutHooks;

impl PresentationHooks for StdoutHooks {
    fn set_stylesheet_href(&self, href: &str) {
        println!("stylesheet={href}");
    }

    fn set_indicator_text(&self, text: &str) {
        println!("indicator={text}");
    }

    fn set_logo_src(&self, src: &str) {
        println!("logo={src}");
    }

    fn set_logo_visible(&self, visible: bool) {
        println!("logo_visible={visible}");
    }
}

struct NoModules;

impl ModuleFetcher for NoModules {
    fn fetch(&self, url: &str) -> Result<ExtensionModule, ExtensionLoadError> {
        Err(ExtensionLoadError::Fetch(format!(
            "extension modules are not loaded by the cli: {url}"
        )))
    }
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(catalog_path) = args.next() else {
        eprintln!("usage: kernelselect_cli <catalog.json> [kernel-name]");
        return ExitCode::from(2);
    };
    let requested = args.next();

    let logging = LoggingConfig {
        level: "warn".to_string(),
        log_dir: None,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("logging disabled: {err}");
    }

    let selector = KernelSelector::new(
        &SelectorConfig::new("/"),
        Collaborators {
            bus: Arc::new(EventBus::new()),
            catalog: Arc::new(FileCatalog {
                path: PathBuf::from(catalog_path),
            }),
            session: Arc::new(AcceptingSession),
            hooks: Arc::new(StdoutHooks),
            modules: Arc::new(NoModules),
        },
    );

    println!("kernelselect_core version={}", kernelselect_core::core_version());
    selector.request_kernelspecs();
    if let RegistryStatus::Failed { error } = selector.registry_status() {
        eprintln!("catalog unavailable: {error}");
        return ExitCode::FAILURE;
    }

    for entry in selector.menu_entries() {
        println!("{} {}", entry.element_id(), entry.display_name);
    }

    let Some(kernel) = requested.or_else(|| selector.default_kernel_name()) else {
        return ExitCode::SUCCESS;
    };
    match selector.request_switch(&kernel) {
        Ok(outcome) => {
            println!("switch={kernel} outcome={outcome:?}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            warn!("event=cli_switch module=cli status=error kernel={kernel} error={err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
