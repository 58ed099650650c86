//! Kernel switch coordinator.
//!
//! # Responsibility
//! - Own the kernelspec registry and the confirmed kernel selection.
//! - Drive the switch protocol against the session collaborator.
//! - Reconcile server-resolved kernel names reported by the session.
//!
//! # Invariants
//! - `current_selection` changes only when a `SelectionChanged` event is
//!   delivered, never directly from `request_switch`.
//! - `SelectionChanged` is published only after the session accepted the
//!   start request.
//! - At most one switch is in flight; overlapping requests are rejected.
//! - The state lock is never held across collaborator calls or publishes.

use crate::config::SelectorConfig;
use crate::events::{EventBus, EventKind, KernelCreated, KernelEvent, SubscriptionId};
use crate::extension::loader::{ExtensionLoader, ModuleFetcher};
use crate::kernelspec::catalog::CatalogClient;
use crate::kernelspec::model::KernelSpec;
use crate::kernelspec::registry::{MenuEntry, RegistryStatus, SpecRegistry};
use crate::session::{SessionClient, SessionError};
use crate::ui::sync::{PresentationHooks, UiSynchronizer};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use uuid::Uuid;

/// External collaborators wired into a selector.
#[derive(Clone)]
pub struct Collaborators {
    pub bus: Arc<EventBus>,
    pub catalog: Arc<dyn CatalogClient>,
    pub session: Arc<dyn SessionClient>,
    pub hooks: Arc<dyn PresentationHooks>,
    pub modules: Arc<dyn ModuleFetcher>,
}

/// Switch protocol phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchPhase {
    Idle,
    Switching {
        requested: String,
        previous: Option<String>,
        switch_id: Uuid,
    },
}

/// Non-error results of `request_switch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Session accepted the kernel and `SelectionChanged` was published.
    Switched,
    /// Requested kernel is already the confirmed selection.
    AlreadyActive,
    /// Name not present in the registry (possibly not fetched yet).
    UnknownKernel,
    /// Another switch is still in flight.
    Busy,
    /// Session reported a pending start; switch abandoned and rolled back.
    SessionAlreadyStarting,
}

/// Unrecoverable switch failures, surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    Session(SessionError),
}

impl Display for SwitchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Session(err) => write!(f, "kernel switch failed: {err}"),
        }
    }
}

impl Error for SwitchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Session(err) => Some(err),
        }
    }
}

struct SelectorState {
    registry: SpecRegistry,
    current_selection: Option<String>,
    phase: SwitchPhase,
    // Session confirmation that arrived while a switch was in flight.
    deferred_created: Option<KernelCreated>,
}

/// Coordinates kernel discovery, selection and switching for one document.
pub struct KernelSelector {
    state: Mutex<SelectorState>,
    catalog_url: String,
    bus: Arc<EventBus>,
    catalog: Arc<dyn CatalogClient>,
    session: Arc<dyn SessionClient>,
    ui: UiSynchronizer,
    extensions: ExtensionLoader,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl KernelSelector {
    /// Creates a selector and subscribes it to the event bus.
    ///
    /// The catalog is not fetched yet; call `request_kernelspecs`.
    pub fn new(config: &SelectorConfig, collaborators: Collaborators) -> Arc<Self> {
        let selector = Arc::new(Self {
            state: Mutex::new(SelectorState {
                registry: SpecRegistry::new(),
                current_selection: None,
                phase: SwitchPhase::Idle,
                deferred_created: None,
            }),
            catalog_url: config.catalog_url(),
            bus: collaborators.bus,
            catalog: collaborators.catalog,
            session: collaborators.session,
            ui: UiSynchronizer::new(collaborators.hooks),
            extensions: ExtensionLoader::new(collaborators.modules),
            subscriptions: Mutex::new(Vec::new()),
        });
        selector.bind_events();
        selector
    }

    fn bind_events(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let on_changed = self
            .bus
            .subscribe(EventKind::SelectionChanged, move |event| {
                if let (Some(selector), KernelEvent::SelectionChanged(spec)) =
                    (weak.upgrade(), event)
                {
                    selector.on_selection_changed(spec);
                }
            });

        let weak: Weak<Self> = Arc::downgrade(self);
        let on_created = self.bus.subscribe(EventKind::KernelCreated, move |event| {
            if let (Some(selector), KernelEvent::KernelCreated(created)) = (weak.upgrade(), event)
            {
                selector.on_kernel_created(created);
            }
        });

        lock(&self.subscriptions).extend([on_changed, on_created]);
    }

    /// Fetches the kernelspec catalog and rebuilds the registry.
    ///
    /// Failures are logged and exposed through `registry_status()` only.
    pub fn request_kernelspecs(&self) {
        let response = SpecRegistry::fetch(self.catalog.as_ref(), &self.catalog_url);
        let mut state = self.lock_state();
        // Errors are already logged and recorded by the registry.
        let _ = state.registry.apply_response(&self.catalog_url, response);
    }

    /// Requests a switch of the session's kernel.
    ///
    /// # Errors
    /// - `SwitchError::Session` for any session failure other than
    ///   `SessionError::AlreadyStarting`.
    pub fn request_switch(&self, kernel_name: &str) -> Result<SwitchOutcome, SwitchError> {
        let switch_id = Uuid::new_v4();
        let (spec, previous_css) = {
            let mut state = self.lock_state();
            if state.current_selection.as_deref() == Some(kernel_name) {
                debug!(
                    "event=kernel_switch module=selector status=skipped kernel={} reason=already_active",
                    kernel_name
                );
                return Ok(SwitchOutcome::AlreadyActive);
            }
            if let SwitchPhase::Switching { requested, .. } = &state.phase {
                warn!(
                    "event=kernel_switch module=selector status=rejected kernel={} in_flight={} reason=busy",
                    kernel_name, requested
                );
                return Ok(SwitchOutcome::Busy);
            }
            let Some(spec) = state.registry.get(kernel_name).cloned() else {
                warn!(
                    "event=kernel_switch module=selector status=rejected kernel={} reason=unknown_kernel",
                    kernel_name
                );
                return Ok(SwitchOutcome::UnknownKernel);
            };

            let previous = state.current_selection.clone();
            let previous_css = previous
                .as_deref()
                .and_then(|name| state.registry.get(name))
                .and_then(KernelSpec::stylesheet_url)
                .map(str::to_string);
            state.phase = SwitchPhase::Switching {
                requested: kernel_name.to_string(),
                previous,
                switch_id,
            };
            (spec, previous_css)
        };

        info!(
            "event=kernel_switch module=selector status=start kernel={} switch_id={}",
            kernel_name, switch_id
        );
        self.ui.apply_stylesheet(spec.stylesheet_url());

        let started = self.session.start_session(kernel_name);
        let deferred = {
            let mut state = self.lock_state();
            state.phase = SwitchPhase::Idle;
            state.deferred_created.take()
        };

        let result = match started {
            Ok(()) => {
                info!(
                    "event=kernel_switch module=selector status=ok kernel={} switch_id={}",
                    kernel_name, switch_id
                );
                self.bus.publish(KernelEvent::SelectionChanged(spec.clone()));
                if let Some(url) = spec.extension_url() {
                    // Detached: the handle is dropped and never joined.
                    let _ = self.extensions.spawn_load(&spec.name, url);
                }
                Ok(SwitchOutcome::Switched)
            }
            Err(SessionError::AlreadyStarting) => {
                info!(
                    "event=kernel_switch module=selector status=abandoned kernel={} switch_id={} reason=session_already_starting",
                    kernel_name, switch_id
                );
                self.ui.apply_stylesheet(previous_css.as_deref());
                Ok(SwitchOutcome::SessionAlreadyStarting)
            }
            Err(err) => {
                warn!(
                    "event=kernel_switch module=selector status=error kernel={} switch_id={} error={}",
                    kernel_name, switch_id, err
                );
                self.ui.apply_stylesheet(previous_css.as_deref());
                Err(SwitchError::Session(err))
            }
        };

        if let Some(created) = deferred {
            self.reconcile(&created);
        }
        result
    }

    /// Logs that kernel switching is best-effort.
    pub fn lock_switch(&self) {
        warn!("event=kernel_switch module=selector status=warning reason=switch_not_guaranteed");
    }

    fn on_selection_changed(&self, spec: &KernelSpec) {
        self.lock_state().current_selection = Some(spec.name.clone());
        self.ui.apply_selection(spec);
        info!(
            "event=selection_changed module=selector status=ok kernel={}",
            spec.name
        );
    }

    fn on_kernel_created(&self, created: &KernelCreated) {
        {
            let mut state = self.lock_state();
            if matches!(state.phase, SwitchPhase::Switching { .. }) {
                debug!(
                    "event=kernel_created module=selector status=deferred kernel={}",
                    created.kernel.name
                );
                state.deferred_created = Some(created.clone());
                return;
            }
        }
        self.reconcile(created);
    }

    // A generic request (e.g. `python`) may be resolved by the server to a
    // specific variant; re-publish with the resolved spec.
    fn reconcile(&self, created: &KernelCreated) {
        let resolved = {
            let state = self.lock_state();
            let name = created.kernel.name.as_str();
            if state.current_selection.as_deref() == Some(name) {
                return;
            }
            match state.registry.get(name) {
                Some(spec) => spec.clone(),
                None => {
                    warn!(
                        "event=kernel_created module=selector status=ignored kernel={} reason=not_in_registry",
                        name
                    );
                    return;
                }
            }
        };
        info!(
            "event=kernel_created module=selector status=resolved kernel={}",
            resolved.name
        );
        self.bus.publish(KernelEvent::SelectionChanged(resolved));
    }

    /// Confirmed kernel name, `None` until the first confirmation.
    pub fn current_selection(&self) -> Option<String> {
        self.lock_state().current_selection.clone()
    }

    pub fn phase(&self) -> SwitchPhase {
        self.lock_state().phase.clone()
    }

    /// Menu entries in display order.
    pub fn menu_entries(&self) -> Vec<MenuEntry> {
        self.lock_state().registry.menu_entries().to_vec()
    }

    pub fn kernel_spec(&self, name: &str) -> Option<KernelSpec> {
        self.lock_state().registry.get(name).cloned()
    }

    /// Server's advertised default kernel, when known.
    pub fn default_kernel_name(&self) -> Option<String> {
        self.lock_state()
            .registry
            .default_name()
            .map(str::to_string)
    }

    pub fn registry_status(&self) -> RegistryStatus {
        self.lock_state().registry.status().clone()
    }

    pub fn catalog_url(&self) -> &str {
        &self.catalog_url
    }

    /// Presentation driver, for wiring logo load/error callbacks.
    pub fn ui(&self) -> &UiSynchronizer {
        &self.ui
    }

    fn lock_state(&self) -> MutexGuard<'_, SelectorState> {
        lock(&self.state)
    }
}

impl Drop for KernelSelector {
    fn drop(&mut self) {
        for id in lock(&self.subscriptions).drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
