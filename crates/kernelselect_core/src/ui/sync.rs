//! Presentation sync for the kernel indicator.
//!
//! # Responsibility
//! - Mirror the confirmed kernel into indicator text, logo and stylesheet.
//! - Apply best-effort logo visibility from image load callbacks.
//!
//! # Invariants
//! - Indicator state only changes from confirmed selections, never from
//!   switch requests. The stylesheet is the one exception (see
//!   `apply_stylesheet`).

use crate::kernelspec::model::KernelSpec;
use log::debug;
use std::sync::Arc;

/// Presentation targets owned by the UI layer.
pub trait PresentationHooks: Send + Sync {
    /// Sets the kernel stylesheet link; an empty href clears it.
    fn set_stylesheet_href(&self, href: &str);
    fn set_indicator_text(&self, text: &str);
    fn set_logo_src(&self, src: &str);
    fn set_logo_visible(&self, visible: bool);
}

/// Drives `PresentationHooks` from kernel selection state.
#[derive(Clone)]
pub struct UiSynchronizer {
    hooks: Arc<dyn PresentationHooks>,
}

impl UiSynchronizer {
    pub fn new(hooks: Arc<dyn PresentationHooks>) -> Self {
        Self { hooks }
    }

    /// Points the stylesheet link at `href`, or clears it for `None`.
    ///
    /// Called when a switch starts, before the session confirms it.
    pub fn apply_stylesheet(&self, href: Option<&str>) {
        self.hooks.set_stylesheet_href(href.unwrap_or(""));
    }

    /// Applies a confirmed selection to indicator text and logo.
    pub fn apply_selection(&self, spec: &KernelSpec) {
        self.hooks.set_indicator_text(spec.display_name());
        match spec.logo_url() {
            Some(src) => {
                self.hooks.set_logo_src(src);
                self.hooks.set_logo_visible(true);
            }
            None => self.hooks.set_logo_visible(false),
        }
        debug!(
            "event=indicator_sync module=ui status=ok kernel={} has_logo={}",
            spec.name,
            spec.logo_url().is_some()
        );
    }

    /// Logo image finished loading.
    pub fn on_logo_loaded(&self) {
        self.hooks.set_logo_visible(true);
    }

    /// Logo image failed to load.
    pub fn on_logo_error(&self) {
        debug!("event=logo_load module=ui status=error");
        self.hooks.set_logo_visible(false);
    }
}

#[cfg(test)]
mod tests {
    use super::{PresentationHooks, UiSynchronizer};
    use crate::kernelspec::model::{KernelSpec, RESOURCE_LOGO_64};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingHooks {
        calls: Mutex<Vec<String>>,
    }

    impl PresentationHooks for RecordingHooks {
        fn set_stylesheet_href(&self, href: &str) {
            self.calls.lock().expect("lock").push(format!("css={href}"));
        }

        fn set_indicator_text(&self, text: &str) {
            self.calls.lock().expect("lock").push(format!("text={text}"));
        }

        fn set_logo_src(&self, src: &str) {
            self.calls.lock().expect("lock").push(format!("src={src}"));
        }

        fn set_logo_visible(&self, visible: bool) {
            self.calls
                .lock()
                .expect("lock")
                .push(format!("visible={visible}"));
        }
    }

    fn sync() -> (UiSynchronizer, Arc<RecordingHooks>) {
        let hooks = Arc::new(RecordingHooks::default());
        (UiSynchronizer::new(hooks.clone()), hooks)
    }

    #[test]
    fn selection_with_logo_sets_src_and_shows_image() {
        let (ui, hooks) = sync();
        ui.apply_selection(
            &KernelSpec::new("python3", "Python 3").with_resource(RESOURCE_LOGO_64, "/logo.png"),
        );
        assert_eq!(
            *hooks.calls.lock().expect("lock"),
            vec!["text=Python 3", "src=/logo.png", "visible=true"]
        );
    }

    #[test]
    fn selection_without_logo_hides_image() {
        let (ui, hooks) = sync();
        ui.apply_selection(&KernelSpec::new("ir", "R"));
        assert_eq!(
            *hooks.calls.lock().expect("lock"),
            vec!["text=R", "visible=false"]
        );
    }

    #[test]
    fn stylesheet_none_clears_href() {
        let (ui, hooks) = sync();
        ui.apply_stylesheet(Some("/kernel.css"));
        ui.apply_stylesheet(None);
        assert_eq!(
            *hooks.calls.lock().expect("lock"),
            vec!["css=/kernel.css", "css="]
        );
    }

    #[test]
    fn logo_callbacks_toggle_visibility() {
        let (ui, hooks) = sync();
        ui.on_logo_error();
        ui.on_logo_loaded();
        assert_eq!(
            *hooks.calls.lock().expect("lock"),
            vec!["visible=false", "visible=true"]
        );
    }
}
