//! The component instance contract.
//!
//! A component is anything the registry can construct: it owns a
//! [`ComponentCore`] (identity, visual element, attributes, style, lifecycle
//! hooks and its [`SyncChannel`]) and reacts to backend responses through
//! [`Component::on_draw`].
//!
//! Optional behavior is exposed through capability accessors rather than a
//! class hierarchy:
//!
//! | Capability | Trait | Used by |
//! |------------|-------|---------|
//! | navigation controls | [`HasNavigation`] | wizard title bar |
//! | embedded form element | [`HasForm`] | wizard form mount |
//! | request arguments | [`FormField`] | form submit |
//! | request target slot | [`RequestTargetSlot`] | table → embedded forms |

use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use tracing::warn;

use crate::document::{ComponentDescriptor, Style};
use crate::element::Element;
use crate::engine::Engine;
use crate::error::SyncError;
use crate::protocol::SyncResponse;
use crate::sync::{SyncChannel, SyncTask, SYNC_ACTION};
use crate::transport::Transport;

/// Style attribute applied as the class of a component's root element.
pub const BASE_STYLE: &str = "BASE_STYLE";

/// Attribute holding a component's title.
pub const TITLE: &str = "TITLE";

/// A lifecycle callback installed by a composing parent.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle hook slots.
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    pub on_open: Option<Hook>,
    pub on_close: Option<Hook>,
    pub on_update: Option<Hook>,
}

/// Constructor input handed to every widget.
#[derive(Debug, Clone)]
pub struct ComponentProps {
    /// Request name: the qualified name, or the type tag for unnamed entries.
    pub name: String,
    /// Descriptor the component was declared with.
    pub attributes: ComponentDescriptor,
    /// Resolved style for the component's type key.
    pub style: Style,
}

/// State shared by every component.
pub struct ComponentCore {
    name: String,
    element: Element,
    attributes: ComponentDescriptor,
    style: RwLock<Style>,
    hooks: Mutex<LifecycleHooks>,
    sync: SyncChannel,
}

impl ComponentCore {
    /// Creates the core for a component built by `engine`.
    #[must_use]
    pub fn new(props: &ComponentProps, element: Element, engine: &Engine) -> Self {
        Self::with_transport(props, element, engine.transport(), engine.retry_delay())
    }

    /// Creates a core with an explicit transport.
    #[must_use]
    pub fn with_transport(
        props: &ComponentProps,
        element: Element,
        transport: Arc<dyn Transport>,
        retry_delay: Duration,
    ) -> Self {
        let sync = SyncChannel::new(props.name.clone(), element.clone(), transport, retry_delay);
        Self {
            name: props.name.clone(),
            element,
            attributes: props.attributes.clone(),
            style: RwLock::new(props.style.clone()),
            hooks: Mutex::new(LifecycleHooks::default()),
            sync,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn element(&self) -> &Element {
        &self.element
    }

    #[must_use]
    pub fn attributes(&self) -> &ComponentDescriptor {
        &self.attributes
    }

    #[must_use]
    pub fn sync(&self) -> &SyncChannel {
        &self.sync
    }

    /// Returns a copy of the last applied style.
    #[must_use]
    pub fn style(&self) -> Style {
        self.style.read().unwrap().clone()
    }

    /// Returns a text attribute of the last applied style.
    #[must_use]
    pub fn style_text(&self, key: &str) -> Option<String> {
        self.style.read().unwrap().text(key).map(str::to_string)
    }

    /// Stores `style` without touching any element.
    pub fn store_style(&self, style: &Style) {
        *self.style.write().unwrap() = style.clone();
    }

    /// Stores `style` and sets the root element class from `BASE_STYLE`.
    pub fn set_style(&self, style: &Style) {
        self.store_style(style);
        self.element.set_class(style.text(BASE_STYLE));
    }

    /// Replaces all hooks.
    pub fn set_hooks(&self, hooks: LifecycleHooks) {
        *self.hooks.lock().unwrap() = hooks;
    }

    /// Returns a copy of the installed hooks.
    #[must_use]
    pub fn hooks(&self) -> LifecycleHooks {
        self.hooks.lock().unwrap().clone()
    }

    /// Fires `on_open`. Returns false when no hook is installed.
    pub fn fire_open(&self) -> bool {
        let hook = self.hooks.lock().unwrap().on_open.clone();
        invoke(hook)
    }

    /// Fires `on_close`. Returns false when no hook is installed.
    pub fn fire_close(&self) -> bool {
        let hook = self.hooks.lock().unwrap().on_close.clone();
        invoke(hook)
    }

    /// Fires `on_update`. Returns false when no hook is installed.
    pub fn fire_update(&self) -> bool {
        let hook = self.hooks.lock().unwrap().on_update.clone();
        invoke(hook)
    }

    /// Returns true if an `on_open` hook is installed.
    #[must_use]
    pub fn has_open_hook(&self) -> bool {
        self.hooks.lock().unwrap().on_open.is_some()
    }
}

fn invoke(hook: Option<Hook>) -> bool {
    match hook {
        Some(hook) => {
            hook();
            true
        }
        None => false,
    }
}

/// A live UI component.
pub trait Component: Send + Sync {
    /// Shared component state.
    fn core(&self) -> &ComponentCore;

    /// Draws a finished backend response.
    fn on_draw(&self, response: &SyncResponse);

    /// Qualified name (request identity).
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Root visual element.
    fn element(&self) -> Element {
        self.core().element().clone()
    }

    /// Title shown by composing parents.
    fn title(&self) -> Option<String> {
        self.core().attributes().text(TITLE).map(str::to_string)
    }

    /// Applies a resolved style. Called on every resolution.
    fn apply_style(&self, style: &Style) {
        self.core().set_style(style);
    }

    /// Sends `action` to the backend.
    ///
    /// # Errors
    ///
    /// See [`SyncChannel::send_action`].
    fn send_action(&self, action: &str, args: &[(&str, &str)]) -> Result<SyncTask, SyncError> {
        self.core().sync().send_action(action, args)
    }

    /// Refreshes the component from the backend. Failures to start the cycle
    /// are logged.
    fn sync_with_backend(&self) -> Option<SyncTask> {
        match self.send_action(SYNC_ACTION, &[]) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(name = %self.name(), error = %e, "Failed to start sync");
                None
            }
        }
    }

    /// Installs lifecycle hooks.
    fn set_hooks(&self, hooks: LifecycleHooks) {
        self.core().set_hooks(hooks);
    }

    fn as_navigation(&self) -> Option<&dyn HasNavigation> {
        None
    }

    fn as_form(&self) -> Option<&dyn HasForm> {
        None
    }

    fn as_form_field(&self) -> Option<&dyn FormField> {
        None
    }

    fn as_request_target_slot(&self) -> Option<&dyn RequestTargetSlot> {
        None
    }
}

/// Components with their own navigation controls.
pub trait HasNavigation {
    /// Controls appended to a parent's navigation bar.
    fn navigation(&self) -> Vec<Element>;
}

/// Components that can lend a form element to a parent.
pub trait HasForm {
    fn form(&self) -> Element;
}

/// Components that contribute arguments to a form submission.
pub trait FormField {
    /// Request argument fragment, or `None` when the field has no usable value.
    fn request_args(&self) -> Option<String>;
}

/// Components that send their requests through another component.
pub trait RequestTargetSlot {
    fn set_request_target(&self, target: Weak<dyn Component>);
}
