//! Composition engine.
//!
//! [`Engine`] is the explicit context every component is built against: the
//! parsed document, the mutable setup parameters, the registry, the backend
//! transport and the mount points components are attached to.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::component::Component;
use crate::config::DEFAULT_RETRY_DELAY_MS;
use crate::document::{layout_entries, ComponentDescriptor, Document, Setup};
use crate::element::Element;
use crate::error::ConstructError;
use crate::registry::ComponentRegistry;
use crate::transport::Transport;

/// Prefix marking descriptor entries that are components.
pub const COMPONENT_PREFIX: &str = "UI_";

/// One constructed entry of a composite.
#[derive(Clone)]
pub struct Constructed {
    /// Entry key as written in the document (suffix kept).
    pub type_tag: String,
    pub component: Arc<dyn Component>,
}

impl std::fmt::Debug for Constructed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructed")
            .field("type_tag", &self.type_tag)
            .field("name", &self.component.name())
            .finish()
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    document: Document,
    transport: Arc<dyn Transport>,
    registry: ComponentRegistry,
    retry_delay: Duration,
}

impl EngineBuilder {
    /// Replaces the registry (defaults to the built-in widgets).
    #[must_use]
    pub fn registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the delay between polls of a pending notification.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<Engine> {
        let setup = self.document.setup.clone();
        Arc::new(Engine {
            document: self.document,
            setup: RwLock::new(setup),
            registry: self.registry,
            transport: self.transport,
            retry_delay: self.retry_delay,
            mounts: Mutex::new(HashMap::new()),
            active: Mutex::new(Vec::new()),
        })
    }
}

/// Shared composition context.
pub struct Engine {
    document: Document,
    setup: RwLock<Setup>,
    registry: ComponentRegistry,
    transport: Arc<dyn Transport>,
    retry_delay: Duration,
    mounts: Mutex<HashMap<String, Element>>,
    /// Components of the mounted layout. Unnamed entries have no other owner.
    active: Mutex<Vec<Constructed>>,
}

impl Engine {
    /// Starts building an engine over `document` talking to `transport`.
    #[must_use]
    pub fn builder(document: Document, transport: Arc<dyn Transport>) -> EngineBuilder {
        EngineBuilder {
            document,
            transport,
            registry: ComponentRegistry::with_builtin_widgets(),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Read access to the setup parameters.
    pub fn setup(&self) -> RwLockReadGuard<'_, Setup> {
        self.setup.read().unwrap()
    }

    /// Changes a setup parameter.
    pub fn set_setup(&self, key: &str, value: &str) {
        debug!(key = %key, value = %value, "Setup changed");
        self.setup.write().unwrap().set(key, value);
    }

    /// Registers an element as the mount point `id`.
    pub fn add_mount_point(&self, id: impl Into<String>, element: Element) {
        self.mounts.lock().unwrap().insert(id.into(), element);
    }

    /// Returns the mount point `id`.
    #[must_use]
    pub fn mount_point(&self, id: &str) -> Option<Element> {
        self.mounts.lock().unwrap().get(id).cloned()
    }

    fn style_sheet_name(&self) -> String {
        self.setup().style().unwrap_or_default().to_string()
    }

    /// Resolves one component under the active style sheet.
    ///
    /// Failures are logged by the registry and reported as `None`.
    pub fn construct_component(
        self: &Arc<Self>,
        type_tag: &str,
        descriptor: &ComponentDescriptor,
    ) -> Option<Arc<dyn Component>> {
        let sheet = self.style_sheet_name();
        self.registry
            .resolve(self, type_tag, descriptor, &sheet)
            .ok()
    }

    /// Constructs every `UI_*` entry in order.
    ///
    /// Entries with an unknown type are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructError::MissingStyleSheet`] when the active style
    /// sheet does not exist; nothing is constructed in that case.
    pub fn construct_composite<'a, I>(
        self: &Arc<Self>,
        entries: I,
    ) -> Result<Vec<Constructed>, ConstructError>
    where
        I: IntoIterator<Item = (&'a str, Cow<'a, ComponentDescriptor>)>,
    {
        let sheet = self.style_sheet_name();
        if !self.document.styles.contains_key(&sheet) {
            error!(style = %sheet, "UI style was not found, nothing constructed");
            return Err(ConstructError::MissingStyleSheet { name: sheet });
        }

        let mut constructed = Vec::new();
        for (type_tag, descriptor) in entries {
            if !type_tag.starts_with(COMPONENT_PREFIX) {
                continue;
            }
            match self.registry.resolve(self, type_tag, &descriptor, &sheet) {
                Ok(component) => constructed.push(Constructed {
                    type_tag: type_tag.to_string(),
                    component,
                }),
                Err(ConstructError::UnknownComponentType { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(constructed)
    }

    /// Mounts the active layout into the active output.
    ///
    /// The mount point is cleared, every constructed entry is attached in
    /// order and asked to sync.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructError::UnresolvedLayoutTarget`] without side effects
    /// if `UI_OUTPUT` or `UI_LAYOUT` does not resolve, or the construction
    /// error of the layout entries.
    pub fn construct_layout(self: &Arc<Self>) -> Result<Vec<Constructed>, ConstructError> {
        let (output, layout) = {
            let setup = self.setup();
            (
                setup.output().map(str::to_string),
                setup.layout().map(str::to_string),
            )
        };

        let mount = output.as_deref().and_then(|id| self.mount_point(id));
        let entries = layout
            .as_deref()
            .and_then(|name| self.document.layouts.get(name));
        let (Some(mount), Some(entries)) = (mount, entries) else {
            warn!(output = ?output, layout = ?layout, "Layout target is unresolved");
            return Err(ConstructError::UnresolvedLayoutTarget { output, layout });
        };

        mount.clear();
        self.active.lock().unwrap().clear();
        let constructed = self.construct_composite(layout_entries(entries))?;
        *self.active.lock().unwrap() = constructed.clone();
        for entry in &constructed {
            mount.append_child(&entry.component.element());
            entry.component.sync_with_backend();
        }
        info!(
            layout = layout.as_deref().unwrap_or_default(),
            components = constructed.len(),
            "Layout constructed"
        );
        Ok(constructed)
    }

    /// Components of the layout last mounted by [`Engine::construct_layout`].
    #[must_use]
    pub fn active_layout(&self) -> Vec<Constructed> {
        self.active.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentCore, ComponentProps};
    use crate::protocol::SyncResponse;
    use crate::testing::ScriptedTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DOC: &str = r#"
        <webapp>
          <ui_style name="light">
            <UI_BUTTON><BASE_STYLE>btn</BASE_STYLE></UI_BUTTON>
          </ui_style>
          <ui_style name="dark">
            <UI_BUTTON><BASE_STYLE>btn-dark</BASE_STYLE></UI_BUTTON>
          </ui_style>
          <ui_layout name="main">
            <UI_BUTTON name="ok"/>
            <UI_SLIDER name="volume"/>
            <UI_BUTTON_2 name="cancel"/>
            <HEADER>ignored</HEADER>
          </ui_layout>
          <ui_setup>
            <UI_STYLE use="light"/>
            <UI_LAYOUT use="main"/>
            <UI_OUTPUT use="content"/>
          </ui_setup>
        </webapp>
    "#;

    fn engine() -> (Arc<Engine>, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let doc = Document::parse(DOC).unwrap();
        (Engine::builder(doc, transport.clone()).build(), transport)
    }

    fn button(name: &str) -> ComponentDescriptor {
        ComponentDescriptor::named(name)
    }

    #[test]
    fn identity_survives_style_change() {
        let (engine, _) = engine();

        let first = engine.construct_component("UI_BUTTON", &button("ok")).unwrap();
        assert_eq!(first.element().class().as_deref(), Some("btn"));

        engine.set_setup("UI_STYLE", "dark");
        let second = engine.construct_component("UI_BUTTON", &button("ok")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.element().class().as_deref(), Some("btn-dark"));
        assert_eq!(engine.registry().instance_count(), 1);
    }

    #[test]
    fn suffixed_tags_resolve_to_same_type() {
        let (engine, _) = engine();
        for (tag, name) in [("UI_BUTTON", "a"), ("UI_BUTTON_1", "b"), ("UI_BUTTON_23", "c")] {
            let component = engine.construct_component(tag, &button(name)).unwrap();
            assert_eq!(component.element().tag(), "button");
            assert_eq!(component.element().class().as_deref(), Some("btn"));
        }
    }

    #[test]
    fn composite_skips_unknown_and_non_component_entries() {
        let (engine, _) = engine();
        let layout = &engine.document().layouts["main"];

        let constructed = engine.construct_composite(layout_entries(layout)).unwrap();

        let tags: Vec<&str> = constructed.iter().map(|c| c.type_tag.as_str()).collect();
        assert_eq!(tags, vec!["UI_BUTTON", "UI_BUTTON_2"]);
        assert_eq!(constructed[1].component.name(), "cancel");
    }

    #[test]
    fn missing_style_sheet_constructs_nothing() {
        let (engine, _) = engine();
        engine.set_setup("UI_STYLE", "neon");
        let layout = &engine.document().layouts["main"];

        let err = engine.construct_composite(layout_entries(layout)).unwrap_err();

        assert_eq!(
            err,
            ConstructError::MissingStyleSheet {
                name: "neon".to_string()
            }
        );
        assert_eq!(engine.registry().instance_count(), 0);
    }

    #[test]
    fn unresolved_layout_target_has_no_effect() {
        let (engine, _) = engine();
        let err = engine.construct_layout().unwrap_err();
        assert_eq!(
            err,
            ConstructError::UnresolvedLayoutTarget {
                output: Some("content".to_string()),
                layout: Some("main".to_string()),
            }
        );

        let mount = Element::new("main");
        mount.append_child(&Element::new("p"));
        engine.add_mount_point("content", mount.clone());
        engine.set_setup("UI_LAYOUT", "missing");

        assert!(engine.construct_layout().is_err());
        assert_eq!(mount.children().len(), 1);
        assert_eq!(engine.registry().instance_count(), 0);
    }

    #[tokio::test]
    async fn construct_layout_mounts_and_syncs() {
        let (engine, transport) = engine();
        transport.respond("ok", r#"{"label":"OK"}"#);
        transport.respond("cancel", r#"{"label":"Cancel"}"#);
        let mount = Element::new("main");
        mount.append_child(&Element::new("stale"));
        engine.add_mount_point("content", mount.clone());

        let constructed = engine.construct_layout().unwrap();
        for entry in &constructed {
            if let Some(task) = entry.component.sync_with_backend() {
                task.settled().await;
            }
        }

        assert_eq!(mount.children().len(), 2);
        assert_eq!(mount.text_content(), "OK Cancel");
        assert_eq!(transport.requests_for("ok").len(), 1);
    }

    #[test]
    fn custom_widgets_can_be_registered() {
        struct Counter {
            core: ComponentCore,
        }
        impl Component for Counter {
            fn core(&self) -> &ComponentCore {
                &self.core
            }
            fn on_draw(&self, _response: &SyncResponse) {}
        }

        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let registry = ComponentRegistry::with_builtin_widgets();
        registry.register("UI_SLIDER", move |props: ComponentProps, engine: &Arc<Engine>| {
            counter.fetch_add(1, Ordering::SeqCst);
            let core = ComponentCore::new(&props, Element::new("input"), engine);
            Arc::new(Counter { core }) as Arc<dyn Component>
        });
        let transport = Arc::new(ScriptedTransport::new());
        let engine = Engine::builder(Document::parse(DOC).unwrap(), transport)
            .registry(registry)
            .build();

        let layout = &engine.document().layouts["main"];
        let constructed = engine.construct_composite(layout_entries(layout)).unwrap();
        engine.construct_composite(layout_entries(layout)).unwrap();

        assert_eq!(constructed.len(), 3);
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(constructed[1].component.element().tag(), "input");
    }
}
