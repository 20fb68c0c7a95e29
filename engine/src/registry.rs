//! Component registry and factory.
//!
//! Maps component type keys (`UI_TABLE`, `UI_BUTTON`, …) to constructors and
//! caches at most one live instance per qualified name. Type tags may carry a
//! numeric suffix (`UI_TABLE_1`) so one layout can hold several entries of
//! the same kind; the suffix is ignored for constructor and style lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, error};

use crate::component::{Component, ComponentProps};
use crate::document::ComponentDescriptor;
use crate::engine::Engine;
use crate::error::ConstructError;
use crate::widgets;

/// Builds a component from its props.
pub type Constructor =
    Arc<dyn Fn(ComponentProps, &Arc<Engine>) -> Arc<dyn Component> + Send + Sync>;

/// Strips a trailing `_<digits>` from a type tag.
#[must_use]
pub fn strip_type_suffix(type_tag: &str) -> &str {
    match type_tag.rsplit_once('_') {
        Some((head, tail))
            if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) =>
        {
            head
        }
        _ => type_tag,
    }
}

/// Constructor table plus the live instance cache.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: RwLock<HashMap<String, Constructor>>,
    instances: Mutex<HashMap<String, Arc<dyn Component>>>,
}

impl ComponentRegistry {
    /// Creates a registry with no constructors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in widget registered.
    #[must_use]
    pub fn with_builtin_widgets() -> Self {
        let registry = Self::new();
        widgets::register_builtin(&registry);
        registry
    }

    /// Registers (or replaces) the constructor for `type_key`.
    pub fn register<F>(&self, type_key: impl Into<String>, constructor: F)
    where
        F: Fn(ComponentProps, &Arc<Engine>) -> Arc<dyn Component> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .unwrap()
            .insert(type_key.into(), Arc::new(constructor));
    }

    /// Returns true if a constructor is registered for `type_key`.
    #[must_use]
    pub fn is_registered(&self, type_key: &str) -> bool {
        self.factories.read().unwrap().contains_key(type_key)
    }

    /// Returns the live instance named `name`.
    #[must_use]
    pub fn instance(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.instances.lock().unwrap().get(name).cloned()
    }

    /// Returns the number of cached instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.lock().unwrap().len()
    }

    /// Resolves `type_tag` + `descriptor` to a live instance.
    ///
    /// A named descriptor reuses the cached instance when there is one; the
    /// style from `style_sheet` is applied either way.
    ///
    /// # Errors
    ///
    /// - [`ConstructError::UnknownComponentType`] if no constructor matches
    /// - [`ConstructError::MissingStyleSheet`] if the style sheet does not exist
    pub fn resolve(
        &self,
        engine: &Arc<Engine>,
        type_tag: &str,
        descriptor: &ComponentDescriptor,
        style_sheet: &str,
    ) -> Result<Arc<dyn Component>, ConstructError> {
        let type_key = strip_type_suffix(type_tag);

        let Some(constructor) = self.factories.read().unwrap().get(type_key).cloned() else {
            error!(type_key = %type_key, "Unknown type of UI component");
            return Err(ConstructError::UnknownComponentType {
                type_key: type_key.to_string(),
            });
        };

        let Some(sheet) = engine.document().styles.get(style_sheet) else {
            error!(style = %style_sheet, "UI style was not found");
            return Err(ConstructError::MissingStyleSheet {
                name: style_sheet.to_string(),
            });
        };
        let style = sheet.get(type_key).cloned().unwrap_or_default();

        let instance = match descriptor.qualified_name.as_deref() {
            Some(name) => {
                let cached = self.instances.lock().unwrap().get(name).cloned();
                match cached {
                    Some(instance) => {
                        debug!(name = %name, "Reusing live component");
                        instance
                    }
                    None => {
                        let built = build(&constructor, engine, name, descriptor, &style);
                        let mut instances = self.instances.lock().unwrap();
                        // A recursive construction may have registered the
                        // same name while the lock was released.
                        Arc::clone(instances.entry(name.to_string()).or_insert(built))
                    }
                }
            }
            None => build(&constructor, engine, type_tag, descriptor, &style),
        };

        instance.apply_style(&style);
        Ok(instance)
    }
}

fn build(
    constructor: &Constructor,
    engine: &Arc<Engine>,
    name: &str,
    descriptor: &ComponentDescriptor,
    style: &ComponentDescriptor,
) -> Arc<dyn Component> {
    debug!(name = %name, "Constructing component");
    let props = ComponentProps {
        name: name.to_string(),
        attributes: descriptor.clone(),
        style: style.clone(),
    };
    let instance = constructor(props, engine);
    instance.core().sync().bind(Arc::downgrade(&instance));
    instance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_numeric_suffix() {
        assert_eq!(strip_type_suffix("UI_TABLE"), "UI_TABLE");
        assert_eq!(strip_type_suffix("UI_TABLE_1"), "UI_TABLE");
        assert_eq!(strip_type_suffix("UI_TABLE_23"), "UI_TABLE");
        assert_eq!(strip_type_suffix("UI_FILE_DIALOG"), "UI_FILE_DIALOG");
        assert_eq!(strip_type_suffix("UI_DATE_RANGE_2"), "UI_DATE_RANGE");
    }

    #[test]
    fn keeps_non_numeric_or_empty_suffix() {
        assert_eq!(strip_type_suffix("UI_TABLE_"), "UI_TABLE_");
        assert_eq!(strip_type_suffix("UI_TABLE_1a"), "UI_TABLE_1a");
        assert_eq!(strip_type_suffix("_1"), "_1");
        assert_eq!(strip_type_suffix("UI"), "UI");
    }

    #[test]
    fn builtin_widgets_are_registered() {
        let registry = ComponentRegistry::with_builtin_widgets();
        for key in [
            "UI_BUTTON",
            "UI_TABLE",
            "UI_FORM",
            "UI_DATE_RANGE",
            "UI_FILE_DIALOG",
            "UI_CONCEPT",
            "UI_PANEL",
            "UI_INVITATION",
        ] {
            assert!(registry.is_registered(key), "{key} missing");
        }
        assert!(!registry.is_registered("UI_SLIDER"));
    }
}
