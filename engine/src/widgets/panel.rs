//! `UI_PANEL`: a navigation menu.
//!
//! Each named child is a menu item with a `LABEL` and an `ACTION`. Actions
//! are parsed into [`PanelAction`] when the panel is built; the supported
//! forms are `layout:<name>` and `changeLayout('<name>')`.

use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, error, warn};

use crate::component::{Component, ComponentCore, ComponentProps};
use crate::document::{AttrValue, Style, UI_LAYOUT};
use crate::element::Element;
use crate::engine::Engine;
use crate::protocol::SyncResponse;
use crate::sync::SyncTask;

pub const TYPE_KEY: &str = "UI_PANEL";

/// What a menu item does when selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    /// Switch the active layout and rebuild the output.
    ChangeLayout(String),
}

impl FromStr for PanelAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(name) = s.strip_prefix("layout:") {
            return Ok(Self::ChangeLayout(name.trim().to_string()));
        }

        let call = s.trim_end_matches(';').trim();
        let call = call.strip_prefix("this.").unwrap_or(call);
        if let Some(arg) = call
            .strip_prefix("changeLayout(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let arg = arg.trim();
            let unquoted = arg
                .strip_prefix('\'')
                .and_then(|a| a.strip_suffix('\''))
                .or_else(|| arg.strip_prefix('"').and_then(|a| a.strip_suffix('"')));
            if let Some(name) = unquoted {
                return Ok(Self::ChangeLayout(name.to_string()));
            }
        }

        Err(format!("unsupported panel action: {s}"))
    }
}

struct MenuItem {
    element: Element,
    action: Option<PanelAction>,
}

pub struct Panel {
    core: ComponentCore,
    menu: Element,
    items: Vec<MenuItem>,
    active: Mutex<usize>,
    engine: Weak<Engine>,
}

pub fn construct(props: ComponentProps, engine: &Arc<Engine>) -> Arc<dyn Component> {
    Panel::build(props, engine)
}

impl Panel {
    pub fn build(props: ComponentProps, engine: &Arc<Engine>) -> Arc<Self> {
        let panel = Arc::new_cyclic(|weak: &Weak<Panel>| {
            let core = ComponentCore::new(&props, Element::new("nav"), engine);
            let menu = Element::new("ul");
            let mut items = Vec::new();

            for value in props.attributes.attributes.values() {
                let AttrValue::Node(item) = value else {
                    continue;
                };
                let action = match item.text("ACTION").map(str::parse::<PanelAction>) {
                    Some(Ok(action)) => Some(action),
                    Some(Err(e)) => {
                        warn!(name = %props.name, error = %e, "Menu item action ignored");
                        None
                    }
                    None => None,
                };

                let element = Element::new("li");
                let link = Element::new("a");
                link.set_text(item.text("LABEL").unwrap_or_default());
                let index = items.len();
                let weak = weak.clone();
                link.on_click(move || {
                    if let Some(panel) = weak.upgrade() {
                        panel.select(index);
                    }
                });
                element.append_child(&link);
                menu.append_child(&element);
                items.push(MenuItem { element, action });
            }
            core.element().append_child(&menu);

            Panel {
                core,
                menu,
                items,
                active: Mutex::new(0),
                engine: Arc::downgrade(engine),
            }
        });
        panel.apply_style(&props.style);
        panel
    }

    /// Index of the active item.
    #[must_use]
    pub fn active(&self) -> usize {
        *self.active.lock().unwrap()
    }

    /// Runs item `index`'s action and marks it active.
    pub fn select(&self, index: usize) {
        let Some(item) = self.items.get(index) else {
            return;
        };
        if let Some(action) = &item.action {
            self.run(action);
        }
        *self.active.lock().unwrap() = index;
        self.mark_active();
    }

    fn run(&self, action: &PanelAction) {
        match action {
            PanelAction::ChangeLayout(name) => {
                let Some(engine) = self.engine.upgrade() else {
                    return;
                };
                debug!(layout = %name, "Changing layout");
                engine.set_setup(UI_LAYOUT, name);
                if let Err(e) = engine.construct_layout() {
                    error!(layout = %name, error = %e, "Layout change failed");
                }
            }
        }
    }

    fn mark_active(&self) {
        let active = self.active();
        let class = self.core.style_text("MENU_ITEM_ACTIVE");
        for (index, item) in self.items.iter().enumerate() {
            if index == active {
                item.element.set_class(class.as_deref());
            } else {
                item.element.set_class(None);
            }
        }
    }
}

impl Component for Panel {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn on_draw(&self, _response: &SyncResponse) {}

    fn apply_style(&self, style: &Style) {
        self.core.set_style(style);
        self.menu.set_class(style.text("NAV_BUTTON_STYLE"));
        self.mark_active();
    }

    /// The menu is fully described by the document and needs no backend data.
    fn sync_with_backend(&self) -> Option<SyncTask> {
        None
    }
}
