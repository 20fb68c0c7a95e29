//! `UI_BUTTON`: a button whose label comes from the backend.

use std::sync::Arc;

use crate::component::{Component, ComponentCore, ComponentProps};
use crate::element::Element;
use crate::engine::Engine;
use crate::protocol::SyncResponse;

pub const TYPE_KEY: &str = "UI_BUTTON";

pub struct Button {
    core: ComponentCore,
}

pub fn construct(props: ComponentProps, engine: &Arc<Engine>) -> Arc<dyn Component> {
    let core = ComponentCore::new(&props, Element::new("button"), engine);
    Arc::new(Button { core })
}

impl Component for Button {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn on_draw(&self, response: &SyncResponse) {
        if let Some(label) = response.str_field("label") {
            self.core.element().set_text(label);
        }
    }
}
