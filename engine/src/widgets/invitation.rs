//! `UI_INVITATION`: a static message that opens the next wizard stage when
//! clicked. The message is every text attribute except the title, in
//! document order.

use std::sync::{Arc, Weak};

use crate::component::{Component, ComponentCore, ComponentProps, TITLE};
use crate::document::AttrValue;
use crate::element::Element;
use crate::engine::Engine;
use crate::protocol::SyncResponse;
use crate::sync::SyncTask;

pub const TYPE_KEY: &str = "UI_INVITATION";

pub struct Invitation {
    core: ComponentCore,
}

pub fn construct(props: ComponentProps, engine: &Arc<Engine>) -> Arc<dyn Component> {
    Arc::new_cyclic(|weak: &Weak<Invitation>| {
        let core = ComponentCore::new(&props, Element::new("div"), engine);
        let message: String = props
            .attributes
            .attributes
            .iter()
            .filter(|(key, _)| key.as_str() != TITLE)
            .filter_map(|(_, value)| match value {
                AttrValue::Text(text) => Some(text.as_str()),
                AttrValue::Node(_) => None,
            })
            .collect();
        core.element().set_text(message);

        let weak = weak.clone();
        core.element().on_click(move || {
            if let Some(invitation) = weak.upgrade() {
                invitation.activate();
            }
        });
        Invitation { core }
    })
}

impl Invitation {
    /// Fires `on_open`.
    pub fn activate(&self) {
        self.core.fire_open();
    }
}

impl Component for Invitation {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn on_draw(&self, _response: &SyncResponse) {}

    fn sync_with_backend(&self) -> Option<SyncTask> {
        None
    }
}
