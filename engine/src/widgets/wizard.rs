//! `UI_CONCEPT`: a multi-stage wizard.
//!
//! Stages are the components declared inside the wizard, either directly
//! (`<UI_FILE_DIALOG name="src"/>`) or grouped under non-component nodes
//! (`<STAGE_1><UI_TABLE name="preview"/></STAGE_1>`), in document order.
//! Only the current stage is visible.
//!
//! Every stage gets three hooks: `on_open` advances, `on_close` goes back and
//! `on_update` refreshes the title bar from the current stage. Moving is a
//! no-op at either end.
//!
//! The title bar shows the stage title (or `...`), a back control that is
//! visible from the second stage on, and the stage's own navigation controls
//! when it has any (the back control is hidden then). A stage that lends a
//! form element gets it placed in the wizard's form area.

use std::borrow::Cow;
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use crate::component::{Component, ComponentCore, ComponentProps, LifecycleHooks};
use crate::document::{AttrValue, ComponentDescriptor, Style};
use crate::element::Element;
use crate::engine::{Engine, COMPONENT_PREFIX};
use crate::protocol::SyncResponse;

pub const TYPE_KEY: &str = "UI_CONCEPT";

/// Label of the back control.
pub const BACK_LABEL: &str = "Close";

/// Title shown when a stage has none.
pub const UNTITLED: &str = "...";

pub struct Wizard {
    core: ComponentCore,
    stages: Vec<Arc<dyn Component>>,
    pointer: Mutex<usize>,
    control: Element,
    title: Element,
    nav: Element,
    back: Element,
    form_area: Element,
    body: Element,
}

pub fn construct(props: ComponentProps, engine: &Arc<Engine>) -> Arc<dyn Component> {
    Wizard::build(props, engine)
}

/// Flattens the wizard descriptor into component entries in document order.
fn stage_entries(desc: &ComponentDescriptor) -> Vec<(&str, Cow<'_, ComponentDescriptor>)> {
    let mut entries = Vec::new();
    for (key, value) in &desc.attributes {
        if key.starts_with(COMPONENT_PREFIX) {
            let stage = match value {
                AttrValue::Node(node) => Cow::Borrowed(node),
                AttrValue::Text(_) => Cow::Owned(ComponentDescriptor::default()),
            };
            entries.push((key.as_str(), stage));
        } else if let AttrValue::Node(group) = value {
            entries.extend(
                group
                    .entries()
                    .filter(|(tag, _)| tag.starts_with(COMPONENT_PREFIX)),
            );
        }
    }
    entries
}

impl Wizard {
    pub fn build(props: ComponentProps, engine: &Arc<Engine>) -> Arc<Self> {
        let wizard = Arc::new_cyclic(|weak: &Weak<Wizard>| {
            let core = ComponentCore::new(&props, Element::new("div"), engine);
            let control = Element::new("div");
            let title = Element::new("div");
            let nav = Element::new("div");
            let back = Element::new("button");
            let form_area = Element::new("div");
            let body = Element::new("div");

            back.set_text(BACK_LABEL);
            back.set_visible(false);
            let on_back = weak.clone();
            back.on_click(move || {
                if let Some(wizard) = on_back.upgrade() {
                    wizard.prev();
                }
            });
            nav.append_child(&back);
            control.append_child(&title);
            control.append_child(&nav);
            core.element().append_child(&control);
            core.element().append_child(&form_area);
            core.element().append_child(&body);

            let stages: Vec<Arc<dyn Component>> =
                match engine.construct_composite(stage_entries(&props.attributes)) {
                    Ok(constructed) => constructed.into_iter().map(|c| c.component).collect(),
                    Err(e) => {
                        warn!(name = %props.name, error = %e, "Wizard stages were not constructed");
                        Vec::new()
                    }
                };
            for (index, stage) in stages.iter().enumerate() {
                stage.set_hooks(stage_hooks(weak));
                let element = stage.element();
                element.set_visible(index == 0);
                body.append_child(&element);
            }
            debug!(name = %props.name, stages = stages.len(), "Wizard constructed");

            Wizard {
                core,
                stages,
                pointer: Mutex::new(0),
                control,
                title,
                nav,
                back,
                form_area,
                body,
            }
        });
        wizard.apply_style(&props.style);
        if let Some(first) = wizard.stages.first() {
            wizard.present(first.as_ref());
        }
        wizard
    }

    /// Index of the current stage.
    #[must_use]
    pub fn current(&self) -> usize {
        *self.pointer.lock().unwrap()
    }

    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Component>] {
        &self.stages
    }

    /// The back control.
    #[must_use]
    pub fn back_control(&self) -> &Element {
        &self.back
    }

    /// Text of the title bar.
    #[must_use]
    pub fn title_text(&self) -> String {
        self.title.text().unwrap_or_default()
    }

    /// Advances one stage. Returns false at the last stage.
    pub fn next(&self) -> bool {
        self.switch(1)
    }

    /// Goes back one stage. Returns false at the first stage.
    pub fn prev(&self) -> bool {
        self.switch(-1)
    }

    /// Reapplies the title bar and form area from the current stage.
    pub fn update(&self) {
        let pointer = self.pointer.lock().unwrap();
        if let Some(stage) = self.stages.get(*pointer) {
            self.present(stage.as_ref());
        }
    }

    fn switch(&self, step: isize) -> bool {
        let mut pointer = self.pointer.lock().unwrap();
        let from = *pointer;
        let Some(to) = from
            .checked_add_signed(step)
            .filter(|to| *to < self.stages.len())
        else {
            return false;
        };

        self.stages[from].element().set_visible(false);
        let stage = &self.stages[to];
        stage.element().set_visible(true);
        stage.sync_with_backend();
        self.back.set_visible(to > 0);
        self.present(stage.as_ref());
        *pointer = to;
        debug!(name = %self.core.name(), from, to, "Wizard stage switched");
        true
    }

    fn present(&self, stage: &dyn Component) {
        self.title
            .set_text(stage.title().unwrap_or_else(|| UNTITLED.to_string()));

        self.nav.remove_children_after(&self.back);
        if let Some(navigation) = stage.as_navigation() {
            self.back.set_visible(false);
            for control in navigation.navigation() {
                self.nav.append_child(&control);
            }
        }

        if let Some(form) = stage.as_form() {
            self.form_area.replace_children(&form.form());
        }
    }
}

fn stage_hooks(wizard: &Weak<Wizard>) -> LifecycleHooks {
    let open = wizard.clone();
    let close = wizard.clone();
    let update = wizard.clone();
    LifecycleHooks {
        on_open: Some(Arc::new(move || {
            if let Some(wizard) = open.upgrade() {
                wizard.next();
            }
        })),
        on_close: Some(Arc::new(move || {
            if let Some(wizard) = close.upgrade() {
                wizard.prev();
            }
        })),
        on_update: Some(Arc::new(move || {
            if let Some(wizard) = update.upgrade() {
                wizard.update();
            }
        })),
    }
}

impl Component for Wizard {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn on_draw(&self, _response: &SyncResponse) {}

    fn apply_style(&self, style: &Style) {
        self.core.set_style(style);
        self.body.set_class(style.text("BODY_STYLE"));
        self.title.set_class(style.text("TITLE_STYLE"));
        self.control.set_class(style.text("CTL_PANEL_STYLE"));
        self.nav.set_class(style.text("NAV_PANEL_STYLE"));
        self.back.set_class(style.text("NAV_PANEL_BUTTON_STYLE"));
        self.form_area.set_class(style.text("FORM_STYLE"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::testing::ScriptedTransport;

    const DOC: &str = r#"
        <webapp>
          <ui_style name="s">
            <UI_CONCEPT><NAV_PANEL_BUTTON_STYLE>back</NAV_PANEL_BUTTON_STYLE></UI_CONCEPT>
            <UI_BUTTON/>
            <UI_INVITATION/>
          </ui_style>
          <ui_layout name="l">
            <UI_CONCEPT name="w">
              <UI_INVITATION name="hello"><TITLE>Welcome</TITLE><TEXT>Start here</TEXT></UI_INVITATION>
              <STAGE_2><UI_BUTTON name="b"><TITLE>Second</TITLE></UI_BUTTON></STAGE_2>
              <UI_BUTTON_3 name="c"/>
            </UI_CONCEPT>
          </ui_layout>
          <ui_setup><UI_STYLE use="s"/></ui_setup>
        </webapp>
    "#;

    fn wizard() -> (Arc<Engine>, Arc<Wizard>) {
        let engine = Engine::builder(
            Document::parse(DOC).unwrap(),
            Arc::new(ScriptedTransport::new()),
        )
        .build();
        let props = ComponentProps {
            name: "w".to_string(),
            attributes: engine.document().layouts["l"]["UI_CONCEPT"].clone(),
            style: engine.document().styles["s"]["UI_CONCEPT"].clone(),
        };
        let wizard = Wizard::build(props, &engine);
        (engine, wizard)
    }

    fn visible(wizard: &Wizard) -> Vec<bool> {
        wizard.stages().iter().map(|s| s.element().is_visible()).collect()
    }

    #[test]
    fn collects_stages_in_document_order() {
        let (_engine, w) = wizard();

        let names: Vec<&str> = w.stages().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["w/hello", "w/b", "w/c"]);
        assert_eq!(visible(&w), vec![true, false, false]);
        assert_eq!(w.title_text(), "Welcome");
        assert!(!w.back_control().is_visible());
        assert_eq!(w.back_control().class().as_deref(), Some("back"));
    }

    #[test]
    fn moves_within_bounds() {
        let (_engine, w) = wizard();

        assert!(!w.prev());
        assert_eq!(w.current(), 0);

        assert!(w.next());
        assert_eq!(w.current(), 1);
        assert_eq!(visible(&w), vec![false, true, false]);
        assert!(w.back_control().is_visible());
        assert_eq!(w.title_text(), "Second");

        assert!(w.next());
        assert!(!w.next());
        assert_eq!(w.current(), 2);
        assert_eq!(w.title_text(), UNTITLED);

        assert!(w.prev());
        assert!(w.prev());
        assert_eq!(w.current(), 0);
        assert!(!w.back_control().is_visible());
    }

    #[test]
    fn stage_hooks_drive_navigation() {
        let (_engine, w) = wizard();

        assert!(w.stages()[0].core().fire_open());
        assert_eq!(w.current(), 1);

        assert!(w.back_control().click());
        assert_eq!(w.current(), 0);

        w.stages()[0].core().fire_close();
        assert_eq!(w.current(), 0);
    }

    #[test]
    fn empty_wizard_stays_put() {
        let engine = Engine::builder(
            Document::parse(DOC).unwrap(),
            Arc::new(ScriptedTransport::new()),
        )
        .build();
        let props = ComponentProps {
            name: "empty".to_string(),
            attributes: ComponentDescriptor::named("empty"),
            style: Style::default(),
        };
        let w = Wizard::build(props, &engine);

        assert!(!w.next());
        assert!(!w.prev());
        w.update();
        assert_eq!(w.current(), 0);
    }
}
