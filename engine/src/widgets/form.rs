//! `UI_FORM`: a filter form that submits through another component.

use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use crate::component::{Component, ComponentCore, ComponentProps, RequestTargetSlot};
use crate::document::Style;
use crate::element::Element;
use crate::engine::Engine;
use crate::protocol::SyncResponse;
use crate::sync::SyncTask;

pub const TYPE_KEY: &str = "UI_FORM";

/// Label of the submit button.
pub const SUBMIT_LABEL: &str = "Search";

/// Separator between field argument fragments in `where`.
pub const ARGS_SEPARATOR: &str = "&&";

pub struct Form {
    core: ComponentCore,
    fields: Vec<Arc<dyn Component>>,
    submit: Element,
    target: Mutex<Option<Weak<dyn Component>>>,
}

pub fn construct(props: ComponentProps, engine: &Arc<Engine>) -> Arc<dyn Component> {
    Form::build(props, engine)
}

impl Form {
    /// Builds the form and its fields.
    pub fn build(props: ComponentProps, engine: &Arc<Engine>) -> Arc<Self> {
        let form = Arc::new_cyclic(|weak: &Weak<Form>| {
            let core = ComponentCore::new(&props, Element::new("form"), engine);
            let fields: Vec<Arc<dyn Component>> =
                match engine.construct_composite(props.attributes.entries()) {
                    Ok(constructed) => constructed.into_iter().map(|c| c.component).collect(),
                    Err(e) => {
                        warn!(name = %props.name, error = %e, "Form fields were not constructed");
                        Vec::new()
                    }
                };
            for field in &fields {
                core.element().append_child(&field.element());
            }

            let submit = Element::new("button");
            submit.set_text(SUBMIT_LABEL);
            let weak = weak.clone();
            submit.on_click(move || {
                if let Some(form) = weak.upgrade() {
                    form.submit();
                }
            });
            core.element().append_child(&submit);

            Form {
                core,
                fields,
                submit,
                target: Mutex::new(None),
            }
        });
        form.apply_style(&props.style);
        form
    }

    /// Joins the fields' request arguments.
    #[must_use]
    pub fn request_args(&self) -> String {
        self.fields
            .iter()
            .filter_map(|field| field.as_form_field().and_then(|f| f.request_args()))
            .collect::<Vec<_>>()
            .join(ARGS_SEPARATOR)
    }

    /// Sends `select` with the joined field arguments through the request
    /// target. Does nothing without a live target.
    pub fn submit(&self) -> Option<SyncTask> {
        let target = self.target.lock().unwrap().as_ref().and_then(Weak::upgrade);
        let Some(target) = target else {
            debug!(name = %self.core.name(), "Form has no request target");
            return None;
        };

        let args = self.request_args();
        match target.send_action("select", &[("where", &args)]) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(name = %self.core.name(), error = %e, "Failed to submit form");
                None
            }
        }
    }
}

impl Component for Form {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn on_draw(&self, _response: &SyncResponse) {}

    fn apply_style(&self, style: &Style) {
        self.core.set_style(style);
        self.submit.set_class(style.text("SUBMIT_STYLE"));
    }

    /// A form has no backend state of its own; only its fields sync.
    fn sync_with_backend(&self) -> Option<SyncTask> {
        for field in &self.fields {
            field.sync_with_backend();
        }
        None
    }

    fn as_request_target_slot(&self) -> Option<&dyn RequestTargetSlot> {
        Some(self)
    }
}

impl RequestTargetSlot for Form {
    fn set_request_target(&self, target: Weak<dyn Component>) {
        *self.target.lock().unwrap() = Some(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ComponentDescriptor, Document};
    use crate::testing::ScriptedTransport;

    const DOC: &str = r#"
        <webapp>
          <ui_style name="s">
            <UI_FORM><SUBMIT_STYLE>go</SUBMIT_STYLE></UI_FORM>
            <UI_DATE_RANGE/>
            <UI_BUTTON/>
          </ui_style>
          <ui_layout name="l">
            <UI_FORM name="filter">
              <UI_DATE_RANGE name="period"/>
              <UI_BUTTON name="hint"/>
            </UI_FORM>
          </ui_layout>
          <ui_setup><UI_STYLE use="s"/></ui_setup>
        </webapp>
    "#;

    fn form(transport: Arc<ScriptedTransport>) -> (Arc<Engine>, Arc<Form>) {
        let engine = Engine::builder(Document::parse(DOC).unwrap(), transport).build();
        let props = ComponentProps {
            name: "filter".to_string(),
            attributes: engine.document().layouts["l"]["UI_FORM"].clone(),
            style: engine.document().styles["s"]["UI_FORM"].clone(),
        };
        let form = Form::build(props, &engine);
        (engine, form)
    }

    fn set_period(engine: &Engine, from: &str, to: &str) {
        let range = engine.registry().instance("filter/period").unwrap();
        let inputs = range.element().find_by_tag("input");
        inputs[0].set_attr("value", from);
        inputs[1].set_attr("value", to);
    }

    #[test]
    fn builds_fields_and_submit_button() {
        let (_engine, form) = form(Arc::new(ScriptedTransport::new()));

        let children = form.element().children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[2].text().as_deref(), Some(SUBMIT_LABEL));
        assert_eq!(children[2].class().as_deref(), Some("go"));
        assert!(form.as_request_target_slot().is_some());
    }

    #[test]
    fn submit_without_target_does_nothing() {
        let (_engine, form) = form(Arc::new(ScriptedTransport::new()));
        assert!(form.submit().is_none());
    }

    #[test]
    fn fields_without_value_are_skipped() {
        let (engine, form) = form(Arc::new(ScriptedTransport::new()));
        assert_eq!(form.request_args(), "");

        set_period(&engine, "2024-01-01 00:00:00", "2024-01-02 00:00:00");
        assert_eq!(
            form.request_args(),
            "from_dt=1704067200000&&to_dt=1704153600000"
        );
    }

    #[tokio::test]
    async fn submit_click_sends_select_through_target() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("orders", "{}");
        let (engine, form) = form(transport.clone());
        let target = engine
            .construct_component("UI_BUTTON", &ComponentDescriptor::named("orders"))
            .unwrap();
        form.set_request_target(Arc::downgrade(&target));
        set_period(&engine, "2024-01-01 00:00:00", "2024-01-02 00:00:00");

        assert!(form.submit.click());
        tokio::task::yield_now().await;
        form.submit().unwrap().settled().await;

        let expected = "webui/orders?action=select&where=from_dt%3D1704067200000%26%26to_dt%3D1704153600000";
        let requests = transport.requests_for("orders");
        assert!(!requests.is_empty());
        assert!(requests.iter().all(|r| r == expected));
    }
}
