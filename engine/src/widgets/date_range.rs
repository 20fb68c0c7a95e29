//! `UI_DATE_RANGE`: a from/to timestamp pair used as a form field.
//!
//! Input values are `YYYY-MM-DD HH:MM:SS` in UTC and are sent as epoch
//! milliseconds: `from_dt=<ms>&&to_dt=<ms>`.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::component::{Component, ComponentCore, ComponentProps, FormField};
use crate::document::Style;
use crate::element::Element;
use crate::engine::Engine;
use crate::protocol::SyncResponse;
use crate::sync::SyncTask;

pub const TYPE_KEY: &str = "UI_DATE_RANGE";

/// Input format of both ends of the range.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct DateRange {
    core: ComponentCore,
    from: Element,
    to: Element,
    cells: Vec<Element>,
    labels: Vec<Element>,
}

pub fn construct(props: ComponentProps, engine: &Arc<Engine>) -> Arc<dyn Component> {
    let core = ComponentCore::new(&props, Element::new("div"), engine);
    let id_base = props.name.replace('/', "-");

    let mut cells = Vec::new();
    let mut labels = Vec::new();
    let mut add_picker = |suffix: &str, label: Option<&str>| {
        let input = Element::new("input");
        input.set_attr("type", "text");
        input.set_attr("id", format!("{id_base}_{suffix}"));
        input.set_attr("format", "YYYY-MM-DD HH:mm:ss");
        let cell = Element::new("div");
        cell.append_child(&input);
        if let Some(label) = label {
            let label_cell = Element::new("div");
            label_cell.set_text(label);
            core.element().append_child(&label_cell);
            labels.push(label_cell);
        }
        core.element().append_child(&cell);
        cells.push(cell);
        input
    };
    let from = add_picker("from", props.attributes.text("LABEL_FROM"));
    let to = add_picker("to", props.attributes.text("LABEL_TO"));

    let range = Arc::new(DateRange {
        core,
        from,
        to,
        cells,
        labels,
    });
    range.apply_style(&props.style);
    range
}

/// Parses an input value to epoch milliseconds.
fn to_epoch_millis(value: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}

impl Component for DateRange {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn on_draw(&self, _response: &SyncResponse) {}

    fn apply_style(&self, style: &Style) {
        self.core.set_style(style);
        self.from.set_class(style.text("INPUT_STYLE"));
        self.to.set_class(style.text("INPUT_STYLE"));
        for cell in &self.cells {
            cell.set_class(style.text("INPUT_CELL_STYLE"));
        }
        for label in &self.labels {
            label.set_class(style.text("LABEL_CELL_STYLE"));
        }
    }

    /// The range is edited locally and never polls the backend.
    fn sync_with_backend(&self) -> Option<SyncTask> {
        None
    }

    fn as_form_field(&self) -> Option<&dyn FormField> {
        Some(self)
    }
}

impl FormField for DateRange {
    fn request_args(&self) -> Option<String> {
        let from = to_epoch_millis(&self.from.attr("value")?)?;
        let to = to_epoch_millis(&self.to.attr("value")?)?;
        Some(format!("from_dt={from}&&to_dt={to}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AttrValue, ComponentDescriptor, Document};
    use crate::testing::ScriptedTransport;

    fn engine() -> Arc<Engine> {
        let doc = Document::parse(
            r#"<webapp><ui_style name="s"><UI_DATE_RANGE>
                 <INPUT_STYLE>in</INPUT_STYLE><LABEL_CELL_STYLE>lbl</LABEL_CELL_STYLE>
               </UI_DATE_RANGE></ui_style>
               <ui_setup><UI_STYLE use="s"/></ui_setup></webapp>"#,
        )
        .unwrap();
        Engine::builder(doc, Arc::new(ScriptedTransport::new())).build()
    }

    #[test]
    fn parses_epoch_millis() {
        assert_eq!(to_epoch_millis("1970-01-01 00:00:01"), Some(1000));
        assert_eq!(to_epoch_millis("2024-01-01 00:00:00"), Some(1_704_067_200_000));
        assert_eq!(to_epoch_millis("yesterday"), None);
        assert_eq!(to_epoch_millis(""), None);
    }

    #[test]
    fn builds_labelled_inputs() {
        let engine = engine();
        let mut desc = ComponentDescriptor::named("orders/filter/period");
        desc.insert("LABEL_FROM", AttrValue::Text("From".to_string()));
        desc.insert("LABEL_TO", AttrValue::Text("To".to_string()));

        let range = engine.construct_component(TYPE_KEY, &desc).unwrap();

        let inputs = range.element().find_by_tag("input");
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].attr("id").as_deref(), Some("orders-filter-period_from"));
        assert_eq!(inputs[1].attr("id").as_deref(), Some("orders-filter-period_to"));
        assert_eq!(inputs[0].class().as_deref(), Some("in"));
        assert_eq!(range.element().text_content(), "From To");
        assert!(range.sync_with_backend().is_none());
    }

    #[test]
    fn request_args_need_both_ends() {
        let engine = engine();
        let range = engine
            .construct_component(TYPE_KEY, &ComponentDescriptor::named("period"))
            .unwrap();
        let field = range.as_form_field().unwrap();
        assert!(field.request_args().is_none());

        let inputs = range.element().find_by_tag("input");
        inputs[0].set_attr("value", "1970-01-01 00:00:01");
        assert!(field.request_args().is_none());

        inputs[1].set_attr("value", "1970-01-01 00:00:02");
        assert_eq!(field.request_args().as_deref(), Some("from_dt=1000&&to_dt=2000"));
    }
}
