//! `UI_TABLE`: a data table with an optional filter panel.
//!
//! Any `UI_*` entries declared inside the table (normally a `UI_FORM`) are
//! constructed into the head panel and send their requests through the
//! table, so a submitted filter redraws the table body.
//!
//! Responses carry `meta` (column descriptions with a `name`) and `data`
//! (rows; each row's cells in key order). Either may be absent, in which case
//! that part of the table is left as it is.

use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::warn;

use super::{members, value_text};
use crate::component::{Component, ComponentCore, ComponentProps, HasForm};
use crate::document::Style;
use crate::element::Element;
use crate::engine::Engine;
use crate::protocol::SyncResponse;
use crate::sync::SyncTask;

pub const TYPE_KEY: &str = "UI_TABLE";

pub struct Table {
    core: ComponentCore,
    panel_head: Element,
    panel_body: Element,
    table: Element,
    head: Element,
    body: Element,
    forms: Vec<Arc<dyn Component>>,
}

pub fn construct(props: ComponentProps, engine: &Arc<Engine>) -> Arc<dyn Component> {
    let table = Arc::new_cyclic(|weak: &Weak<Table>| {
        let core = ComponentCore::new(&props, Element::new("div"), engine);
        let panel_head = Element::new("div");
        let panel_body = Element::new("div");
        let table = Element::new("table");
        let head = Element::new("thead");
        let body = Element::new("tbody");
        table.append_child(&head);
        table.append_child(&body);

        let target: Weak<dyn Component> = weak.clone();
        let forms: Vec<Arc<dyn Component>> =
            match engine.construct_composite(props.attributes.entries()) {
                Ok(constructed) => constructed.into_iter().map(|c| c.component).collect(),
                Err(e) => {
                    warn!(name = %props.name, error = %e, "Table forms were not constructed");
                    Vec::new()
                }
            };
        for form in &forms {
            if let Some(slot) = form.as_request_target_slot() {
                slot.set_request_target(target.clone());
            }
            panel_head.append_child(&form.element());
        }

        panel_body.append_child(&table);
        core.element().append_child(&panel_head);
        core.element().append_child(&panel_body);

        Table {
            core,
            panel_head,
            panel_body,
            table,
            head,
            body,
            forms,
        }
    });
    table.apply_style(&props.style);
    table
}

impl Table {
    /// Forms hosted in the head panel.
    #[must_use]
    pub fn forms(&self) -> &[Arc<dyn Component>] {
        &self.forms
    }

    fn update_header(&self, meta: &Value) {
        let row = Element::new("tr");
        for column in members(meta) {
            let cell = Element::new("th");
            cell.set_text(column.get("name").map(value_text).unwrap_or_default());
            row.append_child(&cell);
        }
        self.head.replace_children(&row);
    }

    fn update_body(&self, data: &Value) {
        self.body.clear();
        for record in members(data) {
            let row = Element::new("tr");
            for value in members(record) {
                let cell = Element::new("td");
                cell.set_text(value_text(value));
                row.append_child(&cell);
            }
            self.body.append_child(&row);
        }
    }
}

impl Component for Table {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn on_draw(&self, response: &SyncResponse) {
        if let Some(meta) = response.body.get("meta") {
            self.update_header(meta);
        }
        if let Some(data) = response.body.get("data") {
            self.update_body(data);
        }
    }

    fn apply_style(&self, style: &Style) {
        self.core.store_style(style);
        self.table.set_class(style.text("BASE_STYLE"));
        self.panel_head.set_class(style.text("PANEL_HEAD_STYLE"));
        self.panel_body.set_class(style.text("PANEL_BODY_STYLE"));
        self.core.element().set_class(style.text("PANEL_STYLE"));
    }

    fn sync_with_backend(&self) -> Option<SyncTask> {
        let task = self.core.sync().send_action(crate::sync::SYNC_ACTION, &[]);
        for form in &self.forms {
            form.sync_with_backend();
        }
        match task {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(name = %self.core.name(), error = %e, "Failed to start sync");
                None
            }
        }
    }

    fn as_form(&self) -> Option<&dyn HasForm> {
        Some(self)
    }
}

impl HasForm for Table {
    /// Lends the head panel to a parent; the panel classes are dropped so
    /// the parent's styling applies.
    fn form(&self) -> Element {
        self.panel_head.set_class(None);
        self.panel_body.set_class(None);
        self.core.element().set_class(None);
        self.panel_head.clone()
    }
}
