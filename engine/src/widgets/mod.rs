//! Built-in widgets.
//!
//! | Type key | Widget |
//! |----------|--------|
//! | `UI_BUTTON` | [`button::Button`] |
//! | `UI_TABLE` | [`table::Table`] |
//! | `UI_FORM` | [`form::Form`] |
//! | `UI_DATE_RANGE` | [`date_range::DateRange`] |
//! | `UI_FILE_DIALOG` | [`file_dialog::FileDialog`] |
//! | `UI_CONCEPT` | [`wizard::Wizard`] |
//! | `UI_PANEL` | [`panel::Panel`] |
//! | `UI_INVITATION` | [`invitation::Invitation`] |

pub mod button;
pub mod date_range;
pub mod file_dialog;
pub mod form;
pub mod invitation;
pub mod panel;
pub mod table;
pub mod wizard;

use serde_json::Value;

use crate::registry::ComponentRegistry;

/// Registers every built-in widget.
pub fn register_builtin(registry: &ComponentRegistry) {
    registry.register(button::TYPE_KEY, button::construct);
    registry.register(table::TYPE_KEY, table::construct);
    registry.register(form::TYPE_KEY, form::construct);
    registry.register(date_range::TYPE_KEY, date_range::construct);
    registry.register(file_dialog::TYPE_KEY, file_dialog::construct);
    registry.register(wizard::TYPE_KEY, wizard::construct);
    registry.register(panel::TYPE_KEY, panel::construct);
    registry.register(invitation::TYPE_KEY, invitation::construct);
}

/// Display text of a JSON value: strings unquoted, everything else as JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Iterates the members of a JSON array or object in order.
pub(crate) fn members(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(map) => Box::new(map.values()),
        _ => Box::new(std::iter::empty()),
    }
}
