//! `UI_FILE_DIALOG`: browse the backend's file tree and pick a file.
//!
//! The backend answers with the current directory and its entries:
//!
//! ```json
//! {"cur_dir": "data/in", "files": {"..": {"is_directory": true},
//!   "a.csv": {"is_directory": false, "size": 2048}}}
//! ```
//!
//! Rows are listed as `..` first, then directories, then files. Clicking a
//! directory sends `goto`; clicking a file selects it and fires `on_update`
//! so a wizard can refresh its title. The confirm control sends `open` for
//! the selection and fires `on_open`; cancel fires `on_close`.

use std::sync::{Arc, Mutex, Weak};

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::component::{Component, ComponentCore, ComponentProps, HasNavigation};
use crate::document::Style;
use crate::element::Element;
use crate::engine::Engine;
use crate::protocol::SyncResponse;
use crate::sync::SyncTask;

pub const TYPE_KEY: &str = "UI_FILE_DIALOG";

/// Name of the parent directory entry.
pub const PARENT_DIR: &str = "..";

const CONFIRM_LABEL: &str = "Open";
const CANCEL_LABEL: &str = "Cancel";

#[derive(Debug, Clone, Default, Deserialize)]
struct FileAttrs {
    #[serde(default)]
    is_directory: bool,
    #[serde(default)]
    size: u64,
}

/// The file chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: String,
    pub name: String,
}

impl SelectedFile {
    /// Path sent with `open`.
    #[must_use]
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.path, self.name)
    }
}

#[derive(Default)]
struct Listing {
    cur_dir: String,
    selected: Option<SelectedFile>,
}

pub struct FileDialog {
    core: ComponentCore,
    path_panel: Element,
    files: Element,
    confirm: Element,
    cancel: Element,
    listing: Mutex<Listing>,
    weak: Weak<FileDialog>,
}

pub fn construct(props: ComponentProps, engine: &Arc<Engine>) -> Arc<dyn Component> {
    FileDialog::build(props, engine)
}

/// Formats a byte count with three decimals in the largest unit that is at
/// least 1.
#[must_use]
pub fn human_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    let gb = mb / 1024.0;
    if gb >= 1.0 {
        format!("{gb:.3} GB")
    } else if mb >= 1.0 {
        format!("{mb:.3} MB")
    } else if kb >= 1.0 {
        format!("{kb:.3} KB")
    } else {
        format!("{bytes} bytes")
    }
}

impl FileDialog {
    pub fn build(props: ComponentProps, engine: &Arc<Engine>) -> Arc<Self> {
        let dialog = Arc::new_cyclic(|weak: &Weak<FileDialog>| {
            let core = ComponentCore::new(&props, Element::new("div"), engine);
            let path_panel = Element::new("ol");
            let files = Element::new("table");
            let confirm = Element::new("button");
            let cancel = Element::new("button");
            confirm.set_text(CONFIRM_LABEL);
            cancel.set_text(CANCEL_LABEL);

            let on_confirm = weak.clone();
            confirm.on_click(move || {
                if let Some(dialog) = on_confirm.upgrade() {
                    dialog.confirm();
                }
            });
            let on_cancel = weak.clone();
            cancel.on_click(move || {
                if let Some(dialog) = on_cancel.upgrade() {
                    dialog.cancel();
                }
            });

            core.element().append_child(&path_panel);
            core.element().append_child(&files);

            FileDialog {
                core,
                path_panel,
                files,
                confirm,
                cancel,
                listing: Mutex::new(Listing::default()),
                weak: weak.clone(),
            }
        });
        dialog.apply_style(&props.style);
        dialog
    }

    /// Directory of the last drawn listing, relative to the backend root.
    #[must_use]
    pub fn current_dir(&self) -> String {
        self.listing.lock().unwrap().cur_dir.clone()
    }

    /// Currently selected file.
    #[must_use]
    pub fn selected(&self) -> Option<SelectedFile> {
        self.listing.lock().unwrap().selected.clone()
    }

    /// Asks the backend to change into directory `name`.
    pub fn open_dir(&self, name: &str) -> Option<SyncTask> {
        match self.send_action("goto", &[("file", name)]) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(name = %self.core.name(), error = %e, "Failed to change directory");
                None
            }
        }
    }

    /// Selects file `name` in the current directory and fires `on_update`.
    pub fn select_file(&self, name: &str) {
        {
            let mut listing = self.listing.lock().unwrap();
            let path = listing.cur_dir.clone();
            listing.selected = Some(SelectedFile {
                path,
                name: name.to_string(),
            });
        }
        self.core.fire_update();
    }

    /// Sends `open` for the selection, then fires `on_open`.
    ///
    /// Nothing happens without a selection or without an `on_open` hook.
    pub fn confirm(&self) -> Option<SyncTask> {
        if !self.core.has_open_hook() {
            return None;
        }
        let selected = self.selected()?;
        let task = match self.send_action("open", &[("file", &selected.full_path())]) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(name = %self.core.name(), error = %e, "Failed to open file");
                None
            }
        };
        self.core.fire_open();
        task
    }

    /// Fires `on_close`.
    pub fn cancel(&self) {
        self.core.fire_close();
    }

    fn add_row(&self, name: &str, size: Option<u64>, class: Option<&str>) -> Element {
        let row = Element::new("tr");
        row.set_class(class);
        let name_cell = Element::new("td");
        name_cell.set_text(name);
        let size_cell = Element::new("td");
        size_cell.set_text(size.filter(|s| *s > 0).map_or_else(|| "---".to_string(), human_size));
        row.append_child(&name_cell);
        row.append_child(&size_cell);
        self.files.append_child(&row);
        row
    }

    fn draw_listing(&self, cur_dir: &str, files: &serde_json::Map<String, Value>) {
        let mut parent = Vec::new();
        let mut dirs = Vec::new();
        let mut regular = Vec::new();
        for (name, attrs) in files {
            let attrs: FileAttrs = serde_json::from_value(attrs.clone()).unwrap_or_default();
            if !attrs.is_directory {
                regular.push((name.clone(), attrs.size));
            } else if name == PARENT_DIR {
                parent.push(name.clone());
            } else {
                dirs.push(name.clone());
            }
        }

        self.files.clear();
        let dir_class = self.core.style_text("STYLE_OF_DIR");
        for dir in parent.into_iter().chain(dirs) {
            let row = self.add_row(&dir, None, dir_class.as_deref());
            let weak = self.weak.clone();
            row.on_click(move || {
                if let Some(dialog) = weak.upgrade() {
                    dialog.open_dir(&dir);
                }
            });
        }
        for (file, size) in regular {
            let row = self.add_row(&file, Some(size), None);
            let weak = self.weak.clone();
            row.on_click(move || {
                if let Some(dialog) = weak.upgrade() {
                    dialog.select_file(&file);
                }
            });
        }

        self.path_panel.clear();
        if !cur_dir.is_empty() {
            for part in cur_dir.split('/') {
                let crumb = Element::new("li");
                crumb.set_text(part);
                self.path_panel.append_child(&crumb);
            }
        }
    }
}

impl Component for FileDialog {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn on_draw(&self, response: &SyncResponse) {
        let cur_dir = response.str_field("cur_dir").unwrap_or_default().to_string();
        {
            let mut listing = self.listing.lock().unwrap();
            listing.cur_dir = cur_dir.clone();
            listing.selected = None;
        }
        let empty = serde_json::Map::new();
        let files = response
            .body
            .get("files")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        self.draw_listing(&cur_dir, files);
    }

    fn title(&self) -> Option<String> {
        let title = self.core.attributes().text("TITLE").map(str::to_string);
        match self.selected() {
            Some(selected) => Some(format!("{}: {}", title.unwrap_or_default(), selected.name)),
            None => title,
        }
    }

    fn apply_style(&self, style: &Style) {
        self.core.store_style(style);
        self.path_panel.set_class(style.text("PATH_STYLE"));
        self.files.set_class(style.text("BASE_STYLE"));
        self.confirm.set_class(style.text("NAV_BUTTON_STYLE"));
        self.cancel.set_class(style.text("NAV_BUTTON_STYLE"));
    }

    fn as_navigation(&self) -> Option<&dyn HasNavigation> {
        Some(self)
    }
}

impl HasNavigation for FileDialog {
    fn navigation(&self) -> Vec<Element> {
        vec![self.confirm.clone(), self.cancel.clone()]
    }
}
