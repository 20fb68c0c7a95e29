//! Directory browser confined to a root directory.
//!
//! Publishes `cur_dir` (relative to the root, `""` at the root), `error` and
//! `files`, a map from entry name to `{is_directory, is_regular, size?}`.
//! Directories are always listed; files only when their name matches the
//! mask in full. `..` leads upward unless the dialog is at its root.
//!
//! | Action | Parameter | Effect |
//! |--------|-----------|--------|
//! | `goto` | `file` | enter a subdirectory, or `..` |
//! | `open` | `file` | pass `<root>/<file>` to the open handler |
//!
//! While the open handler reports `in work`, later `sync` requests re-run
//! `open` without a `file` parameter; the dialog keeps the file it is
//! opening until the handler finishes or fails.

use std::fs;
use std::mem;
use std::path::{Component as PathComponent, Path, PathBuf};

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::com::{Com, Input, Output, Process, ProcessStatus};

/// Called with the absolute path of the file to open.
pub type OpenHandler = Box<dyn FnMut(&Path) -> Process + Send>;

/// Backend of `UI_FILE_DIALOG`.
pub struct FileDialog {
    root: PathBuf,
    cur_dir: PathBuf,
    mask: Option<Regex>,
    open_handler: Option<OpenHandler>,
    opening_file: String,
    error_log: String,
}

impl FileDialog {
    pub const GOTO: &'static str = "goto";
    pub const OPEN: &'static str = "open";

    /// A dialog listing every file under `root`, without an open handler.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            cur_dir: root.clone(),
            root,
            mask: None,
            open_handler: None,
            opening_file: String::new(),
            error_log: String::new(),
        }
    }

    /// Lists only files whose whole name matches `mask`.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `mask` does not compile.
    pub fn with_mask(mut self, mask: &str) -> Result<Self, regex::Error> {
        self.mask = Some(Regex::new(&format!("^(?:{mask})$"))?);
        Ok(self)
    }

    #[must_use]
    pub fn on_open(mut self, handler: impl FnMut(&Path) -> Process + Send + 'static) -> Self {
        self.open_handler = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn cur_dir(&self) -> &Path {
        &self.cur_dir
    }

    /// Current directory relative to the root, `/`-separated.
    #[must_use]
    pub fn relative_cur_dir(&self) -> String {
        self.cur_dir
            .strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }

    /// Changes into subdirectory `name`, or up for `..`.
    pub fn goto(&mut self, name: &str) -> Process {
        if name.is_empty() {
            return Process::error("no directory name given");
        }

        if name == ".." {
            if self.cur_dir != self.root {
                self.cur_dir.pop();
            }
            return Process::default();
        }

        if !is_plain_name(name) {
            return Process::error(format!("invalid directory name '{name}'"));
        }
        let target = self.cur_dir.join(name);
        if !target.is_dir() {
            return Process::error(format!("'{name}' is not a directory"));
        }

        debug!(dir = %target.display(), "Entering directory");
        self.cur_dir = target;
        Process::default()
    }

    /// Opens `name` (relative to the root), or keeps opening the previous
    /// file when `name` is empty.
    pub fn open(&mut self, name: &str) -> Process {
        if !name.is_empty() {
            self.opening_file = name.to_string();
        }
        if self.opening_file.is_empty() {
            self.log_error("no file name given");
            return Process::default();
        }

        let Some(path) = self.resolve(&self.opening_file) else {
            let message = format!("invalid file path '{}'", self.opening_file);
            self.log_error(&message);
            self.opening_file.clear();
            return Process::error(message);
        };

        let result = match self.open_handler.as_mut() {
            Some(handler) => handler(&path),
            None => Process::error("no open handler"),
        };

        match result.status {
            ProcessStatus::InWork => {}
            ProcessStatus::Error => {
                warn!(path = %path.display(), message = %result.message, "Failed to open file");
                self.log_error(&format!(
                    "cannot open file {}: {}",
                    path.display(),
                    result.message
                ));
                self.opening_file.clear();
            }
            ProcessStatus::Finished => self.opening_file.clear(),
        }
        result
    }

    /// Joins a root-relative path onto the root. `None` if it would leave
    /// the root or names no file.
    fn resolve(&self, file: &str) -> Option<PathBuf> {
        let relative = Path::new(file.trim_start_matches('/'));
        let mut components = relative.components().peekable();
        components.peek()?;
        if !components.all(|c| matches!(c, PathComponent::Normal(_))) {
            return None;
        }
        let path = self.root.join(relative);
        path.is_file().then_some(path)
    }

    fn log_error(&mut self, message: &str) {
        if !self.error_log.is_empty() {
            self.error_log.push_str("; ");
        }
        self.error_log.push_str(message);
    }

    fn matches_mask(&self, name: &str) -> bool {
        self.mask.as_ref().map_or(true, |mask| mask.is_match(name))
    }

    /// Entries of the current directory, sorted by name.
    fn list(&self) -> std::io::Result<Vec<(String, Value)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.cur_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(meta) = fs::metadata(entry.path()) else {
                debug!(name = %name, "Skipping unreadable entry");
                continue;
            };
            if meta.is_dir() {
                entries.push((name, json!({"is_directory": true, "is_regular": false})));
            } else if self.matches_mask(&name) {
                entries.push((
                    name,
                    json!({"is_directory": false, "is_regular": meta.is_file(), "size": meta.len()}),
                ));
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(PathComponent::Normal(_)), None)
    )
}

impl Com for FileDialog {
    fn com_type(&self) -> &'static str {
        "file_dialog"
    }

    fn actions(&self) -> &[&'static str] {
        &[Self::GOTO, Self::OPEN]
    }

    fn run_action(&mut self, action: &str, input: &Input) -> Process {
        match action {
            Self::GOTO => self.goto(input.get("file")),
            Self::OPEN => self.open(input.get("file")),
            _ => Process::default(),
        }
    }

    fn publish_attributes(&mut self, out: &mut Output) {
        let mut files = Output::new();
        if self.cur_dir != self.root {
            files.insert(
                "..".into(),
                json!({"is_directory": true, "is_regular": false}),
            );
        }
        match self.list() {
            Ok(entries) => files.extend(entries),
            Err(e) => {
                let message = format!("cannot read {}: {e}", self.cur_dir.display());
                self.log_error(&message);
            }
        }

        out.insert("cur_dir".into(), self.relative_cur_dir().into());
        out.insert("error".into(), mem::take(&mut self.error_log).into());
        out.insert("files".into(), Value::Object(files));
    }
}
