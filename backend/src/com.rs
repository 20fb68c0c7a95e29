//! Component tree answering `webui/<path>` requests.
//!
//! Every UI component on the engine side has a backend counterpart
//! implementing [`Com`]. A [`ComNode`] wraps it with the state of the last
//! long-running process it started; [`Group`]s nest nodes so that a request
//! for `reports/daily` reaches the `daily` node inside the `reports` group;
//! the [`Manager`] is the root group.
//!
//! # Request handling
//!
//! | `action` | Outcome |
//! |----------|---------|
//! | absent | publish only |
//! | one of [`Com::actions`] | run it, remember it and its process |
//! | anything else while a process is in work | re-run the remembered action |
//! | `sync` | publish only |
//! | anything else | rejected |
//!
//! # Publishing
//!
//! The response carries `type`, `name` and the com's own attributes. A
//! process that needs to notify adds a `notification` object once; while it
//! is in work the com's attributes are left out.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ServerError;

/// Query parameter carrying the action name.
pub const ACTION_PARAM: &str = "action";

/// Action answered with a plain publish when nothing else handles it.
pub const SYNC_ACTION: &str = "sync";

/// Progress value meaning "unknown".
pub const UNKNOWN_PROGRESS: i64 = -1;

/// JSON object a com publishes into.
pub type Output = Map<String, Value>;

/// Request parameters.
#[derive(Debug, Clone, Default)]
pub struct Input {
    params: HashMap<String, String>,
}

impl Input {
    #[must_use]
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Returns true if the parameter is present and non-empty.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.params.get(name).is_some_and(|v| !v.is_empty())
    }

    /// Returns the parameter, or an empty string.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.param(name).unwrap_or("")
    }

    /// Returns the parameter if it was sent at all, even empty.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The requested action, or an empty string.
    #[must_use]
    pub fn action(&self) -> &str {
        self.get(ACTION_PARAM)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Input {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Status of a long-running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessStatus {
    #[serde(rename = "in work")]
    InWork,
    #[serde(rename = "finished")]
    Finished,
    #[serde(rename = "error")]
    Error,
}

/// Result of running an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub status: ProcessStatus,
    pub progress: i64,
    pub message: String,
    pub need_to_notify: bool,
}

impl Default for Process {
    /// A finished process with nothing to report.
    fn default() -> Self {
        Self {
            status: ProcessStatus::Finished,
            progress: 0,
            message: String::new(),
            need_to_notify: false,
        }
    }
}

impl Process {
    /// A process that reports `status` once.
    #[must_use]
    pub fn new(status: ProcessStatus) -> Self {
        Self {
            status,
            progress: UNKNOWN_PROGRESS,
            message: String::new(),
            need_to_notify: true,
        }
    }

    #[must_use]
    pub fn in_work(progress: i64) -> Self {
        Self::new(ProcessStatus::InWork).with_progress(progress)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ProcessStatus::Error).with_message(message)
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: i64) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn is_in_work(&self) -> bool {
        self.status == ProcessStatus::InWork
    }

    /// The `notification` object. Progress is capped at 100 and omitted
    /// unless positive.
    #[must_use]
    pub fn notification(&self) -> Value {
        let mut notice = Output::new();
        let progress = self.progress.min(100);
        if progress > 0 {
            notice.insert("progress".into(), progress.into());
        }
        notice.insert(
            "status".into(),
            serde_json::to_value(self.status).unwrap_or(Value::Null),
        );
        notice.insert("message".into(), self.message.clone().into());
        Value::Object(notice)
    }
}

/// Backend side of one UI component.
pub trait Com: Send {
    /// Value of the `type` attribute.
    fn com_type(&self) -> &'static str;

    /// Actions this com answers.
    fn actions(&self) -> &[&'static str];

    /// Runs one of [`Com::actions`].
    fn run_action(&mut self, action: &str, input: &Input) -> Process;

    /// Publishes the com's own attributes.
    fn publish_attributes(&mut self, out: &mut Output);
}

/// A com with its process state.
pub struct ComNode {
    name: String,
    com: Box<dyn Com>,
    process: Process,
    pending_action: Option<String>,
}

impl ComNode {
    pub fn new(name: impl Into<String>, com: impl Com + 'static) -> Self {
        Self {
            name: name.into(),
            com: Box::new(com),
            process: Process::default(),
            pending_action: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// State of the last started process.
    #[must_use]
    pub fn process(&self) -> &Process {
        &self.process
    }

    /// Applies the request's action. Returns false if the action is rejected.
    pub fn handle(&mut self, input: &Input) -> bool {
        let action = input.action();
        if action.is_empty() {
            return true;
        }

        if self.com.actions().iter().any(|known| *known == action) {
            self.process = self.com.run_action(action, input);
            self.pending_action = Some(action.to_string());
            return true;
        }

        if self.process.is_in_work() {
            if let Some(pending) = self.pending_action.clone() {
                debug!(name = %self.name, action = %pending, "Re-dispatching in-work action");
                self.process = self.com.run_action(&pending, input);
                return true;
            }
        }

        action == SYNC_ACTION
    }

    /// Publishes the node.
    pub fn publish(&mut self, out: &mut Output) {
        out.insert("type".into(), self.com.com_type().into());
        out.insert("name".into(), self.name.clone().into());
        if self.process.need_to_notify {
            self.process.need_to_notify = false;
            out.insert("notification".into(), self.process.notification());
            if self.process.is_in_work() {
                return;
            }
        }
        self.com.publish_attributes(out);
    }
}

/// A named collection of coms and groups.
pub struct Group {
    name: String,
    coms: BTreeMap<String, ComNode>,
    groups: BTreeMap<String, Group>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coms: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a com. An existing com with the same name is kept.
    pub fn add_com(&mut self, name: &str, com: impl Com + 'static) -> &mut Self {
        self.coms
            .entry(name.to_string())
            .or_insert_with(|| ComNode::new(name, com));
        self
    }

    /// Adds (or returns the existing) subgroup `name`.
    pub fn add_group(&mut self, name: &str) -> &mut Group {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| Group::new(name))
    }

    /// Number of coms in this group and its subgroups.
    #[must_use]
    pub fn com_count(&self) -> usize {
        self.coms.len() + self.groups.values().map(Group::com_count).sum::<usize>()
    }

    /// Finds the com at `a/b/c`.
    pub fn find_mut(&mut self, path: &str) -> Option<&mut ComNode> {
        match path.split_once('/') {
            Some((head, rest)) => self.groups.get_mut(head)?.find_mut(rest),
            None => self.coms.get_mut(path),
        }
    }
}

/// Root of the component tree.
pub struct Manager {
    root: Group,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Group::new("manager"),
        }
    }

    pub fn root(&mut self) -> &mut Group {
        &mut self.root
    }

    #[must_use]
    pub fn com_count(&self) -> usize {
        self.root.com_count()
    }

    /// Handles a request for the com at `path` and returns its published
    /// state.
    ///
    /// # Errors
    ///
    /// [`ServerError::NotFound`] if no com lives at `path`,
    /// [`ServerError::Rejected`] if the com does not answer the action.
    pub fn handle_input(&mut self, path: &str, input: &Input) -> Result<Output, ServerError> {
        let node = self
            .root
            .find_mut(path)
            .ok_or_else(|| ServerError::not_found(path))?;
        if !node.handle(input) {
            return Err(ServerError::rejected(path, input.action()));
        }
        let mut out = Output::new();
        node.publish(&mut out);
        Ok(out)
    }
}
