//! Per-component synchronization with the backend.
//!
//! Every component owns a [`SyncChannel`]. Calling
//! [`SyncChannel::send_action`] spawns one *cycle* on the tokio runtime:
//!
//! ```text
//! Idle ──send_action──▶ Requesting ──2xx, no/finished notification──▶ Done (on_draw)
//!                          │   ▲
//!                          │   └──── retry delay ────┐
//!                          └── pending/error ──▶ NotifierWaiting
//! ```
//!
//! At most one cycle is outstanding per component. A new `sync` while a
//! cycle is outstanding joins it; any other action aborts it and starts
//! over. Transport failures and malformed bodies end the cycle and return
//! the channel to [`SyncState::Idle`] without touching drawn content.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

use crate::component::Component;
use crate::element::Element;
use crate::error::SyncError;
use crate::protocol::{request_path, Notification, SyncResponse};
use crate::transport::Transport;

/// The plain synchronization action.
pub const SYNC_ACTION: &str = "sync";

/// Class of the waiting indicator element.
pub const NOTIFIER_CLASS: &str = "notifier";

/// Observable state of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Requesting,
    NotifierWaiting {
        message: String,
        progress: Option<i64>,
    },
    Done,
}

struct InFlight {
    id: u64,
    abort: AbortHandle,
    done: watch::Receiver<bool>,
}

struct SyncShared {
    state: watch::Sender<SyncState>,
    in_flight: Mutex<Option<InFlight>>,
    notifier: Mutex<Option<Element>>,
    next_id: AtomicU64,
}

impl SyncShared {
    fn set_state(&self, state: SyncState) {
        self.state.send_replace(state);
    }

    /// Clears the in-flight slot if it still belongs to cycle `id`.
    fn release(&self, id: u64) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap();
        if in_flight.as_ref().is_some_and(|f| f.id == id) {
            *in_flight = None;
            return true;
        }
        false
    }
}

/// Request/response/retry driver for one component.
pub struct SyncChannel {
    name: String,
    host: Element,
    transport: Arc<dyn Transport>,
    retry_delay: Duration,
    owner: OnceLock<Weak<dyn Component>>,
    shared: Arc<SyncShared>,
}

impl SyncChannel {
    /// Creates an idle channel for the component `name`, whose waiting
    /// indicator is attached to `host`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        host: Element,
        transport: Arc<dyn Transport>,
        retry_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            name: name.into(),
            host,
            transport,
            retry_delay,
            owner: OnceLock::new(),
            shared: Arc::new(SyncShared {
                state,
                in_flight: Mutex::new(None),
                notifier: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Binds the component that receives `on_draw`. Only the first call has
    /// an effect.
    pub fn bind(&self, owner: Weak<dyn Component>) {
        let _ = self.owner.set(owner);
    }

    /// Returns the request name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.shared.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.shared.state.subscribe()
    }

    /// Returns the waiting indicator while one is shown.
    #[must_use]
    pub fn notifier(&self) -> Option<Element> {
        self.shared.notifier.lock().unwrap().clone()
    }

    /// Starts a cycle for `action` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Unbound`] if no component was bound, or
    /// [`SyncError::NoRuntime`] outside a tokio runtime.
    pub fn send_action(&self, action: &str, args: &[(&str, &str)]) -> Result<SyncTask, SyncError> {
        let owner = self
            .owner
            .get()
            .cloned()
            .ok_or_else(|| SyncError::Unbound(self.name.clone()))?;
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;

        let mut in_flight = self.shared.in_flight.lock().unwrap();
        if let Some(current) = in_flight.as_ref() {
            if !*current.done.borrow() {
                if action == SYNC_ACTION {
                    debug!(name = %self.name, "Sync joined outstanding cycle");
                    return Ok(SyncTask {
                        id: current.id,
                        abort: current.abort.clone(),
                        done: current.done.clone(),
                        shared: Arc::clone(&self.shared),
                    });
                }
                debug!(name = %self.name, action = %action, "Superseding outstanding cycle");
                current.abort.abort();
            }
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let path = request_path(&self.name, Some(action), args);
        let (done_tx, done_rx) = watch::channel(false);
        let cycle = Cycle {
            id,
            name: self.name.clone(),
            host: self.host.clone(),
            transport: Arc::clone(&self.transport),
            retry_delay: self.retry_delay,
            owner,
            shared: Arc::clone(&self.shared),
        };

        self.shared.set_state(SyncState::Requesting);
        let handle = runtime.spawn(async move {
            cycle.run(path).await;
            let _ = done_tx.send(true);
        });

        let task = SyncTask {
            id,
            abort: handle.abort_handle(),
            done: done_rx.clone(),
            shared: Arc::clone(&self.shared),
        };
        *in_flight = Some(InFlight {
            id,
            abort: handle.abort_handle(),
            done: done_rx,
        });
        Ok(task)
    }
}

/// Handle to one synchronization cycle.
///
/// Dropping the handle does not cancel the cycle.
#[derive(Clone)]
pub struct SyncTask {
    id: u64,
    abort: AbortHandle,
    done: watch::Receiver<bool>,
    shared: Arc<SyncShared>,
}

impl SyncTask {
    /// Cancels the cycle. The channel returns to idle if this cycle was the
    /// outstanding one.
    pub fn cancel(&self) {
        self.abort.abort();
        if self.shared.release(self.id) {
            self.shared.set_state(SyncState::Idle);
        }
    }

    /// Waits until the cycle has completed or been cancelled.
    pub async fn settled(&self) {
        let mut done = self.done.clone();
        let _ = done.wait_for(|finished| *finished).await;
    }

    /// Returns true once the cycle has completed normally.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        *self.done.borrow()
    }

    /// Returns true if both handles refer to the same cycle.
    #[must_use]
    pub fn same_cycle(&self, other: &SyncTask) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for SyncTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncTask")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

struct Cycle {
    id: u64,
    name: String,
    host: Element,
    transport: Arc<dyn Transport>,
    retry_delay: Duration,
    owner: Weak<dyn Component>,
    shared: Arc<SyncShared>,
}

impl Cycle {
    async fn run(self, mut path: String) {
        loop {
            self.shared.set_state(SyncState::Requesting);

            let body = match self.transport.get(&path).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(name = %self.name, error = %e, "Sync request failed");
                    self.finish(SyncState::Idle);
                    return;
                }
            };

            let response = match SyncResponse::from_json(&body) {
                Ok(response) => response,
                Err(e) => {
                    error!(name = %self.name, error = %e, "Malformed sync response");
                    self.finish(SyncState::Idle);
                    return;
                }
            };

            match response.notification.as_ref() {
                Some(notice) if !notice.is_finished() => {
                    self.show_notifier(notice);
                    self.shared.set_state(SyncState::NotifierWaiting {
                        message: notice.message.clone(),
                        progress: notice.progress,
                    });
                    debug!(
                        name = %self.name,
                        delay_ms = self.retry_delay.as_millis() as u64,
                        "Backend busy, scheduling retry"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    path = request_path(&self.name, Some(SYNC_ACTION), &[]);
                }
                _ => {
                    self.deliver(&response);
                    return;
                }
            }
        }
    }

    /// Ends the cycle with `state`. Returns false, leaving the state alone,
    /// if another cycle has taken over the channel.
    fn finish(&self, state: SyncState) -> bool {
        if !self.shared.release(self.id) {
            debug!(name = %self.name, "Cycle superseded, result dropped");
            return false;
        }
        self.shared.set_state(state);
        true
    }

    /// Hands a ready response to the component.
    fn deliver(&self, response: &SyncResponse) {
        if !self.finish(SyncState::Done) {
            return;
        }
        self.hide_notifier();
        match self.owner.upgrade() {
            Some(owner) => owner.on_draw(response),
            None => debug!(name = %self.name, "Component dropped before draw"),
        }
    }

    fn show_notifier(&self, notice: &Notification) {
        let mut notifier = self.shared.notifier.lock().unwrap();
        let element = notifier.get_or_insert_with(|| {
            let element = Element::new("div");
            element.set_class(Some(NOTIFIER_CLASS));
            element
        });
        element.set_text(notice.waiting_text());
        self.host.append_child(element);
    }

    fn hide_notifier(&self) {
        if let Some(element) = self.shared.notifier.lock().unwrap().take() {
            self.host.remove_child(&element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentCore, ComponentProps};
    use crate::document::ComponentDescriptor;
    use crate::testing::ScriptedTransport;

    struct Widget {
        core: ComponentCore,
        drawn: Mutex<Vec<SyncResponse>>,
    }

    impl Component for Widget {
        fn core(&self) -> &ComponentCore {
            &self.core
        }

        fn on_draw(&self, response: &SyncResponse) {
            self.drawn.lock().unwrap().push(response.clone());
        }
    }

    fn widget(transport: Arc<ScriptedTransport>, delay_ms: u64) -> Arc<Widget> {
        let props = ComponentProps {
            name: "widget".to_string(),
            attributes: ComponentDescriptor::default(),
            style: ComponentDescriptor::default(),
        };
        let core = ComponentCore::with_transport(
            &props,
            Element::new("div"),
            transport,
            Duration::from_millis(delay_ms),
        );
        let widget = Arc::new(Widget {
            core,
            drawn: Mutex::new(Vec::new()),
        });
        let owner: Arc<dyn Component> = widget.clone();
        widget.core.sync().bind(Arc::downgrade(&owner));
        widget
    }

    #[tokio::test]
    async fn finished_response_is_drawn() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"label":"OK"}"#);
        let widget = widget(transport.clone(), 1000);

        let task = widget.core.sync().send_action("sync", &[]).unwrap();
        task.settled().await;

        assert_eq!(transport.requests(), vec!["webui/widget?action=sync"]);
        assert_eq!(widget.core.sync().state(), SyncState::Done);
        let drawn = widget.drawn.lock().unwrap();
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].str_field("label"), Some("OK"));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_notification_retries_after_delay() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"notification":{"status":"pending","message":"m","progress":40}}"#);
        transport.push_ok(r#"{"label":"done"}"#);
        let widget = widget(transport.clone(), 1000);

        let mut state = widget.core.sync().subscribe();
        let task = widget.core.sync().send_action("sync", &[]).unwrap();
        state
            .wait_for(|s| matches!(s, SyncState::NotifierWaiting { .. }))
            .await
            .unwrap();

        let notifier = widget.core.sync().notifier().unwrap();
        assert_eq!(notifier.text().as_deref(), Some("Waiting: m 40 %"));
        assert!(widget.core.element().contains(&notifier));
        assert!(widget.drawn.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(transport.request_count(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        task.settled().await;
        assert_eq!(transport.request_count(), 2);
        assert!(widget.core.sync().notifier().is_none());
        assert!(!widget.core.element().contains(&notifier));
        assert_eq!(widget.drawn.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retry_reissues_plain_sync() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"notification":{"status":"in work","message":"copy"}}"#);
        transport.push_ok(r#"{}"#);
        let widget = widget(transport.clone(), 5);

        let task = widget
            .core
            .sync()
            .send_action("open", &[("file", "a&b=c")])
            .unwrap();
        task.settled().await;

        assert_eq!(
            transport.requests(),
            vec![
                "webui/widget?action=open&file=a%26b%3Dc",
                "webui/widget?action=sync"
            ]
        );
    }

    #[tokio::test]
    async fn transport_failure_returns_to_idle() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(503);
        let widget = widget(transport.clone(), 1000);

        let task = widget.core.sync().send_action("sync", &[]).unwrap();
        task.settled().await;

        assert_eq!(widget.core.sync().state(), SyncState::Idle);
        assert!(widget.drawn.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_response_leaves_content_unchanged() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"notification":{"status":"pending","message":"m"}}"#);
        transport.push_ok("{ not json");
        let widget = widget(transport.clone(), 1);

        let task = widget.core.sync().send_action("sync", &[]).unwrap();
        task.settled().await;

        assert_eq!(widget.core.sync().state(), SyncState::Idle);
        assert!(widget.drawn.lock().unwrap().is_empty());
        let notifier = widget.core.sync().notifier().unwrap();
        assert_eq!(notifier.text().as_deref(), Some("Waiting: m ..."));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_joins_outstanding_cycle() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"notification":{"status":"pending","message":"m"}}"#);
        transport.push_ok(r#"{}"#);
        let widget = widget(transport.clone(), 1000);

        let first = widget.core.sync().send_action("sync", &[]).unwrap();
        let second = widget.core.sync().send_action("sync", &[]).unwrap();
        assert!(first.same_cycle(&second));

        second.settled().await;
        assert_eq!(transport.request_count(), 2);
        assert_eq!(widget.drawn.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn other_action_supersedes_outstanding_cycle() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"notification":{"status":"pending","message":"m"}}"#);
        transport.push_ok(r#"{"label":"selected"}"#);
        let widget = widget(transport.clone(), 1000);

        let mut state = widget.core.sync().subscribe();
        let first = widget.core.sync().send_action("sync", &[]).unwrap();
        state
            .wait_for(|s| matches!(s, SyncState::NotifierWaiting { .. }))
            .await
            .unwrap();

        let second = widget
            .core
            .sync()
            .send_action("select", &[("where", "x")])
            .unwrap();
        assert!(!first.same_cycle(&second));

        first.settled().await;
        second.settled().await;
        assert!(!first.is_finished());
        assert!(second.is_finished());
        assert_eq!(
            transport.requests(),
            vec!["webui/widget?action=sync", "webui/widget?action=select&where=x"]
        );
        let drawn = widget.drawn.lock().unwrap();
        assert_eq!(drawn.len(), 1);
        assert_eq!(drawn[0].str_field("label"), Some("selected"));
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_of_superseded_cycle_is_dropped() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"notification":{"status":"pending","message":"m"}}"#);
        let widget = widget(transport.clone(), 1000);

        let mut state = widget.core.sync().subscribe();
        let current = widget.core.sync().send_action("open", &[]).unwrap();
        state
            .wait_for(|s| matches!(s, SyncState::NotifierWaiting { .. }))
            .await
            .unwrap();

        let owner: Arc<dyn Component> = widget.clone();
        let stale = Cycle {
            id: u64::MAX,
            name: "widget".to_string(),
            host: widget.core.element().clone(),
            transport: transport.clone(),
            retry_delay: Duration::from_millis(1000),
            owner: Arc::downgrade(&owner),
            shared: Arc::clone(&widget.core.sync().shared),
        };
        stale.deliver(&SyncResponse::from_json(r#"{"label":"stale"}"#).unwrap());

        assert!(widget.drawn.lock().unwrap().is_empty());
        assert!(matches!(
            widget.core.sync().state(),
            SyncState::NotifierWaiting { .. }
        ));
        assert!(widget.core.sync().notifier().is_some());
        current.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_keeps_polling() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"notification":{"status":"running","message":"m"}}"#);
        transport.push_ok(r#"{"label":"done"}"#);
        let widget = widget(transport.clone(), 1000);

        let mut state = widget.core.sync().subscribe();
        let task = widget.core.sync().send_action("sync", &[]).unwrap();
        state
            .wait_for(|s| matches!(s, SyncState::NotifierWaiting { .. }))
            .await
            .unwrap();
        assert!(widget.drawn.lock().unwrap().is_empty());

        task.settled().await;
        assert_eq!(transport.request_count(), 2);
        assert_eq!(widget.core.sync().state(), SyncState::Done);
        assert_eq!(widget.drawn.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_returns_to_idle() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(r#"{"notification":{"status":"pending","message":"m"}}"#);
        let widget = widget(transport.clone(), 1000);

        let mut state = widget.core.sync().subscribe();
        let task = widget.core.sync().send_action("sync", &[]).unwrap();
        state
            .wait_for(|s| matches!(s, SyncState::NotifierWaiting { .. }))
            .await
            .unwrap();

        task.cancel();
        task.settled().await;

        assert_eq!(widget.core.sync().state(), SyncState::Idle);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn send_without_runtime_fails() {
        let transport = Arc::new(ScriptedTransport::new());
        let widget = widget(transport, 1000);

        let err = widget.core.sync().send_action("sync", &[]).unwrap_err();
        assert!(matches!(err, SyncError::NoRuntime));
    }

    #[tokio::test]
    async fn unbound_channel_fails() {
        let channel = SyncChannel::new(
            "loose",
            Element::new("div"),
            Arc::new(ScriptedTransport::new()),
            Duration::from_millis(10),
        );

        let err = channel.send_action("sync", &[]).unwrap_err();
        assert!(matches!(err, SyncError::Unbound(ref name) if name == "loose"));
    }
}
