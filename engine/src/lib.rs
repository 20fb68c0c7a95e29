//! webui engine - declarative UI composition.
//!
//! This crate turns an XML configuration document into a tree of UI
//! components and keeps each component synchronized with a backend that
//! answers `webui/<name>` requests.
//!
//! # Overview
//!
//! A document carries three tables: named style sheets, named layouts and a
//! setup block selecting the active style, layout and output mount point.
//! The [`engine::Engine`] resolves layout entries to component instances
//! through the [`registry::ComponentRegistry`], mounts them, and every
//! instance polls the backend through its own [`sync::SyncChannel`].
//!
//! Components are rendered into a headless [`element::Element`] tree, which
//! the `webui` binary prints as markup.
//!
//! # Modules
//!
//! - [`document`]: XML configuration document parsing
//! - [`registry`]: Component type registry and instance cache
//! - [`engine`]: Composition context and layout construction
//! - [`component`]: Component trait, shared core and capabilities
//! - [`sync`]: Per-instance backend synchronization cycle
//! - [`protocol`]: Request paths and response payloads
//! - [`transport`]: HTTP transport to the backend
//! - [`widgets`]: Built-in component types
//! - [`element`]: Headless element tree
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for engine operations
//! - [`testing`]: Scripted transport for tests

pub mod component;
pub mod config;
pub mod document;
pub mod element;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod sync;
pub mod testing;
pub mod transport;
pub mod widgets;

pub use component::{Component, ComponentCore, ComponentProps, LifecycleHooks};
pub use config::Config;
pub use document::{AttrValue, ComponentDescriptor, Document, Setup};
pub use element::Element;
pub use engine::{Constructed, Engine, EngineBuilder};
pub use error::{ConstructError, DocumentError, EngineError, Result, SyncError};
pub use protocol::{Notification, NotificationStatus, SyncResponse};
pub use registry::ComponentRegistry;
pub use sync::{SyncChannel, SyncState, SyncTask};
pub use transport::{HttpTransport, Transport, TransportError};
