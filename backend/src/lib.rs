//! webui backend - component manager answering webui requests.
//!
//! This crate provides the server side of webui, responsible for:
//! - Holding the backend counterpart of every UI component
//! - Running component actions and reporting long-running processes
//! - Answering `GET /webui/<path>?action=...` with the component's state
//!
//! # Architecture
//!
//! Components implement [`com::Com`] and live in a [`com::Manager`] tree.
//! The router in [`routes`] hands each request to the manager, which finds
//! the component by path, applies the action and publishes the result.

pub mod com;
pub mod config;
pub mod controls;
pub mod error;
pub mod routes;
