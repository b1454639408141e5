//! HTTP command API
//!
//! Thin layer over the input scheduler: every handler validates its request,
//! applies it, and answers without waiting for the scheduled revert.

pub mod routes;
pub mod server;
pub mod types;

use std::sync::Arc;

use crate::app::BridgeApp;

pub type SharedStateHandle = Arc<BridgeApp>;

pub use server::run_server;
