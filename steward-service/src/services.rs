//! Core services of the steward.
//!
//! This module exposes all internal services used to resolve, render, and
//! rotate key material. Each service encapsulates a specific responsibility
//! and can be used by higher-level components such as the API or the main
//! application state.
//!
//! # Services overview
//!
//! - [`secrets_provider`] – loads the provisioned secrets bundle at startup.
//! - [`secrets_store`] – resolves epochs against the provisioned bundle.
//! - [`key_materializer`] – renders an epoch's artifacts to disk.
//! - [`reload`] – orchestrates one all-or-nothing key reload.
//! - [`rotation_watcher`] – polls the epoch clock and triggers reloads.
//! - [`token_server`] – the serving component's hot-reload boundary.

pub mod key_materializer;
pub mod reload;
pub mod rotation_watcher;
pub mod secrets_provider;
pub mod secrets_store;
pub mod token_server;
