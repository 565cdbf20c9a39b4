//! Athletes Sync
//!
//! Keeps an in-memory, ordered list of athlete records synchronized with a
//! remote JSON REST collection.
//!
//! # Modules
//!
//! - `client`: HTTP access to the remote collection
//! - `sync`: the controller, its single-writer list state and the view channel
//! - `form`: add-form state with a configurable clear policy
//! - `backend`: in-memory mock server for the same REST contract

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod record;
pub mod sync;

pub use client::{HttpCollectionClient, RemoteCollection};
pub use config::{ClientConfig, Config, FormClearPolicy};
pub use error::{Result, SyncError};
pub use record::{Draft, Record, RecordId};
pub use sync::SyncController;
