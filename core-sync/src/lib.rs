//! # Audio List Sync
//!
//! Projects the remote `voice_files` collection (or any configured node)
//! into an ordered, immutable catalog of selectable clips.
//!
//! ## Components
//!
//! - **Catalog** (`catalog`): `AudioEntry` and `AudioCatalog`
//! - **List Sync** (`list_sync`): live listener with atomic catalog publish

pub mod catalog;
pub mod error;
pub mod list_sync;

pub use catalog::{AudioCatalog, AudioEntry, FILE_URL_FIELD};
pub use error::{Result, SyncError};
pub use list_sync::{ListSync, Subscription};
