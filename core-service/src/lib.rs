//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (realtime database,
//! media player factory) into the shared Rust core. Desktop apps typically
//! enable the `desktop-shims` feature, which lets [`CoreConfig`] fall back to
//! the adapters from `bridge-desktop` for any bridge the host does not
//! inject.
//!
//! ```ignore
//! let config = CoreConfig::from_env().build()?;
//! let service = CoreService::start(config)?;
//! let mut events = service.subscribe_events();
//! ```

pub mod error;
pub mod notify;
pub mod prompt;
pub mod service;

pub use error::{CoreError, Result};
pub use notify::{Notification, Notifier, TracingNotifier};
pub use prompt::{ConfirmationPrompt, Decision, PROMPT_TITLE};
pub use service::CoreService;

pub use core_runtime::config::{CoreConfig, CoreConfigBuilder};
pub use core_runtime::events::{CatalogEvent, CoreEvent, EventStream, PlaybackEvent};
pub use core_sync::{AudioCatalog, AudioEntry};
