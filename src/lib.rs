//! Workspace placeholder crate.
//!
//! Exposes the feature flags that map onto the individual workspace crates
//! so a host can depend on `clipdeck` alone. `desktop-shims` pulls in the
//! reqwest, Firebase and symphonia/cpal adapters; `headless` expects the
//! host to inject every bridge through [`core_service::CoreConfig`].

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_playback as playback;
#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_service as service;
#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_sync as sync;

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_service::{
    ConfirmationPrompt, CoreConfig, CoreError, CoreService, Decision, Notification, Notifier,
};
