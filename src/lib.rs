//! Busy-indicator overlay for long-running operations.
//!
//! While a task runs, an opaque layer with a frozen (optionally filtered)
//! snapshot of the host panel is placed over it; after a debounce delay a
//! busy indicator appears, keyboard input is swallowed and focus attempts
//! on obscured controls are intercepted. When the last concurrent holder
//! stops, the layer is removed and the previously focused control gets
//! focus back.
//!
//! The crate is toolkit-agnostic: adapters implement [`panel::HostPanel`]
//! for their widget tree and run its mutations on a [`ui_thread::UiThread`]
//! (or an equivalent single-consumer loop). [`controller::OverlayController`]
//! is the entry point.

pub mod config;
pub mod controller;
pub mod error;
pub mod focus;
pub mod logging;
pub mod marshal;
pub mod panel;
mod surface;
pub mod ui_thread;
pub mod watchdog;

pub use config::{IndicatorSettings, IndicatorShape, IndicatorView, OverlayConfig};
pub use controller::{OverlayController, OverlayGuard};
pub use error::OverlayError;
pub use panel::{ControlId, HostPanel, LayerSpec, Subscription, SubscriptionId};
pub use ui_thread::{UiHandle, UiThread};
pub use watchdog::{ClaimOutcome, SelectWatchdog};
