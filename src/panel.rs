use std::sync::{Arc, Weak};

use image::RgbaImage;

use crate::config::IndicatorView;

/// Opaque identifier for a control inside the host toolkit's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub u64);

/// Identifier of an installed event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked by the host panel when a subscribed event fires.
/// Events fire on the panel's owning thread.
pub type EventCallback = Arc<dyn Fn() + Send + Sync>;

/// Description of the opaque layer placed over the host panel.
pub struct LayerSpec {
    pub width: u32,
    pub height: u32,
    /// Snapshot displayed while the overlay is up. Replaced with the
    /// processed image once the indicator is shown.
    pub background: RgbaImage,
    /// Swallow keyboard input targeted at the layer instead of letting it
    /// bubble to the obscured controls underneath.
    pub swallow_input: bool,
}

/// Boundary trait over the surface the overlay is placed on.
///
/// The crate never talks to a toolkit directly; an adapter implements this
/// trait for the real widget tree. All methods are called on the panel's
/// owning thread, with two exceptions: `is_disposed` may be polled from any
/// thread, and `select` may additionally run on the watchdog thread when
/// deadlock detection is enabled (see [`crate::watchdog::SelectWatchdog`]).
///
/// Operations on ids that no longer exist must be silent no-ops: the
/// controller races teardown against delayed work and recovers locally.
pub trait HostPanel: Send + Sync {
    /// Id of the panel itself (the container the layer is attached to).
    fn id(&self) -> ControlId;
    /// Id of the top-level container (window/form) used as the focus root.
    fn root(&self) -> ControlId;
    fn size(&self) -> (u32, u32);
    fn is_disposed(&self) -> bool;
    /// Flush pending paints so `capture` sees the latest pixels.
    fn refresh(&self);
    /// Capture the panel's currently visible pixels.
    fn capture(&self) -> RgbaImage;

    /// Direct children of the panel, in z-order.
    fn children(&self) -> Vec<ControlId>;
    fn attach_layer(&self, spec: LayerSpec) -> ControlId;
    /// Attach an indicator view as a child of `layer`.
    fn attach_indicator(&self, layer: ControlId, view: IndicatorView) -> ControlId;
    fn remove_control(&self, id: ControlId);
    fn move_control(&self, id: ControlId, x: i32, y: i32);
    fn bring_to_front(&self, id: ControlId);
    fn control_size(&self, id: ControlId) -> (u32, u32);
    fn set_layer_background(&self, id: ControlId, image: RgbaImage);
    /// Show or clear the busy cursor on a layer.
    fn set_wait_cursor(&self, id: ControlId, wait: bool);

    fn exists(&self, id: ControlId) -> bool;
    fn is_attached(&self, id: ControlId) -> bool;
    fn is_visible(&self, id: ControlId) -> bool;
    fn can_select(&self, id: ControlId) -> bool;
    /// Claim input focus for `id`.
    fn select(&self, id: ControlId);
    /// The focused child of `container`, if any.
    fn active_child(&self, container: ControlId) -> Option<ControlId>;
    fn set_active_child(&self, container: ControlId, child: ControlId);

    fn subscribe_resize(&self, target: ControlId, cb: EventCallback) -> SubscriptionId;
    /// Child added to or removed from `container`.
    fn subscribe_structure(&self, container: ControlId, cb: EventCallback) -> SubscriptionId;
    /// `target` received input focus.
    fn subscribe_focus_enter(&self, target: ControlId, cb: EventCallback) -> SubscriptionId;
    fn unsubscribe(&self, sub: SubscriptionId);
}

/// RAII handle for a panel event subscription. Dropping it unsubscribes;
/// a panel that is already gone is silently skipped.
pub struct Subscription {
    panel: Weak<dyn HostPanel>,
    id: SubscriptionId,
}

impl Subscription {
    pub fn new(panel: &Arc<dyn HostPanel>, id: SubscriptionId) -> Self {
        Self {
            panel: Arc::downgrade(panel),
            id,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(panel) = self.panel.upgrade() {
            panel.unsubscribe(self.id);
        }
    }
}
