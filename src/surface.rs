use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use image::RgbaImage;

use crate::config::{BackgroundProcessor, IndicatorView};
use crate::panel::{ControlId, EventCallback, HostPanel, LayerSpec, Subscription};
use crate::watchdog::SelectWatchdog;

/// Opaque layer covering the host panel while an operation runs.
///
/// Displays the captured snapshot, hosts the centered busy indicator once
/// the debounce elapses, and keeps input focus away from the obscured
/// controls underneath. All methods run on the panel's owning thread.
pub(crate) struct OverlaySurface {
    shared: Arc<Shared>,
    /// Resize + structure subscriptions; dropped first on teardown so no
    /// event callback fires into a half-removed surface.
    anchor_subs: Vec<Subscription>,
}

struct Shared {
    panel: Arc<dyn HostPanel>,
    layer: ControlId,
    watchdog: SelectWatchdog,
    /// Cleared before teardown so late focus-enter events stop stealing
    /// focus back to a dying layer.
    active: AtomicBool,
    /// Captured snapshot, owned exclusively; taken when the indicator is
    /// shown and replaced by the processed image on the panel side.
    background: Mutex<Option<RgbaImage>>,
    indicator: Mutex<Option<ControlId>>,
    indicator_view: Mutex<Option<IndicatorView>>,
    sibling_subs: Mutex<Vec<Subscription>>,
}

impl OverlaySurface {
    /// Create the layer over `panel`, sized to it, displaying `background`.
    pub fn attach(
        panel: Arc<dyn HostPanel>,
        background: RgbaImage,
        watchdog: SelectWatchdog,
    ) -> Self {
        let (width, height) = panel.size();
        let layer = panel.attach_layer(LayerSpec {
            width,
            height,
            background: background.clone(),
            swallow_input: true,
        });

        let shared = Arc::new(Shared {
            panel,
            layer,
            watchdog,
            active: AtomicBool::new(true),
            background: Mutex::new(Some(background)),
            indicator: Mutex::new(None),
            indicator_view: Mutex::new(None),
            sibling_subs: Mutex::new(Vec::new()),
        });

        let on_resize = shared.clone();
        let resize_sub = shared.panel.subscribe_resize(
            layer,
            Arc::new(move || on_resize.place_indicator()),
        );

        Self {
            anchor_subs: vec![Subscription::new(&shared.panel, resize_sub)],
            shared,
        }
    }

    pub fn id(&self) -> ControlId {
        self.shared.layer
    }

    pub fn bring_to_front(&self) {
        self.shared.panel.bring_to_front(self.shared.layer);
    }

    /// Claim focus back whenever any sibling of the layer receives it, for
    /// as long as the surface is active. Re-subscribes on structural
    /// change of the panel's children.
    pub fn intercept_focus(&mut self) {
        let shared = self.shared.clone();
        let structure_sub = self.shared.panel.subscribe_structure(
            self.shared.panel.id(),
            Arc::new(move || Shared::resubscribe_siblings(&shared)),
        );
        self.anchor_subs
            .push(Subscription::new(&self.shared.panel, structure_sub));

        Shared::resubscribe_siblings(&self.shared);
    }

    /// Swap the displayed snapshot for its processed version and place the
    /// centered indicator.
    pub fn show_indicator(&self, view: IndicatorView, processor: &BackgroundProcessor) {
        let Some(background) = self.shared.background.lock().unwrap().take() else {
            return;
        };

        let panel = &self.shared.panel;
        panel.set_layer_background(self.shared.layer, processor(background));
        panel.set_wait_cursor(self.shared.layer, true);

        *self.shared.indicator_view.lock().unwrap() = Some(view);
        self.shared.place_indicator();
    }

    /// Tear the surface down: unsubscribe everything, dispose the
    /// indicator, detach the layer.
    pub fn remove(mut self) {
        self.shared.active.store(false, Ordering::SeqCst);

        // Unsubscribe before touching the tree so removals below cannot
        // re-enter our own callbacks.
        self.anchor_subs.clear();
        self.shared.sibling_subs.lock().unwrap().clear();

        let panel = &self.shared.panel;
        if let Some(indicator) = self.shared.indicator.lock().unwrap().take() {
            panel.remove_control(indicator);
        }
        panel.remove_control(self.shared.layer);
    }
}

impl Shared {
    /// Center the indicator within the layer's current bounds, removing it
    /// when it does not fit. Safe to call repeatedly; re-run on resize.
    fn place_indicator(&self) {
        let view_guard = self.indicator_view.lock().unwrap();
        let Some(view) = view_guard.as_ref() else {
            return;
        };

        let (layer_w, layer_h) = self.panel.control_size(self.layer);
        let left = (layer_w as i64 - view.width as i64) / 2;
        let top = (layer_h as i64 - view.height as i64) / 2;

        let mut indicator = self.indicator.lock().unwrap();
        if left < 0 || top < 0 {
            if let Some(id) = indicator.take() {
                self.panel.remove_control(id);
            }
            return;
        }

        let id = match *indicator {
            Some(id) => id,
            None => {
                let id = self.panel.attach_indicator(self.layer, view.clone());
                *indicator = Some(id);
                id
            }
        };
        self.panel.move_control(id, left as i32, top as i32);
        self.panel.bring_to_front(id);
    }

    fn resubscribe_siblings(shared: &Arc<Self>) {
        let mut subs = shared.sibling_subs.lock().unwrap();
        subs.clear();

        let enter = shared.clone();
        let on_enter: EventCallback = Arc::new(move || {
            if enter.active.load(Ordering::SeqCst) {
                enter.watchdog.claim_focus(&enter.panel, enter.layer);
            }
        });

        for child in shared.panel.children() {
            if child == shared.layer {
                continue;
            }
            let sub = shared.panel.subscribe_focus_enter(child, on_enter.clone());
            subs.push(Subscription::new(&shared.panel, sub));
        }
    }
}
