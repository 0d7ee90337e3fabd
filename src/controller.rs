use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::OverlayConfig;
use crate::error::OverlayError;
use crate::focus;
use crate::marshal;
use crate::panel::{ControlId, HostPanel};
use crate::surface::OverlaySurface;
use crate::ui_thread::UiHandle;
use crate::watchdog::SelectWatchdog;

/// Reentrant start/stop controller for one busy overlay over one host
/// panel.
///
/// `start` and `stop` may be called from any thread and may be nested:
/// concurrent holders share a single overlay, torn down only when the last
/// holder stops. The indicator display is debounced so fast operations
/// never flicker, and once shown it stays up for the configured minimum.
/// All surface mutations run on the panel's owning thread; the reentrancy
/// counter is the only state touched from arbitrary threads.
#[derive(Clone)]
pub struct OverlayController {
    inner: Arc<Inner>,
}

struct Inner {
    panel: Arc<dyn HostPanel>,
    ui: UiHandle,
    config: OverlayConfig,
    /// Net outstanding starts. Never goes negative: the decrement is a CAS
    /// loop that reports underflow instead.
    started: AtomicI32,
    /// Cancellation token of the current session, replaced on every 0→1
    /// transition. Delayed work checks it before touching the surface.
    cancel: Mutex<Arc<AtomicBool>>,
    shown_at: Mutex<Option<Instant>>,
    prev_focus: Mutex<Option<ControlId>>,
    /// Touched only on the owning thread.
    surface: Mutex<Option<OverlaySurface>>,
}

impl OverlayController {
    pub fn new(panel: Arc<dyn HostPanel>, ui: UiHandle) -> Self {
        Self::with_config(panel, ui, OverlayConfig::default())
    }

    pub fn with_config(panel: Arc<dyn HostPanel>, ui: UiHandle, config: OverlayConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                panel,
                ui,
                config,
                started: AtomicI32::new(0),
                cancel: Mutex::new(Arc::new(AtomicBool::new(false))),
                shown_at: Mutex::new(None),
                prev_focus: Mutex::new(None),
                surface: Mutex::new(None),
            }),
        }
    }

    /// Begin (or join) a busy period. Returns a guard whose drop stops the
    /// period again; scoped usage cleans up on every exit path.
    ///
    /// On the first outstanding start the current focus is recorded, the
    /// panel snapshot captured and the overlay attached; with
    /// `show_immediately` the indicator appears synchronously, otherwise
    /// after the configured debounce delay. Further starts while the
    /// overlay is up only bump the counter.
    pub fn start(&self, show_immediately: bool) -> OverlayGuard {
        let inner = self.inner.clone();
        if !marshal::invoke_if_required(&self.inner.ui, &self.inner.panel, move || {
            inner.start_on_owner(show_immediately)
        }) {
            self.inner.clone().start_on_owner(show_immediately);
        }

        OverlayGuard {
            inner: self.inner.clone(),
            released: AtomicBool::new(false),
        }
    }

    /// End one busy period. The last outstanding stop tears the overlay
    /// down and restores focus.
    ///
    /// When the indicator is visible and `hide_immediately` is false, the
    /// teardown is deferred on a worker thread until the minimum show time
    /// has elapsed; the owning thread keeps processing events throughout.
    /// A stop without a matching start is an error unless the
    /// configuration tolerates it.
    pub fn stop(&self, hide_immediately: bool) -> Result<(), OverlayError> {
        self.inner.clone().stop(hide_immediately)
    }

    /// Like [`stop`](Self::stop), but a no-op when no busy period is
    /// outstanding.
    pub fn stop_if_displayed(&self, hide_immediately: bool) -> Result<(), OverlayError> {
        self.inner.clone().stop_if_displayed(hide_immediately)
    }
}

impl Inner {
    fn start_on_owner(self: Arc<Self>, show_immediately: bool) {
        if self.started.fetch_add(1, Ordering::SeqCst) != 0 {
            return;
        }

        // A stale surface can still be here when a start races the
        // marshaled teardown of the previous session; that teardown will
        // see the counter back above zero and skip itself.
        if let Some(stale) = self.surface.lock().unwrap().take() {
            tracing::debug!("removing stale overlay surface from previous session");
            stale.remove();
        }

        *self.shown_at.lock().unwrap() = None;

        // Flush pending paints so the snapshot shows state changed just
        // before the operation began.
        self.panel.refresh();

        let root = self.panel.root();
        *self.prev_focus.lock().unwrap() = Some(focus::find_focused(&*self.panel, root));

        let snapshot = self.panel.capture();
        let watchdog = SelectWatchdog::new(self.config.detect_deadlocks);
        let mut surface = OverlaySurface::attach(self.panel.clone(), snapshot, watchdog.clone());
        surface.intercept_focus();
        surface.bring_to_front();
        let layer = surface.id();
        *self.surface.lock().unwrap() = Some(surface);

        watchdog.claim_focus(&self.panel, layer);

        let cancel = Arc::new(AtomicBool::new(false));
        *self.cancel.lock().unwrap() = cancel.clone();

        if show_immediately {
            self.display_indicator(&cancel);
        } else {
            self.arm_debounce(cancel);
        }
    }

    fn arm_debounce(self: Arc<Self>, cancel: Arc<AtomicBool>) {
        let delay = self.config.before_show_delay;
        thread::spawn(move || {
            thread::sleep(delay);

            if self.started.load(Ordering::SeqCst) == 0 || cancel.load(Ordering::SeqCst) {
                return;
            }

            let inner = self.clone();
            let token = cancel.clone();
            if !marshal::invoke_if_required(&self.ui, &self.panel, move || {
                inner.display_indicator(&token)
            }) {
                self.display_indicator(&cancel);
            }
        });
    }

    /// Runs on the owning thread.
    fn display_indicator(&self, cancel: &AtomicBool) {
        if self.started.load(Ordering::SeqCst) == 0 || cancel.load(Ordering::SeqCst) {
            return;
        }

        let surface = self.surface.lock().unwrap();
        let Some(surface) = surface.as_ref() else {
            return;
        };

        if self.config.min_show_time != Duration::ZERO {
            *self.shown_at.lock().unwrap() = Some(Instant::now());
        }

        tracing::debug!("showing busy indicator");
        surface.show_indicator(
            (self.config.indicator_factory)(),
            &self.config.background_processor,
        );
    }

    fn stop(self: Arc<Self>, hide_immediately: bool) -> Result<(), OverlayError> {
        self.sync_with_owner();

        if !hide_immediately {
            let shown_at = *self.shown_at.lock().unwrap();
            if let Some(shown_at) = shown_at {
                let elapsed = shown_at.elapsed();
                if elapsed < self.config.min_show_time {
                    let remaining = self.config.min_show_time - elapsed;
                    // Wait out the minimum show time off the owning thread,
                    // then decrement; a start racing this stop keeps the
                    // counter above zero for the whole wait.
                    thread::spawn(move || {
                        thread::sleep(remaining);
                        if let Err(error) = self.finish_stop() {
                            tracing::error!(%error, "deferred stop failed");
                        }
                    });
                    return Ok(());
                }
            }
        }

        self.finish_stop()
    }

    fn finish_stop(self: Arc<Self>) -> Result<(), OverlayError> {
        loop {
            let current = self.started.load(Ordering::SeqCst);
            if current == 0 {
                if self.config.allow_stop_before_start {
                    tracing::debug!("stop without matching start tolerated");
                    return Ok(());
                }
                return Err(OverlayError::StopWithoutStart);
            }
            if self
                .started
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                if current - 1 > 0 {
                    return Ok(());
                }
                break;
            }
        }

        let inner = self.clone();
        if !marshal::invoke_if_required(&self.ui, &self.panel, move || inner.teardown_on_owner()) {
            self.teardown_on_owner();
        }
        Ok(())
    }

    /// Runs on the owning thread.
    fn teardown_on_owner(&self) {
        if self.started.load(Ordering::SeqCst) != 0 {
            // A start raced in after the counter hit zero; the new session
            // owns the surface now.
            return;
        }

        self.cancel.lock().unwrap().store(true, Ordering::SeqCst);

        let root = self.panel.root();
        let focused = focus::find_focused(&*self.panel, root);

        let surface = self.surface.lock().unwrap().take();
        if let Some(surface) = surface {
            let layer = surface.id();
            surface.remove();

            // Only restore focus we actually stole; if the user focused
            // something else meanwhile, leave it alone.
            if focused == layer {
                let previous = self.prev_focus.lock().unwrap().take();
                focus::restore(&*self.panel, root, previous);
            }
        }
    }

    fn stop_if_displayed(self: Arc<Self>, hide_immediately: bool) -> Result<(), OverlayError> {
        self.sync_with_owner();

        if self.started.load(Ordering::SeqCst) == 0 {
            return Ok(());
        }
        self.stop(hide_immediately)
    }

    /// A start from a non-owning thread only queues its increment; a stop
    /// must not read the counter before that queued start has run. Waits
    /// for the owning thread to drain everything queued so far; inline
    /// no-op on the owning thread itself, where program order already
    /// placed any earlier start before us.
    fn sync_with_owner(&self) {
        self.ui.flush();
    }
}

/// Scoped handle for one outstanding start. Dropping it (or calling
/// [`release`](Self::release)) stops the busy period exactly once.
pub struct OverlayGuard {
    inner: Arc<Inner>,
    released: AtomicBool,
}

impl OverlayGuard {
    /// Stop this holder's busy period now. Idempotent; the drop after an
    /// explicit release does nothing.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(error) = self.inner.clone().stop_if_displayed(true) {
            tracing::debug!(%error, "overlay guard release");
        }
    }
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        self.release();
    }
}
