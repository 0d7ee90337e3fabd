use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use busy_overlay::panel::HostPanel;
use busy_overlay::{OverlayConfig, OverlayController, UiThread};
use once_cell::sync::Lazy;

use mock_panel::MockPanel;

// Timing-sensitive tests share one lock so scheduler noise from a
// neighbouring test cannot skew the delays.
static TEST_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn setup(config: OverlayConfig) -> (Arc<MockPanel>, UiThread, OverlayController) {
    let panel = Arc::new(MockPanel::new(400, 300));
    let ui = UiThread::spawn();
    let dyn_panel: Arc<dyn HostPanel> = panel.clone();
    let controller = OverlayController::with_config(dyn_panel, ui.handle(), config);
    (panel, ui, controller)
}

#[test]
fn stop_before_debounce_never_shows_indicator() {
    let _lock = TEST_MUTEX.lock().unwrap();
    let (panel, ui, controller) = setup(
        OverlayConfig::new()
            .show_indicator_after(Duration::from_millis(250))
            .hide_indicator_immediately_on_complete(),
    );

    let guard = controller.start(false);
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 1);
    assert!(panel.indicator().is_none());

    drop(guard);
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 0);

    // Outlive the debounce: the stale timer must stay a no-op.
    thread::sleep(Duration::from_millis(400));
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 0);
    assert_eq!(panel.indicators_attached(), 0);
}

#[test]
fn indicator_appears_after_debounce() {
    let _lock = TEST_MUTEX.lock().unwrap();
    let (panel, ui, controller) = setup(
        OverlayConfig::new()
            .show_indicator_after(Duration::from_millis(100))
            .hide_indicator_immediately_on_complete(),
    );

    let guard = controller.start(false);
    ui.handle().flush();
    assert!(panel.indicator().is_none());

    thread::sleep(Duration::from_millis(300));
    ui.handle().flush();

    let layer = panel.layer().expect("layer still up");
    assert!(panel.indicator().is_some());
    assert!(panel.background_processed(layer));
    // Default 100x100 view centered in 400x300.
    assert_eq!(panel.indicator_pos(), Some((150, 100)));

    drop(guard);
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 0);
    assert!(panel.indicator().is_none());
}

#[test]
fn show_immediately_skips_debounce() {
    let _lock = TEST_MUTEX.lock().unwrap();
    let (panel, ui, controller) = setup(
        OverlayConfig::new()
            .show_indicator_after(Duration::from_secs(60))
            .hide_indicator_immediately_on_complete(),
    );

    let guard = controller.start(true);
    ui.handle().flush();
    assert!(panel.indicator().is_some());

    drop(guard);
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 0);
}

#[test]
fn indicator_recentered_and_dropped_on_resize() {
    let _lock = TEST_MUTEX.lock().unwrap();
    let (panel, ui, controller) = setup(OverlayConfig::new().hide_indicator_immediately_on_complete());

    let guard = controller.start(true);
    ui.handle().flush();
    assert_eq!(panel.indicator_pos(), Some((150, 100)));

    // Shrink below the indicator: negative margin removes it.
    let resize_panel = panel.clone();
    ui.handle().dispatch(move || resize_panel.resize(80, 60));
    ui.handle().flush();
    assert!(panel.indicator().is_none());

    // Grow back: the indicator is re-attached and re-centered.
    let resize_panel = panel.clone();
    ui.handle().dispatch(move || resize_panel.resize(300, 300));
    ui.handle().flush();
    assert!(panel.indicator().is_some());
    assert_eq!(panel.indicator_pos(), Some((100, 100)));

    drop(guard);
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 0);
}
