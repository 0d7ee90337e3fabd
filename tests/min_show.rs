use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use busy_overlay::panel::HostPanel;
use busy_overlay::{OverlayConfig, OverlayController, UiThread};
use once_cell::sync::Lazy;

use mock_panel::MockPanel;

static TEST_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const MIN_SHOW: Duration = Duration::from_millis(300);

fn setup() -> (Arc<MockPanel>, UiThread, OverlayController) {
    let panel = Arc::new(MockPanel::new(400, 300));
    let ui = UiThread::spawn();
    let dyn_panel: Arc<dyn HostPanel> = panel.clone();
    let config = OverlayConfig::new().hide_indicator_on_complete_after(MIN_SHOW);
    let controller = OverlayController::with_config(dyn_panel, ui.handle(), config);
    (panel, ui, controller)
}

fn wait_for_teardown(panel: &MockPanel, timeout: Duration) -> Duration {
    let begin = Instant::now();
    while begin.elapsed() < timeout {
        if panel.layer_count() == 0 {
            return begin.elapsed();
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("overlay was not torn down within {timeout:?}");
}

#[test]
fn stop_waits_out_minimum_show_time() {
    let _lock = TEST_MUTEX.lock().unwrap();
    let (panel, ui, controller) = setup();

    let _guard = controller.start(true);
    ui.handle().flush();
    let shown = Instant::now();
    assert!(panel.indicator().is_some());

    thread::sleep(Duration::from_millis(50));
    controller.stop(false).unwrap();

    // The overlay must survive until the floor has elapsed.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(panel.layer_count(), 1);

    wait_for_teardown(&panel, Duration::from_secs(2));
    assert!(shown.elapsed() >= MIN_SHOW - Duration::from_millis(20));
}

#[test]
fn hide_immediately_ignores_minimum_show_time() {
    let _lock = TEST_MUTEX.lock().unwrap();
    let (panel, ui, controller) = setup();

    let _guard = controller.start(true);
    ui.handle().flush();
    assert!(panel.indicator().is_some());

    controller.stop(true).unwrap();
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 0);
}

#[test]
fn stop_after_floor_elapsed_is_synchronous() {
    let _lock = TEST_MUTEX.lock().unwrap();
    let (panel, ui, controller) = setup();

    let _guard = controller.start(true);
    ui.handle().flush();

    thread::sleep(MIN_SHOW + Duration::from_millis(50));
    controller.stop(false).unwrap();
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 0);
}

#[test]
fn start_during_deferred_stop_keeps_the_overlay() {
    let _lock = TEST_MUTEX.lock().unwrap();
    let (panel, ui, controller) = setup();

    let _guard = controller.start(true);
    ui.handle().flush();

    // Deferred stop is still waiting out the floor when a new holder
    // arrives; the counter never reaches zero so nothing is torn down.
    controller.stop(false).unwrap();
    let guard = controller.start(true);
    ui.handle().flush();

    thread::sleep(MIN_SHOW + Duration::from_millis(100));
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 1);

    drop(guard);
    ui.handle().flush();
    assert_eq!(panel.layer_count(), 0);
}
