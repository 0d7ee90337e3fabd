use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use busy_overlay::marshal::invoke_if_required;
use busy_overlay::panel::HostPanel;
use busy_overlay::UiThread;

use mock_panel::MockPanel;

fn setup() -> (Arc<MockPanel>, Arc<dyn HostPanel>, UiThread) {
    let panel = Arc::new(MockPanel::new(100, 100));
    let dyn_panel: Arc<dyn HostPanel> = panel.clone();
    (panel, dyn_panel, UiThread::spawn())
}

#[test]
fn call_from_other_thread_is_marshaled() {
    let (_panel, dyn_panel, ui) = setup();
    let handle = ui.handle();

    let (tx, rx) = mpsc::channel();
    let probe = handle.clone();
    let marshaled = invoke_if_required(&handle, &dyn_panel, move || {
        let _ = tx.send(probe.is_current());
    });

    assert!(marshaled);
    // The action ran asynchronously, on the owning thread.
    assert!(rx.recv_timeout(Duration::from_secs(1)).unwrap());
}

#[test]
fn call_on_owning_thread_runs_inline() {
    let (_panel, dyn_panel, ui) = setup();
    let handle = ui.handle();

    let (tx, rx) = mpsc::channel();
    let inner_handle = handle.clone();
    handle.dispatch(move || {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_probe = ran.clone();
        let marshaled = invoke_if_required(&inner_handle, &dyn_panel, move || {
            ran_probe.store(true, Ordering::SeqCst);
        });
        // Inline: the caller proceeds synchronously.
        let _ = tx.send((marshaled, ran.load(Ordering::SeqCst)));
    });

    let (marshaled, ran) = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(!marshaled);
    // `false` tells the caller to run the action itself.
    assert!(!ran);
}

#[test]
fn disposed_panel_swallows_the_call() {
    let (panel, dyn_panel, ui) = setup();
    let handle = ui.handle();
    panel.dispose();

    let ran = Arc::new(AtomicBool::new(false));
    let ran_probe = ran.clone();
    let marshaled = invoke_if_required(&handle, &dyn_panel, move || {
        ran_probe.store(true, Ordering::SeqCst);
    });

    assert!(marshaled);
    handle.flush();
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn panel_disposed_while_call_is_queued() {
    let (panel, dyn_panel, ui) = setup();
    let handle = ui.handle();

    // Keep the owning thread busy so the dispose lands while the action
    // is still queued behind it.
    handle.dispatch(|| thread::sleep(Duration::from_millis(100)));

    let ran = Arc::new(AtomicBool::new(false));
    let ran_probe = ran.clone();
    let marshaled = invoke_if_required(&handle, &dyn_panel, move || {
        ran_probe.store(true, Ordering::SeqCst);
    });
    panel.dispose();

    assert!(marshaled);
    handle.flush();
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn disposed_panel_on_owning_thread_reports_handled() {
    let (panel, dyn_panel, ui) = setup();
    let handle = ui.handle();
    panel.dispose();

    let (tx, rx) = mpsc::channel();
    let inner_handle = handle.clone();
    handle.dispatch(move || {
        let marshaled = invoke_if_required(&inner_handle, &dyn_panel, || {});
        let _ = tx.send(marshaled);
    });

    // Disposed counts as handled even inline.
    assert!(rx.recv_timeout(Duration::from_secs(1)).unwrap());
}
