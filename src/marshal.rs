use std::sync::Arc;

use crate::panel::HostPanel;
use crate::ui_thread::UiHandle;

/// Run `action` on the panel's owning thread.
///
/// Returns `true` when the call was taken over: either marshaled (it will
/// run asynchronously on the owning thread) or dropped because the panel
/// is already torn down or the owning thread is gone. Returns `false` when
/// the caller is already on the owning thread and should proceed inline.
///
/// A panel disposed between the marshal decision and execution turns the
/// queued action into a no-op rather than an error.
pub fn invoke_if_required<F>(ui: &UiHandle, panel: &Arc<dyn HostPanel>, action: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    if !ui.is_current() {
        let panel = Arc::downgrade(panel);
        let sent = ui.dispatch(move || {
            match panel.upgrade() {
                Some(panel) if !panel.is_disposed() => action(),
                _ => {}
            }
        });
        if !sent {
            tracing::debug!("owning thread gone, dropping marshaled call");
        }
        return true;
    }

    if panel.is_disposed() {
        // Same contract as the marshaled path: disposed means handled.
        return true;
    }

    false
}
