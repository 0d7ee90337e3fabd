use crate::panel::{ControlId, HostPanel};

// The active-child relation is acyclic in a sane toolkit; the cap only
// stops a broken adapter from hanging the owning thread.
const MAX_FOCUS_DEPTH: usize = 256;

/// Innermost focused descendant of `root`.
///
/// Follows the active-child relation until it stops narrowing; `root`
/// itself is returned when it has no focused descendant.
pub fn find_focused(panel: &dyn HostPanel, root: ControlId) -> ControlId {
    let mut current = root;
    for _ in 0..MAX_FOCUS_DEPTH {
        match panel.active_child(current) {
            Some(next) if next != current => current = next,
            _ => return current,
        }
    }
    tracing::warn!(?current, "active-child chain did not terminate");
    current
}

/// Restore focus inside `container` to `previous` if it is still a valid
/// target. Gone, detached, invisible, or equal to the container itself
/// means focus is left where it is, never forced.
pub fn restore(panel: &dyn HostPanel, container: ControlId, previous: Option<ControlId>) {
    let Some(previous) = previous else {
        return;
    };

    if !panel.exists(previous)
        || !panel.is_attached(previous)
        || !panel.is_visible(previous)
        || previous == container
    {
        tracing::debug!(?previous, "previously focused control no longer valid");
        return;
    }

    panel.set_active_child(container, previous);
}
