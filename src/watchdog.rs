use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::panel::{ControlId, HostPanel};

/// Default budget for a focus claim before it is declared stuck.
pub const DEFAULT_CLAIM_BUDGET: Duration = Duration::from_secs(1);

/// Result of a guarded focus claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The control cannot currently accept focus; nothing was attempted.
    NotSelectable,
    /// The claim completed within the budget.
    Claimed,
    /// The claim did not return in time and was abandoned.
    Abandoned,
}

/// Guards a focus claim against the deadlock some toolkits can enter when
/// forcing focus onto a control.
///
/// When enabled, the claim runs on a short-lived helper thread while the
/// caller waits with a bounded budget; a claim that does not return in
/// time is abandoned with a warning and the caller continues. The decision
/// between "abandoned" and "completed" is made exactly once per attempt by
/// a tri-state [`ThreadGuard`], so a claim that finished is never treated
/// as stuck. When disabled, the claim is a direct inline call.
#[derive(Clone)]
pub struct SelectWatchdog {
    enabled: bool,
    budget: Duration,
}

impl SelectWatchdog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            budget: DEFAULT_CLAIM_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn claim_focus(&self, panel: &Arc<dyn HostPanel>, control: ControlId) -> ClaimOutcome {
        if !panel.can_select(control) {
            return ClaimOutcome::NotSelectable;
        }

        if !self.enabled {
            panel.select(control);
            return ClaimOutcome::Claimed;
        }

        let guard = Arc::new(ThreadGuard::new());
        let (done_tx, done_rx) = mpsc::channel();
        let claim_panel = Arc::clone(panel);
        let claim_guard = Arc::clone(&guard);
        thread::Builder::new()
            .name("busy-overlay-select".into())
            .spawn(move || {
                claim_panel.select(control);
                if claim_guard.mark_completed() {
                    let _ = done_tx.send(());
                }
            })
            .expect("failed to spawn select thread");

        match done_rx.recv_timeout(self.budget) {
            Ok(()) => ClaimOutcome::Claimed,
            Err(RecvTimeoutError::Timeout) => {
                if guard.request_abandon() {
                    tracing::warn!(
                        ?control,
                        budget_ms = self.budget.as_millis() as u64,
                        "focus claim did not return in time, abandoning (possible \
                         deadlock in the toolkit's select)"
                    );
                    ClaimOutcome::Abandoned
                } else {
                    // Completed right at the deadline; the signal is queued.
                    let _ = done_rx.recv();
                    ClaimOutcome::Claimed
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!(?control, "focus claim thread terminated abnormally");
                ClaimOutcome::Abandoned
            }
        }
    }
}

const IDLE: i8 = 0;
const ABANDON_REQUESTED: i8 = 1;
const ABANDON_NOT_ALLOWED: i8 = -1;

/// Per-attempt tri-state deciding who owns the outcome of a focus claim:
/// idle → abandon-requested (watchdog won) or idle → abandon-not-allowed
/// (claim completed first). Exactly one transition away from idle happens.
struct ThreadGuard {
    state: AtomicI8,
}

impl ThreadGuard {
    fn new() -> Self {
        Self {
            state: AtomicI8::new(IDLE),
        }
    }

    /// Watchdog side: claim the right to abandon. False when the claim
    /// already completed.
    fn request_abandon(&self) -> bool {
        self.state
            .compare_exchange(IDLE, ABANDON_REQUESTED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Claim side: mark completion. False when the watchdog already
    /// abandoned the attempt and nobody is listening for the result.
    fn mark_completed(&self) -> bool {
        self.state
            .compare_exchange(IDLE, ABANDON_NOT_ALLOWED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
