use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

/// Identifies one issued call. Only the ticket of the most recently issued
/// call is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

/// State shared by every hook: the published state, the generation counter
/// that decides which call may settle it, and the teardown flag.
///
/// Generation checks run inside the watch channel's write lock, so a check
/// and the write it guards cannot interleave with a concurrent `begin`.
pub(crate) struct Lifecycle<S> {
    state: watch::Sender<S>,
    generation: AtomicU64,
    torn_down: AtomicBool,
    /// Fingerprint of the dependencies last passed to `effect_with`.
    deps: Mutex<Option<u64>>,
}

impl<S: Clone> Lifecycle<S> {
    pub(crate) fn new(initial: S) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            generation: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
            deps: Mutex::new(None),
        }
    }

    pub(crate) fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Issue a new call, superseding every earlier ticket, and apply
    /// `start` to the state.
    pub(crate) fn begin(&self, start: impl FnOnce(&mut S)) -> Ticket {
        let mut ticket = Ticket(0);
        self.state.send_if_modified(|state| {
            ticket = Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
            if self.is_torn_down() {
                return false;
            }
            start(state);
            true
        });
        ticket
    }

    /// Apply `finish` if `ticket` is still current and the hook is alive.
    /// Returns whether it was applied.
    pub(crate) fn settle(
        &self,
        ticket: Ticket,
        finish: impl FnOnce(&mut S),
    ) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            let current = self.generation.load(Ordering::SeqCst) == ticket.0;
            if current && !self.is_torn_down() {
                finish(state);
                applied = true;
            }
            applied
        });
        if !applied {
            tracing::debug!(generation = ticket.0, "discarding stale result");
        }
        applied
    }

    /// Supersede every in-flight call and apply `reset` to the state.
    pub(crate) fn invalidate(&self, reset: impl FnOnce(&mut S)) {
        self.state.send_if_modified(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            if self.is_torn_down() {
                return false;
            }
            reset(state);
            true
        });
    }

    pub(crate) fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    /// Record `deps` and report whether they differ from the previous
    /// call. The first call always reports a change.
    pub(crate) fn deps_changed<D: Hash + ?Sized>(&self, deps: &D) -> bool {
        let mut hasher = DefaultHasher::new();
        deps.hash(&mut hasher);
        let fingerprint = hasher.finish();

        let mut last = self.deps.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = *last != Some(fingerprint);
        *last = Some(fingerprint);
        changed
    }
}

/// Runs `abandon` when dropped, unless disarmed first. Moved into a call's
/// future so that dropping the future before it settles still clears
/// `loading`.
pub(crate) struct CallGuard<F: FnOnce()> {
    abandon: Option<F>,
}

impl<F: FnOnce()> CallGuard<F> {
    pub(crate) fn new(abandon: F) -> Self {
        Self {
            abandon: Some(abandon),
        }
    }

    /// The call finished; it settles through the normal path.
    pub(crate) fn disarm(mut self) {
        self.abandon = None;
    }
}

impl<F: FnOnce()> Drop for CallGuard<F> {
    fn drop(&mut self) {
        if let Some(abandon) = self.abandon.take() {
            abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_latest_ticket_settles() {
        let lifecycle = Lifecycle::new(0);
        let first = lifecycle.begin(|_| {});
        let second = lifecycle.begin(|_| {});

        assert!(!lifecycle.settle(first, |n| *n = 1));
        assert_eq!(lifecycle.snapshot(), 0);
        assert!(lifecycle.settle(second, |n| *n = 2));
        assert_eq!(lifecycle.snapshot(), 2);
    }

    #[test]
    fn invalidate_supersedes_in_flight_calls() {
        let lifecycle = Lifecycle::new(5);
        let ticket = lifecycle.begin(|n| *n = 6);
        lifecycle.invalidate(|n| *n = 0);

        assert!(!lifecycle.settle(ticket, |n| *n = 7));
        assert_eq!(lifecycle.snapshot(), 0);
    }

    #[test]
    fn nothing_is_written_after_teardown() {
        let lifecycle = Lifecycle::new(1);
        let ticket = lifecycle.begin(|n| *n = 2);
        lifecycle.teardown();

        assert!(!lifecycle.settle(ticket, |n| *n = 3));
        lifecycle.invalidate(|n| *n = 0);
        lifecycle.begin(|n| *n = 4);
        assert_eq!(lifecycle.snapshot(), 2);
    }

    #[tokio::test]
    async fn subscribers_see_each_transition() {
        let lifecycle = Lifecycle::new(0);
        let mut changes = lifecycle.subscribe();

        let ticket = lifecycle.begin(|n| *n = 1);
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), 1);

        lifecycle.settle(ticket, |n| *n = 2);
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), 2);
    }

    #[test]
    fn guard_runs_only_when_not_disarmed() {
        let lifecycle = Lifecycle::new(false);
        let ticket = lifecycle.begin(|loading| *loading = true);

        let guard = CallGuard::new(|| {
            lifecycle.settle(ticket, |loading| *loading = false);
        });
        drop(guard);
        assert!(!lifecycle.snapshot());

        let ticket = lifecycle.begin(|loading| *loading = true);
        let guard = CallGuard::new(|| {
            lifecycle.settle(ticket, |loading| *loading = false);
        });
        guard.disarm();
        assert!(lifecycle.snapshot());
    }

    #[test]
    fn deps_fingerprint() {
        let lifecycle = Lifecycle::new(());
        assert!(lifecycle.deps_changed(&("permits", 1)));
        assert!(!lifecycle.deps_changed(&("permits", 1)));
        assert!(lifecycle.deps_changed(&("permits", 2)));
        assert!(lifecycle.deps_changed(&("permits", 1)));
    }
}
