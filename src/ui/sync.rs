use super::pair::PanelSide;
use super::panel::{LinePanel, ScrollChanged};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Re-entrancy flag for scroll propagation. Held for the duration of one
/// propagation; a second acquire while held fails.
#[derive(Debug, Default)]
pub struct SyncGuard {
    held: AtomicBool,
}

impl SyncGuard {
    pub fn try_acquire(&self) -> Option<SyncToken<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SyncToken { guard: self })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Releases the guard on drop.
#[derive(Debug)]
pub struct SyncToken<'a> {
    guard: &'a SyncGuard,
}

impl Drop for SyncToken<'_> {
    fn drop(&mut self) {
        self.guard.held.store(false, Ordering::Release);
    }
}

/// Mirrors scroll percentage from one panel onto the other.
#[derive(Debug, Default)]
pub struct ScrollSynchronizer {
    guard: SyncGuard,
    propagations: AtomicUsize,
    suppressed: AtomicUsize,
}

impl ScrollSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the notification `changed` raised by `source`. Returns true
    /// when the other panel was updated and a redraw is due.
    pub fn on_scroll_changed(
        &self,
        source: PanelSide,
        changed: ScrollChanged,
        panels: &mut [LinePanel; 2],
    ) -> bool {
        let Some(_token) = self.guard.try_acquire() else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let target = source.other();
        let echo = panels[target.index()].set_scroll_percent(changed.percent);
        // The held guard swallows the target's own notification.
        self.on_scroll_changed(target, echo, panels);

        self.propagations.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn is_syncing(&self) -> bool {
        self.guard.is_held()
    }

    pub fn propagations(&self) -> usize {
        self.propagations.load(Ordering::Relaxed)
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed.load(Ordering::Relaxed)
    }
}
