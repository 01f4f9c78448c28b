//! Debounced button input
//!
//! Edge events arrive from interrupt context (or a task waiting on the pin), presses are
//! consumed by the controller loop. Both sides go through a critical section so an edge
//! landing while a press is being taken can never leave a half updated button.
//!
//! A press is accepted only when at least the debounce window has passed since the last
//! *accepted* edge. Rejected bounces do not move the reference point, so a bounce train
//! cannot postpone acceptance of the next real press.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::{Duration, Instant};

/// Physical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    /// Toggle recording
    A,
    /// Mount / unmount storage
    B,
}

impl ButtonId {
    const fn index(self) -> usize {
        match self {
            ButtonId::A => 0,
            ButtonId::B => 1,
        }
    }
}

/// Per button debounce state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ButtonState {
    pending: bool,
    last_event: Option<Instant>,
}

impl ButtonState {
    const fn new() -> Self {
        Self {
            pending: false,
            last_event: None,
        }
    }
}

/// Tracks at most one pending press per button
pub struct InputTracker {
    buttons: Mutex<CriticalSectionRawMutex, Cell<[ButtonState; 2]>>,
    debounce: Duration,
}

impl InputTracker {
    pub const fn new(debounce: Duration) -> Self {
        Self {
            buttons: Mutex::new(Cell::new([ButtonState::new(); 2])),
            debounce,
        }
    }

    /// Records an edge on `id`. Returns whether it was accepted as a press.
    pub fn on_edge(&self, id: ButtonId, now: Instant) -> bool {
        self.buttons.lock(|cell| {
            let mut buttons = cell.get();
            let button = &mut buttons[id.index()];
            let accepted = match button.last_event {
                None => true,
                Some(last) => now.saturating_duration_since(last) >= self.debounce,
            };
            if accepted {
                button.pending = true;
                button.last_event = Some(now);
                cell.set(buttons);
            }
            accepted
        })
    }

    /// Returns and clears the pending press of `id`
    pub fn take_pressed(&self, id: ButtonId) -> bool {
        self.buttons.lock(|cell| {
            let mut buttons = cell.get();
            let pending = core::mem::replace(&mut buttons[id.index()].pending, false);
            cell.set(buttons);
            pending
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn first_edge_is_accepted() {
        let tracker = InputTracker::new(Duration::from_millis(200));
        assert!(tracker.on_edge(ButtonId::A, at(5)));
        assert!(tracker.take_pressed(ButtonId::A));
    }

    #[test]
    fn press_is_consumed_once() {
        let tracker = InputTracker::new(Duration::from_millis(200));
        tracker.on_edge(ButtonId::A, at(0));
        assert!(tracker.take_pressed(ButtonId::A));
        assert!(!tracker.take_pressed(ButtonId::A));
        assert!(!tracker.take_pressed(ButtonId::A));
    }

    #[test]
    fn bounce_train_collapses_into_one_press() {
        let tracker = InputTracker::new(Duration::from_millis(200));
        let accepted: usize = [0, 3, 9, 40, 120, 199]
            .iter()
            .filter(|&&ms| tracker.on_edge(ButtonId::A, at(ms)))
            .count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn rejected_edges_do_not_postpone_acceptance() {
        let tracker = InputTracker::new(Duration::from_millis(200));
        assert!(tracker.on_edge(ButtonId::B, at(1_000)));
        assert!(!tracker.on_edge(ButtonId::B, at(1_150)));
        assert!(!tracker.on_edge(ButtonId::B, at(1_190)));
        // 200 ms after the accepted edge, not after the last bounce
        assert!(tracker.on_edge(ButtonId::B, at(1_200)));
    }

    #[test]
    fn buttons_are_independent() {
        let tracker = InputTracker::new(Duration::from_millis(200));
        assert!(tracker.on_edge(ButtonId::A, at(100)));
        assert!(tracker.on_edge(ButtonId::B, at(150)));
        assert!(tracker.take_pressed(ButtonId::B));
        assert!(tracker.take_pressed(ButtonId::A));
    }

    #[test]
    fn unconsumed_presses_do_not_stack() {
        let tracker = InputTracker::new(Duration::from_millis(200));
        tracker.on_edge(ButtonId::A, at(0));
        tracker.on_edge(ButtonId::A, at(300));
        tracker.on_edge(ButtonId::A, at(600));
        assert!(tracker.take_pressed(ButtonId::A));
        assert!(!tracker.take_pressed(ButtonId::A));
    }
}
