//! Run/pause/stop coordination between the CPU and renderer threads.

use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, Clone, Copy)]
struct State {
    running: bool,
    paused: bool,
}

/// One mutex + condvar guard the run and pause flags. The CPU thread
/// parks on the condvar while paused; stop wakes everything so both
/// threads exit at their next loop iteration.
pub struct RunControl {
    state: Mutex<State>,
    cond: Condvar,
}

impl RunControl {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                running: true,
                paused: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Request shutdown and wake any paused thread.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.running = false;
        self.cond.notify_all();
    }

    /// Flip the pause flag; resuming broadcasts to the parked CPU thread.
    pub fn toggle_pause(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.paused = !state.paused;
        self.cond.notify_all();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .paused
    }

    /// CPU thread gate: blocks while paused, returns false once stopped.
    pub fn wait_while_paused(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while state.paused && state.running {
            state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.running
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_running_unpaused() {
        let run = RunControl::new();
        assert!(run.is_running());
        assert!(!run.is_paused());
        assert!(run.wait_while_paused());
    }

    #[test]
    fn stop_is_observed() {
        let run = RunControl::new();
        run.stop();
        assert!(!run.is_running());
        assert!(!run.wait_while_paused());
    }

    #[test]
    fn stop_wakes_a_paused_thread() {
        let run = Arc::new(RunControl::new());
        run.toggle_pause();

        let waiter = {
            let run = Arc::clone(&run);
            thread::spawn(move || run.wait_while_paused())
        };

        thread::sleep(Duration::from_millis(20));
        run.stop();

        assert!(!waiter.join().expect("waiter panicked"));
    }

    #[test]
    fn unpause_wakes_a_paused_thread() {
        let run = Arc::new(RunControl::new());
        run.toggle_pause();

        let waiter = {
            let run = Arc::clone(&run);
            thread::spawn(move || run.wait_while_paused())
        };

        thread::sleep(Duration::from_millis(20));
        run.toggle_pause();

        assert!(waiter.join().expect("waiter panicked"));
    }
}
