//! Single-flight run state.

use std::sync::atomic::{AtomicBool, Ordering};

/// Installer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing running; an install or update may start.
    Idle,

    /// An interview is in progress.
    Running,
}

/// Atomic `Idle -> Running -> Idle` state shared by an installer and its
/// current session.
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
}

impl RunState {
    /// Create an idle run state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition `Idle -> Running`. Returns `false` if already running.
    pub fn try_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Transition back to `Idle`.
    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        if self.is_running() {
            Phase::Running
        } else {
            Phase::Idle
        }
    }

    /// Check if an interview is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_transitions() {
        let state = RunState::new();
        assert_eq!(state.phase(), Phase::Idle);

        assert!(state.try_start());
        assert_eq!(state.phase(), Phase::Running);
        assert!(!state.try_start());

        state.finish();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.try_start());
    }

    #[test]
    fn test_only_one_thread_starts() {
        let state = Arc::new(RunState::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.try_start())
            })
            .collect();

        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|started| *started)
            .count();
        assert_eq!(started, 1);
    }
}
