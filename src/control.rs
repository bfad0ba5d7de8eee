//! Cooperative cancellation for long-running searches. Algorithms poll
//! a `RunControl` between bounded quanta of work; there are no
//! suspension points inside the hot loops.

use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// External cancellation handle, shared between the caller and any
/// number of solver runs.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Number of units of work between token/deadline checks. One unit is
/// a discharge, a BFS dequeue or a relaxation, depending on the
/// algorithm.
pub const CHECK_QUANTUM: u32 = 64;

/// Folds the caller's timeout and cancel token into one interruption
/// test. The interrupted state latches: once a run is interrupted,
/// every later poll reports it so no further sub-phase starts.
#[derive(Debug, Default)]
pub struct RunControl {
    deadline: Option<Instant>,
    token: Option<CancelToken>,
    countdown: u32,
    interrupted: bool,
}

impl RunControl {
    pub fn new(timeout: Option<Duration>, token: Option<CancelToken>) -> Self {
        Self {
            deadline: timeout.map(|limit| Instant::now() + limit),
            token,
            countdown: 0,
            interrupted: false,
        }
    }

    /// A control that never interrupts; the iteration cap still binds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Counts one unit of work and, once per quantum, consults the
    /// deadline and the token.
    pub fn interrupted(&mut self) -> bool {
        if self.interrupted {
            return true;
        }
        if self.countdown > 0 {
            self.countdown -= 1;
            return false;
        }
        self.countdown = CHECK_QUANTUM - 1;
        if let Some(token) = &self.token
            && token.is_canceled()
        {
            debug!("run canceled by token");
            self.interrupted = true;
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            debug!("run hit its deadline");
            self.interrupted = true;
        }
        self.interrupted
    }

    /// Latch state without counting work; used when an outer loop
    /// surfaces a sub-phase's cancellation.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }
}
