//! Rate limiting for viewport recomputation during continuous camera moves.

/// Lets at most one recomputation through per interval while the camera is
/// moving. The settle event always goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportThrottle {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl ViewportThrottle {
    /// Throttle with the given minimum interval.
    #[must_use]
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// Whether a move event at `now_ms` should recompute.
    pub const fn on_move(&mut self, now_ms: u64) -> bool {
        let due = match self.last_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };
        if due {
            self.last_ms = Some(now_ms);
        }
        due
    }

    /// The camera settled. Always recomputes and starts a fresh window.
    pub const fn on_move_end(&mut self) -> bool {
        self.last_ms = None;
        true
    }
}
