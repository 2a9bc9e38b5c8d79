//! Restartable interval timer.
//!
//! Time is injected as a millisecond timestamp so the timer works the
//! same against `esp_timer_get_time()` on the device and synthetic clocks
//! in tests.  Reporting "elapsed" re-arms the timer from that instant.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    period_ms: u64,
    started_at_ms: Option<u64>,
}

impl IntervalTimer {
    /// A disarmed timer; [`poll`](Self::poll) returns `false` until
    /// [`restart`](Self::restart) is called.
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            started_at_ms: None,
        }
    }

    pub fn restart(&mut self, now_ms: u64) {
        self.started_at_ms = Some(now_ms);
    }

    pub fn stop(&mut self) {
        self.started_at_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Returns `true` once per period and restarts the timer when it does.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.started_at_ms {
            Some(start) if now_ms.saturating_sub(start) >= self.period_ms => {
                self.started_at_ms = Some(now_ms);
                true
            }
            _ => false,
        }
    }
}
