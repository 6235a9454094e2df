//! Rate limiting for repeated log lines.
//!
//! A daemon that retries forever can log the same failure every cycle.
//! [`LogThrottle`] lets the first occurrence of a key through, suppresses
//! repeats inside a window, and reports how many were suppressed when the
//! window lapses.

use std::collections::HashMap;

use stakeward_types::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Log it.
    Emit,
    /// Log it, and mention that `suppressed` repeats were hidden.
    EmitAfterSuppressed { suppressed: u64 },
    /// Skip it.
    Suppress,
}

impl ThrottleDecision {
    pub fn should_emit(&self) -> bool {
        !matches!(self, ThrottleDecision::Suppress)
    }
}

#[derive(Debug)]
struct Window {
    opened_at: Timestamp,
    suppressed: u64,
}

#[derive(Debug)]
pub struct LogThrottle {
    window_secs: u64,
    windows: HashMap<String, Window>,
}

impl LogThrottle {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            windows: HashMap::new(),
        }
    }

    pub fn observe(&mut self, key: &str, now: Timestamp) -> ThrottleDecision {
        match self.windows.get_mut(key) {
            Some(w) if !w.opened_at.has_expired(self.window_secs, now) => {
                w.suppressed += 1;
                ThrottleDecision::Suppress
            }
            Some(w) => {
                let suppressed = std::mem::take(&mut w.suppressed);
                w.opened_at = now;
                if suppressed == 0 {
                    ThrottleDecision::Emit
                } else {
                    ThrottleDecision::EmitAfterSuppressed { suppressed }
                }
            }
            None => {
                self.windows.insert(
                    key.to_string(),
                    Window {
                        opened_at: now,
                        suppressed: 0,
                    },
                );
                ThrottleDecision::Emit
            }
        }
    }

    /// Forget `key`, e.g. once the failure it tracks has cleared.
    pub fn reset(&mut self, key: &str) {
        self.windows.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_is_emitted() {
        let mut t = LogThrottle::new(600);
        assert_eq!(t.observe("a", Timestamp::new(0)), ThrottleDecision::Emit);
        assert_eq!(t.observe("b", Timestamp::new(1)), ThrottleDecision::Emit);
    }

    #[test]
    fn repeats_inside_window_are_suppressed_then_summarised() {
        let mut t = LogThrottle::new(600);
        t.observe("a", Timestamp::new(0));
        assert_eq!(t.observe("a", Timestamp::new(120)), ThrottleDecision::Suppress);
        assert_eq!(t.observe("a", Timestamp::new(240)), ThrottleDecision::Suppress);
        assert_eq!(
            t.observe("a", Timestamp::new(601)),
            ThrottleDecision::EmitAfterSuppressed { suppressed: 2 }
        );
        assert_eq!(t.observe("a", Timestamp::new(700)), ThrottleDecision::Suppress);
    }

    #[test]
    fn quiet_window_emits_plainly() {
        let mut t = LogThrottle::new(60);
        t.observe("a", Timestamp::new(0));
        assert_eq!(t.observe("a", Timestamp::new(61)), ThrottleDecision::Emit);
    }

    #[test]
    fn reset_forgets_key() {
        let mut t = LogThrottle::new(600);
        t.observe("a", Timestamp::new(0));
        t.reset("a");
        assert_eq!(t.observe("a", Timestamp::new(1)), ThrottleDecision::Emit);
    }
}
