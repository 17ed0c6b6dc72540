use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline and cancellation signal for long stochastic searches.
///
/// Loops poll [`SearchControl::should_stop`]; a stopped search returns the
/// best result found so far rather than an error.
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl SearchControl {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    /// Optional time budget in milliseconds, as carried on serde inputs.
    pub fn with_budget_ms(self, budget_ms: Option<u64>) -> Self {
        match budget_ms {
            Some(ms) => self.with_deadline(Duration::from_millis(ms)),
            None => self,
        }
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn should_stop(&self) -> bool {
        if let Some(ref flag) = self.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }
}
