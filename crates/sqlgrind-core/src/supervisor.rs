//! Resource-bounded execution supervisor.
//!
//! Every harness invocation creates one [`Supervisor`] and registers its
//! [`Supervisor::on_progress`] with the engine's periodic progress callback.
//! Three guards can end a scenario early, each sufficient on its own:
//!
//! 1. a wall-clock deadline fixed at construction,
//! 2. a ceiling on engine-attributed memory, sampled at each callback,
//! 3. a budget of result rows, decremented as statements produce output.
//!
//! An abort is not an error. The engine interrupts the in-flight statement,
//! the executor stops submitting ops, and the entry point proceeds to
//! teardown. The first cause to fire is latched for the run report.
//!
//! State is shared with the engine's `'static` callback closures via `Arc`
//! and atomics; there is no locking on the callback path.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::report::SupervisorReport;

/// Budgets for one harness invocation.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Wall-clock budget for the whole invocation.
    pub time_budget: Duration,
    /// Ceiling on engine-attributed memory, in bytes.
    pub memory_ceiling: i64,
    /// Result rows processed before the throttle fires.
    pub row_budget: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(10),
            memory_ceiling: 25_000_000,
            row_budget: 64,
        }
    }
}

/// Which guard ended the scenario early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortCause {
    Deadline,
    MemoryCeiling,
    RowBudget,
}

const CAUSE_NONE: u8 = 0;
const CAUSE_DEADLINE: u8 = 1;
const CAUSE_MEMORY: u8 = 2;
const CAUSE_ROWS: u8 = 3;

/// Shared cutoff state for one invocation.
#[derive(Debug)]
pub struct Supervisor {
    started: Instant,
    deadline: Instant,
    memory_ceiling: i64,
    rows_remaining: AtomicI64,
    callbacks: AtomicU64,
    last_callback_us: AtomicU64,
    max_gap_us: AtomicU64,
    peak_memory: AtomicI64,
    cause: AtomicU8,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Arc<Self> {
        let started = Instant::now();
        Arc::new(Self {
            started,
            deadline: started + config.time_budget,
            memory_ceiling: config.memory_ceiling,
            rows_remaining: AtomicI64::new(i64::from(config.row_budget)),
            callbacks: AtomicU64::new(0),
            last_callback_us: AtomicU64::new(0),
            max_gap_us: AtomicU64::new(0),
            peak_memory: AtomicI64::new(0),
            cause: AtomicU8::new(CAUSE_NONE),
        })
    }

    /// Progress-callback body. `memory_used` is the engine's current
    /// allocation total; the caller samples it because memory attribution
    /// is an engine concern, not a supervisor one.
    ///
    /// Returns `true` when the in-flight operation must abort.
    pub fn on_progress(&self, memory_used: i64) -> bool {
        let now = Instant::now();
        let now_us = duration_us(now.duration_since(self.started));
        let prev_us = self.last_callback_us.swap(now_us, Ordering::Relaxed);
        self.max_gap_us
            .fetch_max(now_us.saturating_sub(prev_us), Ordering::Relaxed);
        self.callbacks.fetch_add(1, Ordering::Relaxed);
        self.peak_memory.fetch_max(memory_used, Ordering::Relaxed);

        if now >= self.deadline {
            self.latch(CAUSE_DEADLINE);
            return true;
        }
        if memory_used > self.memory_ceiling {
            self.latch(CAUSE_MEMORY);
            return true;
        }
        // A latched row-budget abort keeps interrupting until teardown.
        self.cause.load(Ordering::Relaxed) != CAUSE_NONE
    }

    /// Charge one produced row against the budget.
    ///
    /// Returns `false` once the budget is exhausted; exhaustion is latched
    /// and treated exactly like a time or memory abort.
    pub fn consume_row(&self) -> bool {
        let prev = self.rows_remaining.fetch_sub(1, Ordering::Relaxed);
        if prev <= 1 {
            self.latch(CAUSE_ROWS);
            return false;
        }
        true
    }

    /// Checked by the executor between ops, so an abort that fired inside
    /// one statement also stops the rest of the plan.
    pub fn should_abort(&self) -> bool {
        if self.cause.load(Ordering::Relaxed) != CAUSE_NONE {
            return true;
        }
        if Instant::now() >= self.deadline {
            self.latch(CAUSE_DEADLINE);
            return true;
        }
        false
    }

    pub fn abort_cause(&self) -> Option<AbortCause> {
        match self.cause.load(Ordering::Relaxed) {
            CAUSE_DEADLINE => Some(AbortCause::Deadline),
            CAUSE_MEMORY => Some(AbortCause::MemoryCeiling),
            CAUSE_ROWS => Some(AbortCause::RowBudget),
            _ => None,
        }
    }

    pub fn report(&self) -> SupervisorReport {
        SupervisorReport {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            max_callback_gap_us: self.max_gap_us.load(Ordering::Relaxed),
            peak_memory_bytes: self.peak_memory.load(Ordering::Relaxed),
            elapsed_us: duration_us(self.started.elapsed()),
            abort: self.abort_cause(),
        }
    }

    fn latch(&self, cause: u8) {
        // First cause wins; later guards firing do not overwrite it.
        let _ = self.cause.compare_exchange(
            CAUSE_NONE,
            cause,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }
}

fn duration_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(time: Duration, memory: i64, rows: u32) -> SupervisorConfig {
        SupervisorConfig {
            time_budget: time,
            memory_ceiling: memory,
            row_budget: rows,
        }
    }

    #[test]
    fn deadline_guard_fires_and_latches() {
        let sup = Supervisor::new(config(Duration::ZERO, i64::MAX, 100));
        assert!(sup.on_progress(0));
        assert_eq!(sup.abort_cause(), Some(AbortCause::Deadline));
    }

    #[test]
    fn memory_guard_fires_independently_of_time() {
        let sup = Supervisor::new(config(Duration::from_secs(600), 1_000, 100));
        assert!(!sup.on_progress(999));
        assert!(sup.on_progress(1_001));
        assert_eq!(sup.abort_cause(), Some(AbortCause::MemoryCeiling));
    }

    #[test]
    fn row_budget_exhaustion_aborts_like_the_other_guards() {
        let sup = Supervisor::new(config(Duration::from_secs(600), i64::MAX, 2));
        assert!(sup.consume_row());
        assert!(!sup.consume_row());
        assert_eq!(sup.abort_cause(), Some(AbortCause::RowBudget));
        // Once latched, the progress callback keeps interrupting.
        assert!(sup.on_progress(0));
        assert!(sup.should_abort());
    }

    #[test]
    fn first_cause_wins() {
        let sup = Supervisor::new(config(Duration::from_secs(600), 1_000, 1));
        assert!(!sup.consume_row());
        assert!(sup.on_progress(2_000));
        assert_eq!(sup.abort_cause(), Some(AbortCause::RowBudget));
    }

    #[test]
    fn callbacks_and_gaps_are_tracked() {
        let sup = Supervisor::new(config(Duration::from_secs(600), i64::MAX, 100));
        assert!(!sup.on_progress(10));
        std::thread::sleep(Duration::from_millis(2));
        assert!(!sup.on_progress(20));
        let report = sup.report();
        assert_eq!(report.callbacks, 2);
        assert!(report.max_callback_gap_us >= 1_000);
        assert_eq!(report.peak_memory_bytes, 20);
        assert_eq!(report.abort, None);
    }

    #[test]
    fn healthy_run_never_aborts() {
        let sup = Supervisor::new(SupervisorConfig::default());
        for _ in 0..10 {
            assert!(!sup.on_progress(100));
        }
        assert!(!sup.should_abort());
        assert_eq!(sup.abort_cause(), None);
    }
}
