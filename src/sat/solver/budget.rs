use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};


/// Resource constraints for a solve. Budgets are absolute upper bounds on
/// the lifetime conflict and propagation counters; a negative budget means
/// unlimited. The interrupt flag may be written from another thread (e.g. a
/// signal handler); everything else belongs to the owning solver.
pub struct Budget {
    conflict_budget: i64,
    propagation_budget: i64,
    interrupt: Arc<AtomicBool>,
}

impl Budget {
    pub fn new() -> Budget {
        Budget {
            conflict_budget: -1,
            propagation_budget: -1,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_conf_budget(&mut self, budget: i64) {
        self.conflict_budget = budget;
    }

    pub fn set_prop_budget(&mut self, budget: i64) {
        self.propagation_budget = budget;
    }

    pub fn off(&mut self) {
        self.conflict_budget = -1;
        self.propagation_budget = -1;
    }

    pub fn within(&self, conflicts: u64, propagations: u64) -> bool {
        !self.interrupt.load(Ordering::Acquire)
            && (self.conflict_budget < 0 || conflicts < self.conflict_budget as u64)
            && (self.propagation_budget < 0 || propagations < self.propagation_budget as u64)
    }

    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Release);
    }

    pub fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::Release);
    }

    /// Shared handle for asynchronous interruption.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_limits() {
        let mut budget = Budget::new();
        assert!(budget.within(u64::max_value(), u64::max_value()));

        budget.set_conf_budget(10);
        assert!(budget.within(9, 0));
        assert!(!budget.within(10, 0));

        budget.set_prop_budget(100);
        assert!(!budget.within(0, 100));

        budget.off();
        assert!(budget.within(u64::max_value(), u64::max_value()));
    }

    #[test]
    fn test_interrupt() {
        let budget = Budget::new();
        let flag = budget.interrupt_flag();

        flag.store(true, std::sync::atomic::Ordering::Release);
        assert!(!budget.within(0, 0));

        budget.clear_interrupt();
        assert!(budget.within(0, 0));
    }
}
