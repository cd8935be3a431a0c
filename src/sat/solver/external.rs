use crate::sat::formula::{Lit, Var, VarMap};


/// Callback interface for an external propagator (IPASIR-UP style). The
/// solver invokes these synchronously from the search loop, never from
/// inside unit propagation. Callbacks must return promptly and must not
/// assume they see every intermediate solver state: assignment
/// notifications are batched and only cover observed variables.
pub trait ExternalPropagator {
    /// Whether lazily requested reason clauses may later be evicted by
    /// database reduction.
    fn reasons_forgettable(&self) -> bool {
        false
    }

    /// Observed-variable literals appended to the trail since the last
    /// notification, in trail order.
    fn notify_assignment(&mut self, lits: &[Lit]);

    fn notify_new_decision_level(&mut self);

    fn notify_backtrack(&mut self, new_level: usize);

    /// The search found a total assignment. Returning `false` rejects it;
    /// the propagator is then expected to supply a falsifying clause through
    /// `cb_has_external_clause` on the next poll.
    fn cb_check_found_model(&mut self, model: &[Lit]) -> bool;

    /// Optional decision override; `decision: None` defers to the solver.
    /// A forced backtrack is only expressible here, as part of the returned
    /// value: the solver cancels to the requested level before deciding.
    fn cb_decide(&mut self) -> ExternalDecision {
        ExternalDecision::default()
    }

    /// Polled until `None`; each literal is enqueued with an external
    /// reason, to be materialized on demand via `cb_add_reason_clause_lit`.
    fn cb_propagate(&mut self) -> Option<Lit> {
        None
    }

    /// Drained literal-by-literal until `None` when conflict analysis needs
    /// the reason of an external propagation. The clause must contain the
    /// propagated literal.
    fn cb_add_reason_clause_lit(&mut self, propagated: Lit) -> Option<Lit> {
        let _ = propagated;
        None
    }

    /// `Some(is_forgettable)` when the propagator has a clause to inject;
    /// its literals are then drained via `cb_add_external_clause_lit`.
    fn cb_has_external_clause(&mut self) -> Option<bool>;

    fn cb_add_external_clause_lit(&mut self) -> Option<Lit>;
}


/// Result of `cb_decide`. `force_backtrack` asks the solver to cancel to
/// that level (and re-emit `notify_backtrack`) before the decision is made.
#[derive(Default, Clone, Copy, Debug)]
pub struct ExternalDecision {
    pub force_backtrack: Option<usize>,
    pub decision: Option<Lit>,
}

impl ExternalDecision {
    pub fn decide(lit: Lit) -> ExternalDecision {
        ExternalDecision {
            force_backtrack: None,
            decision: Some(lit),
        }
    }
}


/// Solver-side state of the external connection: the propagator itself, the
/// observed-variable set and the high-water mark of notified trail entries.
pub struct ExternalHook {
    propagator: Option<Box<dyn ExternalPropagator>>,
    observed: VarMap<bool>,
    notify_head: usize,
}

impl ExternalHook {
    pub fn new() -> ExternalHook {
        ExternalHook {
            propagator: None,
            observed: VarMap::new(),
            notify_head: 0,
        }
    }

    pub fn connect(&mut self, propagator: Box<dyn ExternalPropagator>) {
        self.propagator = Some(propagator);
        self.notify_head = 0;
    }

    pub fn disconnect(&mut self) -> Option<Box<dyn ExternalPropagator>> {
        self.propagator.take()
    }

    #[inline]
    pub fn connected(&self) -> bool {
        self.propagator.is_some()
    }

    pub fn observe(&mut self, v: Var) {
        debug_assert!(self.connected(), "observing a variable requires a connected propagator");
        self.observed.insert(v, true);
    }

    pub fn unobserve(&mut self, v: Var) {
        self.observed.remove(v);
    }

    #[inline]
    pub fn is_observed(&self, v: Var) -> bool {
        self.observed.get(v).cloned().unwrap_or(false)
    }

    pub fn reasons_forgettable(&self) -> bool {
        match self.propagator {
            Some(ref p) => p.reasons_forgettable(),
            None => false,
        }
    }

    /// Report observed-variable assignments made since the last call, in
    /// trail order.
    pub fn drain_notifications(&mut self, trail: &[Lit]) {
        let head = self.notify_head;
        self.notify_head = trail.len();

        let observed = &self.observed;
        let p = match self.propagator {
            Some(ref mut p) => p,
            None => return,
        };

        let fresh: Vec<Lit> = trail[head..]
            .iter()
            .cloned()
            .filter(|l| observed.get(l.var()).cloned().unwrap_or(false))
            .collect();
        if !fresh.is_empty() {
            p.notify_assignment(&fresh);
        }
    }

    pub fn on_new_level(&mut self) {
        if let Some(ref mut p) = self.propagator {
            p.notify_new_decision_level();
        }
    }

    pub fn on_backtrack(&mut self, new_level: usize, trail_len: usize) {
        self.notify_head = self.notify_head.min(trail_len);
        if let Some(ref mut p) = self.propagator {
            p.notify_backtrack(new_level);
        }
    }

    pub fn check_model(&mut self, model: &[Lit]) -> bool {
        match self.propagator {
            Some(ref mut p) => p.cb_check_found_model(model),
            None => true,
        }
    }

    pub fn decide(&mut self) -> ExternalDecision {
        match self.propagator {
            Some(ref mut p) => p.cb_decide(),
            None => ExternalDecision::default(),
        }
    }

    pub fn propagate(&mut self) -> Option<Lit> {
        self.propagator.as_mut().and_then(|p| p.cb_propagate())
    }

    /// Pull the complete reason clause of an external propagation and
    /// normalize it so the propagated literal sits in slot 0.
    pub fn reason_clause(&mut self, propagated: Lit) -> Vec<Lit> {
        let mut lits = Vec::new();
        if let Some(ref mut p) = self.propagator {
            while let Some(l) = p.cb_add_reason_clause_lit(propagated) {
                lits.push(l);
            }
        }

        match lits.iter().position(|&l| l == propagated) {
            Some(i) => lits.swap(0, i),
            None => {
                debug_assert!(false, "external reason clause misses its literal");
                lits.insert(0, propagated);
            }
        }
        lits
    }

    /// `Some((lits, is_forgettable))` if the propagator wants to inject a
    /// clause.
    pub fn next_external_clause(&mut self) -> Option<(Vec<Lit>, bool)> {
        let p = self.propagator.as_mut()?;
        let forgettable = p.cb_has_external_clause()?;
        let mut lits = Vec::new();
        while let Some(l) = p.cb_add_external_clause_lit() {
            lits.push(l);
        }
        Some((lits, forgettable))
    }
}
