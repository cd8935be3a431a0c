use std::{fs, io, path};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::sat::{SolveResult, Stats};
use crate::sat::formula::{LBool, Lit, Var};

pub use self::clause_db::ClauseDbSettings;
pub use self::conflict::CCMinMode;
pub use self::decision::{HeuristicSettings, PhaseSaving};
pub use self::external::{ExternalDecision, ExternalPropagator};
pub use self::search::{LearningStrategy, RestartStrategy, SearcherSettings};

use self::budget::Budget;
use self::search::{AddClauseRes, SearchOutcome, Searcher};

mod budget;
mod clause_db;
mod conflict;
mod decision;
mod external;
mod luby;
mod proof;
mod random;
mod search;
mod watches;


#[derive(Clone, Copy, Debug, Default)]
pub struct Settings {
    pub heur: HeuristicSettings,
    pub db: ClauseDbSettings,
    pub restart: RestartStrategy,
    pub learn: LearningStrategy,
    pub ccmin_mode: CCMinMode,
    pub core: SearcherSettings,
}


/// The incremental solver surface. Holds the `ok` latch, the budgets and the
/// results of the last `solve`; everything else lives in the search engine.
///
/// A solver is always at decision level zero between public calls.
pub struct Solver {
    ok: bool, // If false the formula is refuted; only trivial answers remain.
    search: Searcher,
    budget: Budget,
    model: Vec<LBool>,
    conflict: Vec<Lit>,
}

impl Default for Solver {
    fn default() -> Self {
        Solver::new(Settings::default())
    }
}

impl Solver {
    pub fn new(settings: Settings) -> Self {
        Solver {
            ok: true,
            search: Searcher::new(
                settings.core,
                settings.restart,
                settings.learn,
                settings.db,
                settings.heur,
                settings.ccmin_mode,
            ),
            budget: Budget::new(),
            model: Vec::new(),
            conflict: Vec::new(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.search.num_vars()
    }

    pub fn num_clauses(&self) -> usize {
        self.search.db.num_clauses()
    }

    pub fn num_learnts(&self) -> usize {
        self.search.db.num_learnts()
    }

    pub fn okay(&self) -> bool {
        self.ok
    }


    pub fn new_var(&mut self) -> Var {
        self.new_var_with(None, true)
    }

    pub fn new_var_with(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        self.search.new_var(upol, dvar)
    }

    /// Give up a variable: assert it with the given polarity and withdraw it
    /// from branching. Observed variables must stay intact.
    pub fn release_var(&mut self, lit: Lit) {
        debug_assert!(self.search.assigns.is_ground_level());
        debug_assert!(
            !self.search.hook.is_observed(lit.var()),
            "released an observed variable"
        );
        if self.add_clause(&[lit]) {
            self.search.heur.set_decision_var(lit.var(), false);
        }
    }

    pub fn set_polarity(&mut self, v: Var, pol: Option<bool>) {
        self.search.heur.set_user_polarity(v, pol);
    }

    pub fn set_decision_var(&mut self, v: Var, dvar: bool) {
        self.search.heur.set_decision_var(v, dvar);
    }


    /// Add a clause at the root level. Returns false iff the formula became
    /// trivially unsatisfiable.
    pub fn add_clause(&mut self, clause: &[Lit]) -> bool {
        if self.ok {
            self.search.proof.add_clause(clause);
            if let AddClauseRes::UnSAT = self.search.add_clause(clause) {
                self.flag_unsat();
            }
        }
        self.ok
    }

    /// Propagate and scrub the database at the root. Returns false iff the
    /// formula was refuted in the process.
    pub fn simplify(&mut self) -> bool {
        if self.ok && !self.search.simplify_db() {
            self.flag_unsat();
        }
        self.ok
    }

    pub fn solve(&mut self, assumptions: &[Lit]) -> SolveResult {
        self.model.clear();
        self.conflict.clear();

        if !self.ok {
            return SolveResult::Unsat;
        }

        match self.search.solve(&self.budget, assumptions) {
            SearchOutcome::Sat(model) => {
                self.model = model;
                SolveResult::Sat
            }

            SearchOutcome::Unsat => {
                self.flag_unsat();
                SolveResult::Unsat
            }

            SearchOutcome::AssumpsUnsat(conflict) => {
                self.conflict = conflict;
                SolveResult::Unsat
            }

            SearchOutcome::Undef => SolveResult::Unknown,
        }
    }

    /// Total assignment found by the last successful `solve`; empty
    /// otherwise.
    pub fn model(&self) -> &[LBool] {
        &self.model
    }

    pub fn model_value(&self, lit: Lit) -> LBool {
        match self.model.get(lit.var().index()) {
            Some(&value) => lit.apply_sign(value),
            None => LBool::Undef,
        }
    }

    /// After UNSAT under assumptions: a subset of the assumption literals
    /// that is inconsistent with the formula.
    pub fn conflict(&self) -> &[Lit] {
        &self.conflict
    }

    pub fn stats(&self) -> Stats {
        Stats {
            solves: self.search.stats.solves,
            restarts: self.search.stats.starts,
            decisions: self.search.stats.decisions,
            rnd_decisions: self.search.heur.rnd_decisions,
            conflicts: self.search.stats.conflicts,
            propagations: self.search.watches.propagations,
            tot_literals: self.search.analyze.tot_literals,
            del_literals: self.search.analyze.max_literals - self.search.analyze.tot_literals,
        }
    }


    pub fn set_conf_budget(&mut self, budget: i64) {
        self.budget.set_conf_budget(budget);
    }

    pub fn set_prop_budget(&mut self, budget: i64) {
        self.budget.set_prop_budget(budget);
    }

    pub fn budget_off(&mut self) {
        self.budget.off();
    }

    /// Shared flag for asynchronous interruption; the running search polls
    /// it with an acquire load at the top of each iteration.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.budget.interrupt_flag()
    }

    pub fn interrupt(&self) {
        self.budget.interrupt();
    }

    pub fn clear_interrupt(&self) {
        self.budget.clear_interrupt();
    }


    pub fn connect_external_propagator(&mut self, propagator: Box<dyn ExternalPropagator>) {
        self.search.hook.connect(propagator);
    }

    pub fn disconnect_external_propagator(&mut self) -> Option<Box<dyn ExternalPropagator>> {
        self.search.hook.disconnect()
    }

    /// Mark a variable as observed by the external propagator; observed
    /// variables are frozen and survive simplification untouched.
    pub fn add_observed_var(&mut self, v: Var) {
        self.search.hook.observe(v);
    }

    /// Only legal between `solve` calls.
    pub fn remove_observed_var(&mut self, v: Var) {
        self.search.hook.unobserve(v);
    }

    pub fn is_observed(&self, v: Var) -> bool {
        self.search.hook.is_observed(v)
    }


    /// Start emitting a DRAT trace to `path`; an earlier trace is closed.
    pub fn trace_proof<P: AsRef<path::Path>>(&mut self, path: P) -> io::Result<()> {
        self.search.proof.open(path)
    }

    /// Dump the current database in DIMACS form: live clauses with
    /// root-false literals stripped, plus units for the root trail and the
    /// given assumptions, densely renumbered. A refuted solver prints the
    /// canonical empty problem.
    pub fn to_dimacs<P: AsRef<path::Path>>(
        &mut self,
        path: P,
        assumptions: &[Lit],
    ) -> io::Result<()> {
        let mut out = io::BufWriter::new(fs::File::create(path)?);

        if !self.simplify() {
            return writeln!(out, "p cnf 0 1\n0");
        }

        let assigns = &self.search.assigns;
        let ca = &self.search.ca;

        let mut clauses: Vec<Vec<Lit>> = Vec::new();
        for &cr in self.search.db.clauses() {
            if ca.is_deleted(cr) {
                continue;
            }
            let c = ca.view(cr);
            if c.lits().iter().any(|&l| assigns.value_lit(l) == LBool::True) {
                continue;
            }
            clauses.push(
                c.lits()
                    .iter()
                    .cloned()
                    .filter(|&l| assigns.value_lit(l) != LBool::False)
                    .collect(),
            );
        }
        for &lit in assigns.trail() {
            clauses.push(vec![lit]);
        }
        for &lit in assumptions {
            clauses.push(vec![lit]);
        }

        let mut renumber: HashMap<Var, i32> = HashMap::new();
        for clause in clauses.iter() {
            for lit in clause.iter() {
                let next = (renumber.len() + 1) as i32;
                renumber.entry(lit.var()).or_insert(next);
            }
        }

        writeln!(out, "p cnf {} {}", renumber.len(), clauses.len())?;
        for clause in clauses.iter() {
            for &lit in clause.iter() {
                let id = renumber[&lit.var()];
                write!(out, "{} ", if lit.sign() { -id } else { id })?;
            }
            writeln!(out, "0")?;
        }
        Ok(())
    }


    fn flag_unsat(&mut self) {
        if self.ok {
            self.ok = false;
            self.search.proof.unsat();
        }
    }
}
