use std::cmp;
use crate::sat::formula::{LBool, Lit, Var};
use crate::sat::formula::assignment::{Assignment, DecisionLevel, Reason, GROUND_LEVEL};
use crate::sat::formula::clause::{ClauseAllocator, ClauseRef};
use super::budget::Budget;
use super::clause_db::{ClauseDb, ClauseDbSettings};
use super::conflict::{AnalyzeContext, CCMinMode, Conflict};
use super::decision::{DecisionHeuristic, HeuristicSettings};
use super::external::ExternalHook;
use super::luby::luby;
use super::proof::ProofTracer;
use super::watches::Watches;


#[derive(Clone, Copy, Debug)]
pub struct RestartStrategy {
    pub luby_restart: bool,
    pub restart_first: f64, // The initial restart limit.
    pub restart_inc: f64,   // The factor the restart limit is multiplied by on each restart.
}

impl Default for RestartStrategy {
    fn default() -> Self {
        RestartStrategy {
            luby_restart: true,
            restart_first: 100.0,
            restart_inc: 2.0,
        }
    }
}

impl RestartStrategy {
    pub fn conflicts_to_go(&self, restarts: u32) -> u64 {
        let rest_base = if self.luby_restart {
            luby(self.restart_inc, restarts)
        } else {
            self.restart_inc.powi(restarts as i32)
        };

        (rest_base * self.restart_first) as u64
    }
}


#[derive(Clone, Copy, Debug)]
pub struct LearningStrategy {
    pub min_learnts_lim: i32, // Minimum value of the learnt clause limit.
    pub size_factor: f64,     // Initial learnt limit as a factor of the original clause count.
    pub size_inc: f64,        // Growth factor of the learnt limit.
    pub size_adjust_start_confl: i32,
    pub size_adjust_inc: f64,
}

impl Default for LearningStrategy {
    fn default() -> Self {
        LearningStrategy {
            min_learnts_lim: 0,
            size_factor: 1.0 / 3.0,
            size_inc: 1.1,
            size_adjust_start_confl: 100,
            size_adjust_inc: 1.5,
        }
    }
}


/// Tracks the learnt-database size limit, growing it on a geometrically
/// stretched conflict schedule.
struct LearningGuard {
    settings: LearningStrategy,
    max_learnts: f64,
    size_adjust_confl: f64,
    size_adjust_cnt: i32,
}

impl LearningGuard {
    fn new(settings: LearningStrategy) -> Self {
        LearningGuard {
            settings,
            max_learnts: 0.0,
            size_adjust_confl: 0.0,
            size_adjust_cnt: 0,
        }
    }

    fn reset(&mut self, clauses: usize) {
        self.max_learnts = ((clauses as f64) * self.settings.size_factor)
            .max(self.settings.min_learnts_lim as f64);
        self.size_adjust_confl = self.settings.size_adjust_start_confl as f64;
        self.size_adjust_cnt = self.settings.size_adjust_start_confl;
    }

    fn bump(&mut self) -> bool {
        self.size_adjust_cnt -= 1;
        if self.size_adjust_cnt == 0 {
            self.size_adjust_confl *= self.settings.size_adjust_inc;
            self.size_adjust_cnt = self.size_adjust_confl as i32;
            self.max_learnts *= self.settings.size_inc;
            true
        } else {
            false
        }
    }

    fn border(&self) -> f64 {
        self.max_learnts
    }
}


/// Skips redundant top-level simplification runs: nothing can have changed
/// unless the root trail grew or enough propagations went by.
struct SimplifyGuard {
    simp_db_assigns: Option<usize>,
    simp_db_props: u64,
}

impl SimplifyGuard {
    fn new() -> Self {
        SimplifyGuard {
            simp_db_assigns: None,
            simp_db_props: 0,
        }
    }

    fn skip(&self, assigns: usize, propagations: u64) -> bool {
        Some(assigns) == self.simp_db_assigns || propagations < self.simp_db_props
    }

    fn set_next(&mut self, assigns: usize, propagations: u64, prop_limit: u64) {
        self.simp_db_assigns = Some(assigns);
        self.simp_db_props = propagations + prop_limit;
    }
}


#[derive(Clone, Copy, Debug)]
pub struct SearcherSettings {
    pub garbage_frac: f64, // Fraction of wasted arena space that triggers collection.
}

impl Default for SearcherSettings {
    fn default() -> Self {
        SearcherSettings { garbage_frac: 0.20 }
    }
}


#[derive(Default)]
pub struct SearchStats {
    pub solves: u64,
    pub starts: u64,
    pub decisions: u64,
    pub conflicts: u64,
}


pub enum AddClauseRes {
    UnSAT,
    Consumed,
    Added,
}


/// Result of one `solve` pass. `Unsat` means refuted outright (the solver
/// is dead afterwards), `AssumpsUnsat` carries the refuting subset of the
/// assumption literals, `Undef` means a budget ran out.
pub enum SearchOutcome {
    Sat(Vec<LBool>),
    Unsat,
    AssumpsUnsat(Vec<Lit>),
    Undef,
}


enum Episode {
    Restart,
    Sat,
    Unsat,
    AssumpsConfl(Vec<Lit>),
    Interrupted,
}


enum ExternalPhase {
    Idle,
    Progress,
    Conflict(ClauseRef),
    Unsat,
}


enum ExternalClauseRes {
    Dropped,
    Attached,
    Progress,
    Conflict(ClauseRef),
    Unsat,
}


enum ExternalDecide {
    Pass,
    Decision(Lit),
    Restarted,
}


/// The CDCL engine proper: trail, watches, clause database, heuristics and
/// the search loop, below the `ok`-flag facade.
pub struct Searcher {
    pub(crate) settings: SearcherSettings,
    pub(crate) restart: RestartStrategy,
    pub(crate) learn: LearningStrategy,
    pub(crate) ca: ClauseAllocator,
    pub(crate) assigns: Assignment,
    pub(crate) watches: Watches,
    pub(crate) db: ClauseDb,
    pub(crate) heur: DecisionHeuristic,
    pub(crate) analyze: AnalyzeContext,
    simp: SimplifyGuard,
    pub(crate) hook: ExternalHook,
    pub(crate) proof: ProofTracer,
    pub(crate) stats: SearchStats,
}

impl Searcher {
    pub fn new(
        settings: SearcherSettings,
        restart: RestartStrategy,
        learn: LearningStrategy,
        db_settings: ClauseDbSettings,
        heur_settings: HeuristicSettings,
        ccmin_mode: CCMinMode,
    ) -> Self {
        Searcher {
            settings,
            restart,
            learn,
            ca: ClauseAllocator::new(),
            assigns: Assignment::new(),
            watches: Watches::new(),
            db: ClauseDb::new(db_settings),
            heur: DecisionHeuristic::new(heur_settings),
            analyze: AnalyzeContext::new(ccmin_mode),
            simp: SimplifyGuard::new(),
            hook: ExternalHook::new(),
            proof: ProofTracer::new(),
            stats: SearchStats::default(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.assigns.num_vars()
    }

    pub fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.assigns.new_var();
        self.watches.init_var(v);
        self.heur.init_var(v, upol, dvar);
        self.analyze.init_var(v);
        v
    }

    /// Attach a clause at the root. The clause is simplified against the
    /// root trail first; unit clauses are propagated immediately.
    pub fn add_clause(&mut self, clause: &[Lit]) -> AddClauseRes {
        debug_assert!(self.assigns.is_ground_level());

        let ps = {
            let mut ps = clause.to_vec();

            // Sort so duplicate and complementary literals are adjacent,
            // then drop root-false literals:
            ps.sort();
            ps.dedup();

            let mut prev = None;
            for &lit in ps.iter() {
                if self.assigns.value_lit(lit) == LBool::True || prev == Some(!lit) {
                    return AddClauseRes::Consumed;
                }
                prev = Some(lit);
            }

            ps.retain(|&lit| self.assigns.value_lit(lit) != LBool::False);
            ps
        };

        match ps[..] {
            [] => AddClauseRes::UnSAT,

            [unit] => {
                self.assigns.assign(unit, Reason::Decision);
                match self.watches.propagate(&mut self.ca, &mut self.assigns) {
                    None => AddClauseRes::Consumed,
                    Some(_) => AddClauseRes::UnSAT,
                }
            }

            _ => {
                let cr = self.db.add_clause(&mut self.ca, &ps);
                self.watches.watch_clause(self.ca.view(cr), cr);
                AddClauseRes::Added
            }
        }
    }

    pub fn solve(&mut self, budget: &Budget, assumptions: &[Lit]) -> SearchOutcome {
        debug_assert!(self.assigns.is_ground_level());
        self.stats.solves += 1;

        let mut learnt = LearningGuard::new(self.learn);
        learnt.reset(self.db.num_clauses());

        info!("============================[ Search Statistics ]==============================");
        info!("| Conflicts |          ORIGINAL         |          LEARNT          | Progress |");
        info!("|           |    Vars  Clauses Literals |    Limit  Clauses Lit/Cl |          |");
        info!("===============================================================================");

        let mut curr_restarts = 0;
        let outcome = loop {
            let nof_conflicts = self.restart.conflicts_to_go(curr_restarts);
            match self.search_episode(nof_conflicts, budget, &mut learnt, assumptions) {
                Episode::Restart => {
                    curr_restarts += 1;
                }
                Episode::Sat => {
                    break SearchOutcome::Sat(self.total_model());
                }
                Episode::Unsat => {
                    break SearchOutcome::Unsat;
                }
                Episode::AssumpsConfl(conflict) => {
                    break SearchOutcome::AssumpsUnsat(conflict);
                }
                Episode::Interrupted => {
                    break SearchOutcome::Undef;
                }
            }
        };

        info!("===============================================================================");
        self.cancel_until(GROUND_LEVEL);
        outcome
    }

    /// Search until a verdict, a restart limit or an exhausted budget.
    fn search_episode(
        &mut self,
        nof_conflicts: u64,
        budget: &Budget,
        learnt: &mut LearningGuard,
        assumptions: &[Lit],
    ) -> Episode {
        self.stats.starts += 1;
        let confl_limit = self.stats.conflicts + nof_conflicts;
        let mut rejected_model = false;

        loop {
            let mut confl = self.watches.propagate(&mut self.ca, &mut self.assigns);

            if confl.is_none() {
                if !budget.within(self.stats.conflicts, self.watches.propagations) {
                    self.cancel_until(self.assumption_prefix(assumptions));
                    return Episode::Interrupted;
                }

                match self.external_phase() {
                    ExternalPhase::Idle => {}
                    ExternalPhase::Progress => {
                        rejected_model = false;
                        continue;
                    }
                    ExternalPhase::Conflict(cr) => {
                        rejected_model = false;
                        confl = Some(cr);
                    }
                    ExternalPhase::Unsat => return Episode::Unsat,
                }
            }

            if let Some(confl) = confl {
                if !self.handle_conflict(confl, learnt) {
                    return Episode::Unsat;
                }

                if self.stats.conflicts >= confl_limit {
                    self.cancel_until(self.assumption_prefix(assumptions));
                    return Episode::Restart;
                }

                if self.assigns.is_ground_level() && !self.simplify_db() {
                    return Episode::Unsat;
                }

                if (self.db.num_learnts() as f64) - (self.assigns.num_assigns() as f64)
                    >= learnt.border()
                {
                    self.reduce_db();
                }

                continue;
            }

            // Assumption, external or heuristic decision:
            let mut next = None;
            while self.assigns.decision_level().offset() < assumptions.len() {
                let p = assumptions[self.assigns.decision_level().offset()];
                match self.assigns.value_lit(p) {
                    LBool::True => {
                        // Dummy decision level:
                        self.push_level();
                    }
                    LBool::False => {
                        let conflict = self.analyze_final(p);
                        return Episode::AssumpsConfl(conflict);
                    }
                    LBool::Undef => {
                        next = Some(p);
                        break;
                    }
                }
            }

            if next.is_none() {
                match self.external_decide() {
                    ExternalDecide::Restarted => continue,
                    ExternalDecide::Decision(p) => {
                        self.stats.decisions += 1;
                        next = Some(p);
                    }
                    ExternalDecide::Pass => {
                        self.stats.decisions += 1;
                        next = self.heur.pick_branch_lit(&self.assigns);
                    }
                }

                if next.is_none() {
                    // Total assignment; give the propagator the last word.
                    if self.model_confirmed(&mut rejected_model) {
                        return Episode::Sat;
                    }
                    continue;
                }
            }

            let p = next.unwrap();
            self.push_level();
            self.assigns.assign(p, Reason::Decision);
        }
    }

    fn handle_conflict(&mut self, confl: ClauseRef, learnt: &mut LearningGuard) -> bool {
        self.stats.conflicts += 1;
        if self.assigns.is_ground_level() {
            return false;
        }

        match self.analyze(confl) {
            Conflict::Unit(unit) => {
                self.cancel_until(GROUND_LEVEL);
                self.proof.add_clause(&[unit]);
                self.assigns.assign(unit, Reason::Decision);
            }

            Conflict::Learned(level, lits) => {
                self.cancel_until(level);
                self.proof.add_clause(&lits);
                let cr = self.db.learn_clause(&mut self.ca, &lits);
                self.watches.watch_clause(self.ca.view(cr), cr);
                debug_assert!(self.watches.covers(self.ca.view(cr), cr));
                self.assigns.assign(lits[0], Reason::Clause(cr));
            }
        }

        self.heur.decay_activity();
        self.db.decay_activity();

        if learnt.bump() {
            info!(
                "| {:9} | {:7} {:8} {:8} | {:8} {:8} {:6.0} | {:6.3} % |",
                self.stats.conflicts,
                self.heur.dec_vars.saturating_sub(self.assigns.num_ground_assigns()),
                self.db.stats.num_clauses,
                self.db.stats.clauses_literals,
                learnt.border() as u64,
                self.db.stats.num_learnts,
                (self.db.stats.learnts_literals as f64) / (self.db.stats.num_learnts as f64),
                self.assigns.progress_estimate() * 100.0
            );
        }

        true
    }

    fn assumption_prefix(&self, assumptions: &[Lit]) -> DecisionLevel {
        DecisionLevel::from_offset(cmp::min(
            assumptions.len(),
            self.assigns.decision_level().offset(),
        ))
    }

    pub(crate) fn push_level(&mut self) {
        self.assigns.new_decision_level();
        self.hook.on_new_level();
    }

    pub(crate) fn cancel_until(&mut self, target: DecisionLevel) {
        if self.assigns.decision_level() <= target {
            return;
        }

        {
            let heur = &mut self.heur;
            self.assigns
                .cancel_until(target, |lit, top| heur.on_cancel(lit, top));
        }
        self.hook.on_backtrack(target.offset(), self.assigns.num_assigns());
    }

    fn notify_assignments(&mut self) {
        self.hook.drain_notifications(self.assigns.trail());
    }

    /// Poll the external propagator for propagations and injected clauses.
    fn external_phase(&mut self) -> ExternalPhase {
        if !self.hook.connected() {
            return ExternalPhase::Idle;
        }

        let mut progress = false;

        loop {
            self.notify_assignments();
            let p = match self.hook.propagate() {
                None => break,
                Some(p) => p,
            };
            debug_assert!(self.hook.is_observed(p.var()));

            match self.assigns.value_lit(p) {
                LBool::True => {}
                LBool::Undef => {
                    self.assigns.assign(p, Reason::External(p.sign()));
                    progress = true;
                }
                LBool::False => {
                    // The propagation contradicts the assignment; its reason
                    // clause is the conflict.
                    let lits = self.hook.reason_clause(p);
                    let forgettable = self.hook.reasons_forgettable();
                    return match self.integrate_external_clause(lits, forgettable) {
                        ExternalClauseRes::Conflict(cr) => ExternalPhase::Conflict(cr),
                        ExternalClauseRes::Unsat => ExternalPhase::Unsat,
                        _ => ExternalPhase::Progress,
                    };
                }
            }
        }

        loop {
            self.notify_assignments();
            let (lits, forgettable) = match self.hook.next_external_clause() {
                None => break,
                Some(pair) => pair,
            };
            trace!("external clause {:?} (forgettable: {})", lits, forgettable);

            match self.integrate_external_clause(lits, forgettable) {
                ExternalClauseRes::Dropped | ExternalClauseRes::Attached => {}
                ExternalClauseRes::Progress => {
                    progress = true;
                }
                ExternalClauseRes::Conflict(cr) => return ExternalPhase::Conflict(cr),
                ExternalClauseRes::Unsat => return ExternalPhase::Unsat,
            }
        }

        if progress {
            ExternalPhase::Progress
        } else {
            ExternalPhase::Idle
        }
    }

    /// Take a clause handed over mid-search. Root-satisfied clauses and
    /// tautologies are dropped and root-false literals stripped; what is
    /// left may be empty (refutation), a unit (backtrack to the root) or a
    /// proper clause that is attached and may conflict or propagate at the
    /// level it became unit.
    fn integrate_external_clause(
        &mut self,
        mut lits: Vec<Lit>,
        forgettable: bool,
    ) -> ExternalClauseRes {
        self.proof.add_clause(&lits);

        lits.sort();
        lits.dedup();
        let mut prev = None;
        for &l in lits.iter() {
            let root_true = self.assigns.value_lit(l) == LBool::True
                && self.assigns.level(l.var()).is_ground();
            if root_true || prev == Some(!l) {
                return ExternalClauseRes::Dropped;
            }
            prev = Some(l);
        }
        {
            let assigns = &self.assigns;
            lits.retain(|&l| {
                !(assigns.value_lit(l) == LBool::False && assigns.level(l.var()).is_ground())
            });
        }

        match lits[..] {
            [] => ExternalClauseRes::Unsat,

            [unit] => {
                self.cancel_until(GROUND_LEVEL);
                match self.assigns.value_lit(unit) {
                    LBool::False => ExternalClauseRes::Unsat,
                    LBool::True => ExternalClauseRes::Dropped,
                    LBool::Undef => {
                        self.assigns.assign(unit, Reason::Decision);
                        ExternalClauseRes::Progress
                    }
                }
            }

            _ => {
                let cr = if forgettable {
                    self.db.learn_clause(&mut self.ca, &lits)
                } else {
                    self.db.add_clause(&mut self.ca, &lits)
                };

                // Order the watches: non-false literals first, then false
                // ones from the highest level down.
                {
                    let assigns = &self.assigns;
                    self.ca.edit(cr).sort_by_key(|l| {
                        if assigns.value_lit(l) == LBool::False {
                            (1u8, cmp::Reverse(assigns.level(l.var()).offset()))
                        } else {
                            (0u8, cmp::Reverse(0))
                        }
                    });
                }
                self.watches.watch_clause(self.ca.view(cr), cr);

                let (c0, c1) = self.ca.view(cr).watch_pair();
                if self.assigns.value_lit(c1) != LBool::False {
                    return ExternalClauseRes::Attached;
                }

                match self.assigns.value_lit(c0) {
                    LBool::True => ExternalClauseRes::Attached,

                    LBool::False => {
                        // Falsified; handle the conflict where the clause
                        // still is one.
                        let top = self.assigns.level(c0.var());
                        debug_assert!(!top.is_ground());
                        self.cancel_until(top);
                        ExternalClauseRes::Conflict(cr)
                    }

                    LBool::Undef => {
                        // Unit under the assignment; propagate it at the
                        // level it became unit.
                        let unit_level = self.assigns.level(c1.var());
                        self.cancel_until(unit_level);
                        self.assigns.assign(c0, Reason::Clause(cr));
                        ExternalClauseRes::Progress
                    }
                }
            }
        }
    }

    fn external_decide(&mut self) -> ExternalDecide {
        if !self.hook.connected() {
            return ExternalDecide::Pass;
        }

        self.notify_assignments();
        let request = self.hook.decide();

        if let Some(level) = request.force_backtrack {
            let target = DecisionLevel::from_offset(level);
            if target < self.assigns.decision_level() {
                self.cancel_until(target);
                // State changed under the decision; run the loop again and
                // ask anew.
                return ExternalDecide::Restarted;
            }
        }

        match request.decision {
            Some(lit) => {
                debug_assert!(self.hook.is_observed(lit.var()));
                if self.assigns.value_lit(lit) == LBool::Undef {
                    ExternalDecide::Decision(lit)
                } else {
                    ExternalDecide::Pass
                }
            }
            None => ExternalDecide::Pass,
        }
    }

    fn model_confirmed(&mut self, rejected_model: &mut bool) -> bool {
        if !self.hook.connected() {
            return true;
        }

        if *rejected_model {
            debug_assert!(
                false,
                "propagator rejected the model but supplied no clause"
            );
            return true;
        }

        self.notify_assignments();
        let model = self.model_lits();
        if self.hook.check_model(&model) {
            true
        } else {
            *rejected_model = true;
            false
        }
    }

    /// Total assignment for the model: unassigned variables fall back to
    /// the polarity the heuristic would have picked.
    pub(crate) fn total_model(&self) -> Vec<LBool> {
        (0..self.assigns.num_vars())
            .map(|i| {
                let v = Var::from_index(i);
                match self.assigns.value_of(v) {
                    LBool::Undef => self.heur.default_value(v),
                    value => value,
                }
            })
            .collect()
    }

    fn model_lits(&self) -> Vec<Lit> {
        self.total_model()
            .iter()
            .enumerate()
            .map(|(i, &value)| Var::from_index(i).sign_lit(value == LBool::False))
            .collect()
    }

    /// Top-level simplification: propagate the root trail to a fixpoint and
    /// scrub satisfied clauses and root-false literals from the database.
    pub fn simplify_db(&mut self) -> bool {
        debug_assert!(self.assigns.is_ground_level());

        if self.watches.propagate(&mut self.ca, &mut self.assigns).is_some() {
            return false;
        }

        if self.simp.skip(self.assigns.num_assigns(), self.watches.propagations) {
            return true;
        }

        self.db.remove_satisfied(
            &mut self.ca,
            &mut self.assigns,
            &mut self.watches,
            &mut self.proof,
        );
        self.try_garbage_collect();
        self.heur.rebuild_order_heap(&self.assigns);

        self.simp.set_next(
            self.assigns.num_assigns(),
            self.watches.propagations,
            self.db.stats.clauses_literals + self.db.stats.learnts_literals, // (shouldn't depend on stats really, but it will do for now)
        );

        true
    }

    fn reduce_db(&mut self) {
        self.db.reduce(
            &mut self.ca,
            &mut self.assigns,
            &mut self.watches,
            &mut self.proof,
        );
        self.try_garbage_collect();
    }

    fn try_garbage_collect(&mut self) {
        if self.ca.check_garbage(self.settings.garbage_frac) {
            self.garbage_collect();
        }
    }

    /// Compact the arena: copy every clause reachable from the watch lists,
    /// the reasons and the database into a fresh allocator and rewrite all
    /// handles. Runs only between well-defined search steps, never while a
    /// clause reference is held elsewhere.
    fn garbage_collect(&mut self) {
        let mut to = ClauseAllocator::new_for_gc(&self.ca);

        self.watches.reloc_gc(&mut self.ca, &mut to);
        self.assigns.reloc_gc(&mut self.ca, &mut to);
        self.db.reloc_gc(&mut self.ca, &mut to);

        debug!(
            "|  Garbage collection:   {:12} units => {:12} units             |",
            self.ca.size(),
            to.size()
        );
        self.ca = to;
    }
}
