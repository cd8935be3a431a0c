use crate::sat::formula::{LBool, Lit, Var, VarMap};
use crate::sat::formula::assignment::{DecisionLevel, Reason};
use crate::sat::formula::clause::ClauseRef;
use super::search::Searcher;


#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CCMinMode {
    None,
    Basic,
    Deep,
}

impl Default for CCMinMode {
    fn default() -> Self {
        CCMinMode::Deep
    }
}


#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[repr(u8)]
enum Seen {
    Undef = 0,
    Source = 1,
}


/// A conflict digested into an asserting clause. `Unit` backjumps to the
/// root; `Learned` carries the backjump level and the clause with the
/// asserting literal in slot 0 and a highest-level literal in slot 1.
pub enum Conflict {
    Unit(Lit),
    Learned(DecisionLevel, Vec<Lit>),
}


/// Scratch state of conflict analysis, kept across conflicts to avoid
/// reallocation, plus the literal counters feeding the deleted-% statistic.
pub struct AnalyzeContext {
    ccmin_mode: CCMinMode,
    seen: VarMap<Seen>,
    toclear: Vec<Lit>,
    pub max_literals: u64,
    pub tot_literals: u64,
}

impl AnalyzeContext {
    pub fn new(ccmin_mode: CCMinMode) -> AnalyzeContext {
        AnalyzeContext {
            ccmin_mode,
            seen: VarMap::new(),
            toclear: Vec::new(),
            max_literals: 0,
            tot_literals: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.seen.insert(v, Seen::Undef);
    }
}

#[inline]
fn abstract_level(level: DecisionLevel) -> u32 {
    1 << (level.offset() & 31)
}


impl Searcher {
    /// Reason of the trail literal `p`, materializing it first if `p` was
    /// propagated externally: the propagator is asked for the clause, which
    /// is interned with `p` in slot 0 and patched in as the real reason.
    pub(crate) fn lazy_reason(&mut self, p: Lit) -> ClauseRef {
        debug_assert_eq!(self.assigns.value_lit(p), LBool::True);
        match self.assigns.reason(p.var()) {
            Reason::Clause(cr) => cr,

            Reason::External(_) => {
                let lits = self.hook.reason_clause(p);
                self.proof.add_clause(&lits);
                let cr = if self.hook.reasons_forgettable() {
                    self.db.learn_clause(&mut self.ca, &lits)
                } else {
                    self.db.add_clause(&mut self.ca, &lits)
                };
                if lits.len() > 1 {
                    self.watches.watch_clause(self.ca.view(cr), cr);
                }
                self.assigns.set_reason(p.var(), Reason::Clause(cr));
                cr
            }

            Reason::Decision => unreachable!("asked for the reason of a decision"),
        }
    }

    /// First-UIP conflict analysis.
    ///
    /// Pre-condition: the decision level is above the root and every literal
    /// of `confl0` is false. Post-condition: the returned clause is
    /// asserting after backjumping to the returned level.
    pub(crate) fn analyze(&mut self, confl0: ClauseRef) -> Conflict {
        debug_assert!(!self.assigns.is_ground_level());
        let mut out_learnt: Vec<Lit> = Vec::new();

        {
            let current_level = self.assigns.decision_level();
            let mut confl = confl0;
            let mut path_c = 0i32;
            let mut index = self.assigns.trail().len();
            let mut skip_head = false;

            loop {
                self.db.bump_activity(&mut self.ca, confl);

                let len = self.ca.view(confl).len();
                for k in (skip_head as usize)..len {
                    let q = self.ca.view(confl)[k];
                    let v = q.var();
                    if self.analyze.seen[v] == Seen::Undef {
                        let level = self.assigns.level(v);
                        if !level.is_ground() {
                            self.analyze.seen[v] = Seen::Source;
                            self.heur.bump_activity(v);
                            if level >= current_level {
                                path_c += 1;
                            } else {
                                out_learnt.push(q);
                            }
                        }
                    }
                }

                // Select the next trail literal taking part in the resolution:
                let pl = loop {
                    index -= 1;
                    let lit = self.assigns.trail()[index];
                    if self.analyze.seen[lit.var()] != Seen::Undef {
                        break lit;
                    }
                };

                self.analyze.seen[pl.var()] = Seen::Undef;
                path_c -= 1;
                if path_c <= 0 {
                    // `pl` is the first UIP.
                    out_learnt.insert(0, !pl);
                    break;
                }

                confl = self.lazy_reason(pl);
                skip_head = true;
            }
        }

        // Minimize the learnt clause:
        self.analyze.toclear = out_learnt.clone();
        self.analyze.max_literals += out_learnt.len() as u64;
        match self.analyze.ccmin_mode {
            CCMinMode::Deep => {
                let abstract_levels = out_learnt[1..]
                    .iter()
                    .fold(0u32, |m, &l| m | abstract_level(self.assigns.level(l.var())));

                let mut j = 1;
                for i in 1..out_learnt.len() {
                    let l = out_learnt[i];
                    if !self.lit_redundant(l, abstract_levels) {
                        out_learnt[j] = l;
                        j += 1;
                    }
                }
                out_learnt.truncate(j);
            }

            CCMinMode::Basic => {
                let mut j = 1;
                for i in 1..out_learnt.len() {
                    let l = out_learnt[i];
                    if !self.lit_redundant_basic(l) {
                        out_learnt[j] = l;
                        j += 1;
                    }
                }
                out_learnt.truncate(j);
            }

            CCMinMode::None => {}
        }
        self.analyze.tot_literals += out_learnt.len() as u64;

        for i in 0..self.analyze.toclear.len() {
            let v = self.analyze.toclear[i].var();
            self.analyze.seen[v] = Seen::Undef;
        }
        self.analyze.toclear.clear();

        // Find the backjump level:
        if out_learnt.len() == 1 {
            Conflict::Unit(out_learnt[0])
        } else {
            // Swap a literal from the next-highest level into slot 1:
            let mut max_i = 1;
            let mut max_level = self.assigns.level(out_learnt[1].var());
            for i in 2..out_learnt.len() {
                let level = self.assigns.level(out_learnt[i].var());
                if level > max_level {
                    max_i = i;
                    max_level = level;
                }
            }

            out_learnt.swap(1, max_i);
            Conflict::Learned(max_level, out_learnt)
        }
    }

    /// Can `lit` be dropped from the learnt clause? True iff every path from
    /// its antecedents leads into literals that are already in the clause or
    /// assigned at the root. The abstract level mask cheaply rules out
    /// subtrees touching levels the clause does not mention.
    fn lit_redundant(&mut self, lit: Lit, abstract_levels: u32) -> bool {
        if self.assigns.reason(lit.var()) == Reason::Decision {
            return false;
        }

        let top = self.analyze.toclear.len();
        let mut stack = vec![lit];
        while let Some(p) = stack.pop() {
            let cr = self.lazy_reason(!p);
            let len = self.ca.view(cr).len();
            for k in 1..len {
                let q = self.ca.view(cr)[k];
                let v = q.var();
                if self.analyze.seen[v] != Seen::Undef || self.assigns.level(v).is_ground() {
                    continue;
                }

                if self.assigns.reason(v) != Reason::Decision
                    && (abstract_level(self.assigns.level(v)) & abstract_levels) != 0
                {
                    self.analyze.seen[v] = Seen::Source;
                    stack.push(q);
                    self.analyze.toclear.push(q);
                } else {
                    // Not redundant; undo the marks of this probe.
                    for i in top..self.analyze.toclear.len() {
                        let u = self.analyze.toclear[i].var();
                        self.analyze.seen[u] = Seen::Undef;
                    }
                    self.analyze.toclear.truncate(top);
                    return false;
                }
            }
        }

        true
    }

    fn lit_redundant_basic(&mut self, lit: Lit) -> bool {
        if self.assigns.reason(lit.var()) == Reason::Decision {
            return false;
        }

        let cr = self.lazy_reason(!lit);
        let len = self.ca.view(cr).len();
        for k in 1..len {
            let q = self.ca.view(cr)[k];
            if self.analyze.seen[q.var()] == Seen::Undef && !self.assigns.level(q.var()).is_ground() {
                return false;
            }
        }
        true
    }

    /// Express a failed assumption in terms of the assumptions it rests on.
    /// `failed` is an assumption literal that is false under the current
    /// (assumption-prefix) trail; the result is the subset of assumption
    /// literals, `failed` included, that together refute the formula.
    pub(crate) fn analyze_final(&mut self, failed: Lit) -> Vec<Lit> {
        let mut out = vec![failed];
        if self.assigns.is_ground_level() {
            return out;
        }

        self.analyze.seen[failed.var()] = Seen::Source;

        let ground = self.assigns.num_ground_assigns();
        for index in (ground..self.assigns.trail().len()).rev() {
            let lit = self.assigns.trail()[index];
            let v = lit.var();
            if self.analyze.seen[v] == Seen::Undef {
                continue;
            }

            match self.assigns.reason(v) {
                Reason::Decision => {
                    // Decisions above the root are assumptions here.
                    debug_assert!(!self.assigns.level(v).is_ground());
                    out.push(lit);
                }
                _ => {
                    let cr = self.lazy_reason(lit);
                    let len = self.ca.view(cr).len();
                    for k in 1..len {
                        let q = self.ca.view(cr)[k];
                        if !self.assigns.level(q.var()).is_ground() {
                            self.analyze.seen[q.var()] = Seen::Source;
                        }
                    }
                }
            }
            self.analyze.seen[v] = Seen::Undef;
        }

        self.analyze.seen[failed.var()] = Seen::Undef;
        out
    }
}
