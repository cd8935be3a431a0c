use std::cmp::Ordering;
use crate::sat::formula::{LBool, Lit};
use crate::sat::formula::assignment::{Assignment, Reason};
use crate::sat::formula::clause::{ClauseAllocator, ClauseRef};
use super::proof::ProofTracer;
use super::watches::Watches;


#[derive(Clone, Copy, Debug)]
pub struct ClauseDbSettings {
    pub remove_satisfied: bool, // Perform the linear satisfied-clause scan in `simplify`.
    pub clause_decay: f64,
}

impl Default for ClauseDbSettings {
    fn default() -> ClauseDbSettings {
        ClauseDbSettings {
            remove_satisfied: true,
            clause_decay: 0.999,
        }
    }
}


#[derive(Clone, Copy, Debug, Default)]
pub struct DbStats {
    pub num_clauses: usize,
    pub num_learnts: usize,
    pub clauses_literals: u64,
    pub learnts_literals: u64,
}

impl DbStats {
    fn add(&mut self, learnt: bool, len: usize) {
        if learnt {
            self.num_learnts += 1;
            self.learnts_literals += len as u64;
        } else {
            self.num_clauses += 1;
            self.clauses_literals += len as u64;
        }
    }

    fn del(&mut self, learnt: bool, len: usize) {
        if learnt {
            self.num_learnts -= 1;
            self.learnts_literals -= len as u64;
        } else {
            self.num_clauses -= 1;
            self.clauses_literals -= len as u64;
        }
    }
}


/// The clause database: the irredundant problem clauses and the learnt
/// (forgettable) clauses, with activity-driven eviction of the latter.
pub struct ClauseDb {
    pub settings: ClauseDbSettings,
    cla_inc: f64, // Amount to bump next clause with.
    clauses: Vec<ClauseRef>,
    learnts: Vec<ClauseRef>,
    pub stats: DbStats,
}

impl ClauseDb {
    pub fn new(settings: ClauseDbSettings) -> ClauseDb {
        ClauseDb {
            settings,
            cla_inc: 1.0,
            clauses: Vec::new(),
            learnts: Vec::new(),
            stats: DbStats::default(),
        }
    }

    pub fn add_clause(&mut self, ca: &mut ClauseAllocator, lits: &[Lit]) -> ClauseRef {
        let cr = ca.alloc(lits, false);
        self.stats.add(false, lits.len());
        self.clauses.push(cr);
        cr
    }

    pub fn learn_clause(&mut self, ca: &mut ClauseAllocator, lits: &[Lit]) -> ClauseRef {
        let cr = ca.alloc(lits, true);
        self.stats.add(true, lits.len());
        self.learnts.push(cr);
        self.bump_activity(ca, cr);
        cr
    }

    pub fn bump_activity(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        let bumped = {
            let c = ca.edit(cr);
            if !c.is_learnt() {
                return;
            }
            let bumped = (c.activity() as f64) + self.cla_inc;
            c.set_activity(bumped as f32);
            bumped
        };

        if bumped > 1e20 {
            // Rescale:
            self.cla_inc *= 1e-20;
            for &cri in self.learnts.iter() {
                let c = ca.edit(cri);
                let scaled = (c.activity() as f64) * 1e-20;
                c.set_activity(scaled as f32);
            }
        }
    }

    pub fn decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.settings.clause_decay;
    }

    pub fn num_clauses(&self) -> usize {
        self.stats.num_clauses
    }

    pub fn num_learnts(&self) -> usize {
        self.learnts.len()
    }

    pub fn clauses(&self) -> &[ClauseRef] {
        &self.clauses
    }

    /// Evict roughly half of the learnt clauses, lowest activity first.
    /// Binary clauses and clauses currently acting as a reason survive.
    pub fn reduce(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &mut Assignment,
        watches: &mut Watches,
        proof: &mut ProofTracer,
    ) {
        self.learnts.sort_by(|&rx, &ry| {
            let x = ca.view(rx);
            let y = ca.view(ry);
            if x.len() == 2 && y.len() == 2 {
                Ordering::Equal
            } else if x.len() == 2 {
                Ordering::Greater
            } else if y.len() == 2 {
                Ordering::Less
            } else {
                x.activity().partial_cmp(&y.activity()).unwrap()
            }
        });

        let index_lim = self.learnts.len() / 2;
        let extra_lim = self.cla_inc / (self.learnts.len() as f64); // Below this activity clauses go regardless.

        let old = std::mem::replace(&mut self.learnts, Vec::new());
        let mut kept = Vec::with_capacity(old.len());
        for (i, cr) in old.into_iter().enumerate() {
            if ca.is_deleted(cr) {
                continue;
            }

            let evict = {
                let c = ca.view(cr);
                c.len() > 2
                    && !assigns.is_locked(ca, cr)
                    && (i < index_lim || (c.activity() as f64) < extra_lim)
            };

            if evict {
                let (learnt, len) = {
                    let c = ca.view(cr);
                    proof.delete_clause(c.lits());
                    watches.unwatch_clause_lazy(c);
                    (c.is_learnt(), c.len())
                };
                self.stats.del(learnt, len);
                ca.free(cr);
            } else {
                kept.push(cr);
            }
        }
        self.learnts = kept;
    }

    /// Top-level simplification: drop clauses satisfied at the root and
    /// strip root-false literals from the rest. Requires a propagation
    /// fixpoint at decision level zero.
    pub fn remove_satisfied(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &mut Assignment,
        watches: &mut Watches,
        proof: &mut ProofTracer,
    ) {
        debug_assert!(assigns.is_ground_level());

        let mut sweep = |list: &mut Vec<ClauseRef>, stats: &mut DbStats| {
            let old = std::mem::replace(list, Vec::new());
            for cr in old.into_iter() {
                if ca.is_deleted(cr) {
                    continue;
                }

                let satisfied = ca
                    .view(cr)
                    .lits()
                    .iter()
                    .any(|&l| assigns.value_lit(l) == LBool::True);

                if satisfied {
                    {
                        let c = ca.view(cr);
                        stats.del(c.is_learnt(), c.len());
                        proof.delete_clause(c.lits());
                        if c.len() > 1 {
                            watches.unwatch_clause_lazy(c);
                        }
                    }
                    if assigns.is_locked(ca, cr) {
                        let v = ca.view(cr).head().var();
                        assigns.set_reason(v, Reason::Decision);
                    }
                    ca.free(cr);
                    continue;
                }

                // At a root fixpoint the watched pair of an unsatisfied
                // clause is unassigned; false literals can only hide behind
                // it.
                let before = ca.view(cr).len();
                if before > 2 {
                    let original: Vec<Lit> = ca.view(cr).lits().to_vec();
                    let c = ca.edit(cr);
                    debug_assert!({
                        let (c0, c1) = c.watch_pair();
                        assigns.is_undef(c0.var()) && assigns.is_undef(c1.var())
                    });
                    c.retain_suffix(2, |l| assigns.value_lit(l) != LBool::False);
                    let after = c.len();
                    if after < before {
                        proof.add_clause(c.lits());
                        proof.delete_clause(&original);
                        stats.del(c.is_learnt(), before);
                        stats.add(c.is_learnt(), after);
                        ca.note_shrunk(before - after);
                    }
                }
                list.push(cr);
            }
        };

        sweep(&mut self.learnts, &mut self.stats);
        if self.settings.remove_satisfied {
            sweep(&mut self.clauses, &mut self.stats);
        }
    }

    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for list in &mut [&mut self.learnts, &mut self.clauses] {
            let mut j = 0;
            for i in 0..list.len() {
                if let Some(cr) = from.reloc_to(to, list[i]) {
                    list[j] = cr;
                    j += 1;
                }
            }
            list.truncate(j);
        }
    }
}
