use std::{cmp, fmt};
use super::{LBool, Lit, Var};
use super::clause::{ClauseAllocator, ClauseRef};


#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct DecisionLevel(usize);

pub const GROUND_LEVEL: DecisionLevel = DecisionLevel(0);

impl DecisionLevel {
    #[inline]
    pub fn from_offset(offset: usize) -> DecisionLevel {
        DecisionLevel(offset)
    }

    #[inline]
    pub fn offset(self) -> usize {
        self.0
    }

    #[inline]
    pub fn is_ground(self) -> bool {
        self.0 == 0
    }
}


/// Why a variable holds its value. `Decision` also covers unassigned
/// variables and root-level facts; `External` defers to the connected
/// propagator, which is asked for the actual clause only if conflict
/// analysis ever needs it (the bool is the propagated literal's sign).
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Reason {
    Decision,
    Clause(ClauseRef),
    External(bool),
}


pub struct VarData {
    pub reason: Reason,
    pub level: DecisionLevel,
}


struct VarLine {
    value: LBool,
    vd: VarData,
}


/// The assignment trail: variable values, the order they were asserted in,
/// the decision-level separators and the propagation queue head.
pub struct Assignment {
    lines: Vec<VarLine>,
    free_vars: Vec<Var>,
    trail: Vec<Lit>,
    lim: Vec<usize>,
    qhead: usize,
}

impl Assignment {
    pub fn new() -> Assignment {
        Assignment {
            lines: Vec::new(),
            free_vars: Vec::new(),
            trail: Vec::new(),
            lim: Vec::new(),
            qhead: 0,
        }
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn num_assigns(&self) -> usize {
        self.trail.len()
    }

    #[inline]
    pub fn num_ground_assigns(&self) -> usize {
        match self.lim.first() {
            Some(&lim) => lim,
            None => self.trail.len(),
        }
    }

    pub fn new_var(&mut self) -> Var {
        let line = VarLine {
            value: LBool::Undef,
            vd: VarData {
                reason: Reason::Decision,
                level: GROUND_LEVEL,
            },
        };

        match self.free_vars.pop() {
            Some(var) => {
                self.lines[var.index()] = line;
                var
            }
            None => {
                self.lines.push(line);
                Var::from_index(self.lines.len() - 1)
            }
        }
    }

    pub fn free_var(&mut self, v: Var) {
        debug_assert!(self.lines[v.index()].value.is_undef());
        self.free_vars.push(v);
    }


    #[inline]
    pub fn decision_level(&self) -> DecisionLevel {
        DecisionLevel(self.lim.len())
    }

    #[inline]
    pub fn is_ground_level(&self) -> bool {
        self.lim.is_empty()
    }

    #[inline]
    pub fn new_decision_level(&mut self) {
        self.lim.push(self.trail.len());
    }


    #[inline]
    pub fn value_of(&self, v: Var) -> LBool {
        self.lines[v.index()].value
    }

    #[inline]
    pub fn value_lit(&self, lit: Lit) -> LBool {
        lit.apply_sign(self.lines[lit.var().index()].value)
    }

    #[inline]
    pub fn is_undef(&self, v: Var) -> bool {
        self.lines[v.index()].value.is_undef()
    }


    #[inline]
    pub fn assign(&mut self, lit: Lit, reason: Reason) {
        let level = DecisionLevel(self.lim.len());
        let line = &mut self.lines[lit.var().index()];
        debug_assert!(line.value.is_undef());
        line.value = lit.var_value();
        line.vd.level = level;
        line.vd.reason = reason;
        self.trail.push(lit);
    }

    /// Undo the trail down to `target_level`. `f` sees every retracted
    /// literal, newest first, with a flag telling whether it belonged to the
    /// level the search was at when the cancel started.
    pub fn cancel_until<F: FnMut(Lit, bool)>(&mut self, target_level: DecisionLevel, mut f: F) {
        let top = self.lim.len();
        while self.lim.len() > target_level.0 {
            let bottom = self.lim.pop().unwrap();
            let at_top = self.lim.len() + 1 == top;
            while self.trail.len() > bottom {
                let lit = self.trail.pop().unwrap();
                f(lit, at_top);

                let line = &mut self.lines[lit.var().index()];
                line.value = LBool::Undef;
                line.vd.reason = Reason::Decision;
            }
        }

        self.qhead = cmp::min(self.qhead, self.trail.len());
    }


    #[inline]
    pub fn dequeue(&mut self) -> Option<Lit> {
        if self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            Some(p)
        } else {
            None
        }
    }

    #[inline]
    pub fn dequeue_all(&mut self) {
        self.qhead = self.trail.len();
    }


    #[inline]
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// Trail literals above the given level, oldest first.
    pub fn trail_above(&self, level: DecisionLevel) -> &[Lit] {
        if self.lim.len() > level.0 {
            &self.trail[self.lim[level.0]..]
        } else {
            &[]
        }
    }


    #[inline]
    pub fn vardata(&self, v: Var) -> &VarData {
        debug_assert!(!self.lines[v.index()].value.is_undef());
        &self.lines[v.index()].vd
    }

    #[inline]
    pub fn reason(&self, v: Var) -> Reason {
        self.lines[v.index()].vd.reason
    }

    #[inline]
    pub fn level(&self, v: Var) -> DecisionLevel {
        self.lines[v.index()].vd.level
    }

    #[inline]
    pub fn set_reason(&mut self, v: Var, reason: Reason) {
        self.lines[v.index()].vd.reason = reason;
    }

    /// A clause is locked while it is the reason of its own head literal;
    /// locked clauses must survive database reduction.
    pub fn is_locked(&self, ca: &ClauseAllocator, cr: ClauseRef) -> bool {
        let head = ca.view(cr).head();
        let line = &self.lines[head.var().index()];
        line.value == head.var_value() && line.vd.reason == Reason::Clause(cr)
    }

    /// Rough measure of how constrained the search currently is, used for
    /// progress reporting only.
    pub fn progress_estimate(&self) -> f64 {
        let f = 1.0 / (self.num_vars() as f64);
        let mut progress = 0.0;

        let levels = self.lim.len();
        for level in 0..levels + 1 {
            let l = if level == 0 { 0 } else { self.lim[level - 1] };
            let r = if level == levels {
                self.trail.len()
            } else {
                self.lim[level]
            };
            progress += f.powi(level as i32) * ((r - l) as f64);
        }
        progress * f
    }

    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for &lit in self.trail.iter() {
            let line = &mut self.lines[lit.var().index()];
            if let Reason::Clause(cr) = line.vd.reason {
                line.vd.reason = match from.reloc_to(to, cr) {
                    Some(ncr) => Reason::Clause(ncr),
                    None => Reason::Decision,
                };
            }
        }
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for level in 0..self.lim.len() + 1 {
            let l = if level > 0 { self.lim[level - 1] } else { 0 };
            let r = if level < self.lim.len() {
                self.lim[level]
            } else {
                self.trail.len()
            };

            if r > l {
                write!(f, "[{}:", level)?;
                for lit in self.trail[l..r].iter() {
                    write!(f, " {:?}", lit)?;
                }
                write!(f, " ]")?;
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_levels() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();
        let z = assigns.new_var();

        assigns.assign(x.pos_lit(), Reason::Decision);
        assert!(assigns.is_ground_level());
        assert_eq!(assigns.num_ground_assigns(), 1);

        assigns.new_decision_level();
        assigns.assign(y.neg_lit(), Reason::Decision);
        assigns.assign(z.pos_lit(), Reason::External(false));

        assert_eq!(assigns.decision_level().offset(), 1);
        assert_eq!(assigns.num_assigns(), 3);
        assert_eq!(assigns.value_lit(y.neg_lit()), LBool::True);
        assert_eq!(assigns.value_lit(y.pos_lit()), LBool::False);
        assert_eq!(assigns.level(z), DecisionLevel::from_offset(1));
        assert_eq!(assigns.reason(z), Reason::External(false));
        assert_eq!(assigns.trail_above(GROUND_LEVEL), &[y.neg_lit(), z.pos_lit()]);

        let mut undone = Vec::new();
        assigns.cancel_until(GROUND_LEVEL, |lit, top| undone.push((lit, top)));
        assert_eq!(undone, vec![(z.pos_lit(), true), (y.neg_lit(), true)]);
        assert!(assigns.is_undef(y));
        assert!(assigns.is_undef(z));
        assert_eq!(assigns.value_of(x), LBool::True);
        assert_eq!(assigns.num_assigns(), 1);
    }

    #[test]
    fn test_queue() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();

        assigns.assign(x.pos_lit(), Reason::Decision);
        assert_eq!(assigns.dequeue(), Some(x.pos_lit()));
        assert_eq!(assigns.dequeue(), None);

        assigns.assign(y.pos_lit(), Reason::Decision);
        assigns.dequeue_all();
        assert_eq!(assigns.dequeue(), None);
    }

    #[test]
    fn test_var_reuse() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();
        assert_ne!(x, y);

        assigns.free_var(x);
        assert_eq!(assigns.new_var(), x);
        assert_eq!(assigns.num_vars(), 2);
    }
}
