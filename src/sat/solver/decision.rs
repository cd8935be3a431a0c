use crate::sat::formula::{LBool, Lit, Var, VarHeap, VarMap};
use crate::sat::formula::assignment::Assignment;
use super::random::Random;


#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum PhaseSaving {
    None,
    Limited,
    Full,
}


#[derive(Clone, Copy, Debug)]
pub struct HeuristicSettings {
    pub var_decay: f64,
    pub random_seed: f64,
    pub random_var_freq: f64,
    pub phase_saving: PhaseSaving,
    pub rnd_pol: bool,      // Use random polarities for branching.
    pub rnd_init_act: bool, // Initialize variable activities with a small random value.
}

impl Default for HeuristicSettings {
    fn default() -> HeuristicSettings {
        HeuristicSettings {
            var_decay: 0.95,
            random_seed: 91648253.0,
            random_var_freq: 0.0,
            phase_saving: PhaseSaving::Full,
            rnd_pol: false,
            rnd_init_act: false,
        }
    }
}


#[derive(Debug)]
struct VarLine {
    polarity: bool,          // Saved phase; `true` prefers the negative literal.
    user_pol: Option<bool>,  // Polarity forced by the caller.
    decision: bool,          // Eligible for branching.
}


/// VSIDS branching: a max-heap of variables ordered by an exponentially
/// decayed activity, with saved-phase (or user / random) polarity selection.
pub struct DecisionHeuristic {
    settings: HeuristicSettings,
    var_inc: f64, // Amount to bump next variable with.
    rand: Random,
    lines: VarMap<VarLine>,
    activity: VarMap<f64>,
    heap: VarHeap,

    pub dec_vars: usize,
    pub rnd_decisions: u64,
}

impl DecisionHeuristic {
    pub fn new(settings: HeuristicSettings) -> DecisionHeuristic {
        let seed = settings.random_seed;
        DecisionHeuristic {
            settings,
            var_inc: 1.0,
            rand: Random::new(seed),
            lines: VarMap::new(),
            activity: VarMap::new(),
            heap: VarHeap::new(),
            dec_vars: 0,
            rnd_decisions: 0,
        }
    }

    pub fn init_var(&mut self, v: Var, upol: Option<bool>, dvar: bool) {
        let act = if self.settings.rnd_init_act {
            self.rand.drand() * 0.00001
        } else {
            0.0
        };
        self.activity.insert(v, act);
        self.lines.insert(
            v,
            VarLine {
                polarity: true,
                user_pol: upol,
                decision: false,
            },
        );
        self.set_decision_var(v, dvar);
    }

    pub fn set_decision_var(&mut self, v: Var, dvar: bool) {
        let line = &mut self.lines[v];
        if dvar != line.decision {
            if dvar {
                self.dec_vars += 1;
                let act = &self.activity;
                self.heap.insert(v, |a, b| act[a] > act[b]);
            } else {
                self.dec_vars -= 1;
            }
            line.decision = dvar;
        }
    }

    pub fn set_user_polarity(&mut self, v: Var, pol: Option<bool>) {
        self.lines[v].user_pol = pol;
    }

    /// Called for every literal retracted by backtracking: saves the phase
    /// and puts the variable back up for branching.
    pub fn on_cancel(&mut self, lit: Lit, top_level: bool) {
        let line = &mut self.lines[lit.var()];
        match self.settings.phase_saving {
            PhaseSaving::Full => {
                line.polarity = lit.sign();
            }
            PhaseSaving::Limited if top_level => {
                line.polarity = lit.sign();
            }
            _ => {}
        }
        if line.decision {
            let act = &self.activity;
            self.heap.insert(lit.var(), |a, b| act[a] > act[b]);
        }
    }

    pub fn bump_activity(&mut self, v: Var) {
        let bumped = self.activity[v] + self.var_inc;
        if bumped > 1e100 {
            // Rescale:
            self.var_inc *= 1e-100;
            for (_, act) in self.activity.iter_mut() {
                *act *= 1e-100;
            }
            self.activity[v] = bumped * 1e-100;
        } else {
            self.activity[v] = bumped;
        }

        let act = &self.activity;
        self.heap.update(v, |a, b| act[a] > act[b]);
    }

    pub fn decay_activity(&mut self) {
        self.var_inc *= 1.0 / self.settings.var_decay;
    }

    pub fn rebuild_order_heap(&mut self, assigns: &Assignment) {
        let mut eligible = Vec::with_capacity(self.heap.len());
        for (v, line) in self.lines.iter() {
            if line.decision && assigns.is_undef(v) {
                eligible.push(v);
            }
        }

        let act = &self.activity;
        self.heap.rebuild(eligible, |a, b| act[a] > act[b]);
    }

    /// The phase an unassigned variable would take if it were decided now.
    pub fn default_value(&self, v: Var) -> LBool {
        let line = &self.lines[v];
        match line.user_pol {
            Some(pol) => LBool::from_bool(!pol),
            None => LBool::from_bool(!line.polarity),
        }
    }

    fn pick_branch_var(&mut self, assigns: &Assignment) -> Option<Var> {
        // Random decision:
        if self.rand.chance(self.settings.random_var_freq) && !self.heap.is_empty() {
            let v = self.heap.peek_at(self.rand.irand(self.heap.len()));
            if assigns.is_undef(v) && self.lines[v].decision {
                self.rnd_decisions += 1;
                return Some(v);
            }
        }

        // Activity based decision; stale heap entries are discarded here:
        loop {
            let act = &self.activity;
            match self.heap.pop(|a, b| act[a] > act[b]) {
                None => return None,
                Some(v) => {
                    if assigns.is_undef(v) && self.lines[v].decision {
                        return Some(v);
                    }
                }
            }
        }
    }

    pub fn pick_branch_lit(&mut self, assigns: &Assignment) -> Option<Lit> {
        let v = self.pick_branch_var(assigns)?;
        let sign = if self.settings.rnd_pol {
            self.rand.chance(0.5)
        } else {
            let line = &self.lines[v];
            match line.user_pol {
                Some(pol) => pol,
                None => line.polarity,
            }
        };
        Some(v.sign_lit(sign))
    }
}
