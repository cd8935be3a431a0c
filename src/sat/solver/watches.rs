use std::mem;
use crate::sat::formula::{LBool, Lit, LitVec, Var};
use crate::sat::formula::assignment::{Assignment, Reason};
use crate::sat::formula::clause::{Clause, ClauseAllocator, ClauseRef};


#[derive(Clone, Copy, Debug)]
struct Watcher {
    cref: ClauseRef,
    blocker: Lit,
}


#[derive(Default, Debug)]
struct WatchesLine {
    watchers: Vec<Watcher>,
    dirty: bool,
}


/// Two-watched-literal scheme. A clause watching literals `a` and `b` sits
/// on the lists of `¬a` and `¬b`; when one of those becomes true the clause
/// must be inspected. Detached clauses are flagged dirty and swept out of
/// their lists lazily, right before the list is next walked.
pub struct Watches {
    lines: LitVec<WatchesLine>,
    pub propagations: u64,
}

impl Watches {
    pub fn new() -> Self {
        Watches {
            lines: LitVec::new(),
            propagations: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.lines.init(v.pos_lit());
        self.lines.init(v.neg_lit());
    }

    pub fn watch_clause(&mut self, c: &Clause, cr: ClauseRef) {
        let (c0, c1) = c.watch_pair();
        self.lines[!c0].watchers.push(Watcher {
            cref: cr,
            blocker: c1,
        });
        self.lines[!c1].watchers.push(Watcher {
            cref: cr,
            blocker: c0,
        });
    }

    pub fn unwatch_clause_lazy(&mut self, c: &Clause) {
        let (c0, c1) = c.watch_pair();
        self.lines[!c0].dirty = true;
        self.lines[!c1].dirty = true;
    }

    /// Propagate all enqueued facts. Returns the conflicting clause if one
    /// arises; the propagation queue is empty afterwards either way.
    pub fn propagate(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &mut Assignment,
    ) -> Option<ClauseRef> {
        let mut confl = None;

        'queue: while let Some(p) = assigns.dequeue() {
            self.propagations += 1;
            let false_lit = !p;

            {
                let line = &mut self.lines[p];
                if line.dirty {
                    line.watchers.retain(|w| !ca.is_deleted(w.cref));
                    line.dirty = false;
                }
            }

            // The line is detached while we walk it so that replacement
            // watches can be pushed onto other lines; a replacement never
            // targets the line being walked since its literal is not false.
            let mut ws = mem::replace(&mut self.lines[p].watchers, Vec::new());
            let mut i = 0;
            let mut j = 0;

            while i < ws.len() {
                let w = ws[i];
                i += 1;

                if assigns.value_lit(w.blocker) == LBool::True {
                    ws[j] = w;
                    j += 1;
                    continue;
                }

                let c = ca.edit(w.cref);
                if c.head() == false_lit {
                    c.swap(0, 1);
                }
                debug_assert_eq!(c[1], false_lit);

                // If the other watch is true the clause is satisfied.
                let first = c.head();
                let keep = Watcher {
                    cref: w.cref,
                    blocker: first,
                };
                if first != w.blocker && assigns.value_lit(first) == LBool::True {
                    ws[j] = keep;
                    j += 1;
                    continue;
                }

                // Look for a replacement watch:
                let found = c.pull_lit(1, |lit| assigns.value_lit(lit) != LBool::False);
                match found {
                    Some(lit) => {
                        self.lines[!lit].watchers.push(keep);
                    }

                    // No replacement, the clause is unit under assignment:
                    None => {
                        ws[j] = keep;
                        j += 1;

                        if assigns.value_lit(first) == LBool::False {
                            confl = Some(w.cref);
                            assigns.dequeue_all();

                            // Copy the remaining watchers back:
                            while i < ws.len() {
                                ws[j] = ws[i];
                                j += 1;
                                i += 1;
                            }
                        } else {
                            assigns.assign(first, Reason::Clause(w.cref));
                        }
                    }
                }
            }

            ws.truncate(j);
            self.lines[p].watchers = ws;

            if confl.is_some() {
                break 'queue;
            }
        }

        confl
    }

    /// True iff `cr` is watched on both negated watch literals; a sanity
    /// check used by tests and debug assertions.
    pub fn covers(&self, c: &Clause, cr: ClauseRef) -> bool {
        let (c0, c1) = c.watch_pair();
        self.lines[!c0].watchers.iter().any(|w| w.cref == cr)
            && self.lines[!c1].watchers.iter().any(|w| w.cref == cr)
    }

    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for line in self.lines.iter_mut() {
            line.dirty = false;
            line.watchers.retain(|w| !from.is_deleted(w.cref));
            for w in line.watchers.iter_mut() {
                w.cref = from.reloc_to(to, w.cref).unwrap();
            }
        }
    }
}
