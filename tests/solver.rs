use std::fs;
use std::io::Read;

use propsat::sat::SolveResult;
use propsat::sat::formula::{LBool, Lit};
use propsat::sat::solver::{Settings, Solver};


fn lit(id: i32) -> Lit {
    Lit::from_dimacs(id)
}

fn solver_with_vars(num_vars: usize) -> Solver {
    let mut solver = Solver::default();
    for _ in 0..num_vars {
        solver.new_var();
    }
    solver
}

fn add(solver: &mut Solver, clause: &[i32]) -> bool {
    let lits: Vec<Lit> = clause.iter().map(|&id| lit(id)).collect();
    solver.add_clause(&lits)
}

fn assert_model_satisfies(solver: &Solver, clauses: &[Vec<i32>]) {
    for clause in clauses {
        assert!(
            clause.iter().any(|&id| solver.model_value(lit(id)) == LBool::True),
            "model does not satisfy {:?}",
            clause
        );
    }
}

/// Pigeonhole principle: `pigeons` pigeons into `holes` holes, one variable
/// per (pigeon, hole) pair. Unsatisfiable whenever pigeons > holes.
fn pigeonhole(pigeons: usize, holes: usize) -> Vec<Vec<i32>> {
    let var = |p: usize, h: usize| (p * holes + h + 1) as i32;
    let mut clauses = Vec::new();

    for p in 0..pigeons {
        clauses.push((0..holes).map(|h| var(p, h)).collect());
    }
    for h in 0..holes {
        for p in 0..pigeons {
            for q in (p + 1)..pigeons {
                clauses.push(vec![-var(p, h), -var(q, h)]);
            }
        }
    }
    clauses
}

fn load(solver: &mut Solver, clauses: &[Vec<i32>]) {
    let max_var = clauses
        .iter()
        .flat_map(|c| c.iter())
        .map(|id| id.abs() as usize)
        .max()
        .unwrap_or(0);
    while solver.num_vars() < max_var {
        solver.new_var();
    }
    for clause in clauses {
        add(solver, clause);
    }
}


#[test]
fn trivial_sat() {
    let mut solver = solver_with_vars(3);
    assert!(add(&mut solver, &[1, 2, 3]));

    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert!(solver.okay());
    assert_eq!(solver.model().len(), 3);
    assert!(solver.model().iter().all(|v| !v.is_undef()));
    assert_model_satisfies(&solver, &[vec![1, 2, 3]]);
}

#[test]
fn trivial_unsat() {
    let mut solver = solver_with_vars(1);
    assert!(add(&mut solver, &[1]));
    assert!(!add(&mut solver, &[-1]));

    assert!(!solver.okay());
    assert_eq!(solver.solve(&[]), SolveResult::Unsat);
    assert!(solver.model().is_empty());
    assert!(solver.conflict().is_empty());
}

#[test]
fn unit_cascade() {
    let mut solver = solver_with_vars(4);
    add(&mut solver, &[1]);
    add(&mut solver, &[-1, 2]);
    add(&mut solver, &[-2, 3]);
    add(&mut solver, &[-3, 4]);

    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    for id in 1..5 {
        assert_eq!(solver.model_value(lit(id)), LBool::True);
    }
    assert_eq!(solver.stats().conflicts, 0);
}

#[test]
fn assumption_conflict() {
    let mut solver = solver_with_vars(2);
    add(&mut solver, &[1, 2]);
    add(&mut solver, &[-1, 2]);

    assert_eq!(solver.solve(&[lit(-2)]), SolveResult::Unsat);
    assert!(solver.okay(), "assumption failure must not refute the formula");
    assert_eq!(solver.conflict(), &[lit(-2)]);

    // The same solver stays usable and the formula itself is satisfiable:
    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert_eq!(solver.model_value(lit(2)), LBool::True);

    assert_eq!(solver.solve(&[lit(2), lit(1)]), SolveResult::Sat);
    assert_eq!(solver.model_value(lit(1)), LBool::True);
}

#[test]
fn conflict_is_subset_of_assumptions() {
    let mut solver = solver_with_vars(4);
    add(&mut solver, &[-1, -2]);

    // Only 1 and 2 clash; 3 and 4 are innocent bystanders.
    let assumptions = [lit(3), lit(1), lit(4), lit(2)];
    assert_eq!(solver.solve(&assumptions), SolveResult::Unsat);

    assert!(!solver.conflict().is_empty());
    for &l in solver.conflict() {
        assert!(assumptions.contains(&l));
        assert!(l == lit(1) || l == lit(2), "unexpected conflict literal {:?}", l);
    }
}

#[test]
fn pigeonhole_unsat() {
    let clauses = pigeonhole(4, 3);
    let mut solver = Solver::default();
    load(&mut solver, &clauses);

    assert_eq!(solver.solve(&[]), SolveResult::Unsat);
    assert!(!solver.okay());

    let stats = solver.stats();
    assert!(stats.conflicts > 0, "expected nontrivial learning");
    assert!(stats.restarts > 0);
    assert!(stats.decisions > 0);
}

#[test]
fn pigeonhole_sat_when_roomy() {
    let clauses = pigeonhole(3, 3);
    let mut solver = Solver::default();
    load(&mut solver, &clauses);

    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert_model_satisfies(&solver, &clauses);
}

#[test]
fn conflict_budget_yields_unknown() {
    let clauses = pigeonhole(5, 4);
    let mut solver = Solver::default();
    load(&mut solver, &clauses);

    solver.set_conf_budget(1);
    assert_eq!(solver.solve(&[]), SolveResult::Unknown);
    assert!(solver.okay());
    assert!(solver.model().is_empty());

    solver.budget_off();
    assert_eq!(solver.solve(&[]), SolveResult::Unsat);
}

#[test]
fn interrupt_yields_unknown() {
    let mut solver = solver_with_vars(2);
    add(&mut solver, &[1, 2]);

    solver.interrupt();
    assert_eq!(solver.solve(&[]), SolveResult::Unknown);
    assert!(solver.okay());

    solver.clear_interrupt();
    assert_eq!(solver.solve(&[]), SolveResult::Sat);
}

#[test]
fn interrupt_flag_is_shared() {
    let mut solver = solver_with_vars(1);
    add(&mut solver, &[1]);

    let flag = solver.interrupt_flag();
    flag.store(true, std::sync::atomic::Ordering::Release);
    assert_eq!(solver.solve(&[]), SolveResult::Unknown);

    solver.clear_interrupt();
    assert!(!flag.load(std::sync::atomic::Ordering::Acquire));
    assert_eq!(solver.solve(&[]), SolveResult::Sat);
}

#[test]
fn deterministic_runs() {
    let clauses = pigeonhole(4, 3);

    let run = || {
        let mut settings = Settings::default();
        settings.heur.random_var_freq = 0.2;
        let mut solver = Solver::new(settings);
        load(&mut solver, &clauses);
        let result = solver.solve(&[]);
        (result, solver.stats())
    };

    let (res_a, stats_a) = run();
    let (res_b, stats_b) = run();

    assert_eq!(res_a, res_b);
    assert_eq!(stats_a.conflicts, stats_b.conflicts);
    assert_eq!(stats_a.decisions, stats_b.decisions);
    assert_eq!(stats_a.rnd_decisions, stats_b.rnd_decisions);
    assert_eq!(stats_a.propagations, stats_b.propagations);
    assert_eq!(stats_a.restarts, stats_b.restarts);
    assert_eq!(stats_a.tot_literals, stats_b.tot_literals);
}

#[test]
fn model_sound_on_mixed_instance() {
    // A satisfiable instance that needs some actual search.
    let clauses: Vec<Vec<i32>> = vec![
        vec![1, 2, -3],
        vec![-1, 3, 4],
        vec![-2, -4, 5],
        vec![3, -5, 6],
        vec![-3, -6, -1],
        vec![2, 4, 6],
        vec![-4, -5, -6],
        vec![1, -2, 5],
        vec![-1, 2, -5],
        vec![3, 5, -6],
    ];
    let mut solver = Solver::default();
    load(&mut solver, &clauses);

    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert_model_satisfies(&solver, &clauses);
}

#[test]
fn incremental_narrowing() {
    let mut solver = solver_with_vars(3);
    add(&mut solver, &[1, 2, 3]);

    assert_eq!(solver.solve(&[lit(-1), lit(-2)]), SolveResult::Sat);
    assert_eq!(solver.model_value(lit(3)), LBool::True);

    // Grow the formula between solves:
    assert!(add(&mut solver, &[-3]));
    assert_eq!(solver.solve(&[lit(-1), lit(-2)]), SolveResult::Unsat);
    let conflict = solver.conflict().to_vec();
    assert!(!conflict.is_empty());
    assert!(conflict.iter().all(|l| *l == lit(-1) || *l == lit(-2)));

    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert_model_satisfies(&solver, &[vec![1, 2, 3], vec![-3]]);
}

#[test]
fn simplify_scrubs_satisfied_clauses() {
    let mut solver = solver_with_vars(3);
    add(&mut solver, &[2, 3]);
    add(&mut solver, &[-2, 1, 3]);
    assert_eq!(solver.num_clauses(), 2);

    add(&mut solver, &[2]);
    assert!(solver.simplify());
    // {2, 3} is satisfied at the root; {-2, 1, 3} lost its false literal.
    assert_eq!(solver.num_clauses(), 1);

    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert_model_satisfies(&solver, &[vec![2, 3], vec![-2, 1, 3], vec![2]]);
}

#[test]
fn polarity_override() {
    let mut solver = solver_with_vars(2);
    add(&mut solver, &[1, 2]);

    // The saved-phase default would branch negative; force variable 1 high.
    let v = lit(1).var();
    solver.set_polarity(v, Some(false));

    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert_eq!(solver.model_value(lit(1)), LBool::True);
}

#[test]
fn release_var_asserts_polarity() {
    let mut solver = solver_with_vars(2);
    add(&mut solver, &[-1, 2]);

    solver.release_var(lit(1));
    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert_eq!(solver.model_value(lit(1)), LBool::True);
    assert_eq!(solver.model_value(lit(2)), LBool::True);
}

#[test]
fn proof_trace_of_refutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refutation.drat");

    let mut solver = solver_with_vars(1);
    solver.trace_proof(&path).unwrap();
    add(&mut solver, &[1]);
    add(&mut solver, &[-1]);
    assert_eq!(solver.solve(&[]), SolveResult::Unsat);

    let mut buf = String::new();
    fs::File::open(&path).unwrap().read_to_string(&mut buf).unwrap();
    assert_eq!(buf, "1 0\n-1 0\n0\n");
}

#[test]
fn proof_trace_records_learnt_units() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learnt.drat");

    let clauses = pigeonhole(3, 2);
    let mut solver = Solver::default();
    solver.trace_proof(&path).unwrap();
    load(&mut solver, &clauses);
    assert_eq!(solver.solve(&[]), SolveResult::Unsat);

    let mut buf = String::new();
    fs::File::open(&path).unwrap().read_to_string(&mut buf).unwrap();
    let lines: Vec<&str> = buf.lines().collect();

    assert_eq!(*lines.last().unwrap(), "0");
    assert!(lines.len() > clauses.len(), "expected learnt clauses in the trace");
    for line in lines.iter() {
        assert!(line.ends_with('0'), "unterminated trace line {:?}", line);
    }
}

#[test]
fn stats_accumulate_across_solves() {
    let mut solver = solver_with_vars(3);
    add(&mut solver, &[1, 2, 3]);

    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    let first = solver.stats();
    assert_eq!(first.solves, 1);

    assert_eq!(solver.solve(&[lit(-1)]), SolveResult::Sat);
    let second = solver.stats();
    assert_eq!(second.solves, 2);
    assert!(second.propagations >= first.propagations);
}
