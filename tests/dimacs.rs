use std::fs;
use std::io::{Read, Write};

use flate2::Compression;
use flate2::write::GzEncoder;

use propsat::sat::{dimacs, SolveResult};
use propsat::sat::formula::Lit;
use propsat::sat::solver::Solver;


const SMALL_CNF: &str = "c a small satisfiable instance\np cnf 3 3\n1 2 0\n-1 3 0\n-2 -3 0\n";

fn lit(id: i32) -> Lit {
    Lit::from_dimacs(id)
}


#[test]
fn parse_solve_validate() {
    let mut solver = Solver::default();
    let subst = dimacs::parse(&mut SMALL_CNF.as_bytes(), &mut solver, true).unwrap();

    assert_eq!(solver.num_vars(), 3);
    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert!(dimacs::validate_model(&mut SMALL_CNF.as_bytes(), solver.model(), &subst).unwrap());
}

#[test]
fn validate_rejects_bad_model() {
    use propsat::sat::formula::LBool;

    let mut solver = Solver::default();
    let subst = dimacs::parse(&mut SMALL_CNF.as_bytes(), &mut solver, false).unwrap();

    // All-true violates the clause {-2, -3}:
    let all_true = vec![LBool::True; 3];
    assert!(!dimacs::validate_model(&mut SMALL_CNF.as_bytes(), &all_true, &subst).unwrap());
}

#[test]
fn parse_gzipped_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instance.cnf.gz");

    {
        let file = fs::File::create(&path).unwrap();
        let mut gz = GzEncoder::new(file, Compression::default());
        gz.write_all(SMALL_CNF.as_bytes()).unwrap();
        gz.finish().unwrap();
    }

    let mut solver = Solver::default();
    let subst = dimacs::parse_file(&path, &mut solver, true).unwrap();
    assert_eq!(solver.num_vars(), 3);
    assert_eq!(solver.solve(&[]), SolveResult::Sat);
    assert!(dimacs::validate_model_file(&path, solver.model(), &subst).unwrap());
}

#[test]
fn result_file_round_trip() {
    let mut solver = Solver::default();
    let subst = dimacs::parse(&mut SMALL_CNF.as_bytes(), &mut solver, false).unwrap();
    let result = solver.solve(&[]);
    assert_eq!(result, SolveResult::Sat);

    let mut out = Vec::new();
    dimacs::write_result(&mut out, result, solver.model(), &subst).unwrap();
    let text = String::from_utf8(out).unwrap();

    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("SAT"));
    let model_line = lines.next().unwrap();
    assert!(model_line.ends_with(" 0"));

    // The printed literals must reproduce the model:
    let printed: Vec<i32> = model_line
        .split_whitespace()
        .map(|tok| tok.parse().unwrap())
        .filter(|&id| id != 0)
        .collect();
    assert_eq!(printed.len(), 3);
    for id in printed {
        assert_eq!(
            solver.model_value(lit(id)),
            propsat::sat::formula::LBool::True
        );
    }
}

#[test]
fn result_file_markers() {
    let subst = propsat::sat::formula::VarMap::new();

    let mut out = Vec::new();
    dimacs::write_result(&mut out, SolveResult::Unsat, &[], &subst).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "UNSAT\n");

    let mut out = Vec::new();
    dimacs::write_result(&mut out, SolveResult::Unknown, &[], &subst).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "INDET\n");
}

#[test]
fn dimacs_dump_with_assumptions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.cnf");

    let mut solver = Solver::default();
    for _ in 0..3 {
        solver.new_var();
    }
    solver.add_clause(&[lit(1), lit(2)]);
    solver.add_clause(&[lit(2), lit(3)]);

    solver.to_dimacs(&path, &[lit(3)]).unwrap();

    let mut text = String::new();
    fs::File::open(&path).unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "p cnf 3 3\n1 2 0\n2 3 0\n3 0\n");
}

#[test]
fn dimacs_dump_of_refuted_solver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dead.cnf");

    let mut solver = Solver::default();
    solver.new_var();
    solver.add_clause(&[lit(1)]);
    solver.add_clause(&[lit(-1)]);
    assert!(!solver.okay());

    solver.to_dimacs(&path, &[]).unwrap();

    let mut text = String::new();
    fs::File::open(&path).unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "p cnf 0 1\n0\n");
}

#[test]
fn dimacs_dump_strips_root_falses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stripped.cnf");

    let mut solver = Solver::default();
    for _ in 0..3 {
        solver.new_var();
    }
    solver.add_clause(&[lit(1), lit(2)]);
    solver.add_clause(&[lit(-1)]);

    solver.to_dimacs(&path, &[]).unwrap();

    let mut text = String::new();
    fs::File::open(&path).unwrap().read_to_string(&mut text).unwrap();

    // {1,2} is satisfied by the propagated 2 and dropped; what remains are
    // the units of the root trail.
    assert_eq!(text, "p cnf 2 2\n-1 0\n2 0\n");
}
