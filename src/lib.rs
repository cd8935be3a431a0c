#[macro_use]
extern crate log;

use std::{fs, io, path};
use crate::sat::{dimacs, SolveResult};
use crate::sat::solver::{Settings, Solver};

pub mod sat;
pub(crate) mod util;


pub struct MainOptions {
    pub strict: bool,
    pub solve: bool,
    pub in_path: path::PathBuf,
    pub out_path: Option<path::PathBuf>,
    pub proof_path: Option<path::PathBuf>,
    pub dimacs_path: Option<path::PathBuf>,
}


/// Solve a DIMACS file with the given settings and report in the classic
/// banner format. Returns the SAT-competition exit code (10 = SAT,
/// 20 = UNSAT, 0 = indeterminate).
pub fn run(options: MainOptions, settings: Settings) -> io::Result<i32> {
    let mut solver = Solver::new(settings);
    if let Some(ref path) = options.proof_path {
        solver.trace_proof(path)?;
    }

    info!("============================[ Problem Statistics ]=============================");
    info!("|                                                                             |");

    let backward_subst = dimacs::parse_file(&options.in_path, &mut solver, options.strict)?;

    info!("|  Number of variables:  {:12}                                         |", solver.num_vars());
    info!("|  Number of clauses:    {:12}                                         |", solver.num_clauses());
    info!("|                                                                             |");

    let result = if !solver.simplify() {
        info!("===============================================================================");
        info!("Solved by unit propagation");
        SolveResult::Unsat
    } else if !options.solve {
        if let Some(ref path) = options.dimacs_path {
            solver.to_dimacs(path, &[])?;
        }
        info!("===============================================================================");
        SolveResult::Unknown
    } else {
        solver.solve(&[])
    };

    print_stats(&solver.stats());

    println!(
        "{}",
        match result {
            SolveResult::Sat => "SATISFIABLE",
            SolveResult::Unsat => "UNSATISFIABLE",
            SolveResult::Unknown => "INDETERMINATE",
        }
    );

    if result == SolveResult::Sat {
        assert!(
            dimacs::validate_model_file(&options.in_path, solver.model(), &backward_subst)?,
            "SELF-CHECK FAILED"
        );
    }

    if let Some(ref path) = options.out_path {
        let mut out = fs::File::create(path)?;
        dimacs::write_result(&mut out, result, solver.model(), &backward_subst)?;
    }

    Ok(match result {
        SolveResult::Sat => 10,
        SolveResult::Unsat => 20,
        SolveResult::Unknown => 0,
    })
}

fn print_stats(stats: &crate::sat::Stats) {
    info!("restarts              : {:<12}", stats.restarts);
    info!("conflicts             : {:<12}", stats.conflicts);

    {
        let rnd_percent = (stats.rnd_decisions as f64) * 100.0 / (stats.decisions as f64);
        info!("decisions             : {:<12}   ({:4.2} % random)", stats.decisions, rnd_percent);
    }

    info!("propagations          : {:<12}", stats.propagations);

    {
        let del_percent =
            (stats.del_literals as f64) * 100.0 / ((stats.del_literals + stats.tot_literals) as f64);
        info!("conflict literals     : {:<12}   ({:4.2} % deleted)", stats.tot_literals, del_percent);
    }

    if let Some(mem_used) = util::mem_used_peak() {
        info!("Memory used           : {:.2} MB", (mem_used as f64) / 1024.0);
    }
    info!("");
}
