use std::io::Write;
use std::{path, process};
use clap::crate_version;
use propsat::MainOptions;
use propsat::sat::solver;
use propsat::sat::solver::{CCMinMode, PhaseSaving};

fn main() {
    let ls012 = ["0", "1", "2"];
    let matches = clap::App::new("propsat")
        .version(crate_version!())
        .about("Incremental CDCL SAT solver with an external propagator interface")

        .arg(clap::Arg::with_name("verb").long("verb").takes_value(true).possible_values(&ls012).help("Verbosity level (0=silent, 1=some, 2=more)"))
        .arg(clap::Arg::with_name("strict").long("strict").help("Validate DIMACS header during parsing"))
        .arg(clap::Arg::with_name("solve").long("solve").help("Completely turn on/off solving after parsing"))
        .arg(clap::Arg::with_name("no-solve").long("no-solve").conflicts_with("solve"))
        .arg(clap::Arg::with_name("dimacs").long("dimacs").takes_value(true).requires("no-solve").help("If given, stop after simplification and write the result to this file"))
        .arg(clap::Arg::with_name("proof").long("proof").takes_value(true).help("Write a DRAT proof trace to this file"))
        .arg(clap::Arg::with_name("input").required(true))
        .arg(clap::Arg::with_name("output").required(false))

        .arg(clap::Arg::with_name("var-decay").long("var-decay").takes_value(true).help("The variable activity decay factor"))
        .arg(clap::Arg::with_name("cla-decay").long("cla-decay").takes_value(true).help("The clause activity decay factor"))
        .arg(clap::Arg::with_name("rnd-freq").long("rnd-freq").takes_value(true).help("The frequency with which the decision heuristic tries to choose a random variable"))
        .arg(clap::Arg::with_name("rnd-seed").long("rnd-seed").takes_value(true).help("Used by the random variable selection"))
        .arg(clap::Arg::with_name("ccmin-mode").long("ccmin-mode").takes_value(true).possible_values(&ls012).help("Controls conflict clause minimization (0=none, 1=basic, 2=deep)"))
        .arg(clap::Arg::with_name("phase-saving").long("phase-saving").takes_value(true).possible_values(&ls012).help("Controls the level of phase saving (0=none, 1=limited, 2=full)"))
        .arg(clap::Arg::with_name("rnd-init").long("rnd-init").help("Randomize the initial activity"))
        .arg(clap::Arg::with_name("no-rnd-init").long("no-rnd-init").conflicts_with("rnd-init"))
        .arg(clap::Arg::with_name("luby").long("luby").help("Use the Luby restart sequence"))
        .arg(clap::Arg::with_name("no-luby").long("no-luby").conflicts_with("luby"))
        .arg(clap::Arg::with_name("rfirst").long("rfirst").takes_value(true).help("The base restart interval"))
        .arg(clap::Arg::with_name("rinc").long("rinc").takes_value(true).help("Restart interval increase factor"))
        .arg(clap::Arg::with_name("gc-frac").long("gc-frac").takes_value(true).help("The fraction of wasted memory allowed before a garbage collection is triggered"))
        .arg(clap::Arg::with_name("min-learnts").long("min-learnts").takes_value(true).help("Minimum learnt clause limit"))

        .get_matches();

    {
        let mut builder = env_logger::Builder::new();
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
        builder.filter(
            None,
            matches
                .value_of("verb")
                .map(|v| match v {
                    "1" => log::LevelFilter::Info,
                    "2" => log::LevelFilter::Trace,
                    _ => log::LevelFilter::Off,
                })
                .unwrap_or(log::LevelFilter::Info),
        );
        builder.init();
    }

    let settings = {
        let mut s = solver::Settings::default();

        for x in matches.value_of("var-decay").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x && *x < 1.0 {
                s.heur.var_decay = *x;
            }
        }

        for x in matches.value_of("cla-decay").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x && *x < 1.0 {
                s.db.clause_decay = *x;
            }
        }

        for x in matches.value_of("rnd-freq").and_then(|s| s.parse().ok()).iter() {
            if 0.0 <= *x && *x <= 1.0 {
                s.heur.random_var_freq = *x;
            }
        }

        for x in matches.value_of("rnd-seed").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x {
                s.heur.random_seed = *x;
            }
        }

        for x in matches.value_of("ccmin-mode").iter() {
            match *x {
                "0" => s.ccmin_mode = CCMinMode::None,
                "1" => s.ccmin_mode = CCMinMode::Basic,
                "2" => s.ccmin_mode = CCMinMode::Deep,
                _ => {}
            }
        }

        for x in matches.value_of("phase-saving").iter() {
            match *x {
                "0" => s.heur.phase_saving = PhaseSaving::None,
                "1" => s.heur.phase_saving = PhaseSaving::Limited,
                "2" => s.heur.phase_saving = PhaseSaving::Full,
                _ => {}
            }
        }

        if matches.is_present("rnd-init") {
            s.heur.rnd_init_act = true;
        }
        if matches.is_present("no-rnd-init") {
            s.heur.rnd_init_act = false;
        }

        if matches.is_present("luby") {
            s.restart.luby_restart = true;
        }
        if matches.is_present("no-luby") {
            s.restart.luby_restart = false;
        }

        for x in matches.value_of("rfirst").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x {
                s.restart.restart_first = *x;
            }
        }

        for x in matches.value_of("rinc").and_then(|s| s.parse().ok()).iter() {
            if 1.0 < *x {
                s.restart.restart_inc = *x;
            }
        }

        for x in matches.value_of("gc-frac").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x && *x <= 1.0 {
                s.core.garbage_frac = *x;
            }
        }

        for x in matches.value_of("min-learnts").and_then(|s| s.parse().ok()).iter() {
            if 0 <= *x {
                s.learn.min_learnts_lim = *x;
            }
        }

        s
    };

    let options = MainOptions {
        strict: matches.is_present("strict"),
        solve: !matches.is_present("no-solve"),
        in_path: path::PathBuf::from(matches.value_of("input").unwrap()),
        out_path: matches.value_of("output").map(path::PathBuf::from),
        proof_path: matches.value_of("proof").map(path::PathBuf::from),
        dimacs_path: matches.value_of("dimacs").map(path::PathBuf::from),
    };

    match propsat::run(options, settings) {
        Ok(code) => {
            process::exit(code);
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
