use std::{fs, io, path};
use std::collections::HashSet;
use std::io::{Read, Write};
use flate2::read::GzDecoder;
use crate::sat::SolveResult;
use crate::sat::formula::{LBool, Lit, Var, VarMap};
use crate::sat::solver::Solver;


/// Open a CNF file, transparently decompressing gzip input.
fn open_maybe_gz<P: AsRef<path::Path>>(path: P) -> io::Result<Box<dyn Read>> {
    let mut probe = fs::File::open(&path)?;
    let mut magic = [0u8; 2];
    let n = probe.read(&mut magic)?;

    let file = fs::File::open(&path)?;
    if n == 2 && magic == [0x1f, 0x8b] {
        Ok(Box::new(GzDecoder::new(io::BufReader::new(file))))
    } else {
        Ok(Box::new(io::BufReader::new(file)))
    }
}

fn parse_error(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("PARSE ERROR! {}", message))
}


pub fn parse_file<P: AsRef<path::Path>>(
    path: P,
    solver: &mut Solver,
    strict: bool,
) -> io::Result<VarMap<i32>> {
    parse(&mut open_maybe_gz(path)?, solver, strict)
}

/// Feed a DIMACS CNF stream into the solver. Returns the map from solver
/// variables back to the integer identifiers of the input.
pub fn parse<R: Read + ?Sized>(
    reader: &mut R,
    solver: &mut Solver,
    strict: bool,
) -> io::Result<VarMap<i32>> {
    let mut subst = Subst::new(solver);
    let mut header: Option<(usize, usize)> = None;
    let mut num_clauses = 0;
    let mut seen_vars = HashSet::new();

    scan(reader, &mut header, |clause| {
        for &lit in clause.iter() {
            seen_vars.insert(lit.abs());
        }
        num_clauses += 1;
        subst.add_clause(clause);
    })?;

    if strict {
        match header {
            None => {
                return Err(parse_error("no DIMACS header".to_string()));
            }
            Some((vars, clauses)) => {
                if clauses != num_clauses {
                    return Err(parse_error(format!(
                        "DIMACS header mismatch: {} clauses declared, {} found",
                        clauses, num_clauses
                    )));
                }
                if vars < seen_vars.len() {
                    return Err(parse_error(format!(
                        "DIMACS header mismatch: {} vars declared, {} discovered",
                        vars,
                        seen_vars.len()
                    )));
                }
            }
        }
    }

    Ok(subst.backward_subst)
}

/// Read the clauses of a DIMACS stream without touching a solver.
pub fn read_clauses<R: Read + ?Sized>(reader: &mut R) -> io::Result<Vec<Vec<i32>>> {
    let mut clauses = Vec::new();
    let mut header = None;
    scan(reader, &mut header, |clause| clauses.push(clause.to_vec()))?;
    Ok(clauses)
}

fn scan<R, F>(reader: &mut R, header: &mut Option<(usize, usize)>, mut clause: F) -> io::Result<()>
where
    R: Read + ?Sized,
    F: FnMut(&[i32]),
{
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut current: Vec<i32> = Vec::new();
    for line in text.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }

        if line.starts_with('p') {
            if header.is_some() {
                return Err(parse_error("duplicate DIMACS header".to_string()));
            }
            let mut fields = line.split_whitespace();
            if fields.next() != Some("p") || fields.next() != Some("cnf") {
                return Err(parse_error(format!("unexpected header line: {:?}", line)));
            }
            let vars = next_count(&mut fields, line)?;
            let clauses = next_count(&mut fields, line)?;
            *header = Some((vars, clauses));
            continue;
        }

        for token in line.split_whitespace() {
            let lit: i32 = token
                .parse()
                .map_err(|_| parse_error(format!("unexpected token {:?}", token)))?;
            if lit == 0 {
                clause(&current);
                current.clear();
            } else {
                current.push(lit);
            }
        }
    }

    if !current.is_empty() {
        clause(&current);
    }
    Ok(())
}

fn next_count<'a, I: Iterator<Item = &'a str>>(fields: &mut I, line: &str) -> io::Result<usize> {
    fields
        .next()
        .and_then(|tok| tok.parse().ok())
        .ok_or_else(|| parse_error(format!("malformed header line: {:?}", line)))
}


struct Subst<'s> {
    solver: &'s mut Solver,
    backward_subst: VarMap<i32>,
}

impl<'s> Subst<'s> {
    fn new(solver: &'s mut Solver) -> Self {
        Subst {
            solver,
            backward_subst: VarMap::new(),
        }
    }

    fn add_clause(&mut self, raw: &[i32]) {
        let lits: Vec<Lit> = raw.iter().map(|&lit_id| self.lit_by_id(lit_id)).collect();
        self.solver.add_clause(&lits);
    }

    fn lit_by_id(&mut self, lit_id: i32) -> Lit {
        while (lit_id.abs() as usize) > self.solver.num_vars() {
            let v = self.solver.new_var();
            self.backward_subst.insert(v, v.to_dimacs());
        }
        Lit::from_dimacs(lit_id)
    }
}


pub fn write_result<W: Write>(
    stream: &mut W,
    result: SolveResult,
    model: &[LBool],
    backward_subst: &VarMap<i32>,
) -> io::Result<()> {
    match result {
        SolveResult::Unsat => writeln!(stream, "UNSAT"),
        SolveResult::Unknown => writeln!(stream, "INDET"),
        SolveResult::Sat => {
            writeln!(stream, "SAT")?;
            write_model(stream, model, backward_subst)
        }
    }
}

pub fn write_model<W: Write>(
    stream: &mut W,
    model: &[LBool],
    backward_subst: &VarMap<i32>,
) -> io::Result<()> {
    for (index, &value) in model.iter().enumerate() {
        if value.is_undef() {
            continue;
        }
        let var = Var::from_index(index);
        let var_id = backward_subst.get(var).cloned().unwrap_or(var.to_dimacs());
        let lit_id = if value == LBool::True { var_id } else { -var_id };
        write!(stream, "{} ", lit_id)?;
    }
    writeln!(stream, "0")
}


pub fn validate_model_file<P: AsRef<path::Path>>(
    path: P,
    model: &[LBool],
    backward_subst: &VarMap<i32>,
) -> io::Result<bool> {
    validate_model(&mut open_maybe_gz(path)?, model, backward_subst)
}

/// Check that the model satisfies every clause of the given CNF stream.
pub fn validate_model<R: Read + ?Sized>(
    reader: &mut R,
    model: &[LBool],
    backward_subst: &VarMap<i32>,
) -> io::Result<bool> {
    let mut true_lits = HashSet::new();
    for (index, &value) in model.iter().enumerate() {
        if value.is_undef() {
            continue;
        }
        let var = Var::from_index(index);
        let var_id = backward_subst.get(var).cloned().unwrap_or(var.to_dimacs());
        true_lits.insert(if value == LBool::True { var_id } else { -var_id });
    }

    for clause in read_clauses(reader)? {
        if !clause.iter().any(|lit| true_lits.contains(lit)) {
            return Ok(false);
        }
    }
    Ok(true)
}
