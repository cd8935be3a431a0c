use std::{fs, io, path};
use std::io::Write;
use crate::sat::formula::Lit;


/// DRAT trace writer. The handle is owned by the solver, reopened by
/// `trace_proof` and closed on drop. A failed write disables tracing but
/// leaves the solver running.
pub struct ProofTracer {
    out: Option<io::BufWriter<fs::File>>,
}

impl ProofTracer {
    pub fn new() -> ProofTracer {
        ProofTracer { out: None }
    }

    pub fn open<P: AsRef<path::Path>>(&mut self, path: P) -> io::Result<()> {
        self.out = Some(io::BufWriter::new(fs::File::create(path)?));
        Ok(())
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.out.is_some()
    }

    pub fn add_clause(&mut self, lits: &[Lit]) {
        self.emit(None, lits);
    }

    pub fn delete_clause(&mut self, lits: &[Lit]) {
        self.emit(Some("d "), lits);
    }

    pub fn unsat(&mut self) {
        self.emit(None, &[]);
        if let Some(out) = self.out.as_mut() {
            let _ = out.flush();
        }
    }

    fn emit(&mut self, prefix: Option<&str>, lits: &[Lit]) {
        let out = match self.out.as_mut() {
            Some(out) => out,
            None => return,
        };

        let write_line = |out: &mut io::BufWriter<fs::File>| -> io::Result<()> {
            if let Some(prefix) = prefix {
                write!(out, "{}", prefix)?;
            }
            for &lit in lits {
                write!(out, "{} ", lit.to_dimacs())?;
            }
            writeln!(out, "0")
        };

        if write_line(out).is_err() {
            warn!("proof trace write failed, tracing disabled");
            self.out = None;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_trace_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.drat");

        let mut proof = ProofTracer::new();
        assert!(!proof.is_active());
        proof.open(&path).unwrap();
        assert!(proof.is_active());

        proof.add_clause(&[Lit::from_dimacs(1), Lit::from_dimacs(-2)]);
        proof.delete_clause(&[Lit::from_dimacs(1), Lit::from_dimacs(-2)]);
        proof.unsat();
        drop(proof);

        let mut buf = String::new();
        fs::File::open(&path).unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "1 -2 0\nd 1 -2 0\n0\n");
    }
}
