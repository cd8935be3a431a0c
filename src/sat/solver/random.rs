/// The classic multiplicative congruential generator inherited from MiniSat.
/// State is owned by the solver so that runs with a fixed seed are
/// reproducible. The seed must never be zero.
pub struct Random {
    seed: f64,
}

impl Random {
    pub fn new(seed: f64) -> Random {
        debug_assert!(seed > 0.0);
        Random { seed }
    }

    /// A random float in [0, 1).
    pub fn drand(&mut self) -> f64 {
        self.seed *= 1389796.0;
        let q = (self.seed / 2147483647.0) as i32;
        self.seed -= (q as f64) * 2147483647.0;
        self.seed / 2147483647.0
    }

    /// A random integer in [0, size).
    pub fn irand(&mut self, size: usize) -> usize {
        (self.drand() * (size as f64)) as usize
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.drand() < p
    }
}
