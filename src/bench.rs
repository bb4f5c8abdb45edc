use std::{collections::{BTreeMap, BTreeSet}, convert::Infallible, fs::File, io::Write, time::Instant};
use serde_derive::{Deserialize, Serialize};
use tracing::info;
use crate::core::{Outcome, Usp};
use crate::generator::UspGenerator;

const SEED: u64 = 0xeea42aa1638be961;

/// Runtime of one (n, k) size, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeRow {
    pub depth: usize,
    pub width: usize,
    pub mean_ms: f64,
    pub deviation_ms: f64,
    pub weak: usize,
    pub trials: usize,
}

/// Population mean and standard deviation. Both are zero for no samples.
pub fn mean_and_deviation(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let variance = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / samples.len() as f64;
    (mean, variance.sqrt())
}

/// Times a classifier over random puzzles drawn from a fixed seed, so two
/// runs of the same bench see the same puzzles.
pub struct Bench {
    results: BTreeMap<String, f64>,
    rows: Vec<RuntimeRow>,
    generator: UspGenerator,
}

impl Bench {
    pub fn new() -> Self {
        Self::seeded(SEED)
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            results: BTreeMap::new(),
            rows: Vec::new(),
            generator: UspGenerator::seeded(seed),
        }
    }

    pub fn run_size<F: FnMut(&Usp) -> Outcome>(&mut self, n: usize, k: usize, trials: usize, mut f: F) -> RuntimeRow {
        match self.try_run_size(n, k, trials, |puzzle| Ok::<_, Infallible>(f(puzzle))) {
            Ok(row) => row,
            Err(e) => match e {},
        }
    }

    /// Like run_size(), but stops at the first puzzle the classifier fails
    /// on. Nothing is recorded for a size that failed.
    pub fn try_run_size<E, F: FnMut(&Usp) -> Result<Outcome, E>>(
        &mut self, n: usize, k: usize, trials: usize, mut f: F,
    ) -> Result<RuntimeRow, E> {
        let mut times = Vec::with_capacity(trials);
        let mut weak = 0;
        for _ in 0..trials {
            let puzzle = self.generator.random_puzzle(n, k);
            let start = Instant::now();
            let outcome = f(&puzzle)?;
            times.push(start.elapsed().as_secs_f64() * 1000.0);
            if outcome.is_weak() {
                weak += 1;
            }
        }
        let (mean_ms, deviation_ms) = mean_and_deviation(&times);
        info!(n, k, trials, weak, mean_ms, deviation_ms, "Benchmarked size");
        let row = RuntimeRow { depth: n, width: k, mean_ms, deviation_ms, weak, trials };
        self.results.insert(format!("{}x{}", n, k), mean_ms);
        self.rows.push(row.clone());
        Ok(row)
    }

    pub fn rows(&self) -> &[RuntimeRow] {
        &self.rows
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("Depth,Width,Mean(ms),Deviation(ms)\n");
        for row in &self.rows {
            out.push_str(&format!("{},{},{},{}\n", row.depth, row.width, row.mean_ms, row.deviation_ms));
        }
        out
    }

    pub fn write_csv(&self, filename: &str) -> Result<(), std::io::Error> {
        let mut f = File::create(filename)?;
        f.write_all(self.to_csv().as_bytes())?;
        Ok(())
    }

    pub fn into_results(self) -> BTreeMap<String, f64> {
        self.results
    }

    pub fn save_json(&self, filename: &str) -> Result<(), std::io::Error> {
        let mut f = File::create(filename)?;
        let json_data = serde_json::to_string_pretty(&self.results)?;
        f.write_all(json_data.as_bytes())?;
        Ok(())
    }
}

impl Default for Bench {
    fn default() -> Self {
        Self::new()
    }
}

pub fn diff_results(
    left: &BTreeMap<String, f64>, right: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let all_keys: BTreeSet<_> = left.keys().chain(right.keys()).cloned().collect();
    all_keys
        .into_iter()
        .map(|k| {
            let l = left.get(&k).unwrap_or(&0.0);
            let r = right.get(&k).unwrap_or(&0.0);
            (k, r - l)
        })
        .collect()
}
