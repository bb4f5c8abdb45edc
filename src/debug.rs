use std::{collections::HashMap, fs::File, io::Write, time::{Duration, Instant}};
use rand::{distr::{Bernoulli, Distribution}, rng, rngs::ThreadRng};
use serde_derive::Serialize;
use tracing::{info, warn};
use crate::core::{Error, Outcome};
use crate::solver::{NodeEvent, SearchObserver, SolveStats, SolverView};

pub struct NullObserver;

impl SearchObserver for NullObserver {
    fn after_node(&mut self, _view: &dyn SolverView) {}
}

enum TimerState {
    Init,
    // With the time it was started
    Running(Instant),
    // With the duration from start to end
    Ended(Duration),
}

impl TimerState {
    fn new() -> Self { Self::Init }

    fn start(&mut self) {
        if let TimerState::Init = self {
            *self = TimerState::Running(Instant::now());
        }
    }

    fn end(&mut self) {
        if let TimerState::Running(s) = self {
            *self = TimerState::Ended(s.elapsed());
        }
    }

    fn to_duration(&self) -> Duration {
        match self {
            TimerState::Init => Duration::new(0, 0),
            TimerState::Running(s) => s.elapsed(),
            TimerState::Ended(d) => *d,
        }
    }
}

#[derive(PartialEq, Clone, Debug, Serialize)]
pub struct Histogram {
    pub value_counts: HashMap<usize, usize>,
    pub total: i32,
    pub count: i32,
    pub max: i32,
    pub max_count: i32,
    pub mean: f32,
    pub median: f32,
}

impl Histogram {
    pub fn from_value_counts(value_to_count: &HashMap<usize, usize>) -> Histogram {
        let mut val_counts = value_to_count.iter().map(|(v, c)| (*v as i32, *c as i32)).collect::<Vec<_>>();
        val_counts.sort();
        let total = val_counts.iter().fold(0, |n, (v, c)| n + v*c);
        let count = val_counts.iter().fold(0, |n, (_, c)| n + c);
        let max = val_counts.iter().fold(0, |n, (v, _)| std::cmp::max(*v, n));
        let max_count = val_counts.iter().fold(0, |n, (_, c)| std::cmp::max(*c, n));
        let mean = if count == 0 { 0.0 } else { (total as f32)/(count as f32) };
        let median_lo_index = (count - 1) / 2;
        let median_hi_index = count / 2;
        let mut median_lo = None;
        let mut median_hi = None;
        let mut n = 0;
        for (v, c) in val_counts {
            let next_n = n + c;
            if median_lo.is_none() && median_lo_index < next_n {
                median_lo = Some(v);
            }
            if median_hi.is_none() && median_hi_index < next_n {
                median_hi = Some(v);
            }
            n = next_n;
            if median_lo.is_some() && median_hi.is_some() {
                break;
            }
        }
        let median = (median_lo.unwrap_or(0) as f32 + median_hi.unwrap_or(0) as f32)/2.0;
        Histogram { value_counts: value_to_count.clone(), total, count, max, max_count, mean, median }
    }
}

enum SampleState {
    Never,
    AtEnd,
    EveryN(usize, usize),
    Probability(Bernoulli, ThreadRng),
    Time(Duration, Instant),
}

/// Decides which nodes are worth reporting on. Everything except never()
/// also fires once the search is done.
pub struct Sample {
    state: SampleState,
}

impl Sample {
    pub fn never() -> Self {
        Self { state: SampleState::Never }
    }

    pub fn at_end() -> Self {
        Self { state: SampleState::AtEnd }
    }

    pub fn every_n(n: usize) -> Self {
        Self { state: SampleState::EveryN(n, 0) }
    }

    pub fn probability(p: f64) -> Result<Self, Error> {
        let d = Bernoulli::new(p)
            .map_err(|e| Error::new(format!("Bad sampling probability {}: {}", p, e)))?;
        Ok(Self { state: SampleState::Probability(d, rng()) })
    }

    pub fn time(every: Duration) -> Self {
        Self { state: SampleState::Time(every, Instant::now()) }
    }

    pub fn sample(&mut self, done: bool) -> bool {
        match &mut self.state {
            SampleState::Never => false,
            SampleState::AtEnd => done,
            SampleState::EveryN(n, count) => {
                *count += 1;
                if count >= n || done {
                    *count = 0;
                    true
                } else {
                    false
                }
            },
            SampleState::Probability(d, rng) => {
                d.sample(rng) || done
            },
            SampleState::Time(duration, last) => {
                let now = Instant::now();
                if now.duration_since(*last) >= *duration || done {
                    *last = now;
                    true
                } else {
                    false
                }
            },
        }
    }
}

/// What DbgObserver::dump_stats writes out.
#[derive(Debug, Clone, Serialize)]
pub struct DbgStats {
    pub nodes: usize,
    pub elapsed_secs: f64,
    pub average_width: f64,
    pub solver: Option<SolveStats>,
    pub width: Histogram,
    pub depth: Histogram,
    pub pruned: Histogram,
    pub assigned: Histogram,
    pub dead_end_streak: Histogram,
}

/// Observer that keeps histograms about the shape of the search and logs a
/// sample of the nodes it sees.
pub struct DbgObserver {
    timer: TimerState,
    log_sample: Sample,
    stat: Option<(String, Sample)>,
    width_hist: HashMap<usize, usize>,
    depth_hist: HashMap<usize, usize>,
    pruned_hist: HashMap<usize, usize>,
    assigned_hist: HashMap<usize, usize>,
    dead_end_hist: HashMap<usize, usize>,
    dead_end_streak: usize,
    final_stats: Option<SolveStats>,
    nodes: usize,
}

impl DbgObserver {
    pub fn new() -> Self {
        DbgObserver {
            timer: TimerState::new(),
            log_sample: Sample::every_n(1),
            stat: None,
            width_hist: HashMap::new(),
            depth_hist: HashMap::new(),
            pruned_hist: HashMap::new(),
            assigned_hist: HashMap::new(),
            dead_end_hist: HashMap::new(),
            dead_end_streak: 0,
            final_stats: None,
            nodes: 0,
        }
    }

    pub fn sample_log(&mut self, sample: Sample) -> &mut Self {
        self.log_sample = sample;
        self
    }

    pub fn sample_stats<Str: Into<String>>(&mut self, filename: Str, sample: Sample) -> &mut Self {
        self.stat = Some((filename.into(), sample));
        self
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    fn close_streak(&mut self) {
        if self.dead_end_streak > 0 {
            *self.dead_end_hist.entry(self.dead_end_streak).or_default() += 1;
            self.dead_end_streak = 0;
        }
    }

    fn update_stats(&mut self, view: &dyn SolverView) {
        match view.event() {
            NodeEvent::Branching { width, .. } => {
                self.close_streak();
                *self.width_hist.entry(width).or_default() += 1;
                *self.pruned_hist.entry(view.pruned()).or_default() += 1;
            },
            NodeEvent::DeadEnd | NodeEvent::IdentityRejected => {
                self.dead_end_streak += 1;
            },
            NodeEvent::Complete => self.close_streak(),
        }
        *self.depth_hist.entry(view.depth()).or_default() += 1;
        *self.assigned_hist.entry(view.state().assigned_count()).or_default() += 1;
        self.nodes += 1;
    }

    pub fn stats(&self) -> DbgStats {
        let n_decisions = self.width_hist.iter().fold(0, |n, (_, count)| n+count);
        let total_choices = self.width_hist.iter().fold(0, |n, (w, count)| n+w*count);
        let average_width = if n_decisions == 0 { 0.0 } else { (total_choices as f64)/(n_decisions as f64) };
        DbgStats {
            nodes: self.nodes,
            elapsed_secs: self.timer.to_duration().as_secs_f64(),
            average_width,
            solver: self.final_stats.clone(),
            width: Histogram::from_value_counts(&self.width_hist),
            depth: Histogram::from_value_counts(&self.depth_hist),
            pruned: Histogram::from_value_counts(&self.pruned_hist),
            assigned: Histogram::from_value_counts(&self.assigned_hist),
            dead_end_streak: Histogram::from_value_counts(&self.dead_end_hist),
        }
    }

    pub fn dump_stats(&self, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
        let stats = self.stats();
        info!(nodes = stats.nodes, elapsed = stats.elapsed_secs, average_width = stats.average_width, "Dumping stats to {}", filename);
        let mut f = File::create(filename)?;
        f.write_all(serde_json::to_string_pretty(&stats)?.as_bytes())?;
        Ok(())
    }

    fn log(&self, view: &dyn SolverView) {
        let state = view.state();
        info!(
            node = view.node_count(),
            depth = view.depth(),
            event = ?view.event(),
            pruned = view.pruned(),
            elapsed = self.timer.to_duration().as_secs_f64(),
            "p = {:?}, s = {:?}", state.p, state.s
        );
    }

    fn maybe_dump(&mut self, done: bool) {
        if let Some((f, s)) = &mut self.stat {
            let filename = f.clone();
            if s.sample(done) {
                self.dump_stats(&filename)
                    .unwrap_or_else(|e| warn!("Failed to dump stats: {}", e));
            }
        }
    }
}

impl Default for DbgObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchObserver for DbgObserver {
    fn after_node(&mut self, view: &dyn SolverView) {
        self.timer.start();
        self.update_stats(view);
        if self.log_sample.sample(false) {
            self.log(view);
        }
        self.maybe_dump(false);
    }

    fn on_finish(&mut self, outcome: &Outcome, stats: &SolveStats) {
        self.timer.start();
        self.timer.end();
        self.close_streak();
        self.final_stats = Some(stats.clone());
        if self.log_sample.sample(true) {
            info!(
                nodes = stats.nodes,
                elapsed = self.timer.to_duration().as_secs_f64(),
                "FINISHED: {}", outcome
            );
        }
        self.maybe_dump(true);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::Usp;
    use crate::solver::BacktrackingSolver;

    fn to_counter(vals: Vec<usize>) -> HashMap<usize, usize> {
        let mut counter = HashMap::new();
        for v in vals {
            *counter.entry(v).or_default() += 1;
        }
        counter
    }

    #[test]
    fn test_dist_stat() {
        for hist in vec![
            Histogram {
                value_counts: to_counter(vec![2, 2, 3, 4, 4]),
                total: 15,
                count: 5,
                max: 4,
                max_count: 2,
                mean: 3.0,
                median: 3.0,
            },
            Histogram {
                value_counts: to_counter(vec![2, 2, 3, 3, 3, 4]),
                total: 17,
                count: 6,
                max: 4,
                max_count: 3,
                mean: 17.0/6.0,
                median: 3.0,
            },
            Histogram {
                value_counts: to_counter(vec![2, 3, 3, 4, 4, 4]),
                total: 20,
                count: 6,
                max: 4,
                max_count: 3,
                mean: 20.0/6.0,
                median: 3.5,
            },
        ] {
            let actual = Histogram::from_value_counts(&hist.value_counts);
            assert_eq!(actual, hist);
        }
    }

    #[test]
    fn test_empty_histogram() {
        let hist = Histogram::from_value_counts(&HashMap::new());
        assert_eq!(hist.count, 0);
        assert_eq!(hist.mean, 0.0);
        assert_eq!(hist.median, 0.0);
    }

    #[test]
    fn test_sample_every_n() {
        let mut s = Sample::every_n(3);
        let fired: Vec<bool> = (0..6).map(|_| s.sample(false)).collect();
        assert_eq!(fired, vec![false, false, true, false, false, true]);
        assert!(s.sample(true));
        assert!(!Sample::never().sample(true));
        let mut at_end = Sample::at_end();
        assert!(!at_end.sample(false));
        assert!(at_end.sample(true));
        assert!(Sample::probability(1.5).is_err());
        assert!(Sample::probability(1.0).unwrap().sample(false));
        let mut timed = Sample::time(Duration::from_secs(3600));
        assert!(!timed.sample(false));
        assert!(timed.sample(true));
    }

    #[test]
    fn test_null_observer_changes_nothing() {
        let puzzle = Usp::parse("1\n1\n").unwrap();
        let mut observer = NullObserver;
        let outcome = BacktrackingSolver::new(&puzzle, Some(&mut observer)).solve();
        assert_eq!(outcome, crate::solver::classify(&puzzle));
    }

    #[test]
    fn test_dbg_observer_counts_nodes() {
        let puzzle = Usp::parse("123\n312\n231\n").unwrap();
        let mut observer = DbgObserver::new();
        observer.sample_log(Sample::never());
        let stats = {
            let mut solver = BacktrackingSolver::new(&puzzle, Some(&mut observer));
            solver.solve();
            solver.stats().clone()
        };
        let dbg = observer.stats();
        assert_eq!(dbg.nodes, stats.nodes);
        assert_eq!(dbg.depth.count as usize, stats.nodes);
        assert_eq!(dbg.depth.max as usize, stats.max_depth);
        // Each step down the tree assigns exactly one slot.
        assert_eq!(dbg.assigned.value_counts, dbg.depth.value_counts);
        assert_eq!(dbg.solver, Some(stats));
    }
}
