use serde_derive::{Deserialize, Serialize};
use tracing::{debug, trace};
use crate::core::{Outcome, PartialPermutation, SearchState, Side, Usp};
use crate::propagation::propagate;

/// What the solver concluded at a node of the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEvent {
    /// Some open slot has an empty domain.
    DeadEnd,
    /// Both permutations are fully assigned to the identity.
    IdentityRejected,
    /// Everything is assigned; this node is the witness.
    Complete,
    /// About to try `width` values for the slot at (side, row).
    Branching { side: Side, row: usize, width: usize },
}

/// Running totals for a single solve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveStats {
    pub nodes: usize,
    pub dead_ends: usize,
    pub identity_rejections: usize,
    pub completions: usize,
    pub branches: usize,
    pub pruned: usize,
    pub max_depth: usize,
}

// A view on a node of the search and the solver's totals so far.
pub trait SolverView {
    fn node_count(&self) -> usize;
    fn depth(&self) -> usize;
    fn event(&self) -> NodeEvent;
    // Values removed by propagation at this node.
    fn pruned(&self) -> usize;
    fn state(&self) -> &SearchState;
    fn stats(&self) -> &SolveStats;
}

// Mostly for debugging purposes, a SearchObserver gets to look at every node
// the solver visits. This is much easier to inject into a failing test than
// fully instrumenting the recursion.
pub trait SearchObserver {
    fn after_node(&mut self, view: &dyn SolverView);
    fn on_finish(&mut self, outcome: &Outcome, stats: &SolveStats) {
        let _ = outcome;
        let _ = stats;
    }
}

pub(crate) struct NodeView<'a> {
    pub(crate) stats: &'a SolveStats,
    pub(crate) state: &'a SearchState,
    pub(crate) depth: usize,
    pub(crate) event: NodeEvent,
    pub(crate) pruned: usize,
}

impl <'a> SolverView for NodeView<'a> {
    fn node_count(&self) -> usize { self.stats.nodes }
    fn depth(&self) -> usize { self.depth }
    fn event(&self) -> NodeEvent { self.event }
    fn pruned(&self) -> usize { self.pruned }
    fn state(&self) -> &SearchState { self.state }
    fn stats(&self) -> &SolveStats { self.stats }
}

/// Depth-first search over pairs of partial permutations. Each node checks
/// for a dead end, then for the identity pair, then for completion; if none
/// of those apply it runs one propagation pass and branches on the next open
/// slot, trying its remaining values in ascending order on independent
/// copies of the state.
pub struct BacktrackingSolver<'a> {
    grid: &'a Usp,
    observer: Option<&'a mut dyn SearchObserver>,
    stats: SolveStats,
}

impl <'a> BacktrackingSolver<'a> {
    pub fn new(grid: &'a Usp, observer: Option<&'a mut dyn SearchObserver>) -> Self {
        Self { grid, observer, stats: SolveStats::default() }
    }

    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// Searches from the given state. Returns whether a witness was found,
    /// along with the accepting state (if found) or the state passed in (if
    /// not).
    pub fn solve_from(&mut self, state: SearchState) -> (bool, SearchState) {
        self.search(state, 0)
    }

    /// Classifies the puzzle, starting from full domains.
    pub fn solve(&mut self) -> Outcome {
        let (found, state) = self.solve_from(SearchState::new(self.grid.rows()));
        let outcome = match (found, state.witness()) {
            (true, Ok(w)) => Outcome::Weak(w),
            _ => Outcome::Strong,
        };
        debug!(nodes = self.stats.nodes, dead_ends = self.stats.dead_ends, weak = outcome.is_weak(), "Search finished");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_finish(&outcome, &self.stats);
        }
        outcome
    }

    fn notify(&mut self, state: &SearchState, depth: usize, event: NodeEvent, pruned: usize) {
        if let Some(observer) = self.observer.as_mut() {
            let view = NodeView { stats: &self.stats, state, depth, event, pruned };
            observer.after_node(&view);
        }
    }

    fn search(&mut self, mut state: SearchState, depth: usize) -> (bool, SearchState) {
        self.stats.nodes += 1;
        self.stats.max_depth = std::cmp::max(self.stats.max_depth, depth);
        if state.has_dead_end() {
            trace!(depth, "Contradiction found");
            self.stats.dead_ends += 1;
            self.notify(&state, depth, NodeEvent::DeadEnd, 0);
            return (false, state);
        }
        if state.is_identity_pair() {
            debug!(depth, "Identity found");
            self.stats.identity_rejections += 1;
            self.notify(&state, depth, NodeEvent::IdentityRejected, 0);
            return (false, state);
        }
        if state.is_complete() {
            self.stats.completions += 1;
            self.notify(&state, depth, NodeEvent::Complete, 0);
            return (true, state);
        }

        let pruned = propagate(self.grid, &mut state);
        self.stats.pruned += pruned;

        let (side, row) = match state.next_open() {
            Some(open) => open,
            None => return (false, state),
        };
        let candidates = state.side(side).slot(row).domain().to_vec();
        self.notify(&state, depth, NodeEvent::Branching { side, row, width: candidates.len() }, pruned);
        for value in candidates {
            trace!(?side, row, value, depth, "Attempting assignment");
            self.stats.branches += 1;
            let mut child = state.clone();
            child.side_mut(side).assign(row, value);
            let (found, result) = self.search(child, depth + 1);
            if found {
                return (true, result);
            }
        }
        (false, state)
    }
}

/// Runs the search from (p, s) with no observer. Returns whether a witness
/// was found, plus the final pair of permutations.
pub fn solve(grid: &Usp, p: PartialPermutation, s: PartialPermutation) -> (bool, PartialPermutation, PartialPermutation) {
    let mut solver = BacktrackingSolver::new(grid, None);
    let (found, state) = solver.solve_from(SearchState::from_parts(p, s));
    (found, state.p, state.s)
}

/// Classifies the puzzle as weak (with a witness) or strong.
pub fn classify(grid: &Usp) -> Outcome {
    BacktrackingSolver::new(grid, None).solve()
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use super::*;
    use crate::brute_force::brute_force_with_table;
    use crate::core::{identity, Witness};
    use crate::generator::UspGenerator;
    use crate::verifier::verify;

    #[test]
    fn test_degenerate_is_strong() {
        let puzzle = Usp::parse("1\n").unwrap();
        let (found, p, s) = solve(&puzzle, PartialPermutation::new(1), PartialPermutation::new(1));
        assert!(!found);
        assert_eq!(p.len(), 1);
        assert_eq!(s.len(), 1);
        assert_eq!(classify(&puzzle), Outcome::Strong);
    }

    #[test]
    fn test_minimal_weak_instance() {
        let puzzle = Usp::parse("1\n1\n").unwrap();
        let (found, p, s) = solve(&puzzle, PartialPermutation::new(2), PartialPermutation::new(2));
        assert!(found);
        let (p, s) = (p.to_vec().unwrap(), s.to_vec().unwrap());
        assert!(verify(&puzzle, &p, &s));
        // The s[0] = 0 branch runs into the identity; s[0] = 1 succeeds.
        assert_eq!(classify(&puzzle), Outcome::Weak(Witness { p: vec![0, 1], s: vec![1, 0] }));
    }

    #[test]
    fn test_small_puzzles() {
        let weak = Usp::new(vec![2, 2, 2, 3], 2, 2).unwrap();
        let strong = Usp::new(vec![1, 1, 2, 3], 2, 2).unwrap();
        let outcome = classify(&weak);
        let w = outcome.witness().expect("Should be weak");
        assert!(verify(&weak, &w.p, &w.s));
        assert_eq!(classify(&strong), Outcome::Strong);
    }

    #[test]
    fn test_dead_end_at_root() {
        let puzzle = Usp::parse("12\n21\n").unwrap();
        let mut p = PartialPermutation::new(2);
        p.slot_mut(1).domain_mut().remove(0);
        p.slot_mut(1).domain_mut().remove(1);
        let mut solver = BacktrackingSolver::new(&puzzle, None);
        let (found, state) = solver.solve_from(SearchState::from_parts(p.clone(), PartialPermutation::new(2)));
        assert!(!found);
        assert_eq!(state.p, p);
        assert_eq!(solver.stats().nodes, 1);
        assert_eq!(solver.stats().dead_ends, 1);
    }

    #[test]
    fn test_identity_rejected_even_when_complete() {
        let puzzle = Usp::parse("1\n1\n").unwrap();
        let mut state = SearchState::new(2);
        for i in 0..2 {
            state.p.assign(i, i);
            state.s.assign(i, i);
        }
        let mut solver = BacktrackingSolver::new(&puzzle, None);
        let (found, _) = solver.solve_from(state);
        assert!(!found);
        assert_eq!(solver.stats().identity_rejections, 1);
        assert_eq!(solver.stats().completions, 0);
    }

    #[test]
    fn test_deterministic() {
        let mut generator = UspGenerator::seeded(7);
        for _ in 0..20 {
            let puzzle = generator.random_puzzle(5, 6);
            assert_eq!(classify(&puzzle), classify(&puzzle));
        }
    }

    #[test]
    fn test_agrees_with_brute_force() {
        let mut generator = UspGenerator::from_rng(ChaCha20Rng::seed_from_u64(0x5eed));
        for n in 1..=6 {
            let trials = match n {
                1..=4 => 8,
                5 => 4,
                _ => 2,
            };
            for k in 1..=8 {
                for _ in 0..trials {
                    let puzzle = generator.random_puzzle(n, k);
                    let outcome = classify(&puzzle);
                    assert_eq!(outcome.is_weak(), brute_force_with_table(&puzzle).is_weak(), "{:?}", puzzle);
                    if let Some(w) = outcome.witness() {
                        assert!(verify(&puzzle, &w.p, &w.s));
                        assert!(!(w.p == identity(n) && w.s == identity(n)));
                    }
                }
            }
        }
    }

    #[derive(Default)]
    struct EventCounter {
        dead_ends: usize,
        branchings: usize,
        finished: Option<bool>,
        max_depth: usize,
    }

    impl SearchObserver for EventCounter {
        fn after_node(&mut self, view: &dyn SolverView) {
            match view.event() {
                NodeEvent::DeadEnd => self.dead_ends += 1,
                NodeEvent::Branching { width, .. } => {
                    self.branchings += 1;
                    let (side, row) = view.state().next_open().unwrap();
                    assert_eq!(view.state().side(side).slot(row).domain().len(), width);
                },
                _ => {},
            }
            assert!(view.depth() <= 2 * view.state().p.len());
            self.max_depth = std::cmp::max(self.max_depth, view.depth());
        }

        fn on_finish(&mut self, outcome: &Outcome, _stats: &SolveStats) {
            self.finished = Some(outcome.is_weak());
        }
    }

    #[test]
    fn test_observer_sees_every_node() {
        let puzzle = Usp::parse("12\n31\n23\n").unwrap();
        let mut counter = EventCounter::default();
        let (outcome, stats) = {
            let mut solver = BacktrackingSolver::new(&puzzle, Some(&mut counter));
            let outcome = solver.solve();
            (outcome, solver.stats().clone())
        };
        assert_eq!(counter.finished, Some(outcome.is_weak()));
        assert_eq!(counter.dead_ends, stats.dead_ends);
        assert_eq!(counter.max_depth, stats.max_depth);
        assert!(counter.branchings > 0);
        assert!(stats.nodes >= stats.branches);
    }
}
