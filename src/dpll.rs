use tracing::{debug, trace};
use crate::core::{Outcome, SearchState, Side, Usp};
use crate::solver::{NodeEvent, NodeView, SearchObserver, SolveStats};
use crate::verifier::ViolationTable;

// One reversible change to the search state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrailEntry {
    Assigned(Side, usize),
    Removed(Side, usize, usize),
}

/// Depth-first search that works on a single SearchState in place. Every
/// change goes onto a trail, and backtracking pops the trail back to the
/// mark taken before the assignment. All of p is assigned (lowest row
/// first) before any of s.
///
/// Assigning one slot of a row prunes the other slot of that row with the
/// ViolationTable, so every value left in an open slot's domain is
/// consistent with its partner if the partner is assigned.
pub struct DpllSolver<'a> {
    table: ViolationTable,
    state: SearchState,
    trail: Vec<TrailEntry>,
    observer: Option<&'a mut dyn SearchObserver>,
    stats: SolveStats,
}

impl <'a> DpllSolver<'a> {
    pub fn new(grid: &Usp, observer: Option<&'a mut dyn SearchObserver>) -> Self {
        Self {
            table: ViolationTable::new(grid),
            state: SearchState::new(grid.rows()),
            trail: Vec::new(),
            observer,
            stats: SolveStats::default(),
        }
    }

    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// The current state: the witness after a weak result, and back to full
    /// domains after a strong one.
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn solve(&mut self) -> Outcome {
        let found = self.search(0, 0);
        let outcome = match (found, self.state.witness()) {
            (true, Ok(w)) => Outcome::Weak(w),
            _ => Outcome::Strong,
        };
        debug!(nodes = self.stats.nodes, dead_ends = self.stats.dead_ends, weak = outcome.is_weak(), "Search finished");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_finish(&outcome, &self.stats);
        }
        outcome
    }

    fn notify(&mut self, depth: usize, event: NodeEvent, pruned: usize) {
        if let Some(observer) = self.observer.as_mut() {
            let view = NodeView { stats: &self.stats, state: &self.state, depth, event, pruned };
            observer.after_node(&view);
        }
    }

    fn remove(&mut self, side: Side, row: usize, value: usize) -> bool {
        let removed = self.state.side_mut(side).slot_mut(row).domain_mut().remove(value);
        if removed {
            self.trail.push(TrailEntry::Removed(side, row, value));
        }
        removed
    }

    // Assigns the slot, removes the value from the rest of its permutation
    // and prunes the partner slot in the same row. Returns the number of
    // values removed.
    fn assign_propagate(&mut self, side: Side, row: usize, value: usize) -> usize {
        self.state.side_mut(side).slot_mut(row).set_assigned(Some(value));
        self.trail.push(TrailEntry::Assigned(side, row));
        let n = self.table.rows();
        let mut removed = 0;
        for r in 0..n {
            if self.remove(side, r, value) {
                removed += 1;
            }
        }
        let other = side.other();
        if !self.state.side(other).slot(row).is_assigned() {
            for c in 0..n {
                let violates = match side {
                    Side::P => self.table.violates(row, value, c),
                    Side::S => self.table.violates(row, c, value),
                };
                if violates && self.remove(other, row, c) {
                    removed += 1;
                }
            }
        }
        removed
    }

    fn undo(&mut self, mark: usize) {
        for entry in self.trail.drain(mark..).rev() {
            match entry {
                TrailEntry::Assigned(side, row) => {
                    self.state.side_mut(side).slot_mut(row).set_assigned(None);
                },
                TrailEntry::Removed(side, row, value) => {
                    self.state.side_mut(side).slot_mut(row).domain_mut().insert(value);
                },
            }
        }
    }

    fn search(&mut self, depth: usize, pruned: usize) -> bool {
        self.stats.nodes += 1;
        self.stats.max_depth = std::cmp::max(self.stats.max_depth, depth);
        if self.state.has_dead_end() {
            trace!(depth, "Contradiction found");
            self.stats.dead_ends += 1;
            self.notify(depth, NodeEvent::DeadEnd, pruned);
            return false;
        }
        if self.state.is_identity_pair() {
            debug!(depth, "Identity found");
            self.stats.identity_rejections += 1;
            self.notify(depth, NodeEvent::IdentityRejected, pruned);
            return false;
        }
        let (side, row) = match (self.state.p.first_unassigned(), self.state.s.first_unassigned()) {
            (Some(row), _) => (Side::P, row),
            (None, Some(row)) => (Side::S, row),
            (None, None) => {
                self.stats.completions += 1;
                self.notify(depth, NodeEvent::Complete, pruned);
                return true;
            },
        };
        let candidates = self.state.side(side).slot(row).domain().to_vec();
        self.notify(depth, NodeEvent::Branching { side, row, width: candidates.len() }, pruned);
        for value in candidates {
            trace!(?side, row, value, depth, "Attempting assignment");
            self.stats.branches += 1;
            let mark = self.trail.len();
            let removed = self.assign_propagate(side, row, value);
            self.stats.pruned += removed;
            if self.search(depth + 1, removed) {
                return true;
            }
            self.undo(mark);
        }
        false
    }
}

/// Classifies the puzzle with the in-place solver.
pub fn classify_dpll(grid: &Usp) -> Outcome {
    DpllSolver::new(grid, None).solve()
}
