use clap::ValueEnum;
use crate::brute_force::brute_force;
use crate::core::{Error, Outcome, Usp};
use crate::dpll::DpllSolver;
use crate::solver::{BacktrackingSolver, SearchObserver};
use crate::verifier::verify;

/// Which classifier to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Method {
    /// Copy-per-branch search with unit propagation.
    Backtrack,
    /// In-place search with an undo trail and violation-table pruning.
    Dpll,
    /// Every pair of permutations, in lexicographic order.
    Brute,
    /// All of the above; they have to agree. Reports the backtracking
    /// result.
    Both,
}

fn agree(name: &str, expected: &Outcome, actual: &Outcome) -> Result<(), Error> {
    if expected.is_weak() != actual.is_weak() {
        return Err(Error::new(format!(
            "Methods disagree: backtrack says {}, {} says {}", expected, name, actual,
        )));
    }
    Ok(())
}

/// Classifies the puzzle with the given method and checks any witness with
/// the verifier. The observer, if any, watches the search that produces the
/// returned outcome; brute force has no search nodes to report.
pub fn run<'a>(grid: &'a Usp, method: Method, observer: Option<&'a mut dyn SearchObserver>) -> Result<Outcome, Error> {
    let outcome = match method {
        Method::Backtrack => BacktrackingSolver::new(grid, observer).solve(),
        Method::Dpll => DpllSolver::new(grid, observer).solve(),
        Method::Brute => brute_force(grid),
        Method::Both => {
            let backtrack = BacktrackingSolver::new(grid, observer).solve();
            agree("dpll", &backtrack, &DpllSolver::new(grid, None).solve())?;
            agree("brute force", &backtrack, &brute_force(grid))?;
            backtrack
        },
    };
    if let Some(w) = outcome.witness() {
        if !verify(grid, &w.p, &w.s) {
            return Err(Error::new(format!("Witness failed verification: {}", outcome)));
        }
    }
    Ok(outcome)
}
