use bit_set::BitSet;
use tracing::warn;
use crate::core::{Symbol, Usp};

/// Why a pair of permutations was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The pair shows the puzzle is weak.
    Weak,
    DimensionMismatch { expected: usize, p_len: usize, s_len: usize },
    /// Both permutations are the identity, which is excluded by definition.
    Identity,
    /// Exactly two of the three indicators hold at this entry.
    Violation { row: usize, col: usize },
}

pub fn is_identity(x: &[usize]) -> bool {
    x.iter().enumerate().all(|(i, v)| *v == i)
}

/// Exactly two of grid[a][col] == 1, grid[b][col] == 2, grid[c][col] == 3.
fn violates_at(grid: &Usp, a: usize, b: usize, c: usize, col: usize) -> bool {
    let satisfied = grid.is(a, col, Symbol::One) as u8
        + grid.is(b, col, Symbol::Two) as u8
        + grid.is(c, col, Symbol::Three) as u8;
    satisfied == 2
}

/// Checks a complete pair of permutations against the puzzle and reports the
/// first rule that decided the matter. Entries of p and s must be row indices
/// of the puzzle.
pub fn check(grid: &Usp, p: &[usize], s: &[usize]) -> Verdict {
    let n = grid.rows();
    if p.len() != n || s.len() != n {
        warn!(expected = n, p_len = p.len(), s_len = s.len(), "Wrong dimensions for permutations");
        return Verdict::DimensionMismatch { expected: n, p_len: p.len(), s_len: s.len() };
    }
    if is_identity(p) && is_identity(s) {
        return Verdict::Identity;
    }
    for i in 0..n {
        for j in 0..grid.cols() {
            if violates_at(grid, i, p[i], s[i], j) {
                return Verdict::Violation { row: i, col: j };
            }
        }
    }
    Verdict::Weak
}

/// True iff (p, s) proves the puzzle is weak.
pub fn verify(grid: &Usp, p: &[usize], s: &[usize]) -> bool {
    check(grid, p, s) == Verdict::Weak
}

/// Precomputes, for every triple of rows (a, b, c), whether some column has
/// exactly two of the three indicators. A pair (p, s) then verifies iff no
/// row i has a violating triple (i, p[i], s[i]), which turns each check into
/// n lookups instead of n * k comparisons.
#[derive(Debug, Clone)]
pub struct ViolationTable {
    n: usize,
    table: BitSet,
}

impl ViolationTable {
    pub fn new(grid: &Usp) -> Self {
        let n = grid.rows();
        let mut table = BitSet::with_capacity(n * n * n);
        for a in 0..n {
            for b in 0..n {
                for c in 0..n {
                    if (0..grid.cols()).any(|j| violates_at(grid, a, b, c, j)) {
                        table.insert((a * n + b) * n + c);
                    }
                }
            }
        }
        Self { n, table }
    }

    pub fn rows(&self) -> usize { self.n }

    pub fn violates(&self, a: usize, b: usize, c: usize) -> bool {
        self.table.contains((a * self.n + b) * self.n + c)
    }

    /// Same answers as verify(), using the table.
    pub fn verify(&self, p: &[usize], s: &[usize]) -> bool {
        if p.len() != self.n || s.len() != self.n {
            warn!(expected = self.n, p_len = p.len(), s_len = s.len(), "Wrong dimensions for permutations");
            return false;
        }
        if is_identity(p) && is_identity(s) {
            return false;
        }
        (0..self.n).all(|i| !self.violates(i, p[i], s[i]))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::brute_force::Permutations;
    use crate::core::identity;

    #[test]
    fn test_small_weak_puzzle() {
        let puzzle = Usp::new(vec![2, 2, 2, 3], 2, 2).unwrap();
        assert!(verify(&puzzle, &[1, 0], &[1, 0]));
    }

    #[test]
    fn test_small_strong_puzzle() {
        let puzzle = Usp::new(vec![1, 1, 2, 3], 2, 2).unwrap();
        assert!(!verify(&puzzle, &[1, 0], &[1, 0]));
        assert_eq!(check(&puzzle, &[1, 0], &[1, 0]), Verdict::Violation { row: 0, col: 0 });
    }

    #[test]
    fn test_minimal_weak_instance() {
        let puzzle = Usp::parse("1\n1\n").unwrap();
        assert_eq!(check(&puzzle, &[1, 0], &[0, 1]), Verdict::Weak);
    }

    #[test]
    fn test_identity_pair_always_rejected() {
        for input in ["1\n", "12\n31\n", "111\n222\n333\n", "231\n312\n123\n"] {
            let puzzle = Usp::parse(input).unwrap();
            let id = identity(puzzle.rows());
            assert_eq!(check(&puzzle, &id, &id), Verdict::Identity);
            assert!(!ViolationTable::new(&puzzle).verify(&id, &id));
        }
    }

    #[test]
    fn test_dimension_guard() {
        let puzzle = Usp::parse("12\n21\n").unwrap();
        assert_eq!(
            check(&puzzle, &[0], &[1, 0]),
            Verdict::DimensionMismatch { expected: 2, p_len: 1, s_len: 2 },
        );
        assert!(!verify(&puzzle, &[1, 0], &[1, 0, 2]));
        assert!(!ViolationTable::new(&puzzle).verify(&[1, 0, 2], &[1, 0]));
    }

    #[test]
    fn test_exactly_two_indicators_is_a_violation() {
        // Row 0 is all 1s, so the first indicator always holds. With p[0]
        // pointing at a row of 2s the second holds too, and only a row of 3s
        // for s[0] can rescue it.
        let puzzle = Usp::parse("11\n22\n33\n").unwrap();
        assert!(!verify(&puzzle, &[1, 0, 2], &[0, 1, 2]));
        assert_eq!(check(&puzzle, &[1, 0, 2], &[0, 1, 2]), Verdict::Violation { row: 0, col: 0 });
        // All three indicators hold in row 0; rows 1 and 2 have none.
        assert_eq!(check(&puzzle, &[1, 0, 2], &[2, 1, 0]), Verdict::Weak);
    }

    #[test]
    fn test_table_agrees_with_verifier() {
        for input in ["12\n31\n23\n", "1\n1\n1\n", "123\n231\n312\n", "3121\n1123\n2231\n"] {
            let puzzle = Usp::parse(input).unwrap();
            let table = ViolationTable::new(&puzzle);
            assert_eq!(table.rows(), puzzle.rows());
            for p in Permutations::new(puzzle.rows()) {
                for s in Permutations::new(puzzle.rows()) {
                    assert_eq!(table.verify(&p, &s), verify(&puzzle, &p, &s), "p={:?} s={:?}", p, s);
                }
            }
        }
    }
}
