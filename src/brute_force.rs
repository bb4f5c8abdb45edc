use crate::core::{identity, Outcome, Usp, Witness};
use crate::verifier::{verify, ViolationTable};

/// Rearranges v into the next permutation in lexicographic order. Returns
/// false (leaving v sorted ascending) once the last permutation has been
/// passed.
pub fn next_permutation(v: &mut [usize]) -> bool {
    if v.len() < 2 {
        return false;
    }
    let mut i = v.len() - 1;
    while i > 0 && v[i - 1] >= v[i] {
        i -= 1;
    }
    if i == 0 {
        v.reverse();
        return false;
    }
    let mut j = v.len() - 1;
    while v[j] <= v[i - 1] {
        j -= 1;
    }
    v.swap(i - 1, j);
    v[i..].reverse();
    true
}

/// All permutations of [0, n) in lexicographic order, starting with the
/// identity.
#[derive(Debug, Clone)]
pub struct Permutations {
    next: Option<Vec<usize>>,
}

impl Permutations {
    pub fn new(n: usize) -> Self {
        Self { next: Some(identity(n)) }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        if next_permutation(&mut following) {
            self.next = Some(following);
        }
        Some(current)
    }
}

/// Naive solver: tries every (p, s) pair, p in the outer loop, and returns
/// the first pair the verifier accepts. O((n!)^2 * n * k), so only usable as
/// an oracle on tiny puzzles.
pub fn brute_force(grid: &Usp) -> Outcome {
    let n = grid.rows();
    for p in Permutations::new(n) {
        for s in Permutations::new(n) {
            if verify(grid, &p, &s) {
                return Outcome::Weak(Witness { p, s });
            }
        }
    }
    Outcome::Strong
}

/// Same enumeration order and answer as brute_force(), but checks each pair
/// against a precomputed ViolationTable.
pub fn brute_force_with_table(grid: &Usp) -> Outcome {
    let table = ViolationTable::new(grid);
    let n = grid.rows();
    for p in Permutations::new(n) {
        for s in Permutations::new(n) {
            if table.verify(&p, &s) {
                return Outcome::Weak(Witness { p, s });
            }
        }
    }
    Outcome::Strong
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_permutations_lexicographic() {
        let perms: Vec<_> = Permutations::new(3).collect();
        assert_eq!(perms, vec![
            vec![0, 1, 2],
            vec![0, 2, 1],
            vec![1, 0, 2],
            vec![1, 2, 0],
            vec![2, 0, 1],
            vec![2, 1, 0],
        ]);
        assert_eq!(Permutations::new(5).count(), 120);
        assert_eq!(Permutations::new(1).collect::<Vec<_>>(), vec![vec![0]]);
        assert_eq!(Permutations::new(0).count(), 1);
    }

    #[test]
    fn test_next_permutation_wraps() {
        let mut v = vec![2, 1, 0];
        assert!(!next_permutation(&mut v));
        assert_eq!(v, vec![0, 1, 2]);
    }

    #[test]
    fn test_brute_force_small_puzzles() {
        let weak = Usp::new(vec![2, 2, 2, 3], 2, 2).unwrap();
        let strong = Usp::new(vec![1, 1, 2, 3], 2, 2).unwrap();
        let outcome = brute_force(&weak);
        assert!(outcome.is_weak());
        let w = outcome.witness().unwrap();
        assert!(verify(&weak, &w.p, &w.s));
        assert_eq!(brute_force(&strong), Outcome::Strong);
    }

    #[test]
    fn test_brute_force_degenerate() {
        let puzzle = Usp::parse("1\n").unwrap();
        assert_eq!(brute_force(&puzzle), Outcome::Strong);
        assert_eq!(brute_force_with_table(&puzzle), Outcome::Strong);
    }

    #[test]
    fn test_brute_force_minimal_weak() {
        let puzzle = Usp::parse("1\n1\n").unwrap();
        // p = identity, s = (1, 0) is the first pair in enumeration order.
        assert_eq!(brute_force(&puzzle), Outcome::Weak(Witness { p: vec![0, 1], s: vec![1, 0] }));
    }

    #[test]
    fn test_table_variant_matches() {
        for input in ["12\n31\n23\n", "123\n231\n312\n", "11\n22\n33\n", "3121\n1123\n2231\n3312\n"] {
            let puzzle = Usp::parse(input).unwrap();
            assert_eq!(brute_force_with_table(&puzzle), brute_force(&puzzle));
        }
    }
}
