use crate::core::{SearchState, Slot, Symbol, Usp};

/// Narrows the open slot of a row where the other permutation has already
/// been assigned. `row` is the row index, `m` the assigned value, `assigned`
/// the symbol the assigned side is checked against and `open` the symbol the
/// open side is checked against. Returns the number of values removed.
fn narrow(grid: &Usp, row: usize, m: usize, assigned: Symbol, open: Symbol, target: &mut Slot) -> usize {
    let mut removed = 0;
    for j in 0..grid.cols() {
        let satisfied = grid.is(row, j, Symbol::One) as u8 + grid.is(m, j, assigned) as u8;
        match satisfied {
            // Making the third indicator true would make it exactly two.
            1 => {
                for k in 0..grid.rows() {
                    if grid.is(k, j, open) && target.domain_mut().remove(k) {
                        removed += 1;
                    }
                }
            },
            // Two already hold, so the third has to as well.
            2 => {
                for k in 0..grid.rows() {
                    if !grid.is(k, j, open) && target.domain_mut().remove(k) {
                        removed += 1;
                    }
                }
            },
            _ => {},
        }
    }
    removed
}

/// One unit-propagation pass over the search state. For every row where
/// exactly one of p[i] and s[i] is assigned, removes the values from the
/// other slot's domain that would produce a violation at that row. Domains
/// are only ever tightened; nothing gets assigned and the pass is not
/// repeated to a fixpoint. Returns the total number of values removed.
pub fn propagate(grid: &Usp, state: &mut SearchState) -> usize {
    let mut removed = 0;
    for i in 0..grid.rows() {
        match (state.p.assignment(i), state.s.assignment(i)) {
            (Some(m), None) => {
                removed += narrow(grid, i, m, Symbol::Two, Symbol::Three, state.s.slot_mut(i));
            },
            (None, Some(m)) => {
                removed += narrow(grid, i, m, Symbol::Three, Symbol::Two, state.p.slot_mut(i));
            },
            _ => {},
        }
    }
    removed
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_no_assignments_no_change() {
        let puzzle = Usp::parse("123\n312\n231\n").unwrap();
        let mut state = SearchState::new(3);
        assert_eq!(propagate(&puzzle, &mut state), 0);
        assert_eq!(state, SearchState::new(3));
    }

    #[test]
    fn test_one_indicator_rules_out_threes() {
        // Row 0 is "1", p[0] = 0 points at a 1, so exactly one indicator holds
        // and s[0] must avoid rows containing a 3.
        let puzzle = Usp::parse("1\n3\n2\n3\n").unwrap();
        let mut state = SearchState::new(4);
        state.p.assign(0, 0);
        let removed = propagate(&puzzle, &mut state);
        assert_eq!(removed, 2);
        assert_eq!(state.s.slot(0).domain().to_vec(), vec![0, 2]);
        // Nothing else is touched.
        assert_eq!(state.s.slot(1).domain().len(), 4);
        assert_eq!(state.p.slot(1).domain().to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_two_indicators_force_a_three() {
        // Row 0 is "1" and p[0] = 1 points at a 2: s[0] must point at a 3.
        let puzzle = Usp::parse("1\n2\n3\n1\n").unwrap();
        let mut state = SearchState::new(4);
        state.p.assign(0, 1);
        propagate(&puzzle, &mut state);
        assert_eq!(state.s.slot(0).domain().to_vec(), vec![2]);
    }

    #[test]
    fn test_zero_indicators_leave_domain_alone() {
        // Row 0 is "2" and p[0] points at a 3: whatever s[0] is, at most one
        // indicator holds.
        let puzzle = Usp::parse("2\n3\n1\n").unwrap();
        let mut state = SearchState::new(3);
        state.p.assign(0, 1);
        assert_eq!(propagate(&puzzle, &mut state), 0);
        assert_eq!(state.s.slot(0).domain().to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_symmetric_rule_for_assigned_s() {
        // Row 0 is "1" and s[0] = 2 points at a 3: p[0] must point at a 2.
        let puzzle = Usp::parse("1\n2\n3\n2\n").unwrap();
        let mut state = SearchState::new(4);
        state.s.assign(0, 2);
        propagate(&puzzle, &mut state);
        assert_eq!(state.p.slot(0).domain().to_vec(), vec![1, 3]);
        // Row 1 is "2" and s[1] = 0 points at a 1: one indicator short of
        // trouble either way, so p[1] is left alone.
        let mut state = SearchState::new(4);
        state.s.assign(1, 0);
        assert_eq!(propagate(&puzzle, &mut state), 0);
    }

    #[test]
    fn test_columns_compound() {
        // Column 0 rules out rows with a 3 there, column 1 rules out rows
        // without a 3 there.
        let puzzle = Usp::parse("11\n32\n13\n23\n").unwrap();
        let mut state = SearchState::new(4);
        state.p.assign(0, 3);
        propagate(&puzzle, &mut state);
        // p[0] = 3: col 0 has (1, 2) -> two indicators -> s[0] needs a 3 in
        // col 0 (row 1 only). col 1 has (1, 3) -> one indicator -> s[0] must
        // avoid a 3 in col 1, which row 1 does.
        assert_eq!(state.s.slot(0).domain().to_vec(), vec![1]);
    }

    #[test]
    fn test_fully_assigned_rows_are_skipped() {
        let puzzle = Usp::parse("1\n2\n3\n").unwrap();
        let mut state = SearchState::new(3);
        state.p.assign(0, 1);
        state.s.assign(0, 0);
        let before = state.clone();
        assert_eq!(propagate(&puzzle, &mut state), 0);
        assert_eq!(state, before);
    }
}
