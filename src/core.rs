use std::borrow::Cow;
use std::fmt::{Debug, Display};
use bit_set::BitSet;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde_derive::{Deserialize, Serialize};

/// Error type. This is used to indicate something wrong with the puzzle as
/// provided (e.g., malformed input) or with the way the library is being
/// called. Dead ends during the search and exhaustion of the search space are
/// not errors; they are just the solver finding out that a puzzle is strong.
#[derive(Debug, Clone, PartialEq)]
pub struct Error(Cow<'static, str>);
impl Error {
    pub const fn new_const(s: &'static str) -> Self {
        Error(Cow::Borrowed(s))
    }

    pub fn new<S: Into<String>>(s: S) -> Self {
        Error(Cow::Owned(s.into()))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

pub const EMPTY_PUZZLE: Error = Error::new_const("Puzzle has no rows");
pub const RAGGED_PUZZLE: Error = Error::new_const("Puzzle rows have different lengths");
pub const UNASSIGNED_SLOT: Error = Error::new_const("Permutation is not fully assigned");

/// The three symbols a USP is written in. The weakness condition only ever
/// asks whether a particular entry is a particular symbol, so there's nothing
/// more to them than their identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Symbol {
    One = 1,
    Two = 2,
    Three = 3,
}

pub const SYMBOLS: [Symbol; 3] = [Symbol::One, Symbol::Two, Symbol::Three];

impl Symbol {
    pub fn parse(c: char) -> Result<Self, Error> {
        let digit = c.to_digit(10)
            .ok_or_else(|| Error::new(format!("Not a digit: {:?}", c)))?;
        Self::try_from(digit as u8)
            .map_err(|_| Error::new(format!("Symbol out of range (must be 1, 2 or 3): {}", digit)))
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// A uniquely solvable puzzle candidate: an n x k grid of symbols. Rows are
/// the things being permuted; columns are where the agreement rule gets
/// checked. The grid is immutable once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Usp {
    rows: usize,
    cols: usize,
    data: Box<[Symbol]>,
}

impl Usp {
    /// Builds a puzzle from row-major symbol values.
    pub fn new(data: Vec<u8>, rows: usize, cols: usize) -> Result<Self, Error> {
        if data.len() != rows * cols {
            return Err(Error::new(format!(
                "Expected {} entries for a {}x{} puzzle; got {}",
                rows * cols, rows, cols, data.len(),
            )));
        }
        let symbols = data.into_iter()
            .map(|u| Symbol::try_from(u).map_err(|_| {
                Error::new(format!("Symbol out of range (must be 1, 2 or 3): {}", u))
            }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_symbols(symbols, rows, cols))
    }

    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, Error> {
        if rows.is_empty() {
            return Err(EMPTY_PUZZLE);
        }
        let cols = rows[0].len();
        if rows.iter().any(|r| r.len() != cols) {
            return Err(RAGGED_PUZZLE);
        }
        Self::new(rows.concat(), rows.len(), cols)
    }

    pub(crate) fn from_symbols(symbols: Vec<Symbol>, rows: usize, cols: usize) -> Self {
        assert_eq!(symbols.len(), rows * cols, "Symbol count does not match dimensions");
        Self { rows, cols, data: symbols.into_boxed_slice() }
    }

    /// One row per line, one digit per column. Surrounding whitespace and
    /// blank lines are ignored.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut rows = Vec::new();
        for line in s.lines().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            let row = line.chars()
                .map(|c| Symbol::parse(c).map(u8::from))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Self::from_rows(&rows)
    }

    pub fn serialize(&self) -> String {
        let mut result = String::with_capacity(self.rows * (self.cols + 1));
        for r in 0..self.rows {
            for c in 0..self.cols {
                result.push_str(self.get(r, c).to_string().as_str());
            }
            result.push('\n');
        }
        result
    }

    pub fn get(&self, row: usize, col: usize) -> Symbol {
        self.data[row * self.cols + col]
    }

    pub fn is(&self, row: usize, col: usize, symbol: Symbol) -> bool {
        self.get(row, col) == symbol
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
}

impl Display for Usp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl Debug for Usp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Usp({}x{}):\n{}", self.rows, self.cols, self.serialize())
    }
}

/// The not-yet-ruled-out values (row indices in [0, n)) for a slot. Iteration
/// is always in ascending order, which is what makes the search
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    s: BitSet,
}

impl Domain {
    pub fn empty(n: usize) -> Self {
        Self { s: BitSet::with_capacity(n) }
    }

    pub fn full(n: usize) -> Self {
        let mut d = Self::empty(n);
        (0..n).for_each(|v| { d.s.insert(v); });
        d
    }

    /// Returns whether the value was newly added.
    pub fn insert(&mut self, value: usize) -> bool {
        self.s.insert(value)
    }

    /// Returns whether the value was actually present.
    pub fn remove(&mut self, value: usize) -> bool {
        self.s.remove(value)
    }

    pub fn contains(&self, value: usize) -> bool {
        self.s.contains(value)
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = usize> + 'a {
        self.s.iter()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

/// One position of a permutation under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    assigned: Option<usize>,
    domain: Domain,
}

impl Slot {
    pub fn new(n: usize) -> Self {
        Self { assigned: None, domain: Domain::full(n) }
    }

    pub fn assigned(&self) -> Option<usize> { self.assigned }
    pub fn is_assigned(&self) -> bool { self.assigned.is_some() }
    pub fn domain(&self) -> &Domain { &self.domain }
    pub fn domain_mut(&mut self) -> &mut Domain { &mut self.domain }

    // Sets or clears the assignment without touching any domain. Callers
    // that undo work keep the domains consistent themselves.
    pub(crate) fn set_assigned(&mut self, value: Option<usize>) {
        self.assigned = value;
    }

    // An open slot with nowhere left to go.
    pub fn is_dead(&self) -> bool {
        self.assigned.is_none() && self.domain.is_empty()
    }
}

/// A permutation of [0, n) in the process of being built: one Slot per row.
#[derive(Clone, PartialEq, Eq)]
pub struct PartialPermutation {
    slots: Vec<Slot>,
}

impl PartialPermutation {
    pub fn new(n: usize) -> Self {
        Self { slots: vec![Slot::new(n); n] }
    }

    pub fn len(&self) -> usize { self.slots.len() }
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }
    pub fn slot(&self, row: usize) -> &Slot { &self.slots[row] }
    pub fn slot_mut(&mut self, row: usize) -> &mut Slot { &mut self.slots[row] }
    pub fn slots(&self) -> &[Slot] { &self.slots }

    pub fn assignment(&self, row: usize) -> Option<usize> {
        self.slots[row].assigned
    }

    /// Assigns the value to the slot at row and then removes it from the
    /// domain of every slot in this permutation (all-different).
    pub fn assign(&mut self, row: usize, value: usize) {
        self.slots[row].assigned = Some(value);
        for slot in self.slots.iter_mut() {
            slot.domain.remove(value);
        }
    }

    pub fn first_unassigned(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.is_assigned())
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Slot::is_assigned)
    }

    pub fn has_dead_slot(&self) -> bool {
        self.slots.iter().any(Slot::is_dead)
    }

    // Only ever true when fully assigned, since an open slot never equals its
    // own index.
    pub fn is_identity(&self) -> bool {
        self.slots.iter().enumerate().all(|(i, s)| s.assigned == Some(i))
    }

    pub fn assigned_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_assigned()).count()
    }

    pub fn to_vec(&self) -> Result<Vec<usize>, Error> {
        self.slots.iter().map(|s| s.assigned.ok_or(UNASSIGNED_SLOT)).collect()
    }
}

impl Debug for PartialPermutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, slot) in self.slots.iter().enumerate() {
            match slot.assigned {
                Some(v) => write!(f, "{}", v)?,
                None => write!(f, ".")?,
            }
            if i + 1 < self.slots.len() {
                write!(f, ", ")?;
            }
        }
        write!(f, "]")
    }
}

/// Which of the two permutations is being talked about. P is applied to the
/// symbol-2 indicator and S to the symbol-3 indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    P,
    S,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::P => Side::S,
            Side::S => Side::P,
        }
    }
}

/// The partial solution at one node of the search tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    pub p: PartialPermutation,
    pub s: PartialPermutation,
}

impl SearchState {
    pub fn new(n: usize) -> Self {
        Self { p: PartialPermutation::new(n), s: PartialPermutation::new(n) }
    }

    pub fn from_parts(p: PartialPermutation, s: PartialPermutation) -> Self {
        Self { p, s }
    }

    pub fn side(&self, side: Side) -> &PartialPermutation {
        match side {
            Side::P => &self.p,
            Side::S => &self.s,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut PartialPermutation {
        match side {
            Side::P => &mut self.p,
            Side::S => &mut self.s,
        }
    }

    pub fn has_dead_end(&self) -> bool {
        self.p.has_dead_slot() || self.s.has_dead_slot()
    }

    pub fn is_identity_pair(&self) -> bool {
        self.p.is_identity() && self.s.is_identity()
    }

    pub fn is_complete(&self) -> bool {
        self.p.is_complete() && self.s.is_complete()
    }

    pub fn assigned_count(&self) -> usize {
        self.p.assigned_count() + self.s.assigned_count()
    }

    /// The next slot to branch on: the lowest row with anything left open,
    /// taking P's slot before S's within that row.
    pub fn next_open(&self) -> Option<(Side, usize)> {
        for row in 0..self.p.len() {
            if !self.p.slot(row).is_assigned() {
                return Some((Side::P, row));
            } else if !self.s.slot(row).is_assigned() {
                return Some((Side::S, row));
            }
        }
        None
    }

    pub fn witness(&self) -> Result<Witness, Error> {
        Ok(Witness { p: self.p.to_vec()?, s: self.s.to_vec()? })
    }
}

/// A concrete pair of permutations demonstrating that a puzzle is weak.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Witness {
    pub p: Vec<usize>,
    pub s: Vec<usize>,
}

/// The result of classifying a puzzle, shared by every solving method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Weak(Witness),
    Strong,
}

impl Outcome {
    pub fn is_weak(&self) -> bool {
        matches!(self, Outcome::Weak(_))
    }

    pub fn witness(&self) -> Option<&Witness> {
        match self {
            Outcome::Weak(w) => Some(w),
            Outcome::Strong => None,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Weak(w) => write!(f, "weak (p = {:?}, s = {:?})", w.p, w.s),
            Outcome::Strong => write!(f, "strong"),
        }
    }
}

/// The identity permutation on [0, n).
pub fn identity(n: usize) -> Vec<usize> {
    (0..n).collect()
}
