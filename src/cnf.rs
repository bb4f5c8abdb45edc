use std::collections::HashSet;
use std::fmt::Write;
use crate::core::{Error, Symbol, Usp, Witness};

/// A DIMACS-style literal: +v means variable v is true, -v that it is false.
/// Variables are numbered from 1.
pub type Literal = i32;
pub type Clause = Vec<Literal>;

/// Variable for "p maps row j to row i", i.e. p[j] = i.
pub fn x_var(n: usize, i: usize, j: usize) -> Literal {
    (i * n + j + 1) as Literal
}

/// Variable for "s maps row j to row i", i.e. s[j] = i.
pub fn y_var(n: usize, i: usize, j: usize) -> Literal {
    (n * n + i * n + j + 1) as Literal
}

/// The weakness predicate for one puzzle as a formula in conjunctive normal
/// form. Satisfiable iff the puzzle is weak; any model decodes to a witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cnf {
    pub n: usize,
    pub num_vars: usize,
    pub clauses: Vec<Clause>,
}

impl Cnf {
    pub fn to_dimacs(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "p cnf {} {}", self.num_vars, self.clauses.len());
        for clause in &self.clauses {
            for lit in clause {
                let _ = write!(out, "{} ", lit);
            }
            out.push_str("0\n");
        }
        out
    }

    /// Evaluates the formula under a model. Variables not mentioned
    /// positively in the model are false.
    pub fn is_satisfied_by(&self, model: &[Literal]) -> bool {
        let truth: HashSet<Literal> = model.iter().copied().filter(|l| *l > 0).collect();
        self.clauses.iter().all(|clause| {
            clause.iter().any(|lit| truth.contains(&lit.abs()) == (*lit > 0))
        })
    }
}

fn add_bijection(n: usize, var: fn(usize, usize, usize) -> Literal, clauses: &mut Vec<Clause>) {
    for i in 0..n {
        for j in 0..n {
            // Each row is the image of at most one row.
            for l in (0..n).filter(|l| *l != i) {
                clauses.push(vec![-var(n, i, j), -var(n, l, j)]);
            }
            // Each row has at most one image.
            for l in (0..n).filter(|l| *l != j) {
                clauses.push(vec![-var(n, i, j), -var(n, i, l)]);
            }
        }
    }
    for j in 0..n {
        clauses.push((0..n).map(|i| var(n, i, j)).collect());
    }
}

pub fn encode(grid: &Usp) -> Cnf {
    let n = grid.rows();
    let mut clauses = Vec::new();
    add_bijection(n, x_var, &mut clauses);
    add_bijection(n, y_var, &mut clauses);
    clauses.push((0..n).flat_map(|i| [-x_var(n, i, i), -y_var(n, i, i)]).collect());
    for i in 0..n {
        for j in 0..grid.cols() {
            if grid.is(i, j, Symbol::One) {
                // Exactly one of the other two indicators would be a
                // violation, so they have to agree.
                for m in (0..n).filter(|m| *m != i) {
                    if grid.is(m, j, Symbol::Two) {
                        for l in (0..n).filter(|l| !grid.is(*l, j, Symbol::Three)) {
                            clauses.push(vec![-x_var(n, m, i), -y_var(n, l, i)]);
                        }
                    }
                    if grid.is(m, j, Symbol::Three) {
                        for l in (0..n).filter(|l| !grid.is(*l, j, Symbol::Two)) {
                            clauses.push(vec![-y_var(n, m, i), -x_var(n, l, i)]);
                        }
                    }
                }
            } else {
                // The other two indicators must not both hold.
                for m in (0..n).filter(|m| grid.is(*m, j, Symbol::Two)) {
                    for l in (0..n).filter(|l| grid.is(*l, j, Symbol::Three)) {
                        clauses.push(vec![-x_var(n, m, i), -y_var(n, l, i)]);
                    }
                }
            }
        }
    }
    Cnf { n, num_vars: 2 * n * n, clauses }
}

/// Reads (p, s) back out of a model of encode()'s formula.
pub fn decode(n: usize, model: &[Literal]) -> Result<Witness, Error> {
    let mut p = vec![None; n];
    let mut s = vec![None; n];
    let nn = (n * n) as Literal;
    for &lit in model.iter().filter(|l| **l > 0) {
        let g = (lit - 1) as usize;
        let (name, images, g) = if lit <= nn {
            ("p", &mut p, g)
        } else if lit <= 2 * nn {
            ("s", &mut s, g - n * n)
        } else {
            return Err(Error::new(format!("Variable {} out of range for n = {}", lit, n)));
        };
        if images[g % n].replace(g / n).is_some() {
            return Err(Error::new(format!("Row {} has more than one image under {}", g % n, name)));
        }
    }
    let finish = |v: Vec<Option<usize>>| -> Result<Vec<usize>, Error> {
        v.into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(Error::new_const("Model leaves a row without an image"))
    };
    Ok(Witness { p: finish(p)?, s: finish(s)? })
}

/// The full model (every variable, signed) corresponding to a witness.
pub fn witness_model(n: usize, witness: &Witness) -> Vec<Literal> {
    let mut model = Vec::with_capacity(2 * n * n);
    for i in 0..n {
        for j in 0..n {
            let v = x_var(n, i, j);
            model.push(if witness.p[j] == i { v } else { -v });
        }
    }
    for i in 0..n {
        for j in 0..n {
            let v = y_var(n, i, j);
            model.push(if witness.s[j] == i { v } else { -v });
        }
    }
    model
}
