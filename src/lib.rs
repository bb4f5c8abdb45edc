pub mod core;
pub mod verifier;
pub mod propagation;
pub mod solver;
pub mod dpll;
pub mod brute_force;
pub mod method;
pub mod debug;
pub mod generator;
pub mod cnf;
pub mod bench;
