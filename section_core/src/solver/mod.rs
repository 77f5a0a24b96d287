//! # Solver
//!
//! - [`root`] - bracketed root finding with material-limit probes
//! - [`equilibrium`] - axial equilibrium solves on a section

pub mod equilibrium;
pub mod root;

pub use equilibrium::{EquilibriumSolver, EquilibriumState, SolverConfig};
pub use root::{find_root, Probe, Root, RootConfig, RootError};
