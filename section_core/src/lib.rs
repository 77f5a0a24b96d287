//! # section_core - Nonlinear Concrete Section Analysis
//!
//! `section_core` analyses reinforced and prestressed concrete cross-sections
//! under combined axial load and bending. A section is a mesh of material
//! elements plus discrete bars; every analysis reduces to finding the strain
//! plane whose integrated stresses balance the applied axial load.
//!
//! All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Analyses are functions of a section, an input and a solver config
//! - **JSON-First**: All inputs and results implement Serialize/Deserialize
//! - **Rich Errors**: Structured error types that say which bound or material failed
//! - **Partial Results**: Sweeps keep every point that solved
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use section_core::calculations::ultimate::{calculate, UltimateInput};
//! use section_core::materials::Material;
//! use section_core::section::{Point, ReinforcementPoint, SectionMesh};
//! use section_core::solver::SolverConfig;
//!
//! let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
//! let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
//! let section = SectionMesh::rectangle(300.0, 500.0, 3, 50, concrete)?
//!     .with_reinforcement(vec![ReinforcementPoint::new(900.0, Point::new(150.0, 50.0), steel)])?;
//!
//! let result = calculate(&section, &UltimateInput::new("B1"), &SolverConfig::default())?;
//! assert!(result.state.m_x > 0.0);
//! # Ok::<(), section_core::CalcError>(())
//! ```
//!
//! ## Modules
//!
//! - [`materials`] - Stress-strain laws and materials
//! - [`section`] - Mesh, strain planes and stress integration
//! - [`solver`] - Root finding and axial equilibrium
//! - [`calculations`] - Moment-curvature, ultimate, interaction and biaxial analyses
//! - [`progress`] - Progress reporting and cancellation
//! - [`project`] - Project container, metadata, and settings
//! - [`file_io`] - Atomic project and result files
//! - [`errors`] - Structured error types

pub mod calculations;
pub mod errors;
pub mod file_io;
pub mod materials;
pub mod progress;
pub mod project;
pub mod section;
pub mod solver;

// Re-export commonly used types at crate root for convenience
pub use errors::{CalcError, CalcResult};
pub use file_io::{load_project, save_project, save_results};
pub use materials::{Material, Regime};
pub use project::{GlobalSettings, Project, ProjectMetadata};
pub use section::{SectionMesh, StrainPlane};
pub use solver::{EquilibriumSolver, EquilibriumState, SolverConfig};
