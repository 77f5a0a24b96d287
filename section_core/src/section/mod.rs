//! # Section
//!
//! Cross-section representation and stress integration.
//!
//! - [`geometry`] - points and the bending frame for a neutral axis angle
//! - [`mesh`] - elements, reinforcement and the assembled [`SectionMesh`]
//! - [`strain`] - planar strain distributions
//! - [`integrate`] - force and moment resultants of a strain plane
//! - [`stresses`] - per-fibre stresses and per-material resultants

pub mod geometry;
pub mod integrate;
pub mod mesh;
pub mod strain;
pub mod stresses;

pub use geometry::{BendingFrame, Point};
pub use integrate::{integrate, SectionActions};
pub use mesh::{MeshElement, Prestress, ReinforcementPoint, SectionMesh};
pub use strain::StrainPlane;
pub use stresses::{stress_distribution, FibreStress, MaterialResultant, StressDistribution};
