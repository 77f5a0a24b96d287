//! # Ultimate Bending Capacity
//!
//! One ultimate solve: the extreme compressive fibre sits at the ultimate
//! strain and the neutral axis depth is found so that the section carries
//! the applied axial load.
//!
//! The ultimate strain defaults to the smallest crushing strain among the
//! element materials' ultimate laws.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use section_core::calculations::ultimate::{calculate, UltimateInput};
//! use section_core::materials::Material;
//! use section_core::section::{Point, ReinforcementPoint, SectionMesh};
//! use section_core::solver::SolverConfig;
//!
//! let concrete = Arc::new(Material::concrete("Concrete 40", 40.0));
//! let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
//! let section = SectionMesh::rectangle(300.0, 600.0, 3, 60, concrete)?
//!     .with_reinforcement(vec![ReinforcementPoint::new(1200.0, Point::new(150.0, 50.0), steel)])?;
//!
//! let result = calculate(&section, &UltimateInput::new("B2"), &SolverConfig::default())?;
//! assert!(result.k_u.unwrap() < 0.4);
//! # Ok::<(), section_core::CalcError>(())
//! ```

use log::info;
use serde::{Deserialize, Serialize};

use super::validate_label_and_values;
use crate::errors::{CalcError, CalcResult};
use crate::section::SectionMesh;
use crate::solver::{EquilibriumSolver, EquilibriumState, SolverConfig};

/// Input parameters for an ultimate capacity solve.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "C1 at 1200 kN",
///   "theta": 0.0,
///   "axial_load": 1200000.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UltimateInput {
    /// User label
    pub label: String,
    /// Neutral axis angle (radians)
    #[serde(default)]
    pub theta: f64,
    /// Axial load (compression positive)
    #[serde(default)]
    pub axial_load: f64,
    /// Extreme fibre strain; taken from the materials when absent
    #[serde(default)]
    pub ultimate_strain: Option<f64>,
}

impl UltimateInput {
    /// Pure bending about x
    pub fn new(label: impl Into<String>) -> Self {
        UltimateInput {
            label: label.into(),
            theta: 0.0,
            axial_load: 0.0,
            ultimate_strain: None,
        }
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_axial_load(mut self, axial_load: f64) -> Self {
        self.axial_load = axial_load;
        self
    }

    pub fn with_ultimate_strain(mut self, strain: f64) -> Self {
        self.ultimate_strain = Some(strain);
        self
    }

    /// Validate input parameters
    pub fn validate(&self) -> CalcResult<()> {
        validate_label_and_values(&self.label, &[("theta", self.theta), ("axial_load", self.axial_load)])?;
        validate_ultimate_strain(self.ultimate_strain)
    }
}

/// Result of an ultimate capacity solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UltimateResult {
    pub label: String,
    pub theta: f64,
    pub axial_load: f64,
    /// Extreme fibre strain actually used
    pub ultimate_strain: f64,
    pub state: EquilibriumState,
    /// Neutral axis depth below the extreme compressive fibre
    pub neutral_axis_depth: f64,
    /// `d_n / d` with `d` the depth of the extreme tensile bar; `None`
    /// without reinforcement
    pub k_u: Option<f64>,
    /// Resultant moment capacity `√(Mx² + My²)`
    pub m_xy: f64,
}

/// Run an ultimate capacity solve.
pub fn calculate(section: &SectionMesh, input: &UltimateInput, config: &SolverConfig) -> CalcResult<UltimateResult> {
    input.validate()?;
    config.validate()?;

    let ultimate_strain = resolve_ultimate_strain(section, input.ultimate_strain)?;
    let solver = EquilibriumSolver::new(section, *config);
    let state = solver.solve_ultimate(input.theta, input.axial_load, ultimate_strain)?;

    let neutral_axis_depth = state.neutral_axis_depth();
    let frame = section.frame(input.theta);
    let k_u = section
        .extreme_tensile_bar(&frame)
        .filter(|(_, depth)| *depth > 0.0)
        .map(|(_, depth)| neutral_axis_depth / depth);

    info!(
        "ultimate '{}': N = {:.4}, Mx = {:.4}, My = {:.4}, d_n = {:.4}",
        input.label, state.n, state.m_x, state.m_y, neutral_axis_depth
    );

    Ok(UltimateResult {
        label: input.label.clone(),
        theta: input.theta,
        axial_load: input.axial_load,
        ultimate_strain,
        m_xy: state.m_xy(),
        state,
        neutral_axis_depth,
        k_u,
    })
}

/// Explicit ultimate strain if given, otherwise the section's governing one
pub(crate) fn resolve_ultimate_strain(section: &SectionMesh, explicit: Option<f64>) -> CalcResult<f64> {
    match explicit {
        Some(strain) => Ok(strain),
        None => section.ultimate_strain(),
    }
}

pub(crate) fn validate_ultimate_strain(strain: Option<f64>) -> CalcResult<()> {
    match strain {
        Some(e) if !(e > 0.0) || !e.is_finite() => Err(CalcError::invalid_input(
            "ultimate_strain",
            e.to_string(),
            "Must be positive and finite",
        )),
        _ => Ok(()),
    }
}
