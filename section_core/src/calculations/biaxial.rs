//! # Biaxial Bending
//!
//! Ultimate moment capacity at a fixed axial load for neutral axis angles
//! spread evenly over `[-π, π)`. Each angle is an independent ultimate
//! solve; angles that fail are recorded and skipped.

use std::f64::consts::PI;

use log::info;
use serde::{Deserialize, Serialize};

use super::sweep::{failure, run_sweep, PointFailure, SweepProgress};
use super::ultimate::{resolve_ultimate_strain, validate_ultimate_strain};
use super::validate_label_and_values;
use crate::errors::{CalcError, CalcResult};
use crate::progress::{ProgressObserver, Silent};
use crate::section::SectionMesh;
use crate::solver::{EquilibriumSolver, EquilibriumState, SolverConfig};

/// Input parameters for a biaxial bending sweep.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "C1 at 1000 kN",
///   "axial_load": 1000000.0,
///   "n_points": 36,
///   "parallel": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiaxialInput {
    pub label: String,
    /// Axial load (compression positive)
    #[serde(default)]
    pub axial_load: f64,
    /// Number of neutral axis angles
    #[serde(default = "default_n_points")]
    pub n_points: usize,
    /// Extreme fibre strain; taken from the materials when absent
    #[serde(default)]
    pub ultimate_strain: Option<f64>,
    /// Solve angles on the rayon pool
    #[serde(default)]
    pub parallel: bool,
}

fn default_n_points() -> usize {
    48
}

impl BiaxialInput {
    pub fn new(label: impl Into<String>) -> Self {
        BiaxialInput {
            label: label.into(),
            axial_load: 0.0,
            n_points: default_n_points(),
            ultimate_strain: None,
            parallel: false,
        }
    }

    pub fn with_axial_load(mut self, axial_load: f64) -> Self {
        self.axial_load = axial_load;
        self
    }

    pub fn with_n_points(mut self, n_points: usize) -> Self {
        self.n_points = n_points;
        self
    }

    pub fn with_ultimate_strain(mut self, strain: f64) -> Self {
        self.ultimate_strain = Some(strain);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validate input parameters
    pub fn validate(&self) -> CalcResult<()> {
        validate_label_and_values(&self.label, &[("axial_load", self.axial_load)])?;
        if self.n_points < 2 {
            return Err(CalcError::invalid_input(
                "n_points",
                self.n_points.to_string(),
                "At least two angles are required",
            ));
        }
        validate_ultimate_strain(self.ultimate_strain)
    }

    /// Angles swept, starting at -π
    pub fn angles(&self) -> Vec<f64> {
        let step = 2.0 * PI / self.n_points as f64;
        (0..self.n_points).map(|i| -PI + step * i as f64).collect()
    }
}

/// Capacity at one angle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiaxialPoint {
    /// Neutral axis angle (radians)
    pub theta: f64,
    pub m_x: f64,
    pub m_y: f64,
    pub state: EquilibriumState,
}

/// Result of a biaxial bending sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiaxialResult {
    pub label: String,
    pub axial_load: f64,
    pub ultimate_strain: f64,
    /// Solved angles in sweep order
    pub points: Vec<BiaxialPoint>,
    pub failures: Vec<PointFailure>,
    pub cancelled: bool,
}

impl BiaxialResult {
    /// Largest resultant moment over all angles
    pub fn max_moment(&self) -> Option<&BiaxialPoint> {
        self.points
            .iter()
            .max_by(|a, b| a.state.m_xy().total_cmp(&b.state.m_xy()))
    }
}

/// Run a biaxial bending sweep.
pub fn calculate(section: &SectionMesh, input: &BiaxialInput, config: &SolverConfig) -> CalcResult<BiaxialResult> {
    calculate_with_progress(section, input, config, &Silent)
}

/// Run a biaxial bending sweep, reporting each finished angle.
pub fn calculate_with_progress(
    section: &SectionMesh,
    input: &BiaxialInput,
    config: &SolverConfig,
    observer: &dyn ProgressObserver,
) -> CalcResult<BiaxialResult> {
    input.validate()?;
    config.validate()?;

    let ultimate_strain = resolve_ultimate_strain(section, input.ultimate_strain)?;
    let solver = EquilibriumSolver::new(section, *config);
    let angles = input.angles();

    let progress = SweepProgress::new(observer, angles.len());
    let outcomes = run_sweep(&angles, input.parallel, &progress, |&theta| {
        solver.solve_ultimate(theta, input.axial_load, ultimate_strain)
    });

    let mut points = Vec::with_capacity(angles.len());
    let mut failures = Vec::new();
    for (&theta, outcome) in angles.iter().zip(outcomes) {
        match outcome {
            Some(Ok(state)) => points.push(BiaxialPoint {
                theta,
                m_x: state.m_x,
                m_y: state.m_y,
                state,
            }),
            Some(Err(e)) => failures.push(failure(format!("theta={:.4}", theta), e)),
            None => {}
        }
    }

    let result = BiaxialResult {
        label: input.label.clone(),
        axial_load: input.axial_load,
        ultimate_strain,
        points,
        failures,
        cancelled: progress.is_cancelled(),
    };
    info!(
        "biaxial '{}': {} of {} angles solved",
        result.label,
        result.points.len(),
        angles.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{ConcreteLinear, Material, ParabolicRectangular};
    use crate::section::{Point, ReinforcementPoint};
    use std::sync::Arc;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn square_column() -> SectionMesh {
        let concrete = Arc::new(Material::new(
            "C40",
            ConcreteLinear::new(32_800.0, 3.8),
            ParabolicRectangular::eurocode(40.0),
        ));
        let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
        let bars = [(50.0, 50.0), (350.0, 50.0), (50.0, 350.0), (350.0, 350.0)]
            .iter()
            .map(|&(x, y)| ReinforcementPoint::new(450.0, Point::new(x, y), Arc::clone(&steel)))
            .collect();
        SectionMesh::rectangle(400.0, 400.0, 20, 20, concrete)
            .unwrap()
            .with_reinforcement(bars)
            .unwrap()
    }

    #[test]
    fn test_angles_cover_full_turn() {
        let angles = BiaxialInput::new("x").with_n_points(4).angles();
        assert_eq!(angles.len(), 4);
        assert!(approx_eq(angles[0], -PI, 1e-15));
        assert!(approx_eq(angles[2], 0.0, 1e-15));
        assert!(angles.iter().all(|&t| t < PI));
    }

    #[test]
    fn test_doubly_symmetric_section_is_symmetric() {
        let mesh = square_column();
        let input = BiaxialInput::new("C1").with_n_points(8).with_axial_load(500_000.0);
        let result = calculate(&mesh, &input, &SolverConfig::default()).unwrap();
        assert!(result.failures.is_empty());
        assert_eq!(result.points.len(), 8);

        let scale = result.max_moment().unwrap().state.m_xy();
        let tol = 1e-6 * scale;
        // Opposite angles give opposite moments
        for i in 0..4 {
            let (a, b) = (&result.points[i], &result.points[i + 4]);
            assert!(approx_eq(a.m_x, -b.m_x, tol));
            assert!(approx_eq(a.m_y, -b.m_y, tol));
        }
        // θ = 0 bends about x only; θ = π/4 has equal components
        let zero = &result.points[4];
        assert!(zero.m_x > 0.0);
        assert!(approx_eq(zero.m_y, 0.0, tol));
        let diagonal = &result.points[5];
        assert!(approx_eq(diagonal.m_x.abs(), diagonal.m_y.abs(), tol));
        // Quarter turns carry the same capacity
        assert!(approx_eq(result.points[2].state.m_xy(), zero.state.m_xy(), tol));
    }

    #[test]
    fn test_infeasible_load_fails_every_angle() {
        let mesh = square_column();
        let input = BiaxialInput::new("C1").with_n_points(4).with_axial_load(1e12);
        let result = calculate(&mesh, &input, &SolverConfig::default()).unwrap();
        assert!(result.points.is_empty());
        assert_eq!(result.failures.len(), 4);
        assert!(result.failures[0].point.starts_with("theta="));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mesh = square_column();
        let config = SolverConfig::default();
        let input = BiaxialInput::new("C1").with_n_points(12);
        let sequential = calculate(&mesh, &input, &config).unwrap();
        let parallel = calculate(&mesh, &input.clone().with_parallel(true), &config).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_validation() {
        assert!(BiaxialInput::new("x").with_n_points(1).validate().is_err());
        assert!(BiaxialInput::new("").validate().is_err());
    }
}
