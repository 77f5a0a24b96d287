//! Axial equilibrium solves
//!
//! Each solve fixes everything about the strain plane except one scalar and
//! finds the value that makes the integrated axial force equal a target:
//!
//! | Entry point | Regime | Unknown |
//! |---|---|---|
//! | [`EquilibriumSolver::solve_for_neutral_axis`] | service | neutral axis depth at fixed curvature |
//! | [`EquilibriumSolver::solve_uniform_strain`] | service | uniform strain (zero curvature) |
//! | [`EquilibriumSolver::solve_ultimate`] | ultimate | depth at fixed extreme fibre strain |
//!
//! Ultimate solves search the compactified depth `x = d/(d + D)`, so the
//! squash state `d = ∞` is the closed end `x = 1` of a finite interval.

use log::debug;
use serde::{Deserialize, Serialize};

use super::root::{find_root, Probe, Root, RootConfig, RootError};
use crate::errors::{CalcError, CalcResult, StrainSide};
use crate::materials::Regime;
use crate::section::{integrate, BendingFrame, SectionActions, SectionMesh, StrainPlane};

/// Tolerances and limits for the equilibrium solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Trial cap per solve
    pub max_iterations: usize,
    /// Absolute axial force tolerance; overrides the relative one
    pub force_tolerance: Option<f64>,
    /// Force tolerance as a fraction of the section force scale
    pub relative_force_tolerance: f64,
    /// Bracket width tolerance as a fraction of the section depth
    pub depth_tolerance: f64,
    /// Initial service bracket is `[-m D, (1 + m) D]`
    pub bracket_margin: f64,
    /// Outward doublings allowed when the initial bracket has no sign change
    pub max_bracket_expansions: usize,
    /// Smallest ultimate neutral axis depth, as a fraction of the section depth
    pub min_depth_ratio: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: 100,
            force_tolerance: None,
            relative_force_tolerance: 1e-10,
            depth_tolerance: 1e-12,
            bracket_margin: 0.05,
            max_bracket_expansions: 16,
            min_depth_ratio: 1e-9,
        }
    }
}

impl SolverConfig {
    /// Set an absolute force tolerance
    pub fn with_force_tolerance(mut self, tolerance: f64) -> Self {
        self.force_tolerance = Some(tolerance);
        self
    }

    /// Set the trial cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check all values are usable
    pub fn validate(&self) -> CalcResult<()> {
        if self.max_iterations == 0 {
            return Err(CalcError::invalid_input(
                "solver.max_iterations",
                "0",
                "At least one iteration is required",
            ));
        }
        let positive = [
            ("solver.relative_force_tolerance", self.relative_force_tolerance),
            ("solver.depth_tolerance", self.depth_tolerance),
            ("solver.min_depth_ratio", self.min_depth_ratio),
        ];
        for (field, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(CalcError::invalid_input(field, value.to_string(), "Must be positive"));
            }
        }
        if let Some(tol) = self.force_tolerance {
            if !(tol > 0.0) || !tol.is_finite() {
                return Err(CalcError::invalid_input(
                    "solver.force_tolerance",
                    tol.to_string(),
                    "Must be positive",
                ));
            }
        }
        if !(self.bracket_margin >= 0.0) || !self.bracket_margin.is_finite() {
            return Err(CalcError::invalid_input(
                "solver.bracket_margin",
                self.bracket_margin.to_string(),
                "Must be non-negative",
            ));
        }
        Ok(())
    }
}

/// A converged strain plane and its resultants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumState {
    pub plane: StrainPlane,
    /// Axial force (compression positive)
    pub n: f64,
    pub m_x: f64,
    pub m_y: f64,
    /// Root-finding trials used
    pub iterations: usize,
}

impl EquilibriumState {
    /// Resultant moment `√(Mx² + My²)`
    pub fn m_xy(&self) -> f64 {
        self.m_x.hypot(self.m_y)
    }

    /// Neutral axis depth below the extreme compressive fibre
    pub fn neutral_axis_depth(&self) -> f64 {
        self.plane.neutral_axis_depth()
    }

    /// Curvature of the plane
    pub fn curvature(&self) -> f64 {
        self.plane.curvature
    }
}

/// Equilibrium solver bound to one section
#[derive(Debug, Clone, Copy)]
pub struct EquilibriumSolver<'a> {
    section: &'a SectionMesh,
    config: SolverConfig,
}

impl<'a> EquilibriumSolver<'a> {
    /// Bind a section and configuration
    pub fn new(section: &'a SectionMesh, config: SolverConfig) -> Self {
        EquilibriumSolver { section, config }
    }

    /// The section being solved
    pub fn section(&self) -> &'a SectionMesh {
        self.section
    }

    /// The configuration in use
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Absolute axial force tolerance for this section
    pub fn force_tolerance(&self) -> f64 {
        self.config
            .force_tolerance
            .unwrap_or(self.config.relative_force_tolerance * self.section.force_scale())
    }

    /// Integrate a plane and package the result
    pub fn state(&self, plane: StrainPlane, regime: Regime, iterations: usize) -> CalcResult<EquilibriumState> {
        let actions = integrate(self.section, &plane, regime)?;
        Ok(EquilibriumState {
            plane,
            n: actions.n,
            m_x: actions.m_x,
            m_y: actions.m_y,
            iterations,
        })
    }

    fn root_config(&self, x_tolerance: f64, max_expansions: usize) -> RootConfig {
        RootConfig {
            max_iterations: self.config.max_iterations,
            value_tolerance: self.force_tolerance(),
            x_tolerance,
            max_expansions,
        }
    }

    fn depth_scale(&self, frame: &BendingFrame) -> f64 {
        let depth = frame.depth();
        if depth > 0.0 {
            depth
        } else {
            self.section.meshed_area().sqrt()
        }
    }

    /// Service state at `curvature` whose axial force equals `target_n`.
    ///
    /// Searches the neutral axis depth starting from `[-m D, (1 + m) D]`.
    /// Zero curvature is delegated to [`Self::solve_uniform_strain`].
    pub fn solve_for_neutral_axis(&self, curvature: f64, theta: f64, target_n: f64) -> CalcResult<EquilibriumState> {
        check_finite("theta", theta)?;
        check_finite("target_n", target_n)?;
        if !(curvature >= 0.0) || !curvature.is_finite() {
            return Err(CalcError::invalid_input(
                "curvature",
                curvature.to_string(),
                "Curvature must be non-negative and finite",
            ));
        }
        if curvature == 0.0 {
            return self.solve_uniform_strain(theta, target_n);
        }

        let frame = self.section.frame(theta);
        let depth = self.depth_scale(&frame);
        let margin = self.config.bracket_margin * depth;
        let (lower, upper) = (-margin, depth + margin);
        let config = self.root_config(self.config.depth_tolerance * depth, self.config.max_bracket_expansions);

        let residual = |d: f64| {
            let plane = StrainPlane::from_depth(&frame, d, curvature);
            match integrate(self.section, &plane, Regime::Service) {
                Ok(actions) => Ok(force_residual(&actions, target_n, curvature * actions.axial_stiffness)),
                Err(e) => Probe::from_limit(e),
            }
        };

        let root = match find_root(residual, lower, upper, config) {
            Ok(root) => root,
            Err(e) => {
                let error = self.service_error(e, target_n, config.value_tolerance);
                // A target out of reach even at zero curvature is infeasible, not a crushing limit
                if error.is_material_limit() {
                    if let Err(uniform @ CalcError::InfeasibleEquilibrium { .. }) =
                        self.solve_uniform_strain(theta, target_n)
                    {
                        return Err(uniform);
                    }
                }
                return Err(error);
            }
        };
        let state = self.state(StrainPlane::from_depth(&frame, root.x, curvature), Regime::Service, root.iterations)?;
        debug!(
            "service solve: kappa = {:e}, theta = {:.4}, d_n = {:.4}, N = {:.4}, Mx = {:.4}, My = {:.4} ({} trials)",
            curvature, theta, root.x, state.n, state.m_x, state.m_y, root.iterations
        );
        Ok(state)
    }

    /// Zero-curvature service state whose axial force equals `target_n`.
    ///
    /// A target beyond what the section carries before a material limit,
    /// in compression or tension, is infeasible.
    pub fn solve_uniform_strain(&self, theta: f64, target_n: f64) -> CalcResult<EquilibriumState> {
        check_finite("theta", theta)?;
        check_finite("target_n", target_n)?;
        let frame = self.section.frame(theta);

        // Elastic estimate, widened so the initial bracket straddles it
        let stiffness = self.section.force_scale() * 1e3;
        let estimate = target_n / stiffness;
        let half_width = (2.0 * estimate.abs()).max(1e-4);
        let config = self.root_config(self.config.depth_tolerance * half_width, self.config.max_bracket_expansions);

        let residual = |strain: f64| {
            let plane = StrainPlane::uniform(&frame, strain);
            match integrate(self.section, &plane, Regime::Service) {
                Ok(actions) => Ok(force_residual(&actions, target_n, actions.axial_stiffness)),
                Err(e) => Probe::from_limit(e),
            }
        };

        let root = find_root(residual, -half_width, half_width, config)
            .map_err(|e| self.uniform_error(e, target_n, config.value_tolerance))?;
        let state = self.state(StrainPlane::uniform(&frame, root.x), Regime::Service, root.iterations)?;
        debug!(
            "uniform solve: strain = {:e}, N = {:.4} ({} trials)",
            root.x, state.n, root.iterations
        );
        Ok(state)
    }

    /// Ultimate state with the extreme fibre at `ultimate_strain` whose axial
    /// force equals `target_n`.
    ///
    /// Targets above the squash load, or below the tension capacity at the
    /// minimum depth, are infeasible.
    pub fn solve_ultimate(&self, theta: f64, target_n: f64, ultimate_strain: f64) -> CalcResult<EquilibriumState> {
        check_finite("theta", theta)?;
        check_finite("target_n", target_n)?;
        check_ultimate_strain(ultimate_strain)?;

        let frame = self.section.frame(theta);
        let depth = self.depth_scale(&frame);
        let min_depth = self.config.min_depth_ratio * depth;
        let x_min = min_depth / (min_depth + depth);
        let config = self.root_config(self.config.depth_tolerance, 0);

        let to_depth = |x: f64| if x >= 1.0 { f64::INFINITY } else { depth * x / (1.0 - x) };
        let residual = |x: f64| {
            let plane = StrainPlane::ultimate(&frame, to_depth(x), ultimate_strain)?;
            match integrate(self.section, &plane, Regime::Ultimate) {
                Ok(actions) => {
                    // dN/dx = ε_u Σ E_t A (top - u) / (D x²)
                    let slope = ultimate_strain * actions.depth_stiffness / (depth * x * x);
                    Ok(force_residual(&actions, target_n, slope))
                }
                Err(e) => Probe::from_limit(e),
            }
        };

        let root: Root = match find_root(residual, x_min, 1.0, config) {
            Ok(root) => root,
            Err(RootError::NotBracketed { root_below, .. }) => {
                let reason = if root_below {
                    "target is below the tension capacity at the minimum neutral axis depth"
                } else {
                    "target exceeds the squash load"
                };
                return Err(CalcError::infeasible(target_n, min_depth, None, reason));
            }
            Err(e) => return Err(self.service_error(e, target_n, config.value_tolerance)),
        };

        let d_n = to_depth(root.x);
        let state = self.state(StrainPlane::ultimate(&frame, d_n, ultimate_strain)?, Regime::Ultimate, root.iterations)?;
        debug!(
            "ultimate solve: theta = {:.4}, d_n = {:.4}, N = {:.4}, Mx = {:.4}, My = {:.4} ({} trials)",
            theta, d_n, state.n, state.m_x, state.m_y, root.iterations
        );
        Ok(state)
    }

    /// Ultimate state at a prescribed neutral axis depth (no search).
    /// An infinite depth gives the squash state.
    pub fn ultimate_at_depth(&self, theta: f64, depth: f64, ultimate_strain: f64) -> CalcResult<EquilibriumState> {
        check_finite("theta", theta)?;
        check_ultimate_strain(ultimate_strain)?;
        let frame = self.section.frame(theta);
        let plane = StrainPlane::ultimate(&frame, depth, ultimate_strain)?;
        self.state(plane, Regime::Ultimate, 0)
    }

    fn service_error(&self, error: RootError, target_n: f64, tolerance: f64) -> CalcError {
        match error {
            RootError::NotBracketed {
                lower, upper, limit, ..
            } => limit.unwrap_or_else(|| {
                CalcError::infeasible(target_n, lower, Some(upper), "axial force residual does not change sign")
            }),
            RootError::NoConvergence { iterations, residual } => CalcError::ConvergenceFailure {
                iterations,
                residual,
                tolerance,
            },
            RootError::Limit { error, .. } | RootError::Failed(error) => error,
        }
    }

    fn uniform_error(&self, error: RootError, target_n: f64, tolerance: f64) -> CalcError {
        match error {
            RootError::NotBracketed {
                lower,
                upper,
                limit: Some(limit),
                ..
            }
            | RootError::Limit {
                error: limit,
                lower,
                upper,
            } => {
                let side = match limit.limit_side() {
                    Some(StrainSide::Tension) => "tensile",
                    _ => "compressive",
                };
                CalcError::infeasible(
                    target_n,
                    lower,
                    Some(upper),
                    format!("target is beyond the {} capacity under uniform strain ({})", side, limit),
                )
            }
            other => self.service_error(other, target_n, tolerance),
        }
    }
}

/// Residual of an axial force target. Cut elements leave the stress jump out
/// of the stiffness sums, so the slope is only offered when there are none.
fn force_residual(actions: &SectionActions, target_n: f64, slope: f64) -> Probe {
    if actions.cut_elements > 0 {
        Probe::value(actions.n - target_n)
    } else {
        Probe::with_slope(actions.n - target_n, slope)
    }
}

fn check_finite(field: &str, value: f64) -> CalcResult<()> {
    if !value.is_finite() {
        return Err(CalcError::invalid_input(field, value.to_string(), "Must be finite"));
    }
    Ok(())
}

fn check_ultimate_strain(strain: f64) -> CalcResult<()> {
    if !(strain > 0.0) || !strain.is_finite() {
        return Err(CalcError::invalid_input(
            "ultimate_strain",
            strain.to_string(),
            "Ultimate strain must be positive and finite",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::Material;
    use crate::section::{Point, ReinforcementPoint};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn elastic_rectangle() -> SectionMesh {
        SectionMesh::rectangle(400.0, 600.0, 4, 24, Arc::new(Material::linear("Elastic", 30_000.0))).unwrap()
    }

    fn beam() -> SectionMesh {
        let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
        let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
        SectionMesh::rectangle(300.0, 500.0, 6, 50, concrete)
            .unwrap()
            .with_reinforcement(vec![
                ReinforcementPoint::new(450.0, Point::new(60.0, 50.0), Arc::clone(&steel)),
                ReinforcementPoint::new(450.0, Point::new(240.0, 50.0), steel),
            ])
            .unwrap()
    }

    #[test]
    fn test_uniform_strain_elastic() {
        let mesh = elastic_rectangle();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        let state = solver.solve_uniform_strain(0.0, 2_400_000.0).unwrap();
        assert_relative_eq!(state.n, 2_400_000.0, max_relative = 1e-9);
        assert_relative_eq!(state.plane.extreme_strain, 10.0 / 30_000.0, max_relative = 1e-9);
        assert!(state.m_x.abs() < 1e-3);
    }

    #[test]
    fn test_elastic_neutral_axis_at_mid_depth() {
        let mesh = elastic_rectangle();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        let state = solver.solve_for_neutral_axis(1e-6, 0.0, 0.0).unwrap();
        assert_relative_eq!(state.neutral_axis_depth(), 300.0, max_relative = 1e-9);
        assert!(state.n.abs() <= solver.force_tolerance());
        assert!(state.m_x > 0.0);
    }

    #[test]
    fn test_service_neutral_axis_under_compression() {
        let mesh = beam();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        let state = solver.solve_for_neutral_axis(2e-6, 0.0, 500_000.0).unwrap();
        assert!((state.n - 500_000.0).abs() <= solver.force_tolerance());
        // Re-integrating the plane reproduces the state
        let again = integrate(&mesh, &state.plane, Regime::Service).unwrap();
        assert_relative_eq!(again.n, state.n, max_relative = 1e-12);
        assert_relative_eq!(again.m_x, state.m_x, max_relative = 1e-12);
    }

    #[test]
    fn test_ultimate_pure_bending() {
        let mesh = beam();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        let state = solver.solve_ultimate(0.0, 0.0, 0.003).unwrap();

        // Hand check: steel yields, block depth γ d_n carries α f'c b
        let block = crate::materials::RectangularStressBlock::as3600(32.0);
        let tension = 900.0 * 500.0;
        assert!(state.n.abs() <= solver.force_tolerance());
        let d_n = tension / (block.alpha * 32.0 * 300.0 * block.gamma);
        assert_relative_eq!(state.neutral_axis_depth(), d_n, max_relative = 1e-6);
        assert!(state.m_x > 0.0);
    }

    #[test]
    fn test_ultimate_squash_and_infeasible() {
        let mesh = beam();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        let squash = solver.ultimate_at_depth(0.0, f64::INFINITY, 0.003).unwrap();
        assert!(squash.plane.is_uniform());

        let err = solver.solve_ultimate(0.0, squash.n * 1.01, 0.003).unwrap_err();
        assert!(matches!(err, CalcError::InfeasibleEquilibrium { upper: None, .. }));

        let err = solver.solve_ultimate(0.0, -1e9, 0.003).unwrap_err();
        assert!(matches!(err, CalcError::InfeasibleEquilibrium { .. }));

        // Exactly the squash load resolves to the uniform state
        let at_squash = solver.solve_ultimate(0.0, squash.n, 0.003).unwrap();
        assert!(at_squash.plane.is_uniform());
    }

    #[test]
    fn test_ultimate_block_edge_inside_a_coarse_row() {
        // 3 x 50 mesh: the block edge falls inside a 10 mm row
        let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
        let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
        let mesh = SectionMesh::rectangle(300.0, 500.0, 3, 50, concrete)
            .unwrap()
            .with_reinforcement(vec![ReinforcementPoint::new(900.0, Point::new(150.0, 50.0), steel)])
            .unwrap();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        let state = solver.solve_ultimate(0.0, 0.0, 0.003).unwrap();
        assert!(state.n.abs() <= solver.force_tolerance());
    }

    #[test]
    fn test_service_targets_beyond_capacity_are_infeasible() {
        let mesh = beam();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        for target in [1e9, -1e9] {
            let err = solver.solve_uniform_strain(0.0, target).unwrap_err();
            assert!(matches!(err, CalcError::InfeasibleEquilibrium { upper: Some(_), .. }), "{}", err);
            let err = solver.solve_for_neutral_axis(1e-6, 0.0, target).unwrap_err();
            assert!(matches!(err, CalcError::InfeasibleEquilibrium { .. }), "{}", err);
            assert!(err.is_recoverable());
        }
        let err = solver.solve_uniform_strain(0.0, 1e9).unwrap_err();
        assert!(err.to_string().contains("compressive capacity"));
        let err = solver.solve_uniform_strain(0.0, -1e9).unwrap_err();
        assert!(err.to_string().contains("tensile capacity"));
    }

    #[test]
    fn test_service_solve_reports_crushing() {
        let mesh = beam();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        // Curvature far beyond what the section can carry
        let err = solver.solve_for_neutral_axis(1e-3, 0.0, 0.0).unwrap_err();
        assert!(err.is_material_limit());
    }

    #[test]
    fn test_invalid_inputs() {
        let mesh = elastic_rectangle();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        assert!(solver.solve_for_neutral_axis(-1.0, 0.0, 0.0).is_err());
        assert!(solver.solve_ultimate(0.0, 0.0, 0.0).is_err());
        assert!(solver.solve_uniform_strain(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{ "max_iterations": 50 }"#).unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.bracket_margin, 0.05);
        config.validate().unwrap();
        assert!(SolverConfig::default().with_max_iterations(0).validate().is_err());
    }
}
