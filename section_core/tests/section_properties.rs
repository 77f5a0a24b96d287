//! End-to-end checks of the analysis engine on small, well-understood sections.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use section_core::calculations::{biaxial, interaction, moment_curvature, ultimate};
use section_core::calculations::{BiaxialInput, InteractionInput, MomentCurvatureInput, UltimateInput};
use section_core::materials::{ConcreteLinear, ParabolicRectangular, Regime};
use section_core::progress::ProgressEvent;
use section_core::section::{integrate, Point, ReinforcementPoint};
use section_core::{CalcError, EquilibriumSolver, Material, SectionMesh, SolverConfig};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

fn column() -> SectionMesh {
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
fn uniform_strain_on_linear_rectangle_has_no_moment() {
    let mesh = SectionMesh::rectangle(400.0, 600.0, 8, 12, Arc::new(Material::linear("Elastic", 30_000.0))).unwrap();
    let area = 400.0 * 600.0;
    let target = area * 10.0;

    let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
    let state = solver.solve_uniform_strain(0.0, target).unwrap();

    assert_relative_eq!(state.n, target, max_relative = 1e-6);
    assert!(state.m_x.abs() <= 1e-6 * target * 600.0);
    assert!(state.m_y.abs() <= 1e-6 * target * 400.0);
    assert_relative_eq!(state.plane.extreme_strain, 10.0 / 30_000.0, max_relative = 1e-6);
}

#[test]
fn reintegrating_a_converged_plane_reproduces_actions() {
    let mesh = column();
    let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());

    let service = solver.solve_for_neutral_axis(2e-6, 0.3, 1e6).unwrap();
    let actions = integrate(&mesh, &service.plane, Regime::Service).unwrap();
    assert_relative_eq!(actions.n, service.n, max_relative = 1e-12);
    assert_relative_eq!(actions.m_x, service.m_x, max_relative = 1e-12);
    assert_relative_eq!(actions.m_y, service.m_y, max_relative = 1e-12);

    let capacity = solver.solve_ultimate(0.0, 5e5, 0.0035).unwrap();
    let actions = integrate(&mesh, &capacity.plane, Regime::Ultimate).unwrap();
    assert_relative_eq!(actions.n, capacity.n, max_relative = 1e-12);
    assert_relative_eq!(actions.m_x, capacity.m_x, max_relative = 1e-12);
}

#[test]
fn moment_curvature_is_strictly_increasing_in_curvature() {
    let mesh = beam();
    let result = moment_curvature::calculate(&mesh, &MomentCurvatureInput::new("B1"), &SolverConfig::default()).unwrap();

    let kappa = result.curvatures();
    assert!(kappa.len() > 10);
    assert!(kappa.windows(2).all(|w| w[1] > w[0]));
    assert!(result.first_crack.is_some());
    assert!(result.first_yield.is_some());
}

#[test]
fn ultimate_capacity_in_pure_bending() {
    let mesh = column();
    let config = SolverConfig::default();
    let result = ultimate::calculate(&mesh, &UltimateInput::new("U1"), &config).unwrap();

    let tolerance = EquilibriumSolver::new(&mesh, config).force_tolerance();
    assert!(result.state.n.abs() <= tolerance);
    assert!(result.state.m_x > 0.0);
    assert!(result.neutral_axis_depth > 0.0 && result.neutral_axis_depth < 400.0);
}

#[test]
fn interaction_diagram_spans_compression_to_tension() {
    let mesh = column();
    let result = interaction::calculate(&mesh, &InteractionInput::new("C1"), &SolverConfig::default()).unwrap();

    let first = &result.points[0];
    let last = result.points.last().unwrap();
    assert!(first.state.plane.is_uniform());
    assert_eq!(first.n(), result.axial_loads().iter().cloned().fold(f64::MIN, f64::max));
    // Pure tension: every bar yielded, no moment left
    assert!(approx_eq(last.n(), -1800.0 * 500.0, 1.0));
    let peak = result.moments().iter().cloned().fold(0.0, f64::max);
    assert!(last.m < 1e-3 * peak);

    assert!(result.point_labelled("fy=1").is_some());
    let pure_bending = result.point_labelled("N=0").unwrap();
    assert!(approx_eq(pure_bending.n(), 0.0, 1.0));
}

#[test]
fn target_beyond_squash_load_is_infeasible() {
    let mesh = column();
    let input = UltimateInput::new("U1").with_axial_load(1e9);
    let err = ultimate::calculate(&mesh, &input, &SolverConfig::default()).unwrap_err();
    assert!(matches!(err, CalcError::InfeasibleEquilibrium { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn service_target_beyond_squash_load_is_infeasible() {
    let mesh = beam();
    let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
    for err in [
        solver.solve_uniform_strain(0.0, 1e9).unwrap_err(),
        solver.solve_for_neutral_axis(1e-6, 0.0, 1e9).unwrap_err(),
        solver.solve_uniform_strain(0.0, -1e9).unwrap_err(),
    ] {
        assert_eq!(err.error_code(), "INFEASIBLE_EQUILIBRIUM", "{}", err);
    }

    // A moment-curvature run at that load ends without a curve
    let input = MomentCurvatureInput::new("B1").with_axial_load(1e9);
    let err = moment_curvature::calculate(&mesh, &input, &SolverConfig::default()).unwrap_err();
    assert!(matches!(err, CalcError::InfeasibleEquilibrium { .. }));
}

#[test]
fn ultimate_with_preset_concrete_meets_force_tolerance() {
    let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
    let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
    let mesh = SectionMesh::rectangle(300.0, 500.0, 3, 50, concrete)
        .unwrap()
        .with_reinforcement(vec![ReinforcementPoint::new(900.0, Point::new(150.0, 50.0), steel)])
        .unwrap();
    let config = SolverConfig::default();
    let result = ultimate::calculate(&mesh, &UltimateInput::new("U1"), &config).unwrap();

    let tolerance = EquilibriumSolver::new(&mesh, config).force_tolerance();
    assert!(result.state.n.abs() <= tolerance, "N = {}, tolerance = {}", result.state.n, tolerance);
    assert!(result.state.m_x > 0.0);
}

#[test]
fn biaxial_capacity_of_square_column_has_quarter_turn_symmetry() {
    let mesh = column();
    let input = BiaxialInput::new("B1").with_n_points(8).with_axial_load(1e6);
    let result = biaxial::calculate(&mesh, &input, &SolverConfig::default()).unwrap();

    assert_eq!(result.points.len(), 8);
    let m0 = result.points[0].state.m_xy();
    for i in [2, 4, 6] {
        assert_relative_eq!(result.points[i].state.m_xy(), m0, max_relative = 1e-3);
    }
    assert_relative_eq!(result.points[1].state.m_xy(), result.points[3].state.m_xy(), max_relative = 1e-3);
}

#[test]
fn cancelling_an_interaction_keeps_partial_results() {
    let mesh = column();
    let seen = AtomicUsize::new(0);
    let observer = |event: &ProgressEvent| {
        assert!(matches!(event, ProgressEvent::SweepPoint { .. }));
        if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 5 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };

    let result =
        interaction::calculate_with_progress(&mesh, &InteractionInput::new("C1"), &SolverConfig::default(), &observer)
            .unwrap();
    assert!(result.cancelled);
    assert!(!result.points.is_empty());
    assert!(result.points.len() < 26);
}
