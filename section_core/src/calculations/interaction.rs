//! # Moment-Interaction Diagram
//!
//! Generates the ultimate (N, M) envelope of a section for one neutral axis
//! angle. The diagram runs from the first limit to the second:
//!
//! 1. both `limits` are solved; a failure here aborts the diagram
//! 2. intermediate points are spaced by neutral axis depth (`n_points`) or
//!    by axial load (`n_spacing`); both counts include the two limits
//! 3. each of `control_points` is solved and placed at its axial load
//!    position; a control point naming the same plane as a limit only adds
//!    its label to the limit
//! 4. with `max_comp`, points above the cap are dropped and a single point
//!    solved at `N = max_comp` becomes the top of the envelope
//!
//! Failed sweep or control points are collected in `failures`; the rest of
//! the diagram is still returned.
//!
//! When a limit sits at infinite neutral axis depth (`kappa0`), the depth
//! sweep starts at the section depth.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use section_core::calculations::interaction::{calculate, InteractionInput};
//! use section_core::materials::Material;
//! use section_core::section::{Point, ReinforcementPoint, SectionMesh};
//! use section_core::solver::SolverConfig;
//!
//! let concrete = Arc::new(Material::concrete("Concrete 40", 40.0));
//! let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
//! let bars = [50.0, 350.0]
//!     .iter()
//!     .map(|&y| ReinforcementPoint::new(900.0, Point::new(200.0, y), Arc::clone(&steel)))
//!     .collect();
//! let section = SectionMesh::rectangle(400.0, 400.0, 4, 40, concrete)?.with_reinforcement(bars)?;
//!
//! let result = calculate(&section, &InteractionInput::new("C1"), &SolverConfig::default())?;
//! let balanced = result.point_labelled("fy=1").unwrap();
//! assert!(balanced.n() > 0.0);
//! # Ok::<(), section_core::CalcError>(())
//! ```

use log::info;
use serde::{Deserialize, Serialize};

use super::control_points::{validate_control_points, ControlPoint};
use super::moment_curvature::bending_moment;
use super::sweep::{failure, run_sweep, PointFailure, SweepProgress};
use super::ultimate::{resolve_ultimate_strain, validate_ultimate_strain};
use super::validate_label_and_values;
use crate::errors::{CalcError, CalcResult};
use crate::progress::{ProgressObserver, Silent};
use crate::section::SectionMesh;
use crate::solver::{EquilibriumSolver, EquilibriumState, SolverConfig};

/// Input parameters for an interaction diagram.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "C1",
///   "limits": [{ "kind": "kappa0" }, { "kind": "d_n", "value": 1e-6 }],
///   "control_points": [
///     { "kind": "kappa0" },
///     { "kind": "fy", "value": 1.0, "label": "balanced" },
///     { "kind": "N", "value": 0.0 }
///   ],
///   "n_points": 24,
///   "max_comp": 4000000.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionInput {
    /// User label
    pub label: String,
    /// Neutral axis angle (radians)
    #[serde(default)]
    pub theta: f64,
    /// First and last point of the diagram
    #[serde(default = "default_limits")]
    pub limits: Vec<ControlPoint>,
    /// Points that must appear in the diagram
    #[serde(default = "default_control_points")]
    pub control_points: Vec<ControlPoint>,
    /// Points spaced by neutral axis depth, limits included
    #[serde(default = "default_n_points")]
    pub n_points: usize,
    /// Points spaced by axial load, limits included; overrides `n_points`
    #[serde(default)]
    pub n_spacing: Option<usize>,
    /// Axial load cap
    #[serde(default)]
    pub max_comp: Option<f64>,
    /// Extreme fibre strain; taken from the materials when absent
    #[serde(default)]
    pub ultimate_strain: Option<f64>,
    /// Solve points on the rayon pool
    #[serde(default)]
    pub parallel: bool,
}

fn default_limits() -> Vec<ControlPoint> {
    vec![ControlPoint::zero_curvature(), ControlPoint::neutral_axis_depth(1e-6)]
}

fn default_control_points() -> Vec<ControlPoint> {
    vec![
        ControlPoint::zero_curvature(),
        ControlPoint::yield_ratio(1.0),
        ControlPoint::axial_load(0.0),
    ]
}

fn default_n_points() -> usize {
    24
}

impl InteractionInput {
    /// Default limits and control points at `theta = 0`
    pub fn new(label: impl Into<String>) -> Self {
        InteractionInput {
            label: label.into(),
            theta: 0.0,
            limits: default_limits(),
            control_points: default_control_points(),
            n_points: default_n_points(),
            n_spacing: None,
            max_comp: None,
            ultimate_strain: None,
            parallel: false,
        }
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_limits(mut self, first: ControlPoint, last: ControlPoint) -> Self {
        self.limits = vec![first, last];
        self
    }

    pub fn with_control_points(mut self, points: Vec<ControlPoint>) -> Self {
        self.control_points = points;
        self
    }

    pub fn with_n_points(mut self, n_points: usize) -> Self {
        self.n_points = n_points;
        self
    }

    pub fn with_n_spacing(mut self, n_spacing: usize) -> Self {
        self.n_spacing = Some(n_spacing);
        self
    }

    pub fn with_max_comp(mut self, max_comp: f64) -> Self {
        self.max_comp = Some(max_comp);
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
        validate_label_and_values(&self.label, &[("theta", self.theta)])?;
        if self.limits.len() != 2 {
            return Err(CalcError::invalid_input(
                "limits",
                self.limits.len().to_string(),
                "Exactly two limits are required",
            ));
        }
        if self.limits[0].same_plane(&self.limits[1]) {
            return Err(CalcError::invalid_input(
                "limits",
                format!("{} / {}", self.limits[0], self.limits[1]),
                "Limits must differ",
            ));
        }
        validate_control_points("limits", &self.limits)?;
        validate_control_points("control_points", &self.control_points)?;
        let count = self.n_spacing.unwrap_or(self.n_points);
        if count < 2 {
            return Err(CalcError::invalid_input(
                if self.n_spacing.is_some() { "n_spacing" } else { "n_points" },
                count.to_string(),
                "At least two points (the limits) are required",
            ));
        }
        if let Some(cap) = self.max_comp {
            if !cap.is_finite() {
                return Err(CalcError::invalid_input("max_comp", cap.to_string(), "Must be finite"));
            }
        }
        validate_ultimate_strain(self.ultimate_strain)
    }
}

/// One point of the diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionPoint {
    /// Control point or limit label, `None` for sweep points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Moment in the bending direction, `Mx cos θ - My sin θ`
    pub m: f64,
    #[serde(flatten)]
    pub state: EquilibriumState,
}

impl InteractionPoint {
    fn new(label: Option<String>, state: EquilibriumState, theta: f64) -> Self {
        InteractionPoint {
            label,
            m: bending_moment(&state, theta),
            state,
        }
    }

    /// Axial load
    pub fn n(&self) -> f64 {
        self.state.n
    }
}

/// Result of an interaction diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResult {
    pub label: String,
    pub theta: f64,
    /// Extreme fibre strain actually used
    pub ultimate_strain: f64,
    /// Diagram from the first limit to the second
    pub points: Vec<InteractionPoint>,
    pub failures: Vec<PointFailure>,
    /// True when the observer stopped the sweep
    pub cancelled: bool,
}

impl InteractionResult {
    /// Axial loads in diagram order
    pub fn axial_loads(&self) -> Vec<f64> {
        self.points.iter().map(InteractionPoint::n).collect()
    }

    /// Bending moments in diagram order
    pub fn moments(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.m).collect()
    }

    /// First point carrying `label`
    pub fn point_labelled(&self, label: &str) -> Option<&InteractionPoint> {
        self.points.iter().find(|p| p.label.as_deref() == Some(label))
    }

    /// Moment capacity at an axial load, interpolated between neighbours
    pub fn moment_at_axial_load(&self, n: f64) -> Option<f64> {
        self.points.windows(2).find_map(|w| {
            let (a, b) = (&w[0], &w[1]);
            let (lo, hi) = if a.n() <= b.n() { (a.n(), b.n()) } else { (b.n(), a.n()) };
            if n < lo || n > hi {
                return None;
            }
            if hi == lo {
                return Some(a.m.max(b.m));
            }
            Some(a.m + (n - a.n()) / (b.n() - a.n()) * (b.m - a.m))
        })
    }
}

enum Job {
    Depth(f64),
    Load(f64),
    Control(ControlPoint),
}

impl Job {
    fn solve(&self, solver: &EquilibriumSolver, theta: f64, ultimate_strain: f64) -> CalcResult<EquilibriumState> {
        match self {
            Job::Depth(depth) => solver.ultimate_at_depth(theta, *depth, ultimate_strain),
            Job::Load(n) => solver.solve_ultimate(theta, *n, ultimate_strain),
            Job::Control(point) => point.solve(solver, theta, ultimate_strain),
        }
    }

    fn describe(&self) -> String {
        match self {
            Job::Depth(depth) => format!("d_n={}", depth),
            Job::Load(n) => format!("N={}", n),
            Job::Control(point) => label_of(point),
        }
    }
}

fn label_of(point: &ControlPoint) -> String {
    point.label.clone().unwrap_or_else(|| point.to_string())
}

/// Generate an interaction diagram.
pub fn calculate(
    section: &SectionMesh,
    input: &InteractionInput,
    config: &SolverConfig,
) -> CalcResult<InteractionResult> {
    calculate_with_progress(section, input, config, &Silent)
}

/// Generate an interaction diagram, reporting each finished point.
pub fn calculate_with_progress(
    section: &SectionMesh,
    input: &InteractionInput,
    config: &SolverConfig,
    observer: &dyn ProgressObserver,
) -> CalcResult<InteractionResult> {
    input.validate()?;
    config.validate()?;

    let ultimate_strain = resolve_ultimate_strain(section, input.ultimate_strain)?;
    let solver = EquilibriumSolver::new(section, *config);
    let theta = input.theta;

    let first = input.limits[0].solve(&solver, theta, ultimate_strain)?;
    let last = input.limits[1].solve(&solver, theta, ultimate_strain)?;
    let mut limit_labels = [label_of(&input.limits[0]), label_of(&input.limits[1])];

    let mut jobs = sweep_jobs(input, &first, &last, section.frame(theta).depth());
    for point in &input.control_points {
        match input.limits.iter().position(|limit| limit.same_plane(point)) {
            Some(i) => {
                if point.label.is_some() {
                    limit_labels[i] = label_of(point);
                }
            }
            None => jobs.push(Job::Control(point.clone())),
        }
    }

    let progress = SweepProgress::new(observer, jobs.len() + 2);
    progress.report(Some(&first));
    progress.report(Some(&last));
    let outcomes = run_sweep(&jobs, input.parallel, &progress, |job| {
        job.solve(&solver, theta, ultimate_strain)
    });

    let [first_label, last_label] = limit_labels;
    let mut points = vec![InteractionPoint::new(Some(first_label), first, theta)];
    let mut controls = Vec::new();
    let mut failures = Vec::new();
    for (job, outcome) in jobs.iter().zip(outcomes) {
        match (job, outcome) {
            (_, None) => {}
            (Job::Control(point), Some(Ok(state))) => {
                controls.push(InteractionPoint::new(Some(label_of(point)), state, theta));
            }
            (_, Some(Ok(state))) => points.push(InteractionPoint::new(None, state, theta)),
            (_, Some(Err(e))) => failures.push(failure(job.describe(), e)),
        }
    }
    points.push(InteractionPoint::new(Some(last_label), last, theta));

    let descending = first.n >= last.n;
    for point in controls {
        insert_by_axial_load(&mut points, point, descending);
    }

    if let Some(cap) = input.max_comp {
        let before = points.len();
        points.retain(|p| p.n() <= cap);
        if points.len() < before {
            match solver.solve_ultimate(theta, cap, ultimate_strain) {
                Ok(state) => {
                    let clipped = InteractionPoint::new(Some("max_comp".to_string()), state, theta);
                    if descending {
                        points.insert(0, clipped);
                    } else {
                        points.push(clipped);
                    }
                }
                Err(e) => failures.push(failure(format!("max_comp={}", cap), e)),
            }
        }
    }

    let result = InteractionResult {
        label: input.label.clone(),
        theta,
        ultimate_strain,
        points,
        failures,
        cancelled: progress.is_cancelled(),
    };
    info!(
        "interaction '{}': {} points, {} failures{}",
        result.label,
        result.points.len(),
        result.failures.len(),
        if result.cancelled { " (cancelled)" } else { "" }
    );
    Ok(result)
}

fn sweep_jobs(input: &InteractionInput, first: &EquilibriumState, last: &EquilibriumState, depth: f64) -> Vec<Job> {
    if let Some(count) = input.n_spacing {
        let interior = count.saturating_sub(2);
        let step = (last.n - first.n) / (interior + 1) as f64;
        return (1..=interior).map(|i| Job::Load(first.n + step * i as f64)).collect();
    }

    let interior = input.n_points.saturating_sub(2);
    if interior == 0 {
        return Vec::new();
    }
    // An infinite limit depth is replaced by the section depth, which then
    // becomes a sweep point of its own
    let end = |state: &EquilibriumState| {
        let d = state.neutral_axis_depth();
        if d.is_finite() {
            (d, false)
        } else {
            (depth, true)
        }
    };
    let (start, open_start) = end(first);
    let (stop, open_stop) = end(last);
    let total = interior + usize::from(!open_start) + usize::from(!open_stop);
    if total == 1 {
        return vec![Job::Depth(start)];
    }
    (0..total)
        .filter(|&i| (i > 0 || open_start) && (i + 1 < total || open_stop))
        .map(|i| Job::Depth(start + (stop - start) * i as f64 / (total - 1) as f64))
        .collect()
}

/// Insert after every point not yet past `point` in the diagram's direction,
/// never before the first limit or after the last.
fn insert_by_axial_load(points: &mut Vec<InteractionPoint>, point: InteractionPoint, descending: bool) {
    let last = points.len() - 1;
    let position = points[1..last]
        .iter()
        .position(|p| if descending { p.n() < point.n() } else { p.n() > point.n() })
        .map_or(last, |i| i + 1);
    points.insert(position, point);
}
