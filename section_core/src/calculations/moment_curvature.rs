//! # Moment-Curvature Analysis
//!
//! Traces the service moment-curvature response at a constant axial load.
//! Starting from the zero-curvature state, curvature is increased in
//! adaptive steps; each step is one neutral axis solve.
//!
//! ## Step Control
//!
//! Once two states are accepted, each new state is compared with the last:
//!
//! - relative moment change above `moment_change_max`, or a slow solve:
//!   reject and retry with the step divided by `step_multiplier`
//! - relative moment change below `moment_change_min` with a fast solve:
//!   accept and grow the next step (up to `max_step`)
//!
//! A material limit or failed solve also shrinks the step. At `min_step`
//! the analysis ends.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use section_core::calculations::moment_curvature::{calculate, MomentCurvatureInput};
//! use section_core::materials::Material;
//! use section_core::section::{Point, ReinforcementPoint, SectionMesh};
//! use section_core::solver::SolverConfig;
//!
//! let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
//! let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
//! let section = SectionMesh::rectangle(300.0, 500.0, 3, 25, concrete)?
//!     .with_reinforcement(vec![ReinforcementPoint::new(900.0, Point::new(150.0, 50.0), steel)])?;
//!
//! let input = MomentCurvatureInput::new("B1").with_max_curvature(2e-5);
//! let result = calculate(&section, &input, &SolverConfig::default())?;
//! assert!(result.states.len() > 2);
//! # Ok::<(), section_core::CalcError>(())
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::validate_label_and_values;
use crate::errors::{CalcError, CalcResult, StrainSide};
use crate::progress::{ProgressEvent, ProgressObserver, Silent};
use crate::section::SectionMesh;
use crate::solver::{EquilibriumSolver, EquilibriumState, SolverConfig};

/// Adaptive curvature step settings (curvature in 1/length units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepControl {
    pub initial_step: f64,
    pub step_multiplier: f64,
    pub max_step: f64,
    pub min_step: f64,
    /// Grow the step below this relative moment change
    pub moment_change_min: f64,
    /// Reject the step above this relative moment change
    pub moment_change_max: f64,
    /// Solves at or below this many trials count as fast
    pub fast_iterations: usize,
    /// Solves above this many trials are rejected
    pub slow_iterations: usize,
}

impl Default for StepControl {
    fn default() -> Self {
        StepControl {
            initial_step: 1e-7,
            step_multiplier: 2.0,
            max_step: 5e-6,
            min_step: 1e-10,
            moment_change_min: 0.15,
            moment_change_max: 0.3,
            fast_iterations: 8,
            slow_iterations: 40,
        }
    }
}

impl StepControl {
    fn validate(&self) -> CalcResult<()> {
        let positive = [
            ("steps.initial_step", self.initial_step),
            ("steps.max_step", self.max_step),
            ("steps.min_step", self.min_step),
            ("steps.moment_change_max", self.moment_change_max),
        ];
        for (field, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(CalcError::invalid_input(field, value.to_string(), "Must be positive"));
            }
        }
        if !(self.step_multiplier > 1.0) {
            return Err(CalcError::invalid_input(
                "steps.step_multiplier",
                self.step_multiplier.to_string(),
                "Must be greater than 1",
            ));
        }
        if self.min_step > self.initial_step || self.initial_step > self.max_step {
            return Err(CalcError::invalid_input(
                "steps",
                format!("{:e} / {:e} / {:e}", self.min_step, self.initial_step, self.max_step),
                "Need min_step <= initial_step <= max_step",
            ));
        }
        if !(self.moment_change_min >= 0.0) || self.moment_change_min > self.moment_change_max {
            return Err(CalcError::invalid_input(
                "steps.moment_change_min",
                self.moment_change_min.to_string(),
                "Must be between 0 and moment_change_max",
            ));
        }
        Ok(())
    }
}

/// Input parameters for a moment-curvature analysis.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "B1 sagging",
///   "theta": 0.0,
///   "axial_load": 0.0,
///   "max_yield_multiplier": 20.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentCurvatureInput {
    /// User label
    pub label: String,
    /// Neutral axis angle (radians)
    #[serde(default)]
    pub theta: f64,
    /// Constant axial load (compression positive)
    #[serde(default)]
    pub axial_load: f64,
    /// Step control
    #[serde(default)]
    pub steps: StepControl,
    /// Stop once curvature reaches this multiple of the first-yield curvature
    #[serde(default)]
    pub max_yield_multiplier: Option<f64>,
    /// Stop at this curvature
    #[serde(default)]
    pub max_curvature: Option<f64>,
    /// Cap on accepted states
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    10_000
}

impl MomentCurvatureInput {
    /// Pure bending about x with default step control
    pub fn new(label: impl Into<String>) -> Self {
        MomentCurvatureInput {
            label: label.into(),
            theta: 0.0,
            axial_load: 0.0,
            steps: StepControl::default(),
            max_yield_multiplier: None,
            max_curvature: None,
            max_steps: default_max_steps(),
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

    pub fn with_steps(mut self, steps: StepControl) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_max_curvature(mut self, max_curvature: f64) -> Self {
        self.max_curvature = Some(max_curvature);
        self
    }

    pub fn with_max_yield_multiplier(mut self, multiplier: f64) -> Self {
        self.max_yield_multiplier = Some(multiplier);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Validate input parameters
    pub fn validate(&self) -> CalcResult<()> {
        validate_label_and_values(&self.label, &[("theta", self.theta), ("axial_load", self.axial_load)])?;
        self.steps.validate()?;
        for (field, value) in [
            ("max_yield_multiplier", self.max_yield_multiplier),
            ("max_curvature", self.max_curvature),
        ] {
            if let Some(v) = value {
                if !(v > 0.0) || !v.is_finite() {
                    return Err(CalcError::invalid_input(field, v.to_string(), "Must be positive"));
                }
            }
        }
        if self.max_steps < 2 {
            return Err(CalcError::invalid_input(
                "max_steps",
                self.max_steps.to_string(),
                "At least two states are required",
            ));
        }
        Ok(())
    }
}

/// Why a moment-curvature trace stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details")]
pub enum Termination {
    /// A material limit was hit even at the minimum step
    MaterialLimit {
        material: String,
        strain: f64,
        limit: f64,
        side: StrainSide,
    },
    /// Reached `max_curvature` or `max_yield_multiplier`
    CurvatureCap,
    /// Reached `max_steps`
    StepLimit,
    /// Stopped by the progress observer
    Cancelled,
    /// A solve failed at the minimum step for a reason other than a limit
    Failed { reason: String },
}

/// A notable point on the curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvatureEvent {
    pub curvature: f64,
    pub moment: f64,
    /// Material that cracked or yielded
    pub material: String,
}

/// Result of a moment-curvature analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentCurvatureResult {
    pub label: String,
    pub theta: f64,
    pub axial_load: f64,
    /// Accepted states, strictly increasing in curvature
    pub states: Vec<EquilibriumState>,
    pub termination: Termination,
    /// First state with an element past its cracking strain
    pub first_crack: Option<CurvatureEvent>,
    /// First state with a bar past its yield strain
    pub first_yield: Option<CurvatureEvent>,
    /// True when the observer stopped the analysis
    pub cancelled: bool,
}

impl MomentCurvatureResult {
    /// Curvatures of the accepted states
    pub fn curvatures(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.curvature()).collect()
    }

    /// Bending moments (about the neutral axis direction) of the accepted states
    pub fn moments(&self) -> Vec<f64> {
        self.states.iter().map(|s| bending_moment(s, self.theta)).collect()
    }

    /// State with the largest bending moment
    pub fn peak_moment(&self) -> Option<&EquilibriumState> {
        self.states.iter().max_by(|a, b| {
            bending_moment(a, self.theta).total_cmp(&bending_moment(b, self.theta))
        })
    }

    /// Bending moment at a curvature, interpolated linearly
    pub fn moment_at_curvature(&self, curvature: f64) -> Option<f64> {
        let kappa = self.curvatures();
        let moments = self.moments();
        let i = kappa.windows(2).position(|w| curvature >= w[0] && curvature <= w[1])?;
        let t = (curvature - kappa[i]) / (kappa[i + 1] - kappa[i]);
        Some(moments[i] + t * (moments[i + 1] - moments[i]))
    }

    /// First curvature at which the bending moment reaches `moment`
    pub fn curvature_at_moment(&self, moment: f64) -> Option<f64> {
        let kappa = self.curvatures();
        let moments = self.moments();
        let i = moments
            .windows(2)
            .position(|w| (w[0] <= moment && moment <= w[1]) || (w[1] <= moment && moment <= w[0]))?;
        if moments[i + 1] == moments[i] {
            return Some(kappa[i]);
        }
        let t = (moment - moments[i]) / (moments[i + 1] - moments[i]);
        Some(kappa[i] + t * (kappa[i + 1] - kappa[i]))
    }
}

/// Moment in the bending direction: `Mx cos θ - My sin θ`
pub fn bending_moment(state: &EquilibriumState, theta: f64) -> f64 {
    let (sin, cos) = theta.sin_cos();
    state.m_x * cos - state.m_y * sin
}

/// Run a moment-curvature analysis.
pub fn calculate(
    section: &SectionMesh,
    input: &MomentCurvatureInput,
    config: &SolverConfig,
) -> CalcResult<MomentCurvatureResult> {
    calculate_with_progress(section, input, config, &Silent)
}

/// Run a moment-curvature analysis, reporting each accepted state.
pub fn calculate_with_progress(
    section: &SectionMesh,
    input: &MomentCurvatureInput,
    config: &SolverConfig,
    observer: &dyn ProgressObserver,
) -> CalcResult<MomentCurvatureResult> {
    input.validate()?;
    config.validate()?;

    let solver = EquilibriumSolver::new(section, *config);
    let steps = &input.steps;
    let first = solver.solve_for_neutral_axis(0.0, input.theta, input.axial_load)?;

    let mut result = MomentCurvatureResult {
        label: input.label.clone(),
        theta: input.theta,
        axial_load: input.axial_load,
        states: vec![first],
        termination: Termination::StepLimit,
        first_crack: None,
        first_yield: None,
        cancelled: false,
    };
    record_events(section, &mut result, &first);
    if observer.on_event(&step_event(&result, &first)).is_break() {
        return Ok(cancel(result));
    }

    let mut curvature = 0.0;
    let mut step = steps.initial_step;

    let termination = loop {
        if result.states.len() >= input.max_steps {
            break Termination::StepLimit;
        }

        let mut trial = curvature + step;
        if let Some(cap) = input.max_curvature {
            trial = trial.min(cap);
        }

        let state = match solver.solve_for_neutral_axis(trial, input.theta, input.axial_load) {
            Ok(state) => state,
            Err(e) if e.is_recoverable() => {
                if step <= steps.min_step {
                    break terminate_on(e);
                }
                debug!("kappa = {:e}: {}; reducing step", trial, e);
                step = (step / steps.step_multiplier).max(steps.min_step);
                continue;
            }
            Err(e) => break Termination::Failed { reason: e.to_string() },
        };

        // Step control applies once the curve has two points to compare
        let mut next_step = step;
        if let Some(last) = result.states.last().filter(|_| result.states.len() >= 2) {
            let previous = bending_moment(last, input.theta);
            let current = bending_moment(&state, input.theta);
            let change = (current - previous).abs() / previous.abs().max(f64::MIN_POSITIVE);
            let slow = state.iterations > steps.slow_iterations;
            if (change > steps.moment_change_max || slow) && step > steps.min_step {
                debug!(
                    "kappa = {:e}: rejected (moment change {:.3}, {} trials)",
                    trial, change, state.iterations
                );
                step = (step / steps.step_multiplier).max(steps.min_step);
                continue;
            }
            if change < steps.moment_change_min && state.iterations <= steps.fast_iterations {
                next_step = (step * steps.step_multiplier).min(steps.max_step);
            }
        }

        curvature = trial;
        step = next_step;
        result.states.push(state);
        record_events(section, &mut result, &state);
        debug!(
            "step {}: kappa = {:e}, M = {:.4}",
            result.states.len() - 1,
            curvature,
            bending_moment(&state, input.theta)
        );

        if observer.on_event(&step_event(&result, &state)).is_break() {
            break Termination::Cancelled;
        }
        if input.max_curvature.is_some_and(|cap| curvature >= cap) {
            break Termination::CurvatureCap;
        }
        if let (Some(multiplier), Some(yielded)) = (input.max_yield_multiplier, &result.first_yield) {
            if curvature >= multiplier * yielded.curvature {
                break Termination::CurvatureCap;
            }
        }
    };

    result.cancelled = termination == Termination::Cancelled;
    result.termination = termination;
    info!(
        "moment-curvature '{}': {} states, {:?}",
        result.label,
        result.states.len(),
        result.termination
    );
    Ok(result)
}

fn cancel(mut result: MomentCurvatureResult) -> MomentCurvatureResult {
    result.cancelled = true;
    result.termination = Termination::Cancelled;
    result
}

fn terminate_on(error: CalcError) -> Termination {
    match error {
        CalcError::MaterialLimitExceeded {
            material,
            strain,
            limit,
            side,
        } => Termination::MaterialLimit {
            material,
            strain,
            limit,
            side,
        },
        other => Termination::Failed {
            reason: other.to_string(),
        },
    }
}

fn step_event(result: &MomentCurvatureResult, state: &EquilibriumState) -> ProgressEvent {
    ProgressEvent::CurvatureStep {
        step: result.states.len() - 1,
        curvature: state.curvature(),
        moment: bending_moment(state, result.theta),
    }
}

fn record_events(section: &SectionMesh, result: &mut MomentCurvatureResult, state: &EquilibriumState) {
    let event = |material: &str| CurvatureEvent {
        curvature: state.curvature(),
        moment: bending_moment(state, result.theta),
        material: material.to_string(),
    };

    if result.first_crack.is_none() {
        let cracked = section.elements().iter().find(|el| {
            el.material
                .cracking_strain()
                .is_some_and(|crack| state.plane.strain_at(el.centroid) < crack)
        });
        if let Some(el) = cracked {
            result.first_crack = Some(event(&el.material.name));
        }
    }

    if result.first_yield.is_none() {
        let yielded = section.reinforcement().iter().find(|bar| {
            bar.material
                .yield_strain()
                .is_some_and(|ey| state.plane.strain_at(bar.position).abs() >= ey)
        });
        if let Some(bar) = yielded {
            result.first_yield = Some(event(&bar.material.name));
        }
    }
}
