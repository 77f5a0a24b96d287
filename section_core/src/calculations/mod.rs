//! # Section Analyses
//!
//! Each analysis follows the pattern:
//!
//! - `*Input` - Input parameters (JSON-serializable)
//! - `*Result` - Analysis results (JSON-serializable)
//! - `calculate(section, input, config) -> CalcResult<*Result>`
//!
//! Long-running analyses also offer `calculate_with_progress`, which reports
//! to a [`ProgressObserver`] and can be cancelled through it.
//!
//! ## Available Analyses
//!
//! - [`moment_curvature`] - service moment-curvature response at constant axial load
//! - [`ultimate`] - ultimate bending capacity at one axial load
//! - [`interaction`] - ultimate moment-interaction diagram
//! - [`biaxial`] - ultimate capacity over neutral axis angles
//! - [`elastic`] - uncracked stresses from transformed properties
//! - [`control_points`] - named ultimate strain planes used by the sweeps

pub mod biaxial;
pub mod control_points;
pub mod elastic;
pub mod interaction;
pub mod moment_curvature;
mod sweep;
pub mod ultimate;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::progress::ProgressObserver;
use crate::section::SectionMesh;
use crate::solver::SolverConfig;

pub use biaxial::{BiaxialInput, BiaxialPoint, BiaxialResult};
pub use control_points::{ControlKind, ControlPoint};
pub use elastic::{elastic_stress, ElasticProperties, ElasticStress};
pub use interaction::{InteractionInput, InteractionPoint, InteractionResult};
pub use moment_curvature::{MomentCurvatureInput, MomentCurvatureResult, StepControl, Termination};
pub use sweep::PointFailure;
pub use ultimate::{UltimateInput, UltimateResult};

/// Checks shared by every analysis input: a non-blank label and finite values
pub(crate) fn validate_label_and_values(label: &str, values: &[(&str, f64)]) -> CalcResult<()> {
    if label.trim().is_empty() {
        return Err(CalcError::missing_field("label"));
    }
    match values.iter().find(|(_, v)| !v.is_finite()) {
        Some((field, value)) => Err(CalcError::invalid_input(*field, value.to_string(), "Must be finite")),
        None => Ok(()),
    }
}

/// Enum wrapper for all analysis types.
///
/// This allows storing heterogeneous analyses in a single collection
/// while maintaining type safety and clean serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationItem {
    /// Moment-curvature response
    MomentCurvature(MomentCurvatureInput),
    /// Single ultimate capacity
    Ultimate(UltimateInput),
    /// Moment-interaction diagram
    Interaction(InteractionInput),
    /// Biaxial bending sweep
    Biaxial(BiaxialInput),
}

impl CalculationItem {
    /// Get the user-provided label for this analysis
    pub fn label(&self) -> &str {
        match self {
            CalculationItem::MomentCurvature(i) => &i.label,
            CalculationItem::Ultimate(i) => &i.label,
            CalculationItem::Interaction(i) => &i.label,
            CalculationItem::Biaxial(i) => &i.label,
        }
    }

    /// Get the analysis type as a string
    pub fn calc_type(&self) -> &'static str {
        match self {
            CalculationItem::MomentCurvature(_) => "MomentCurvature",
            CalculationItem::Ultimate(_) => "Ultimate",
            CalculationItem::Interaction(_) => "Interaction",
            CalculationItem::Biaxial(_) => "Biaxial",
        }
    }

    /// Switch rayon evaluation on or off where the analysis supports it
    pub fn set_parallel(&mut self, parallel: bool) {
        match self {
            CalculationItem::Interaction(i) => i.parallel = parallel,
            CalculationItem::Biaxial(i) => i.parallel = parallel,
            CalculationItem::MomentCurvature(_) | CalculationItem::Ultimate(_) => {}
        }
    }

    /// Validate the wrapped input
    pub fn validate(&self) -> CalcResult<()> {
        match self {
            CalculationItem::MomentCurvature(i) => i.validate(),
            CalculationItem::Ultimate(i) => i.validate(),
            CalculationItem::Interaction(i) => i.validate(),
            CalculationItem::Biaxial(i) => i.validate(),
        }
    }

    /// Run the analysis on a section
    pub fn run(
        &self,
        section: &SectionMesh,
        config: &SolverConfig,
        observer: &dyn ProgressObserver,
    ) -> CalcResult<CalculationOutput> {
        Ok(match self {
            CalculationItem::MomentCurvature(input) => CalculationOutput::MomentCurvature(
                moment_curvature::calculate_with_progress(section, input, config, observer)?,
            ),
            CalculationItem::Ultimate(input) => {
                CalculationOutput::Ultimate(ultimate::calculate(section, input, config)?)
            }
            CalculationItem::Interaction(input) => CalculationOutput::Interaction(
                interaction::calculate_with_progress(section, input, config, observer)?,
            ),
            CalculationItem::Biaxial(input) => {
                CalculationOutput::Biaxial(biaxial::calculate_with_progress(section, input, config, observer)?)
            }
        })
    }
}

/// Result of any analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationOutput {
    MomentCurvature(MomentCurvatureResult),
    Ultimate(UltimateResult),
    Interaction(InteractionResult),
    Biaxial(BiaxialResult),
}

impl CalculationOutput {
    /// Label of the analysis that produced this output
    pub fn label(&self) -> &str {
        match self {
            CalculationOutput::MomentCurvature(r) => &r.label,
            CalculationOutput::Ultimate(r) => &r.label,
            CalculationOutput::Interaction(r) => &r.label,
            CalculationOutput::Biaxial(r) => &r.label,
        }
    }

    /// One-line description for terminal output
    pub fn summary(&self) -> String {
        match self {
            CalculationOutput::MomentCurvature(r) => {
                let peak = r
                    .peak_moment()
                    .map(|s| moment_curvature::bending_moment(s, r.theta))
                    .unwrap_or(0.0);
                format!(
                    "{} states, peak M = {:.4e}, stopped: {:?}",
                    r.states.len(),
                    peak,
                    r.termination
                )
            }
            CalculationOutput::Ultimate(r) => format!(
                "N = {:.4e}, Mx = {:.4e}, My = {:.4e}, d_n = {:.2}",
                r.state.n, r.state.m_x, r.state.m_y, r.neutral_axis_depth
            ),
            CalculationOutput::Interaction(r) => format!(
                "{} points, {} failures{}",
                r.points.len(),
                r.failures.len(),
                if r.cancelled { ", cancelled" } else { "" }
            ),
            CalculationOutput::Biaxial(r) => format!(
                "{} angles, {} failures, max M = {:.4e}",
                r.points.len(),
                r.failures.len(),
                r.max_moment().map(|p| p.state.m_xy()).unwrap_or(0.0)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::Material;
    use crate::progress::Silent;
    use std::sync::Arc;

    #[test]
    fn test_inputs_share_label_and_finite_checks() {
        let blank = CalculationItem::Biaxial(BiaxialInput::new(" "));
        assert!(matches!(blank.validate(), Err(CalcError::MissingField { .. })));
        let nan = CalculationItem::MomentCurvature(MomentCurvatureInput::new("M1").with_axial_load(f64::NAN));
        match nan.validate() {
            Err(CalcError::InvalidInput { field, .. }) => assert_eq!(field, "axial_load"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_item_serialization_is_tagged() {
        let item = CalculationItem::Ultimate(UltimateInput::new("U1").with_axial_load(1000.0));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "Ultimate");
        assert_eq!(json["label"], "U1");
        let back: CalculationItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
        assert_eq!(back.calc_type(), "Ultimate");
    }

    #[test]
    fn test_minimal_interaction_json_uses_defaults() {
        let item: CalculationItem = serde_json::from_str(r#"{ "type": "Interaction", "label": "I1" }"#).unwrap();
        match item {
            CalculationItem::Interaction(input) => {
                assert_eq!(input.n_points, 24);
                assert_eq!(input.control_points.len(), 3);
                assert_eq!(input.limits[1], ControlPoint::neutral_axis_depth(1e-6));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_set_parallel() {
        let mut item = CalculationItem::Biaxial(BiaxialInput::new("B"));
        item.set_parallel(true);
        assert!(matches!(item, CalculationItem::Biaxial(ref i) if i.parallel));
    }

    #[test]
    fn test_run_dispatches() {
        let mesh = SectionMesh::rectangle(200.0, 400.0, 2, 20, Arc::new(Material::concrete("C", 32.0))).unwrap();
        let item = CalculationItem::Ultimate(UltimateInput::new("U1").with_axial_load(500_000.0));
        let output = item.run(&mesh, &SolverConfig::default(), &Silent).unwrap();
        assert_eq!(output.label(), "U1");
        assert!(matches!(output, CalculationOutput::Ultimate(_)));
        assert!(output.summary().starts_with("N = "));
    }
}
