//! # Control Points
//!
//! A control point names one ultimate strain plane: either by a neutral
//! axis depth (directly, as a fraction of the section depth, or by the
//! yield ratio of the extreme tensile bar), by an axial load, or as the
//! zero-curvature squash state.
//!
//! | Tag | Meaning of `value` |
//! |---|---|
//! | `D` | `d_n = value × D` |
//! | `d_n` | `d_n = value` |
//! | `fy` | extreme bar strain is `-value × ε_y` |
//! | `N` | axial load to solve for |
//! | `kappa0` | uniform ultimate strain (value ignored) |
//!
//! Control points parse from and print to the compact form `fy=1`,
//! `N=-500000` or `kappa0`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::solver::{EquilibriumSolver, EquilibriumState};

/// How a control point's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    /// Neutral axis depth as a fraction of the section depth
    #[serde(rename = "D")]
    DepthRatio,
    /// Absolute neutral axis depth
    #[serde(rename = "d_n")]
    NeutralAxisDepth,
    /// Multiple of the yield strain at the extreme tensile bar
    #[serde(rename = "fy")]
    YieldRatio,
    /// Axial load
    #[serde(rename = "N")]
    AxialLoad,
    /// Zero curvature (squash load)
    #[serde(rename = "kappa0")]
    ZeroCurvature,
}

impl ControlKind {
    /// Stable string tag
    pub fn tag(&self) -> &'static str {
        match self {
            ControlKind::DepthRatio => "D",
            ControlKind::NeutralAxisDepth => "d_n",
            ControlKind::YieldRatio => "fy",
            ControlKind::AxialLoad => "N",
            ControlKind::ZeroCurvature => "kappa0",
        }
    }
}

impl FromStr for ControlKind {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "D" => Ok(ControlKind::DepthRatio),
            "d_n" => Ok(ControlKind::NeutralAxisDepth),
            "fy" => Ok(ControlKind::YieldRatio),
            "N" => Ok(ControlKind::AxialLoad),
            "kappa0" => Ok(ControlKind::ZeroCurvature),
            other => Err(CalcError::invalid_input(
                "control_point.kind",
                other,
                "Expected one of D, d_n, fy, N, kappa0",
            )),
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A named ultimate strain plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub kind: ControlKind,
    #[serde(default)]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ControlPoint {
    pub fn new(kind: ControlKind, value: f64) -> Self {
        ControlPoint {
            kind,
            value,
            label: None,
        }
    }

    /// `D`: neutral axis at `ratio × D`
    pub fn depth_ratio(ratio: f64) -> Self {
        ControlPoint::new(ControlKind::DepthRatio, ratio)
    }

    /// `d_n`: neutral axis at an absolute depth
    pub fn neutral_axis_depth(depth: f64) -> Self {
        ControlPoint::new(ControlKind::NeutralAxisDepth, depth)
    }

    /// `fy`: extreme tensile bar at `ratio × ε_y`
    pub fn yield_ratio(ratio: f64) -> Self {
        ControlPoint::new(ControlKind::YieldRatio, ratio)
    }

    /// `N`: solve for an axial load
    pub fn axial_load(n: f64) -> Self {
        ControlPoint::new(ControlKind::AxialLoad, n)
    }

    /// `kappa0`: squash state
    pub fn zero_curvature() -> Self {
        ControlPoint::new(ControlKind::ZeroCurvature, 0.0)
    }

    /// Attach a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// True when both name the same plane (labels ignored)
    pub fn same_plane(&self, other: &ControlPoint) -> bool {
        self.kind == other.kind && (self.kind == ControlKind::ZeroCurvature || self.value == other.value)
    }

    /// Check the value makes sense for the kind
    pub fn validate(&self) -> CalcResult<()> {
        if !self.value.is_finite() {
            return Err(CalcError::invalid_input(
                "control_point.value",
                self.value.to_string(),
                "Must be finite",
            ));
        }
        match self.kind {
            ControlKind::DepthRatio | ControlKind::NeutralAxisDepth | ControlKind::YieldRatio
                if !(self.value > 0.0) =>
            {
                Err(CalcError::invalid_input(
                    format!("control_point.{}", self.kind),
                    self.value.to_string(),
                    "Must be positive",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Resolve to an ultimate equilibrium state.
    pub fn solve(&self, solver: &EquilibriumSolver, theta: f64, ultimate_strain: f64) -> CalcResult<EquilibriumState> {
        self.validate()?;
        let section = solver.section();
        match self.kind {
            ControlKind::ZeroCurvature => solver.ultimate_at_depth(theta, f64::INFINITY, ultimate_strain),
            ControlKind::NeutralAxisDepth => solver.ultimate_at_depth(theta, self.value, ultimate_strain),
            ControlKind::DepthRatio => {
                let depth = section.frame(theta).depth();
                solver.ultimate_at_depth(theta, self.value * depth, ultimate_strain)
            }
            ControlKind::AxialLoad => solver.solve_ultimate(theta, self.value, ultimate_strain),
            ControlKind::YieldRatio => {
                let frame = section.frame(theta);
                let (index, bar_depth) = section.extreme_tensile_bar(&frame).ok_or_else(|| {
                    CalcError::invalid_input("control_point.fy", self.to_string(), "Section has no reinforcement")
                })?;
                let bar = &section.reinforcement()[index];
                let yield_strain = bar.material.yield_strain().ok_or_else(|| {
                    CalcError::invalid_input(
                        "control_point.fy",
                        bar.material.name.clone(),
                        "Extreme tensile bar material has no yield strain",
                    )
                })?;
                // ε_bar = ε_u (1 - d_b/d_n) = -value ε_y
                let depth = bar_depth / (1.0 + self.value * yield_strain / ultimate_strain);
                solver.ultimate_at_depth(theta, depth, ultimate_strain)
            }
        }
    }
}

impl fmt::Display for ControlPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ControlKind::ZeroCurvature => write!(f, "{}", self.kind),
            _ => write!(f, "{}={}", self.kind, self.value),
        }
    }
}

impl FromStr for ControlPoint {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = match s.split_once('=') {
            Some((kind, value)) => {
                let value: f64 = value.trim().parse().map_err(|_| {
                    CalcError::invalid_input("control_point.value", value.trim(), "Not a number")
                })?;
                (kind.parse::<ControlKind>()?, value)
            }
            None => (s.parse::<ControlKind>()?, 0.0),
        };
        if kind != ControlKind::ZeroCurvature && !s.contains('=') {
            return Err(CalcError::invalid_input(
                "control_point",
                s,
                format!("'{}' needs a value, e.g. {}=1", kind, kind),
            ));
        }
        Ok(ControlPoint::new(kind, value))
    }
}

/// A `kappa0` point may only appear first in a list.
pub fn validate_control_points(field: &str, points: &[ControlPoint]) -> CalcResult<()> {
    for (i, point) in points.iter().enumerate() {
        point.validate()?;
        if i > 0 && point.kind == ControlKind::ZeroCurvature {
            return Err(CalcError::invalid_input(
                format!("{}[{}]", field, i),
                point.to_string(),
                "kappa0 must be the first entry",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::Material;
    use crate::section::{Point, ReinforcementPoint, SectionMesh};
    use crate::solver::SolverConfig;
    use std::sync::Arc;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn beam() -> SectionMesh {
        let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
        let steel = Arc::new(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));
        SectionMesh::rectangle(300.0, 500.0, 3, 50, concrete)
            .unwrap()
            .with_reinforcement(vec![ReinforcementPoint::new(900.0, Point::new(150.0, 50.0), steel)])
            .unwrap()
    }

    #[test]
    fn test_tags_serialize_verbatim() {
        let points = vec![
            ControlPoint::zero_curvature(),
            ControlPoint::yield_ratio(1.0),
            ControlPoint::axial_load(0.0).with_label("pure bending"),
            ControlPoint::depth_ratio(0.5),
            ControlPoint::neutral_axis_depth(1e-6),
        ];
        let json = serde_json::to_string(&points).unwrap();
        for tag in ["\"kappa0\"", "\"fy\"", "\"N\"", "\"D\"", "\"d_n\""] {
            assert!(json.contains(tag), "missing {} in {}", tag, json);
        }
        let parsed: Vec<ControlPoint> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, points);
    }

    #[test]
    fn test_parse_and_display() {
        let fy: ControlPoint = "fy=1".parse().unwrap();
        assert_eq!(fy, ControlPoint::yield_ratio(1.0));
        assert_eq!(fy.to_string(), "fy=1");

        let n: ControlPoint = "N = -250000".parse().unwrap();
        assert_eq!(n.value, -250_000.0);

        let k: ControlPoint = "kappa0".parse().unwrap();
        assert_eq!(k.kind, ControlKind::ZeroCurvature);
        assert_eq!(k.to_string(), "kappa0");

        assert!("x=1".parse::<ControlPoint>().is_err());
        assert!("fy".parse::<ControlPoint>().is_err());
        assert!("fy=abc".parse::<ControlPoint>().is_err());
    }

    #[test]
    fn test_kappa0_must_be_first() {
        let ok = vec![ControlPoint::zero_curvature(), ControlPoint::axial_load(0.0)];
        assert!(validate_control_points("control_points", &ok).is_ok());
        let bad = vec![ControlPoint::axial_load(0.0), ControlPoint::zero_curvature()];
        assert!(validate_control_points("control_points", &bad).is_err());
    }

    #[test]
    fn test_yield_ratio_puts_bar_at_yield() {
        let mesh = beam();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        let state = ControlPoint::yield_ratio(1.0).solve(&solver, 0.0, 0.003).unwrap();
        let bar_strain = state.plane.strain_at(Point::new(150.0, 50.0));
        assert!(approx_eq(bar_strain, -0.0025, 1e-12));
    }

    #[test]
    fn test_depth_ratio_and_kappa0() {
        let mesh = beam();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        let half = ControlPoint::depth_ratio(0.5).solve(&solver, 0.0, 0.003).unwrap();
        assert!(approx_eq(half.neutral_axis_depth(), 250.0, 1e-9));

        let squash = ControlPoint::zero_curvature().solve(&solver, 0.0, 0.003).unwrap();
        assert!(squash.plane.is_uniform());
        assert!(squash.n > half.n);
    }

    #[test]
    fn test_yield_ratio_without_bars() {
        let mesh = SectionMesh::rectangle(100.0, 100.0, 1, 4, Arc::new(Material::concrete("C", 32.0))).unwrap();
        let solver = EquilibriumSolver::new(&mesh, SolverConfig::default());
        assert!(ControlPoint::yield_ratio(1.0).solve(&solver, 0.0, 0.003).is_err());
    }
}
