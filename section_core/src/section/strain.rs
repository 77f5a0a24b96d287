//! Planar strain distributions

use serde::{Deserialize, Serialize};

use super::geometry::{project, BendingFrame, Point};
use crate::errors::{CalcError, CalcResult};

/// A plane of strain across the section.
///
/// `ε(p) = ε_top - κ (top - u(p))`, where `u` is the projection onto the
/// compression normal of the frame at `theta` and `top` the projection of
/// the extreme compressive fibre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainPlane {
    /// Neutral axis angle (radians)
    pub theta: f64,
    /// Projection of the extreme compressive fibre
    pub extreme_fibre: f64,
    /// Strain at the extreme compressive fibre
    pub extreme_strain: f64,
    /// Curvature (non-negative)
    pub curvature: f64,
}

impl StrainPlane {
    /// Uniform strain (zero curvature)
    pub fn uniform(frame: &BendingFrame, strain: f64) -> Self {
        StrainPlane {
            theta: frame.theta,
            extreme_fibre: frame.top,
            extreme_strain: strain,
            curvature: 0.0,
        }
    }

    /// Service plane from a neutral axis depth and curvature.
    ///
    /// The depth may be negative (neutral axis above the section) or
    /// beyond the section depth.
    pub fn from_depth(frame: &BendingFrame, depth: f64, curvature: f64) -> Self {
        StrainPlane {
            theta: frame.theta,
            extreme_fibre: frame.top,
            extreme_strain: curvature * depth,
            curvature,
        }
    }

    /// Ultimate plane: extreme fibre at `ultimate_strain`, neutral axis at
    /// `depth`. An infinite depth gives the uniform squash state.
    pub fn ultimate(frame: &BendingFrame, depth: f64, ultimate_strain: f64) -> CalcResult<Self> {
        if depth == f64::INFINITY {
            return Ok(StrainPlane::uniform(frame, ultimate_strain));
        }
        if !(depth > 0.0) || !depth.is_finite() {
            return Err(CalcError::invalid_input(
                "neutral_axis_depth",
                depth.to_string(),
                "Ultimate planes need a positive neutral axis depth",
            ));
        }
        Ok(StrainPlane {
            theta: frame.theta,
            extreme_fibre: frame.top,
            extreme_strain: ultimate_strain,
            curvature: ultimate_strain / depth,
        })
    }

    /// Strain at a point
    pub fn strain_at(&self, p: Point) -> f64 {
        self.strain_at_projection(project(self.theta, p))
    }

    /// Strain at a projected coordinate `u`
    pub fn strain_at_projection(&self, u: f64) -> f64 {
        self.extreme_strain - self.curvature * (self.extreme_fibre - u)
    }

    /// True when the curvature is zero
    pub fn is_uniform(&self) -> bool {
        self.curvature == 0.0
    }

    /// Depth of the neutral axis below the extreme fibre.
    ///
    /// `±∞` for a uniform plane (sign of the strain), `NaN` for the zero plane.
    pub fn neutral_axis_depth(&self) -> f64 {
        if self.is_uniform() {
            if self.extreme_strain == 0.0 {
                return f64::NAN;
            }
            return f64::INFINITY.copysign(self.extreme_strain);
        }
        self.extreme_strain / self.curvature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn frame() -> BendingFrame {
        BendingFrame::new(0.0, vec![Point::new(0.0, 0.0), Point::new(400.0, 600.0)])
    }

    #[test]
    fn test_from_depth() {
        let plane = StrainPlane::from_depth(&frame(), 200.0, 1e-5);
        assert!(approx_eq(plane.extreme_strain, 2e-3, 1e-15));
        assert!(approx_eq(plane.strain_at(Point::new(0.0, 400.0)), 0.0, 1e-15));
        assert!(approx_eq(plane.strain_at(Point::new(0.0, 0.0)), -4e-3, 1e-15));
        assert!(approx_eq(plane.neutral_axis_depth(), 200.0, 1e-9));
    }

    #[test]
    fn test_negative_depth_is_all_tension() {
        let plane = StrainPlane::from_depth(&frame(), -50.0, 1e-5);
        assert!(plane.strain_at(Point::new(0.0, 600.0)) < 0.0);
        assert!(approx_eq(plane.neutral_axis_depth(), -50.0, 1e-9));
    }

    #[test]
    fn test_ultimate_plane() {
        let plane = StrainPlane::ultimate(&frame(), 150.0, 0.003).unwrap();
        assert!(approx_eq(plane.curvature, 2e-5, 1e-15));
        assert!(approx_eq(plane.strain_at(Point::new(0.0, 450.0)), 0.0, 1e-15));

        let squash = StrainPlane::ultimate(&frame(), f64::INFINITY, 0.003).unwrap();
        assert!(squash.is_uniform());
        assert_eq!(squash.strain_at(Point::new(0.0, 0.0)), 0.003);
        assert_eq!(squash.neutral_axis_depth(), f64::INFINITY);

        assert!(StrainPlane::ultimate(&frame(), 0.0, 0.003).is_err());
    }

    #[test]
    fn test_uniform_tension_depth_sign() {
        let plane = StrainPlane::uniform(&frame(), -1e-4);
        assert_eq!(plane.neutral_axis_depth(), f64::NEG_INFINITY);
        assert!(StrainPlane::uniform(&frame(), 0.0).neutral_axis_depth().is_nan());
    }
}
