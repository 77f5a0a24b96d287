//! Stress integration over the mesh
//!
//! Midpoint rule: each element contributes `σ(ε(centroid)) · area` and each
//! bar `σ(ε(position)) · area - P`, where `P` is its prestress force.
//! An element with vertices whose strain range straddles the strain where
//! its law jumps in stress (a stress block edge, a tensile cut-off) is split
//! along that line and each part integrated at its own centroid, so the
//! resultants stay continuous as the line moves through the element.
//! Material limit errors propagate unchanged; the solvers decide what they
//! mean.

use serde::{Deserialize, Serialize};

use super::geometry::{polygon_properties, project, split_polygon, Point};
use super::mesh::{MeshElement, SectionMesh};
use super::strain::StrainPlane;
use crate::errors::CalcResult;
use crate::materials::{Material, Regime};

/// Resultant actions of a strain plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionActions {
    /// Axial force (compression positive)
    pub n: f64,
    /// Moment about the reference x-axis, `Σ F (y - cy)`
    pub m_x: f64,
    /// Moment about the reference y-axis, `Σ F (x - cx)`
    pub m_y: f64,
    /// Most tensile strain at an integration point
    pub min_strain: f64,
    /// Most compressive strain at an integration point
    pub max_strain: f64,
    /// `Σ E_t A`
    pub axial_stiffness: f64,
    /// `Σ E_t A (top - u)`, the stiffness moment about the extreme fibre
    pub depth_stiffness: f64,
    /// Elements split at a stress jump; the stiffness sums miss the jump
    /// when this is non-zero
    #[serde(default)]
    pub cut_elements: usize,
}

impl SectionActions {
    fn zero() -> Self {
        SectionActions {
            n: 0.0,
            m_x: 0.0,
            m_y: 0.0,
            min_strain: f64::INFINITY,
            max_strain: f64::NEG_INFINITY,
            axial_stiffness: 0.0,
            depth_stiffness: 0.0,
            cut_elements: 0,
        }
    }

    /// Resultant moment `√(Mx² + My²)`
    pub fn m_xy(&self) -> f64 {
        self.m_x.hypot(self.m_y)
    }
}

/// Integration points of an element cut by the stress jump of its law.
///
/// Returns the centroid and area of the parts on either side of the line
/// where the strain equals the jump, or `None` when the element is not cut
/// (no vertices, uniform plane, no jump, or the line misses it).
pub(crate) fn split_element(element: &MeshElement, plane: &StrainPlane, regime: Regime) -> Option<[(Point, f64); 2]> {
    if element.vertices.len() < 3 || plane.is_uniform() {
        return None;
    }
    let jump = element.material.stress_jump(regime)?;
    let (lo, hi) = element
        .vertices
        .iter()
        .map(|v| plane.strain_at_projection(project(plane.theta, *v)))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| (lo.min(e), hi.max(e)));
    if !(lo < jump && jump < hi) {
        return None;
    }

    let cut = plane.extreme_fibre - (plane.extreme_strain - jump) / plane.curvature;
    let (above, below) = split_polygon(&element.vertices, plane.theta, cut);
    let (area_above, above) = polygon_properties(&above);
    let (area_below, below) = polygon_properties(&below);
    let total = area_above + area_below;
    if !(total > 0.0) {
        return None;
    }
    // Keep the element's own area when its vertices only approximate it
    let scale = element.area / total;
    Some([(above, area_above * scale), (below, area_below * scale)])
}

/// Integrate stresses for a plane under the given regime.
pub fn integrate(section: &SectionMesh, plane: &StrainPlane, regime: Regime) -> CalcResult<SectionActions> {
    let (sin, cos) = plane.theta.sin_cos();
    let reference = section.moment_reference();
    let mut actions = SectionActions::zero();
    let mut cut_elements = 0;

    let mut add = |p: Point, area: f64, material: &Material, prestress: f64| -> CalcResult<()> {
        let u = -p.x * sin + p.y * cos;
        let strain = plane.strain_at_projection(u);
        let state = material.stress(strain, regime)?;

        let force = state.stress * area - prestress;
        actions.n += force;
        actions.m_x += force * (p.y - reference.y);
        actions.m_y += force * (p.x - reference.x);
        actions.min_strain = actions.min_strain.min(strain);
        actions.max_strain = actions.max_strain.max(strain);

        let stiffness = state.tangent * area;
        actions.axial_stiffness += stiffness;
        actions.depth_stiffness += stiffness * (plane.extreme_fibre - u);
        Ok(())
    };

    for el in section.elements() {
        match split_element(el, plane, regime) {
            Some(parts) => {
                cut_elements += 1;
                for (p, area) in parts {
                    add(p, area, &el.material, 0.0)?;
                }
            }
            None => add(el.centroid, el.area, &el.material, 0.0)?,
        }
    }
    for bar in section.reinforcement() {
        add(bar.position, bar.area, &bar.material, bar.prestress_force())?;
    }

    actions.cut_elements = cut_elements;
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::Material;
    use crate::section::geometry::Point;
    use crate::section::mesh::{Prestress, ReinforcementPoint};
    use std::sync::Arc;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn elastic_block() -> SectionMesh {
        SectionMesh::rectangle(400.0, 600.0, 4, 12, Arc::new(Material::linear("Elastic", 30_000.0))).unwrap()
    }

    #[test]
    fn test_uniform_strain_gives_axial_only() {
        let mesh = elastic_block();
        let plane = StrainPlane::uniform(&mesh.frame(0.0), 1e-4);
        let actions = integrate(&mesh, &plane, Regime::Service).unwrap();
        assert!(approx_eq(actions.n, 3.0 * 240_000.0, 1e-6));
        assert!(actions.m_x.abs() < 1e-3);
        assert!(actions.m_y.abs() < 1e-3);
        assert!(approx_eq(actions.axial_stiffness, 30_000.0 * 240_000.0, 1e-3));
    }

    #[test]
    fn test_pure_bending_of_elastic_rectangle() {
        // Neutral axis at mid-depth: N = 0, Mx = E κ I (midpoint rule exact for linear strain)
        let mesh = elastic_block();
        let kappa = 1e-6;
        let plane = StrainPlane::from_depth(&mesh.frame(0.0), 300.0, kappa);
        let actions = integrate(&mesh, &plane, Regime::Service).unwrap();
        assert!(actions.n.abs() < 1e-6);

        // Midpoint rule over 12 strips: I = b Σ h y_i²
        let h = 50.0;
        let i_strips: f64 = (0..12)
            .map(|j| {
                let y = (j as f64 + 0.5) * h - 300.0;
                400.0 * h * y * y
            })
            .sum();
        assert!(approx_eq(actions.m_x, 30_000.0 * kappa * i_strips, 1e-3));
        assert!(actions.m_y.abs() < 1e-6);
        assert!(approx_eq(actions.max_strain, kappa * 275.0, 1e-12));
        assert!(approx_eq(actions.min_strain, -kappa * 275.0, 1e-12));
    }

    #[test]
    fn test_prestress_reduces_axial_force() {
        let tendon = Arc::new(Material::linear("Strand", 195_000.0));
        let mesh = elastic_block()
            .with_reinforcement(vec![ReinforcementPoint::new(100.0, Point::new(200.0, 100.0), tendon)
                .with_prestress(Prestress::Force(150_000.0))])
            .unwrap();
        let plane = StrainPlane::uniform(&mesh.frame(0.0), 0.0);
        let actions = integrate(&mesh, &plane, Regime::Service).unwrap();
        assert!(approx_eq(actions.n, -150_000.0, 1e-6));
        // Eccentric tendon below the reference gives a positive Mx
        let lever = 100.0 - mesh.moment_reference().y;
        assert!(approx_eq(actions.m_x, -150_000.0 * lever, 1e-3));
    }

    #[test]
    fn test_stress_block_edge_is_integrated_exactly() {
        // One 100 mm cell, block edge 30 mm below the top: force is exactly α f'c b (30 mm)
        let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
        let mesh = SectionMesh::rectangle(200.0, 100.0, 1, 1, concrete).unwrap();
        let block = crate::materials::RectangularStressBlock::as3600(32.0);
        let d_n = 30.0 / block.gamma;
        let plane = StrainPlane::ultimate(&mesh.frame(0.0), d_n, 0.003).unwrap();

        let actions = integrate(&mesh, &plane, Regime::Ultimate).unwrap();
        let force = block.alpha * 32.0 * 200.0 * 30.0;
        assert_eq!(actions.cut_elements, 1);
        assert!(approx_eq(actions.n, force, 1e-6));
        // Block centroid 15 mm below the top, 35 mm above mid-depth
        assert!(approx_eq(actions.m_x, force * 35.0, 1e-3));
    }

    #[test]
    fn test_resultant_is_continuous_across_the_block_edge() {
        let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
        let mesh = SectionMesh::rectangle(300.0, 500.0, 3, 50, concrete).unwrap();
        let frame = mesh.frame(0.0);
        let n_at = |d: f64| {
            let plane = StrainPlane::ultimate(&frame, d, 0.003).unwrap();
            integrate(&mesh, &plane, Regime::Ultimate).unwrap().n
        };
        // The block edge crosses a row boundary between these depths
        let gamma = crate::materials::RectangularStressBlock::as3600(32.0).gamma;
        let d = 100.0 / gamma;
        let step = n_at(d + 1e-6) - n_at(d - 1e-6);
        assert!(step > 0.0 && step < 1.0);
    }

    #[test]
    fn test_cells_without_vertices_are_not_split() {
        let concrete = Arc::new(Material::concrete("Concrete 32", 32.0));
        let mesh = SectionMesh::new(
            vec![crate::section::mesh::MeshElement::new(
                20_000.0,
                Point::new(100.0, 50.0),
                concrete,
            )],
            Vec::new(),
        )
        .unwrap();
        let plane = StrainPlane::ultimate(&mesh.frame(0.0), 40.0, 0.003).unwrap();
        let actions = integrate(&mesh, &plane, Regime::Ultimate).unwrap();
        assert_eq!(actions.cut_elements, 0);
    }

    #[test]
    fn test_material_limit_propagates() {
        let mesh = SectionMesh::rectangle(100.0, 100.0, 2, 2, Arc::new(Material::concrete("C40", 40.0))).unwrap();
        let plane = StrainPlane::uniform(&mesh.frame(0.0), 0.004);
        let err = integrate(&mesh, &plane, Regime::Ultimate).unwrap_err();
        assert!(err.is_material_limit());
    }
}
