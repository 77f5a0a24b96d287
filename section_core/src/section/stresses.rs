//! Stress distribution for a single strain plane
//!
//! Point-by-point strains, stresses and forces plus per-material resultants,
//! for reporting a converged state rather than for solving.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use super::integrate::split_element;
use super::mesh::SectionMesh;
use super::strain::StrainPlane;
use crate::errors::CalcResult;
use crate::materials::{Material, Regime};

/// Strain and stress at one integration point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibreStress {
    /// Integration point
    pub position: Point,
    /// Tributary area
    pub area: f64,
    /// Strain from the plane
    pub strain: f64,
    /// Stress from the material law
    pub stress: f64,
    /// `stress * area`, less any prestress force for bars
    pub force: f64,
    /// Material name
    pub material: String,
}

/// Resultant of all fibres of one material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialResultant {
    pub material: String,
    pub n: f64,
    pub m_x: f64,
    pub m_y: f64,
    /// Offset of the resultant from the moment reference, `(m_y/n, m_x/n)`;
    /// the origin when `n = 0`
    pub point_of_action: Point,
}

/// Full stress state of a section under one plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressDistribution {
    pub plane: StrainPlane,
    pub regime: Regime,
    pub elements: Vec<FibreStress>,
    pub reinforcement: Vec<FibreStress>,
    /// One entry per distinct material, in first-use order
    pub materials: Vec<MaterialResultant>,
}

impl StressDistribution {
    /// Total axial force
    pub fn n(&self) -> f64 {
        self.materials.iter().map(|m| m.n).sum()
    }

    /// Total moment about the reference x-axis
    pub fn m_x(&self) -> f64 {
        self.materials.iter().map(|m| m.m_x).sum()
    }

    /// Total moment about the reference y-axis
    pub fn m_y(&self) -> f64 {
        self.materials.iter().map(|m| m.m_y).sum()
    }

    /// Resultant for a material by name
    pub fn resultant(&self, material: &str) -> Option<&MaterialResultant> {
        self.materials.iter().find(|m| m.material == material)
    }

    /// Largest compressive stress among the elements
    pub fn peak_element_stress(&self) -> f64 {
        self.elements.iter().map(|f| f.stress).fold(0.0, f64::max)
    }
}

/// Evaluate every element and bar of `section` under `plane`.
pub fn stress_distribution(
    section: &SectionMesh,
    plane: &StrainPlane,
    regime: Regime,
) -> CalcResult<StressDistribution> {
    let reference = section.moment_reference();
    let materials = section.materials();
    let mut totals = vec![(0.0, 0.0, 0.0); materials.len()];

    let mut add = |position: Point, area: f64, material: &Arc<Material>, prestress: f64| -> CalcResult<(f64, f64)> {
        let state = material.stress(plane.strain_at(position), regime)?;
        let force = state.stress * area - prestress;
        if let Some(i) = materials.iter().position(|m| Arc::ptr_eq(m, material)) {
            totals[i].0 += force;
            totals[i].1 += force * (position.y - reference.y);
            totals[i].2 += force * (position.x - reference.x);
        }
        Ok((state.stress, force))
    };
    let fibre = |position: Point, area: f64, material: &Material, (stress, force): (f64, f64)| FibreStress {
        position,
        area,
        strain: plane.strain_at(position),
        stress,
        force,
        material: material.name.clone(),
    };

    let mut elements = Vec::with_capacity(section.elements().len());
    for el in section.elements() {
        // A cut element reports its mean stress at the centroid
        let evaluated = match split_element(el, plane, regime) {
            Some(parts) => {
                let mut force = 0.0;
                for (p, area) in parts {
                    force += add(p, area, &el.material, 0.0)?.1;
                }
                (force / el.area, force)
            }
            None => add(el.centroid, el.area, &el.material, 0.0)?,
        };
        elements.push(fibre(el.centroid, el.area, &el.material, evaluated));
    }
    let mut reinforcement = Vec::with_capacity(section.reinforcement().len());
    for bar in section.reinforcement() {
        let evaluated = add(bar.position, bar.area, &bar.material, bar.prestress_force())?;
        reinforcement.push(fibre(bar.position, bar.area, &bar.material, evaluated));
    }

    let materials = materials
        .iter()
        .zip(totals)
        .map(|(material, (n, m_x, m_y))| MaterialResultant {
            material: material.name.clone(),
            n,
            m_x,
            m_y,
            point_of_action: point_of_action(n, m_x, m_y),
        })
        .collect();

    Ok(StressDistribution {
        plane: *plane,
        regime,
        elements,
        reinforcement,
        materials,
    })
}

/// `(m_y/n, m_x/n)`, or the origin for zero force
pub(crate) fn point_of_action(n: f64, m_x: f64, m_y: f64) -> Point {
    if n == 0.0 {
        Point::origin()
    } else {
        Point::new(m_y / n, m_x / n)
    }
}
