//! # Elastic Stresses
//!
//! Uncracked stresses from caller-supplied transformed section properties.
//! The strain field of `(n, m_x, m_y)` on the modulus-weighted section is
//!
//! ```text
//! ε = n/EA + (EIyy·Mx − EIxy·My)·y'/Δ + (EIxx·My − EIxy·Mx)·x'/Δ
//! Δ = EIxx·EIyy − EIxy²
//! ```
//!
//! with `x' = x - cx`, `y' = y - cy`. Each fibre's stress is that strain
//! times its material's initial modulus.

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::materials::Material;
use crate::section::stresses::point_of_action;
use crate::section::{FibreStress, Point, SectionMesh};

/// Modulus-weighted section properties about the elastic centroid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticProperties {
    /// Axial rigidity Σ E·A
    pub e_a: f64,
    /// Elastic centroid
    pub cx: f64,
    pub cy: f64,
    /// Flexural rigidities about the centroid
    pub e_ixx: f64,
    pub e_iyy: f64,
    pub e_ixy: f64,
}

impl ElasticProperties {
    fn determinant(&self) -> f64 {
        self.e_ixx * self.e_iyy - self.e_ixy * self.e_ixy
    }

    /// Check the rigidities describe a stable section
    pub fn validate(&self) -> CalcResult<()> {
        let values = [
            ("e_a", self.e_a),
            ("cx", self.cx),
            ("cy", self.cy),
            ("e_ixx", self.e_ixx),
            ("e_iyy", self.e_iyy),
            ("e_ixy", self.e_ixy),
        ];
        if let Some((field, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CalcError::invalid_input(*field, value.to_string(), "Must be finite"));
        }
        if !(self.e_a > 0.0) {
            return Err(CalcError::invalid_input("e_a", self.e_a.to_string(), "Must be positive"));
        }
        if !(self.e_ixx > 0.0) || !(self.e_iyy > 0.0) || !(self.determinant() > 0.0) {
            return Err(CalcError::invalid_input(
                "e_ixx/e_iyy/e_ixy",
                format!("{:e} / {:e} / {:e}", self.e_ixx, self.e_iyy, self.e_ixy),
                "Flexural rigidity must be positive definite",
            ));
        }
        Ok(())
    }

    /// Strain at a point under the given actions
    pub fn strain_at(&self, p: Point, n: f64, m_x: f64, m_y: f64) -> f64 {
        let det = self.determinant();
        let x = p.x - self.cx;
        let y = p.y - self.cy;
        n / self.e_a
            + (self.e_iyy * m_x - self.e_ixy * m_y) * y / det
            + (self.e_ixx * m_y - self.e_ixy * m_x) * x / det
    }
}

/// Elastic stresses over the section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticStress {
    pub elements: Vec<FibreStress>,
    pub reinforcement: Vec<FibreStress>,
    /// Net axial force of all fibres
    pub n: f64,
    /// Net moments about the elastic centroid
    pub m_x: f64,
    pub m_y: f64,
    /// Offset of the net force from the elastic centroid
    pub point_of_action: Point,
}

/// Elastic stresses at element centroids and bars for `(n, m_x, m_y)`.
pub fn elastic_stress(
    section: &SectionMesh,
    properties: &ElasticProperties,
    n: f64,
    m_x: f64,
    m_y: f64,
) -> CalcResult<ElasticStress> {
    properties.validate()?;
    for (field, value) in [("n", n), ("m_x", m_x), ("m_y", m_y)] {
        if !value.is_finite() {
            return Err(CalcError::invalid_input(field, value.to_string(), "Must be finite"));
        }
    }

    let fibre = |position: Point, area: f64, material: &Material| {
        let strain = properties.strain_at(position, n, m_x, m_y);
        let stress = material.initial_modulus() * strain;
        FibreStress {
            position,
            area,
            strain,
            stress,
            force: stress * area,
            material: material.name.clone(),
        }
    };

    let elements: Vec<FibreStress> = section
        .elements()
        .iter()
        .map(|el| fibre(el.centroid, el.area, &el.material))
        .collect();
    let reinforcement: Vec<FibreStress> = section
        .reinforcement()
        .iter()
        .map(|bar| fibre(bar.position, bar.area, &bar.material))
        .collect();

    let (mut net_n, mut net_mx, mut net_my) = (0.0, 0.0, 0.0);
    for f in elements.iter().chain(&reinforcement) {
        net_n += f.force;
        net_mx += f.force * (f.position.y - properties.cy);
        net_my += f.force * (f.position.x - properties.cx);
    }

    Ok(ElasticStress {
        elements,
        reinforcement,
        n: net_n,
        m_x: net_mx,
        m_y: net_my,
        point_of_action: point_of_action(net_n, net_mx, net_my),
    })
}
