//! Discretized cross-section
//!
//! A [`SectionMesh`] is an ordered list of area elements (integrated at
//! their centroids) plus discrete reinforcement points. The mesh is built
//! once, validated on construction, and then only read by the integrator
//! and solvers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::geometry::{triangle_properties, BendingFrame, Point};
use crate::errors::{CalcError, CalcResult};
use crate::materials::{Material, StressStrain};

/// One integration cell of the concrete (or other continuum) region
#[derive(Debug, Clone)]
pub struct MeshElement {
    /// Area (positive)
    pub area: f64,
    /// Integration point
    pub centroid: Point,
    /// Boundary vertices, if known; used for the section extent
    pub vertices: Vec<Point>,
    /// Shared material
    pub material: Arc<Material>,
}

impl MeshElement {
    /// Element from area and centroid only
    pub fn new(area: f64, centroid: Point, material: Arc<Material>) -> Self {
        MeshElement {
            area,
            centroid,
            vertices: Vec::new(),
            material,
        }
    }

    /// Triangular element from three vertices
    pub fn triangle(a: Point, b: Point, c: Point, material: Arc<Material>) -> Self {
        let (area, centroid) = triangle_properties(a, b, c);
        MeshElement {
            area,
            centroid,
            vertices: vec![a, b, c],
            material,
        }
    }

    /// Axis-aligned rectangular cell
    pub fn rectangle(min: Point, max: Point, material: Arc<Material>) -> Self {
        let area = (max.x - min.x).abs() * (max.y - min.y).abs();
        MeshElement {
            area,
            centroid: Point::new(0.5 * (min.x + max.x), 0.5 * (min.y + max.y)),
            vertices: vec![min, Point::new(max.x, min.y), max, Point::new(min.x, max.y)],
            material,
        }
    }
}

/// Prestress applied to a reinforcement point (tension positive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Prestress {
    /// Total force
    Force(f64),
    /// Stress, multiplied by the bar area
    Stress(f64),
}

/// A discrete bar or tendon evaluated at its own position
#[derive(Debug, Clone)]
pub struct ReinforcementPoint {
    /// Bar area
    pub area: f64,
    /// Bar centre
    pub position: Point,
    /// Shared material
    pub material: Arc<Material>,
    /// Explicit prestress; overrides the material's initial prestress
    pub prestress: Option<Prestress>,
}

impl ReinforcementPoint {
    /// Non-prestressed bar
    pub fn new(area: f64, position: Point, material: Arc<Material>) -> Self {
        ReinforcementPoint {
            area,
            position,
            material,
            prestress: None,
        }
    }

    /// Set an explicit prestress
    pub fn with_prestress(mut self, prestress: Prestress) -> Self {
        self.prestress = Some(prestress);
        self
    }

    /// Prestress force (tension positive), zero when none is applied
    pub fn prestress_force(&self) -> f64 {
        match self.prestress {
            Some(Prestress::Force(force)) => force,
            Some(Prestress::Stress(stress)) => stress * self.area,
            None => self.material.initial_prestress.unwrap_or(0.0) * self.area,
        }
    }
}

/// A meshed cross-section ready for integration.
#[derive(Debug, Clone)]
pub struct SectionMesh {
    elements: Vec<MeshElement>,
    reinforcement: Vec<ReinforcementPoint>,
    outline: Vec<Point>,
    stiffness_centroid: Point,
    moment_reference: Option<Point>,
}

impl SectionMesh {
    /// Validate and assemble a mesh.
    ///
    /// At least one element is required; every area must be positive and
    /// every coordinate finite.
    pub fn new(elements: Vec<MeshElement>, reinforcement: Vec<ReinforcementPoint>) -> CalcResult<Self> {
        if elements.is_empty() {
            return Err(CalcError::invalid_input(
                "elements",
                "0",
                "A section needs at least one mesh element",
            ));
        }

        for (i, el) in elements.iter().enumerate() {
            check_area(&format!("elements[{}].area", i), el.area)?;
            check_point(&format!("elements[{}].centroid", i), el.centroid)?;
            for v in &el.vertices {
                check_point(&format!("elements[{}].vertices", i), *v)?;
            }
        }
        for (i, bar) in reinforcement.iter().enumerate() {
            check_area(&format!("reinforcement[{}].area", i), bar.area)?;
            check_point(&format!("reinforcement[{}].position", i), bar.position)?;
            if !bar.prestress_force().is_finite() {
                return Err(CalcError::invalid_input(
                    format!("reinforcement[{}].prestress", i),
                    bar.prestress_force().to_string(),
                    "Prestress must be finite",
                ));
            }
        }

        let mut mesh = SectionMesh {
            elements,
            reinforcement,
            outline: Vec::new(),
            stiffness_centroid: Point::origin(),
            moment_reference: None,
        };
        for material in mesh.materials() {
            material.validate()?;
        }
        mesh.stiffness_centroid = mesh.compute_stiffness_centroid();
        Ok(mesh)
    }

    /// Structured grid of `nx × ny` rectangular cells spanning
    /// `[0, width] × [0, depth]`.
    pub fn rectangle(width: f64, depth: f64, nx: usize, ny: usize, material: Arc<Material>) -> CalcResult<Self> {
        check_area("width", width)?;
        check_area("depth", depth)?;
        if nx == 0 || ny == 0 {
            return Err(CalcError::invalid_input(
                "divisions",
                format!("{}x{}", nx, ny),
                "Grid divisions must be at least 1",
            ));
        }
        let dx = width / nx as f64;
        let dy = depth / ny as f64;
        let mut elements = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let min = Point::new(i as f64 * dx, j as f64 * dy);
                let max = Point::new((i + 1) as f64 * dx, (j + 1) as f64 * dy);
                elements.push(MeshElement::rectangle(min, max, Arc::clone(&material)));
            }
        }
        SectionMesh::new(elements, Vec::new())
    }

    /// Add reinforcement points (the elements must already exclude the bar area)
    pub fn with_reinforcement(self, bars: Vec<ReinforcementPoint>) -> CalcResult<Self> {
        let outline = self.outline;
        let reference = self.moment_reference;
        let mut reinforcement = self.reinforcement;
        reinforcement.extend(bars);
        let mut mesh = SectionMesh::new(self.elements, reinforcement)?;
        mesh.outline = outline;
        mesh.moment_reference = reference;
        Ok(mesh)
    }

    /// Explicit outline points bounding the section
    pub fn with_outline(mut self, outline: Vec<Point>) -> CalcResult<Self> {
        for p in &outline {
            check_point("outline", *p)?;
        }
        self.outline = outline;
        Ok(self)
    }

    /// Take moments about a specific point instead of the stiffness centroid
    pub fn with_moment_reference(mut self, reference: Point) -> CalcResult<Self> {
        check_point("moment_reference", reference)?;
        self.moment_reference = Some(reference);
        Ok(self)
    }

    /// Area elements in input order
    pub fn elements(&self) -> &[MeshElement] {
        &self.elements
    }

    /// Reinforcement points in input order
    pub fn reinforcement(&self) -> &[ReinforcementPoint] {
        &self.reinforcement
    }

    /// Point moments are taken about
    pub fn moment_reference(&self) -> Point {
        self.moment_reference.unwrap_or(self.stiffness_centroid)
    }

    /// Axial-stiffness-weighted centroid of elements and bars
    pub fn stiffness_centroid(&self) -> Point {
        self.stiffness_centroid
    }

    /// Sum of element areas (bars excluded)
    pub fn meshed_area(&self) -> f64 {
        self.elements.iter().map(|el| el.area).sum()
    }

    /// Sum of bar areas
    pub fn reinforcement_area(&self) -> f64 {
        self.reinforcement.iter().map(|bar| bar.area).sum()
    }

    /// Bending frame for an angle.
    ///
    /// Uses the explicit outline when given, otherwise element vertices
    /// (centroids for elements without vertices) and bar positions.
    pub fn frame(&self, theta: f64) -> BendingFrame {
        if !self.outline.is_empty() {
            return BendingFrame::new(theta, self.outline.iter().copied());
        }
        let element_points = self.elements.iter().flat_map(|el| {
            if el.vertices.is_empty() {
                std::slice::from_ref(&el.centroid).iter().copied()
            } else {
                el.vertices.iter().copied()
            }
        });
        let bar_points = self.reinforcement.iter().map(|bar| bar.position);
        BendingFrame::new(theta, element_points.chain(bar_points))
    }

    /// Index and depth below the top fibre of the deepest bar
    pub fn extreme_tensile_bar(&self, frame: &BendingFrame) -> Option<(usize, f64)> {
        self.reinforcement
            .iter()
            .enumerate()
            .map(|(i, bar)| (i, frame.depth_of(bar.position)))
            .fold(None, |best, (i, depth)| match best {
                Some((_, d)) if d >= depth => best,
                _ => Some((i, depth)),
            })
    }

    /// Smallest crushing strain among the element materials' ultimate laws
    pub fn ultimate_strain(&self) -> CalcResult<f64> {
        self.elements
            .iter()
            .filter_map(|el| el.material.ultimate_law.compressive_limit())
            .fold(None, |acc: Option<f64>, e| Some(acc.map_or(e, |a| a.min(e))))
            .ok_or_else(|| {
                CalcError::invalid_input(
                    "ultimate_strain",
                    "none",
                    "No element material defines a crushing strain; set the ultimate strain explicitly",
                )
            })
    }

    /// Characteristic force `Σ E0·A · 10⁻³` used to scale force tolerances
    pub fn force_scale(&self) -> f64 {
        let stiffness: f64 = self.axial_stiffness_terms().map(|(ea, _)| ea).sum();
        let scale = stiffness * 1e-3;
        if scale > 0.0 {
            scale
        } else {
            (self.meshed_area() + self.reinforcement_area()).max(1.0)
        }
    }

    /// Distinct materials in first-use order
    pub fn materials(&self) -> Vec<Arc<Material>> {
        let mut found: Vec<Arc<Material>> = Vec::new();
        let all = self
            .elements
            .iter()
            .map(|el| &el.material)
            .chain(self.reinforcement.iter().map(|bar| &bar.material));
        for material in all {
            if !found.iter().any(|m| Arc::ptr_eq(m, material)) {
                found.push(Arc::clone(material));
            }
        }
        found
    }

    fn axial_stiffness_terms(&self) -> impl Iterator<Item = (f64, Point)> + '_ {
        let elements = self
            .elements
            .iter()
            .map(|el| (el.material.initial_modulus() * el.area, el.centroid));
        let bars = self
            .reinforcement
            .iter()
            .map(|bar| (bar.material.initial_modulus() * bar.area, bar.position));
        elements.chain(bars)
    }

    fn compute_stiffness_centroid(&self) -> Point {
        let (mut ea, mut qx, mut qy) = (0.0, 0.0, 0.0);
        for (weight, p) in self.axial_stiffness_terms() {
            ea += weight;
            qx += weight * p.x;
            qy += weight * p.y;
        }
        if ea > 0.0 {
            return Point::new(qx / ea, qy / ea);
        }

        let (mut a, mut qx, mut qy) = (0.0, 0.0, 0.0);
        for el in &self.elements {
            a += el.area;
            qx += el.area * el.centroid.x;
            qy += el.area * el.centroid.y;
        }
        Point::new(qx / a, qy / a)
    }
}

fn check_area(field: &str, area: f64) -> CalcResult<()> {
    if !(area > 0.0) || !area.is_finite() {
        return Err(CalcError::invalid_input(field, area.to_string(), "Must be positive and finite"));
    }
    Ok(())
}

fn check_point(field: &str, p: Point) -> CalcResult<()> {
    if !p.is_finite() {
        return Err(CalcError::invalid_input(field, p.to_string(), "Coordinates must be finite"));
    }
    Ok(())
}
