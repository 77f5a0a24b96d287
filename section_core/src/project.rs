//! # Project Data Structures
//!
//! The `Project` struct is the root container for a section analysis job.
//! Projects serialize to human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Project
//! ├── meta: ProjectMetadata (version, engineer, job info, timestamps)
//! ├── settings: GlobalSettings (solver tolerances, units label)
//! ├── materials: Vec<Material> (referenced by name)
//! ├── sections: Vec<SectionDef> (meshes built on demand)
//! └── items: HashMap<Uuid, AnalysisItem> (analyses, each naming a section)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use section_core::project::Project;
//! use section_core::progress::Silent;
//!
//! let project = Project::example();
//! let (id, _) = project.find_item("B1 ultimate").unwrap();
//! let output = project.run_item(&id, &Silent)?;
//! println!("{}", output.summary());
//! # Ok::<(), section_core::CalcError>(())
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculations::{
    BiaxialInput, CalculationItem, CalculationOutput, InteractionInput, MomentCurvatureInput, UltimateInput,
};
use crate::errors::{CalcError, CalcResult};
use crate::materials::Material;
use crate::progress::ProgressObserver;
use crate::section::{MeshElement, Point, Prestress, ReinforcementPoint, SectionMesh};
use crate::solver::SolverConfig;

/// Current schema version for project files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root project container.
///
/// Items are stored in a flat UUID-keyed map for O(1) lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project metadata (version, engineer, job info)
    pub meta: ProjectMetadata,

    /// Global settings (solver tolerances, units)
    #[serde(default)]
    pub settings: GlobalSettings,

    /// Materials, referenced by name from sections
    #[serde(default)]
    pub materials: Vec<Material>,

    /// Section definitions, referenced by name from items
    #[serde(default)]
    pub sections: Vec<SectionDef>,

    /// All analysis items, keyed by UUID
    #[serde(default)]
    pub items: HashMap<Uuid, AnalysisItem>,
}

impl Project {
    /// Create a new empty project.
    ///
    /// # Example
    ///
    /// ```rust
    /// use section_core::project::Project;
    ///
    /// let project = Project::new("John Doe", "25-001", "Client Corp");
    /// assert_eq!(project.meta.engineer, "John Doe");
    /// ```
    pub fn new(engineer: impl Into<String>, job_id: impl Into<String>, client: impl Into<String>) -> Self {
        let now = Utc::now();
        Project {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                engineer: engineer.into(),
                job_id: job_id.into(),
                client: client.into(),
                created: now,
                modified: now,
            },
            settings: GlobalSettings::default(),
            materials: Vec::new(),
            sections: Vec::new(),
            items: HashMap::new(),
        }
    }

    /// Add or replace a material (matched by name)
    pub fn add_material(&mut self, material: Material) {
        match self.materials.iter_mut().find(|m| m.name == material.name) {
            Some(existing) => *existing = material,
            None => self.materials.push(material),
        }
        self.touch();
    }

    /// Add or replace a section definition (matched by name)
    pub fn add_section(&mut self, section: SectionDef) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
        self.touch();
    }

    /// Add an analysis of a named section. Returns the UUID assigned to it.
    pub fn add_item(&mut self, section: impl Into<String>, calculation: CalculationItem) -> Uuid {
        let id = Uuid::new_v4();
        self.items.insert(
            id,
            AnalysisItem {
                section: section.into(),
                calculation,
            },
        );
        self.touch();
        id
    }

    /// Remove an item by UUID, returning it if it existed.
    pub fn remove_item(&mut self, id: &Uuid) -> Option<AnalysisItem> {
        let item = self.items.remove(id);
        if item.is_some() {
            self.touch();
        }
        item
    }

    /// Get an item by UUID.
    pub fn get_item(&self, id: &Uuid) -> Option<&AnalysisItem> {
        self.items.get(id)
    }

    /// Get a mutable reference to an item; marks the project as modified.
    pub fn get_item_mut(&mut self, id: &Uuid) -> Option<&mut AnalysisItem> {
        if self.items.contains_key(id) {
            self.meta.modified = Utc::now();
            self.items.get_mut(id)
        } else {
            None
        }
    }

    /// First item (by label order) whose label matches
    pub fn find_item(&self, label: &str) -> Option<(Uuid, &AnalysisItem)> {
        self.items_by_label()
            .into_iter()
            .find(|(_, item)| item.calculation.label() == label)
    }

    /// Items sorted by label, then UUID, for stable output
    pub fn items_by_label(&self) -> Vec<(Uuid, &AnalysisItem)> {
        let mut items: Vec<_> = self.items.iter().map(|(id, item)| (*id, item)).collect();
        items.sort_by(|a, b| a.1.calculation.label().cmp(b.1.calculation.label()).then(a.0.cmp(&b.0)));
        items
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Look up a material by name
    pub fn material(&self, name: &str) -> CalcResult<&Material> {
        self.materials
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| CalcError::material_not_found(name))
    }

    /// Look up a section definition by name
    pub fn section(&self, name: &str) -> CalcResult<&SectionDef> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CalcError::ItemNotFound {
                item: format!("section '{}'", name),
            })
    }

    /// Build the mesh of a named section
    pub fn build_section(&self, name: &str) -> CalcResult<SectionMesh> {
        self.section(name)?.build(&self.materials)
    }

    /// Check names are unique, materials are valid and every reference resolves
    pub fn validate(&self) -> CalcResult<()> {
        for (i, material) in self.materials.iter().enumerate() {
            material.validate()?;
            if self.materials[..i].iter().any(|m| m.name == material.name) {
                return Err(CalcError::invalid_input(
                    "materials",
                    material.name.clone(),
                    "Material names must be unique",
                ));
            }
        }
        for (i, section) in self.sections.iter().enumerate() {
            if self.sections[..i].iter().any(|s| s.name == section.name) {
                return Err(CalcError::invalid_input(
                    "sections",
                    section.name.clone(),
                    "Section names must be unique",
                ));
            }
            for name in section.material_names() {
                self.material(name)?;
            }
        }
        for item in self.items.values() {
            self.section(&item.section)?;
            item.calculation.validate()?;
        }
        self.settings.solver.validate()
    }

    /// Run one item with the project's solver settings
    pub fn run_item(&self, id: &Uuid, observer: &dyn ProgressObserver) -> CalcResult<CalculationOutput> {
        let item = self.get_item(id).ok_or_else(|| CalcError::ItemNotFound { item: id.to_string() })?;
        let section = self.build_section(&item.section)?;
        info!(
            "running {} '{}' on section '{}'",
            item.calculation.calc_type(),
            item.calculation.label(),
            item.section
        );
        item.calculation.run(&section, &self.settings.solver, observer)
    }

    /// Run every item in label order. A failing item does not stop the rest.
    pub fn run_all(&self, observer: &dyn ProgressObserver) -> Vec<ItemRun> {
        self.items_by_label()
            .into_iter()
            .map(|(id, item)| {
                let outcome = self.run_item(&id, observer);
                if let Err(e) = &outcome {
                    warn!("item '{}' failed: {}", item.calculation.label(), e);
                }
                ItemRun::new(id, item, outcome)
            })
            .collect()
    }

    /// A 300 × 600 reinforced concrete beam with one item of each analysis
    pub fn example() -> Self {
        let mut project = Project::new("Engineer", "EX-001", "Example");
        project.add_material(Material::concrete("Concrete 40", 40.0));
        project.add_material(Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05));

        let bar = |x: f64, y: f64| BarDef::new(450.0, Point::new(x, y), "Grade 500");
        project.add_section(SectionDef {
            name: "B1 300x600".to_string(),
            elements: vec![ElementDef::Grid {
                min: Point::origin(),
                max: Point::new(300.0, 600.0),
                nx: 6,
                ny: 60,
                material: "Concrete 40".to_string(),
            }],
            reinforcement: vec![bar(60.0, 50.0), bar(150.0, 50.0), bar(240.0, 50.0), bar(60.0, 550.0), bar(240.0, 550.0)],
            outline: Vec::new(),
            moment_reference: None,
        });

        let section = "B1 300x600";
        project.add_item(
            section,
            CalculationItem::MomentCurvature(MomentCurvatureInput::new("B1 moment-curvature")),
        );
        project.add_item(section, CalculationItem::Ultimate(UltimateInput::new("B1 ultimate")));
        project.add_item(section, CalculationItem::Interaction(InteractionInput::new("B1 interaction")));
        project.add_item(
            section,
            CalculationItem::Biaxial(BiaxialInput::new("B1 biaxial").with_axial_load(500_000.0)),
        );
        project
    }
}

impl Default for Project {
    fn default() -> Self {
        Project::new("", "", "")
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Name of the responsible engineer
    pub engineer: String,

    /// Job/project number
    pub job_id: String,

    /// Client name
    #[serde(default)]
    pub client: String,

    /// When the project was created
    pub created: DateTime<Utc>,

    /// When the project was last modified
    pub modified: DateTime<Utc>,
}

/// Global project settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// Equilibrium solver tolerances used by every item
    pub solver: SolverConfig,

    /// Units label for reports; the core only assumes consistency
    pub units: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        GlobalSettings {
            solver: SolverConfig::default(),
            units: "N, mm".to_string(),
        }
    }
}

/// An analysis and the section it runs on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisItem {
    /// Section name
    pub section: String,
    #[serde(flatten)]
    pub calculation: CalculationItem,
}

/// Area element definition, referencing a material by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum ElementDef {
    /// Pre-integrated cell (area and centroid only)
    Cell { area: f64, centroid: Point, material: String },
    /// Triangle from a mesh generator
    Triangle { vertices: [Point; 3], material: String },
    /// Rectangle split into `nx × ny` cells
    Grid {
        min: Point,
        max: Point,
        nx: usize,
        ny: usize,
        material: String,
    },
}

impl ElementDef {
    fn material(&self) -> &str {
        match self {
            ElementDef::Cell { material, .. }
            | ElementDef::Triangle { material, .. }
            | ElementDef::Grid { material, .. } => material,
        }
    }

    fn push_elements(&self, material: &Arc<Material>, out: &mut Vec<MeshElement>) -> CalcResult<()> {
        match self {
            ElementDef::Cell { area, centroid, .. } => {
                out.push(MeshElement::new(*area, *centroid, Arc::clone(material)));
            }
            ElementDef::Triangle { vertices: [a, b, c], .. } => {
                out.push(MeshElement::triangle(*a, *b, *c, Arc::clone(material)));
            }
            ElementDef::Grid { min, max, nx, ny, .. } => {
                if *nx == 0 || *ny == 0 {
                    return Err(CalcError::invalid_input(
                        "Grid divisions",
                        format!("{}x{}", nx, ny),
                        "Grid divisions must be at least 1",
                    ));
                }
                let dx = (max.x - min.x) / *nx as f64;
                let dy = (max.y - min.y) / *ny as f64;
                for j in 0..*ny {
                    for i in 0..*nx {
                        let lo = Point::new(min.x + i as f64 * dx, min.y + j as f64 * dy);
                        let hi = Point::new(lo.x + dx, lo.y + dy);
                        out.push(MeshElement::rectangle(lo, hi, Arc::clone(material)));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Bar or tendon definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarDef {
    pub area: f64,
    pub position: Point,
    pub material: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prestress: Option<Prestress>,
}

impl BarDef {
    pub fn new(area: f64, position: Point, material: impl Into<String>) -> Self {
        BarDef {
            area,
            position,
            material: material.into(),
            prestress: None,
        }
    }
}

/// A named section: area elements, bars and optional outline/reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDef {
    pub name: String,
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub reinforcement: Vec<BarDef>,
    /// Outline used for extreme fibres; element vertices when empty
    #[serde(default)]
    pub outline: Vec<Point>,
    /// Moment reference; stiffness centroid when absent
    #[serde(default)]
    pub moment_reference: Option<Point>,
}

impl SectionDef {
    fn material_names(&self) -> impl Iterator<Item = &str> {
        self.elements
            .iter()
            .map(ElementDef::material)
            .chain(self.reinforcement.iter().map(|bar| bar.material.as_str()))
    }

    /// Resolve material names and assemble the mesh.
    ///
    /// Elements and bars naming the same material share one `Arc`.
    pub fn build(&self, materials: &[Material]) -> CalcResult<SectionMesh> {
        let mut shared: HashMap<String, Arc<Material>> = HashMap::new();
        let mut resolve = |name: &str| -> CalcResult<Arc<Material>> {
            if let Some(material) = shared.get(name) {
                return Ok(Arc::clone(material));
            }
            let material = materials
                .iter()
                .find(|m| m.name == name)
                .ok_or_else(|| CalcError::material_not_found(name))?;
            let material = Arc::new(material.clone());
            shared.insert(name.to_string(), Arc::clone(&material));
            Ok(material)
        };

        let mut elements = Vec::new();
        for def in &self.elements {
            let material = resolve(def.material())?;
            def.push_elements(&material, &mut elements)?;
        }
        let mut bars = Vec::with_capacity(self.reinforcement.len());
        for def in &self.reinforcement {
            let mut bar = ReinforcementPoint::new(def.area, def.position, resolve(&def.material)?);
            bar.prestress = def.prestress;
            bars.push(bar);
        }

        let mut mesh = SectionMesh::new(elements, bars)?;
        if !self.outline.is_empty() {
            mesh = mesh.with_outline(self.outline.clone())?;
        }
        if let Some(reference) = self.moment_reference {
            mesh = mesh.with_moment_reference(reference)?;
        }
        Ok(mesh)
    }
}

/// Outcome of running one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRun {
    pub id: Uuid,
    pub label: String,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<CalculationOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CalcError>,
}

impl ItemRun {
    fn new(id: Uuid, item: &AnalysisItem, outcome: CalcResult<CalculationOutput>) -> Self {
        let (output, error) = match outcome {
            Ok(output) => (Some(output), None),
            Err(e) => (None, Some(e)),
        };
        ItemRun {
            id,
            label: item.calculation.label().to_string(),
            section: item.section.clone(),
            output,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Silent;

    #[test]
    fn test_project_creation() {
        let project = Project::new("John Doe", "25-001", "Acme Corp");
        assert_eq!(project.meta.engineer, "John Doe");
        assert_eq!(project.meta.job_id, "25-001");
        assert_eq!(project.meta.client, "Acme Corp");
        assert_eq!(project.meta.version, SCHEMA_VERSION);
        assert_eq!(project.settings.units, "N, mm");
    }

    #[test]
    fn test_project_serialization() {
        let project = Project::example();
        let json = serde_json::to_string_pretty(&project).unwrap();

        assert!(json.contains("\"shape\": \"Grid\""));
        assert!(json.contains("\"type\": \"Interaction\""));
        assert!(json.contains("\"section\": \"B1 300x600\""));

        let roundtrip: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.items, project.items);
        assert_eq!(roundtrip.sections, project.sections);
        assert_eq!(roundtrip.materials, project.materials);
        roundtrip.validate().unwrap();
    }

    #[test]
    fn test_add_remove_item() {
        let mut project = Project::example();
        let before = project.item_count();
        let id = project.add_item("B1 300x600", CalculationItem::Ultimate(UltimateInput::new("extra")));
        assert_eq!(project.item_count(), before + 1);
        assert!(project.get_item(&id).is_some());
        assert_eq!(project.find_item("extra").map(|(found, _)| found), Some(id));

        assert!(project.remove_item(&id).is_some());
        assert_eq!(project.item_count(), before);
        assert!(project.remove_item(&id).is_none());
    }

    #[test]
    fn test_build_section_shares_materials() {
        let project = Project::example();
        let mesh = project.build_section("B1 300x600").unwrap();
        assert_eq!(mesh.elements().len(), 360);
        assert_eq!(mesh.reinforcement().len(), 5);
        assert_eq!(mesh.materials().len(), 2);
        assert!((mesh.meshed_area() - 180_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_references() {
        let mut project = Project::example();
        assert!(matches!(
            project.build_section("missing"),
            Err(CalcError::ItemNotFound { .. })
        ));

        project.sections[0].reinforcement.push(BarDef::new(100.0, Point::new(10.0, 10.0), "Grade 300"));
        assert!(matches!(
            project.build_section("B1 300x600"),
            Err(CalcError::MaterialNotFound { .. })
        ));
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_duplicate_material_names_rejected() {
        let mut project = Project::example();
        project.materials.push(Material::concrete("Concrete 40", 50.0));
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_run_item_and_run_all() {
        let mut project = Project::example();
        project.items.retain(|_, item| matches!(item.calculation, CalculationItem::Ultimate(_)));
        let (id, _) = project.find_item("B1 ultimate").unwrap();
        let output = project.run_item(&id, &Silent).unwrap();
        assert!(matches!(output, CalculationOutput::Ultimate(_)));

        project.add_item("nowhere", CalculationItem::Ultimate(UltimateInput::new("A orphan")));
        let runs = project.run_all(&Silent);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].label, "A orphan");
        assert!(runs[0].error.is_some());
        assert!(runs[1].output.is_some());
    }
}
