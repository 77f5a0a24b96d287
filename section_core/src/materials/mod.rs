//! # Materials
//!
//! Material definitions for section analysis. A [`Material`] pairs a
//! *service* stress-strain law (cracking, moment-curvature) with an
//! *ultimate* law (capacity, interaction), and is shared between mesh
//! entries through `Arc<Material>`.
//!
//! ## Law Types
//!
//! - **Generic**: linear elastic, linear no-tension, piecewise
//! - **Concrete**: linear with cut-off, bilinear, rectangular stress block,
//!   parabola-rectangle, EC2 nonlinear, Mander
//! - **Steel**: elastic-plastic, linear hardening
//!
//! ## Example
//!
//! ```rust
//! use section_core::materials::{Material, Regime};
//!
//! let concrete = Material::concrete("Concrete 40", 40.0);
//! let steel = Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05);
//!
//! let s = steel.stress(-0.001, Regime::Service).unwrap();
//! assert!((s.stress + 200.0).abs() < 1e-9);
//! assert!(concrete.stress(0.004, Regime::Ultimate).is_err());
//! ```

pub mod concrete;
pub mod profile;
pub mod steel;

pub use concrete::{
    BilinearConcrete, ConcreteLinear, EurocodeNonLinear, Mander, ManderRegime, ParabolicRectangular,
    RectangularStressBlock,
};
pub use profile::{
    LimitExceeded, LinearElastic, LinearNoTension, Piecewise, StrainLimits, StressState, StressStrain,
    StressStrainLaw, LIMIT_TOLERANCE,
};
pub use steel::{ElasticPlastic, SteelHardening};

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Which stress-strain law an analysis uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    /// Service law (cracking, moment-curvature)
    Service,
    /// Ultimate law (capacity, interaction)
    Ultimate,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regime::Service => write!(f, "service"),
            Regime::Ultimate => write!(f, "ultimate"),
        }
    }
}

/// A named material with service and ultimate behaviour.
///
/// ## JSON Serialization
///
/// ```json
/// {
///   "name": "Grade 500",
///   "density": 7.85e-6,
///   "service_law": { "type": "ElasticPlastic", "elastic_modulus": 200000.0, "yield_strength": 500.0, "fracture_strain": 0.05 },
///   "ultimate_law": { "type": "ElasticPlastic", "elastic_modulus": 200000.0, "yield_strength": 500.0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Display name, used in error messages and project references
    pub name: String,
    /// Mass density (kg/mm³ in the presets)
    #[serde(default)]
    pub density: f64,
    /// Law for service analyses
    pub service_law: StressStrainLaw,
    /// Law for ultimate analyses
    pub ultimate_law: StressStrainLaw,
    /// Flexural tensile strength, used to flag first cracking
    #[serde(default)]
    pub flexural_tensile_strength: Option<f64>,
    /// Initial prestress (stress, tension positive) applied to bars of this material
    #[serde(default)]
    pub initial_prestress: Option<f64>,
}

impl Material {
    /// Create a material from its two laws
    pub fn new(
        name: impl Into<String>,
        service_law: impl Into<StressStrainLaw>,
        ultimate_law: impl Into<StressStrainLaw>,
    ) -> Self {
        Material {
            name: name.into(),
            density: 0.0,
            service_law: service_law.into(),
            ultimate_law: ultimate_law.into(),
            flexural_tensile_strength: None,
            initial_prestress: None,
        }
    }

    /// Same unlimited linear elastic law in both regimes
    pub fn linear(name: impl Into<String>, elastic_modulus: f64) -> Self {
        let law = LinearElastic::new(elastic_modulus);
        Material::new(name, law, law)
    }

    /// Normal-weight concrete of characteristic strength `f'c` (MPa).
    ///
    /// - `E_c = 3320√f'c + 6900`
    /// - Service: linear with tensile cut-off at `0.6√f'c`, crushing at 0.003
    /// - Ultimate: AS3600 rectangular stress block
    pub fn concrete(name: impl Into<String>, compressive_strength: f64) -> Self {
        let elastic_modulus = 3320.0 * compressive_strength.sqrt() + 6900.0;
        let tensile_strength = 0.6 * compressive_strength.sqrt();
        let service = ConcreteLinear::new(elastic_modulus, tensile_strength)
            .with_limits(StrainLimits::compression(0.003));
        let ultimate = RectangularStressBlock::as3600(compressive_strength);
        Material::new(name, service, ultimate)
            .with_density(2.4e-6)
            .with_flexural_tensile_strength(tensile_strength)
    }

    /// Reinforcing bar steel (MPa).
    ///
    /// The service law fractures at `fracture_strain`; the ultimate law
    /// has unlimited ductility so pure-tension states stay solvable.
    pub fn reinforcing_steel(
        name: impl Into<String>,
        yield_strength: f64,
        elastic_modulus: f64,
        fracture_strain: f64,
    ) -> Self {
        let ultimate = ElasticPlastic::new(elastic_modulus, yield_strength);
        let service = ultimate.with_fracture_strain(fracture_strain);
        Material::new(name, service, ultimate).with_density(7.85e-6)
    }

    /// Set the density
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Set the flexural tensile strength
    pub fn with_flexural_tensile_strength(mut self, strength: f64) -> Self {
        self.flexural_tensile_strength = Some(strength);
        self
    }

    /// Set the initial prestress (tension positive)
    pub fn with_initial_prestress(mut self, stress: f64) -> Self {
        self.initial_prestress = Some(stress);
        self
    }

    /// The law used for a regime
    pub fn law(&self, regime: Regime) -> &StressStrainLaw {
        match regime {
            Regime::Service => &self.service_law,
            Regime::Ultimate => &self.ultimate_law,
        }
    }

    /// Stress and tangent at a strain.
    ///
    /// Strains outside the law's domain return
    /// [`CalcError::MaterialLimitExceeded`] naming this material.
    pub fn stress(&self, strain: f64, regime: Regime) -> CalcResult<StressState> {
        self.law(regime)
            .evaluate(strain)
            .map_err(|e| e.into_error(&self.name))
    }

    /// Strain at which the law for a regime jumps in stress, if any
    pub fn stress_jump(&self, regime: Regime) -> Option<f64> {
        self.law(regime).stress_jump()
    }

    /// Initial tangent of the service law
    pub fn initial_modulus(&self) -> f64 {
        self.service_law.initial_modulus()
    }

    /// Yield strain of the service law, falling back to the ultimate law
    pub fn yield_strain(&self) -> Option<f64> {
        self.service_law
            .yield_strain()
            .or_else(|| self.ultimate_law.yield_strain())
    }

    /// Tensile strain (negative) at which this material first cracks
    pub fn cracking_strain(&self) -> Option<f64> {
        let modulus = self.initial_modulus();
        match self.flexural_tensile_strength {
            Some(ft) if modulus > 0.0 => Some(-ft / modulus),
            _ => None,
        }
    }

    /// Crushing strain of the ultimate law
    pub fn ultimate_strain(&self) -> Option<f64> {
        self.ultimate_law.compressive_limit()
    }

    /// Check both laws and the scalar properties
    pub fn validate(&self) -> CalcResult<()> {
        if self.name.trim().is_empty() {
            return Err(CalcError::missing_field("material.name"));
        }
        if !(self.density >= 0.0) || !self.density.is_finite() {
            return Err(CalcError::invalid_input(
                format!("{}.density", self.name),
                self.density.to_string(),
                "Density must be non-negative",
            ));
        }
        self.service_law.validate()?;
        self.ultimate_law.validate()?;
        if let Some(ft) = self.flexural_tensile_strength {
            if !(ft >= 0.0) || !ft.is_finite() {
                return Err(CalcError::invalid_input(
                    format!("{}.flexural_tensile_strength", self.name),
                    ft.to_string(),
                    "Must be non-negative",
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} / {})",
            self.name,
            self.service_law.kind(),
            self.ultimate_law.kind()
        )
    }
}

// Convenience conversions
impl From<ConcreteLinear> for StressStrainLaw {
    fn from(law: ConcreteLinear) -> Self {
        StressStrainLaw::ConcreteLinear(law)
    }
}

impl From<BilinearConcrete> for StressStrainLaw {
    fn from(law: BilinearConcrete) -> Self {
        StressStrainLaw::Bilinear(law)
    }
}

impl From<RectangularStressBlock> for StressStrainLaw {
    fn from(law: RectangularStressBlock) -> Self {
        StressStrainLaw::RectangularStressBlock(law)
    }
}

impl From<ParabolicRectangular> for StressStrainLaw {
    fn from(law: ParabolicRectangular) -> Self {
        StressStrainLaw::ParabolicRectangular(law)
    }
}

impl From<EurocodeNonLinear> for StressStrainLaw {
    fn from(law: EurocodeNonLinear) -> Self {
        StressStrainLaw::EurocodeNonLinear(law)
    }
}

impl From<Mander> for StressStrainLaw {
    fn from(law: Mander) -> Self {
        StressStrainLaw::Mander(law)
    }
}

impl From<ElasticPlastic> for StressStrainLaw {
    fn from(law: ElasticPlastic) -> Self {
        StressStrainLaw::ElasticPlastic(law)
    }
}

impl From<SteelHardening> for StressStrainLaw {
    fn from(law: SteelHardening) -> Self {
        StressStrainLaw::SteelHardening(law)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StrainSide;

    #[test]
    fn test_concrete_preset() {
        let concrete = Material::concrete("Concrete 40", 40.0);
        concrete.validate().unwrap();

        let ec = 3320.0 * 40f64.sqrt() + 6900.0;
        assert!((concrete.initial_modulus() - ec).abs() < 1e-9);
        assert_eq!(concrete.ultimate_strain(), Some(0.003));
        assert_eq!(concrete.density, 2.4e-6);

        let crack = concrete.cracking_strain().unwrap();
        assert!((crack + 0.6 * 40f64.sqrt() / ec).abs() < 1e-15);
        assert!(concrete.yield_strain().is_none());
    }

    #[test]
    fn test_concrete_preset_regimes() {
        let concrete = Material::concrete("Concrete 32", 32.0);
        // Service law is linear, ultimate law is the block
        let service = concrete.stress(1e-4, Regime::Service).unwrap();
        assert!(service.stress > 0.0 && service.tangent > 0.0);
        assert_eq!(concrete.stress(1e-4, Regime::Ultimate).unwrap(), StressState::zero());
    }

    #[test]
    fn test_limit_error_names_material() {
        let concrete = Material::concrete("Concrete 40", 40.0);
        let err = concrete.stress(0.0035, Regime::Ultimate).unwrap_err();
        match err {
            CalcError::MaterialLimitExceeded { material, side, .. } => {
                assert_eq!(material, "Concrete 40");
                assert_eq!(side, StrainSide::Compression);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_steel_preset() {
        let steel = Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05);
        steel.validate().unwrap();
        assert_eq!(steel.yield_strain(), Some(0.0025));
        assert!(steel.stress(-0.06, Regime::Service).is_err());
        // Ultimate law never fractures
        let s = steel.stress(-0.06, Regime::Ultimate).unwrap();
        assert_eq!(s.stress, -500.0);
    }

    #[test]
    fn test_material_serialization() {
        let steel = Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05);
        let json = serde_json::to_string(&steel).unwrap();
        assert!(json.contains("\"type\":\"ElasticPlastic\""));
        let parsed: Material = serde_json::from_str(&json).unwrap();
        assert_eq!(steel, parsed);
    }

    #[test]
    fn test_material_deserializes_with_defaults() {
        let json = r#"{
            "name": "Elastic",
            "service_law": { "type": "LinearElastic", "elastic_modulus": 30000.0 },
            "ultimate_law": { "type": "LinearElastic", "elastic_modulus": 30000.0 }
        }"#;
        let mat: Material = serde_json::from_str(json).unwrap();
        assert_eq!(mat.density, 0.0);
        assert!(mat.flexural_tensile_strength.is_none());
        assert!(mat.initial_prestress.is_none());
    }

    #[test]
    fn test_validation_rejects_blank_name() {
        let mat = Material::linear("  ", 30_000.0);
        assert!(matches!(mat.validate(), Err(CalcError::MissingField { .. })));
    }

    #[test]
    fn test_display() {
        let steel = Material::reinforcing_steel("Grade 500", 500.0, 200_000.0, 0.05);
        assert_eq!(steel.to_string(), "Grade 500 (Elastic-Plastic / Elastic-Plastic)");
    }
}
