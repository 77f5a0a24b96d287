//! Stress-strain law abstraction
//!
//! Every constitutive law implements [`StressStrain`]: given a strain it
//! returns the stress and tangent modulus, or a [`LimitExceeded`] when the
//! strain is outside the law's valid domain (crushing or fracture). Laws
//! never extrapolate past their limits.
//!
//! [`StressStrainLaw`] is the tagged union stored on a
//! [`Material`](super::Material); it dispatches to the concrete, steel and
//! generic laws defined in this module and its siblings.
//!
//! ## Sign Convention
//! - Compressive strain and stress are positive
//! - Limits are stored as magnitudes
//!
//! ## JSON Serialization
//!
//! ```json
//! { "type": "LinearElastic", "elastic_modulus": 200000.0 }
//! { "type": "ElasticPlastic", "elastic_modulus": 200000.0, "yield_strength": 500.0, "fracture_strain": 0.05 }
//! { "type": "Piecewise", "strains": [-0.001, 0.0, 0.002], "stresses": [0.0, 0.0, 30.0] }
//! ```

use serde::{Deserialize, Serialize};

use super::concrete::{
    BilinearConcrete, ConcreteLinear, EurocodeNonLinear, Mander, ParabolicRectangular,
    RectangularStressBlock,
};
use super::steel::{ElasticPlastic, SteelHardening};
use crate::errors::{CalcError, CalcResult, StrainSide};

/// Relative slack applied to limit checks so a fibre sitting exactly on its
/// limit (up to rounding) is accepted.
pub const LIMIT_TOLERANCE: f64 = 1e-9;

/// Stress and tangent modulus at a strain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressState {
    /// Stress (compression positive)
    pub stress: f64,
    /// Tangent modulus dσ/dε
    pub tangent: f64,
}

impl StressState {
    /// Create a stress state
    pub fn new(stress: f64, tangent: f64) -> Self {
        StressState { stress, tangent }
    }

    /// Zero stress, zero stiffness (cracked, spalled, below a stress block)
    pub fn zero() -> Self {
        StressState {
            stress: 0.0,
            tangent: 0.0,
        }
    }
}

/// A strain outside a law's valid domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitExceeded {
    /// The offending strain
    pub strain: f64,
    /// Magnitude of the limit that was passed
    pub limit: f64,
    /// Which side of the domain was left
    pub side: StrainSide,
}

impl LimitExceeded {
    /// Attach the material name and convert to a [`CalcError`]
    pub fn into_error(self, material: &str) -> CalcError {
        CalcError::MaterialLimitExceeded {
            material: material.to_string(),
            strain: self.strain,
            limit: self.limit,
            side: self.side,
        }
    }
}

/// Optional crushing/fracture limits for laws that have none built in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StrainLimits {
    /// Crushing strain (magnitude), `None` = unlimited
    #[serde(default)]
    pub compression: Option<f64>,
    /// Fracture strain (magnitude), `None` = unlimited
    #[serde(default)]
    pub tension: Option<f64>,
}

impl StrainLimits {
    /// No limits on either side
    pub fn none() -> Self {
        StrainLimits::default()
    }

    /// Limit compression only
    pub fn compression(limit: f64) -> Self {
        StrainLimits {
            compression: Some(limit),
            tension: None,
        }
    }

    /// Limit tension only
    pub fn tension(limit: f64) -> Self {
        StrainLimits {
            compression: None,
            tension: Some(limit),
        }
    }

    /// Same limit on both sides
    pub fn symmetric(limit: f64) -> Self {
        StrainLimits {
            compression: Some(limit),
            tension: Some(limit),
        }
    }

    fn validate(&self, field: &str) -> CalcResult<()> {
        for (side, value) in [("compression", self.compression), ("tension", self.tension)] {
            if let Some(limit) = value {
                if !(limit > 0.0) || !limit.is_finite() {
                    return Err(CalcError::invalid_input(
                        format!("{}.limits.{}", field, side),
                        limit.to_string(),
                        "Strain limit must be positive and finite",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Check a strain against optional compressive/tensile limit magnitudes.
pub fn check_limits(
    strain: f64,
    compression: Option<f64>,
    tension: Option<f64>,
) -> Result<(), LimitExceeded> {
    if let Some(limit) = compression {
        if strain > limit * (1.0 + LIMIT_TOLERANCE) {
            return Err(LimitExceeded {
                strain,
                limit,
                side: StrainSide::Compression,
            });
        }
    }
    if let Some(limit) = tension {
        if -strain > limit * (1.0 + LIMIT_TOLERANCE) {
            return Err(LimitExceeded {
                strain,
                limit,
                side: StrainSide::Tension,
            });
        }
    }
    Ok(())
}

/// Require a finite, strictly positive parameter.
pub(crate) fn require_positive(field: &str, value: f64) -> CalcResult<()> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(CalcError::invalid_input(
            field,
            value.to_string(),
            "Must be positive and finite",
        ));
    }
    Ok(())
}

/// A uniaxial stress-strain law.
///
/// Implementations are pure functions of strain and hold their own
/// parameters, so they are freely shared between threads.
pub trait StressStrain: Send + Sync {
    /// Stress and tangent modulus at `strain`
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded>;

    /// Crushing strain magnitude, if the law has one
    fn compressive_limit(&self) -> Option<f64>;

    /// Fracture strain magnitude, if the law has one
    fn tensile_limit(&self) -> Option<f64>;

    /// Tangent modulus at zero strain
    fn initial_modulus(&self) -> f64;

    /// Yield strain for laws with a yield point
    fn yield_strain(&self) -> Option<f64> {
        None
    }

    /// Strain at which the stress jumps, for laws that are discontinuous
    fn stress_jump(&self) -> Option<f64> {
        None
    }

    /// Check parameters (positive moduli, increasing strain ordering)
    fn validate(&self) -> CalcResult<()>;
}

/// Linear elastic law `σ = Eε`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearElastic {
    /// Elastic modulus E
    pub elastic_modulus: f64,
    /// Optional crushing/fracture limits
    #[serde(default)]
    pub limits: StrainLimits,
}

impl LinearElastic {
    /// Unlimited linear elastic law
    pub fn new(elastic_modulus: f64) -> Self {
        LinearElastic {
            elastic_modulus,
            limits: StrainLimits::none(),
        }
    }

    /// Add crushing/fracture limits
    pub fn with_limits(mut self, limits: StrainLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl StressStrain for LinearElastic {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, self.limits.compression, self.limits.tension)?;
        Ok(StressState::new(self.elastic_modulus * strain, self.elastic_modulus))
    }

    fn compressive_limit(&self) -> Option<f64> {
        self.limits.compression
    }

    fn tensile_limit(&self) -> Option<f64> {
        self.limits.tension
    }

    fn initial_modulus(&self) -> f64 {
        self.elastic_modulus
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("elastic_modulus", self.elastic_modulus)?;
        self.limits.validate("LinearElastic")
    }
}

/// Linear in compression, no tension capacity (fully cracked concrete)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearNoTension {
    /// Elastic modulus E
    pub elastic_modulus: f64,
    /// Optional crushing limit (a tensile limit is ignored by the stress, but still checked)
    #[serde(default)]
    pub limits: StrainLimits,
}

impl LinearNoTension {
    /// Unlimited no-tension law
    pub fn new(elastic_modulus: f64) -> Self {
        LinearNoTension {
            elastic_modulus,
            limits: StrainLimits::none(),
        }
    }

    /// Add crushing/fracture limits
    pub fn with_limits(mut self, limits: StrainLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl StressStrain for LinearNoTension {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, self.limits.compression, self.limits.tension)?;
        if strain > 0.0 {
            Ok(StressState::new(self.elastic_modulus * strain, self.elastic_modulus))
        } else {
            Ok(StressState::zero())
        }
    }

    fn compressive_limit(&self) -> Option<f64> {
        self.limits.compression
    }

    fn tensile_limit(&self) -> Option<f64> {
        self.limits.tension
    }

    fn initial_modulus(&self) -> f64 {
        self.elastic_modulus
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("elastic_modulus", self.elastic_modulus)?;
        self.limits.validate("LinearNoTension")
    }
}

/// User-defined piecewise-linear curve.
///
/// The domain is `[strains[0], strains[last]]`; strains outside it are
/// reported as limit exceedances rather than extrapolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piecewise {
    /// Strictly increasing strains
    pub strains: Vec<f64>,
    /// Stresses at each strain
    pub stresses: Vec<f64>,
}

impl Piecewise {
    /// Create a piecewise curve (validated on use via [`StressStrain::validate`])
    pub fn new(strains: Vec<f64>, stresses: Vec<f64>) -> Self {
        Piecewise { strains, stresses }
    }

    fn first(&self) -> f64 {
        self.strains.first().copied().unwrap_or(0.0)
    }

    fn last(&self) -> f64 {
        self.strains.last().copied().unwrap_or(0.0)
    }
}

impl StressStrain for Piecewise {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        let (first, last) = (self.first(), self.last());
        let span = (last - first).abs().max(f64::MIN_POSITIVE);
        if strain > last + span * LIMIT_TOLERANCE {
            return Err(LimitExceeded {
                strain,
                limit: last.abs(),
                side: StrainSide::Compression,
            });
        }
        if strain < first - span * LIMIT_TOLERANCE {
            return Err(LimitExceeded {
                strain,
                limit: first.abs(),
                side: StrainSide::Tension,
            });
        }

        let n = self.strains.len();
        if n < 2 {
            return Ok(StressState::new(self.stresses.first().copied().unwrap_or(0.0), 0.0));
        }

        // Segment i spans strains[i]..strains[i + 1]
        let upper = self.strains.partition_point(|&s| s <= strain);
        let i = upper.saturating_sub(1).min(n - 2);
        let (e0, e1) = (self.strains[i], self.strains[i + 1]);
        let (s0, s1) = (self.stresses[i], self.stresses[i + 1]);
        let slope = (s1 - s0) / (e1 - e0);
        Ok(StressState::new(s0 + slope * (strain - e0), slope))
    }

    fn compressive_limit(&self) -> Option<f64> {
        let last = self.last();
        if last > 0.0 {
            Some(last)
        } else {
            None
        }
    }

    fn tensile_limit(&self) -> Option<f64> {
        let first = self.first();
        if first < 0.0 {
            Some(-first)
        } else {
            None
        }
    }

    fn initial_modulus(&self) -> f64 {
        // Tangent at zero strain, or at the nearest end of the domain
        let strain = 0.0f64.max(self.first()).min(self.last());
        self.evaluate(strain).map(|s| s.tangent).unwrap_or(0.0)
    }

    fn validate(&self) -> CalcResult<()> {
        if self.strains.len() < 2 {
            return Err(CalcError::invalid_input(
                "Piecewise.strains",
                self.strains.len().to_string(),
                "At least two points are required",
            ));
        }
        if self.strains.len() != self.stresses.len() {
            return Err(CalcError::invalid_input(
                "Piecewise.stresses",
                self.stresses.len().to_string(),
                format!("Expected {} stresses to match the strains", self.strains.len()),
            ));
        }
        if self.strains.iter().chain(&self.stresses).any(|v| !v.is_finite()) {
            return Err(CalcError::invalid_input(
                "Piecewise",
                "non-finite",
                "Strains and stresses must be finite",
            ));
        }
        if self.strains.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CalcError::invalid_input(
                "Piecewise.strains",
                format!("{:?}", self.strains),
                "Strains must be strictly increasing",
            ));
        }
        Ok(())
    }
}

/// Tagged union of every supported stress-strain law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StressStrainLaw {
    /// Linear elastic, optional limits
    LinearElastic(LinearElastic),
    /// Linear in compression, zero in tension
    LinearNoTension(LinearNoTension),
    /// Linear with a tensile cut-off at the cracking stress
    ConcreteLinear(ConcreteLinear),
    /// Symmetric elastic-perfectly-plastic steel
    ElasticPlastic(ElasticPlastic),
    /// Elastic, then linear strain hardening to fracture
    SteelHardening(SteelHardening),
    /// Linear to peak then plateau to crushing (no tension)
    Bilinear(BilinearConcrete),
    /// Equivalent rectangular stress block (ultimate)
    RectangularStressBlock(RectangularStressBlock),
    /// EC2 parabola-rectangle (ultimate)
    ParabolicRectangular(ParabolicRectangular),
    /// EC2 nonlinear curve for structural analysis
    EurocodeNonLinear(EurocodeNonLinear),
    /// Mander confined/unconfined concrete
    Mander(Mander),
    /// User-defined curve
    Piecewise(Piecewise),
}

impl StressStrainLaw {
    fn inner(&self) -> &dyn StressStrain {
        match self {
            StressStrainLaw::LinearElastic(law) => law,
            StressStrainLaw::LinearNoTension(law) => law,
            StressStrainLaw::ConcreteLinear(law) => law,
            StressStrainLaw::ElasticPlastic(law) => law,
            StressStrainLaw::SteelHardening(law) => law,
            StressStrainLaw::Bilinear(law) => law,
            StressStrainLaw::RectangularStressBlock(law) => law,
            StressStrainLaw::ParabolicRectangular(law) => law,
            StressStrainLaw::EurocodeNonLinear(law) => law,
            StressStrainLaw::Mander(law) => law,
            StressStrainLaw::Piecewise(law) => law,
        }
    }

    /// Law name for display
    pub fn kind(&self) -> &'static str {
        match self {
            StressStrainLaw::LinearElastic(_) => "Linear Elastic",
            StressStrainLaw::LinearNoTension(_) => "Linear No-Tension",
            StressStrainLaw::ConcreteLinear(_) => "Concrete Linear",
            StressStrainLaw::ElasticPlastic(_) => "Elastic-Plastic",
            StressStrainLaw::SteelHardening(_) => "Steel Hardening",
            StressStrainLaw::Bilinear(_) => "Bilinear",
            StressStrainLaw::RectangularStressBlock(_) => "Rectangular Stress Block",
            StressStrainLaw::ParabolicRectangular(_) => "Parabolic-Rectangular",
            StressStrainLaw::EurocodeNonLinear(_) => "Eurocode Non-Linear",
            StressStrainLaw::Mander(_) => "Mander",
            StressStrainLaw::Piecewise(_) => "Piecewise",
        }
    }
}

impl StressStrain for StressStrainLaw {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        self.inner().evaluate(strain)
    }

    fn compressive_limit(&self) -> Option<f64> {
        self.inner().compressive_limit()
    }

    fn tensile_limit(&self) -> Option<f64> {
        self.inner().tensile_limit()
    }

    fn initial_modulus(&self) -> f64 {
        self.inner().initial_modulus()
    }

    fn yield_strain(&self) -> Option<f64> {
        self.inner().yield_strain()
    }

    fn stress_jump(&self) -> Option<f64> {
        self.inner().stress_jump()
    }

    fn validate(&self) -> CalcResult<()> {
        self.inner().validate()
    }
}

impl From<LinearElastic> for StressStrainLaw {
    fn from(law: LinearElastic) -> Self {
        StressStrainLaw::LinearElastic(law)
    }
}

impl From<LinearNoTension> for StressStrainLaw {
    fn from(law: LinearNoTension) -> Self {
        StressStrainLaw::LinearNoTension(law)
    }
}

impl From<Piecewise> for StressStrainLaw {
    fn from(law: Piecewise) -> Self {
        StressStrainLaw::Piecewise(law)
    }
}
