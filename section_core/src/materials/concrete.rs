//! Concrete stress-strain laws
//!
//! Service laws (`ConcreteLinear`, `EurocodeNonLinear`, `Mander`) and
//! ultimate laws (`Bilinear`, `RectangularStressBlock`,
//! `ParabolicRectangular`). All laws take compression as positive and, apart
//! from the optional tension branches, carry no tensile stress.
//!
//! Units are whatever the caller uses consistently; the presets in
//! [`Material`](super::Material) assume MPa and mm.

use serde::{Deserialize, Serialize};

use super::profile::{check_limits, require_positive, LimitExceeded, StrainLimits, StressState, StressStrain};
use crate::errors::{CalcError, CalcResult};

/// Linear elastic concrete with a tensile cut-off.
///
/// Below the cracking strain `-f_t/E` the stress drops to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcreteLinear {
    /// Elastic modulus E
    pub elastic_modulus: f64,
    /// Tensile (cracking) strength f_t, magnitude
    pub tensile_strength: f64,
    /// Optional crushing/fracture limits
    #[serde(default)]
    pub limits: StrainLimits,
}

impl ConcreteLinear {
    /// Create a linear concrete law without strain limits
    pub fn new(elastic_modulus: f64, tensile_strength: f64) -> Self {
        ConcreteLinear {
            elastic_modulus,
            tensile_strength,
            limits: StrainLimits::none(),
        }
    }

    /// Add crushing/fracture limits
    pub fn with_limits(mut self, limits: StrainLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Strain at which the section cracks (negative)
    pub fn cracking_strain(&self) -> f64 {
        -self.tensile_strength / self.elastic_modulus
    }
}

impl StressStrain for ConcreteLinear {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, self.limits.compression, self.limits.tension)?;
        if strain < self.cracking_strain() {
            return Ok(StressState::zero());
        }
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

    fn stress_jump(&self) -> Option<f64> {
        (self.tensile_strength > 0.0).then(|| self.cracking_strain())
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("ConcreteLinear.elastic_modulus", self.elastic_modulus)?;
        if !(self.tensile_strength >= 0.0) || !self.tensile_strength.is_finite() {
            return Err(CalcError::invalid_input(
                "ConcreteLinear.tensile_strength",
                self.tensile_strength.to_string(),
                "Tensile strength must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Linear to the peak, then a plateau to crushing. No tension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BilinearConcrete {
    /// Peak stress f_c
    pub compressive_strength: f64,
    /// Strain at the end of the linear branch
    pub compressive_strain: f64,
    /// Crushing strain
    pub ultimate_strain: f64,
}

impl StressStrain for BilinearConcrete {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, Some(self.ultimate_strain), None)?;
        if strain <= 0.0 {
            Ok(StressState::zero())
        } else if strain < self.compressive_strain {
            let modulus = self.initial_modulus();
            Ok(StressState::new(modulus * strain, modulus))
        } else {
            Ok(StressState::new(self.compressive_strength, 0.0))
        }
    }

    fn compressive_limit(&self) -> Option<f64> {
        Some(self.ultimate_strain)
    }

    fn tensile_limit(&self) -> Option<f64> {
        None
    }

    fn initial_modulus(&self) -> f64 {
        self.compressive_strength / self.compressive_strain
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("Bilinear.compressive_strength", self.compressive_strength)?;
        require_positive("Bilinear.compressive_strain", self.compressive_strain)?;
        if !(self.ultimate_strain >= self.compressive_strain) {
            return Err(CalcError::invalid_input(
                "Bilinear.ultimate_strain",
                self.ultimate_strain.to_string(),
                "Ultimate strain must not be less than the peak strain",
            ));
        }
        Ok(())
    }
}

/// Equivalent rectangular stress block.
///
/// Carries `alpha * f'c` over the top `gamma` fraction of the compressed
/// depth, i.e. for strains `>= ultimate_strain * (1 - gamma)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangularStressBlock {
    /// Characteristic strength f'c
    pub compressive_strength: f64,
    /// Stress intensity factor
    pub alpha: f64,
    /// Block depth factor
    pub gamma: f64,
    /// Crushing strain
    pub ultimate_strain: f64,
}

impl RectangularStressBlock {
    /// AS3600-2018 block for a given f'c (MPa), with `ultimate_strain = 0.003`
    pub fn as3600(compressive_strength: f64) -> Self {
        RectangularStressBlock {
            compressive_strength,
            alpha: (0.85 - 0.0015 * compressive_strength).max(0.67),
            gamma: (0.97 - 0.0025 * compressive_strength).max(0.67),
            ultimate_strain: 0.003,
        }
    }

    fn onset_strain(&self) -> f64 {
        self.ultimate_strain * (1.0 - self.gamma)
    }
}

impl StressStrain for RectangularStressBlock {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, Some(self.ultimate_strain), None)?;
        if strain >= self.onset_strain() && strain > 0.0 {
            Ok(StressState::new(self.alpha * self.compressive_strength, 0.0))
        } else {
            Ok(StressState::zero())
        }
    }

    fn compressive_limit(&self) -> Option<f64> {
        Some(self.ultimate_strain)
    }

    fn tensile_limit(&self) -> Option<f64> {
        None
    }

    fn initial_modulus(&self) -> f64 {
        0.0
    }

    fn stress_jump(&self) -> Option<f64> {
        Some(self.onset_strain().max(0.0))
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("RectangularStressBlock.compressive_strength", self.compressive_strength)?;
        require_positive("RectangularStressBlock.ultimate_strain", self.ultimate_strain)?;
        for (field, value) in [("alpha", self.alpha), ("gamma", self.gamma)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CalcError::invalid_input(
                    format!("RectangularStressBlock.{}", field),
                    value.to_string(),
                    "Must be in (0, 1]",
                ));
            }
        }
        Ok(())
    }
}

/// EC2 parabola-rectangle: `σ = f_c [1 - (1 - ε/ε_c2)^n]` up to `ε_c2`,
/// constant to `ε_cu2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParabolicRectangular {
    /// Design strength f_cd
    pub compressive_strength: f64,
    /// ε_c2, end of the parabola
    pub peak_strain: f64,
    /// ε_cu2, crushing strain
    pub ultimate_strain: f64,
    /// Parabola exponent n
    pub exponent: f64,
}

impl ParabolicRectangular {
    /// EC2 Table 3.1 parameters for f_ck ≤ 50 MPa
    pub fn eurocode(compressive_strength: f64) -> Self {
        ParabolicRectangular {
            compressive_strength,
            peak_strain: 0.002,
            ultimate_strain: 0.0035,
            exponent: 2.0,
        }
    }
}

impl StressStrain for ParabolicRectangular {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, Some(self.ultimate_strain), None)?;
        if strain <= 0.0 {
            return Ok(StressState::zero());
        }
        if strain >= self.peak_strain {
            return Ok(StressState::new(self.compressive_strength, 0.0));
        }
        let remaining = 1.0 - strain / self.peak_strain;
        let n = self.exponent;
        let stress = self.compressive_strength * (1.0 - remaining.powf(n));
        let tangent = self.compressive_strength * n * remaining.powf(n - 1.0) / self.peak_strain;
        Ok(StressState::new(stress, tangent))
    }

    fn compressive_limit(&self) -> Option<f64> {
        Some(self.ultimate_strain)
    }

    fn tensile_limit(&self) -> Option<f64> {
        None
    }

    fn initial_modulus(&self) -> f64 {
        self.compressive_strength * self.exponent / self.peak_strain
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("ParabolicRectangular.compressive_strength", self.compressive_strength)?;
        require_positive("ParabolicRectangular.peak_strain", self.peak_strain)?;
        require_positive("ParabolicRectangular.exponent", self.exponent)?;
        if !(self.ultimate_strain >= self.peak_strain) {
            return Err(CalcError::invalid_input(
                "ParabolicRectangular.ultimate_strain",
                self.ultimate_strain.to_string(),
                "Ultimate strain must not be less than the peak strain",
            ));
        }
        Ok(())
    }
}

/// EC2 3.1.5 nonlinear curve (Sargin form) for structural analysis.
///
/// `η = ε/ε_c1`, `k = 1.05 E_cm ε_c1 / f_cm`,
/// `σ = f_cm (kη - η²) / (1 + (k - 2)η)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EurocodeNonLinear {
    /// Secant modulus E_cm
    pub elastic_modulus: f64,
    /// Mean compressive strength f_cm
    pub mean_strength: f64,
    /// Strain at peak stress ε_c1
    pub peak_strain: f64,
    /// Crushing strain ε_cu1
    pub ultimate_strain: f64,
    /// Linear tension branch up to this stress, then zero
    #[serde(default)]
    pub tensile_strength: Option<f64>,
}

impl EurocodeNonLinear {
    fn k(&self) -> f64 {
        1.05 * self.elastic_modulus * self.peak_strain / self.mean_strength
    }
}

impl StressStrain for EurocodeNonLinear {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, Some(self.ultimate_strain), None)?;
        if strain < 0.0 {
            let modulus = self.initial_modulus();
            return Ok(match self.tensile_strength {
                Some(ft) if strain >= -ft / modulus => StressState::new(modulus * strain, modulus),
                _ => StressState::zero(),
            });
        }

        let k = self.k();
        let eta = strain / self.peak_strain;
        let num = k * eta - eta * eta;
        let den = 1.0 + (k - 2.0) * eta;
        let stress = self.mean_strength * num / den;
        let d_eta = self.mean_strength * ((k - 2.0 * eta) * den - num * (k - 2.0)) / (den * den);
        Ok(StressState::new(stress, d_eta / self.peak_strain))
    }

    fn compressive_limit(&self) -> Option<f64> {
        Some(self.ultimate_strain)
    }

    fn tensile_limit(&self) -> Option<f64> {
        None
    }

    fn initial_modulus(&self) -> f64 {
        self.k() * self.mean_strength / self.peak_strain
    }

    fn stress_jump(&self) -> Option<f64> {
        self.tensile_strength
            .filter(|ft| *ft > 0.0)
            .map(|ft| -ft / self.initial_modulus())
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("EurocodeNonLinear.elastic_modulus", self.elastic_modulus)?;
        require_positive("EurocodeNonLinear.mean_strength", self.mean_strength)?;
        require_positive("EurocodeNonLinear.peak_strain", self.peak_strain)?;
        if !(self.ultimate_strain >= self.peak_strain) {
            return Err(CalcError::invalid_input(
                "EurocodeNonLinear.ultimate_strain",
                self.ultimate_strain.to_string(),
                "Ultimate strain must not be less than the peak strain",
            ));
        }
        if let Some(ft) = self.tensile_strength {
            require_positive("EurocodeNonLinear.tensile_strength", ft)?;
        }
        Ok(())
    }
}

/// Confinement state for [`Mander`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "regime")]
pub enum ManderRegime {
    /// Cover concrete: linear descent from `2ε_co` to zero at the spalling strain
    Unconfined { spalling_strain: f64 },
    /// Core concrete with confined strength f'cc
    Confined {
        confined_strength: f64,
        ultimate_strain: f64,
    },
}

/// Mander, Priestley & Park (1988) concrete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mander {
    /// Tangent modulus E_c
    pub elastic_modulus: f64,
    /// Unconfined strength f'co
    pub unconfined_strength: f64,
    /// Strain at unconfined peak ε_co
    pub unconfined_strain: f64,
    /// Confined or unconfined
    pub regime: ManderRegime,
    /// Linear tension branch up to this stress, then zero
    #[serde(default)]
    pub tensile_strength: Option<f64>,
}

impl Mander {
    /// Confined law with f'cc from the effective lateral confining pressure
    /// `f_l`: `f'cc = f'co (-1.254 + 2.254 √(1 + 7.94 f_l/f'co) - 2 f_l/f'co)`.
    pub fn confined_from_pressure(
        elastic_modulus: f64,
        unconfined_strength: f64,
        unconfined_strain: f64,
        lateral_pressure: f64,
        ultimate_strain: f64,
    ) -> Self {
        let ratio = lateral_pressure / unconfined_strength;
        let confined_strength = unconfined_strength
            * (-1.254 + 2.254 * (1.0 + 7.94 * ratio).sqrt() - 2.0 * ratio);
        Mander {
            elastic_modulus,
            unconfined_strength,
            unconfined_strain,
            regime: ManderRegime::Confined {
                confined_strength,
                ultimate_strain,
            },
            tensile_strength: None,
        }
    }

    /// Peak stress f'cc (f'co when unconfined)
    pub fn peak_stress(&self) -> f64 {
        match self.regime {
            ManderRegime::Unconfined { .. } => self.unconfined_strength,
            ManderRegime::Confined { confined_strength, .. } => confined_strength,
        }
    }

    /// Strain at peak stress ε_cc
    pub fn peak_strain(&self) -> f64 {
        let ratio = self.peak_stress() / self.unconfined_strength;
        self.unconfined_strain * (1.0 + 5.0 * (ratio - 1.0))
    }

    fn r(&self) -> f64 {
        let secant = self.peak_stress() / self.peak_strain();
        self.elastic_modulus / (self.elastic_modulus - secant)
    }

    fn curve(&self, strain: f64) -> StressState {
        let fcc = self.peak_stress();
        let ecc = self.peak_strain();
        let r = self.r();
        let x = strain / ecc;
        let xr = x.powf(r);
        let den = r - 1.0 + xr;
        let stress = fcc * x * r / den;
        let tangent = fcc / ecc * r * (r - 1.0) * (1.0 - xr) / (den * den);
        StressState::new(stress, tangent)
    }
}

impl StressStrain for Mander {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, self.compressive_limit(), None)?;
        if strain < 0.0 {
            let modulus = self.elastic_modulus;
            return Ok(match self.tensile_strength {
                Some(ft) if strain >= -ft / modulus => StressState::new(modulus * strain, modulus),
                _ => StressState::zero(),
            });
        }
        if strain == 0.0 {
            return Ok(StressState::new(0.0, self.elastic_modulus));
        }

        match self.regime {
            ManderRegime::Confined { .. } => Ok(self.curve(strain)),
            ManderRegime::Unconfined { spalling_strain } => {
                let knee = 2.0 * self.unconfined_strain;
                if strain <= knee || spalling_strain <= knee {
                    return Ok(self.curve(strain));
                }
                let at_knee = self.curve(knee).stress;
                let slope = -at_knee / (spalling_strain - knee);
                Ok(StressState::new(at_knee + slope * (strain - knee), slope))
            }
        }
    }

    fn compressive_limit(&self) -> Option<f64> {
        match self.regime {
            ManderRegime::Unconfined { spalling_strain } => Some(spalling_strain),
            ManderRegime::Confined { ultimate_strain, .. } => Some(ultimate_strain),
        }
    }

    fn tensile_limit(&self) -> Option<f64> {
        None
    }

    fn initial_modulus(&self) -> f64 {
        self.elastic_modulus
    }

    fn stress_jump(&self) -> Option<f64> {
        self.tensile_strength
            .filter(|ft| *ft > 0.0)
            .map(|ft| -ft / self.elastic_modulus)
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("Mander.elastic_modulus", self.elastic_modulus)?;
        require_positive("Mander.unconfined_strength", self.unconfined_strength)?;
        require_positive("Mander.unconfined_strain", self.unconfined_strain)?;
        match self.regime {
            ManderRegime::Unconfined { spalling_strain } => {
                require_positive("Mander.spalling_strain", spalling_strain)?;
            }
            ManderRegime::Confined {
                confined_strength,
                ultimate_strain,
            } => {
                require_positive("Mander.ultimate_strain", ultimate_strain)?;
                if !(confined_strength >= self.unconfined_strength) {
                    return Err(CalcError::invalid_input(
                        "Mander.confined_strength",
                        confined_strength.to_string(),
                        "Confined strength must not be less than the unconfined strength",
                    ));
                }
            }
        }
        let secant = self.peak_stress() / self.peak_strain();
        if !(self.elastic_modulus > secant) {
            return Err(CalcError::invalid_input(
                "Mander.elastic_modulus",
                self.elastic_modulus.to_string(),
                format!("Must exceed the secant modulus at peak ({:.1})", secant),
            ));
        }
        if let Some(ft) = self.tensile_strength {
            require_positive("Mander.tensile_strength", ft)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StrainSide;
    use approx::assert_relative_eq;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_concrete_linear_cracks() {
        let law = ConcreteLinear::new(30_000.0, 3.0);
        assert_eq!(law.cracking_strain(), -1e-4);
        assert!(approx_eq(law.evaluate(-0.5e-4).unwrap().stress, -1.5, 1e-12));
        assert_eq!(law.evaluate(-2e-4).unwrap(), StressState::zero());
        assert!(approx_eq(law.evaluate(0.001).unwrap().stress, 30.0, 1e-12));
    }

    #[test]
    fn test_stress_jumps() {
        let cracking = ConcreteLinear::new(30_000.0, 3.0);
        assert_eq!(cracking.stress_jump(), Some(-1e-4));
        assert_eq!(ConcreteLinear::new(30_000.0, 0.0).stress_jump(), None);

        let block = RectangularStressBlock::as3600(40.0);
        let onset = block.stress_jump().unwrap();
        assert!(approx_eq(onset, 0.003 * (1.0 - block.gamma), 1e-15));
        assert_eq!(block.evaluate(onset).unwrap().stress, block.alpha * 40.0);

        assert_eq!(ParabolicRectangular::eurocode(20.0).stress_jump(), None);
    }

    #[test]
    fn test_bilinear() {
        let law = BilinearConcrete {
            compressive_strength: 32.0,
            compressive_strain: 0.002,
            ultimate_strain: 0.0035,
        };
        law.validate().unwrap();
        assert!(approx_eq(law.evaluate(0.001).unwrap().stress, 16.0, 1e-12));
        assert_eq!(law.evaluate(0.003).unwrap(), StressState::new(32.0, 0.0));
        assert_eq!(law.evaluate(-0.001).unwrap(), StressState::zero());
        assert!(law.evaluate(0.004).is_err());
    }

    #[test]
    fn test_rectangular_block_as3600_factors() {
        let block = RectangularStressBlock::as3600(40.0);
        assert!(approx_eq(block.alpha, 0.79, 1e-12));
        assert!(approx_eq(block.gamma, 0.87, 1e-12));

        // Clamped at 0.67 for very high strengths
        let high = RectangularStressBlock::as3600(120.0);
        assert_eq!(high.alpha, 0.67);
        assert_eq!(high.gamma, 0.67);
    }

    #[test]
    fn test_rectangular_block_stress() {
        let block = RectangularStressBlock::as3600(40.0);
        let onset = 0.003 * (1.0 - 0.87);
        assert_eq!(block.evaluate(onset * 0.99).unwrap(), StressState::zero());
        assert!(approx_eq(block.evaluate(onset * 1.01).unwrap().stress, 0.79 * 40.0, 1e-12));
        assert!(approx_eq(block.evaluate(0.003).unwrap().stress, 0.79 * 40.0, 1e-12));

        let err = block.evaluate(0.0031).unwrap_err();
        assert_eq!(err.side, StrainSide::Compression);
        assert_eq!(err.limit, 0.003);
    }

    #[test]
    fn test_parabolic_rectangular() {
        let law = ParabolicRectangular::eurocode(20.0);
        // Half-way up the parabola: 1 - 0.5² = 0.75
        let half = law.evaluate(0.001).unwrap();
        assert!(approx_eq(half.stress, 15.0, 1e-12));
        assert!(approx_eq(half.tangent, 20.0 * 2.0 * 0.5 / 0.002, 1e-9));
        assert_eq!(law.evaluate(0.003).unwrap(), StressState::new(20.0, 0.0));
        assert!(law.evaluate(0.0036).is_err());
    }

    #[test]
    fn test_eurocode_nonlinear_peak() {
        let law = EurocodeNonLinear {
            elastic_modulus: 33_000.0,
            mean_strength: 38.0,
            peak_strain: 0.0022,
            ultimate_strain: 0.0035,
            tensile_strength: Some(2.9),
        };
        law.validate().unwrap();

        let peak = law.evaluate(0.0022).unwrap();
        assert_relative_eq!(peak.stress, 38.0, max_relative = 1e-12);
        assert!(peak.tangent.abs() < 1e-6);

        let k = 1.05 * 33_000.0 * 0.0022 / 38.0;
        assert_relative_eq!(law.initial_modulus(), k * 38.0 / 0.0022, max_relative = 1e-12);

        // Linear tension until cracking
        let modulus = law.initial_modulus();
        let pre = law.evaluate(-1.0 / modulus).unwrap();
        assert_relative_eq!(pre.stress, -1.0, max_relative = 1e-12);
        assert_eq!(law.evaluate(-3.0 / modulus).unwrap(), StressState::zero());
    }

    #[test]
    fn test_eurocode_tangent_matches_finite_difference() {
        let law = EurocodeNonLinear {
            elastic_modulus: 33_000.0,
            mean_strength: 38.0,
            peak_strain: 0.0022,
            ultimate_strain: 0.0035,
            tensile_strength: None,
        };
        let h = 1e-8;
        for strain in [0.0005, 0.0015, 0.003] {
            let fd = (law.evaluate(strain + h).unwrap().stress - law.evaluate(strain - h).unwrap().stress) / (2.0 * h);
            assert_relative_eq!(law.evaluate(strain).unwrap().tangent, fd, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_mander_unconfined() {
        let law = Mander {
            elastic_modulus: 30_000.0,
            unconfined_strength: 40.0,
            unconfined_strain: 0.002,
            regime: ManderRegime::Unconfined { spalling_strain: 0.006 },
            tensile_strength: None,
        };
        law.validate().unwrap();

        // Peak at ε_co
        assert_relative_eq!(law.evaluate(0.002).unwrap().stress, 40.0, max_relative = 1e-12);
        assert!(law.evaluate(0.002).unwrap().tangent.abs() < 1e-9);

        // Linear descent to zero at the spalling strain
        let knee = law.evaluate(0.004).unwrap().stress;
        let mid = law.evaluate(0.005).unwrap();
        assert_relative_eq!(mid.stress, knee / 2.0, max_relative = 1e-12);
        assert!(law.evaluate(0.006).unwrap().stress.abs() < 1e-9);
        assert!(law.evaluate(0.0061).is_err());
        assert_eq!(law.evaluate(-0.001).unwrap(), StressState::zero());
    }

    #[test]
    fn test_mander_confined_from_pressure() {
        let law = Mander::confined_from_pressure(30_000.0, 40.0, 0.002, 4.0, 0.02);
        // f_l/f'co = 0.1: 40(-1.254 + 2.254√1.794 - 0.2)
        let expected = 40.0 * (-1.254 + 2.254 * 1.794f64.sqrt() - 0.2);
        assert_relative_eq!(law.peak_stress(), expected, max_relative = 1e-12);
        law.validate().unwrap();

        let peak_strain = law.peak_strain();
        assert_relative_eq!(peak_strain, 0.002 * (1.0 + 5.0 * (expected / 40.0 - 1.0)), max_relative = 1e-12);
        assert_relative_eq!(law.evaluate(peak_strain).unwrap().stress, expected, max_relative = 1e-12);
        assert!(law.evaluate(0.02).is_ok());
        assert!(law.evaluate(0.021).is_err());
    }

    #[test]
    fn test_mander_tangent_matches_finite_difference() {
        let law = Mander::confined_from_pressure(30_000.0, 40.0, 0.002, 4.0, 0.02);
        let h = 1e-9;
        for strain in [0.001, 0.004, 0.01] {
            let fd = (law.evaluate(strain + h).unwrap().stress - law.evaluate(strain - h).unwrap().stress) / (2.0 * h);
            assert_relative_eq!(law.evaluate(strain).unwrap().tangent, fd, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_mander_rejects_soft_modulus() {
        let law = Mander {
            elastic_modulus: 15_000.0,
            unconfined_strength: 40.0,
            unconfined_strain: 0.002,
            regime: ManderRegime::Unconfined { spalling_strain: 0.006 },
            tensile_strength: None,
        };
        assert!(law.validate().is_err());
    }
}
