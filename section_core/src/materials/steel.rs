//! Reinforcing and prestressing steel laws
//!
//! Both laws are symmetric in tension and compression.

use serde::{Deserialize, Serialize};

use super::profile::{check_limits, require_positive, LimitExceeded, StressState, StressStrain};
use crate::errors::{CalcError, CalcResult};

/// Elastic-perfectly-plastic steel with an optional fracture strain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticPlastic {
    /// Elastic modulus E_s
    pub elastic_modulus: f64,
    /// Yield strength f_y
    pub yield_strength: f64,
    /// Fracture strain magnitude; `None` = unlimited ductility
    #[serde(default)]
    pub fracture_strain: Option<f64>,
}

impl ElasticPlastic {
    /// Unlimited ductility
    pub fn new(elastic_modulus: f64, yield_strength: f64) -> Self {
        ElasticPlastic {
            elastic_modulus,
            yield_strength,
            fracture_strain: None,
        }
    }

    /// Set a fracture strain (applied on both sides)
    pub fn with_fracture_strain(mut self, fracture_strain: f64) -> Self {
        self.fracture_strain = Some(fracture_strain);
        self
    }
}

impl StressStrain for ElasticPlastic {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, self.fracture_strain, self.fracture_strain)?;
        let yield_strain = self.yield_strength / self.elastic_modulus;
        if strain.abs() <= yield_strain {
            Ok(StressState::new(self.elastic_modulus * strain, self.elastic_modulus))
        } else {
            Ok(StressState::new(self.yield_strength.copysign(strain), 0.0))
        }
    }

    fn compressive_limit(&self) -> Option<f64> {
        self.fracture_strain
    }

    fn tensile_limit(&self) -> Option<f64> {
        self.fracture_strain
    }

    fn initial_modulus(&self) -> f64 {
        self.elastic_modulus
    }

    fn yield_strain(&self) -> Option<f64> {
        Some(self.yield_strength / self.elastic_modulus)
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("ElasticPlastic.elastic_modulus", self.elastic_modulus)?;
        require_positive("ElasticPlastic.yield_strength", self.yield_strength)?;
        if let Some(fracture) = self.fracture_strain {
            let yield_strain = self.yield_strength / self.elastic_modulus;
            if !(fracture > yield_strain) {
                return Err(CalcError::invalid_input(
                    "ElasticPlastic.fracture_strain",
                    fracture.to_string(),
                    format!("Must exceed the yield strain {:.6}", yield_strain),
                ));
            }
        }
        Ok(())
    }
}

/// Elastic to `(ε_y, f_y)`, then linear hardening to `(ε_f, f_u)`.
/// Fractures beyond `ε_f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteelHardening {
    /// Elastic modulus E_s
    pub elastic_modulus: f64,
    /// Yield strength f_y
    pub yield_strength: f64,
    /// Ultimate strength f_u at fracture
    pub ultimate_strength: f64,
    /// Fracture strain magnitude ε_f
    pub fracture_strain: f64,
}

impl SteelHardening {
    fn hardening_modulus(&self) -> f64 {
        let yield_strain = self.yield_strength / self.elastic_modulus;
        (self.ultimate_strength - self.yield_strength) / (self.fracture_strain - yield_strain)
    }
}

impl StressStrain for SteelHardening {
    fn evaluate(&self, strain: f64) -> Result<StressState, LimitExceeded> {
        check_limits(strain, Some(self.fracture_strain), Some(self.fracture_strain))?;
        let yield_strain = self.yield_strength / self.elastic_modulus;
        let magnitude = strain.abs();
        if magnitude <= yield_strain {
            return Ok(StressState::new(self.elastic_modulus * strain, self.elastic_modulus));
        }
        let hardening = self.hardening_modulus();
        let stress = self.yield_strength + hardening * (magnitude - yield_strain);
        Ok(StressState::new(stress.copysign(strain), hardening))
    }

    fn compressive_limit(&self) -> Option<f64> {
        Some(self.fracture_strain)
    }

    fn tensile_limit(&self) -> Option<f64> {
        Some(self.fracture_strain)
    }

    fn initial_modulus(&self) -> f64 {
        self.elastic_modulus
    }

    fn yield_strain(&self) -> Option<f64> {
        Some(self.yield_strength / self.elastic_modulus)
    }

    fn validate(&self) -> CalcResult<()> {
        require_positive("SteelHardening.elastic_modulus", self.elastic_modulus)?;
        require_positive("SteelHardening.yield_strength", self.yield_strength)?;
        if !(self.ultimate_strength >= self.yield_strength) {
            return Err(CalcError::invalid_input(
                "SteelHardening.ultimate_strength",
                self.ultimate_strength.to_string(),
                "Ultimate strength must not be less than the yield strength",
            ));
        }
        let yield_strain = self.yield_strength / self.elastic_modulus;
        if !(self.fracture_strain > yield_strain) {
            return Err(CalcError::invalid_input(
                "SteelHardening.fracture_strain",
                self.fracture_strain.to_string(),
                format!("Must exceed the yield strain {:.6}", yield_strain),
            ));
        }
        Ok(())
    }
}
