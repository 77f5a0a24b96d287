//! # Error Types
//!
//! Structured error types for section_core. Each variant carries enough
//! context to tell which material, bound or input caused the failure, so
//! callers (and the sweep generators) can decide whether a failure is fatal
//! or just ends the current control point.
//!
//! ## Example
//!
//! ```rust
//! use section_core::errors::{CalcError, CalcResult};
//!
//! fn validate_area(area: f64) -> CalcResult<()> {
//!     if !(area > 0.0) {
//!         return Err(CalcError::InvalidInput {
//!             field: "area".to_string(),
//!             value: area.to_string(),
//!             reason: "Area must be positive".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for section_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Which side of a stress-strain law's domain a strain left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrainSide {
    /// Crushing / compressive limit (positive strains)
    Compression,
    /// Fracture / tensile limit (negative strains)
    Tension,
}

impl std::fmt::Display for StrainSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrainSide::Compression => write!(f, "compression"),
            StrainSide::Tension => write!(f, "tension"),
        }
    }
}

/// Structured error type for section analysis operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// A strain fell outside a material's valid domain
    #[error("Material limit exceeded: '{material}' at strain {strain:e} ({side} limit {limit:e})")]
    MaterialLimitExceeded {
        material: String,
        strain: f64,
        limit: f64,
        side: StrainSide,
    },

    /// A root search ran out of iterations before meeting its tolerance
    #[error("Convergence failure after {iterations} iterations (residual {residual:e}, tolerance {tolerance:e})")]
    ConvergenceFailure {
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },

    /// No plane within the searched bounds satisfies the force target
    #[error("Infeasible equilibrium for N = {target}: {reason} (searched {lower} to {})", describe_upper(.upper))]
    InfeasibleEquilibrium {
        target: f64,
        /// Lower end of the search: a neutral axis depth, or a uniform strain
        lower: f64,
        /// Upper end of the search; `None` when an ultimate search extended
        /// to the uniform (infinite depth) state
        upper: Option<f64>,
        reason: String,
    },

    /// An input value is invalid (out of range, non-finite, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Material not found in a project
    #[error("Material not found: {material_name}")]
    MaterialNotFound { material_name: String },

    /// Analysis item not found in a project
    #[error("Analysis item not found: {item}")]
    ItemNotFound { item: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn describe_upper(upper: &Option<f64>) -> String {
    upper
        .map(|u| u.to_string())
        .unwrap_or_else(|| "infinity".to_string())
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create a MaterialNotFound error
    pub fn material_not_found(material_name: impl Into<String>) -> Self {
        CalcError::MaterialNotFound {
            material_name: material_name.into(),
        }
    }

    /// Create an InfeasibleEquilibrium error
    pub fn infeasible(target: f64, lower: f64, upper: Option<f64>, reason: impl Into<String>) -> Self {
        CalcError::InfeasibleEquilibrium {
            target,
            lower,
            upper,
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for strain-domain failures
    pub fn is_material_limit(&self) -> bool {
        matches!(self, CalcError::MaterialLimitExceeded { .. })
    }

    /// The side of a material limit failure, if this is one
    pub fn limit_side(&self) -> Option<StrainSide> {
        match self {
            CalcError::MaterialLimitExceeded { side, .. } => Some(*side),
            _ => None,
        }
    }

    /// Check if this is a numerical failure that a smaller step may avoid
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CalcError::MaterialLimitExceeded { .. }
                | CalcError::ConvergenceFailure { .. }
                | CalcError::InfeasibleEquilibrium { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::MaterialLimitExceeded { .. } => "MATERIAL_LIMIT_EXCEEDED",
            CalcError::ConvergenceFailure { .. } => "CONVERGENCE_FAILURE",
            CalcError::InfeasibleEquilibrium { .. } => "INFEASIBLE_EQUILIBRIUM",
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::MaterialNotFound { .. } => "MATERIAL_NOT_FOUND",
            CalcError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(e: serde_json::Error) -> Self {
        CalcError::SerializationError {
            reason: e.to_string(),
        }
    }
}
