//! Bracketed scalar root finding
//!
//! A safeguarded Newton / secant / bisection search for a residual that
//! increases with its argument. The residual is evaluated through a
//! closure returning a [`Probe`], which is either a finite value or a
//! *limit probe* saying the trial left a material's strain domain on the
//! compression ([`Probe::Above`]) or tension ([`Probe::Below`]) side.
//! Limit probes take part in bracketing like residuals of the matching
//! sign; when the bracket shrinks onto one of them the limit itself is
//! the answer and is returned as [`RootError::Limit`].
//!
//! A bracket that shrinks below `x_tolerance` is only a root when one of
//! its ends meets `value_tolerance`; otherwise the residual jumps across
//! the bracket and the search reports [`RootError::NoConvergence`].
//!
//! The search runs as an explicit state machine:
//!
//! ```text
//! Bracket ──▶ Propose ──▶ Evaluate ──▶ Narrow ──▶ Propose ...
//!    │                       │            │
//!    └── NotBracketed        └── Done     └── Done / Limit / NoConvergence
//! ```

use log::trace;

use crate::errors::{CalcError, StrainSide};

/// Outcome of one residual evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    /// Finite residual, with `d(residual)/dx` when known
    Value { residual: f64, slope: Option<f64> },
    /// Compression-side material limit: the root lies below this point
    Above(CalcError),
    /// Tension-side material limit: the root lies above this point
    Below(CalcError),
}

impl Probe {
    /// Residual without slope information
    pub fn value(residual: f64) -> Self {
        Probe::Value { residual, slope: None }
    }

    /// Residual with slope
    pub fn with_slope(residual: f64, slope: f64) -> Self {
        Probe::Value {
            residual,
            slope: Some(slope),
        }
    }

    /// Turn a material limit error into a limit probe; other errors pass through
    pub fn from_limit(error: CalcError) -> Result<Self, CalcError> {
        match error.limit_side() {
            Some(StrainSide::Compression) => Ok(Probe::Above(error)),
            Some(StrainSide::Tension) => Ok(Probe::Below(error)),
            None => Err(error),
        }
    }

    fn side(&self) -> Side {
        match self {
            Probe::Value { residual, .. } if *residual < 0.0 => Side::Negative,
            Probe::Value { .. } => Side::Positive,
            Probe::Above(_) => Side::Positive,
            Probe::Below(_) => Side::Negative,
        }
    }

    fn residual(&self) -> Option<f64> {
        match self {
            Probe::Value { residual, .. } => Some(*residual),
            _ => None,
        }
    }

    fn slope(&self) -> Option<f64> {
        match self {
            Probe::Value { slope: Some(s), .. } if s.is_finite() && *s > 0.0 => Some(*s),
            _ => None,
        }
    }

    fn limit_error(&self) -> Option<CalcError> {
        match self {
            Probe::Above(e) | Probe::Below(e) => Some(e.clone()),
            Probe::Value { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Negative,
    Positive,
}

/// Search tolerances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootConfig {
    /// Trial cap (bracket evaluations excluded)
    pub max_iterations: usize,
    /// Accept when `|residual| <= value_tolerance`
    pub value_tolerance: f64,
    /// Accept when the bracket is narrower than this
    pub x_tolerance: f64,
    /// Times the initial interval may double outward to find a sign change
    pub max_expansions: usize,
}

/// A converged root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    pub residual: f64,
    /// Trials used (bracket evaluations excluded)
    pub iterations: usize,
}

/// Why a search stopped without a root
#[derive(Debug, Clone, PartialEq)]
pub enum RootError {
    /// No sign change between the final bounds
    NotBracketed {
        lower: f64,
        upper: f64,
        /// Both bounds were on the positive side, so any root lies below `lower`
        root_below: bool,
        /// Limit probe at the bound that failed to straddle the root
        limit: Option<CalcError>,
    },
    /// Trial cap reached
    NoConvergence { iterations: usize, residual: f64 },
    /// The bracket `[lower, upper]` collapsed onto a material limit boundary
    Limit { error: CalcError, lower: f64, upper: f64 },
    /// The residual closure failed for a reason other than a limit
    Failed(CalcError),
}

#[derive(Debug, Clone)]
struct Sample {
    x: f64,
    probe: Probe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrialKind {
    Newton,
    Secant,
    Bisection,
}

enum Stage {
    Bracket { expansions: usize },
    Propose,
    Evaluate { x: f64, kind: TrialKind },
    Narrow(Sample),
    Done(Root),
}

struct Search<F> {
    residual: F,
    config: RootConfig,
    lower: Sample,
    upper: Sample,
    last: Option<Sample>,
    width_before: f64,
    iterations: usize,
}

impl<F> Search<F>
where
    F: FnMut(f64) -> Result<Probe, CalcError>,
{
    fn sample(&mut self, x: f64) -> Result<Sample, RootError> {
        let probe = (self.residual)(x).map_err(RootError::Failed)?;
        Ok(Sample { x, probe })
    }

    fn accepted(&self, sample: &Sample) -> Option<Root> {
        match sample.probe.residual() {
            Some(r) if r.abs() <= self.config.value_tolerance => Some(Root {
                x: sample.x,
                residual: r,
                iterations: self.iterations,
            }),
            _ => None,
        }
    }

    fn bracket(&mut self, expansions: usize) -> Result<Stage, RootError> {
        match (self.lower.probe.side(), self.upper.probe.side()) {
            (Side::Negative, Side::Positive) => Ok(Stage::Propose),
            (Side::Negative, Side::Negative) if expansions < self.config.max_expansions => {
                let next = self.upper.x + 2.0 * (self.upper.x - self.lower.x);
                trace!("bracket: expanding upward to {:e}", next);
                let sample = self.sample(next)?;
                if let Some(root) = self.accepted(&sample) {
                    return Ok(Stage::Done(root));
                }
                self.lower = std::mem::replace(&mut self.upper, sample);
                Ok(Stage::Bracket {
                    expansions: expansions + 1,
                })
            }
            (Side::Positive, Side::Positive) if expansions < self.config.max_expansions => {
                let next = self.lower.x - 2.0 * (self.upper.x - self.lower.x);
                trace!("bracket: expanding downward to {:e}", next);
                let sample = self.sample(next)?;
                if let Some(root) = self.accepted(&sample) {
                    return Ok(Stage::Done(root));
                }
                self.upper = std::mem::replace(&mut self.lower, sample);
                Ok(Stage::Bracket {
                    expansions: expansions + 1,
                })
            }
            (lower_side, upper_side) => {
                let root_below = lower_side == Side::Positive && upper_side == Side::Positive;
                let limit = if root_below {
                    self.lower.probe.limit_error()
                } else {
                    self.upper.probe.limit_error()
                };
                Err(RootError::NotBracketed {
                    lower: self.lower.x,
                    upper: self.upper.x,
                    root_below,
                    limit,
                })
            }
        }
    }

    fn propose(&self) -> (f64, TrialKind) {
        let (lo, hi) = (&self.lower, &self.upper);
        let width = hi.x - lo.x;
        let inside = |x: f64| x > lo.x && x < hi.x;

        // The previous trial failed to halve the bracket
        if width > 0.5 * self.width_before {
            return (lo.x + 0.5 * width, TrialKind::Bisection);
        }

        let newton_from = self.last.as_ref().filter(|s| s.probe.slope().is_some()).or_else(|| {
            [lo, hi]
                .into_iter()
                .filter(|s| s.probe.slope().is_some())
                .min_by(|a, b| {
                    let ra = a.probe.residual().map_or(f64::INFINITY, f64::abs);
                    let rb = b.probe.residual().map_or(f64::INFINITY, f64::abs);
                    ra.total_cmp(&rb)
                })
        });
        if let Some(s) = newton_from {
            if let (Some(r), Some(slope)) = (s.probe.residual(), s.probe.slope()) {
                let x = s.x - r / slope;
                if inside(x) {
                    return (x, TrialKind::Newton);
                }
            }
        }

        if let (Some(r_lo), Some(r_hi)) = (lo.probe.residual(), hi.probe.residual()) {
            if r_hi != r_lo {
                let x = lo.x - r_lo * width / (r_hi - r_lo);
                if inside(x) {
                    return (x, TrialKind::Secant);
                }
            }
        }

        (lo.x + 0.5 * width, TrialKind::Bisection)
    }

    fn narrow(&mut self, sample: Sample) -> Result<Stage, RootError> {
        let width = self.upper.x - self.lower.x;
        match sample.probe.side() {
            Side::Negative => self.lower = sample.clone(),
            Side::Positive => self.upper = sample.clone(),
        }
        self.width_before = width;
        self.last = Some(sample);

        if self.upper.x - self.lower.x <= self.config.x_tolerance {
            return self.collapse().map(Stage::Done);
        }
        if self.iterations >= self.config.max_iterations {
            let residual = [&self.lower, &self.upper]
                .iter()
                .filter_map(|s| s.probe.residual())
                .map(f64::abs)
                .fold(f64::NAN, f64::min);
            return Err(RootError::NoConvergence {
                iterations: self.iterations,
                residual,
            });
        }
        Ok(Stage::Propose)
    }

    /// Bracket narrower than the tolerance
    fn collapse(&self) -> Result<Root, RootError> {
        let root = |s: &Sample, r: f64| Root {
            x: s.x,
            residual: r,
            iterations: self.iterations,
        };
        let best = [&self.lower, &self.upper]
            .into_iter()
            .filter_map(|s| s.probe.residual().map(|r| (s, r)))
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()));
        match best {
            Some((s, r)) if r.abs() <= self.config.value_tolerance => Ok(root(s, r)),
            // Both ends finite but apart: a jump in the residual, not a root
            Some((_, r)) if self.lower.probe.residual().is_some() && self.upper.probe.residual().is_some() => {
                Err(RootError::NoConvergence {
                    iterations: self.iterations,
                    residual: r.abs(),
                })
            }
            _ => {
                let limit = self
                    .upper
                    .probe
                    .limit_error()
                    .or_else(|| self.lower.probe.limit_error());
                match limit {
                    Some(error) => Err(RootError::Limit {
                        error,
                        lower: self.lower.x,
                        upper: self.upper.x,
                    }),
                    None => Err(RootError::Failed(CalcError::Internal {
                        message: "bracket collapsed without a limit probe".to_string(),
                    })),
                }
            }
        }
    }
}

/// Find `x` in `[lower, upper]` (expanded outward if allowed) where the
/// increasing residual crosses zero.
pub fn find_root<F>(residual: F, lower: f64, upper: f64, config: RootConfig) -> Result<Root, RootError>
where
    F: FnMut(f64) -> Result<Probe, CalcError>,
{
    let mut residual = residual;
    let lower_probe = residual(lower).map_err(RootError::Failed)?;
    let upper_probe = residual(upper).map_err(RootError::Failed)?;
    let mut search = Search {
        residual,
        config,
        lower: Sample {
            x: lower,
            probe: lower_probe,
        },
        upper: Sample {
            x: upper,
            probe: upper_probe,
        },
        last: None,
        width_before: f64::INFINITY,
        iterations: 0,
    };

    for end in [&search.lower, &search.upper] {
        if let Some(root) = search.accepted(end) {
            return Ok(root);
        }
    }

    let mut stage = Stage::Bracket { expansions: 0 };
    loop {
        stage = match stage {
            Stage::Bracket { expansions } => search.bracket(expansions)?,
            Stage::Propose => {
                let (x, kind) = search.propose();
                Stage::Evaluate { x, kind }
            }
            Stage::Evaluate { x, kind } => {
                search.iterations += 1;
                let sample = search.sample(x)?;
                trace!(
                    "trial {} ({:?}): x = {:e}, probe = {:?}",
                    search.iterations,
                    kind,
                    x,
                    sample.probe.residual()
                );
                match search.accepted(&sample) {
                    Some(root) => Stage::Done(root),
                    None => Stage::Narrow(sample),
                }
            }
            Stage::Narrow(sample) => search.narrow(sample)?,
            Stage::Done(root) => return Ok(root),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RootConfig {
        RootConfig {
            max_iterations: 100,
            value_tolerance: 1e-10,
            x_tolerance: 1e-14,
            max_expansions: 8,
        }
    }

    fn limit(side: StrainSide) -> CalcError {
        CalcError::MaterialLimitExceeded {
            material: "Test".to_string(),
            strain: 0.0,
            limit: 0.0,
            side,
        }
    }

    #[test]
    fn test_linear_with_slope_converges_in_one_trial() {
        let root = find_root(|x| Ok(Probe::with_slope(2.0 * x - 3.0, 2.0)), 0.0, 10.0, config()).unwrap();
        assert!((root.x - 1.5).abs() < 1e-12);
        assert_eq!(root.iterations, 1);
    }

    #[test]
    fn test_nonlinear_without_slope() {
        let root = find_root(|x| Ok(Probe::value(x * x * x - 8.0)), 0.0, 10.0, config()).unwrap();
        assert!((root.x - 2.0).abs() < 1e-9);
        assert!(root.residual.abs() <= 1e-10);
    }

    #[test]
    fn test_bracket_expansion() {
        let root = find_root(|x| Ok(Probe::with_slope(x - 50.0, 1.0)), 0.0, 1.0, config()).unwrap();
        assert!((root.x - 50.0).abs() < 1e-9);

        let root = find_root(|x| Ok(Probe::with_slope(x + 50.0, 1.0)), 0.0, 1.0, config()).unwrap();
        assert!((root.x + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_not_bracketed() {
        let cfg = RootConfig {
            max_expansions: 2,
            ..config()
        };
        let err = find_root(|x| Ok(Probe::value(x * x + 1.0)), 0.0, 1.0, cfg).unwrap_err();
        match err {
            RootError::NotBracketed {
                lower,
                upper,
                root_below,
                limit,
            } => {
                assert!(lower < upper);
                assert!(root_below);
                assert!(limit.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_jump_in_residual_is_not_a_root() {
        // Step from -1 to +1 at x = 0.3: the bracket closes on the jump
        let err = find_root(
            |x| Ok(Probe::value(if x < 0.3 { -1.0 } else { 1.0 })),
            0.0,
            1.0,
            config(),
        )
        .unwrap_err();
        match err {
            RootError::NoConvergence { residual, .. } => assert_eq!(residual, 1.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_limit_probes_narrow_the_bracket() {
        // Compression limit above 0.8; the root at 0.5 is still found
        let root = find_root(
            |x| {
                if x > 0.8 {
                    Ok(Probe::Above(limit(StrainSide::Compression)))
                } else {
                    Ok(Probe::with_slope(x - 0.5, 1.0))
                }
            },
            0.0,
            1.0,
            config(),
        )
        .unwrap();
        assert!((root.x - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_collapse_onto_limit_returns_limit() {
        // Residual is still negative where the compression limit starts
        let err = find_root(
            |x| {
                if x > 0.4 {
                    Ok(Probe::Above(limit(StrainSide::Compression)))
                } else {
                    Ok(Probe::with_slope(x - 0.5, 1.0))
                }
            },
            0.0,
            1.0,
            config(),
        )
        .unwrap_err();
        match err {
            RootError::Limit { error, lower, upper } => {
                assert_eq!(error.limit_side(), Some(StrainSide::Compression));
                assert!(lower <= 0.4 && upper > 0.4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_iteration_cap() {
        let cfg = RootConfig {
            max_iterations: 3,
            value_tolerance: 0.0,
            x_tolerance: 0.0,
            max_expansions: 0,
        };
        let err = find_root(|x| Ok(Probe::value(x.powi(3) - 0.1)), 0.0, 1.0, cfg).unwrap_err();
        assert!(matches!(err, RootError::NoConvergence { iterations: 3, .. }));
    }

    #[test]
    fn test_other_errors_abort() {
        let err = find_root(
            |_| Err(CalcError::Internal { message: "boom".to_string() }),
            0.0,
            1.0,
            config(),
        )
        .unwrap_err();
        assert!(matches!(err, RootError::Failed(_)));
    }

    #[test]
    fn test_from_limit() {
        assert!(matches!(
            Probe::from_limit(limit(StrainSide::Tension)),
            Ok(Probe::Below(_))
        ));
        assert!(Probe::from_limit(CalcError::missing_field("x")).is_err());
    }
}
