//! Shared evaluation loop for the interaction and biaxial sweeps.
//!
//! Points are independent, so they run on rayon's pool when asked; results
//! are collected in job order either way.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::progress::{ProgressEvent, ProgressObserver};
use crate::solver::EquilibriumState;

/// A sweep point that could not be solved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFailure {
    /// What was being solved, e.g. `fy=1` or `theta=0.7854`
    pub point: String,
    pub error: CalcError,
}

/// Counts finished points and remembers a cancellation request
pub(crate) struct SweepProgress<'a> {
    observer: &'a dyn ProgressObserver,
    completed: AtomicUsize,
    total: usize,
    cancelled: AtomicBool,
}

impl<'a> SweepProgress<'a> {
    pub(crate) fn new(observer: &'a dyn ProgressObserver, total: usize) -> Self {
        SweepProgress {
            observer,
            completed: AtomicUsize::new(0),
            total,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Report a finished point; failed points report NaN actions
    pub(crate) fn report(&self, state: Option<&EquilibriumState>) {
        if self.is_cancelled() {
            return;
        }
        let index = self.completed.fetch_add(1, Ordering::SeqCst);
        let (n, m) = state.map_or((f64::NAN, f64::NAN), |s| (s.n, s.m_xy()));
        let event = ProgressEvent::SweepPoint {
            index,
            total: self.total,
            n,
            m,
        };
        if self.observer.on_event(&event).is_break() {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Solve every job, in parallel when `parallel` is set.
///
/// Jobs not started before cancellation come back as `None`.
pub(crate) fn run_sweep<J, F>(
    jobs: &[J],
    parallel: bool,
    progress: &SweepProgress,
    solve: F,
) -> Vec<Option<CalcResult<EquilibriumState>>>
where
    J: Sync,
    F: Fn(&J) -> CalcResult<EquilibriumState> + Sync,
{
    let run = |job: &J| {
        if progress.is_cancelled() {
            return None;
        }
        let outcome = solve(job);
        progress.report(outcome.as_ref().ok());
        Some(outcome)
    };
    if parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    }
}

/// Log and wrap a failed point
pub(crate) fn failure(point: String, error: CalcError) -> PointFailure {
    warn!("sweep point {} failed: {}", point, error);
    PointFailure { point, error }
}
