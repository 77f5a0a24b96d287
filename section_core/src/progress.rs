//! # Progress and Cancellation
//!
//! Long-running analyses (moment-curvature, interaction and biaxial sweeps)
//! report each completed step to a [`ProgressObserver`]. Returning
//! [`ControlFlow::Break`] stops the analysis; whatever was computed so far
//! is returned with `cancelled = true`.
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use section_core::progress::{CancelFlag, ProgressEvent, ProgressObserver};
//!
//! let flag = CancelFlag::new();
//! assert!(flag.on_event(&ProgressEvent::SweepPoint { index: 0, total: 4, n: 0.0, m: 0.0 }).is_continue());
//! flag.cancel();
//! assert_eq!(flag.on_event(&ProgressEvent::SweepPoint { index: 1, total: 4, n: 0.0, m: 0.0 }), ControlFlow::Break(()));
//! ```

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One completed unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// An accepted moment-curvature state
    CurvatureStep {
        step: usize,
        curvature: f64,
        moment: f64,
    },
    /// A finished interaction or biaxial point (successful or not)
    SweepPoint {
        index: usize,
        total: usize,
        n: f64,
        m: f64,
    },
}

/// Receives progress events; `Break` cancels the running analysis.
///
/// Observers are shared across rayon workers in parallel sweeps, hence `Sync`.
pub trait ProgressObserver: Sync {
    fn on_event(&self, event: &ProgressEvent) -> ControlFlow<()>;
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) -> ControlFlow<()> + Sync,
{
    fn on_event(&self, event: &ProgressEvent) -> ControlFlow<()> {
        self(event)
    }
}

/// Ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressObserver for Silent {
    fn on_event(&self, _event: &ProgressEvent) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Shared cancellation flag, set from any thread
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl ProgressObserver for CancelFlag {
    fn on_event(&self, _event: &ProgressEvent) -> ControlFlow<()> {
        if self.is_cancelled() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Forwards events over a channel. A dropped receiver does not cancel.
impl ProgressObserver for Sender<ProgressEvent> {
    fn on_event(&self, event: &ProgressEvent) -> ControlFlow<()> {
        let _ = self.send(event.clone());
        ControlFlow::Continue(())
    }
}
