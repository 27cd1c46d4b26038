/// Diagnostic events emitted while a polarization evaluation runs.
///
/// Dipole-solve instrumentation is injected, never inlined: the engine reports
/// events through an optional callback and performs no I/O of its own.
#[derive(Debug, Clone)]
pub enum SolverEvent {
    SolveStart {
        particles: usize,
    },
    /// One full sweep finished; `change` is the mean squared per-component
    /// dipole change against the previous sweep (absent in fixed-iteration
    /// mode, which skips the convergence test).
    SweepComplete {
        iteration: usize,
        change: Option<f64>,
    },
    Converged {
        iterations: usize,
    },
    /// The iteration cap was exceeded; dipoles were reset to the first-order
    /// guess. Non-fatal by design.
    DivergenceFallback {
        iterations: usize,
    },
    Message(String),
}

pub type SolverCallback<'a> = Box<dyn Fn(SolverEvent) + Send + Sync + 'a>;

#[derive(Default)]
pub struct DiagnosticsReporter<'a> {
    callback: Option<SolverCallback<'a>>,
}

impl<'a> DiagnosticsReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: SolverCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: SolverEvent) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
