//! Run-scoped state handed to every phase.

use tokio_util::sync::CancellationToken;

/// Cancellation and worker budget for one build.
///
/// Cloning shares the cancellation token.
#[derive(Debug, Clone)]
pub struct BuildContext {
    cancel: CancellationToken,
    jobs: usize,
}

impl BuildContext {
    /// Creates a context allowing `jobs` concurrent file loads or checks.
    pub fn new(jobs: usize) -> Self {
        Self {
            cancel: CancellationToken::new(),
            jobs: jobs.max(1),
        }
    }

    /// Uses an externally owned token, e.g. one tripped by Ctrl-C.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new(default_jobs())
    }
}

/// Number of workers when none is configured.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
