use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use super::pages::Pages;
use crate::core::{AppConfig, Result};
use crate::pipelines::sentiment::SentimentScorer;
use crate::reviews::{Progress, ResultSet, ReviewTable};

/// What the single user has uploaded and analysed so far.
#[derive(Debug, Default)]
pub struct Session {
    pub table: Option<ReviewTable>,
    pub results: Option<ResultSet>,
    /// Confirmation shown at the top of the page.
    pub notice: Option<String>,
}

/// Shared state behind every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub(crate) scorer: Arc<dyn SentimentScorer + Send + Sync>,
    pub(crate) config: Arc<AppConfig>,
    pub(crate) session: Arc<RwLock<Session>>,
    pub(crate) run: Arc<RunTracker>,
    pub(crate) pages: Arc<Pages>,
}

impl AppState {
    pub fn new(scorer: Arc<dyn SentimentScorer + Send + Sync>, config: AppConfig) -> Result<Self> {
        Ok(Self {
            scorer,
            config: Arc::new(config),
            session: Arc::new(RwLock::new(Session::default())),
            run: Arc::new(RunTracker::default()),
            pages: Arc::new(Pages::new()?),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn progress(&self) -> ProgressReport {
        self.run.report()
    }
}

/// Progress of the labeling run, as served at `GET /progress`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressReport {
    pub running: bool,
    pub completed: usize,
    pub total: usize,
    pub fraction: f64,
}

/// Lock-free view of the current labeling run. At most one run at a time.
#[derive(Debug, Default)]
pub struct RunTracker {
    running: AtomicBool,
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl RunTracker {
    /// Claim the tracker for a run over `total` rows. `None` if a run is
    /// already in progress.
    pub fn try_start(self: &Arc<Self>, total: usize) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.completed.store(0, Ordering::Release);
        self.total.store(total, Ordering::Release);
        Some(RunGuard {
            tracker: Arc::clone(self),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn report(&self) -> ProgressReport {
        let progress = Progress {
            completed: self.completed.load(Ordering::Acquire),
            total: self.total.load(Ordering::Acquire),
        };
        ProgressReport {
            running: self.is_running(),
            completed: progress.completed,
            total: progress.total,
            fraction: progress.fraction(),
        }
    }
}

/// Held for the duration of a run; releases the tracker when dropped, even if
/// the run panicked.
#[derive(Debug)]
pub struct RunGuard {
    tracker: Arc<RunTracker>,
}

impl RunGuard {
    pub fn record(&self, progress: Progress) {
        self.tracker
            .completed
            .store(progress.completed, Ordering::Release);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.tracker.running.store(false, Ordering::Release);
    }
}
