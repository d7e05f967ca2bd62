//! Work-queue scheduler driving enhancers over bundles.
//!
//! Each dequeue performs one match-and-process step for one bundle, then
//! re-enqueues it at the tail, so bundles advance in interleaved rounds. A
//! bundle leaves the queue when no enhancer matches (terminal) or when a step
//! fails (failed). Failures never stop the rest of the run.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use globdef_factstore::{FactStore, Term};
use globdef_shared::{Bundle, GlobdefError, Result, SchedulerSection};

use crate::enhancer::EnhancerRegistry;
use crate::goal::{self, Taxonomy};

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Successful steps a single bundle may take in one run. `0` disables the guard.
    pub max_steps_per_bundle: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_steps_per_bundle: 100,
        }
    }
}

impl From<&SchedulerSection> for SchedulerConfig {
    fn from(section: &SchedulerSection) -> Self {
        Self {
            max_steps_per_bundle: section.max_steps_per_bundle,
        }
    }
}

/// Identifier of one scheduler run (UUID v7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a single scheduling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// An enhancer satisfied `goal` and persisted the sidecar.
    Enhanced { enhancer: String, goal: Term },
    /// No enhancer matched. `outstanding` goals remain unsatisfied.
    NoMatch { outstanding: usize },
}

/// How a bundle ended up terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// Every goal has a result.
    Complete,
    /// No enhancer can make progress but goals remain.
    Stalled { outstanding: usize },
}

impl TerminalState {
    fn from_outstanding(outstanding: usize) -> Self {
        if outstanding == 0 {
            Self::Complete
        } else {
            Self::Stalled { outstanding }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TerminalBundle {
    pub bundle: Bundle,
    pub state: TerminalState,
    /// Successful steps taken in this run.
    pub steps: usize,
}

#[derive(Debug)]
pub struct FailedBundle {
    pub bundle: Bundle,
    pub error: GlobdefError,
    /// Successful steps taken before the failure.
    pub steps: usize,
}

/// Summary of a scheduler run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    /// Successful steps across all bundles.
    pub steps: usize,
    pub terminal: Vec<TerminalBundle>,
    pub failed: Vec<FailedBundle>,
    pub elapsed: Duration,
}

impl RunReport {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            steps: 0,
            terminal: Vec::new(),
            failed: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Bundles whose goals are all satisfied.
    pub fn complete(&self) -> impl Iterator<Item = &TerminalBundle> {
        self.terminal
            .iter()
            .filter(|t| t.state == TerminalState::Complete)
    }

    /// Terminal bundles with goals left unsatisfied.
    pub fn stalled(&self) -> impl Iterator<Item = &TerminalBundle> {
        self.terminal
            .iter()
            .filter(|t| matches!(t.state, TerminalState::Stalled { .. }))
    }

    pub fn bundle_count(&self) -> usize {
        self.terminal.len() + self.failed.len()
    }
}

/// Progress callback for reporting scheduler status.
pub trait SchedulerProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after an enhancer processed a bundle.
    fn bundle_stepped(&self, bundle: &Bundle, enhancer: &str, steps: usize);
    /// Called when a bundle leaves the queue as terminal.
    fn bundle_terminal(&self, terminal: &TerminalBundle);
    /// Called when a bundle leaves the queue after an error.
    fn bundle_failed(&self, failed: &FailedBundle);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl SchedulerProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn bundle_stepped(&self, _bundle: &Bundle, _enhancer: &str, _steps: usize) {}
    fn bundle_terminal(&self, _terminal: &TerminalBundle) {}
    fn bundle_failed(&self, _failed: &FailedBundle) {}
    fn done(&self, _report: &RunReport) {}
}

/// Drives registered enhancers over a set of bundles.
pub struct Scheduler {
    registry: EnhancerRegistry,
    taxonomy: Taxonomy,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(registry: EnhancerRegistry, taxonomy: Taxonomy, config: SchedulerConfig) -> Self {
        Self {
            registry,
            taxonomy,
            config,
        }
    }

    /// Load the bundle's sidecar and run the first matching enhancer.
    ///
    /// The store is loaded fresh on every call; the enhancer persists its own
    /// mutation. On error the sidecar is unchanged.
    pub async fn step(&self, bundle: &Bundle) -> Result<StepOutcome> {
        self.advance(bundle, 0).await
    }

    async fn advance(&self, bundle: &Bundle, steps_taken: usize) -> Result<StepOutcome> {
        let mut store = FactStore::load(&bundle.sidecar_path)?;

        let Some((enhancer, goal)) = self.registry.find_match(&store, &self.taxonomy) else {
            let outstanding = goal::outstanding_goals(&store, &self.taxonomy).len();
            debug!(%bundle, outstanding, "no enhancer matched");
            return Ok(StepOutcome::NoMatch { outstanding });
        };

        let max = self.config.max_steps_per_bundle;
        if max != 0 && steps_taken >= max {
            return Err(GlobdefError::validation(format!(
                "{bundle} still has work after {max} steps, goal generation may be cyclic"
            )));
        }

        debug!(%bundle, enhancer = enhancer.name(), %goal, "processing goal");
        enhancer.process(bundle, &goal, &mut store).await?;

        Ok(StepOutcome::Enhanced {
            enhancer: enhancer.name().to_string(),
            goal,
        })
    }

    /// Process `bundles` until every one is terminal or failed.
    #[instrument(skip_all, fields(bundles = bundles.len()))]
    pub async fn run(&self, bundles: Vec<Bundle>, progress: &dyn SchedulerProgress) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::new(RunId::new());
        info!(
            run_id = %report.run_id,
            bundles = bundles.len(),
            enhancers = ?self.registry.names(),
            "scheduler started"
        );

        let mut queue: VecDeque<(Bundle, usize)> = bundles.into_iter().map(|b| (b, 0)).collect();

        while let Some((bundle, steps)) = queue.pop_front() {
            match self.advance(&bundle, steps).await {
                Ok(StepOutcome::Enhanced { enhancer, goal }) => {
                    report.steps += 1;
                    debug!(%bundle, %enhancer, %goal, "step complete");
                    progress.bundle_stepped(&bundle, &enhancer, steps + 1);
                    queue.push_back((bundle, steps + 1));
                }
                Ok(StepOutcome::NoMatch { outstanding }) => {
                    let terminal = TerminalBundle {
                        bundle,
                        state: TerminalState::from_outstanding(outstanding),
                        steps,
                    };
                    info!(
                        bundle = %terminal.bundle,
                        state = ?terminal.state,
                        steps,
                        "bundle terminal"
                    );
                    progress.bundle_terminal(&terminal);
                    report.terminal.push(terminal);
                }
                Err(error) => {
                    warn!(%bundle, %error, steps, "bundle failed");
                    let failed = FailedBundle {
                        bundle,
                        error,
                        steps,
                    };
                    progress.bundle_failed(&failed);
                    report.failed.push(failed);
                }
            }
        }

        report.elapsed = start.elapsed();
        info!(
            run_id = %report.run_id,
            steps = report.steps,
            complete = report.complete().count(),
            stalled = report.stalled().count(),
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scheduler finished"
        );
        progress.done(&report);
        report
    }
}
