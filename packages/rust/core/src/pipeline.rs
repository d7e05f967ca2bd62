//! End-to-end `run` pipeline: discover → bootstrap → schedule enhancers.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use globdef_discovery::{BootstrapOutcome, BootstrapSummary};
use globdef_shared::{AppConfig, Bundle, DEFAULT_SIDECAR_SUFFIX, RemoteEnhancerConfig, Result};

use crate::enhancer::{EnhancerRegistry, RemoteTextEnhancer};
use crate::goal::Taxonomy;
use crate::scheduler::{FailedBundle, RunReport, Scheduler, SchedulerConfig, SchedulerProgress};

/// Configuration for the `run` pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the data files.
    pub data_dir: PathBuf,
    /// Suffix appended to a data file's name to locate its sidecar.
    pub sidecar_suffix: String,
    /// Root ontology (RDF/JSON) extending the built-in goal taxonomy.
    pub ontology: Option<PathBuf>,
    /// Discard existing sidecars and bootstrap from scratch.
    pub reset: bool,
    /// Schedule only the first discovered bundle.
    pub first_only: bool,
    /// Remote text enhancer settings; `None` disables it.
    pub remote: Option<RemoteEnhancerConfig>,
    pub scheduler: SchedulerConfig,
}

impl PipelineConfig {
    /// Defaults for `data_dir` with the remote enhancer disabled.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            sidecar_suffix: DEFAULT_SIDECAR_SUFFIX.into(),
            ontology: None,
            reset: false,
            first_only: false,
            remote: None,
            scheduler: SchedulerConfig::default(),
        }
    }

    /// Seed from the config file; CLI flags are applied on top by the caller.
    pub fn from_app_config(data_dir: impl Into<PathBuf>, app: &AppConfig) -> Result<Self> {
        let remote = if app.remote.enabled {
            Some(RemoteEnhancerConfig::try_from(&app.remote)?)
        } else {
            None
        };
        Ok(Self {
            sidecar_suffix: app.data.sidecar_suffix.clone(),
            ontology: app.data.ontology.as_ref().map(PathBuf::from),
            remote,
            scheduler: SchedulerConfig::from(&app.scheduler),
            ..Self::new(data_dir)
        })
    }
}

/// Result of the `run` pipeline.
#[derive(Debug)]
pub struct PipelineReport {
    /// Data files found in the data directory.
    pub discovered: usize,
    pub bootstrap: BootstrapSummary,
    /// Scheduler report; bundles that failed to bootstrap are listed in
    /// `run.failed` with zero steps.
    pub run: RunReport,
}

/// Run the full pipeline.
///
/// 1. Discover data files
/// 2. Bootstrap their sidecars (a failing bundle is reported, not fatal)
/// 3. Optionally keep only the first bundle
/// 4. Build the taxonomy and enhancer registry
/// 5. Schedule enhancers until every bundle is terminal or failed
#[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
pub async fn run(
    config: &PipelineConfig,
    progress: &dyn SchedulerProgress,
) -> Result<PipelineReport> {
    // --- Phase 1: Discovery ---
    progress.phase("Discovering data files");
    let bundles = globdef_discovery::discover_bundles(&config.data_dir, &config.sidecar_suffix)?;
    let discovered = bundles.len();

    // --- Phase 2: Bootstrap ---
    progress.phase("Bootstrapping sidecars");
    let (bootstrap, mut ready, bootstrap_failed) = bootstrap_bundles(bundles, config.reset);
    for failed in &bootstrap_failed {
        progress.bundle_failed(failed);
    }

    if config.first_only {
        ready.truncate(1);
        info!(bundles = ready.len(), "processing first bundle only");
    }

    // --- Phase 3: Taxonomy and enhancers ---
    let taxonomy = match &config.ontology {
        Some(path) => {
            progress.phase("Loading ontology");
            Taxonomy::with_ontology(path)?
        }
        None => Taxonomy::builtin(),
    };

    let remote = config
        .remote
        .clone()
        .map(RemoteTextEnhancer::from_config)
        .transpose()?;
    if remote.is_none() {
        info!("remote text enhancer disabled");
    }
    let registry = EnhancerRegistry::standard(remote);

    // --- Phase 4: Schedule ---
    progress.phase("Enhancing bundles");
    let scheduler = Scheduler::new(registry, taxonomy, config.scheduler);
    let mut report = scheduler.run(ready, progress).await;

    if !bootstrap_failed.is_empty() {
        let mut failed = bootstrap_failed;
        failed.append(&mut report.failed);
        report.failed = failed;
    }

    Ok(PipelineReport {
        discovered,
        bootstrap,
        run: report,
    })
}

/// Bootstrap each bundle, separating the ones that failed.
fn bootstrap_bundles(
    bundles: Vec<Bundle>,
    reset: bool,
) -> (BootstrapSummary, Vec<Bundle>, Vec<FailedBundle>) {
    let mut summary = BootstrapSummary::default();
    let mut ready = Vec::with_capacity(bundles.len());
    let mut failed = Vec::new();

    for bundle in bundles {
        match globdef_discovery::bootstrap(&bundle, reset) {
            Ok(outcome) => {
                match outcome {
                    BootstrapOutcome::Created => summary.created += 1,
                    BootstrapOutcome::Reset => summary.reset += 1,
                    BootstrapOutcome::Existing => summary.existing += 1,
                }
                ready.push(bundle);
            }
            Err(error) => {
                warn!(%bundle, %error, "bootstrap failed, skipping bundle");
                failed.push(FailedBundle {
                    bundle,
                    error,
                    steps: 0,
                });
            }
        }
    }

    info!(
        created = summary.created,
        reset = summary.reset,
        existing = summary.existing,
        failed = failed.len(),
        "bundles bootstrapped"
    );
    (summary, ready, failed)
}
