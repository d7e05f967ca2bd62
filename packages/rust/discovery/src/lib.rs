//! Data-directory discovery and sidecar bootstrap.
//!
//! Every regular file in the data directory becomes a [`Bundle`]. A bundle
//! without a sidecar (or one being reset) gets a fresh fact store describing
//! the file, the sidecar, and a single initial goal for the enhancers to pick up.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use url::Url;

use globdef_factstore::vocab::{gsm, rdf};
use globdef_factstore::{FactStore, Literal, Term};
use globdef_shared::{Bundle, GlobdefError, Result, SIDECAR_TEMP_SUFFIX};

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// List the data files in `dir` (non-recursive) paired with their sidecars.
///
/// Sidecars themselves and leftover sidecar temp files are skipped. The
/// result is sorted by file name.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn discover_bundles(dir: &Path, suffix: &str) -> Result<Vec<Bundle>> {
    if suffix.is_empty() {
        return Err(GlobdefError::config("sidecar suffix must not be empty"));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| GlobdefError::io(dir, e))?;
    let temp_suffix = format!("{suffix}{SIDECAR_TEMP_SUFFIX}");

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| GlobdefError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(suffix) || name.ends_with(&temp_suffix) {
            continue;
        }
        files.push(path);
    }
    files.sort();

    let bundles: Vec<Bundle> = files
        .into_iter()
        .map(|path| Bundle::new(path, suffix))
        .collect();

    info!(bundles = bundles.len(), "data files discovered");
    Ok(bundles)
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// What [`bootstrap`] did with a bundle's sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No sidecar existed; a fresh one was written.
    Created,
    /// An existing sidecar was discarded and rewritten.
    Reset,
    /// An existing sidecar was kept as is.
    Existing,
}

/// Counts from [`bootstrap_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub created: usize,
    pub reset: usize,
    pub existing: usize,
}

/// Make sure `bundle` has a usable sidecar.
///
/// An existing sidecar is parsed (to surface corruption early) and left
/// untouched unless `reset` is set.
#[instrument(skip_all, fields(bundle = %bundle, reset))]
pub fn bootstrap(bundle: &Bundle, reset: bool) -> Result<BootstrapOutcome> {
    let exists = bundle.sidecar_path.is_file();

    if exists && !reset {
        let store = FactStore::load(&bundle.sidecar_path)?;
        debug!(facts = store.len(), "existing sidecar kept");
        return Ok(BootstrapOutcome::Existing);
    }

    let store = initial_facts(bundle, Utc::now())?;
    store.save(&bundle.sidecar_path)?;

    let outcome = if exists {
        BootstrapOutcome::Reset
    } else {
        BootstrapOutcome::Created
    };
    debug!(?outcome, facts = store.len(), "sidecar written");
    Ok(outcome)
}

/// Bootstrap every bundle, stopping at the first failure.
pub fn bootstrap_all(bundles: &[Bundle], reset: bool) -> Result<BootstrapSummary> {
    let mut summary = BootstrapSummary::default();
    for bundle in bundles {
        match bootstrap(bundle, reset) {
            Ok(BootstrapOutcome::Created) => summary.created += 1,
            Ok(BootstrapOutcome::Reset) => summary.reset += 1,
            Ok(BootstrapOutcome::Existing) => summary.existing += 1,
            Err(e) => {
                warn!(bundle = %bundle, error = %e, "bootstrap failed");
                return Err(e);
            }
        }
    }

    info!(
        created = summary.created,
        reset = summary.reset,
        existing = summary.existing,
        "bundles bootstrapped"
    );
    Ok(summary)
}

/// Synthesize the facts written to a brand-new sidecar.
pub fn initial_facts(bundle: &Bundle, now: DateTime<Utc>) -> Result<FactStore> {
    let metadata =
        std::fs::metadata(&bundle.data_path).map_err(|e| GlobdefError::io(&bundle.data_path, e))?;
    let modified = metadata
        .modified()
        .map_err(|e| GlobdefError::io(&bundle.data_path, e))?;
    let created = metadata.created().unwrap_or(modified);

    let data_node = file_node(&bundle.data_path)?;
    let sidecar_node = file_node(&bundle.sidecar_path)?;
    let now_literal = Literal::date_time(now);

    let mut store = FactStore::new();

    store.insert(data_node.clone(), rdf::TYPE, Term::iri(gsm::FILE));
    store.insert(
        data_node.clone(),
        gsm::HAS_FILE_NAME,
        Term::literal(bundle.data_path.to_string_lossy()),
    );
    store.insert(data_node.clone(), gsm::IS_DESCRIBED_BY, sidecar_node.clone());
    store.insert(data_node.clone(), gsm::IS_CREATED_ON, timestamp(created));
    store.insert(data_node, gsm::IS_MODIFIED_ON, timestamp(modified));

    store.insert(sidecar_node.clone(), rdf::TYPE, Term::iri(gsm::SIDECAR_FILE));
    store.insert(
        sidecar_node.clone(),
        gsm::HAS_FILE_NAME,
        Term::literal(bundle.sidecar_path.to_string_lossy()),
    );
    store.insert(sidecar_node.clone(), gsm::IS_CREATED_ON, now_literal.clone());
    store.insert(sidecar_node, gsm::IS_MODIFIED_ON, now_literal.clone());

    let goal = store.fresh_blank();
    store.insert(goal.clone(), rdf::TYPE, Term::iri(gsm::INITIAL_GOAL));
    store.insert(goal, gsm::IS_CREATED_ON, now_literal);

    Ok(store)
}

/// `file://` identifier for a path, made absolute first.
fn file_node(path: &Path) -> Result<Term> {
    let absolute = std::path::absolute(path).map_err(|e| GlobdefError::io(path, e))?;
    let url = Url::from_file_path(&absolute).map_err(|()| {
        GlobdefError::validation(format!("cannot express {} as a file URL", absolute.display()))
    })?;
    Ok(Term::iri(url.as_str()))
}

fn timestamp(time: SystemTime) -> Literal {
    Literal::date_time(DateTime::<Utc>::from(time))
}
