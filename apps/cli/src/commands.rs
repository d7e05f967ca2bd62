//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use globdef_core::pipeline::{self, PipelineConfig, PipelineReport};
use globdef_core::scheduler::{
    FailedBundle, RunReport, SchedulerProgress, TerminalBundle, TerminalState,
};
use globdef_factstore::{FactStore, to_rdf_json};
use globdef_shared::{AppConfig, Bundle, init_config, load_config, sidecar_path_for};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// globdef: enrich data files with goal-directed metadata sidecars.
#[derive(Parser)]
#[command(
    name = "globdef",
    version,
    about = "Enrich data files with RDF metadata sidecars, one goal at a time.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Bootstrap sidecars and run enhancers until every bundle is terminal.
    Run {
        /// Folder holding the data files to enhance.
        #[arg(short = 'd', long, env = "GLOBDEF_DATA_DIR", default_value = ".")]
        data_dir: PathBuf,

        /// Root ontology (RDF/JSON) describing additional goal types.
        #[arg(short = 's', long)]
        ontology: Option<PathBuf>,

        /// Discard existing sidecars and start over.
        #[arg(long)]
        clean_previous_meta: bool,

        /// Process only the first data file.
        #[arg(long)]
        process_first_only: bool,

        /// Remote enrichment endpoint (overrides the config file).
        #[arg(long)]
        endpoint: Option<String>,

        /// Disable the remote text enhancer.
        #[arg(long, conflicts_with = "endpoint")]
        no_remote: bool,
    },

    /// Create missing sidecars without running enhancers.
    Bootstrap {
        /// Folder holding the data files.
        #[arg(short = 'd', long, env = "GLOBDEF_DATA_DIR", default_value = ".")]
        data_dir: PathBuf,

        /// Discard existing sidecars and start over.
        #[arg(long)]
        clean_previous_meta: bool,
    },

    /// Print the facts recorded for a data file (or a sidecar) as RDF/JSON.
    Show {
        /// Data file or sidecar path.
        file: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "globdef=info",
        1 => "globdef=debug",
        _ => "globdef=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            data_dir,
            ontology,
            clean_previous_meta,
            process_first_only,
            endpoint,
            no_remote,
        } => {
            let options = RunOptions {
                ontology,
                reset: clean_previous_meta,
                first_only: process_first_only,
                endpoint,
                no_remote,
            };
            cmd_run(&data_dir, options).await
        }
        Command::Bootstrap {
            data_dir,
            clean_previous_meta,
        } => cmd_bootstrap(&data_dir, clean_previous_meta).await,
        Command::Show { file } => cmd_show(&file).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// Flags of `globdef run` layered over the config file.
struct RunOptions {
    ontology: Option<PathBuf>,
    reset: bool,
    first_only: bool,
    endpoint: Option<String>,
    no_remote: bool,
}

fn pipeline_config(
    data_dir: &Path,
    config: &AppConfig,
    options: RunOptions,
) -> Result<PipelineConfig> {
    let mut app = config.clone();
    if let Some(endpoint) = options.endpoint {
        Url::parse(&endpoint).map_err(|e| eyre!("invalid endpoint '{endpoint}': {e}"))?;
        app.remote.endpoint = endpoint;
        app.remote.enabled = true;
    }
    if options.no_remote {
        app.remote.enabled = false;
    }

    let mut pipeline = PipelineConfig::from_app_config(data_dir, &app)?;
    if options.ontology.is_some() {
        pipeline.ontology = options.ontology;
    }
    pipeline.reset = options.reset;
    pipeline.first_only = options.first_only;
    Ok(pipeline)
}

async fn cmd_run(data_dir: &Path, options: RunOptions) -> Result<()> {
    let config = load_config()?;
    let run_config = pipeline_config(data_dir, &config, options)?;

    let remote = run_config
        .remote
        .as_ref()
        .map(|r| r.endpoint.to_string())
        .unwrap_or_else(|| "disabled".into());
    info!(
        data_dir = %data_dir.display(),
        reset = run_config.reset,
        first_only = run_config.first_only,
        %remote,
        "starting enhancement run"
    );

    let reporter = CliProgress::new();
    let report = pipeline::run(&run_config, &reporter).await?;

    print_summary(&report);

    if !report.run.failed.is_empty() {
        return Err(eyre!(
            "{} bundle(s) failed; re-run to retry their outstanding goals",
            report.run.failed.len()
        ));
    }
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    let run: &RunReport = &report.run;

    println!();
    println!("  Enhancement run finished");
    println!("  Run:       {}", run.run_id);
    println!("  Files:     {}", report.discovered);
    println!(
        "  Sidecars:  {} created, {} reset, {} existing",
        report.bootstrap.created, report.bootstrap.reset, report.bootstrap.existing
    );
    println!("  Steps:     {}", run.steps);
    println!("  Complete:  {}", run.complete().count());
    println!("  Stalled:   {}", run.stalled().count());
    println!("  Failed:    {}", run.failed.len());
    println!("  Time:      {:.1}s", run.elapsed.as_secs_f64());

    for stalled in run.stalled() {
        if let TerminalState::Stalled { outstanding } = stalled.state {
            println!(
                "    stalled  {} ({outstanding} outstanding goal(s))",
                stalled.bundle.data_path.display()
            );
        }
    }
    for failed in &run.failed {
        println!(
            "    failed   {}: {}",
            failed.bundle.data_path.display(),
            failed.error
        );
    }
    println!();
}

async fn cmd_bootstrap(data_dir: &Path, reset: bool) -> Result<()> {
    let config = load_config()?;
    let bundles = globdef_discovery::discover_bundles(data_dir, &config.data.sidecar_suffix)?;

    info!(data_dir = %data_dir.display(), reset, bundles = bundles.len(), "bootstrapping sidecars");
    let summary = globdef_discovery::bootstrap_all(&bundles, reset)?;

    println!();
    println!("  Sidecars bootstrapped");
    println!("  Files:     {}", bundles.len());
    println!("  Created:   {}", summary.created);
    println!("  Reset:     {}", summary.reset);
    println!("  Existing:  {}", summary.existing);
    println!();

    Ok(())
}

async fn cmd_show(file: &Path) -> Result<()> {
    let config = load_config()?;
    let suffix = &config.data.sidecar_suffix;

    let is_sidecar = file
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(suffix.as_str()));
    let sidecar = if is_sidecar {
        file.to_path_buf()
    } else {
        sidecar_path_for(file, suffix)
    };

    if !sidecar.is_file() {
        return Err(eyre!(
            "no sidecar found at '{}'; run `globdef bootstrap` first",
            sidecar.display()
        ));
    }

    let store = FactStore::load(&sidecar)?;
    info!(sidecar = %sidecar.display(), facts = store.len(), "showing sidecar");
    print!("{}", to_rdf_json(&store)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

fn display_name(bundle: &Bundle) -> String {
    bundle
        .data_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| bundle.data_path.display().to_string())
}

impl SchedulerProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn bundle_stepped(&self, bundle: &Bundle, enhancer: &str, steps: usize) {
        self.spinner.set_message(format!(
            "[{steps}] {enhancer} enhanced {}",
            display_name(bundle)
        ));
    }

    fn bundle_terminal(&self, terminal: &TerminalBundle) {
        let state = match terminal.state {
            TerminalState::Complete => "complete",
            TerminalState::Stalled { .. } => "stalled",
        };
        self.spinner
            .set_message(format!("{} {state}", display_name(&terminal.bundle)));
    }

    fn bundle_failed(&self, failed: &FailedBundle) {
        self.spinner.suspend(|| {
            eprintln!("  ✗ {}: {}", display_name(&failed.bundle), failed.error);
        });
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
