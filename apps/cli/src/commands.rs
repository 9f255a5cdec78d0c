//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use reportgen_core::{ProgressReporter, ReportCoordinator, RunRequest, RunResult, Stage};
use reportgen_shared::{AppConfig, ReportKind, init_config, load_config, validate_api_key};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// reportgen: generate structured reports from a topic.
#[derive(Parser)]
#[command(
    name = "reportgen",
    version,
    about = "Generate structured reports with outline, sections, charts, and exports.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
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
    /// Run the full pipeline and export the report.
    Generate {
        /// Report topic.
        topic: String,

        /// Report kind: research, business, technical, or academic.
        #[arg(short, long)]
        kind: Option<ReportKind>,

        /// Skip the polish stage.
        #[arg(long)]
        no_polish: bool,

        /// Skip chart selection and rendering.
        #[arg(long)]
        no_charts: bool,

        /// Export formats (comma-separated): markdown, json, richtext.
        #[arg(short, long, value_delimiter = ',')]
        format: Vec<String>,

        /// Output directory (defaults to the configured one).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the full run result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate an outline only.
    Outline {
        /// Report topic.
        topic: String,

        /// Report kind: research, business, technical, or academic.
        #[arg(short, long)]
        kind: Option<ReportKind>,

        /// Free-text feedback used to revise the outline.
        #[arg(long)]
        feedback: Option<String>,
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
        0 => "reportgen=info",
        1 => "reportgen=debug",
        _ => "reportgen=trace",
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
        Command::Generate {
            topic,
            kind,
            no_polish,
            no_charts,
            format,
            out,
            json,
        } => {
            let options = GenerateOptions {
                kind,
                no_polish,
                no_charts,
                formats: format,
                out,
                json,
            };
            cmd_generate(topic, options).await
        }
        Command::Outline {
            topic,
            kind,
            feedback,
        } => cmd_outline(&topic, kind, feedback.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

struct GenerateOptions {
    kind: Option<ReportKind>,
    no_polish: bool,
    no_charts: bool,
    formats: Vec<String>,
    out: Option<PathBuf>,
    json: bool,
}

/// Config with the API key checked, ready to build a coordinator.
fn ready_config() -> Result<AppConfig> {
    let config = load_config()?;
    validate_api_key(&config)?;
    Ok(config)
}

async fn cmd_generate(topic: String, options: GenerateOptions) -> Result<()> {
    let config = ready_config()?;

    let formats = if options.formats.is_empty() {
        config
            .defaults
            .formats
            .iter()
            .map(|f| f.as_str().to_string())
            .collect()
    } else {
        options.formats
    };

    let request = RunRequest {
        topic,
        kind: options.kind.unwrap_or(config.defaults.report_kind),
        enable_polish: config.defaults.enable_polish && !options.no_polish,
        enable_charts: config.defaults.enable_charts && !options.no_charts,
        formats,
    };

    let mut coordinator = ReportCoordinator::from_config(&config)?;
    if let Some(out) = options.out {
        coordinator = coordinator.with_output_dir(out);
    }

    info!(
        topic = %request.topic,
        kind = %request.kind,
        polish = request.enable_polish,
        charts = request.enable_charts,
        "generating report"
    );

    let reporter = CliProgress::new();
    let result = coordinator.run(request, &reporter).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    if result.is_success() {
        Ok(())
    } else {
        Err(eyre!(
            "report generation failed: {}",
            result.error.unwrap_or_default()
        ))
    }
}

fn print_summary(result: &RunResult) {
    println!();
    if result.is_success() {
        println!("  Report generated successfully!");
    } else {
        println!("  Report generation failed.");
    }
    println!("  Run:      {}", result.run_id);
    println!("  Topic:    {}", result.topic);
    println!("  Kind:     {}", result.kind);
    println!("  Sections: {}", result.sections.len());
    println!("  Charts:   {}", result.chart_files.len());
    for (format, path) in &result.exported {
        println!("  {:<9} {}", format!("{format}:"), path.display());
    }
    if result.is_success() && result.exported.is_empty() {
        println!("  Files:    none (every export format failed)");
    }
    println!("  Time:     {:.1}s", result.elapsed_ms as f64 / 1000.0);
    println!();
}

async fn cmd_outline(topic: &str, kind: Option<ReportKind>, feedback: Option<&str>) -> Result<()> {
    let config = ready_config()?;
    let kind = kind.unwrap_or(config.defaults.report_kind);
    let coordinator = ReportCoordinator::from_config(&config)?;

    info!(topic, %kind, "generating outline");
    let outline = coordinator.preview_outline(topic, kind, feedback).await?;

    for (i, title) in outline.iter().enumerate() {
        println!("{}. {title}", i + 1);
    }
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn section_done(&self, stage: Stage, title: &str, current: usize, total: usize) {
        let verb = match stage {
            Stage::Content => "Written",
            Stage::Polish => "Polished",
            Stage::Charts => "Analyzed",
            Stage::Outline | Stage::Export => "Done",
        };
        self.spinner
            .set_message(format!("{verb} [{current}/{total}] {title}"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
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
