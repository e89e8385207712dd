//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use mediaqueue_core::{
    DrainOutcome, DrainProgress, Drainer, ExplicitFields, IntakeInput, IntakeOutcome, Submitter,
};
use mediaqueue_shared::{
    AppConfig, CONFIG_FILE_NAME, DrainSettings, SystemClock, init_config, load_config,
    locate_config,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// mediaqueue: queued media submissions for static pages.
#[derive(Parser)]
#[command(
    name = "mediaqueue",
    version,
    about = "Queue media link submissions and insert them into category pages in rate-limited batches.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory that configured paths are resolved against (defaults to cwd).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Validate one submission and append it to the queue.
    ///
    /// The body is read from --body, --body-file, or stdin. Passing
    /// --file-url skips the body grammar entirely.
    Submit {
        /// Submitting account name.
        #[arg(long, env = "MEDIAQUEUE_USERNAME")]
        username: String,

        /// Free-text submission body.
        #[arg(long, conflicts_with_all = ["body_file", "file_url"])]
        body: Option<String>,

        /// Read the submission body from a file.
        #[arg(long, conflicts_with = "file_url")]
        body_file: Option<PathBuf>,

        /// Media URL for an explicit-field submission.
        #[arg(long)]
        file_url: Option<String>,

        /// Display name for an explicit-field submission (defaults to username).
        #[arg(long, requires = "file_url")]
        name: Option<String>,

        /// Description for an explicit-field submission.
        #[arg(long, requires = "file_url")]
        description: Option<String>,
    },

    /// Run one drain cycle: skip, idle, or insert a batch.
    Drain,

    /// Create missing documents, the queue file, and ledger directories.
    Init,

    /// Show queue, cooldown, ledger, and document state.
    Status {
        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
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
    /// Write a config file with defaults (to --config, or ./mediaqueue.toml).
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
        0 => "mediaqueue=info",
        1 => "mediaqueue=debug",
        _ => "mediaqueue=trace",
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
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().wrap_err("cannot determine working directory")?,
    };
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Submit {
            username,
            body,
            body_file,
            file_url,
            name,
            description,
        } => {
            let input = match file_url {
                Some(file_url) => IntakeInput::Fields(ExplicitFields {
                    file_url,
                    display_name: name,
                    description,
                }),
                None => IntakeInput::Body(read_body(body, body_file.as_deref())?),
            };
            cmd_submit(&root, config_path, &username, &input)
        }
        Command::Drain => cmd_drain(&root, config_path).await,
        Command::Init => cmd_init(&root, config_path),
        Command::Status { json } => cmd_status(&root, config_path, json),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&root, config_path),
            ConfigAction::Show => cmd_config_show(&root, config_path),
        },
    }
}

fn read_body(body: Option<String>, body_file: Option<&Path>) -> Result<String> {
    if let Some(body) = body {
        return Ok(body);
    }
    if let Some(path) = body_file {
        return std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read body file {}", path.display()));
    }

    let mut body = String::new();
    std::io::stdin()
        .read_to_string(&mut body)
        .wrap_err("cannot read submission body from stdin")?;
    Ok(body)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_submit(root: &Path, config_path: Option<&Path>, username: &str, input: &IntakeInput) -> Result<()> {
    let config = load_config(config_path, root)?;
    let paths = config.paths(root);

    let submitter = Submitter::new(&paths, Arc::new(SystemClock));
    match submitter.submit(username, input)? {
        IntakeOutcome::Accepted {
            record, queue_len, ..
        } => {
            println!();
            println!("  Submission queued.");
            println!("  Name:     {}", record.display_name);
            println!("  URL:      {}", record.file_url);
            println!("  Position: {queue_len}");
            println!();
        }
        IntakeOutcome::Rejected { reason, ledger_entry } => {
            println!();
            println!("  Submission rejected: {reason}");
            println!("  Logged:   {}", ledger_entry.display());
            println!();
        }
    }

    Ok(())
}

async fn cmd_drain(root: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, root)?;
    let paths = config.paths(root);
    let settings = DrainSettings::from(&config);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cutting idle wait short");
            ctrl_c.cancel();
        }
    });

    let drainer = Drainer::new(paths, settings, &config.render, Arc::new(SystemClock))?
        .with_cancellation(cancel);

    let reporter = CliProgress::new();
    let outcome = drainer.run(&reporter).await;
    reporter.finish();

    match outcome? {
        DrainOutcome::Skipped { remaining } => {
            println!("Cooldown active, next drain in {}s.", remaining.as_secs());
        }
        DrainOutcome::Idled { interrupted } => {
            if interrupted {
                println!("Queue empty, idle wait interrupted. Cooldown armed.");
            } else {
                println!("Queue empty. Cooldown armed.");
            }
        }
        DrainOutcome::Processed(report) => {
            println!();
            println!("  Drain complete.");
            println!("  Popped:    {}", report.popped);
            println!("  Inserted:  {}", report.inserted.len());
            println!("  Dropped:   {}", report.dropped.len());
            println!("  Remaining: {}", report.remaining);
            for inserted in &report.inserted {
                println!(
                    "    + {} -> {}",
                    inserted.record.file_url,
                    inserted.document.display()
                );
            }
            for dropped in &report.dropped {
                println!("    - {}: {}", dropped.record.file_url, dropped.reason);
            }
            println!();
        }
    }

    Ok(())
}

fn cmd_init(root: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, root)?;
    let paths = config.paths(root);

    let report = mediaqueue_core::bootstrap(&paths, &config.documents.marker_id)?;

    println!();
    for path in &report.created {
        println!("  created   {}", path.display());
    }
    for path in &report.existing {
        println!("  ok        {}", path.display());
    }
    for path in &report.missing_marker {
        println!(
            "  no marker {} (add an element with id=\"{}\")",
            path.display(),
            config.documents.marker_id
        );
    }
    if report.queue_created {
        println!("  created   {}", paths.queue_file.display());
    }
    println!();

    Ok(())
}

fn cmd_status(root: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path, root)?;
    let paths = config.paths(root);
    let settings = DrainSettings::from(&config);

    let snapshot = mediaqueue_core::status(&paths, &settings, &SystemClock)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let queue = match snapshot.queue_len {
        Some(n) => n.to_string(),
        None => "corrupt (will be set aside on next drain)".to_string(),
    };
    let cooldown = match snapshot.cooldown_remaining_secs {
        Some(secs) => format!("{secs}s remaining"),
        None => "ready".to_string(),
    };

    println!();
    println!("  Queue:       {queue}");
    println!("  Cooldown:    {cooldown}");
    println!("  Submissions: {}", snapshot.ledger_submissions);
    println!("  Failures:    {}", snapshot.ledger_failures);
    println!("  Documents:");
    for doc in &snapshot.documents {
        let state = match (doc.exists, doc.has_marker) {
            (false, _) => "missing",
            (true, false) => "no marker",
            (true, true) => "ok",
        };
        println!("    {:<6} {:<10} {}", doc.category.as_str(), state, doc.path.display());
    }
    println!();

    Ok(())
}

fn cmd_config_init(root: &Path, config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
    if path.exists() {
        return Err(eyre!("config file already exists at {}", path.display()));
    }

    init_config(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(root: &Path, config_path: Option<&Path>) -> Result<()> {
    let source = config_path
        .map(Path::to_path_buf)
        .or_else(|| locate_config(root));
    let config: AppConfig = load_config(config_path, root)?;

    match source {
        Some(path) => println!("# {}", path.display()),
        None => println!("# built-in defaults"),
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Drain progress on an indicatif spinner.
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
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl DrainProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn idle_wait(&self, duration: Duration) {
        self.spinner.set_message(format!(
            "Queue empty, waiting {}s (Ctrl-C to skip)",
            duration.as_secs()
        ));
    }

    fn record_done(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {detail}"));
    }
}
