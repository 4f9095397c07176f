// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;

use yttrans::app_config::{self, Config};
use yttrans::app_controller::{Controller, TranslateOptions};
use yttrans::database::models::JobState;
use yttrans::language_utils;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a caption file or every caption file in a directory
    Translate(TranslateArgs),

    /// List the languages the configured engine can translate into
    Languages,

    /// Print the status of a job as JSON, or list recent jobs
    Status {
        /// Job ID returned at submission; lists recent jobs when omitted
        job_id: Option<String>,

        /// Only list jobs in this state (QUEUED, RUNNING, DONE, FAILED)
        #[arg(long)]
        state: Option<String>,

        /// Maximum number of jobs to list
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Remove expired results and partial snapshots
    Purge,

    /// Generate shell completions for yttrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input .vtt file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Target language codes, comma separated (e.g. 'es,fr')
    #[arg(short, long, value_delimiter = ',')]
    target: Vec<String>,

    /// Source language code, 'auto' when omitted
    #[arg(short, long)]
    source: Option<String>,

    /// Output directory, defaults to the input file's directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,
}

/// yttrans - subtitle translation job service
#[derive(Parser, Debug)]
#[command(name = "yttrans")]
#[command(version)]
#[command(about = "Translate WebVTT captions into many languages")]
#[command(long_about = "yttrans translates WebVTT caption documents through queued jobs.

EXAMPLES:
    yttrans translate talk.vtt -t es,fr          # Translate one file
    yttrans translate ./captions -t de -o ./out  # Translate a directory
    yttrans -e ollama translate talk.vtt -t ja   # Use a specific engine
    yttrans languages                            # List target languages
    yttrans status <JOB_ID>                      # Show a stored job
    yttrans status --state FAILED                # List recent failed jobs
    yttrans purge                                # Drop expired results
    yttrans completions bash > yttrans.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default
    one will be created automatically.

SUPPORTED ENGINES:
    dummy   - Placeholder text, no network
    ollama  - Local Ollama server (default: llama3.2)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, env = "LOG_LEVEL", ignore_case = true, global = true)]
    log_level: Option<CliLogLevel>,

    /// Translation engine to use
    #[arg(short, long, env = "YTTRANS_ENGINE", global = true)]
    engine: Option<String>,

    /// Allowed target languages, comma separated
    #[arg(long, env = "YTTRANS_LANGS", value_delimiter = ',', global = true)]
    langs: Vec<String>,

    /// Maximum number of jobs running at once
    #[arg(long, env = "YTTRANS_MAX_PARALLEL", global = true)]
    max_parallel: Option<usize>,

    /// Character budget per engine call
    #[arg(long, env = "YTTRANS_MAXTOTALCHARS", global = true)]
    max_total_chars: Option<usize>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the max level is narrowed once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "yttrans", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(level_filter(&config.log_level));

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Translate(args) => run_translate(&controller, args).await,
        Commands::Languages => {
            let reply = controller.languages().await;
            if let Some(warning) = reply.meta.get("warning").and_then(|w| w.as_str()) {
                warn!("{}", warning);
            }
            for code in &reply.target_langs {
                let name = language_utils::get_language_name(code)
                    .unwrap_or_else(|_| "unknown".to_string());
                println!("{:<10} {}", code, name);
            }
            Ok(())
        }
        Commands::Status {
            job_id: None,
            state,
            limit,
        } => {
            let state = state.map(|s| s.parse::<JobState>()).transpose()?;
            let jobs = controller.store().list_recent(state, limit).await?;
            for job in &jobs {
                println!(
                    "{}  {:<8} {:>3}%  {:<16} {}",
                    job.job_id,
                    job.state.to_string(),
                    job.percent,
                    job.video_id,
                    job.message
                );
            }
            Ok(())
        }
        Commands::Status {
            job_id: Some(job_id),
            ..
        } => {
            let status = controller.service().get_status(&job_id).await?;
            let partial = controller.service().get_partial_result(&job_id).await?;
            let output = serde_json::json!({
                "status": status,
                "partial": partial,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::Purge => {
            let stats = controller.store().purge_expired().await?;
            info!(
                "Purged {} expired results and {} partial snapshots",
                stats.results, stats.partials
            );
            let db_stats = controller.store().repository().connection().stats()?;
            info!(
                "Database: {} jobs, {} queued, {} results, {} partials",
                db_stats.job_count, db_stats.queued_count, db_stats.result_count, db_stats.partial_count
            );
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the config file and apply command line and environment overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    if !cli.config_path.exists() {
        warn!(
            "Config file not found at '{}', creating default config.",
            cli.config_path.display()
        );
    }
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(engine) = &cli.engine {
        config.engine = engine.trim().to_lowercase();
    }
    let langs: Vec<String> = cli
        .langs
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if !langs.is_empty() {
        config.langs = langs;
    }
    if let Some(max_parallel) = cli.max_parallel {
        config.worker.max_parallel = max_parallel;
    }
    if let Some(max_total_chars) = cli.max_total_chars {
        config.batching.max_total_chars = max_total_chars;
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

async fn run_translate(controller: &Controller, args: TranslateArgs) -> Result<()> {
    let options = TranslateOptions {
        src_lang: args.source.unwrap_or_default(),
        target_langs: args.target,
        output_dir: args.output,
        force_overwrite: args.force_overwrite,
    };

    let summary = controller.run(&args.input_path, &options).await?;

    if summary.failed > 0 {
        return Err(anyhow!("{} file(s) failed to translate", summary.failed));
    }
    Ok(())
}
