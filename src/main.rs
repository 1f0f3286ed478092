// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
// Add other lints specific to this module that you want to allow but not auto-fix

use anyhow::{Result, anyhow, Context};
use log::{warn, info, debug, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::{self, BufRead, Write};
use std::fs::File;
use std::io::BufReader;
use std::time::Duration;
use clap::{Args, Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};

use askdb::app_config::{self, Config, EngineKind, GenerationProvider};
use askdb::backend::{self, SqliteBackend};
use askdb::export::{self, ExportFormat};
use askdb::schema::{self, RelationshipHint};
use askdb::{ingest, providers, Backend, QuerySession, ResultSet, RunOutcome};

/// CLI Wrapper for GenerationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliGenerationProvider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Ollama,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliGenerationProvider> for GenerationProvider {
    fn from(cli_provider: CliGenerationProvider) -> Self {
        match cli_provider {
            CliGenerationProvider::OpenAI => GenerationProvider::OpenAI,
            CliGenerationProvider::Anthropic => GenerationProvider::Anthropic,
            CliGenerationProvider::Ollama => GenerationProvider::Ollama,
            CliGenerationProvider::LMStudio => GenerationProvider::LMStudio,
        }
    }
}

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
    /// Translate a question into SQL and run it
    Ask(AskArgs),

    /// List the tables and columns the translator will see
    Tables,

    /// Load a CSV/TSV file (or a directory of them) into the SQLite database
    Load {
        /// File or directory to load
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Generate shell completions for askdb
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct AskArgs {
    /// Question in plain language
    #[arg(value_name = "QUESTION")]
    question: String,

    /// Literal values for INSERT/UPDATE statements (e.g. "name=Ada, city=London")
    #[arg(short, long)]
    details: Option<String>,

    /// Run mutating statements without asking
    #[arg(short, long)]
    yes: bool,

    /// Output format for returned rows
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Table)]
    format: ExportFormat,

    /// Write returned rows to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "askdb.json")]
    config: String,

    /// Text generation provider to use
    #[arg(short, long, global = true, value_enum)]
    provider: Option<CliGenerationProvider>,

    /// Model name to use for generation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key for the provider
    #[arg(long, global = true, env = "ASKDB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// SQLite database file (switches the backend to SQLite)
    #[arg(long, global = true)]
    database: Option<String>,

    /// File with relationship hints, one `left.col = right.col` per line
    #[arg(long, global = true)]
    hints_file: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// askdb - ask your database questions in plain language
///
/// Translates questions into SQL with an AI provider, shows the statement,
/// and runs it. Statements that change data are only run after confirmation.
#[derive(Parser, Debug)]
#[command(name = "askdb")]
#[command(version = "0.1.0")]
#[command(about = "Ask a relational database questions in plain language")]
#[command(long_about = "askdb translates plain-language questions into SQL and runs them against SQLite, PostgreSQL or MySQL.

EXAMPLES:
    askdb load customers.csv                                # Load a CSV file into the SQLite database
    askdb tables                                            # Show what the translator sees
    askdb ask \"Which customers live in Denver?\"             # Ask a question
    askdb ask \"Delete all orders from 2020\"                 # Asks before running
    askdb ask -f csv -o out.csv \"Total sales per product\"   # Export the rows
    askdb -p ollama -m llama3.2 ask \"How many orders?\"      # Use a local model
    askdb completions bash > askdb.bash                     # Generate bash completions

CONFIGURATION:
    Configuration is stored in askdb.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. The API key may also be supplied through the
    ASKDB_API_KEY environment variable.

SUPPORTED PROVIDERS:
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    ollama    - Local Ollama server (default: llama3.2)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
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
        // The logger itself lets everything through; log::max_level filters
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
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

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("askdb")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    // If log level is set via command line, apply it immediately
    if let Some(level) = &cli.global.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let command = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "askdb", &mut std::io::stdout());
            return Ok(());
        }
        command => command,
    };

    let config = load_config(&cli.global)?;

    // If log level was not set via command line, update it from config now
    if cli.global.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    match command {
        Commands::Ask(args) => run_ask(config, args).await,
        Commands::Tables => run_tables(config).await,
        Commands::Load { path } => run_load(config, &path).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load or create the configuration and apply command line overrides
fn load_config(options: &GlobalArgs) -> Result<Config> {
    let config_path = &options.config;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        // Create default configuration if not exists
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.generation.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.generation.active_provider_config_mut().model = model.clone();
    }

    if let Some(api_key) = options.api_key.as_ref().filter(|k| !k.is_empty()) {
        config.generation.active_provider_config_mut().api_key = api_key.clone();
    }

    if let Some(database) = &options.database {
        config.backend = app_config::BackendConfig::sqlite(database.clone());
    }

    if let Some(hints_file) = &options.hints_file {
        let hints = RelationshipHint::load_file(hints_file)?;
        debug!("Loaded {} relationship hint(s) from {:?}", hints.len(), hints_file);
        config.schema.hints = hints.into_iter().map(|h| h.to_string()).collect();
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

// @returns: Spinner shown while waiting on the provider
fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

// @returns: Whether the user typed yes
fn confirm_prompt(prompt: &str) -> Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn emit_rows(result: &ResultSet, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            export::write_to_file(result, format, path)?;
            info!("Wrote {} row(s) to {:?}", result.len(), path);
        }
        None => {
            let rendered = format.render(result)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}

async fn run_ask(config: Config, args: AskArgs) -> Result<()> {
    config.validate()
        .context("Configuration validation failed")?;

    let provider = providers::from_config(&config.generation)?;
    info!(
        "Using {} ({}) against {}",
        config.generation.provider.display_name(),
        config.generation.get_model(),
        config.backend.engine.display_name()
    );

    let mut session = QuerySession::connect(&config, provider)
        .await
        .context("Failed to connect to the database")?;

    let result = ask_in_session(&mut session, &args).await;

    // The connection is released whatever happened above
    if let Err(e) = session.close().await {
        warn!("Failed to close the database connection: {}", e);
    }
    result
}

async fn ask_in_session(session: &mut QuerySession, args: &AskArgs) -> Result<()> {
    session.check_provider()
        .await
        .context("Failed to reach the text generation provider")?;

    let pb = spinner("Generating SQL...");
    let prepared = session.prepare(&args.question, args.details.as_deref()).await;
    pb.finish_and_clear();
    let prepared = prepared?;

    if let Some(e) = &prepared.schema_error {
        warn!("Schema could not be read, the statement was generated without it: {}", e);
    }
    info!("SQL: {}", prepared.sql());

    if prepared.is_mutating() {
        warn!("This statement modifies the database");
        if args.yes || confirm_prompt("Execute this statement? [y/N] ")? {
            session.confirm(&prepared);
        } else {
            info!("Statement was not executed");
            return Ok(());
        }
    }

    match session.execute(&prepared).await? {
        RunOutcome::Rows(result) => emit_rows(&result, args.format, args.output.as_deref())?,
        RunOutcome::Applied { rows_affected } => info!("Done, {} row(s) affected", rows_affected),
        RunOutcome::AwaitingConfirmation => warn!("Statement is waiting for confirmation and was not executed"),
    }
    Ok(())
}

async fn run_tables(config: Config) -> Result<()> {
    config.validate_backend()
        .context("Configuration validation failed")?;

    let mut backend = backend::connect(&config.backend)
        .await
        .context("Failed to connect to the database")?;

    let discovered = schema::discover(backend.as_mut(), config.schema.sample_rows).await;
    if let Err(e) = backend.close().await {
        warn!("Failed to close the database connection: {}", e);
    }

    let discovered = discovered?;
    if discovered.is_empty() {
        warn!("No tables found");
        return Ok(());
    }

    let hints: Vec<RelationshipHint> = config.schema.hints.iter().map(RelationshipHint::new).collect();
    print!("{}", schema::merge(&discovered, &hints));
    Ok(())
}

async fn run_load(config: Config, path: &Path) -> Result<()> {
    config.validate_backend()
        .context("Configuration validation failed")?;

    if config.backend.engine != EngineKind::Sqlite {
        return Err(anyhow!(
            "Loading files is only supported for the SQLite backend, configured engine is {}",
            config.backend.engine.display_name()
        ));
    }

    let mut db = SqliteBackend::open(config.backend.sqlite_path()?)?;
    let loaded = ingest::load_path(&db, path).await;
    if let Err(e) = db.close().await {
        warn!("Failed to close the database connection: {}", e);
    }

    for table in loaded? {
        info!(
            "Loaded {:?} into '{}' ({} column(s), {} row(s))",
            table.source,
            table.table,
            table.columns.len(),
            table.rows
        );
    }
    Ok(())
}
