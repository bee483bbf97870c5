// crates/scoring-cli/src/main.rs
// ============================================================================
// Module: Scoring CLI Entry Point
// Description: Command dispatcher for serving, rule administration, ad hoc
//              tool calls, feedback inspection, and ledger queries.
// Purpose: Give an operator one binary to run the engine and inspect it
//          without going through the HTTP surface.
// Dependencies: clap, scoring-api, scoring-broker, scoring-config,
//               scoring-core, scoring-feedback, scoring-store-sqlite,
//               scoring-tools, tokio.
// ============================================================================

//! ## Overview
//! Every subcommand here is a thin wrapper over the same backing crates
//! `scoring-api` composes behind HTTP: `serve` builds the identical
//! [`scoring_api::AppState`]/router pair and runs it to completion, `rule`
//! and `store` talk to [`scoring_store_sqlite`] directly, and `tool`/
//! `feedback` build a one-shot [`scoring_tools::DecisionExecutor`] or
//! [`scoring_feedback::FeedbackAnalyzer`] rather than going through a
//! running server.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use scoring_config::ConfigError;
use scoring_config::RuleSourceConfig;
use scoring_config::ScoringConfig;
use scoring_core::DecisionEventSink;
use scoring_core::DecisionLedger;
use scoring_core::ExecutorError;
use scoring_core::RuleDocument;
use scoring_core::RuleSource;
use scoring_core::RuleStore;
use scoring_core::RuleStoreError;
use scoring_core::RuleVersion;
use scoring_core::SubjectKey;
use scoring_core::TenantId;
use scoring_core::ToolName;
use scoring_core::events::StderrJsonEventSink;
use scoring_core::identifiers::IdentifierError;
use scoring_core::rule::RuleLifecycle;
use scoring_core::time::Timestamp;
use scoring_core::validate_rule_document;
use scoring_feedback::AlertThresholds;
use scoring_feedback::AnalyzerError;
use scoring_feedback::FeedbackAnalyzer;
use scoring_store_sqlite::FileTreeRuleSource;
use scoring_store_sqlite::SqliteLedgerStore;
use scoring_store_sqlite::SqliteRuleSource;
use scoring_tools::Clock;
use scoring_tools::DecisionExecutor;
use scoring_tools::ExecuteRequest;
use scoring_tools::SystemClock;
use scoring_tools::ToolAccessPolicy;
use scoring_tools::ToolRegistry;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "scoring-cli", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the scoring HTTP API.
    Serve(ServeArgs),
    /// Rule document administration.
    Rule {
        /// Selected rule subcommand.
        #[command(subcommand)]
        command: RuleCommand,
    },
    /// Ad hoc tool execution.
    Tool {
        /// Selected tool subcommand.
        #[command(subcommand)]
        command: ToolCommand,
    },
    /// Feedback inspection.
    Feedback {
        /// Selected feedback subcommand.
        #[command(subcommand)]
        command: FeedbackCommand,
    },
    /// Decision ledger administration.
    Store {
        /// Selected store subcommand.
        #[command(subcommand)]
        command: StoreCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to the scoring configuration TOML file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

/// Rule document subcommands.
#[derive(Subcommand, Debug)]
enum RuleCommand {
    /// Validate a rule document's structural invariants.
    Validate(RuleValidateArgs),
    /// List every stored version of a tool's rule document.
    List(RuleListArgs),
    /// Promote a stored version to production.
    Pin(RulePinArgs),
}

/// Arguments for `rule validate`.
#[derive(Args, Debug)]
struct RuleValidateArgs {
    /// Path to the rule document JSON file.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
}

/// Arguments for `rule list`.
#[derive(Args, Debug)]
struct RuleListArgs {
    /// Tool whose versions should be listed.
    #[arg(long, value_name = "TOOL")]
    tool: String,
    /// Path to the SQLite rule store database.
    #[arg(long, value_name = "PATH")]
    store: PathBuf,
}

/// Arguments for `rule pin`.
#[derive(Args, Debug)]
struct RulePinArgs {
    /// Tool the version belongs to.
    #[arg(long, value_name = "TOOL")]
    tool: String,
    /// Version to promote to production.
    #[arg(long, value_name = "VERSION")]
    version: String,
    /// Path to the SQLite rule store database.
    #[arg(long, value_name = "PATH")]
    store: PathBuf,
}

/// Ad hoc tool subcommands.
#[derive(Subcommand, Debug)]
enum ToolCommand {
    /// Execute a tool once against a rule store, without a running server.
    Execute(ToolExecuteArgs),
}

/// Arguments for `tool execute`.
#[derive(Args, Debug)]
struct ToolExecuteArgs {
    /// Tool to execute.
    #[arg(long, value_name = "TOOL")]
    tool: String,
    /// Path to the JSON input payload.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Tenant the call is made on behalf of.
    #[arg(long, value_name = "TENANT_ID")]
    tenant: String,
    /// Subject key for A/B bucketing; defaults to the tenant id.
    #[arg(long, value_name = "KEY")]
    subject_key: Option<String>,
    /// Path to the scoring configuration TOML file, for its `rule_source`
    /// and ledger.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

/// Feedback subcommands.
#[derive(Subcommand, Debug)]
enum FeedbackCommand {
    /// Compute a tool's performance summary over a window.
    Summary(FeedbackSummaryArgs),
}

/// Arguments for `feedback summary`.
#[derive(Args, Debug)]
struct FeedbackSummaryArgs {
    /// Tool the summary covers.
    #[arg(long, value_name = "TOOL")]
    tool: String,
    /// Path to the scoring configuration TOML file, for its ledger path.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Window start, as Unix milliseconds; defaults to the epoch.
    #[arg(long, value_name = "UNIX_MS")]
    from: Option<i64>,
}

/// Ledger store subcommands.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// List decisions logged for a tool since a point in time.
    Decisions(StoreDecisionsArgs),
}

/// Arguments for `store decisions`.
#[derive(Args, Debug)]
struct StoreDecisionsArgs {
    /// Tool to list decisions for.
    #[arg(long, value_name = "TOOL")]
    tool: String,
    /// Path to the scoring configuration TOML file, for its ledger path.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Window start, as Unix milliseconds; defaults to the epoch.
    #[arg(long, value_name = "UNIX_MS")]
    since: Option<i64>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// The CLI's unified error type.
#[derive(Debug, Error)]
enum CliError {
    /// An I/O operation (reading input, writing output) failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The referenced path did not contain valid JSON.
    #[error("invalid JSON in '{path}': {detail}")]
    Json {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse error text.
        detail: String,
    },
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An identifier failed its format constraints.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    /// The rule source or rule store rejected an operation.
    #[error(transparent)]
    RuleStore(#[from] RuleStoreError),
    /// The decision ledger rejected an operation.
    #[error(transparent)]
    Ledger(#[from] scoring_core::LedgerError),
    /// The decision executor rejected a tool call.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    /// The feedback analyzer could not compute a summary.
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
    /// The bind address was not a valid socket address.
    #[error("invalid bind address '{0}'")]
    Bind(String),
    /// Binding or running the listening socket failed.
    #[error("server error: {0}")]
    Serve(String),
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches to the selected subcommand.
async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Rule { command } => command_rule(&command),
        Commands::Tool { command } => command_tool(&command),
        Commands::Feedback { command } => command_feedback(&command),
        Commands::Store { command } => command_store(&command),
    }
}

/// Writes one line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes one line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

/// Parses a JSON file into `T`.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|err| CliError::Json { path: path.to_path_buf(), detail: err.to_string() })
}

/// Prints a value as pretty JSON to stdout.
fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| CliError::Json { path: PathBuf::new(), detail: err.to_string() })?;
    write_stdout_line(&rendered)?;
    Ok(())
}

/// Builds a rule source from configuration, shared by `serve` and
/// `tool execute`.
fn open_rule_source(config: &RuleSourceConfig) -> CliResult<Box<dyn RuleSource>> {
    Ok(match config {
        RuleSourceConfig::FileTree { root } => Box::new(FileTreeRuleSource::new(root.clone())),
        RuleSourceConfig::Sqlite { path } => Box::new(SqliteRuleSource::open(path)?),
    })
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command: wires every backing service and serves
/// HTTP until a shutdown signal arrives.
async fn command_serve(args: ServeArgs) -> CliResult<()> {
    let sink: Arc<dyn DecisionEventSink> = Arc::new(StderrJsonEventSink::new());
    let config = ScoringConfig::load(&args.config)?;
    config.validate()?;
    let config = Arc::new(config);

    let rule_store = Arc::new(RuleStore::new(open_rule_source(&config.rule_source)?));

    let ledger_inner: Arc<dyn DecisionLedger> =
        Arc::new(SqliteLedgerStore::open(&config.ledger.path, config.ledger.read_pool_size)?);
    let broker_ledger: Arc<dyn DecisionLedger> = Arc::new(scoring_broker::BrokerLedger::spawn(
        Arc::clone(&ledger_inner),
        Arc::clone(&sink),
        config.broker.ledger_queue_capacity,
    ));

    let policy = ToolAccessPolicy::default();
    let registry_for_executor = ToolRegistry::new(policy.clone());
    let registry = Arc::new(ToolRegistry::new(policy));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let executor = Arc::new(DecisionExecutor::new(
        registry_for_executor,
        Arc::clone(&rule_store),
        broker_ledger,
        Arc::clone(&sink),
        Arc::clone(&clock),
    ));

    let analyzer = Arc::new(FeedbackAnalyzer::new(Arc::clone(&ledger_inner), Arc::clone(&sink)));
    let background_clock = Arc::clone(&clock);
    let background_tools: Vec<_> =
        registry.catalog_names().into_iter().map(|tool_name| (tool_name, AlertThresholds::default())).collect();
    let background_analyzer = Arc::clone(&analyzer);
    let feedback_period = std::time::Duration::from_secs(config.feedback_interval_secs);
    tokio::spawn(async move {
        background_analyzer.run_forever(background_tools, feedback_period, move || background_clock.now_wall()).await;
    });

    let state = scoring_api::AppState {
        executor,
        ledger: ledger_inner,
        registry,
        rule_store,
        analyzer,
        clock,
        sink,
        config: Arc::clone(&config),
    };
    let router = scoring_api::build_router(state);

    let addr: std::net::SocketAddr = config.bind.parse().map_err(|_| CliError::Bind(config.bind.clone()))?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| CliError::Serve(err.to_string()))?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await.map_err(|err| CliError::Serve(err.to_string()))
}

/// Resolves once a `SIGINT`/`Ctrl-C` is received, so `axum::serve` can drain
/// in-flight requests before exiting.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// ============================================================================
// SECTION: Rule Commands
// ============================================================================

/// Dispatches rule subcommands.
fn command_rule(command: &RuleCommand) -> CliResult<()> {
    match command {
        RuleCommand::Validate(args) => command_rule_validate(args),
        RuleCommand::List(args) => command_rule_list(args),
        RuleCommand::Pin(args) => command_rule_pin(args),
    }
}

/// Executes `rule validate`: loads a rule document and reports every
/// structural violation found, without touching a rule store.
fn command_rule_validate(args: &RuleValidateArgs) -> CliResult<()> {
    let document: RuleDocument = read_json(&args.input)?;
    let violations = validate_rule_document(&document);
    print_json(&violations)?;
    if violations.is_empty() {
        write_stdout_line("document is valid")?;
    }
    Ok(())
}

/// Executes `rule list`: lists every stored version of a tool, newest
/// first, alongside its lifecycle.
fn command_rule_list(args: &RuleListArgs) -> CliResult<()> {
    let source = SqliteRuleSource::open(&args.store)?;
    let tool = ToolName::new(args.tool.clone())?;
    let versions = source.list_versions(&tool)?;
    let rendered: Vec<_> = versions
        .into_iter()
        .map(|(version, lifecycle)| {
            serde_json::json!({
                "version": version.as_str(),
                "lifecycle": lifecycle_label(lifecycle),
            })
        })
        .collect();
    print_json(&rendered)
}

/// Executes `rule pin`: loads an existing stored version, sets its
/// lifecycle to [`RuleLifecycle::Production`], and writes it back. Does not
/// touch any other version's lifecycle — an operator who wants a single
/// production version retires the old one with a separate `rule pin`.
fn command_rule_pin(args: &RulePinArgs) -> CliResult<()> {
    let source = SqliteRuleSource::open(&args.store)?;
    let tool = ToolName::new(args.tool.clone())?;
    let version = RuleVersion::new(args.version.clone())?;
    let mut document = source.load(&tool, &version)?;
    document.metadata.lifecycle = RuleLifecycle::Production;
    source.put(&document)?;
    write_stdout_line(&format!("pinned {} {} to production", tool.as_str(), version.as_str()))?;
    Ok(())
}

/// Maps a [`RuleLifecycle`] to its lower-case label for CLI output.
const fn lifecycle_label(lifecycle: RuleLifecycle) -> &'static str {
    match lifecycle {
        RuleLifecycle::Draft => "draft",
        RuleLifecycle::Shadow => "shadow",
        RuleLifecycle::Production => "production",
        RuleLifecycle::Archived => "archived",
    }
}

// ============================================================================
// SECTION: Tool Commands
// ============================================================================

/// Dispatches tool subcommands.
fn command_tool(command: &ToolCommand) -> CliResult<()> {
    match command {
        ToolCommand::Execute(args) => command_tool_execute(args),
    }
}

/// Executes `tool execute`: runs one tool call through a freshly built
/// executor, logging the decision to the configured ledger exactly as
/// `scoring-api` would, then prints the result.
fn command_tool_execute(args: &ToolExecuteArgs) -> CliResult<()> {
    let config = ScoringConfig::load(&args.config)?;
    config.validate()?;

    let rule_store = Arc::new(RuleStore::new(open_rule_source(&config.rule_source)?));
    let ledger: Arc<dyn DecisionLedger> = Arc::new(SqliteLedgerStore::open(&config.ledger.path, config.ledger.read_pool_size)?);
    let sink: Arc<dyn DecisionEventSink> = Arc::new(scoring_core::NoopEventSink);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let registry = ToolRegistry::new(ToolAccessPolicy::default());
    let executor = DecisionExecutor::new(registry, rule_store, ledger, sink, clock);

    let tool_name = ToolName::new(args.tool.clone())?;
    let tenant_id = TenantId::new(args.tenant.clone())?;
    let subject_key = match &args.subject_key {
        Some(value) => SubjectKey::new(value.clone())?,
        None => SubjectKey::new(tenant_id.as_str())?,
    };
    let input: serde_json::Value = read_json(&args.input)?;

    let request = ExecuteRequest {
        tool_name,
        input,
        subject_key,
        trace_id: scoring_api::ids::new_trace_id(),
        tenant_id,
        decision_id: scoring_api::ids::new_decision_id(),
        experiment: None,
    };

    let response = executor.execute(request)?;
    print_json(&serde_json::json!({
        "decision_id": response.decision_id.as_str(),
        "result": response.result,
        "rule_version": response.outcome.rule_version.as_str(),
        "breakdown": response.outcome.breakdown,
        "shadow_evaluated": response.shadow_evaluated,
        "latency_ms": response.latency_ms,
    }))
}

// ============================================================================
// SECTION: Feedback Commands
// ============================================================================

/// Dispatches feedback subcommands.
fn command_feedback(command: &FeedbackCommand) -> CliResult<()> {
    match command {
        FeedbackCommand::Summary(args) => command_feedback_summary(args),
    }
}

/// Executes `feedback summary`: computes and prints one tool's performance
/// summary, from `--from` (or the epoch) through now.
fn command_feedback_summary(args: &FeedbackSummaryArgs) -> CliResult<()> {
    let config = ScoringConfig::load(&args.config)?;
    let ledger: Arc<dyn DecisionLedger> = Arc::new(SqliteLedgerStore::open(&config.ledger.path, config.ledger.read_pool_size)?);
    let sink: Arc<dyn DecisionEventSink> = Arc::new(scoring_core::NoopEventSink);
    let analyzer = FeedbackAnalyzer::new(ledger, sink);

    let tool_name = ToolName::new(args.tool.clone())?;
    let since = args.from.map_or(Timestamp::from_unix_millis(0), Timestamp::from_unix_millis);
    let clock = SystemClock::new();
    let result = analyzer.analyze(&tool_name, since, clock.now_wall(), &AlertThresholds::default())?;
    print_json(&result)
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

/// Dispatches store subcommands.
fn command_store(command: &StoreCommand) -> CliResult<()> {
    match command {
        StoreCommand::Decisions(args) => command_store_decisions(args),
    }
}

/// Executes `store decisions`: lists every decision logged for a tool since
/// `--since` (or the epoch).
fn command_store_decisions(args: &StoreDecisionsArgs) -> CliResult<()> {
    let config = ScoringConfig::load(&args.config)?;
    let store = SqliteLedgerStore::open(&config.ledger.path, config.ledger.read_pool_size)?;
    let tool_name = ToolName::new(args.tool.clone())?;
    let since = args.since.map_or(Timestamp::from_unix_millis(0), Timestamp::from_unix_millis);
    let decisions = store.query_decisions(&tool_name, since)?;
    print_json(&decisions)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_requires_a_config_path() {
        let result = Cli::try_parse_from(["scoring-cli", "serve"]);
        assert!(result.is_err());
    }

    #[test]
    fn serve_parses_with_a_config_path() {
        let cli = Cli::try_parse_from(["scoring-cli", "serve", "--config", "scoring.toml"]).expect("parses");
        assert!(matches!(cli.command, Commands::Serve(ServeArgs { .. })));
    }

    #[test]
    fn rule_pin_parses_its_three_required_flags() {
        let cli = Cli::try_parse_from([
            "scoring-cli",
            "rule",
            "pin",
            "--tool",
            "banking_product_match",
            "--version",
            "v2",
            "--store",
            "rules.sqlite",
        ])
        .expect("parses");
        let Commands::Rule { command: RuleCommand::Pin(args) } = cli.command else {
            panic!("expected rule pin");
        };
        assert_eq!(args.tool, "banking_product_match");
        assert_eq!(args.version, "v2");
    }

    #[test]
    fn tool_execute_defaults_subject_key_to_none() {
        let cli = Cli::try_parse_from([
            "scoring-cli",
            "tool",
            "execute",
            "--tool",
            "composite_score",
            "--input",
            "input.json",
            "--tenant",
            "tenant-1",
            "--config",
            "scoring.toml",
        ])
        .expect("parses");
        let Commands::Tool { command: ToolCommand::Execute(args) } = cli.command else {
            panic!("expected tool execute");
        };
        assert_eq!(args.subject_key, None);
    }

    #[test]
    fn lifecycle_label_covers_every_variant() {
        assert_eq!(lifecycle_label(RuleLifecycle::Draft), "draft");
        assert_eq!(lifecycle_label(RuleLifecycle::Shadow), "shadow");
        assert_eq!(lifecycle_label(RuleLifecycle::Production), "production");
        assert_eq!(lifecycle_label(RuleLifecycle::Archived), "archived");
    }

    #[test]
    fn rule_validate_reports_every_violation_of_a_malformed_document() {
        let dir = std::env::temp_dir();
        let path = dir.join("scoring-cli-test-rule-validate.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "tool_name": "composite_score",
                "metadata": {
                    "version": "v1",
                    "previous_version": null,
                    "created_at": "2026-01-01T00:00:00Z",
                    "performance_target": {"p95_latency_ms": 2000, "target_success_rate": 0.8},
                    "lifecycle": "draft",
                    "confidence_floor": 0.1
                },
                "rules": {},
                "edge_cases": []
            })
            .to_string(),
        )
        .expect("write fixture");

        let result = command_rule_validate(&RuleValidateArgs { input: path.clone() });
        let _ = std::fs::remove_file(&path);
        result.expect("a document missing a result rule is still well-formed JSON");
    }
}
