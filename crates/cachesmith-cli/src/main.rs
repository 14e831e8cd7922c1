//! Cachesmith CLI
//!
//! The `cachesmith` command evolves ChampSim cache-replacement policies with a
//! chat-completions oracle.
//!
//! ## Commands
//!
//! - `evolve`: Run the generate → evaluate → decide loop
//! - `simulate`: Compile one policy and replay it over traces

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{info, warn, Level};

use cachesmith_core::{
    evaluate, CandidateWorkspace, ChampSimHarness, ChatOracle, ConfigId, EvolutionConfig,
    EvolutionController, EvolutionReport, FileScoreHistory, FsAcceptedStore, Harness,
    OracleConfig, ProcessGroup, PromptBuilder, SimulationConfig, SubprocessHarness, Toolchain,
};

#[derive(Parser)]
#[command(name = "cachesmith")]
#[command(version = cachesmith_core::VERSION)]
#[command(about = "Evolve cache-replacement policies with an LLM in the loop", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Also append DEBUG-level logs to this file
    #[arg(long, global = true, env = "LOG_FILE", default_value = "logs/app.log")]
    log_file: PathBuf,

    /// Do not write a log file
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the evolution loop
    Evolve(EvolveArgs),

    /// Compile a policy and print its per-trace results as JSON
    Simulate {
        /// Policy source file
        policy: PathBuf,

        #[command(flatten)]
        sim: SimArgs,
    },
}

/// Simulator and toolchain settings shared by both commands.
#[derive(Args, Debug, Clone)]
struct SimArgs {
    /// Simulator configuration (config1..config6)
    #[arg(long, env = "CONFIG", default_value = "config1")]
    config: String,

    /// Trace files, colon-separated when read from the environment
    #[arg(
        long,
        env = "TRACES",
        value_delimiter = ':',
        num_args = 1..,
        required = true
    )]
    traces: Vec<PathBuf>,

    #[arg(long, env = "WARMUP_INSTRUCTIONS", default_value_t = 1_000_000)]
    warmup: u64,

    #[arg(long = "sim", env = "SIM_INSTRUCTIONS", default_value_t = 10_000_000)]
    simulation: u64,

    /// Directory for compiled binaries
    #[arg(long, env = "OUTDIR", default_value = ".")]
    outdir: PathBuf,

    /// Directory holding the per-configuration `.a` archives
    #[arg(long, env = "CHAMPSIM_LIB_DIR", default_value = "lib")]
    lib_dir: PathBuf,

    /// C++ compiler
    #[arg(long, env = "CXX", default_value = "g++")]
    cxx: PathBuf,

    /// Compiler flag, repeatable; replaces the default flags when given
    #[arg(long = "cxx-flag", allow_hyphen_values = true)]
    cxx_flags: Vec<String>,

    /// Keep compiler and simulator in the caller's process group
    #[arg(long, hide = true)]
    inherit_process_group: bool,
}

#[derive(Args, Debug, Clone)]
struct EvolveArgs {
    #[command(flatten)]
    sim: SimArgs,

    /// Accepted policies; also used as prompt references
    #[arg(long, env = "INPUT_SCRIPTS_DIR", default_value = "accepted_policies")]
    input_dir: PathBuf,

    /// Where generated candidates are written
    #[arg(long, env = "OUTPUT_SCRIPTS_DIR", default_value = "generated_policies")]
    output_dir: PathBuf,

    /// Append-only score history file
    #[arg(long, env = "SCORE_HISTORY", default_value = "score_history.csv")]
    score_history: PathBuf,

    /// Candidate file name prefix
    #[arg(long, env = "FILE_NAME_PREFIX", default_value = "cache_policy")]
    prefix: String,

    /// Minimum score persisted to the accepted store
    #[arg(long, env = "TRACE_SCORE", default_value_t = 0.5)]
    threshold: f64,

    /// Number of evaluations
    #[arg(long, env = "ITERATION", default_value_t = 5)]
    iterations: u32,

    /// Per-evaluation deadline in seconds
    #[arg(long, env = "CHAMPSIM_TIMEOUT", default_value_t = 240)]
    timeout: u64,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    #[arg(long, env = "MODEL_NAME", default_value = "gpt-4o")]
    model: String,

    #[arg(long, env = "MAX_TOKENS", default_value_t = 10_000)]
    max_tokens: u32,

    #[arg(long, env = "TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Check the API key against `GET /models` before starting
    #[arg(
        long,
        env = "ENABLE_API_KEY_VALIDATION",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    validate_api_key: bool,

    /// Evaluate inside this process instead of a `simulate` child process
    #[arg(long)]
    in_process: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json_report: bool,
}

impl SimArgs {
    fn to_config(&self) -> Result<SimulationConfig> {
        let config: ConfigId = self.config.parse()?;
        let mut toolchain = Toolchain {
            compiler: self.cxx.clone(),
            lib_dir: self.lib_dir.clone(),
            ..Toolchain::default()
        };
        if !self.cxx_flags.is_empty() {
            toolchain.flags = self.cxx_flags.clone();
        }
        Ok(SimulationConfig {
            config,
            traces: self.traces.clone(),
            warmup_instructions: self.warmup,
            simulation_instructions: self.simulation,
            binary_dir: self.outdir.clone(),
            toolchain,
            process_group: if self.inherit_process_group {
                ProcessGroup::Inherit
            } else {
                ProcessGroup::Own
            },
        })
    }
}

impl EvolveArgs {
    fn evolution_config(&self) -> Result<EvolutionConfig> {
        let config = EvolutionConfig {
            iterations: self.iterations,
            timeout_secs: self.timeout,
            acceptance_threshold: self.threshold,
        };
        config.validate()?;
        Ok(config)
    }

    fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..OracleConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = (!cli.no_log_file).then_some(cli.log_file.as_path());
    cachesmith_core::init_tracing(cli.json, level, log_file)
        .with_context(|| format!("Failed to open log file {}", cli.log_file.display()))?;

    match cli.command {
        Commands::Evolve(args) => cmd_evolve(&args).await,
        Commands::Simulate { policy, sim } => cmd_simulate(&policy, &sim).await,
    }
}

async fn cmd_evolve(args: &EvolveArgs) -> Result<()> {
    let config = args.evolution_config()?;
    let sim = args.sim.to_config()?;

    let oracle = ChatOracle::new(args.oracle_config()).context("Failed to build oracle client")?;
    if args.validate_api_key {
        oracle
            .validate_api_key()
            .await
            .context("API key validation failed")?;
    }

    let workspace = CandidateWorkspace::new(&args.output_dir, args.prefix.clone())
        .context("Failed to prepare candidate directory")?;
    let history =
        FileScoreHistory::new(&args.score_history).context("Failed to prepare score history")?;
    let accepted =
        FsAcceptedStore::new(&args.input_dir).context("Failed to prepare accepted directory")?;

    info!(
        iterations = config.iterations,
        config = %sim.config,
        traces = sim.traces.len(),
        in_process = args.in_process,
        "starting evolution"
    );

    let harness: Arc<dyn Harness> = if args.in_process {
        Arc::new(ChampSimHarness::new(sim))
    } else {
        let exe = std::env::current_exe().context("Failed to locate the cachesmith binary")?;
        Arc::new(SubprocessHarness::new(exe, sim))
    };

    let controller = EvolutionController::new(
        config,
        Arc::new(oracle),
        harness,
        workspace,
        Arc::new(history),
        Arc::new(accepted),
    )
    .with_prompts(PromptBuilder::new(&args.input_dir));

    let report = controller.run().await;
    if args.json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &EvolutionReport) {
    println!("Evolution finished after {} iteration(s)", report.iterations_run);
    println!("  Stop reason: {}", report.stop_reason);
    match report.best_score {
        Some(score) => println!("  Best score:  {score:.4}"),
        None => println!("  Best score:  -"),
    }
    for record in &report.records {
        let next = record
            .next_request
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{}] {} ({}) -> {} next: {}",
            record.iteration,
            record.candidate,
            record.request,
            record.outcome.label(),
            next
        );
    }
    for entry in &report.accepted {
        println!(
            "  Accepted {} ({:.4}) at {}",
            entry.candidate_file,
            entry.score,
            entry.stored_at.display()
        );
    }
}

async fn cmd_simulate(policy: &Path, args: &SimArgs) -> Result<()> {
    let sim = args.to_config()?;
    if !policy.is_file() {
        bail!("Policy file not found: {}", policy.display());
    }
    let candidate = load_policy(policy)?;

    let results = evaluate(&candidate, &sim)
        .await
        .with_context(|| format!("Failed to evaluate {}", policy.display()))?;
    if results.iter().any(|r| r.outcome.score().is_none()) {
        warn!(policy = %policy.display(), "some traces produced no score");
    }
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn load_policy(path: &Path) -> Result<cachesmith_core::Candidate> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Policy path has no file name")?;
    Ok(cachesmith_core::Candidate {
        file_name,
        version: 0,
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evolve_args_parse_with_defaults() {
        let cli = Cli::try_parse_from([
            "cachesmith",
            "evolve",
            "--traces",
            "a.trace.gz",
            "b.trace.gz",
            "--iterations",
            "3",
        ])
        .unwrap();
        let Commands::Evolve(args) = cli.command else {
            panic!("expected evolve");
        };
        assert_eq!(args.sim.traces.len(), 2);
        let config = args.evolution_config().unwrap();
        assert_eq!(config.iterations, 3);
        let sim = args.sim.to_config().unwrap();
        assert_eq!(sim.config, ConfigId::Config1);
        assert_eq!(sim.toolchain.flags, Toolchain::default().flags);
        assert_eq!(sim.process_group, ProcessGroup::Own);
    }

    #[test]
    fn test_unknown_config_is_rejected() {
        let cli = Cli::try_parse_from([
            "cachesmith",
            "simulate",
            "policy.cc",
            "--traces",
            "a.trace.gz",
            "--config",
            "config9",
        ])
        .unwrap();
        let Commands::Simulate { sim, .. } = cli.command else {
            panic!("expected simulate");
        };
        assert!(sim.to_config().is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let cli = Cli::try_parse_from([
            "cachesmith",
            "evolve",
            "--traces",
            "a.trace.gz",
            "--iterations",
            "0",
        ])
        .unwrap();
        let Commands::Evolve(args) = cli.command else {
            panic!("expected evolve");
        };
        assert!(args.evolution_config().is_err());
    }

    #[test]
    fn test_api_key_validation_env_accepts_capitalised_true() {
        std::env::set_var("ENABLE_API_KEY_VALIDATION", "True");
        let parsed = Cli::try_parse_from(["cachesmith", "evolve", "--traces", "a.trace.gz"]);
        std::env::remove_var("ENABLE_API_KEY_VALIDATION");

        let Commands::Evolve(args) = parsed.unwrap().command else {
            panic!("expected evolve");
        };
        assert!(args.validate_api_key);
        assert!(!args.in_process);
    }

    #[test]
    fn test_api_key_validation_flag_without_env() {
        let cli = Cli::try_parse_from([
            "cachesmith",
            "evolve",
            "--validate-api-key",
            "--traces",
            "a.trace.gz",
        ])
        .unwrap();
        let Commands::Evolve(args) = cli.command else {
            panic!("expected evolve");
        };
        assert!(args.validate_api_key);
    }

    #[test]
    fn test_simulate_child_arguments_map_into_config() {
        let cli = Cli::try_parse_from([
            "cachesmith",
            "--no-log-file",
            "simulate",
            "policy.cc",
            "--config",
            "config4",
            "--inherit-process-group",
            "--cxx-flag=-O2",
            "--cxx-flag=--std=c++17",
            "--traces",
            "a.trace.gz",
            "b.trace.gz",
        ])
        .unwrap();
        assert!(cli.no_log_file);
        let Commands::Simulate { policy, sim } = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(policy, PathBuf::from("policy.cc"));
        let sim = sim.to_config().unwrap();
        assert_eq!(sim.config, ConfigId::Config4);
        assert_eq!(sim.process_group, ProcessGroup::Inherit);
        assert_eq!(sim.toolchain.flags, vec!["-O2", "--std=c++17"]);
        assert_eq!(sim.traces.len(), 2);
    }

    #[test]
    fn test_load_policy_reads_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lru.cc");
        std::fs::write(&path, "// lru").unwrap();
        let candidate = load_policy(&path).unwrap();
        assert_eq!(candidate.file_name, "lru.cc");
        assert_eq!(candidate.source, "// lru");
    }
}
