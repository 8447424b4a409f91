// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_cli::{plan_model, ModelPlan};
use glm_core::{GlmError, ModelSpec};
use glm_stats::{
    correl, l1_regress, mad_med, ttest1, ttest2, zscore, L1Config, TestResult,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct Cli {
    command: Command,
}

enum Command {
    Plan(PlanArgs),
    Stats(StatsArgs),
}

#[derive(Debug, Default)]
struct PlanArgs {
    subject: String,
    config: PathBuf,
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct StatsArgs {
    input: PathBuf,
    output: Option<PathBuf>,
}

#[derive(Debug)]
enum CliError {
    Glm(GlmError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Glm(err) => err.code(),
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glm(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<GlmError> for CliError {
    fn from(value: GlmError) -> Self {
        Self::Glm(value)
    }
}

/// Statistical request document accepted by the `stats` command.
#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum StatsRequest {
    Zscore {
        values: Vec<f64>,
    },
    MadMed {
        values: Vec<f64>,
    },
    RobustRegression {
        y: Vec<f64>,
        predictors: Vec<Vec<f64>>,
        #[serde(default)]
        max_iterations: Option<usize>,
    },
    Ttest1 {
        sample: Vec<f64>,
    },
    Ttest2 {
        sample_a: Vec<f64>,
        sample_b: Vec<f64>,
    },
    Correl {
        x: Vec<f64>,
        y: Vec<f64>,
    },
}

#[derive(Serialize)]
struct PlanOutput {
    command: &'static str,
    subject: String,
    config: String,
    plan: ModelPlan,
}

#[derive(Serialize)]
struct ValuesOutput {
    command: &'static str,
    method: &'static str,
    values: Vec<f64>,
}

#[derive(Serialize)]
struct ScalarOutput {
    command: &'static str,
    method: &'static str,
    value: f64,
}

#[derive(Serialize)]
struct RobustOutput {
    command: &'static str,
    method: &'static str,
    coefficients: Vec<f64>,
    iterations: usize,
    converged: bool,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct TestOutput {
    command: &'static str,
    method: &'static str,
    result: TestResult,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };

    match cli.command {
        Command::Plan(args) => handle_plan(args),
        Command::Stats(args) => handle_stats(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].clone();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "plan" => Command::Plan(parse_plan_args(rest)?),
        "stats" => Command::Stats(parse_stats_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: plan, stats"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_plan_args(tokens: &[String]) -> Result<PlanArgs, CliError> {
    let mut args = PlanArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--subject" => {
                args.subject = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            _ => {
                return Err(CliError::invalid_input(format!(
                    "unknown option '{flag}' for plan"
                )));
            }
        }
        idx += 1;
    }
    if args.subject.is_empty() {
        return Err(CliError::invalid_input("plan requires --subject <id>"));
    }
    if args.config.as_os_str().is_empty() {
        return Err(CliError::invalid_input("plan requires --config <path>"));
    }
    Ok(args)
}

fn parse_stats_args(tokens: &[String]) -> Result<StatsArgs, CliError> {
    let mut args = StatsArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            _ => {
                return Err(CliError::invalid_input(format!(
                    "unknown option '{flag}' for stats"
                )));
            }
        }
        idx += 1;
    }
    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("stats requires --input <path>"));
    }
    Ok(args)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn print_version() {
    println!("glm {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "glm {}\n\nUSAGE:\n  glm <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  plan    Validate and assemble a first-level design without estimation\n  stats   Run a statistical routine over a JSON request document\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nRun 'glm <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "plan" => {
            println!(
                "USAGE:\n  glm plan --subject <id> --config <model.json> [OPTIONS]\n\nOPTIONS:\n  --subject <id>        Required subject identifier\n  --config <path>       Required model configuration JSON\n  --output <path>       Write JSON output to file"
            );
            Ok(())
        }
        "stats" => {
            println!(
                "USAGE:\n  glm stats --input <request.json> [OPTIONS]\n\nOPTIONS:\n  --input <path>        Required request JSON with a \"method\" field\n                        (zscore, mad_med, robust_regression, ttest1, ttest2, correl)\n  --output <path>       Write JSON output to file"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: plan, stats"
        ))),
    }
}

fn handle_plan(args: PlanArgs) -> Result<(), CliError> {
    tracing::info!(subject = %args.subject, config = %args.config.display(), "planning model");
    let spec = load_model_spec(args.config.as_path())?;
    let plan = plan_model(args.subject.as_str(), spec)?;

    write_json_output(
        &PlanOutput {
            command: "plan",
            subject: args.subject,
            config: args.config.display().to_string(),
            plan,
        },
        args.output.as_deref(),
    )
}

fn handle_stats(args: StatsArgs) -> Result<(), CliError> {
    let raw = fs::read_to_string(args.input.as_path()).map_err(|source| {
        CliError::io(
            format!("failed to read '{}'", args.input.display()),
            source,
        )
    })?;
    let request: StatsRequest = serde_json::from_str(raw.as_str()).map_err(|source| {
        CliError::json(
            format!("invalid stats request in '{}'", args.input.display()),
            source,
        )
    })?;

    match request {
        StatsRequest::Zscore { values } => write_json_output(
            &ValuesOutput {
                command: "stats",
                method: "zscore",
                values: zscore(&values)?,
            },
            args.output.as_deref(),
        ),
        StatsRequest::MadMed { values } => write_json_output(
            &ScalarOutput {
                command: "stats",
                method: "mad_med",
                value: mad_med(&values)?,
            },
            args.output.as_deref(),
        ),
        StatsRequest::RobustRegression {
            y,
            predictors,
            max_iterations,
        } => {
            let mut config = L1Config::default();
            if let Some(cap) = max_iterations {
                config.max_iterations = cap;
            }
            let fit = l1_regress(&y, &predictors, &config)?;
            let mut warnings = Vec::new();
            if !fit.converged {
                warnings.push(format!(
                    "robust regression did not converge within {} iterations",
                    config.max_iterations
                ));
            }
            write_json_output(
                &RobustOutput {
                    command: "stats",
                    method: "robust_regression",
                    coefficients: fit.coefficients,
                    iterations: fit.iterations,
                    converged: fit.converged,
                    warnings,
                },
                args.output.as_deref(),
            )
        }
        StatsRequest::Ttest1 { sample } => write_json_output(
            &TestOutput {
                command: "stats",
                method: "ttest1",
                result: ttest1(&sample)?,
            },
            args.output.as_deref(),
        ),
        StatsRequest::Ttest2 { sample_a, sample_b } => write_json_output(
            &TestOutput {
                command: "stats",
                method: "ttest2",
                result: ttest2(&sample_a, &sample_b)?,
            },
            args.output.as_deref(),
        ),
        StatsRequest::Correl { x, y } => write_json_output(
            &TestOutput {
                command: "stats",
                method: "correl",
                result: correl(&y, &x)?,
            },
            args.output.as_deref(),
        ),
    }
}

fn load_model_spec(path: &Path) -> Result<ModelSpec, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    serde_json::from_str(raw.as_str()).map_err(|source| {
        CliError::json(
            format!("invalid model configuration in '{}'", path.display()),
            source,
        )
    })
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}
