use crate::commands::{checks, smoke};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use smokecheck_core::harness::Style;
use std::path::PathBuf;

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

/// Output style for PASS/FAIL lines
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StyleOption {
    /// Emoji markers
    Emoji,
    /// PASS:/FAIL: prefixes
    Plain,
}

impl From<StyleOption> for Style {
    fn from(style: StyleOption) -> Self {
        match style {
            StyleOption::Emoji => Style::Emoji,
            StyleOption::Plain => Style::Plain,
        }
    }
}

/// smokecheck subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one or more TOML suite files on a single harness
    Run {
        /// Suite files, run in the order given
        #[arg(required = true, value_name = "SUITE")]
        suites: Vec<PathBuf>,
        /// Print a banner before every check
        #[arg(long)]
        verbose: bool,
        /// Print the report as JSON on stdout (check lines go to stderr)
        #[arg(long)]
        json: bool,
    },

    /// Run a single command as a check.
    ///
    /// Usage example: `smokecheck check --name "git works" -- git --version`
    Check {
        /// Name to report the check under (defaults to the command line)
        #[arg(long)]
        name: Option<String>,
        /// Print a banner before the check
        #[arg(long)]
        verbose: bool,
        /// Program and arguments
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "COMMAND"
        )]
        command: Vec<String>,
    },

    /// Check that commands resolve on PATH
    Exists {
        #[arg(required = true, value_name = "CMD")]
        commands: Vec<String>,
    },

    /// Check that commands report a version
    Version {
        #[arg(required = true, value_name = "CMD")]
        commands: Vec<String>,
    },

    /// Check that environment variables are set and non-empty
    Env {
        #[arg(required = true, value_name = "VAR")]
        vars: Vec<String>,
    },

    /// Check that directories are writable
    Writable {
        #[arg(required = true, value_name = "DIR")]
        dirs: Vec<PathBuf>,
    },

    /// Run feature tests (shell-history, pre-commit-cache, pre-commit-hooks)
    Feature {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },

    /// Build and test devcontainer templates
    #[command(subcommand)]
    Smoke(SmokeCommands),
}

/// Template smoke actions
#[derive(Debug, Clone, Subcommand)]
pub enum SmokeCommands {
    /// Prepare a template workspace and bring its dev container up
    Build {
        /// Template identifier (directory under src/)
        template_id: String,
        /// Template repository root (defaults to the current directory)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
        /// Parent directory for the temporary workspace
        #[arg(short = 't', long, value_name = "PATH")]
        tmpdir: Option<PathBuf>,
        /// Do not install the devcontainer CLI through npm
        #[arg(long)]
        skip_cli_install: bool,
    },
    /// Run the template's smoke script inside its container, then clean up
    Test {
        /// Template identifier (directory under src/)
        template_id: String,
        /// Workspace directory printed by the build action
        #[arg(short = 't', long, required = true, value_name = "PATH")]
        tmpdir: PathBuf,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Devcontainer smoke-test harness",
    long_about = "Devcontainer smoke-test harness\n\nRuns named checks (commands, tool presence, versions, environment, cache permissions) and reports pass/fail with a CI-friendly exit code.",
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via SMOKECHECK_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Output style for check lines (defaults to the suite's style, then emoji)
    #[arg(long, global = true, value_enum)]
    pub style: Option<StyleOption>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Initialize logging, then execute the selected subcommand
    pub async fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None, // Let logging module check environment variable
        };

        let log_level = match self.log_level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        if std::env::var_os("SMOKECHECK_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var(
                "RUST_LOG",
                format!("smokecheck={},smokecheck_core={}", log_level, log_level),
            );
        }
        smokecheck_core::logging::init(log_format)?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        let style = self.style.map(Style::from);

        match self.command {
            Commands::Run {
                suites,
                verbose,
                json,
            } => checks::execute_run(&suites, style, verbose, json),
            Commands::Check {
                name,
                verbose,
                command,
            } => checks::execute_check(name.as_deref(), &command, style, verbose),
            Commands::Exists { commands } => {
                checks::execute_helpers(checks::Helper::Exists, &commands, style)
            }
            Commands::Version { commands } => {
                checks::execute_helpers(checks::Helper::Version, &commands, style)
            }
            Commands::Env { vars } => checks::execute_helpers(checks::Helper::Env, &vars, style),
            Commands::Writable { dirs } => {
                let dirs: Vec<String> = dirs
                    .iter()
                    .map(|d| d.to_string_lossy().into_owned())
                    .collect();
                checks::execute_helpers(checks::Helper::Writable, &dirs, style)
            }
            Commands::Feature { names } => checks::execute_features(&names, style),
            Commands::Smoke(action) => smoke::execute_smoke(action).await,
        }
    }
}
