use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use proctor_grpc::TargetConfig;
use proctor_runner::RunConfig;

mod commands;
mod config;

use config::{OutputFormat, ProjectConfig, RunSection};

#[derive(Parser, Debug)]
#[command(name = "proctor", version, about = "Test runner for ext_proc external processors")]
struct Cli {
    /// Log progress at info level and name each test as it starts
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a starter proctor.toml into the current directory
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run manifests (files or directories) against a processor
    Run(RunArgs),

    /// Load and validate manifests without contacting a processor
    Validate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Rewrite manifests in canonical YAML layout
    ///
    /// A single file is printed to stdout. With several files, those that
    /// would change are listed and the exit status is non-zero.
    Fmt {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write the formatted output back to the files
        #[arg(short, long)]
        write: bool,

        /// Show what would change
        #[arg(short, long, conflicts_with = "write")]
        diff: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Processor address, host:port [default: localhost:50051]
    #[arg(long)]
    target: Option<String>,

    /// Processor Unix-domain socket
    #[arg(long, conflicts_with = "target")]
    unix_socket: Option<String>,

    #[arg(long)]
    tls: bool,

    /// Client certificate (PEM)
    #[arg(long)]
    tls_cert: Option<String>,

    /// Client private key (PEM)
    #[arg(long)]
    tls_key: Option<String>,

    /// CA bundle used to verify the processor (PEM)
    #[arg(long)]
    tls_ca: Option<String>,

    /// Server name expected in the processor's certificate
    #[arg(long)]
    tls_domain: Option<String>,

    /// Test cases to run at the same time
    #[arg(short, long)]
    parallel: Option<usize>,

    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Glob on test case names, e.g. "auth-*"
    #[arg(long)]
    filter: Option<String>,

    /// Comma-separated tags; a test case runs if it has any of them
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Capture processor responses into snapshot files instead of comparing
    #[arg(long)]
    update_snapshots: bool,

    /// Per-response timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pass test cases that end up with no expectations
    #[arg(long)]
    allow_empty_expectations: bool,

    /// Config file [default: ./proctor.toml when present]
    #[arg(long)]
    config: Option<PathBuf>,
}

impl RunArgs {
    /// Merge target flags over the file's `[target]`. Choosing a socket or an
    /// address on the command line drops the other one from the file.
    fn target_config(&self, file: &TargetConfig) -> TargetConfig {
        let flags = self.target_overrides();
        let mut base = file.clone();
        if flags.unix_socket.is_some() {
            base.address = None;
        }
        if flags.address.is_some() {
            base.unix_socket = None;
        }
        base.merged(&flags)
    }

    fn target_overrides(&self) -> TargetConfig {
        TargetConfig {
            address: self.target.clone(),
            unix_socket: self.unix_socket.clone(),
            tls: self.tls,
            tls_cert: self.tls_cert.clone(),
            tls_key: self.tls_key.clone(),
            tls_ca: self.tls_ca.clone(),
            tls_domain: self.tls_domain.clone(),
        }
    }

    fn run_config(&self, file: &RunSection) -> RunConfig {
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        RunConfig {
            parallel: self.parallel.or(file.parallel).unwrap_or(1),
            filter: self.filter.clone().or_else(|| file.filter.clone()),
            tags: if tags.is_empty() { file.tags.clone() } else { tags },
            update_snapshots: self.update_snapshots,
            allow_empty_expectations: self.allow_empty_expectations || file.allow_empty_expectations,
        }
    }

    fn recv_timeout(&self, file: &RunSection) -> Option<Duration> {
        self.timeout_ms.or(file.timeout_ms).map(Duration::from_millis)
    }

    fn output(&self, project: &ProjectConfig) -> OutputFormat {
        self.output.unwrap_or(project.output.format)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let cwd = std::env::current_dir()?;
    match cli.cmd {
        Command::Init { force } => commands::init(&cwd, force),
        Command::Run(args) => commands::run(&cwd, args, cli.verbose).await,
        Command::Validate { paths } => commands::validate(&paths),
        Command::Fmt { paths, write, diff } => commands::fmt(&paths, write, diff),
    }
}
