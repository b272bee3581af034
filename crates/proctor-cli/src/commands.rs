use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use proctor_driver::{CancellationSource, Driver, DriverConfig};
use proctor_grpc::GrpcTransport;
use proctor_manifest::{format_manifest, load_path, load_paths, manifest_files, read_manifest, validate_manifest};
use proctor_report::{HumanReporter, JsonReporter};
use proctor_runner::{Orchestrator, Reporter};
use proctor_snapshot::FsSnapshotStore;

use crate::config::{OutputFormat, ProjectConfig};
use crate::RunArgs;

pub fn init(dir: &Path, force: bool) -> Result<ExitCode> {
    let path = ProjectConfig::config_path(dir);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ProjectConfig::starter().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}

pub async fn run(dir: &Path, args: RunArgs, verbose: bool) -> Result<ExitCode> {
    let project = ProjectConfig::discover(args.config.as_deref(), dir)?;

    let manifests = load_paths(&args.paths).context("load manifests")?;
    if manifests.is_empty() {
        bail!("no test manifests found in {}", display_paths(&args.paths));
    }
    let mut invalid = 0;
    for m in &manifests {
        if let Err(errs) = validate_manifest(&m.manifest) {
            eprintln!("ERROR: {}:\n{}", m.source_path.display(), indent(&errs.to_string()));
            invalid += 1;
        }
    }
    if invalid > 0 {
        bail!("{invalid} manifest(s) failed validation");
    }

    let target = args.target_config(&project.target).resolve()?;
    let transport = GrpcTransport::connect(&target)?;
    info!(%target, manifests = manifests.len(), "processor target");

    let verbose = verbose || project.output.verbose;
    let reporter: Arc<dyn Reporter> = match args.output(&project) {
        OutputFormat::Human => Arc::new(HumanReporter::stdout(verbose)),
        OutputFormat::Json => Arc::new(JsonReporter::stdout()),
    };
    let driver = Driver::new(
        transport,
        DriverConfig {
            recv_timeout: args.recv_timeout(&project.run),
        },
    );
    let orchestrator = Orchestrator::new(
        driver,
        Arc::new(FsSnapshotStore::new()),
        reporter,
        args.run_config(&project.run),
    )?;

    let source = CancellationSource::new();
    let token = source.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; no further tests will start");
            source.cancel();
        }
    });

    let result = orchestrator.run(&manifests, &token).await;
    if result.success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

pub fn validate(paths: &[PathBuf]) -> Result<ExitCode> {
    let mut failed = false;
    let (mut manifests, mut cases) = (0, 0);

    for path in paths {
        let loaded = match load_path(path) {
            Ok(loaded) => loaded,
            Err(e) => {
                eprintln!("ERROR: {}: {e:#}", path.display());
                failed = true;
                continue;
            }
        };
        for m in loaded {
            manifests += 1;
            cases += m.test_cases().len();
            match validate_manifest(&m.manifest) {
                Ok(()) => println!("OK    {}", m.source_path.display()),
                Err(errs) => {
                    eprintln!("ERROR: {}:\n{}", m.source_path.display(), indent(&errs.to_string()));
                    failed = true;
                }
            }
        }
    }

    if failed {
        eprintln!("validation failed");
        return Ok(ExitCode::FAILURE);
    }
    println!("Validated {manifests} manifest(s) with {cases} test case(s)");
    Ok(ExitCode::SUCCESS)
}

pub fn fmt(paths: &[PathBuf], write: bool, diff: bool) -> Result<ExitCode> {
    let mut files = Vec::new();
    for path in paths {
        files.extend(manifest_files(path).with_context(|| format!("collect manifests from {}", path.display()))?);
    }
    if files.is_empty() {
        bail!("no test manifests found in {}", display_paths(paths));
    }

    let single = files.len() == 1;
    let (mut changed, mut failed) = (false, false);
    for file in &files {
        match fmt_file(file, write, diff, single) {
            Ok(c) => changed |= c,
            Err(e) => {
                eprintln!("ERROR: {}: {e:#}", file.display());
                failed = true;
            }
        }
    }

    if failed {
        eprintln!("formatting failed for one or more files");
        return Ok(ExitCode::FAILURE);
    }
    if changed && !write && (diff || !single) {
        eprintln!("some files need formatting (use --write to fix)");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Returns whether the file's content differs from its canonical form.
fn fmt_file(path: &Path, write: bool, diff: bool, single: bool) -> Result<bool> {
    let original = read_manifest(path)?;
    let formatted = format_manifest(&original)?;
    let changed = original != formatted;

    if write {
        if changed {
            std::fs::write(path, &formatted).with_context(|| format!("write {}", path.display()))?;
            println!("formatted {}", path.display());
        }
    } else if diff {
        if changed {
            println!("--- {0} (original)\n+++ {0} (formatted)\n@@ changes @@", path.display());
            original.lines().for_each(|l| println!("-{l}"));
            formatted.lines().for_each(|l| println!("+{l}"));
        }
    } else if single {
        print!("{formatted}");
    } else if changed {
        println!("{} needs formatting", path.display());
    }
    Ok(changed)
}

fn indent(block: &str) -> String {
    block.lines().map(|l| format!("  {l}")).collect::<Vec<_>>().join("\n")
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}
