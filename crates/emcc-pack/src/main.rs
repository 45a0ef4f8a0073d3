use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use emcc_pack::{pack, BuildRequest, PackError, PackageInfo, PipelineConfig, Toolchain};
use emcc_pack_contracts::{EMCC_PACK_REPORT_SCHEMA_VERSION, LOG_ENV};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emcc-pack")]
#[command(
    about = "Compile C/C++ with emcc and pack the wasm module as a lazily-loaded web package.",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Exported C functions, comma-separated, without the leading underscore (required).
    #[arg(long, value_name = "NAMES")]
    exports: Vec<String>,

    /// Include directory passed to emcc as `-I<DIR>`.
    /// May be passed multiple times.
    #[arg(long = "I", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Build with pthreads (adds the worker environment).
    #[arg(long)]
    thread: bool,

    /// Build with wasm SIMD.
    #[arg(long)]
    simd: bool,

    /// Leave the binding binary as `.wasm` for the bundler instead of fetching a disguised asset.
    #[arg(long)]
    inline: bool,

    /// Output base name (defaults to the package name from `package.json`).
    #[arg(long, value_name = "NAME")]
    wasmname: Option<String>,

    /// Project directory holding `package.json`; output goes to `<DIR>/pkg`.
    /// Relative include dirs and sources resolve against it.
    #[arg(long, value_name = "DIR", default_value = ".")]
    project: PathBuf,

    /// Write a JSON run report.
    #[arg(long, value_name = "PATH")]
    report_out: Option<PathBuf>,

    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[arg(short, long)]
    verbose: bool,

    /// Source files. Extra emcc arguments go after `--`.
    #[arg(value_name = "SOURCE")]
    sources: Vec<String>,
}

fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    let report_out = cli.report_out.clone();

    match try_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            if let Some(path) = report_out {
                if let Err(report_err) = write_failure_report(&path, &err) {
                    eprintln!("{report_err:#}");
                }
            }
            err.downcast_ref::<PackError>()
                .map(PackError::exit_code)
                .unwrap_or_else(|| ExitCode::from(2))
        }
    }
}

fn try_main(cli: Cli) -> Result<()> {
    let project = std::fs::canonicalize(&cli.project)
        .with_context(|| format!("project dir: {}", cli.project.display()))?;
    let package = PackageInfo::from_project(&project, cli.wasmname.as_deref())?;

    let request = BuildRequest::builder(&project, package)
        .exports(&cli.exports)
        .include_dirs(cli.include)
        .config(PipelineConfig {
            inline_binary: cli.inline,
            thread_support: cli.thread,
            simd_support: cli.simd,
        })
        .base_name(cli.wasmname)
        .trailing_args(cli.sources)
        .build()?;

    let toolchain = Toolchain::from_env();
    let report = pack(&request, &toolchain)?;

    if let Some(path) = &cli.report_out {
        report.write_to(path)?;
    }
    tracing::info!("build and pack success to {}, enjoy!!", report.out_dir);
    Ok(())
}

fn write_failure_report(path: &Path, err: &anyhow::Error) -> Result<()> {
    let kind = err
        .downcast_ref::<PackError>()
        .map(|e| e.kind().as_str())
        .unwrap_or("internal");
    let doc = serde_json::json!({
        "schema_version": EMCC_PACK_REPORT_SCHEMA_VERSION,
        "ok": false,
        "error": {
            "kind": kind,
            "message": format!("{err:#}"),
        },
    });
    let mut bytes = serde_json::to_vec_pretty(&doc)?;
    bytes.push(b'\n');
    emcc_pack::pipeline::write_report(path, &bytes)?;
    Ok(())
}
