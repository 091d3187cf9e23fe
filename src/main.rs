use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use taint_bench::config::SuiteConfig;
use taint_bench::harness::Harness;
use taint_bench::mode::AnalysisMode;
use taint_bench::report::{print_variants, red};
use termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "taint_bench", about = "Runs taint-annotated benchmarks under each analysis variant")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the benchmark suite.
    Run {
        /// Suite configuration (TOML); the built-in suite when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to append per-run timings.
        #[arg(long)]
        results_dir: Option<PathBuf>,
        /// Only run these benchmarks.
        #[arg(long = "benchmark")]
        benchmarks: Vec<String>,
        /// Only run variants in this analysis mode, e.g. TAINT_ANALYSIS.
        #[arg(long)]
        mode: Option<AnalysisMode>,
    },
    /// List every benchmark variant and its analysis mode.
    Variants,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut out = StandardStream::stdout(ColorChoice::Auto);
    match try_main(args, &mut out) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let _ = red(&mut out, true, &format!("error: {e:#}\n"));
            ExitCode::FAILURE
        }
    }
}

fn try_main(args: Args, out: &mut StandardStream) -> anyhow::Result<bool> {
    match args.command {
        Command::Run {
            config,
            results_dir,
            benchmarks,
            mode,
        } => {
            let mut config = match config {
                Some(path) => SuiteConfig::load(&path)?,
                None => SuiteConfig::default(),
            };
            config.retain_benchmarks(&benchmarks);

            let mut harness = Harness::new(&config);
            if let Some(dir) = results_dir {
                harness = harness.results_dir(dir);
            }
            if let Some(mode) = mode {
                harness = harness.mode(mode);
            }
            let summary = harness.run(&mut *out)?;
            tracing::info!(passed = summary.passed, failed = summary.failed, "suite finished");
            Ok(summary.failed == 0)
        }
        Command::Variants => {
            print_variants(out)?;
            Ok(true)
        }
    }
}
