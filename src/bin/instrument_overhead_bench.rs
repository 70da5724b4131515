use clap::{Parser, Subcommand, ValueEnum};
use instrument_overhead_bench::adapter::{
    Backend, CountingInstrument, Instrument, NoopInstrument, TracingInstrument,
};
use instrument_overhead_bench::driver::{FibonacciParams, MatmulParams, Runner};
use instrument_overhead_bench::harness::{BenchConfig, Profile};
use instrument_overhead_bench::kernels::matmul::Fill;
use instrument_overhead_bench::schema::{KernelRun, OverheadReport, RunMeta};
use instrument_overhead_bench::{BenchResult, KernelFlavor, RuntimeDataset};
use serde_json::json;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FillArg {
    Standard,
    Ones,
    Seeded,
}

impl FillArg {
    fn into_fill(self, seed: u64) -> Fill {
        match self {
            FillArg::Standard => Fill::Standard,
            FillArg::Ones => Fill::Ones,
            FillArg::Seeded => Fill::Seeded(seed),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dense matrix multiply with one region around every inner k-loop.
    Matmul {
        /// Matrix dimension (matrices are SIZE x SIZE). Defaults to the profile value.
        #[arg(long)]
        size: Option<usize>,

        /// Multiplies per timed pass. Defaults to the profile value.
        #[arg(long)]
        inner_iters: Option<u64>,

        #[arg(long)]
        repetitions: Option<u64>,

        /// Kernel formulation ("cxx" is accepted for native).
        #[arg(long, value_enum, default_value_t = KernelFlavor::C)]
        flavor: KernelFlavor,

        #[arg(long, value_enum, default_value_t = FillArg::Standard)]
        fill: FillArg,
    },

    /// Recursive Fibonacci with one region per call above the cutoff.
    Fibonacci {
        #[arg(long, short = 'n')]
        n: Option<u64>,

        /// Calls at or below this argument are not instrumented.
        #[arg(long)]
        cutoff: Option<u64>,

        #[arg(long)]
        repetitions: Option<u64>,
    },

    /// Run both kernels (every compiled-in matmul flavor) with profile defaults.
    Suite,
}

#[derive(Parser, Debug)]
#[command(name = "instrument-overhead-bench")]
#[command(about = "Instrumentation overhead runner (JSON output)")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    /// Seed for the `seeded` matrix fill.
    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = Backend::Noop, global = true)]
    backend: Backend,

    /// Also run with the no-op backend and report overhead against it.
    #[arg(long, default_value_t = false, global = true)]
    compare_noop: bool,

    /// Where to write the JSON report. If omitted, prints to stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

fn now_utc_rfc3339() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    // Best-effort: read from environment set by CI/build scripts.
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn init_logging() -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)
}

fn run_matmul(backend: Backend, params: &MatmulParams) -> BenchResult<RuntimeDataset> {
    fn go<I: Instrument>(inst: I, params: &MatmulParams) -> BenchResult<RuntimeDataset> {
        Runner::new(inst).matmul(params)
    }
    match backend {
        Backend::Noop => go(NoopInstrument, params),
        Backend::Counting => go(CountingInstrument::new(), params),
        Backend::Tracing => go(TracingInstrument::new(), params),
    }
}

fn run_fibonacci(backend: Backend, params: &FibonacciParams) -> BenchResult<RuntimeDataset> {
    fn go<I: Instrument>(inst: I, params: &FibonacciParams) -> BenchResult<RuntimeDataset> {
        Runner::new(inst).fibonacci(params)
    }
    match backend {
        Backend::Noop => go(NoopInstrument, params),
        Backend::Counting => go(CountingInstrument::new(), params),
        Backend::Tracing => go(TracingInstrument::new(), params),
    }
}

fn matmul_run(args: &Args, params: &MatmulParams) -> io::Result<KernelRun> {
    if !params.flavor.is_available() {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("matmul flavor '{}' not compiled in", params.flavor.as_str()),
        ));
    }

    let dataset = run_matmul(args.backend, params).map_err(io::Error::other)?;
    let title = format!(
        "[{}] matmul ({})",
        params.flavor.as_str(),
        args.backend.as_str()
    );
    print_info(&dataset, &title);

    let run = KernelRun::new(
        format!("matmul.{}", params.flavor.as_str()),
        json!({
            "size": params.size,
            "inner_iters": params.inner_iters,
            "repetitions": params.repetitions,
            "fill": params.fill.as_str(),
        }),
        dataset,
    );

    if args.compare_noop && args.backend != Backend::Noop {
        let noop = run_matmul(Backend::Noop, params).map_err(io::Error::other)?;
        return Ok(run.with_noop_reference(&noop));
    }
    Ok(run)
}

fn fibonacci_run(args: &Args, params: &FibonacciParams) -> io::Result<KernelRun> {
    let dataset = run_fibonacci(args.backend, params).map_err(io::Error::other)?;
    print_info(&dataset, &format!("fibonacci ({})", args.backend.as_str()));

    let run = KernelRun::new(
        "fibonacci",
        json!({
            "n": params.n,
            "cutoff": params.cutoff,
            "repetitions": params.repetitions,
        }),
        dataset,
    );

    if args.compare_noop && args.backend != Backend::Noop {
        let noop = run_fibonacci(Backend::Noop, params).map_err(io::Error::other)?;
        return Ok(run.with_noop_reference(&noop));
    }
    Ok(run)
}

fn format_column(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:10.3e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_info(dataset: &RuntimeDataset, label: &str) {
    eprintln!("\n{label}");
    eprintln!("\t{:20} : {}", "entries", dataset.entries());
    eprintln!("\t{:20} : {}", "runtime (sec)", format_column(&dataset.elapsed_times()));
    eprintln!("\t{:20} : {}", "overhead (sec)", format_column(&dataset.overheads()));
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    init_logging()?;

    let cfg = BenchConfig {
        profile: args.profile.into(),
        seed: args.seed,
    };

    let mut runs = Vec::new();

    match &args.cmd {
        Command::Matmul {
            size,
            inner_iters,
            repetitions,
            flavor,
            fill,
        } => {
            let params = MatmulParams {
                size: size.unwrap_or_else(|| cfg.matmul_size()),
                inner_iters: inner_iters.unwrap_or_else(|| cfg.matmul_inner_iters()),
                repetitions: repetitions.unwrap_or_else(|| cfg.repetitions()),
                flavor: *flavor,
                fill: fill.into_fill(cfg.seed),
            };
            runs.push(matmul_run(&args, &params)?);
        }
        Command::Fibonacci {
            n,
            cutoff,
            repetitions,
        } => {
            let params = FibonacciParams {
                n: n.unwrap_or_else(|| cfg.fibonacci_n()),
                cutoff: cutoff.unwrap_or_else(|| cfg.fibonacci_cutoff()),
                repetitions: repetitions.unwrap_or_else(|| cfg.repetitions()),
            };
            runs.push(fibonacci_run(&args, &params)?);
        }
        Command::Suite => {
            for flavor in [KernelFlavor::C, KernelFlavor::Native] {
                if !flavor.is_available() {
                    tracing::warn!(
                        flavor = flavor.as_str(),
                        "skipping matmul flavor not compiled in"
                    );
                    continue;
                }
                let params = MatmulParams {
                    size: cfg.matmul_size(),
                    inner_iters: cfg.matmul_inner_iters(),
                    repetitions: cfg.repetitions(),
                    flavor,
                    fill: Fill::Standard,
                };
                runs.push(matmul_run(&args, &params)?);
            }

            let params = FibonacciParams {
                n: cfg.fibonacci_n(),
                cutoff: cfg.fibonacci_cutoff(),
                repetitions: cfg.repetitions(),
            };
            runs.push(fibonacci_run(&args, &params)?);
        }
    }

    let report = OverheadReport {
        run: RunMeta {
            schema_version: 1,
            bench_version: env!("CARGO_PKG_VERSION").to_string(),
            profile: cfg.profile.as_str().to_string(),
            backend: args.backend.as_str().to_string(),
            seed: cfg.seed,
            timestamp_utc: now_utc_rfc3339(),
            git_sha: git_sha_short(),
        },
        runs,
    };

    let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
    if let Some(out) = &args.out {
        fs::write(out, json)?;
    } else {
        println!("{json}");
    }

    Ok(())
}
