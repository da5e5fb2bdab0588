use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mpc_latency_bench::config::{BenchmarkConfig, Environment, Profile, DEFAULT_GEO_ENDPOINT};
use mpc_latency_bench::error::BenchError;
use mpc_latency_bench::registry::Registry;
use mpc_latency_bench::{report, suite, BenchmarkType};

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

#[derive(Subcommand, Debug)]
enum Command {
    /// Message signing latency.
    Message,

    /// Transaction signing latency (signing call only; construction is not timed).
    Transaction,

    /// Message signing followed by transaction signing.
    Comprehensive,

    /// List registered providers and exit.
    Providers,
}

#[derive(Parser, Debug)]
#[command(name = "mpc-latency-bench")]
#[command(about = "Wallet signing latency benchmarks across key-management providers")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    /// Seed for in-process key generation.
    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Measured iterations; defaults to the profile's value.
    #[arg(long, global = true)]
    iterations: Option<usize>,

    /// Warm-up iterations; defaults to the profile's value.
    #[arg(long, global = true)]
    warmup: Option<usize>,

    /// Directory the JSON report is written to.
    #[arg(long, default_value = "results", global = true)]
    results_dir: PathBuf,

    /// Benchmark a single provider. Any setup failure is then fatal.
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Abort on any provider setup failure instead of skipping the provider.
    #[arg(long, default_value_t = false, global = true)]
    strict: bool,

    /// JSON-RPC endpoint for recent block hashes. Without it reference points are synthetic.
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[arg(long, default_value = DEFAULT_GEO_ENDPOINT, global = true)]
    geo_endpoint: String,

    /// Skip the geolocation lookup.
    #[arg(long, default_value_t = false, global = true)]
    no_geo: bool,

    /// Print the JSON report to stdout instead of writing a file. The summary goes to stderr.
    #[arg(long, default_value_t = false, global = true)]
    no_write: bool,

    #[command(subcommand)]
    cmd: Command,
}

impl Args {
    fn config(&self, benchmark: BenchmarkType) -> BenchmarkConfig {
        let mut cfg = BenchmarkConfig::new(benchmark, self.profile.into());
        if let Some(iterations) = self.iterations {
            cfg.iterations = iterations;
        }
        if let Some(warmup) = self.warmup {
            cfg.warmup_iterations = warmup;
        }
        cfg.seed = self.seed;
        cfg.results_dir = self.results_dir.clone();
        cfg.provider = self.provider.clone();
        cfg.strict = self.strict || self.provider.is_some();
        cfg.chain_rpc_url = self.rpc_url.clone();
        cfg.geo_endpoint = (!self.no_geo).then(|| self.geo_endpoint.clone());
        cfg
    }
}

async fn run(args: Args) -> Result<(), BenchError> {
    let benchmark = match &args.cmd {
        Command::Message => BenchmarkType::MessageSigning,
        Command::Transaction => BenchmarkType::TransactionSigning,
        Command::Comprehensive => BenchmarkType::Comprehensive,
        Command::Providers => {
            for name in Registry::builtin().names() {
                println!("{name}");
            }
            return Ok(());
        }
    };

    let cfg = args.config(benchmark);
    let report = suite::run(Registry::builtin(), Environment::capture(), &cfg).await?;

    if args.no_write {
        eprintln!("{}", report::render_console(&report));
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report::render_console(&report));
        let path = report::write(&report, &cfg.results_dir)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

/// A missing `.env` is normal; anything else is worth reporting.
fn env_file_problem<T>(result: dotenvy::Result<T>) -> Option<dotenvy::Error> {
    match result {
        Ok(_) => None,
        Err(err) if err.not_found() => None,
        Err(err) => Some(err),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Credentials may live in a local .env; absence is fine.
    if let Some(err) = env_file_problem(dotenvy::dotenv()) {
        warn!(error = %err, "ignoring unreadable .env file");
    }

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_write_flag_parses_after_subcommand() {
        let args = Args::try_parse_from(["mpc-latency-bench", "message", "--no-write"]).unwrap();
        assert!(args.no_write);
        assert!(Args::try_parse_from(["mpc-latency-bench", "message", "--stdout"]).is_err());
    }

    #[test]
    fn provider_flag_implies_strict() {
        let args =
            Args::try_parse_from(["mpc-latency-bench", "--provider", "Turnkey", "transaction"])
                .unwrap();
        let cfg = args.config(BenchmarkType::TransactionSigning);
        assert!(cfg.strict);
        assert_eq!(cfg.provider.as_deref(), Some("Turnkey"));
    }

    #[test]
    fn missing_env_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dotenvy::from_path(dir.path().join(".env"));
        assert!(env_file_problem(missing).is_none());
    }

    #[test]
    fn malformed_env_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "MPC_BENCH_BROKEN=\"unterminated\n").unwrap();
        let err = env_file_problem(dotenvy::from_path(&path)).unwrap();
        assert!(!err.not_found());
    }
}
