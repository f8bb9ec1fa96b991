//! zk-eligibility command line
//!
//! ```text
//! zk-eligibility setup   [--out DIR] [--seed N]        write a development bundle
//! zk-eligibility prove   --balance X --gpa Y           one proof record on stdout
//! zk-eligibility verify  [FILE]                        re-verify a proof record
//! zk-eligibility batch                                 JSON lines in, JSON lines out
//! ```
//!
//! Every record on stdout is JSON; logs go to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zk_eligibility_circuits::{ConstraintModel, Fr};
use zk_eligibility_service::{
    error::describe_json_error, services::Verifier, AppState, Config, EligibilityRequest,
    FailureResponse, ProofError, ProofResponse, SetupArtifacts,
};

#[derive(Parser)]
#[command(name = "zk-eligibility", version, about = "Private scholarship eligibility proofs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single-party development setup and write the bundle
    Setup {
        /// Output directory (defaults to BUNDLE_PATH)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Deterministic setup seed (tests and demos only)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Prove one applicant
    Prove {
        #[arg(long)]
        balance: f64,
        #[arg(long)]
        gpa: f64,
    },
    /// Verify a proof record (file argument or stdin)
    Verify { file: Option<PathBuf> },
    /// Prove every JSON request line read from stdin
    Batch,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 로깅 초기화 (RUST_LOG=debug,zk_eligibility_service=trace)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zk_eligibility_service=info,zk_eligibility=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing::info!(environment = ?config.environment, "configuration loaded");

    match cli.command {
        Command::Setup { out, seed } => setup(config, out, seed),
        Command::Prove { balance, gpa } => {
            let state = initialize(config)?;
            let reply = state
                .pool
                .handle(EligibilityRequest {
                    bank_balance: balance,
                    gpa,
                })
                .await;
            println!("{}", serde_json::to_string(&reply)?);
            Ok(())
        }
        Command::Verify { file } => verify(config, file),
        Command::Batch => batch(initialize(config)?).await,
    }
}

fn initialize(config: Config) -> Result<AppState> {
    let bundle = config.bundle_path.clone();
    let state = AppState::initialize(config).map_err(|err| {
        tracing::error!(error = %err, "refusing to serve without valid setup artifacts");
        err
    });
    state.with_context(|| format!("Failed to load setup bundle at {}", bundle.display()))
}

fn setup(config: Config, out: Option<PathBuf>, seed: Option<u64>) -> Result<()> {
    if config.is_production() {
        bail!("development setup is disabled when ENVIRONMENT=production");
    }

    let model = Arc::new(ConstraintModel::<Fr>::compile(config.policy()?)?);
    let artifacts = match seed {
        Some(seed) => SetupArtifacts::generate(model, &mut StdRng::seed_from_u64(seed))?,
        None => SetupArtifacts::generate(model, &mut rand::rngs::OsRng)?,
    };

    let out = out.unwrap_or(config.bundle_path);
    artifacts.write(&out)?;

    println!(
        "{}",
        serde_json::json!({
            "bundleId": artifacts.bundle_id().to_hex(),
            "modelId": artifacts.model().id().to_hex(),
            "path": out.display().to_string(),
        })
    );
    Ok(())
}

fn verify(config: Config, file: Option<PathBuf>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    let state = initialize(config)?;

    let result = serde_json::from_str::<ProofResponse>(&text)
        .map_err(|e| ProofError::InvalidRequest(describe_json_error(&e)))
        .and_then(|record| record.decode())
        .and_then(|(proof, signals)| {
            let verified =
                Verifier::new().verify(&proof, &signals, state.artifacts.verification_key())?;
            Ok((verified, signals.eligible()))
        });

    let output = match result {
        Ok((verified, eligible)) => {
            serde_json::json!({ "verified": verified, "eligible": eligible })
        }
        Err(err) => serde_json::to_value(FailureResponse::from(&err))?,
    };
    println!("{}", output);
    Ok(())
}

async fn batch(state: AppState) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    let served = state
        .pool
        .serve_lines(input, &mut tokio::io::stdout())
        .await?;
    tracing::info!(requests = served, "batch finished");
    Ok(())
}
