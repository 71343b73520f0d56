use clap::{Parser, ValueEnum};
use loan_core::{ArtifactPaths, ScaleWriteback};
use loan_service::{build_router, ServiceConfig, ServiceState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WritebackMode {
    /// Feed full-precision standardised values to the model.
    Exact,
    /// Truncate amounts and standardised values to integers, as the Streamlit app did.
    Integer,
}

impl From<WritebackMode> for ScaleWriteback {
    fn from(mode: WritebackMode) -> Self {
        match mode {
            WritebackMode::Exact => ScaleWriteback::Exact,
            WritebackMode::Integer => ScaleWriteback::Integer,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "loand", version, about = "Smart Loan Approval System web service")]
struct Cli {
    /// Socket address to bind, e.g. 127.0.0.1:8501
    #[arg(long, default_value = "127.0.0.1:8501", env = "LOAN_LISTEN")]
    listen: SocketAddr,
    /// Exported stacking ensemble (JSON). The bundled models/stack_model.json is a
    /// hand-authored sample, not a trained model; export the real one with
    /// scripts/export_artifacts.py.
    #[arg(long, default_value = "models/stack_model.json", env = "LOAN_MODEL_PATH")]
    model_path: PathBuf,
    /// Exported standard scaler for the income and loan amount columns (JSON).
    #[arg(long, default_value = "models/scaler.json", env = "LOAN_SCALER_PATH")]
    scaler_path: PathBuf,
    /// How standardised income and loan amount values are written back.
    #[arg(long, value_enum, default_value_t = WritebackMode::Exact, env = "LOAN_SCALE_WRITEBACK")]
    scale_writeback: WritebackMode,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "loan_service=info,loan_core=info,info".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig {
        artifacts: ArtifactPaths::new(cli.model_path, cli.scaler_path),
        writeback: cli.scale_writeback.into(),
    };
    let state = ServiceState::bootstrap(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!("loan-service listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
