use clap::Parser;
use frame_transforms::{run, Args, TransformError};

use tracing::{info, metadata::LevelFilter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), TransformError> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("LOG_LEVEL")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("frame-transforms is starting...");
    let args = Args::parse();
    tokio::select! {
        ret = run(args) => ret,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping");
            Err(TransformError::Interrupted)
        }
    }
}
