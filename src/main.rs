use substitch::{config::Config, server};
use tracing::{error, info};

fn main() {
    // Setup logging
    tracing_subscriber::fmt::init();

    info!("🚀 Starting Substitch - HLS subtitle interceptor");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Running in {} mode with {} workers",
        if config.is_dev { "DEV" } else { "PROD" },
        config.worker_threads
    );

    // Interception requests run on their own bounded pool
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name("substitch-worker")
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(server::start(config)) {
        error!("Failed to start server: {}", e);
        std::process::exit(1);
    }
}
