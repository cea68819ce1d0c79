use clap::Parser;
use rpa_dashboard::app;
use rpa_dashboard::config::Config;

/// Main entry point for the dashboard web server
///
/// Reads configuration from flags and `RPA_*` environment variables, sets up
/// logging (`RUST_LOG`, `info` by default) and serves until interrupted.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    // Start the web application with the parsed configuration
    app::run(config).await
}
