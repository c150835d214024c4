use clap::Parser;

use gateway::config::load_config;
use gateway::handler::Registry;
use gateway::{admin, observability, Gateway};

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "Pluggable reverse-proxy gateway", long_about = None)]
struct Cli {
    /// Configuration source: a local JSON file path or an http(s) URL.
    #[arg(default_value = "gateway.json")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::logging::init();

    let cli = Cli::parse();
    tracing::info!(source = %cli.config, "loading configuration");
    let config = load_config(&cli.config).await?;

    let gateway = Gateway::new(config, Registry::with_builtins())?;

    if let Some(admin_config) = gateway.config().admin.clone() {
        let state = admin::AdminState::new(gateway.state(), admin_config.access_token.clone());
        tokio::spawn(async move {
            if let Err(e) = admin::serve(state, admin_config).await {
                tracing::error!(error = %e, "management listener failed");
            }
        });
    }

    gateway.serve().await?;

    tracing::info!("shutdown complete");
    Ok(())
}
