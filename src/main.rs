use anyhow::Context;

use reviver::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("  export OPENAI_API_KEY=sk-...");
            std::process::exit(1);
        }
    };

    eprintln!("Reviver v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Endpoint: {}", config.llm.base_url);
    if let Some(path) = &config.config_file {
        eprintln!("   Config: {}", path.display());
    }
    eprintln!("   API: http://0.0.0.0:{}/api\n", config.port);

    let port = config.port;
    reviver::server::serve(config)
        .await
        .with_context(|| format!("Reviver server on port {port} failed"))?;

    Ok(())
}
