use nexus_backend::{
    api_server,
    config::{ServerConfig, API_KEY_VAR},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env();

    println!("🤖 {} starting", api_server::SERVICE_NAME);
    println!("--------------------------------------------------");
    println!("   model:    {}", config.llm.model);
    println!("   gateway:  {}", config.llm.base_url);
    if !config.llm.key_configured() {
        println!("   ⚠️  {} not set: AI analysis will report unavailable.", API_KEY_VAR);
    }
    println!("--------------------------------------------------");

    let state = api_server::AppState::from_config(&config);
    api_server::start_api_server(config, state).await
}
