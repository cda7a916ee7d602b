use docup_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (engines, storage, routes)
    let (_state, router) = docup_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    docup_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
