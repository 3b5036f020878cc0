//! `flightdeck serve`: start the HTTP gateway.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let agent = super::build_agent(&config).await?;

    eprintln!("flightdeck gateway");
    eprintln!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    eprintln!("   Model:     {}", config.provider.model);

    flightdeck_gateway::start(&config.gateway, agent).await
}
