//! `flightdeck tools`: print the catalog the model sees.

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let tools = super::build_tools(&config).await;

    // The catalog doesn't need a model; skip provider setup.
    let specs = tools.list_tools().await?;

    println!("Tools ({} via {}):", specs.len() + 1, tools.name());
    let annotate = flightdeck_agent::annotate_spec();
    for spec in std::iter::once(annotate).chain(specs) {
        println!("  {:<36} {}", spec.name, spec.description);
    }

    Ok(())
}
