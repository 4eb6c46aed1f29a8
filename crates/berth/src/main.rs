use berth::runtime::boot;

/// Boot the configured backend and print a snapshot of what it manages.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (service, _config) = boot::boot().await?;
    let snapshot = service.list(None).await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
