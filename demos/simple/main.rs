use flagsmith::{ClientConfig, MemoryAnalyticsStore, Trait};

#[tokio::main]
pub async fn main() {
    let environment_key = std::env::var("FLAGSMITH_ENVIRONMENT_KEY").unwrap();
    let client = ClientConfig::from_environment_key(environment_key)
        .enable_analytics(true)
        .analytics_store(MemoryAnalyticsStore::new())
        .to_client()
        .unwrap();

    // Evaluate a flag for test-user, storing a trait on the identity first.
    let enabled = client
        .has_flag(
            "a-boolean-flag",
            Some("test-user"),
            &[Trait::new("plan", "premium")],
        )
        .await
        // default value
        .unwrap_or(false);

    println!("Enabled: {:?}", enabled);

    let traits = client.get_traits("test-user").await;
    println!("Traits: {:?}", traits);

    if let Err(err) = client.flush_analytics().await {
        println!("Failed to upload analytics: {:?}", err);
    }
}
