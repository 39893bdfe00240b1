//! Example of using the shared webui-api client.
//!
//! Loads the client configuration from YAML, logs in, listens for auth
//! events and reads a few Redfish resources twice to show revalidation.
//!
//! ```sh
//! RUST_LOG=webui_api=debug cargo run -p webui-api-demos --example client -- https://bmc.example
//! ```

use serde_json::json;
use tracing_subscriber::EnvFilter;
use webui_api::{ApiClient, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("webui_api=debug,webui_api_cache=debug")),
        )
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://localhost:8443".to_owned());

    let config_yaml = format!(
        r#"
        base_url: {base_url}
        timeout: 30s
        routes:
          login: /login
          change_password: /change-password
        cache:
          methods: [GET]
          etag: true
          ttl: 0s
        storage:
          Memory:
            max_entries: 1000
        "#
    );
    let config = ClientConfig::from_yaml(&config_yaml)?;
    let client = ApiClient::from_config(&config)?;

    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.redirect() {
                Some(route) => println!("auth event for {}: navigate to {route}", event.url()),
                None => println!("auth event for {}: unauthorized", event.url()),
            }
            if event.requires_logout() {
                println!("clearing session");
            }
        }
    });

    let username = std::env::var("BMC_USER").unwrap_or_else(|_| "root".to_owned());
    let password = std::env::var("BMC_PASSWORD").unwrap_or_else(|_| "0penBmc".to_owned());
    let session = client
        .post(
            "/redfish/v1/SessionService/Sessions",
            &json!({ "UserName": username, "Password": password }),
            None,
        )
        .await?;
    if let Some(token) = session
        .headers()
        .get("x-auth-token")
        .and_then(|value| value.to_str().ok())
    {
        client.set_auth_token(token)?;
    }

    for round in 1..=2 {
        println!("=== Round {round} ===");
        let response = client.get("/redfish/v1/Managers/bmc", None).await?;
        println!("Status: {}", response.status());
        println!("Cache status: {:?}", response.cache_status());
        println!("Body length: {} bytes", response.body().len());
    }

    Ok(())
}
