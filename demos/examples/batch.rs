//! Example of batching requests with `all_settled` and `spread`.

use tracing_subscriber::EnvFilter;
use url::Url;
use webui_api::{ApiClient, ApiResponse, get_response_count};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("webui_api=debug"))
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://localhost:8443".to_owned());
    let client = ApiClient::builder(Url::parse(&base_url)?).build()?;
    if let Ok(token) = std::env::var("BMC_TOKEN") {
        client.set_auth_token(&token)?;
    }

    let accounts = [
        "/redfish/v1/AccountService/Accounts/operator",
        "/redfish/v1/AccountService/Accounts/readonly",
    ];
    let results = client
        .all_settled(accounts.iter().map(|path| client.delete(path, None)))
        .await;
    let count = get_response_count(&results);
    println!(
        "Deleted {} of {} accounts",
        count.success_count,
        count.total()
    );

    let responses = client
        .all([
            client.get("/redfish/v1/Systems/system", None),
            client.get("/redfish/v1/Managers/bmc", None),
        ])
        .await?;
    let summary = client.spread(|system: ApiResponse, bmc: ApiResponse| {
        let power = system
            .data()
            .and_then(|data| data["PowerState"].as_str().map(str::to_owned));
        let firmware = bmc
            .data()
            .and_then(|data| data["FirmwareVersion"].as_str().map(str::to_owned));
        format!("power: {power:?}, firmware: {firmware:?}")
    });
    println!("{}", summary(responses)?);

    Ok(())
}
