//! Example: Reading and writing a list
//!
//! Loads the client configuration (environment or `spbridge.{json,toml}`),
//! reads a list, adds an item and updates it again.
//!
//! # Setup
//!
//! 1. Point the client at a site: ```bash export
//!    SPBRIDGE_PRODUCTION_HOSTS=contoso.sharepoint.com
//!    SPBRIDGE_SITE=https://contoso.sharepoint.com/sites/Team/ ```
//!
//! 2. Run this example: ```bash cargo run --example list_roundtrip ```
//!
//! Without a production host match the client runs in local mode: the read
//! needs `SPBRIDGE_FIXTURE` and the writes are logged dry runs.

use spbridge_domain::{or_clause, CollectionQuery, FieldValue, FilterValue, Record};
use spbridge_infra::{config, ListClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = config::load().unwrap_or_default();
    let site = std::env::var("SPBRIDGE_SITE")
        .unwrap_or_else(|_| "http://localhost:8080/sites/Dev/".to_string());
    let list = std::env::var("SPBRIDGE_LIST").unwrap_or_else(|_| "Tasks".to_string());

    let client = ListClient::new(&site, None, config)?;
    println!("Mode: {:?}, site: {}", client.mode(), client.base_url().await);

    let statuses: Vec<FilterValue> = vec!["Open".into(), "Blocked".into()];
    let mut query = CollectionQuery::new()
        .select("ID,Title,Status")
        .filter(or_clause(Some(statuses.as_slice()), "Status", None))
        .order_by("Modified desc")
        .top(10);
    if let Ok(fixture) = std::env::var("SPBRIDGE_FIXTURE") {
        query = query.fixture(fixture);
    }

    match client.read_collection(&list, query).await {
        Ok(items) => println!("Open items: {items:#}"),
        Err(e) => println!("Read failed: {e}"),
    }

    let record = Record::new()
        .with("Title", "Created by list_roundtrip")
        .with("Status", "Open")
        .with("Owner", FieldValue::single_ref(1));

    let created = client.add_item(&list, &record).await?;
    println!("Added: {:?}", created.uri());

    if let Some(item_url) = created.uri() {
        let update = Record::new().with("Status", "Blocked");
        let updated = client.update_item(&list, &update, item_url).await?;
        println!("Updated: {updated:?}");
    }

    client.shutdown().await;
    Ok(())
}
