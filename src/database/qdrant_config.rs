use anyhow::{anyhow, Result};
use qdrant_client::{config::QdrantConfig, Qdrant};
use std::time::Duration;

/// The REST port the user usually knows; the client speaks gRPC.
fn grpc_url(url: &str) -> String {
    // Clean the URL
    let (scheme, clean_url) = match url.split_once("://") {
        Some((scheme, rest)) => (scheme, rest.trim_end_matches('/')),
        None => ("http", url.trim_end_matches('/')),
    };

    // Replace port 6333 with 6334 for gRPC if needed
    let grpc_url = if clean_url.ends_with(":6333") {
        clean_url.replace(":6333", ":6334")
    } else {
        clean_url.to_string()
    };

    format!("{}://{}", scheme, grpc_url)
}

pub fn create_qdrant_client(url: &str, api_key: &str) -> Result<Qdrant> {
    let url_with_scheme = grpc_url(url);
    log::info!("Connecting to Qdrant at {}", url_with_scheme);

    // Configure Qdrant
    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.check_compatibility = false;
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);
    if !api_key.is_empty() {
        config.api_key = Some(api_key.to_string());
    }

    Qdrant::new(config).map_err(|e| anyhow!("Failed to create Qdrant client: {}", e))
}
