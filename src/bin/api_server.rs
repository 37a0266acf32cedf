// HTTP API server binary: listing endpoints over the storefront catalog.

use anyhow::Result;
use storefront_catalog::api::ApiServer;
use storefront_catalog::logging::{init_tracing, LogFormat};
use storefront_catalog::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    env_util::init_env();
    init_tracing("info,actix_web=info,catalog_client=info", LogFormat::Full)?;

    tracing::info!("Initializing catalog API server");

    env_util::preflight_check(
        "api_server",
        &["CATALOG_API_URL"],
        &[
            "CATALOG_API_URL",
            "CATALOG_ACCESS_TOKEN",
            "CATALOG_PAGE_SIZE",
            "API_HOST",
            "API_PORT",
            "ALLOWED_ORIGINS",
        ],
    )?;

    let server = ApiServer::from_env()?;
    let service = ApiServer::service_from_env()?;
    server.run(service).await?;

    Ok(())
}
