// API server implementation using actix-web

use crate::api::handlers::AppState;
use crate::api::{middleware, routes};
use crate::catalog::{CatalogService, ListingSettings};
use crate::util::env;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use catalog_client::{CatalogClient, CatalogConfig};

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        env::init_env();

        let host = env::env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match env::env_opt("API_PORT") {
            Some(raw) => raw.trim().parse().context("Invalid API_PORT")?,
            None => 8080,
        };
        let allowed_origins = env::env_opt("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string());

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    /// Build the storefront client and listing service from the environment.
    pub fn service_from_env() -> Result<CatalogService<CatalogClient>> {
        let cfg = CatalogConfig::from_env().context("storefront client configuration")?;
        let client = CatalogClient::new(cfg).context("building storefront client")?;
        Ok(CatalogService::new(client, ListingSettings::from_env()))
    }

    /// Start the HTTP server
    pub async fn run(self, service: CatalogService<CatalogClient>) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);
        let upstream = service
            .transport()
            .config()
            .endpoint
            .host_str()
            .unwrap_or_default()
            .to_string();

        tracing::info!(
            host = %self.host,
            port = %self.port,
            upstream = %upstream,
            page_size = service.settings().page_size,
            "Starting catalog API server"
        );

        let service = web::Data::new(service);
        let state = web::Data::new(AppState::new(upstream));
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(service.clone())
                .app_data(state.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .configure(routes::configure_routes::<CatalogClient>)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
