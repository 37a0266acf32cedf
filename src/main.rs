use anyhow::{Context, Result};
use catalog_client::CatalogClient;
use clap::{Args, Parser, Subcommand};
use futures::{stream, StreamExt};
use serde::Serialize;
use storefront_catalog::api::ApiServer;
use storefront_catalog::catalog::{
    CatalogService, CatalogTarget, ListController, ListingKey, ListingParams, LoadState, Merge, Product, Trigger,
};
use storefront_catalog::logging::{init_tracing, LogFormat};
use storefront_catalog::util::env;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "catalog", version, about = "Storefront catalog listing CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// List one page of the global product search
    Products {
        #[command(flatten)]
        listing: ListingArgs,
        /// Exit with an error instead of printing an empty page when the fetch fails
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// List one page of a collection, addressed by its handle
    Collection {
        handle: String,
        #[command(flatten)]
        listing: ListingArgs,
        /// Exit with an error instead of printing an empty page when the fetch fails
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Page through listings until exhausted (or --max-pages) and print a summary per listing
    Crawl {
        /// Collection handles to crawl (comma separated); the global listing when omitted
        #[arg(long, value_delimiter = ',')]
        collection: Vec<String>,
        /// Upper bound on pages fetched per listing, first page included
        #[arg(long, default_value_t = 10)]
        max_pages: usize,
        /// Listings crawled at the same time
        #[arg(long, default_value_t = 2)]
        concurrency: usize,
        /// Stop at CATALOG_AUTO_LOAD_LIMIT items, like an infinite-scroll page would
        #[arg(long, default_value_t = false)]
        auto_only: bool,
        /// Print every crawled product id
        #[arg(long, default_value_t = false)]
        ids: bool,
        #[command(flatten)]
        listing: ListingArgs,
    },
    /// Run the HTTP API (same as the api_server binary)
    Serve,
}

/// Facet, sort and cursor flags shared by the listing commands.
#[derive(Args, Debug, Clone, Default)]
struct ListingArgs {
    /// Free-text search
    #[arg(long)]
    q: Option<String>,
    /// Tag facet; repeat the flag or comma separate
    #[arg(long = "tag", value_delimiter = ',')]
    tags: Vec<String>,
    /// Price range: any, 0-500, 500-1000, 1000-2000, 2000+
    #[arg(long)]
    price_range: Option<String>,
    /// featured, price-asc, price-desc, name-asc, name-desc, created-asc, created-desc
    #[arg(long)]
    sort: Option<String>,
    /// Page size (defaults to CATALOG_PAGE_SIZE)
    #[arg(long)]
    first: Option<u32>,
    #[arg(long, conflicts_with = "before")]
    after: Option<String>,
    #[arg(long)]
    before: Option<String>,
}

impl ListingArgs {
    /// Run the flags through the same parser the HTTP API uses.
    fn to_params(&self) -> ListingParams {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        pairs.extend(self.tags.iter().map(|t| ("tag", t.clone())));
        if let Some(p) = &self.price_range {
            pairs.push(("priceRange", p.clone()));
        }
        if let Some(s) = &self.sort {
            pairs.push(("sort", s.clone()));
        }
        if let Some(n) = self.first {
            pairs.push(("first", n.to_string()));
        }
        if let Some(c) = &self.after {
            pairs.push(("after", c.clone()));
        }
        if let Some(c) = &self.before {
            pairs.push(("before", c.clone()));
        }
        ListingParams::from_query_pairs(pairs)
    }
}

#[derive(Debug, Serialize)]
struct CrawlSummary {
    target: String,
    listing_key: ListingKey,
    pages: usize,
    items: usize,
    duplicates: usize,
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<Vec<String>>,
}

fn target_label(target: &CatalogTarget) -> String {
    match target {
        CatalogTarget::Products => "products".to_string(),
        CatalogTarget::Collection { handle } => format!("collection:{handle}"),
    }
}

fn state_label(state: &LoadState) -> String {
    match state {
        LoadState::Idle => "more_available".to_string(),
        LoadState::Fetching => "fetching".to_string(),
        LoadState::FullyLoaded => "fully_loaded".to_string(),
        LoadState::Failed { message } => format!("failed: {message}"),
    }
}

async fn crawl(
    service: &CatalogService<CatalogClient>,
    target: CatalogTarget,
    params: &ListingParams,
    max_pages: usize,
    trigger: Trigger,
    with_ids: bool,
) -> CrawlSummary {
    let label = target_label(&target);
    let mut ctl: ListController<Product> = ListController::new(service.settings().auto_load_limit);
    let generation = ctl.reset(params.listing_key());

    let mut pages = 0;
    let mut duplicates = 0;
    if let Merge::Appended { duplicates: d, .. } =
        ctl.hydrate(generation, service.try_list(&target, params).await)
    {
        pages += 1;
        duplicates += d;
    }

    while pages < max_pages {
        let step = ctl
            .load_next(trigger, |cursor| service.try_list_after(&target, params, cursor))
            .await;
        match step {
            Ok(Merge::Appended { added, duplicates: d }) => {
                pages += 1;
                duplicates += d;
                info!(listing = %label, page = pages, added, duplicates = d, total = ctl.len(), "crawl: page merged");
            }
            Ok(Merge::Failed) | Ok(Merge::Stale) => break,
            Err(skip) => {
                debug!(listing = %label, ?skip, "crawl: no further request");
                break;
            }
        }
    }

    let summary = CrawlSummary {
        target: label,
        listing_key: params.listing_key(),
        pages,
        items: ctl.len(),
        duplicates,
        state: state_label(ctl.state()),
        ids: with_ids.then(|| ctl.items().map(|p| p.id.clone()).collect()),
    };
    info!(
        listing = %summary.target,
        pages = summary.pages,
        items = summary.items,
        state = %summary.state,
        "crawl: finished"
    );
    summary
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}

async fn print_page(
    service: &CatalogService<CatalogClient>,
    target: CatalogTarget,
    listing: &ListingArgs,
    strict: bool,
) -> Result<()> {
    let params = listing.to_params();
    let page = if strict {
        service
            .try_page(&target, &params)
            .await
            .with_context(|| format!("listing {}", target_label(&target)))?
    } else {
        service.list(&target, &params).await
    };
    print_json(&page)
}

#[actix_web::main]
async fn main() -> Result<()> {
    env::init_env();
    let cli = Cli::parse();

    let format = match cli.command {
        Commands::Serve => LogFormat::Full,
        _ => LogFormat::Compact,
    };
    init_tracing("warn,storefront_catalog=info,catalog_client=info", format)?;
    env::bootstrap_cli("catalog");

    match cli.command {
        Commands::Products { listing, strict } => {
            let service = ApiServer::service_from_env()?;
            print_page(&service, CatalogTarget::Products, &listing, strict).await?;
        }
        Commands::Collection {
            handle,
            listing,
            strict,
        } => {
            let service = ApiServer::service_from_env()?;
            print_page(&service, CatalogTarget::collection(handle), &listing, strict).await?;
        }
        Commands::Crawl {
            collection,
            max_pages,
            concurrency,
            auto_only,
            ids,
            listing,
        } => {
            let service = ApiServer::service_from_env()?;
            let mut params = listing.to_params();
            if params.page.before.take().is_some() {
                warn!("crawl pages forward only; ignoring --before");
            }
            let trigger = if auto_only {
                Trigger::Visibility
            } else {
                Trigger::Manual
            };
            let targets: Vec<CatalogTarget> = if collection.is_empty() {
                vec![CatalogTarget::Products]
            } else {
                collection.into_iter().map(CatalogTarget::collection).collect()
            };

            let summaries: Vec<CrawlSummary> = stream::iter(targets)
                .map(|target| crawl(&service, target, &params, max_pages.max(1), trigger, ids))
                .buffer_unordered(concurrency.max(1))
                .collect()
                .await;
            print_json(&summaries)?;
        }
        Commands::Serve => {
            env::preflight_check(
                "catalog serve",
                &["CATALOG_API_URL"],
                &["CATALOG_API_URL", "CATALOG_ACCESS_TOKEN", "API_HOST", "API_PORT"],
            )?;
            let server = ApiServer::from_env()?;
            server.run(ApiServer::service_from_env()?).await?;
        }
    }

    Ok(())
}
