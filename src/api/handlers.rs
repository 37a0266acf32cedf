// HTTP request handlers for API endpoints

use crate::api::models::*;
use crate::catalog::{CatalogService, CatalogTarget, ListingParams};
use actix_web::{web, HttpRequest, HttpResponse};
use catalog_client::GraphqlTransport;
use std::time::Instant;

/// Process-wide facts reported by the health endpoint.
pub struct AppState {
    pub started: Instant,
    pub upstream: String,
}

impl AppState {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            started: Instant::now(),
            upstream: upstream.into(),
        }
    }
}

/// Health check endpoint
pub async fn health_check<T>(
    state: web::Data<AppState>,
    service: web::Data<CatalogService<T>>,
) -> HttpResponse
where
    T: GraphqlTransport + Clone + 'static,
{
    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        upstream: state.upstream.clone(),
        page_size: service.settings().page_size,
        uptime_seconds: state.started.elapsed().as_secs(),
    });
    HttpResponse::Ok().json(response)
}

/// Fallback for unknown routes.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error(format!(
        "no route for {} {}",
        req.method(),
        req.path()
    )))
}

/// Root-scope listing: `GET /api/v1/products?q=..&tag=..&priceRange=..&sort=..&after=..`
pub async fn list_products<T>(req: HttpRequest, service: web::Data<CatalogService<T>>) -> HttpResponse
where
    T: GraphqlTransport + Clone + 'static,
{
    let params = ListingParams::from_query_string(req.query_string());
    let page = service.list(&CatalogTarget::Products, &params).await;
    HttpResponse::Ok().json(ApiResponse::success(page))
}

/// Collection-scope listing: `GET /api/v1/collections/{handle}/products?..`
pub async fn list_collection_products<T>(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<CatalogService<T>>,
) -> HttpResponse
where
    T: GraphqlTransport + Clone + 'static,
{
    let handle = path.into_inner();
    tracing::debug!(handle = %handle, "collection listing requested");
    let params = ListingParams::from_query_string(req.query_string());
    let page = service
        .list(&CatalogTarget::collection(handle), &params)
        .await;
    HttpResponse::Ok().json(ApiResponse::success(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::configure_routes;
    use crate::catalog::testing::{page_json, StubTransport};
    use crate::catalog::ListingSettings;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    type Stub = Arc<StubTransport>;

    fn storefront() -> Stub {
        Arc::new(StubTransport::new(|req| {
            Ok(match req.operation_name.as_deref() {
                Some("CollectionByHandle") => match req.variables["handle"].as_str() {
                    Some("summer") => json!({ "data": { "collection": { "id": "gid://shop/Collection/7" } } }),
                    _ => json!({ "data": { "collection": null } }),
                },
                Some("CollectionProducts") => {
                    json!({ "data": { "collection": { "products": page_json(&["p1", "p2"], true) } } })
                }
                _ => json!({ "data": { "products": page_json(&["p3"], false) } }),
            })
        }))
    }

    macro_rules! app {
        ($stub:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppState::new("shop.example.com")))
                    .app_data(web::Data::new(CatalogService::new(
                        $stub.clone(),
                        ListingSettings::default(),
                    )))
                    .configure(configure_routes::<Stub>),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_reports_upstream() {
        let stub = storefront();
        let app = app!(stub);
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["upstream"], "shop.example.com");
        assert_eq!(body["data"]["page_size"], 24);
        assert_eq!(stub.request_count(), 0);
    }

    #[actix_web::test]
    async fn products_forward_facets_as_predicate() {
        let stub = storefront();
        let app = app!(stub);
        let req = test::TestRequest::get()
            .uri("/api/v1/products?priceRange=0-500&sort=price-desc")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["scope"], "root");
        assert_eq!(body["data"]["hasMore"], false);
        assert_eq!(body["data"]["connection"]["edges"][0]["node"]["id"], "p3");

        let vars = &stub.requests()[0].variables;
        assert_eq!(vars["query"], "price:<=500");
        assert_eq!(vars["sortKey"], "PRICE");
        assert_eq!(vars["reverse"], true);
    }

    #[actix_web::test]
    async fn collection_listing_uses_structured_filters() {
        let stub = storefront();
        let app = app!(stub);
        let req = test::TestRequest::get()
            .uri("/api/v1/collections/summer/products?tag=linen&first=2")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["scope"], "collection");
        assert_eq!(body["data"]["hasMore"], true);
        assert_eq!(body["data"]["connection"]["pageInfo"]["endCursor"], "p2");

        let vars = &stub.requests()[1].variables;
        assert_eq!(vars["filters"], json!([{ "tag": "linen" }]));
        assert_eq!(vars["first"], 2);
    }

    #[actix_web::test]
    async fn unknown_collection_is_an_empty_success() {
        let stub = storefront();
        let app = app!(stub);
        let req = test::TestRequest::get()
            .uri("/api/v1/collections/nope/products")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["connection"]["edges"], json!([]));
        assert_eq!(body["data"]["hasMore"], false);
    }

    #[actix_web::test]
    async fn unknown_route_gets_error_envelope() {
        let stub = storefront();
        let app = app!(stub);
        let req = test::TestRequest::get().uri("/api/v1/carts").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "no route for GET /api/v1/carts");
        assert!(body.get("data").is_none());
        assert_eq!(stub.request_count(), 0);
    }
}
