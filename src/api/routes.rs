// API route configuration

use crate::api::handlers;
use actix_web::web;
use catalog_client::GraphqlTransport;

/// Register every route against a service backed by transport `T`.
pub fn configure_routes<T>(cfg: &mut web::ServiceConfig)
where
    T: GraphqlTransport + Clone + 'static,
{
    cfg.route("/health", web::get().to(handlers::health_check::<T>))
        .route("/", web::get().to(handlers::health_check::<T>))
        .service(
            web::scope("/api/v1")
                .route("/products", web::get().to(handlers::list_products::<T>))
                .route(
                    "/collections/{handle}/products",
                    web::get().to(handlers::list_collection_products::<T>),
                ),
        )
        .default_service(web::route().to(handlers::not_found));
}
