//! HTTP handlers and route configuration.

mod alerts;
mod health;
mod inventory;
mod sessions;
mod sync;


use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            // Per-account inventory
            .service(
                web::scope("/accounts/{account}")
                    .route("/sync", web::post().to(sync::sync_account))
                    .route("/inventory", web::get().to(inventory::list_inventory))
                    .route(
                        "/inventory/{external_id}",
                        web::get().to(inventory::get_inventory_item),
                    )
                    .route("/alerts", web::get().to(alerts::list_alerts)),
            )
            // Sessions
            .service(
                web::scope("/sessions")
                    .route("", web::post().to(sessions::create_session))
                    .route("/{id}", web::get().to(sessions::get_session))
                    .route("/{id}", web::patch().to(sessions::update_session))
                    .route("/{id}", web::delete().to(sessions::delete_session))
                    .route("/{id}/extend", web::post().to(sessions::extend_session)),
            ),
    );
}
