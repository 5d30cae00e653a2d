//! HTTP handlers and route configuration.

mod auth;
mod feed;
mod form;
mod health;


use actix_web::web;

use crate::middleware::error::{json_error_handler, query_error_handler};

#[cfg(feature = "websocket")]
pub(crate) use feed::post_response;

/// Configure all application routes and body decoding.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        // Public routes
        .route("/health", web::get().to(health::health_check))
        // Auth routes
        .service(
            web::scope("/auth")
                .route("/signup", web::put().to(auth::signup))
                .route("/signup", web::post().to(auth::signup))
                .route("/login", web::post().to(auth::login))
                .route("/status", web::get().to(auth::get_status))
                .route("/status", web::patch().to(auth::update_status))
                .route("/status", web::put().to(auth::update_status)),
        )
        // Feed routes
        .service(
            web::scope("/feed")
                .route("/posts", web::get().to(feed::list_posts))
                .route("/post", web::post().to(feed::create_post))
                .route("/post/{post_id}", web::get().to(feed::get_post))
                .route("/post/{post_id}", web::put().to(feed::update_post))
                .route("/post/{post_id}", web::delete().to(feed::delete_post)),
        );
}
