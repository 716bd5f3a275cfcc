/// HTTP handlers for content endpoints
///
/// This module contains handlers for:
/// - Content: create, list, read, update, delete for every content kind
/// - Health: liveness and dependency readiness
pub mod content;
pub mod health;

pub use content::content_scope;
pub use health::{liveness_check, readiness_summary, HealthState};

use crate::models::{Article, Meme, NewsItem, Wallpaper};
use crate::services::ContentServices;
use actix_web::web;

/// Register every content service as app data.
pub fn register_services(cfg: &mut web::ServiceConfig, services: &ContentServices) {
    cfg.app_data(web::Data::from(services.articles.clone()))
        .app_data(web::Data::from(services.memes.clone()))
        .app_data(web::Data::from(services.wallpapers.clone()))
        .app_data(web::Data::from(services.news.clone()));
}

/// Mount the health and content routes under `/api/v1`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/health", web::get().to(liveness_check))
        .route("/api/v1/health/ready", web::get().to(readiness_summary))
        .service(
            web::scope("/api/v1")
                .service(content_scope::<Article>("/articles"))
                .service(content_scope::<Meme>("/memes"))
                .service(content_scope::<Wallpaper>("/wallpapers"))
                .service(content_scope::<NewsItem>("/news")),
        );
}
