/// Content handlers - HTTP endpoints shared by every content kind
use crate::error::{AppError, Result};
use crate::models::{Content, Filter, NaturalKey, Patch};
use crate::services::ContentService;
use actix_web::{web, HttpResponse};
use serde_json::Value;
use std::collections::HashMap;

fn key_from_path(path: web::Path<(String, String)>) -> NaturalKey {
    let (first, second) = path.into_inner();
    NaturalKey::new(first, second)
}

/// Create a new item
pub async fn create_content<T: Content>(
    service: web::Data<ContentService<T>>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    let item: T = serde_json::from_value(body.into_inner())
        .map_err(|e| AppError::InvalidInput(format!("invalid {}: {}", T::KIND, e)))?;

    let outcome = service.create(item).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "status": outcome })))
}

/// List the newest items matching the query parameters
pub async fn list_content<T: Content>(
    service: web::Data<ContentService<T>>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse> {
    let filter = Filter::from_query::<T>(&query)?;
    let items = service.get_many(&filter).await?;
    Ok(HttpResponse::Ok().json(items))
}

/// Get one item by its natural key
pub async fn get_content<T: Content>(
    service: web::Data<ContentService<T>>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let item = service.get_one(&key_from_path(path)).await?;
    Ok(HttpResponse::Ok().json(item))
}

/// Patch non-key fields of one item
pub async fn update_content<T: Content>(
    service: web::Data<ContentService<T>>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    let fields = body
        .as_object()
        .ok_or_else(|| AppError::InvalidInput("update body must be a JSON object".to_string()))?;
    let patch = Patch::from_json::<T>(fields)?;

    service.update(&key_from_path(path), &patch).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Delete one item
pub async fn delete_content<T: Content>(
    service: web::Data<ContentService<T>>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    service.delete(&key_from_path(path)).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Routes for one content kind, mounted at `path`.
pub fn content_scope<T: Content>(path: &str) -> actix_web::Scope {
    web::scope(path)
        .service(
            web::resource("")
                .route(web::post().to(create_content::<T>))
                .route(web::get().to(list_content::<T>)),
        )
        .service(
            web::resource("/{first}/{second}")
                .route(web::get().to(get_content::<T>))
                .route(web::patch().to(update_content::<T>))
                .route(web::delete().to(delete_content::<T>)),
        )
}
