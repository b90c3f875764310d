pub mod health;
pub mod post;
pub mod user;

use crate::domain::error::DomainError;
use actix_web::dev::ResourceDef;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};

/// Paths registered by [`configure`] and the methods each one serves.
const ROUTES: &[(&str, &str)] = &[
    ("/health", "GET"),
    ("/posts", "GET"),
    ("/posts/{id}", "GET"),
    ("/users", "GET, POST"),
    ("/users/{id}", "GET, PUT, DELETE"),
];

/// Registers every route plus the extractor configs that turn malformed
/// path, query and body input into 400 responses.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PathConfig::default().error_handler(|err, _req| {
        DomainError::BadRequest(format!("invalid path parameter: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        DomainError::BadRequest(format!("invalid query: {}", err)).into()
    }))
    .app_data(web::JsonConfig::default().error_handler(|err, _req| {
        DomainError::BadRequest(format!("invalid body: {}", err)).into()
    }))
    .service(health::health)
    .service(post::get_posts)
    .service(post::get_post)
    .service(user::get_users)
    .service(user::get_user)
    .service(user::create_user)
    .service(user::update_user)
    .service(user::delete_user);
}

/// Fallback for requests no route matched: 405 with `Allow` when the path is
/// known but the method is not, 404 otherwise.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, DomainError> {
    let target = format!("{} {}", req.method(), req.path());
    let known = ROUTES
        .iter()
        .find(|(pattern, _)| ResourceDef::new(*pattern).is_match(req.path()));

    match known {
        Some(&(_, allowed)) => {
            let mut response = DomainError::MethodNotAllowed(target).error_response();
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(allowed));
            Ok(response)
        }
        None => Err(DomainError::RouteNotFound(target)),
    }
}
