use std::sync::Arc;

use crate::application::post_service::PostService;
use crate::application::user_service::UserService;
use crate::data::post_repository::PostgresPostRepository;
use crate::data::user_repository::PostgresUserRepository;
use crate::infrastructure::config::HttpSettings;
use crate::presentation::handlers;
use crate::presentation::middleware::{
    RecoverMiddleware, RequestIdMiddleware, StructuredLogger, TimeoutMiddleware,
};
use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, HeaderName};
use actix_web::middleware::{Condition, DefaultHeaders};
use actix_web::{App, Error, HttpServer, web};
use sqlx::PgPool;
use tracing::info;

/// Assembles routes and the middleware chain. Outermost first: recovery,
/// request id, request logging, timeout, default headers, CORS.
pub fn build_app(
    posts: web::Data<PostService>,
    users: web::Data<UserService>,
    http: HttpSettings,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(posts)
        .app_data(users)
        .configure(handlers::configure)
        .default_service(web::to(handlers::not_found))
        .wrap(Condition::new(
            http.cors_enabled,
            build_cors(&http.cors_origins),
        ))
        .wrap(
            DefaultHeaders::new()
                .add((header::CONTENT_TYPE, "application/json"))
                .add(("X-Content-Type-Options", "nosniff"))
                .add(("Referrer-Policy", "no-referrer")),
        )
        .wrap(TimeoutMiddleware::new(http.request_timeout))
        .wrap(StructuredLogger)
        .wrap(RequestIdMiddleware)
        .wrap(RecoverMiddleware)
}

pub async fn start_rest_server(http: HttpSettings, pool: PgPool) -> anyhow::Result<()> {
    let posts = web::Data::new(PostService::new(Arc::new(PostgresPostRepository::new(
        pool.clone(),
    ))));
    let users = web::Data::new(UserService::new(Arc::new(PostgresUserRepository::new(pool))));

    let bind_address = (http.host.clone(), http.port);
    info!(
        host = %bind_address.0,
        port = bind_address.1,
        cors = http.cors_enabled,
        timeout_secs = http.request_timeout.as_secs(),
        "HTTP server starting"
    );

    HttpServer::new(move || build_app(posts.clone(), users.clone(), http.clone()))
        .bind(bind_address)?
        .run()
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

fn build_cors(origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers(vec![header::LINK])
        .supports_credentials()
        .max_age(86400);

    if origins.iter().any(|origin| origin == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
