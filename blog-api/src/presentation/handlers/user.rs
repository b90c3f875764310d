use crate::application::user_service::UserService;
use crate::domain::error::DomainError;
use crate::presentation::dto::UserPayload;
use actix_web::{HttpResponse, delete, get, post, put, web};
use tracing::info;

#[get("/users")]
async fn get_users(users: web::Data<UserService>) -> Result<HttpResponse, DomainError> {
    let users = users.get_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{id}")]
async fn get_user(
    users: web::Data<UserService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, DomainError> {
    let user = users.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[post("/users")]
async fn create_user(
    users: web::Data<UserService>,
    payload: web::Json<UserPayload>,
) -> Result<HttpResponse, DomainError> {
    let user = users.create_user(payload.into_inner().validate()?).await?;

    info!(user_id = user.id, "user created");

    Ok(HttpResponse::Ok().json(user))
}

#[put("/users/{id}")]
async fn update_user(
    users: web::Data<UserService>,
    path: web::Path<i32>,
    payload: web::Json<UserPayload>,
) -> Result<HttpResponse, DomainError> {
    let user_id = path.into_inner();
    let user = users
        .update_user(user_id, payload.into_inner().validate()?)
        .await?;

    info!(user_id, "user updated");

    Ok(HttpResponse::Ok().json(user))
}

#[delete("/users/{id}")]
async fn delete_user(
    users: web::Data<UserService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, DomainError> {
    let user_id = path.into_inner();
    users.delete_user(user_id).await?;

    info!(user_id, "user deleted");

    Ok(HttpResponse::NoContent().finish())
}
