use crate::application::post_service::PostService;
use crate::domain::error::DomainError;
use crate::presentation::dto::ListPostsQuery;
use actix_web::{HttpResponse, get, web};
use tracing::info;

#[get("/posts")]
async fn get_posts(
    posts: web::Data<PostService>,
    query: web::Query<ListPostsQuery>,
) -> Result<HttpResponse, DomainError> {
    let pagination = query.pagination()?;
    let posts = posts.get_posts(pagination).await?;

    info!(
        page = pagination.page,
        size = pagination.size,
        returned = posts.len(),
        "posts retrieved"
    );

    Ok(HttpResponse::Ok().json(posts))
}

#[get("/posts/{id}")]
async fn get_post(
    posts: web::Data<PostService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, DomainError> {
    let post = posts.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}
